//! The 9×9 puzzle grid.
//!
//! A cell is either empty, a placed digit, or a set of pencil-mark notes.
//! The three shapes share one slot, so [`Cell`] is a tagged union whose
//! equality is deep: a digit never equals a notes set, and two notes sets are
//! equal only when they carry exactly the same marks.
//!
//! On the wire a cell is a bare number (`0` = empty) or a notes object
//! (`{"4": true, "7": false}`).

use crate::error::TypesError;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Rows and columns in a grid.
pub const GRID_SIZE: usize = 9;

/// Rows and columns in a box.
pub const BOX_SIZE: usize = 3;

/// Pencil-mark notes for one cell: digit → marked.
///
/// An explicit `false` entry is kept, so toggling a note on and off again
/// leaves a value that is not equal to never having touched it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Notes(BTreeMap<u8, bool>);

impl Notes {
    /// An empty notes set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `digit` is currently marked.
    pub fn is_marked(&self, digit: u8) -> bool {
        self.0.get(&digit).copied().unwrap_or(false)
    }

    /// A copy with `digit` flipped.
    pub fn toggled(&self, digit: u8) -> Self {
        let mut next = self.0.clone();
        next.insert(digit, !self.is_marked(digit));
        Self(next)
    }

    /// Whether any digit is marked.
    pub fn any_marked(&self) -> bool {
        self.0.values().any(|marked| *marked)
    }

    /// Marked digits in ascending order.
    pub fn marked(&self) -> impl Iterator<Item = u8> + '_ {
        self.0
            .iter()
            .filter(|(_, marked)| **marked)
            .map(|(digit, _)| *digit)
    }
}

impl FromIterator<u8> for Notes {
    fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        Self(iter.into_iter().map(|digit| (digit, true)).collect())
    }
}

/// Contents of one grid cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Cell {
    /// Nothing entered.
    #[default]
    Empty,
    /// A placed digit, 1..=9.
    Digit(u8),
    /// Pencil marks.
    Notes(Notes),
}

impl Cell {
    /// Build a cell from a digit; `0` means empty.
    pub fn digit(value: u8) -> Result<Self, TypesError> {
        match value {
            0 => Ok(Self::Empty),
            1..=9 => Ok(Self::Digit(value)),
            other => Err(TypesError::InvalidDigit(other)),
        }
    }

    /// The placed digit, if any.
    pub fn as_digit(&self) -> Option<u8> {
        match self {
            Self::Digit(d) => Some(*d),
            _ => None,
        }
    }

    /// The notes, if this cell holds notes.
    pub fn as_notes(&self) -> Option<&Notes> {
        match self {
            Self::Notes(notes) => Some(notes),
            _ => None,
        }
    }

    /// Whether a digit is placed. In an initial grid this marks a given cell.
    pub fn is_filled(&self) -> bool {
        matches!(self, Self::Digit(_))
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Empty => serializer.serialize_u8(0),
            Self::Digit(d) => serializer.serialize_u8(*d),
            Self::Notes(notes) => notes.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Cell {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawCell {
            Digit(u8),
            Notes(Notes),
        }

        match RawCell::deserialize(deserializer)? {
            RawCell::Digit(d) => Cell::digit(d).map_err(D::Error::custom),
            RawCell::Notes(notes) => Ok(Cell::Notes(notes)),
        }
    }
}

/// Position of a cell in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellId {
    row: u8,
    col: u8,
}

impl CellId {
    /// The top-left cell.
    pub const ORIGIN: CellId = CellId { row: 0, col: 0 };

    /// Create a CellId, checking bounds.
    pub fn new(row: usize, col: usize) -> Result<Self, TypesError> {
        if row >= GRID_SIZE || col >= GRID_SIZE {
            return Err(TypesError::OutOfRange { row, col });
        }
        Ok(Self {
            row: row as u8,
            col: col as u8,
        })
    }

    /// Row index, 0..9.
    pub fn row(&self) -> usize {
        self.row as usize
    }

    /// Column index, 0..9.
    pub fn col(&self) -> usize {
        self.col as usize
    }

    /// Every cell, row by row.
    pub fn all() -> impl Iterator<Item = CellId> {
        (0..GRID_SIZE as u8).flat_map(|row| (0..GRID_SIZE as u8).map(move |col| CellId { row, col }))
    }

    /// The adjacent cell in `direction`, staying put at the grid edge.
    pub fn neighbor(&self, direction: Direction) -> CellId {
        let last = (GRID_SIZE - 1) as u8;
        let (row, col) = match direction {
            Direction::Up => (self.row.saturating_sub(1), self.col),
            Direction::Down => ((self.row + 1).min(last), self.col),
            Direction::Left => (self.row, self.col.saturating_sub(1)),
            Direction::Right => (self.row, (self.col + 1).min(last)),
        };
        CellId { row, col }
    }
}

/// Formats as `box:X,Y,cell:x,y` where X/x are column coordinates and Y/y rows.
impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "box:{},{},cell:{},{}",
            self.col / 3,
            self.row / 3,
            self.col % 3,
            self.row % 3
        )
    }
}

impl FromStr for CellId {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || TypesError::MalformedCellId(s.to_string());
        let rest = s.strip_prefix("box:").ok_or_else(malformed)?;
        let (boxes, cells) = rest.split_once(",cell:").ok_or_else(malformed)?;

        let pair = |part: &str| -> Option<(u8, u8)> {
            let (x, y) = part.split_once(',')?;
            let x: u8 = x.parse().ok()?;
            let y: u8 = y.parse().ok()?;
            (x < 3 && y < 3).then_some((x, y))
        };

        let (box_x, box_y) = pair(boxes).ok_or_else(malformed)?;
        let (cell_x, cell_y) = pair(cells).ok_or_else(malformed)?;
        Ok(CellId {
            row: box_y * 3 + cell_y,
            col: box_x * 3 + cell_x,
        })
    }
}

/// Movement direction for keyboard navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Towards row 0.
    Up,
    /// Towards row 8.
    Down,
    /// Towards column 0.
    Left,
    /// Towards column 8.
    Right,
}

/// A full 9×9 grid, row-major.
///
/// On the wire a grid is nested by box, then cell:
/// `grid[box_x][box_y][cell_x][cell_y]`, where `x` counts columns and `y`
/// counts rows. Stored sessions and other clients use this layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Grid {
    rows: [[Cell; GRID_SIZE]; GRID_SIZE],
}

type BoxLayout = [[[[Cell; BOX_SIZE]; BOX_SIZE]; BOX_SIZE]; BOX_SIZE];

impl Serialize for Grid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let boxes: BoxLayout = std::array::from_fn(|box_x| {
            std::array::from_fn(|box_y| {
                std::array::from_fn(|cell_x| {
                    std::array::from_fn(|cell_y| {
                        self.rows[box_y * BOX_SIZE + cell_y][box_x * BOX_SIZE + cell_x].clone()
                    })
                })
            })
        });
        boxes.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Grid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let boxes = BoxLayout::deserialize(deserializer)?;
        let mut grid = Grid::empty();
        for (box_x, column) in boxes.into_iter().enumerate() {
            for (box_y, cells) in column.into_iter().enumerate() {
                for (cell_x, cell_column) in cells.into_iter().enumerate() {
                    for (cell_y, cell) in cell_column.into_iter().enumerate() {
                        grid.rows[box_y * BOX_SIZE + cell_y][box_x * BOX_SIZE + cell_x] = cell;
                    }
                }
            }
        }
        Ok(grid)
    }
}

impl Grid {
    /// A grid with every cell empty.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse 81 characters of puzzle text, row by row.
    ///
    /// `1`-`9` are digits; `0` and `.` are empty cells. Whitespace is ignored.
    pub fn from_text(text: &str) -> Result<Self, TypesError> {
        let chars: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
        if chars.len() != GRID_SIZE * GRID_SIZE {
            return Err(TypesError::PuzzleTextLength(chars.len()));
        }

        let mut grid = Grid::empty();
        for (index, ch) in chars.into_iter().enumerate() {
            let cell = match ch {
                '.' | '0' => Cell::Empty,
                '1'..='9' => Cell::Digit(ch as u8 - b'0'),
                other => return Err(TypesError::PuzzleTextChar(other)),
            };
            grid.rows[index / GRID_SIZE][index % GRID_SIZE] = cell;
        }
        Ok(grid)
    }

    /// Render as 81 characters of puzzle text; empty and notes cells become `.`.
    pub fn to_text(&self) -> String {
        self.rows
            .iter()
            .flatten()
            .map(|cell| match cell {
                Cell::Digit(d) => (b'0' + d) as char,
                _ => '.',
            })
            .collect()
    }

    /// The cell at `id`.
    pub fn get(&self, id: CellId) -> &Cell {
        &self.rows[id.row()][id.col()]
    }

    /// Replace the cell at `id`.
    pub fn set(&mut self, id: CellId, cell: Cell) {
        self.rows[id.row()][id.col()] = cell;
    }

    /// A copy with the cell at `id` replaced.
    pub fn with_cell(&self, id: CellId, cell: Cell) -> Grid {
        let mut next = self.clone();
        next.set(id, cell);
        next
    }

    /// Every cell with its position, row by row.
    pub fn cells(&self) -> impl Iterator<Item = (CellId, &Cell)> {
        CellId::all().map(move |id| (id, self.get(id)))
    }

    /// Number of cells whose contents differ from `other` (deep equality).
    pub fn differing_cells(&self, other: &Grid) -> usize {
        CellId::all()
            .filter(|id| self.get(*id) != other.get(*id))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PUZZLE: &str =
        "53..7....6..195....98....6.8...6...34..8.3..17...2...6.6....28....419..5....8..79";

    #[test]
    fn cell_digit_bounds() {
        assert_eq!(Cell::digit(0).unwrap(), Cell::Empty);
        assert_eq!(Cell::digit(9).unwrap(), Cell::Digit(9));
        assert_eq!(Cell::digit(10), Err(TypesError::InvalidDigit(10)));
    }

    #[test]
    fn digit_never_equals_notes() {
        let notes: Notes = [5].into_iter().collect();
        assert_ne!(Cell::Digit(5), Cell::Notes(notes));
    }

    #[test]
    fn notes_equality_is_deep() {
        let touched = Notes::new().toggled(3).toggled(3);
        assert!(!touched.is_marked(3));
        assert!(!touched.any_marked());
        // An explicit false mark is still a difference.
        assert_ne!(Cell::Notes(touched), Cell::Notes(Notes::new()));
    }

    #[test]
    fn cell_wire_format() {
        assert_eq!(serde_json::to_string(&Cell::Empty).unwrap(), "0");
        assert_eq!(serde_json::to_string(&Cell::Digit(7)).unwrap(), "7");

        let notes = Notes::new().toggled(2).toggled(8);
        let json = serde_json::to_string(&Cell::Notes(notes.clone())).unwrap();
        assert_eq!(json, r#"{"2":true,"8":true}"#);

        let parsed: Cell = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Cell::Notes(notes));
        assert_eq!(serde_json::from_str::<Cell>("0").unwrap(), Cell::Empty);
        assert!(serde_json::from_str::<Cell>("12").is_err());
    }

    #[test]
    fn cell_id_legacy_format() {
        let id: CellId = "box:2,1,cell:0,2".parse().unwrap();
        assert_eq!(id.row(), 5);
        assert_eq!(id.col(), 6);
        assert_eq!(id.to_string(), "box:2,1,cell:0,2");
    }

    #[test]
    fn cell_id_rejects_malformed() {
        assert!("box:3,0,cell:0,0".parse::<CellId>().is_err());
        assert!("cell:0,0".parse::<CellId>().is_err());
        assert!("box:0,0,cell:0".parse::<CellId>().is_err());
        assert!(CellId::new(9, 0).is_err());
    }

    #[test]
    fn neighbor_clamps_at_edges() {
        let origin = CellId::ORIGIN;
        assert_eq!(origin.neighbor(Direction::Up), origin);
        assert_eq!(origin.neighbor(Direction::Left), origin);
        assert_eq!(origin.neighbor(Direction::Down), CellId::new(1, 0).unwrap());

        let corner = CellId::new(8, 8).unwrap();
        assert_eq!(corner.neighbor(Direction::Right), corner);
        assert_eq!(corner.neighbor(Direction::Left), CellId::new(8, 7).unwrap());
    }

    #[test]
    fn grid_text_round_trip() {
        let grid = Grid::from_text(PUZZLE).unwrap();
        assert_eq!(grid.get(CellId::ORIGIN), &Cell::Digit(5));
        assert_eq!(grid.get(CellId::new(0, 2).unwrap()), &Cell::Empty);
        assert_eq!(grid.to_text(), PUZZLE);
    }

    #[test]
    fn grid_text_errors() {
        assert_eq!(Grid::from_text("123"), Err(TypesError::PuzzleTextLength(3)));
        let bad = PUZZLE.replacen('.', "x", 1);
        assert_eq!(Grid::from_text(&bad), Err(TypesError::PuzzleTextChar('x')));
    }

    #[test]
    fn differing_cells_counts_deep_changes() {
        let grid = Grid::from_text(PUZZLE).unwrap();
        let id = CellId::new(0, 2).unwrap();
        let one = grid.with_cell(id, Cell::Digit(4));
        assert_eq!(grid.differing_cells(&grid), 0);
        assert_eq!(grid.differing_cells(&one), 1);

        let two = one.with_cell(CellId::new(0, 3).unwrap(), Cell::Notes(Notes::new().toggled(6)));
        assert_eq!(grid.differing_cells(&two), 2);
    }

    #[test]
    fn grid_serializes_by_box_then_cell() {
        // Row 5, column 1: box x 0, box y 1, cell x 1, cell y 2.
        let id = CellId::new(5, 1).unwrap();
        let grid = Grid::empty()
            .with_cell(id, Cell::Digit(7))
            .with_cell(CellId::new(0, 8).unwrap(), Cell::Digit(3));
        let value = serde_json::to_value(&grid).unwrap();
        assert_eq!(value[0][1][1][2], 7);
        assert_eq!(value[2][0][2][0], 3);
        assert_eq!(value[1][0][2][0], 0);

        let back: Grid = serde_json::from_value(value).unwrap();
        assert_eq!(back, grid);
    }

    #[test]
    fn grid_reads_stored_box_layout() {
        let mut boxes = vec![vec![vec![vec![serde_json::json!(0); 3]; 3]; 3]; 3];
        boxes[1][2][0][1] = serde_json::json!(9);
        boxes[2][2][2][2] = serde_json::json!({"5": true});

        let grid: Grid = serde_json::from_value(serde_json::json!(boxes)).unwrap();
        assert_eq!(grid.get(CellId::new(7, 3).unwrap()), &Cell::Digit(9));
        assert_eq!(
            grid.get(CellId::new(8, 8).unwrap()),
            &Cell::Notes(Notes::new().toggled(5))
        );
        assert!(serde_json::from_str::<Grid>("[[1,2,3]]").is_err());
    }
}
