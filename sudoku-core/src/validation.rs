//! Cell and grid correctness against the solution.
//!
//! Given cells (filled in the initial grid) are never judged; their slot in
//! the validation overlay stays `None`.

use sudoku_types::{CellId, Grid, GRID_SIZE};

/// Per-cell verdicts: `Some(true)` correct, `Some(false)` wrong, `None` not judged.
pub type Validation = [[Option<bool>; GRID_SIZE]; GRID_SIZE];

/// Result of checking a whole grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridCheck {
    /// Verdict for every non-given cell.
    pub validation: Validation,
    /// All non-given cells are correct.
    pub is_complete: bool,
}

impl GridCheck {
    /// The verdict for one cell.
    pub fn get(&self, id: CellId) -> Option<bool> {
        self.validation[id.row()][id.col()]
    }
}

fn verdict(initial: &Grid, solution: &Grid, answer: &Grid, id: CellId) -> Option<bool> {
    if initial.get(id).is_filled() {
        return None;
    }
    Some(answer.get(id) == solution.get(id))
}

/// Check every non-given cell of `answer` against `solution`.
pub fn check_grid(initial: &Grid, solution: &Grid, answer: &Grid) -> GridCheck {
    let mut validation: Validation = [[None; GRID_SIZE]; GRID_SIZE];
    let mut is_complete = true;

    for id in CellId::all() {
        let result = verdict(initial, solution, answer, id);
        if result == Some(false) {
            is_complete = false;
        }
        validation[id.row()][id.col()] = result;
    }

    GridCheck {
        validation,
        is_complete,
    }
}

/// Check a single cell; every other slot stays `None`.
pub fn check_cell(id: CellId, initial: &Grid, solution: &Grid, answer: &Grid) -> Validation {
    let mut validation: Validation = [[None; GRID_SIZE]; GRID_SIZE];
    validation[id.row()][id.col()] = verdict(initial, solution, answer, id);
    validation
}

/// Percentage of non-given cells solved correctly, rounded.
///
/// Returns 0 without an answer and 100 when the puzzle has no open cells.
pub fn completion_percentage(initial: &Grid, solution: &Grid, latest: Option<&Grid>) -> u8 {
    let Some(latest) = latest else {
        return 0;
    };

    let mut open = 0u32;
    let mut solved = 0u32;
    for (id, cell) in initial.cells() {
        if cell.is_filled() {
            continue;
        }
        open += 1;
        let answer = latest.get(id);
        if answer.is_filled() && answer == solution.get(id) {
            solved += 1;
        }
    }

    if open == 0 {
        return 100;
    }
    ((solved as f64 / open as f64) * 100.0).round() as u8
}
