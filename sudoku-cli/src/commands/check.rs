//! Validate an answer grid.

use anyhow::{Context, Result};
use sudoku_core::{check_cell, check_grid, completion_percentage, resolve_cell_id};
use sudoku_types::{Cell, CellId, Grid};

/// Run the check command. With `cell`, only that cell is judged.
pub fn run(initial: &str, solution: &str, answer: &str, cell: Option<&str>) -> Result<()> {
    let out = match cell {
        Some(cell) => cell_report(initial, solution, answer, cell)?,
        None => report(initial, solution, answer)?,
    };
    print!("{out}");
    Ok(())
}

fn parse(initial: &str, solution: &str, answer: &str) -> Result<(Grid, Grid, Grid)> {
    Ok((
        Grid::from_text(initial).context("Invalid initial grid")?,
        Grid::from_text(solution).context("Invalid solution grid")?,
        Grid::from_text(answer).context("Invalid answer grid")?,
    ))
}

/// The verdict for one `box:X,Y,cell:x,y` cell. A malformed id judges the
/// top-left cell.
pub fn cell_report(initial: &str, solution: &str, answer: &str, cell: &str) -> Result<String> {
    let (initial, solution, answer) = parse(initial, solution, answer)?;
    let id = resolve_cell_id(cell);
    let validation = check_cell(id, &initial, &solution, &answer);
    let verdict = match (validation[id.row()][id.col()], answer.get(id)) {
        (None, _) => "given",
        (Some(true), _) => "correct",
        (Some(false), Cell::Digit(_)) => "wrong",
        (Some(false), _) => "empty",
    };
    Ok(format!("{id}: {verdict}\n"))
}

/// The checked grid followed by a summary.
///
/// Given and correct cells show their digit, wrong ones `x`, empty ones `.`.
pub fn report(initial: &str, solution: &str, answer: &str) -> Result<String> {
    let (initial, solution, answer) = parse(initial, solution, answer)?;

    let check = check_grid(&initial, &solution, &answer);
    let mut out = String::new();
    for row in 0..9 {
        for col in 0..9 {
            let id = CellId::new(row, col)?;
            let mark = match (answer.get(id), check.get(id)) {
                (Cell::Digit(d), None | Some(true)) => (b'0' + d) as char,
                (Cell::Digit(_), Some(false)) => 'x',
                _ => '.',
            };
            out.push(mark);
            if col == 2 || col == 5 {
                out.push(' ');
            }
        }
        out.push('\n');
        if row == 2 || row == 5 {
            out.push('\n');
        }
    }

    let wrong = CellId::all()
        .filter(|id| answer.get(*id).is_filled() && check.get(*id) == Some(false))
        .count();
    out.push('\n');
    out.push_str(&format!(
        "Complete: {}\n",
        if check.is_complete { "yes" } else { "no" }
    ));
    out.push_str(&format!(
        "Progress: {}%\n",
        completion_percentage(&initial, &solution, Some(&answer))
    ));
    out.push_str(&format!("Wrong:    {}\n", wrong));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOLUTION: &str =
        "534678912672195348198342567859761423426853791713924856961537284287419635345286179";

    fn with(text: &str, index: usize, ch: char) -> String {
        let mut chars: Vec<char> = text.chars().collect();
        chars[index] = ch;
        chars.into_iter().collect()
    }

    #[test]
    fn solved_grid_is_complete() {
        let initial = with(SOLUTION, 2, '.');
        let out = report(&initial, SOLUTION, SOLUTION).unwrap();
        assert!(out.starts_with("534 678 912\n"));
        assert!(out.contains("Complete: yes"));
        assert!(out.contains("Progress: 100%"));
    }

    #[test]
    fn wrong_and_empty_cells_are_marked() {
        let initial = with(&with(SOLUTION, 2, '.'), 80, '.');
        let answer = with(&initial, 2, '3');
        let out = report(&initial, SOLUTION, &answer).unwrap();
        assert!(out.starts_with("53x 678 912\n"));
        assert!(out.contains("345 286 17.\n"));
        assert!(out.contains("Complete: no"));
        assert!(out.contains("Progress: 0%"));
        assert!(out.contains("Wrong:    1"));
    }

    #[test]
    fn single_cell_verdicts() {
        let initial = with(&with(SOLUTION, 2, '.'), 80, '.');
        let answer = with(&initial, 2, '3');

        // Row 0, column 2.
        let out = cell_report(&initial, SOLUTION, &answer, "box:0,0,cell:2,0").unwrap();
        assert_eq!(out, "box:0,0,cell:2,0: wrong\n");
        let out = cell_report(&initial, SOLUTION, SOLUTION, "box:0,0,cell:2,0").unwrap();
        assert_eq!(out, "box:0,0,cell:2,0: correct\n");
        let out = cell_report(&initial, SOLUTION, &answer, "box:2,2,cell:2,2").unwrap();
        assert_eq!(out, "box:2,2,cell:2,2: empty\n");
    }

    #[test]
    fn malformed_cell_falls_back_to_top_left() {
        let initial = with(SOLUTION, 2, '.');
        let out = cell_report(&initial, SOLUTION, SOLUTION, "box:4,0,cell:0,0").unwrap();
        assert_eq!(out, "box:0,0,cell:0,0: given\n");
    }

    #[test]
    fn malformed_grid_is_rejected() {
        let err = report("123", SOLUTION, SOLUTION).unwrap_err();
        assert!(err.to_string().contains("Invalid initial grid"));
    }
}
