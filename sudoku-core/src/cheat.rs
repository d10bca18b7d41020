//! Tamper heuristic for completed sessions.
//!
//! A legitimate move changes exactly one cell. When the final transition of
//! a completed session changes two or more, the answer was most likely pasted
//! in wholesale. Only the last transition is inspected: a session whose
//! injected answer was followed by an ordinary move is not flagged.

use sudoku_types::{GameState, Grid};

/// Changed cells at or above which a transition is suspicious.
pub const SUSPICIOUS_CHANGES: usize = 2;

/// Whether the last transition in `stack` changed too many cells.
///
/// False for stacks with fewer than two entries.
pub fn is_cheated(stack: &[Grid]) -> bool {
    match stack {
        [.., previous, last] => previous.differing_cells(last) >= SUSPICIOUS_CHANGES,
        _ => false,
    }
}

/// Apply [`is_cheated`] to a session; only completed sessions can be flagged.
pub fn session_is_cheated(state: &GameState) -> bool {
    state.is_completed() && is_cheated(&state.answer_stack)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sudoku_types::{Cell, CellId, CompletionRecord, Metadata, Notes, Timestamp};

    fn changed(base: &Grid, k: usize) -> Grid {
        let mut next = base.clone();
        for id in CellId::all().take(k) {
            next.set(id, Cell::Digit(9));
        }
        next
    }

    #[test]
    fn flags_only_multi_cell_transitions() {
        let base = Grid::empty();
        for k in 0..5 {
            let stack = vec![base.clone(), changed(&base, k)];
            assert_eq!(is_cheated(&stack), k >= 2, "k = {k}");
        }
    }

    #[test]
    fn short_stacks_are_never_flagged() {
        assert!(!is_cheated(&[]));
        assert!(!is_cheated(&[changed(&Grid::empty(), 10)]));
    }

    #[test]
    fn only_last_transition_counts() {
        let base = Grid::empty();
        let pasted = changed(&base, 20);
        let tidy = pasted.with_cell(CellId::new(8, 8).unwrap(), Cell::Digit(1));
        assert!(is_cheated(&[base.clone(), pasted.clone()]));
        assert!(!is_cheated(&[base, pasted, tidy]));
    }

    #[test]
    fn digit_to_notes_is_a_change() {
        let id = CellId::ORIGIN;
        let a = Grid::empty()
            .with_cell(id, Cell::Digit(5))
            .with_cell(CellId::new(0, 1).unwrap(), Cell::Digit(3));
        let b = a
            .with_cell(id, Cell::Notes([5].into_iter().collect()))
            .with_cell(CellId::new(0, 1).unwrap(), Cell::Notes(Notes::new()));
        assert!(is_cheated(&[a, b]));
    }

    #[test]
    fn incomplete_sessions_are_not_flagged() {
        let base = Grid::empty();
        let mut state = GameState::new(base.clone(), base.clone(), Metadata::default());
        state.answer_stack.push(changed(&base, 40));
        assert!(!session_is_cheated(&state));

        state.completed = Some(CompletionRecord {
            at: Timestamp::from_secs(10),
            seconds: 10,
        });
        assert!(session_is_cheated(&state));
    }
}
