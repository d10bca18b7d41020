//! Save planning: what goes to which store, and when.
//!
//! Every mutation attempts a save. The local store always receives it; the
//! remote store only hears about the first load, verified-correct edits and
//! completion. Each store gets its own tail of the answer stack.

use sudoku_types::{CellId, GameState, Grid};

/// Why a save was attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveTrigger {
    /// The session was just opened and nothing has been selected yet.
    FirstLoad,
    /// A cell was edited.
    Edit {
        /// Whether the edit placed the solution digit. See [`classify_edit`].
        correct: bool,
    },
    /// Undo, redo, reveal or reset.
    History,
}

/// Stack limits per store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavePolicy {
    /// Entries kept locally for interactive undo.
    pub local_limit: usize,
    /// Entries kept locally once complete; the cheat check needs two.
    pub completed_local_limit: usize,
    /// Entries sent to the remote store.
    pub remote_limit: usize,
}

impl Default for SavePolicy {
    fn default() -> Self {
        Self {
            local_limit: 10,
            completed_local_limit: 2,
            remote_limit: 3,
        }
    }
}

/// The states to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavePlan {
    /// State for the local store.
    pub local: GameState,
    /// State for the remote store, when this save reaches it.
    pub remote: Option<GameState>,
}

impl SavePolicy {
    /// Whether a save with `trigger` reaches the remote store.
    pub fn reaches_remote(&self, trigger: SaveTrigger, completed: bool) -> bool {
        completed
            || matches!(
                trigger,
                SaveTrigger::FirstLoad | SaveTrigger::Edit { correct: true }
            )
    }

    /// Split `state` into per-store copies.
    pub fn plan(&self, state: &GameState, trigger: SaveTrigger) -> SavePlan {
        SavePlan {
            local: self.local_copy(state),
            remote: self
                .reaches_remote(trigger, state.is_completed())
                .then(|| self.remote_copy(state)),
        }
    }

    /// The local copy: enough answers for undo, or two once complete.
    ///
    /// It carries no timer; the timer has its own local record.
    pub fn local_copy(&self, state: &GameState) -> GameState {
        let limit = if state.is_completed() {
            self.completed_local_limit
        } else {
            self.local_limit
        };
        GameState {
            answer_stack: tail(&state.answer_stack, limit),
            timer: None,
            ..state.clone()
        }
    }

    /// The remote copy: the last few answers, timer included so another
    /// device can resume.
    pub fn remote_copy(&self, state: &GameState) -> GameState {
        GameState {
            answer_stack: tail(&state.answer_stack, self.remote_limit),
            ..state.clone()
        }
    }
}

fn tail(stack: &[Grid], limit: usize) -> Vec<Grid> {
    stack[stack.len().saturating_sub(limit)..].to_vec()
}

/// Whether an edit of `cell` is verified correct: its value changed, is not
/// the given value, and equals the solution.
pub fn classify_edit(
    initial: &Grid,
    solution: &Grid,
    previous: Option<&Grid>,
    current: &Grid,
    cell: CellId,
) -> bool {
    let entered = current.get(cell);
    if previous.is_some_and(|grid| grid.get(cell) == entered) {
        return false;
    }
    initial.get(cell) != entered && solution.get(cell) == entered
}

/// Remembers the last answer actually written, to skip identical saves.
#[derive(Debug, Clone, Default)]
pub struct SaveTracker {
    last_saved: Option<Grid>,
}

impl SaveTracker {
    /// A tracker that has seen no saves.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `current` equals the last saved answer.
    pub fn is_duplicate(&self, current: &Grid) -> bool {
        self.last_saved.as_ref() == Some(current)
    }

    /// Record `current` as saved.
    pub fn record(&mut self, current: &Grid) {
        self.last_saved = Some(current.clone());
    }
}
