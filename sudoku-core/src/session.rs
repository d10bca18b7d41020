//! In-memory state of one puzzle session and the rules for changing it.
//!
//! [`PuzzleSession`] owns the answer stack, the redo buffer, the timer, the
//! selection and the validation overlay. It decides whether an operation is
//! allowed and what kind of save it calls for; it never touches storage.

use crate::answers::AnswerStack;
use crate::save::{classify_edit, SaveTrigger};
use crate::timer::{PauseReason, Timer};
use crate::validation::{check_cell, check_grid, Validation};
use std::time::Duration;
use sudoku_types::{
    Cell, CellId, CompletionRecord, GameState, Grid, Metadata, SessionId, Timestamp, TimerRecord,
    TypesError,
};
use thiserror::Error;

/// Reasons an operation is refused.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EditError {
    /// No cell is selected.
    #[error("no cell selected")]
    NoSelection,

    /// The selected cell was given in the puzzle.
    #[error("cell {0} is given and cannot be changed")]
    GivenCell(CellId),

    /// The puzzle is already solved.
    #[error("puzzle already completed")]
    Completed,

    /// Only the initial grid is left.
    #[error("nothing to undo")]
    NothingToUndo,

    /// The redo buffer is empty.
    #[error("nothing to redo")]
    NothingToRedo,

    /// Not a digit.
    #[error(transparent)]
    Value(#[from] TypesError),
}

/// What an accepted operation changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditOutcome {
    /// Kind of save the change calls for.
    pub trigger: SaveTrigger,
    /// This operation completed the puzzle.
    pub completed_now: bool,
}

impl EditOutcome {
    fn history(completed_now: bool) -> Self {
        Self {
            trigger: SaveTrigger::History,
            completed_now,
        }
    }
}

/// One user's attempt at one puzzle.
#[derive(Debug, Clone)]
pub struct PuzzleSession {
    session_id: SessionId,
    initial: Grid,
    solution: Grid,
    metadata: Metadata,
    answers: AnswerStack,
    completed: Option<CompletionRecord>,
    timer: Timer,
    selected: Option<CellId>,
    last_selection: Timestamp,
    validation: Option<Validation>,
}

impl PuzzleSession {
    /// A fresh session on `initial`.
    pub fn new(session_id: SessionId, initial: Grid, solution: Grid, metadata: Metadata) -> Self {
        Self {
            session_id,
            answers: AnswerStack::new(initial.clone()),
            initial,
            solution,
            metadata,
            completed: None,
            timer: Timer::new(),
            selected: None,
            last_selection: Timestamp::ZERO,
            validation: None,
        }
    }

    /// Replace answers and completion from a stored copy and restart the timer.
    ///
    /// A completed copy leaves the timer stopped at its recorded value.
    pub fn restore(&mut self, state: &GameState, timer: Option<TimerRecord>, now: Timestamp, countdown: u32) {
        self.answers = AnswerStack::from_entries(state.answer_stack.clone(), &self.initial);
        self.completed = state.completed;
        self.validation = None;
        self.last_selection = now;

        if self.completed.is_some() {
            self.selected = None;
            let mut stopped = timer.unwrap_or(self.timer.record());
            stopped.stopped = true;
            self.timer = Timer::from_record(stopped);
        } else {
            self.timer = Timer::new();
            self.timer.start_session(timer, now, countdown);
        }
    }

    /// The full state, timer included.
    pub fn to_game_state(&self) -> GameState {
        GameState {
            answer_stack: self.answers.entries().to_vec(),
            initial: self.initial.clone(),
            solution: self.solution.clone(),
            completed: self.completed,
            metadata: self.metadata.clone(),
            timer: Some(self.timer.record()),
        }
    }

    /// Session key.
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// The puzzle as given.
    pub fn initial(&self) -> &Grid {
        &self.initial
    }

    /// The solution.
    pub fn solution(&self) -> &Grid {
        &self.solution
    }

    /// Provenance and difficulty.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// The current answer.
    pub fn current(&self) -> &Grid {
        self.answers.current()
    }

    /// Answer history and redo buffer.
    pub fn answers(&self) -> &AnswerStack {
        &self.answers
    }

    /// The completion record, once solved.
    pub fn completed(&self) -> Option<CompletionRecord> {
        self.completed
    }

    /// The timer.
    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    /// Mutable timer, for ticks and visibility changes.
    pub fn timer_mut(&mut self) -> &mut Timer {
        &mut self.timer
    }

    /// The selected cell.
    pub fn selected(&self) -> Option<CellId> {
        self.selected
    }

    /// The validation overlay, when shown.
    pub fn validation(&self) -> Option<&Validation> {
        self.validation.as_ref()
    }

    /// Undo is disabled below two stack entries.
    pub fn is_undo_disabled(&self) -> bool {
        !self.answers.can_undo()
    }

    /// Redo is disabled with an empty redo buffer.
    pub fn is_redo_disabled(&self) -> bool {
        !self.answers.can_redo()
    }

    /// The digit in the selected cell.
    pub fn selected_answer(&self) -> Option<u8> {
        self.selected.and_then(|id| self.current().get(id).as_digit())
    }

    /// Whether the selected cell has any note marked.
    pub fn selected_has_notes(&self) -> bool {
        self.selected
            .and_then(|id| self.current().get(id).as_notes())
            .is_some_and(|notes| notes.any_marked())
    }

    /// Change the selection. Ignored once complete.
    ///
    /// Any selection change counts as activity and lifts an inactivity pause.
    pub fn select(&mut self, cell: Option<CellId>, now: Timestamp) -> bool {
        if self.completed.is_some() {
            return false;
        }
        self.last_selection = now;
        self.timer.resume(PauseReason::Inactivity, now);
        if self.selected != cell {
            self.selected = cell;
            self.validation = None;
        }
        true
    }

    /// Pause for inactivity if the selection has not changed within `window`.
    pub fn check_inactivity(&mut self, now: Timestamp, window: Duration) -> bool {
        self.timer.check_inactivity(self.last_selection, now, window)
    }

    /// Place `value` in the selected cell.
    pub fn set_answer(&mut self, value: Cell, now: Timestamp) -> Result<EditOutcome, EditError> {
        let cell = self.editable_cell()?;
        let next = self.current().with_cell(cell, value);
        let completed_now = self.push(next, now);
        let correct = classify_edit(
            &self.initial,
            &self.solution,
            self.answers.previous(),
            self.answers.current(),
            cell,
        );
        Ok(EditOutcome {
            trigger: SaveTrigger::Edit { correct },
            completed_now,
        })
    }

    /// Flip `digit` in the selected cell's notes. A cell holding a digit
    /// starts from empty notes.
    pub fn toggle_note(&mut self, digit: u8, now: Timestamp) -> Result<EditOutcome, EditError> {
        if !(1..=9).contains(&digit) {
            return Err(TypesError::InvalidDigit(digit).into());
        }
        let cell = self.editable_cell()?;
        let notes = self
            .current()
            .get(cell)
            .as_notes()
            .cloned()
            .unwrap_or_default();
        self.set_answer(Cell::Notes(notes.toggled(digit)), now)
    }

    /// Number-pad input: a note in notes mode, otherwise a digit (`0` clears).
    pub fn select_number(&mut self, number: u8, notes_mode: bool, now: Timestamp) -> Result<EditOutcome, EditError> {
        if number != 0 && notes_mode {
            self.toggle_note(number, now)
        } else {
            self.set_answer(Cell::digit(number)?, now)
        }
    }

    /// Move the current answer to the redo buffer.
    pub fn undo(&mut self) -> Result<EditOutcome, EditError> {
        self.ensure_incomplete()?;
        if !self.answers.undo() {
            return Err(EditError::NothingToUndo);
        }
        self.validation = None;
        Ok(EditOutcome::history(false))
    }

    /// Restore the most recently undone answer.
    pub fn redo(&mut self) -> Result<EditOutcome, EditError> {
        self.ensure_incomplete()?;
        if !self.answers.redo() {
            return Err(EditError::NothingToRedo);
        }
        self.validation = None;
        Ok(EditOutcome::history(false))
    }

    /// Append the solution, completing the puzzle.
    pub fn reveal(&mut self, now: Timestamp) -> Result<EditOutcome, EditError> {
        self.ensure_incomplete()?;
        let completed_now = self.push(self.solution.clone(), now);
        Ok(EditOutcome::history(completed_now))
    }

    /// Back to the initial grid with a new timer session.
    pub fn reset(&mut self, now: Timestamp, countdown: u32) -> Result<EditOutcome, EditError> {
        self.ensure_incomplete()?;
        self.answers.reset(self.initial.clone());
        self.validation = None;
        self.timer.start_session(None, now, countdown);
        Ok(EditOutcome::history(false))
    }

    /// Show or hide the full-grid validation overlay.
    pub fn validate_grid(&mut self) {
        self.validation = match self.validation {
            Some(_) => None,
            None => Some(check_grid(&self.initial, &self.solution, self.current()).validation),
        };
    }

    /// Show or hide validation of the selected cell.
    pub fn validate_cell(&mut self) {
        let Some(cell) = self.selected else {
            return;
        };
        self.validation = match self.validation {
            Some(_) => None,
            None => Some(check_cell(cell, &self.initial, &self.solution, self.current())),
        };
    }

    fn ensure_incomplete(&self) -> Result<(), EditError> {
        match self.completed {
            Some(_) => Err(EditError::Completed),
            None => Ok(()),
        }
    }

    fn editable_cell(&self) -> Result<CellId, EditError> {
        self.ensure_incomplete()?;
        let cell = self.selected.ok_or(EditError::NoSelection)?;
        if self.initial.get(cell).is_filled() {
            return Err(EditError::GivenCell(cell));
        }
        Ok(cell)
    }

    /// Append `next`; when it solves the puzzle, stop the timer and record
    /// completion. Returns whether this push completed the puzzle.
    fn push(&mut self, next: Grid, now: Timestamp) -> bool {
        let solved = check_grid(&self.initial, &self.solution, &next).is_complete;
        self.answers.push(next);
        self.validation = None;

        if !solved || self.completed.is_some() {
            return false;
        }
        let seconds = self.timer.stop(now);
        self.completed = Some(CompletionRecord { at: now, seconds });
        self.selected = None;
        true
    }
}
