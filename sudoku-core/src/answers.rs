//! Answer history with undo and redo.
//!
//! The stack is never empty: its first entry is the grid the session started
//! from, which can never be undone.

use sudoku_types::Grid;

/// Answer snapshots plus the redo buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerStack {
    entries: Vec<Grid>,
    redo: Vec<Grid>,
}

impl AnswerStack {
    /// A stack holding only `initial`.
    pub fn new(initial: Grid) -> Self {
        Self {
            entries: vec![initial],
            redo: Vec::new(),
        }
    }

    /// Restore persisted entries; an empty list falls back to `initial`.
    pub fn from_entries(entries: Vec<Grid>, initial: &Grid) -> Self {
        if entries.is_empty() {
            return Self::new(initial.clone());
        }
        Self {
            entries,
            redo: Vec::new(),
        }
    }

    /// The current answer.
    pub fn current(&self) -> &Grid {
        // Never empty: every constructor and mutation keeps one entry.
        &self.entries[self.entries.len() - 1]
    }

    /// The entry before the current one.
    pub fn previous(&self) -> Option<&Grid> {
        self.entries.len().checked_sub(2).map(|i| &self.entries[i])
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[Grid] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a new answer. Clears the redo buffer.
    pub fn push(&mut self, grid: Grid) {
        self.entries.push(grid);
        self.redo.clear();
    }

    /// Whether [`undo`](Self::undo) would do anything.
    pub fn can_undo(&self) -> bool {
        self.entries.len() >= 2
    }

    /// Whether [`redo`](Self::redo) would do anything.
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Move the current answer to the redo buffer.
    pub fn undo(&mut self) -> bool {
        if !self.can_undo() {
            return false;
        }
        if let Some(last) = self.entries.pop() {
            self.redo.push(last);
        }
        true
    }

    /// Restore the most recently undone answer.
    pub fn redo(&mut self) -> bool {
        match self.redo.pop() {
            Some(grid) => {
                self.entries.push(grid);
                true
            }
            None => false,
        }
    }

    /// Drop all history and start again from `initial`.
    pub fn reset(&mut self, initial: Grid) {
        self.entries = vec![initial];
        self.redo.clear();
    }
}
