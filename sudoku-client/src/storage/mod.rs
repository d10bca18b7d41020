//! Local storage for sessions.
//!
//! [`LocalStore`] keeps timestamped records in a synchronous key-value
//! backend. Backends only move strings around; keys, envelopes, purging and
//! quota recovery live in the store.

mod file;
mod local;
mod memory;

pub use file::FileBackend;
pub use local::{LocalStore, DAILY_ACTIONS_KEY};
pub use memory::MemoryBackend;

use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend has no room for the write.
    #[error("storage quota exceeded")]
    QuotaExceeded,

    /// The key cannot be used by this backend.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A synchronous string key-value store.
pub trait KeyValueBackend: Send + Sync {
    /// Read one value.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write one value, replacing any previous one.
    ///
    /// Returns [`StoreError::QuotaExceeded`] when the backend is full.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete one value. Deleting a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Every key currently stored.
    fn keys(&self) -> Result<Vec<String>, StoreError>;
}

/// Kind of record kept per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKind {
    /// The game state, keyed by the bare session id.
    Puzzle,
    /// The timer, keyed by session id + `-timer`.
    Timer,
}

impl StateKind {
    /// Every kind, puzzle first.
    pub const ALL: [StateKind; 2] = [StateKind::Puzzle, StateKind::Timer];

    /// Key suffix; puzzles have none.
    pub fn suffix(self) -> Option<&'static str> {
        match self {
            StateKind::Puzzle => None,
            StateKind::Timer => Some("-timer"),
        }
    }
}
