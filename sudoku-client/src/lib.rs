//! # sudoku-sync-client
//!
//! The synchronization engine for one sudoku session, and the stores it
//! talks to.
//!
//! ```text
//! input → SyncEngine → PuzzleSession (sudoku-sync-core, pure)
//!             ├──→ LocalStore  (always, synchronous)
//!             └──→ RemoteStore (opportunistic, async)
//! ```
//!
//! Every storage or network failure is logged and folded into local-only
//! state. [`EngineError`] is only returned for operations the session
//! itself refuses.
//!
//! ## Example
//!
//! ```ignore
//! use sudoku_sync_client::{EngineConfig, LocalStore, MemoryBackend, MockRemoteStore, SyncEngine};
//!
//! let config = EngineConfig::default();
//! let local = LocalStore::new(MemoryBackend::new(), &config.storage);
//! let engine = SyncEngine::builder(session, local, MockRemoteStore::new())
//!     .config(config)
//!     .build();
//!
//! engine.load().await;
//! engine.select(Some(cell)).await?;
//! engine.set_answer(Cell::Digit(4)).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod config;
pub mod directory;
pub mod engine;
pub mod gate;
pub mod remote;
pub mod social;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, EngineConfig, PollingConfig, RemoteConfig, StorageConfig, TimerConfig};
pub use directory::{friend_ids, FriendDirectory, StaticDirectory};
pub use engine::{EngineError, EngineSnapshot, PollTicket, SessionTasks, SyncEngine, SyncEngineBuilder};
pub use gate::{ActionGate, AllowAll, DailyQuotaGate, GatedAction};
pub use remote::{HttpRemoteStore, ListQuery, MockRemoteStore, RemoteError, RemoteStore};
pub use social::{FriendSessions, UserSessions};
pub use storage::{FileBackend, DAILY_ACTIONS_KEY, KeyValueBackend, LocalStore, MemoryBackend, StateKind, StoreError};
