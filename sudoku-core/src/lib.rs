//! # sudoku-core
//!
//! Pure logic for the sudoku sync engine (no I/O, instant tests).
//!
//! This crate implements the game-state rules, the timer state machine, the
//! reconciliation decision and the scoring engine without any network or
//! disk I/O.
//!
//! ## Design Philosophy
//!
//! Everything here takes input and produces output without side effects:
//! - Clocks are passed in as [`Timestamp`](sudoku_types::Timestamp) values
//! - Storage results are passed in as plain values
//! - Decisions come back as enums for the caller to act on
//!
//! The actual I/O (local store, remote store, timers) is performed by
//! `sudoku-client`, which interprets the decisions made here.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod answers;
pub mod cell_ref;
pub mod cheat;
pub mod leaderboard;
pub mod poll;
pub mod reconcile;
pub mod save;
pub mod scoring;
pub mod session;
pub mod timer;
pub mod validation;

pub use answers::AnswerStack;
pub use cell_ref::resolve_cell_id;
pub use cheat::{is_cheated, session_is_cheated};
pub use leaderboard::{build_leaderboard, format_time, rank, username_for, LeaderboardEntry};
pub use poll::{PollConditions, PollPolicy};
pub use reconcile::{reconcile, Reconciliation, RemoteCopy};
pub use save::{classify_edit, SavePlan, SavePolicy, SaveTracker, SaveTrigger};
pub use scoring::{score, Score, ScoreBreakdown, ScoreStats, ScoringConfig, SpeedTier};
pub use session::{EditError, EditOutcome, PuzzleSession};
pub use timer::{PauseReason, Timer, TimerPhase};
pub use validation::{check_cell, check_grid, completion_percentage, GridCheck, Validation};
