//! # sudoku-types
//!
//! Data model for the sudoku game-state sync and scoring engine.
//!
//! This crate provides the foundational types used across all crates:
//! - [`Cell`], [`Notes`], [`Grid`], [`CellId`] - The 9×9 puzzle grid
//! - [`Timestamp`] - One normalized clock shared by the local and remote stores
//! - [`GameState`], [`CompletionRecord`], [`TimerRecord`], [`Metadata`] - Session state
//! - [`LocalSnapshot`], [`RemoteSnapshot`] - The two timestamped copies of a session
//! - [`SessionId`], [`UserId`], [`PartyId`] - Identity types
//! - [`TypesError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod grid;
mod ids;
mod snapshot;
mod state;
pub mod timestamp;

pub use error::TypesError;
pub use grid::{Cell, CellId, Direction, Grid, Notes, BOX_SIZE, GRID_SIZE};
pub use ids::{PartyId, SessionId, UserId};
pub use snapshot::{
    LocalSnapshot, Member, MemberSession, Party, RemoteSnapshot, SaveRequest, SessionParties,
    SessionParty,
};
pub use state::{
    ActiveInterval, CompletionRecord, Difficulty, GameState, Metadata, Provenance, TimerRecord,
};
pub use timestamp::Timestamp;
