//! CLI command implementations.

pub mod cheat;
pub mod check;
pub mod score;
pub mod sessions;
