//! Run the cheat heuristic over a saved game.

use anyhow::{Context, Result};
use std::path::Path;
use sudoku_core::session_is_cheated;
use sudoku_types::{GameState, LocalSnapshot};

/// Run the cheat command.
pub async fn run(file: &Path) -> Result<()> {
    let state = load(file).await?;
    let verdict = if session_is_cheated(&state) {
        "suspicious"
    } else {
        "clean"
    };
    println!("{}: {}", file.display(), verdict);
    Ok(())
}

/// Read a game state, bare or wrapped in a local store record.
async fn load(file: &Path) -> Result<GameState> {
    let contents = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    if let Ok(snapshot) = serde_json::from_str::<LocalSnapshot<GameState>>(&contents) {
        return Ok(snapshot.state);
    }
    serde_json::from_str(&contents).context("Invalid game state")
}
