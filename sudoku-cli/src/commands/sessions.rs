//! List sessions in the local store.

use anyhow::{Context, Result};
use std::path::Path;
use sudoku_client::{FileBackend, LocalStore, StateKind, StorageConfig};
use sudoku_core::{completion_percentage, format_time};
use sudoku_types::{GameState, TimerRecord, Timestamp};

/// Run the sessions command.
pub fn run(data_dir: &Path, config: &StorageConfig) -> Result<()> {
    let backend = FileBackend::open(data_dir)
        .with_context(|| format!("Failed to open local store at {}", data_dir.display()))?;
    let store = LocalStore::new(backend, config);
    print!("{}", report(&store, Timestamp::now()));
    Ok(())
}

/// One line per stored puzzle, newest first.
pub fn report(store: &LocalStore<FileBackend>, now: Timestamp) -> String {
    let sessions = store.list::<GameState>(StateKind::Puzzle, now);
    if sessions.is_empty() {
        return "No saved sessions.\n".to_string();
    }

    let mut out = String::new();
    for (id, snapshot) in sessions {
        let state = &snapshot.state;
        let progress = completion_percentage(&state.initial, &state.solution, Some(state.current()));
        let status = match state.completed {
            Some(completed) => format!("completed in {}", format_time(completed.seconds)),
            None => {
                let elapsed = store
                    .get::<TimerRecord>(&id, StateKind::Timer)
                    .map_or(0, |timer| timer.state.elapsed_seconds());
                format!("in progress, {}", format_time(elapsed))
            }
        };
        out.push_str(&format!(
            "{:<32} {:>3}%  {:<24} {}\n",
            id.as_str(),
            progress,
            status,
            format_age(now, snapshot.last_updated)
        ));
    }
    out
}

/// Format the time since `then` as a human-readable string.
fn format_age(now: Timestamp, then: Timestamp) -> String {
    let diff = now.saturating_since(then).as_secs();

    if diff < 60 {
        "just now".to_string()
    } else if diff < 3600 {
        format!("{} minutes ago", diff / 60)
    } else if diff < 86400 {
        format!("{} hours ago", diff / 3600)
    } else {
        format!("{} days ago", diff / 86400)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sudoku_types::{Cell, CellId, CompletionRecord, Grid, Metadata, SessionId};
    use tempfile::tempdir;

    const SOLUTION: &str =
        "534678912672195348198342567859761423426853791713924856961537284287419635345286179";
    const NOW: u64 = 1_700_000_000;

    fn state(solved: bool) -> GameState {
        let solution = Grid::from_text(SOLUTION).unwrap();
        let initial = solution.with_cell(CellId::ORIGIN, Cell::Empty);
        let mut state = GameState::new(initial, solution.clone(), Metadata::default());
        if solved {
            state.answer_stack.push(solution);
            state.completed = Some(CompletionRecord {
                at: Timestamp::from_secs(NOW - 7_200),
                seconds: 125,
            });
        }
        state
    }

    fn store(dir: &Path) -> LocalStore<FileBackend> {
        LocalStore::new(FileBackend::open(dir).unwrap(), &StorageConfig::default())
    }

    #[test]
    fn lists_newest_first() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        let old = SessionId::new("sudoku-old");
        let new = SessionId::new("sudoku-new");
        store.save(&old, StateKind::Puzzle, &state(true), Timestamp::from_secs(NOW - 7_200));
        store.save(&new, StateKind::Puzzle, &state(false), Timestamp::from_secs(NOW - 10));
        let timer = TimerRecord {
            seconds: 61,
            ..TimerRecord::default()
        };
        store.save(&new, StateKind::Timer, &timer, Timestamp::from_secs(NOW - 10));

        let out = report(&store, Timestamp::from_secs(NOW));
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("sudoku-new"));
        assert!(lines[0].contains("0%"));
        assert!(lines[0].contains("in progress, 1:01"));
        assert!(lines[0].ends_with("just now"));
        assert!(lines[1].contains("100%"));
        assert!(lines[1].contains("completed in 2:05"));
        assert!(lines[1].ends_with("2 hours ago"));
    }

    #[test]
    fn empty_store() {
        let dir = tempdir().unwrap();
        assert_eq!(report(&store(dir.path()), Timestamp::from_secs(NOW)), "No saved sessions.\n");
    }

    #[test]
    fn run_creates_the_data_dir() {
        let dir = tempdir().unwrap();
        let data_dir = dir.path().join("data");
        run(&data_dir, &StorageConfig::default()).unwrap();
        assert!(data_dir.exists());
    }

    #[test]
    fn format_age_works() {
        let now = Timestamp::from_secs(NOW);
        assert_eq!(format_age(now, now), "just now");
        assert!(format_age(now, Timestamp::from_secs(NOW - 120)).contains("minutes"));
        assert!(format_age(now, Timestamp::from_secs(NOW - 7_200)).contains("hours"));
        assert!(format_age(now, Timestamp::from_secs(NOW - 172_800)).contains("days"));
    }
}
