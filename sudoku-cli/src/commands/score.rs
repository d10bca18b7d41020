//! Build the leaderboard from a JSON export.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use sudoku_core::{build_leaderboard, format_time, LeaderboardEntry, ScoringConfig};
use sudoku_types::{Party, RemoteSnapshot, Timestamp, UserId};

/// Sessions and parties as exported from the remote store.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Export {
    /// Whose leaderboard this is.
    pub user_id: UserId,
    /// Display name for the current user.
    #[serde(default)]
    pub user_name: Option<String>,
    /// Parties the user belongs to.
    #[serde(default)]
    pub parties: Vec<Party>,
    /// The user's own sessions.
    #[serde(default)]
    pub sessions: Vec<RemoteSnapshot>,
    /// Friends' sessions, in display order.
    #[serde(default)]
    pub friends: Vec<FriendExport>,
}

/// One friend's sessions.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendExport {
    /// The friend.
    pub user_id: UserId,
    /// Their sessions.
    #[serde(default)]
    pub sessions: Vec<RemoteSnapshot>,
}

/// Run the score command.
pub async fn run(file: &Path, now: Option<u64>, json: bool) -> Result<()> {
    let contents = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let export: Export = serde_json::from_str(&contents).context("Invalid export file")?;

    let now = now.map_or_else(Timestamp::now, Timestamp::from_secs);
    let entries = leaderboard(&export, now);

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        print!("{}", render(&entries));
    }
    Ok(())
}

/// Score everyone in `export` as of `now`.
pub fn leaderboard(export: &Export, now: Timestamp) -> Vec<LeaderboardEntry> {
    let friends: Vec<(UserId, Vec<RemoteSnapshot>)> = export
        .friends
        .iter()
        .map(|friend| (friend.user_id.clone(), friend.sessions.clone()))
        .collect();
    build_leaderboard(
        &export.user_id,
        export.user_name.as_deref(),
        &export.sessions,
        &friends,
        &export.parties,
        &ScoringConfig::default(),
        now,
    )
}

/// Render the leaderboard as a table.
pub fn render(entries: &[LeaderboardEntry]) -> String {
    if entries.is_empty() {
        return "No completed puzzles in the scoring window.\n".to_string();
    }

    let mut out = format!(
        "{:<4} {:<20} {:>7} {:>7} {:>8} {:>8} {:>6}\n",
        "#", "Name", "Score", "Puzzles", "Average", "Fastest", "Races"
    );
    for (i, entry) in entries.iter().enumerate() {
        out.push_str(&format!(
            "{:<4} {:<20} {:>7} {:>7} {:>8} {:>8} {:>6}\n",
            i + 1,
            entry.username,
            entry.total_score,
            entry.stats.total_puzzles,
            format_time(entry.stats.average_time.round() as u64),
            format_time(entry.stats.fastest_time),
            entry.stats.racing_wins,
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sudoku_types::{Cell, CellId, CompletionRecord, GameState, Grid, Member, Metadata, PartyId, SessionId};
    use tempfile::tempdir;

    const NOW: u64 = 1_700_000_000;

    fn completed(puzzle: &str, seconds: u64) -> RemoteSnapshot {
        let metadata = Metadata {
            difficulty: Some("easy".into()),
            sudoku_id: Some(format!("sudokuoftheday-{puzzle}")),
            ..Metadata::default()
        };
        let mut state = GameState::new(Grid::empty(), Grid::empty(), metadata);
        state
            .answer_stack
            .push(Grid::empty().with_cell(CellId::ORIGIN, Cell::Digit(1)));
        state.completed = Some(CompletionRecord {
            at: Timestamp::from_secs(NOW - 60),
            seconds,
        });
        RemoteSnapshot {
            session_id: SessionId::new(format!("sudoku-{puzzle}")),
            state,
            updated_at: Timestamp::from_secs(NOW - 60),
            parties: None,
        }
    }

    fn export_json() -> serde_json::Value {
        let party = Party {
            party_id: PartyId::new("p1"),
            party_name: "Friends".into(),
            created_by: UserId::new("me"),
            members: vec![
                Member {
                    user_id: UserId::new("me"),
                    member_nickname: "Me".into(),
                },
                Member {
                    user_id: UserId::new("ada"),
                    member_nickname: "Ada".into(),
                },
            ],
        };
        json!({
            "userId": "me",
            "userName": "Sam",
            "parties": [party],
            "sessions": [completed("1", 200)],
            "friends": [
                { "userId": "ada", "sessions": [completed("1", 95)] },
                { "userId": "idle" }
            ]
        })
    }

    #[test]
    fn faster_friend_ranks_first() {
        let export: Export = serde_json::from_value(export_json()).unwrap();
        let board = leaderboard(&export, Timestamp::from_secs(NOW));

        let names: Vec<_> = board.iter().map(|e| e.username.as_str()).collect();
        assert_eq!(names, ["Ada", "Sam"]);
        assert_eq!(board[0].stats.racing_wins, 1);
        assert_eq!(board[1].stats.racing_wins, 0);
    }

    #[test]
    fn table_has_one_row_per_entry() {
        let export: Export = serde_json::from_value(export_json()).unwrap();
        let table = render(&leaderboard(&export, Timestamp::from_secs(NOW)));

        assert_eq!(table.lines().count(), 3);
        assert!(table.lines().nth(1).unwrap().contains("Ada"));
        assert!(table.contains("1:35"));
    }

    #[test]
    fn empty_board_says_so() {
        assert!(render(&[]).contains("No completed puzzles"));
    }

    #[tokio::test]
    async fn run_reads_the_export_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("export.json");
        tokio::fs::write(&path, export_json().to_string()).await.unwrap();

        assert!(run(&path, Some(NOW), false).await.is_ok());
        assert!(run(&path, Some(NOW), true).await.is_ok());
    }

    #[tokio::test]
    async fn invalid_export_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("export.json");
        tokio::fs::write(&path, "{}").await.unwrap();

        let err = run(&path, Some(NOW), false).await.unwrap_err();
        assert!(err.to_string().contains("Invalid export file"));
    }
}
