//! Ranked leaderboard across the current user and their friends.

use crate::scoring::{score, ScoreBreakdown, ScoreStats, ScoringConfig};
use serde::Serialize;
use std::collections::BTreeMap;
use sudoku_types::{Party, RemoteSnapshot, Timestamp, UserId};

/// Shown for users no party lists.
pub const UNKNOWN_USER: &str = "Unknown User";

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    /// Whose row this is.
    pub user_id: UserId,
    /// Display name.
    pub username: String,
    /// Sum of the breakdown.
    pub total_score: u64,
    /// Points by category.
    pub breakdown: ScoreBreakdown,
    /// Aggregates.
    pub stats: ScoreStats,
}

/// Drop participants without qualifying puzzles and sort by total, highest
/// first. Equal totals keep their input order.
pub fn rank(mut entries: Vec<LeaderboardEntry>) -> Vec<LeaderboardEntry> {
    entries.retain(|entry| entry.stats.total_puzzles > 0);
    entries.sort_by(|a, b| b.total_score.cmp(&a.total_score));
    entries
}

/// The nickname `user_id` has in the first party that lists them.
pub fn username_for(user_id: &UserId, parties: &[Party]) -> String {
    parties
        .iter()
        .flat_map(|party| party.members.iter())
        .find(|member| &member.user_id == user_id)
        .map_or_else(|| UNKNOWN_USER.to_string(), |member| member.member_nickname.clone())
}

/// Score the current user and every friend, then [`rank`] them.
///
/// The current user comes first, friends follow in the given order; that
/// order breaks ties. Racing compares everyone against everyone.
pub fn build_leaderboard(
    user_id: &UserId,
    user_name: Option<&str>,
    own_sessions: &[RemoteSnapshot],
    friend_sessions: &[(UserId, Vec<RemoteSnapshot>)],
    parties: &[Party],
    config: &ScoringConfig,
    now: Timestamp,
) -> Vec<LeaderboardEntry> {
    let mut participants: BTreeMap<UserId, Vec<RemoteSnapshot>> = friend_sessions.iter().cloned().collect();
    participants.insert(user_id.clone(), own_sessions.to_vec());

    let entry = |id: &UserId, username: String, sessions: &[RemoteSnapshot]| {
        let result = score(sessions, &participants, id, config, now);
        LeaderboardEntry {
            user_id: id.clone(),
            username,
            total_score: result.breakdown.total(),
            breakdown: result.breakdown,
            stats: result.stats,
        }
    };

    let mut entries = vec![entry(
        user_id,
        user_name.unwrap_or("You").to_string(),
        own_sessions,
    )];
    entries.extend(
        friend_sessions
            .iter()
            .filter(|(id, _)| id != user_id)
            .map(|(id, sessions)| entry(id, username_for(id, parties), sessions)),
    );

    rank(entries)
}

/// `m:ss`, or `0:00` for zero.
pub fn format_time(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
