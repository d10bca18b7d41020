//! Competitive score from a user's completed sessions.
//!
//! Each completed, untampered session inside the scoring window earns:
//! - a flat volume bonus
//! - a base amount by provenance (daily, book, scanned)
//! - a difficulty bonus of `base × (multiplier − 1)` for daily and book puzzles
//! - a speed bonus from the first threshold the solve time fits under
//! - a racing bonus per other participant who finished the same puzzle slower
//!
//! Racing compares every scored session against every other participant, so
//! the cost is O(sessions × participants). That is fine for a friend group.

use crate::cheat::session_is_cheated;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use sudoku_types::{Difficulty, Provenance, RemoteSnapshot, Timestamp, UserId};

/// A speed bonus threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeedTier {
    /// Solve time in seconds, inclusive.
    pub max_seconds: u64,
    /// Points awarded.
    pub bonus: u64,
}

/// Scoring constants.
///
/// Difficulty multipliers are in hundredths (`120` = ×1.2) so every bonus
/// is an exact integer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Points per qualifying puzzle.
    pub volume_per_puzzle: u64,
    /// Base for the puzzle of the day.
    pub daily_base: u64,
    /// Base for book puzzles.
    pub book_base: u64,
    /// Base for scanned puzzles.
    pub scanned_base: u64,
    /// Multiplier per difficulty, in hundredths. Missing labels count as 100.
    pub difficulty_multipliers: BTreeMap<Difficulty, u64>,
    /// Speed thresholds, checked in order.
    pub speed_tiers: Vec<SpeedTier>,
    /// Points per slower participant.
    pub racing_bonus_per_person: u64,
    /// Only sessions updated within this many days count.
    pub window_days: u64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        let difficulty_multipliers = [
            (Difficulty::Simple, 100),
            (Difficulty::Easy, 120),
            (Difficulty::Intermediate, 150),
            (Difficulty::Expert, 200),
            (Difficulty::VeryEasy, 100),
            (Difficulty::ModeratelyEasy, 130),
            (Difficulty::Moderate, 140),
            (Difficulty::ModeratelyHard, 160),
            (Difficulty::Hard, 180),
            (Difficulty::Vicious, 250),
            (Difficulty::Fiendish, 280),
            (Difficulty::Devilish, 320),
            (Difficulty::Hell, 360),
            (Difficulty::BeyondHell, 400),
        ]
        .into_iter()
        .collect();

        Self {
            volume_per_puzzle: 10,
            daily_base: 100,
            book_base: 150,
            scanned_base: 75,
            difficulty_multipliers,
            speed_tiers: vec![
                SpeedTier { max_seconds: 180, bonus: 500 },
                SpeedTier { max_seconds: 300, bonus: 300 },
                SpeedTier { max_seconds: 600, bonus: 150 },
                SpeedTier { max_seconds: 1200, bonus: 50 },
            ],
            racing_bonus_per_person: 25,
            window_days: 30,
        }
    }
}

impl ScoringConfig {
    /// Multiplier in hundredths for `difficulty`; 100 when unknown.
    pub fn multiplier(&self, difficulty: Option<Difficulty>) -> u64 {
        difficulty
            .and_then(|d| self.difficulty_multipliers.get(&d).copied())
            .unwrap_or(100)
    }

    /// Bonus for a solve time; 0 when slower than every tier.
    pub fn speed_bonus(&self, seconds: u64) -> u64 {
        self.speed_tiers
            .iter()
            .find(|tier| seconds <= tier.max_seconds)
            .map_or(0, |tier| tier.bonus)
    }

    fn window_start(&self, now: Timestamp) -> Timestamp {
        now.minus(Duration::from_secs(self.window_days * 24 * 60 * 60))
    }
}

/// Points by category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    /// Volume bonus.
    pub volume: u64,
    /// Daily puzzle bases.
    pub daily: u64,
    /// Book puzzle bases.
    pub book: u64,
    /// Scanned puzzle bases.
    pub scanned: u64,
    /// Extra points from difficulty multipliers.
    pub difficulty_bonus: u64,
    /// Speed bonuses.
    pub speed: u64,
    /// Racing bonuses.
    pub racing: u64,
}

impl ScoreBreakdown {
    /// Sum of every category.
    pub fn total(&self) -> u64 {
        self.volume
            + self.daily
            + self.book
            + self.scanned
            + self.difficulty_bonus
            + self.speed
            + self.racing
    }
}

/// Aggregates collected while scoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreStats {
    /// Qualifying puzzles.
    pub total_puzzles: u64,
    /// Of which daily.
    pub daily_puzzles: u64,
    /// Of which book.
    pub book_puzzles: u64,
    /// Of which scanned.
    pub scanned_puzzles: u64,
    /// Mean solve time in seconds; 0 with no puzzles.
    pub average_time: f64,
    /// Fastest solve in seconds; 0 with no puzzles.
    pub fastest_time: u64,
    /// Participants beaten, summed over puzzles.
    pub racing_wins: u64,
}

/// A user's score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    /// Points by category.
    pub breakdown: ScoreBreakdown,
    /// Aggregates.
    pub stats: ScoreStats,
}

fn puzzle_identity(session: &RemoteSnapshot) -> &str {
    session.state.metadata.puzzle_identity(&session.session_id)
}

/// Participants who finished the puzzle of `session` strictly slower.
///
/// Only each participant's first completed attempt at the puzzle counts.
fn racing_wins(
    session: &RemoteSnapshot,
    seconds: u64,
    participants: &BTreeMap<UserId, Vec<RemoteSnapshot>>,
    user_id: &UserId,
) -> u64 {
    let puzzle = puzzle_identity(session);
    participants
        .iter()
        .filter(|(participant, _)| *participant != user_id)
        .filter_map(|(_, sessions)| {
            sessions
                .iter()
                .find(|other| puzzle_identity(other) == puzzle && other.state.is_completed())
                .and_then(|other| other.state.completed)
        })
        .filter(|theirs| seconds < theirs.seconds)
        .count() as u64
}

/// Score `user_id`'s `sessions` against every participant's sessions.
///
/// `participants` may include `user_id`; their own sessions are never raced.
pub fn score(
    sessions: &[RemoteSnapshot],
    participants: &BTreeMap<UserId, Vec<RemoteSnapshot>>,
    user_id: &UserId,
    config: &ScoringConfig,
    now: Timestamp,
) -> Score {
    let window_start = config.window_start(now);
    let mut breakdown = ScoreBreakdown::default();
    let mut stats = ScoreStats::default();
    let mut total_time = 0u64;
    let mut fastest: Option<u64> = None;

    let qualifying = sessions.iter().filter(|session| {
        session.updated_at >= window_start && !session_is_cheated(&session.state)
    });

    for session in qualifying {
        let Some(completed) = session.state.completed else {
            continue;
        };
        let seconds = completed.seconds;

        stats.total_puzzles += 1;
        total_time += seconds;
        fastest = Some(fastest.map_or(seconds, |f| f.min(seconds)));
        breakdown.volume += config.volume_per_puzzle;

        let metadata = &session.state.metadata;
        let (base, multiplier) = match metadata.provenance() {
            Provenance::Daily => {
                stats.daily_puzzles += 1;
                breakdown.daily += config.daily_base;
                (config.daily_base, config.multiplier(metadata.parsed_difficulty()))
            }
            Provenance::Book => {
                stats.book_puzzles += 1;
                breakdown.book += config.book_base;
                (config.book_base, config.multiplier(metadata.parsed_difficulty()))
            }
            Provenance::Scanned => {
                stats.scanned_puzzles += 1;
                breakdown.scanned += config.scanned_base;
                (config.scanned_base, 100)
            }
            Provenance::Unknown => (0, 100),
        };
        breakdown.difficulty_bonus += base * multiplier.saturating_sub(100) / 100;
        breakdown.speed += config.speed_bonus(seconds);

        let wins = racing_wins(session, seconds, participants, user_id);
        stats.racing_wins += wins;
        breakdown.racing += wins * config.racing_bonus_per_person;
    }

    if stats.total_puzzles > 0 {
        stats.average_time = total_time as f64 / stats.total_puzzles as f64;
    }
    stats.fastest_time = fastest.unwrap_or(0);

    Score { breakdown, stats }
}
