//! Session state: the value persisted under one session key.

use crate::error::TypesError;
use crate::grid::Grid;
use crate::ids::SessionId;
use crate::timestamp::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Marker written once when the puzzle is solved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    /// When the final correct digit was placed.
    pub at: Timestamp,
    /// Active seconds spent solving.
    pub seconds: u64,
}

/// The currently open active-time interval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveInterval {
    /// Start of the interval.
    pub start: Timestamp,
    /// Most recent tick inside the interval.
    pub last_interaction: Timestamp,
}

/// Persisted timer state.
///
/// Elapsed time is `seconds + floor((last_interaction - start) / 1000)`.
/// `seconds` holds the time folded in from earlier intervals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerRecord {
    /// Seconds accumulated from closed intervals.
    pub seconds: u64,
    /// The open interval.
    pub in_progress: ActiveInterval,
    /// Ticks left before the interval starts counting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub countdown: Option<u32>,
    /// Set once the puzzle is complete; the timer never runs again.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub stopped: bool,
}

impl TimerRecord {
    /// Total active seconds, computed from the stored wall-clock timestamps.
    pub fn elapsed_seconds(&self) -> u64 {
        let open = self
            .in_progress
            .last_interaction
            .saturating_since(self.in_progress.start);
        self.seconds + open.as_secs()
    }
}

/// Where a puzzle came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provenance {
    /// The puzzle of the day.
    Daily,
    /// A puzzle from a book.
    Book,
    /// A puzzle scanned from paper.
    Scanned,
    /// None of the above.
    Unknown,
}

/// Puzzle difficulty labels, covering daily and book puzzles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[allow(missing_docs)]
pub enum Difficulty {
    Simple,
    Easy,
    Intermediate,
    Expert,
    VeryEasy,
    ModeratelyEasy,
    Moderate,
    ModeratelyHard,
    Hard,
    Vicious,
    Fiendish,
    Devilish,
    Hell,
    BeyondHell,
}

impl Difficulty {
    /// Every label.
    pub const ALL: [Difficulty; 14] = [
        Difficulty::Simple,
        Difficulty::Easy,
        Difficulty::Intermediate,
        Difficulty::Expert,
        Difficulty::VeryEasy,
        Difficulty::ModeratelyEasy,
        Difficulty::Moderate,
        Difficulty::ModeratelyHard,
        Difficulty::Hard,
        Difficulty::Vicious,
        Difficulty::Fiendish,
        Difficulty::Devilish,
        Difficulty::Hell,
        Difficulty::BeyondHell,
    ];

    /// The wire label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Simple => "simple",
            Difficulty::Easy => "easy",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Expert => "expert",
            Difficulty::VeryEasy => "very-easy",
            Difficulty::ModeratelyEasy => "moderately-easy",
            Difficulty::Moderate => "moderate",
            Difficulty::ModeratelyHard => "moderately-hard",
            Difficulty::Hard => "hard",
            Difficulty::Vicious => "vicious",
            Difficulty::Fiendish => "fiendish",
            Difficulty::Devilish => "devilish",
            Difficulty::Hell => "hell",
            Difficulty::BeyondHell => "beyond-hell",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Difficulty::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| TypesError::UnknownDifficulty(s.to_string()))
    }
}

/// Puzzle provenance and difficulty.
///
/// The difficulty is kept as the raw label so sessions written by newer
/// clients with labels this build does not know still load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Difficulty label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    /// Puzzle id for served puzzles; daily puzzles contain `oftheday`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sudoku_id: Option<String>,
    /// Puzzle id within a book.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sudoku_book_puzzle_id: Option<String>,
    /// When the puzzle was scanned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scanned_at: Option<String>,
}

impl Metadata {
    /// Classify the puzzle. Daily wins over book, book over scanned.
    pub fn provenance(&self) -> Provenance {
        if self
            .sudoku_id
            .as_deref()
            .is_some_and(|id| id.contains("oftheday"))
        {
            Provenance::Daily
        } else if self.sudoku_book_puzzle_id.is_some() {
            Provenance::Book
        } else if self.scanned_at.is_some() {
            Provenance::Scanned
        } else {
            Provenance::Unknown
        }
    }

    /// The parsed difficulty, `None` when absent or unrecognized.
    pub fn parsed_difficulty(&self) -> Option<Difficulty> {
        self.difficulty.as_deref()?.parse().ok()
    }

    /// Identity of the puzzle across users: puzzle id, else book puzzle id,
    /// else the session id.
    pub fn puzzle_identity<'a>(&'a self, session_id: &'a SessionId) -> &'a str {
        self.sudoku_id
            .as_deref()
            .or(self.sudoku_book_puzzle_id.as_deref())
            .unwrap_or(session_id.as_str())
    }
}

/// Full state of one session.
///
/// The answer stack is never empty once a session exists; its first entry is
/// the initial grid and its last is the current answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    /// Answer history, oldest first.
    pub answer_stack: Vec<Grid>,
    /// The puzzle as given.
    pub initial: Grid,
    /// The solution.
    #[serde(rename = "final")]
    pub solution: Grid,
    /// Set once, when solved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<CompletionRecord>,
    /// Provenance and difficulty.
    #[serde(default)]
    pub metadata: Metadata,
    /// Timer, carried so another device can resume it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer: Option<TimerRecord>,
}

impl GameState {
    /// A fresh session: the stack holds only the initial grid.
    pub fn new(initial: Grid, solution: Grid, metadata: Metadata) -> Self {
        Self {
            answer_stack: vec![initial.clone()],
            initial,
            solution,
            completed: None,
            metadata,
            timer: None,
        }
    }

    /// The current answer. Falls back to the initial grid for an empty stack.
    pub fn current(&self) -> &Grid {
        self.answer_stack.last().unwrap_or(&self.initial)
    }

    /// Whether the session carries a completion record.
    pub fn is_completed(&self) -> bool {
        self.completed.is_some()
    }
}
