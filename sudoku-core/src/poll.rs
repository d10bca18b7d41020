//! When to poll the remote store for other participants' progress.

use std::time::Duration;

/// Polling cadence and the save-age window in which polling is useful.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Time between polls.
    pub interval: Duration,
    /// Minimum time since the last save; a recent save already brought fresh parties.
    pub min_since_save: Duration,
    /// Maximum time since the last save; after this the player has walked away.
    pub max_since_save: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            min_since_save: Duration::from_secs(30),
            max_since_save: Duration::from_secs(1800),
        }
    }
}

/// Snapshot of everything the poll decision depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConditions {
    /// The session is still live (not torn down).
    pub active: bool,
    /// The app is visible.
    pub visible: bool,
    /// The player paused.
    pub paused: bool,
    /// This session is complete.
    pub completed: bool,
    /// At least one other participant on this puzzle has not finished.
    pub any_participant_incomplete: bool,
    /// Time since the last save was issued.
    pub since_last_save: Duration,
}

impl PollPolicy {
    /// Whether a poll should be issued now.
    pub fn should_poll(&self, conditions: &PollConditions) -> bool {
        conditions.active
            && conditions.visible
            && !conditions.paused
            && !conditions.completed
            && conditions.any_participant_incomplete
            && conditions.since_last_save >= self.min_since_save
            && conditions.since_last_save < self.max_since_save
    }
}
