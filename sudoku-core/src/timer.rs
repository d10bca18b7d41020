//! Active-time tracking for one puzzle session.
//!
//! The timer never accumulates ticks. Every observation recomputes elapsed
//! time from the wall-clock timestamps in its [`TimerRecord`], so a process
//! that was suspended for an hour still reports the right value.
//!
//! ```text
//! Idle → CountingDown → Running ⇄ Paused → Stopped
//! ```
//!
//! A new session counts down a fixed number of ticks before its interval
//! opens. Pausing folds the open interval into the accumulated seconds; the
//! timer stays paused until every reason it was paused for is cleared.
//! Stopped is terminal.

use std::time::Duration;
use sudoku_types::{ActiveInterval, Timestamp, TimerRecord};

/// Why the timer is paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseReason {
    /// The player pressed pause.
    Manual,
    /// The app lost visibility.
    Hidden,
    /// No selection change within the inactivity window.
    Inactivity,
}

/// Lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    /// No session started yet.
    Idle,
    /// Waiting out the start countdown.
    CountingDown {
        /// Ticks left.
        remaining: u32,
    },
    /// Counting active time.
    Running,
    /// Frozen until all pause reasons clear.
    Paused,
    /// Puzzle complete. Never runs again.
    Stopped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct PauseSet {
    manual: bool,
    hidden: bool,
    inactivity: bool,
}

impl PauseSet {
    fn set(&mut self, reason: PauseReason, on: bool) {
        match reason {
            PauseReason::Manual => self.manual = on,
            PauseReason::Hidden => self.hidden = on,
            PauseReason::Inactivity => self.inactivity = on,
        }
    }

    fn contains(&self, reason: PauseReason) -> bool {
        match reason {
            PauseReason::Manual => self.manual,
            PauseReason::Hidden => self.hidden,
            PauseReason::Inactivity => self.inactivity,
        }
    }

    fn any(&self) -> bool {
        self.manual || self.hidden || self.inactivity
    }
}

/// Session timer state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timer {
    record: TimerRecord,
    phase: TimerPhase,
    pauses: PauseSet,
}

impl Timer {
    /// An idle timer with nothing accumulated.
    pub fn new() -> Self {
        Self {
            record: TimerRecord::default(),
            phase: TimerPhase::Idle,
            pauses: PauseSet::default(),
        }
    }

    /// Wrap a persisted record without starting a session.
    pub fn from_record(record: TimerRecord) -> Self {
        let phase = if record.stopped {
            TimerPhase::Stopped
        } else {
            TimerPhase::Idle
        };
        Self {
            record,
            phase,
            pauses: PauseSet::default(),
        }
    }

    /// Start a new active session, optionally continuing from `restore`.
    ///
    /// Time accumulated so far is folded in, then the interval opens after
    /// `countdown` ticks. Pause reasons already in force are kept, in which
    /// case the timer starts paused.
    pub fn start_session(&mut self, restore: Option<TimerRecord>, now: Timestamp, countdown: u32) {
        if let Some(record) = restore {
            self.record = record;
            if record.stopped {
                self.phase = TimerPhase::Stopped;
                return;
            }
        } else if self.phase == TimerPhase::Stopped {
            return;
        }

        self.record.seconds = self.record.elapsed_seconds();
        self.record.stopped = false;

        if self.pauses.any() {
            self.open_interval(now);
            self.phase = TimerPhase::Paused;
            return;
        }

        let start = now.plus(Duration::from_secs(countdown as u64));
        self.record.in_progress = ActiveInterval {
            start,
            last_interaction: start,
        };
        if countdown > 0 {
            self.record.countdown = Some(countdown);
            self.phase = TimerPhase::CountingDown {
                remaining: countdown,
            };
        } else {
            self.record.countdown = None;
            self.phase = TimerPhase::Running;
        }
    }

    /// One cadence tick.
    ///
    /// Counts down, or moves the interval's last interaction to `now`. The
    /// last interaction never moves backwards.
    pub fn tick(&mut self, now: Timestamp) {
        match self.phase {
            TimerPhase::CountingDown { remaining } => {
                let remaining = remaining.saturating_sub(1);
                if remaining == 0 {
                    self.record.countdown = None;
                    self.phase = TimerPhase::Running;
                } else {
                    self.record.countdown = Some(remaining);
                    self.phase = TimerPhase::CountingDown { remaining };
                }
            }
            TimerPhase::Running => self.touch(now),
            TimerPhase::Idle | TimerPhase::Paused | TimerPhase::Stopped => {}
        }
    }

    /// Pause for `reason`, freezing elapsed time at its current value.
    pub fn pause(&mut self, reason: PauseReason, now: Timestamp) {
        self.pauses.set(reason, true);
        match self.phase {
            TimerPhase::Running => {
                self.touch(now);
                self.fold(now);
                self.phase = TimerPhase::Paused;
            }
            TimerPhase::CountingDown { .. } => {
                self.fold(now);
                self.phase = TimerPhase::Paused;
            }
            TimerPhase::Idle | TimerPhase::Paused | TimerPhase::Stopped => {}
        }
    }

    /// Clear `reason`. When nothing else holds the timer, a new interval
    /// opens at `now` without a countdown.
    pub fn resume(&mut self, reason: PauseReason, now: Timestamp) {
        self.pauses.set(reason, false);
        if self.phase == TimerPhase::Paused && !self.pauses.any() {
            self.open_interval(now);
            self.phase = TimerPhase::Running;
        }
    }

    /// Pause for inactivity if the last selection change is at least
    /// `window` old. Returns whether the timer was paused by this call.
    pub fn check_inactivity(&mut self, last_selection: Timestamp, now: Timestamp, window: Duration) -> bool {
        let active = matches!(
            self.phase,
            TimerPhase::Running | TimerPhase::CountingDown { .. }
        );
        if active && now.saturating_since(last_selection) >= window {
            self.pause(PauseReason::Inactivity, now);
            return true;
        }
        false
    }

    /// Stop for good and return the final elapsed seconds.
    pub fn stop(&mut self, now: Timestamp) -> u64 {
        if self.phase == TimerPhase::Running {
            self.touch(now);
        }
        self.record.countdown = None;
        self.record.stopped = true;
        self.phase = TimerPhase::Stopped;
        self.record.elapsed_seconds()
    }

    /// Total active seconds.
    pub fn elapsed_seconds(&self) -> u64 {
        self.record.elapsed_seconds()
    }

    /// The persisted form.
    pub fn record(&self) -> TimerRecord {
        self.record
    }

    /// Current phase.
    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    /// Whether the timer counts active time right now.
    pub fn is_running(&self) -> bool {
        self.phase == TimerPhase::Running
    }

    /// Whether `reason` currently holds the timer.
    pub fn is_paused_by(&self, reason: PauseReason) -> bool {
        self.pauses.contains(reason)
    }

    /// Whether the timer has stopped for good.
    pub fn is_stopped(&self) -> bool {
        self.phase == TimerPhase::Stopped
    }

    fn touch(&mut self, now: Timestamp) {
        let interval = &mut self.record.in_progress;
        interval.last_interaction = interval.last_interaction.max(now);
    }

    fn fold(&mut self, now: Timestamp) {
        self.record.seconds = self.record.elapsed_seconds();
        self.record.countdown = None;
        self.open_interval(now);
    }

    fn open_interval(&mut self, now: Timestamp) {
        self.record.in_progress = ActiveInterval {
            start: now,
            last_interaction: now,
        };
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
