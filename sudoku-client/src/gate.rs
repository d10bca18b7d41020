//! Authorization for undo, reveal and full-grid checks.

use crate::clock::Clock;
use crate::storage::{KeyValueBackend, LocalStore, DAILY_ACTIONS_KEY};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use sudoku_types::Timestamp;
use tracing::debug;

const DAY_MILLIS: u64 = 24 * 60 * 60 * 1000;

/// Actions that need authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatedAction {
    /// Undo the last answer.
    Undo,
    /// Fill in the solution.
    Reveal,
    /// Show the full-grid validation overlay.
    CheckGrid,
}

impl fmt::Display for GatedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GatedAction::Undo => "undo",
            GatedAction::Reveal => "reveal",
            GatedAction::CheckGrid => "check grid",
        })
    }
}

/// Decides whether a gated action may run.
///
/// The engine calls [`authorize`](ActionGate::authorize) before the action
/// and [`committed`](ActionGate::committed) only once it has been applied.
/// A denied action changes nothing.
#[async_trait]
pub trait ActionGate: Send + Sync {
    /// Whether `action` may run now. May wait on the user.
    async fn authorize(&self, action: GatedAction) -> bool;

    /// `action` was applied.
    async fn committed(&self, _action: GatedAction) {}
}

/// Allows everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl ActionGate for AllowAll {
    async fn authorize(&self, _action: GatedAction) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DailyActions {
    day: u64,
    undo_count: u32,
    check_grid_count: u32,
}

impl DailyActions {
    fn count_mut(&mut self, action: GatedAction) -> Option<&mut u32> {
        match action {
            GatedAction::Undo => Some(&mut self.undo_count),
            GatedAction::CheckGrid => Some(&mut self.check_grid_count),
            GatedAction::Reveal => None,
        }
    }
}

fn day_of(now: Timestamp) -> u64 {
    now.as_millis() / DAY_MILLIS
}

/// Free tier limits: undo and grid checks a few times per UTC day, reveal
/// never. Subscribers are not limited.
///
/// Usage is counted in the local store and resets when the day changes.
pub struct DailyQuotaGate<B> {
    store: LocalStore<B>,
    clock: Arc<dyn Clock>,
    subscribed: AtomicBool,
    free_per_day: u32,
}

impl<B: KeyValueBackend> DailyQuotaGate<B> {
    /// Free uses per action per day.
    pub const FREE_PER_DAY: u32 = 5;

    /// A gate counting in `store`.
    pub fn new(store: LocalStore<B>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            subscribed: AtomicBool::new(false),
            free_per_day: Self::FREE_PER_DAY,
        }
    }

    /// Mark the user as a subscriber or not.
    pub fn set_subscribed(&self, subscribed: bool) {
        self.subscribed.store(subscribed, Ordering::SeqCst);
    }

    /// Uses of `action` left today; `None` when unlimited.
    pub fn remaining(&self, action: GatedAction) -> Option<u32> {
        if self.subscribed.load(Ordering::SeqCst) {
            return None;
        }
        let mut today = self.today();
        let limit = self.free_per_day;
        Some(today.count_mut(action).map_or(0, |used| limit.saturating_sub(*used)))
    }

    fn today(&self) -> DailyActions {
        let day = day_of(self.clock.now());
        match self.store.get_value::<DailyActions>(DAILY_ACTIONS_KEY) {
            Some(actions) if actions.day == day => actions,
            _ => DailyActions {
                day,
                ..DailyActions::default()
            },
        }
    }
}

#[async_trait]
impl<B: KeyValueBackend + 'static> ActionGate for DailyQuotaGate<B> {
    async fn authorize(&self, action: GatedAction) -> bool {
        let allowed = self.remaining(action).map_or(true, |left| left > 0);
        if !allowed {
            debug!(%action, "daily limit reached");
        }
        allowed
    }

    async fn committed(&self, action: GatedAction) {
        if self.subscribed.load(Ordering::SeqCst) {
            return;
        }
        let mut today = self.today();
        if let Some(count) = today.count_mut(action) {
            *count += 1;
            self.store.set_value(DAILY_ACTIONS_KEY, &today, self.clock.now());
        }
    }
}
