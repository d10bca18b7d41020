//! Timestamped session records over a key-value backend.

use super::{KeyValueBackend, StateKind, StoreError};
use crate::config::StorageConfig;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use sudoku_types::{LocalSnapshot, SessionId, Timestamp};
use tracing::{debug, error, info, warn};

/// Key of the per-day counter of gated actions.
pub const DAILY_ACTIONS_KEY: &str = "daily-action-counter";

/// Session records in a synchronous backend.
///
/// Reads never fail: a missing, unreadable or corrupted record is absent.
/// Writes that hit the backend quota free space and retry once, then are
/// dropped with an error log.
#[derive(Debug, Clone)]
pub struct LocalStore<B> {
    backend: B,
    prefix: String,
    purge_after: Duration,
    quota_stale_age: Duration,
}

impl<B: KeyValueBackend> LocalStore<B> {
    /// A store over `backend`.
    pub fn new(backend: B, config: &StorageConfig) -> Self {
        Self {
            backend,
            prefix: config.key_prefix.clone(),
            purge_after: config.purge_after(),
            quota_stale_age: config.quota_stale_age(),
        }
    }

    /// Prefix shared by every session key.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Key of the `kind` record of session `id`.
    pub fn key(id: &SessionId, kind: StateKind) -> String {
        match kind.suffix() {
            Some(suffix) => format!("{id}{suffix}"),
            None => id.to_string(),
        }
    }

    /// Read the `kind` record of `id`.
    pub fn get<T: DeserializeOwned>(&self, id: &SessionId, kind: StateKind) -> Option<LocalSnapshot<T>> {
        self.read(&Self::key(id, kind))
    }

    /// Write the `kind` record of `id`, stamped `now`.
    ///
    /// Returns `None` when the write was dropped.
    pub fn save<T: Serialize + Clone>(
        &self,
        id: &SessionId,
        kind: StateKind,
        state: &T,
        now: Timestamp,
    ) -> Option<LocalSnapshot<T>> {
        let snapshot = LocalSnapshot {
            last_updated: now,
            state: state.clone(),
        };
        self.write(&Self::key(id, kind), &snapshot, now)
            .then_some(snapshot)
    }

    /// Delete the `kind` record of `id`.
    pub fn remove(&self, id: &SessionId, kind: StateKind) {
        let key = Self::key(id, kind);
        if let Err(e) = self.backend.remove(&key) {
            warn!(key, error = %e, "failed to remove local record");
        }
    }

    /// Every `kind` record, newest first.
    ///
    /// Records older than the purge age are deleted; corrupted ones are
    /// skipped.
    pub fn list<T: DeserializeOwned>(&self, kind: StateKind, now: Timestamp) -> Vec<(SessionId, LocalSnapshot<T>)> {
        let cutoff = now.minus(self.purge_after);
        let mut records = Vec::new();

        for key in self.keys() {
            let Some(id) = self.session_of(&key, kind) else {
                continue;
            };
            let Some(snapshot) = self.read::<LocalSnapshot<T>>(&key) else {
                continue;
            };
            if snapshot.last_updated < cutoff {
                debug!(key, "purging expired local record");
                if let Err(e) = self.backend.remove(&key) {
                    warn!(key, error = %e, "failed to purge local record");
                }
                continue;
            }
            records.push((id, snapshot));
        }

        records.sort_by(|(_, a), (_, b)| b.last_updated.cmp(&a.last_updated));
        records
    }

    /// Read a non-session record.
    pub fn get_value<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.read(key)
    }

    /// Write a non-session record. Returns whether it was written.
    pub fn set_value<T: Serialize>(&self, key: &str, value: &T, now: Timestamp) -> bool {
        self.write(key, value, now)
    }

    /// Session id of `key` if it is a `kind` record.
    fn session_of(&self, key: &str, kind: StateKind) -> Option<SessionId> {
        let rest = key.strip_prefix(&self.prefix)?;
        match kind.suffix() {
            None if !rest.is_empty() && !Self::has_kind_suffix(key) => Some(SessionId::new(key)),
            None => None,
            Some(suffix) => key
                .strip_suffix(suffix)
                .filter(|id| id.len() > self.prefix.len())
                .map(SessionId::new),
        }
    }

    fn has_kind_suffix(key: &str) -> bool {
        StateKind::ALL
            .iter()
            .filter_map(|kind| kind.suffix())
            .any(|suffix| key.ends_with(suffix))
    }

    fn keys(&self) -> Vec<String> {
        self.backend.keys().unwrap_or_else(|e| {
            warn!(error = %e, "failed to list local keys");
            Vec::new()
        })
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.backend.get(key) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key, error = %e, "failed to read local record");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "discarding corrupted local record");
                None
            }
        }
    }

    fn write<T: Serialize>(&self, key: &str, value: &T, now: Timestamp) -> bool {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                error!(key, error = %e, "failed to encode local record");
                return false;
            }
        };

        match self.backend.set(key, &raw) {
            Ok(()) => return true,
            Err(StoreError::QuotaExceeded) => {}
            Err(e) => {
                error!(key, error = %e, "local write failed");
                return false;
            }
        }

        let freed = self.free_space(now);
        info!(key, freed, "local store full, retrying after cleanup");

        match self.backend.set(key, &raw) {
            Ok(()) => true,
            Err(e) => {
                error!(key, error = %e, "local store still full, dropping write");
                false
            }
        }
    }

    /// Delete stale and corrupted records; if that frees nothing, delete
    /// the oldest half. Returns how many records were deleted.
    fn free_space(&self, now: Timestamp) -> usize {
        let stale_before = now.minus(self.quota_stale_age);
        let mut doomed = Vec::new();
        let mut kept = Vec::new();

        for key in self.keys() {
            if !key.starts_with(&self.prefix) {
                continue;
            }
            match self.read::<LocalSnapshot<serde_json::Value>>(&key) {
                Some(snapshot) if snapshot.last_updated >= stale_before => {
                    kept.push((snapshot.last_updated, key));
                }
                _ => doomed.push(key),
            }
        }

        if doomed.is_empty() {
            kept.sort();
            let half = kept.len().div_ceil(2);
            doomed.extend(kept.into_iter().take(half).map(|(_, key)| key));
        }

        doomed
            .iter()
            .filter(|key| match self.backend.remove(key) {
                Ok(()) => true,
                Err(e) => {
                    warn!(key = key.as_str(), error = %e, "failed to free local record");
                    false
                }
            })
            .count()
    }
}
