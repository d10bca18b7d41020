//! Mock remote store for testing.
//!
//! Holds sessions in memory, stamps saves with a settable server time,
//! records every save and can be told to fail.

use super::{ListQuery, RemoteError, RemoteStore};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use sudoku_types::{RemoteSnapshot, SaveRequest, SessionId, SessionParties, Timestamp};

/// Mock remote store. Clones share the same state.
#[derive(Debug, Default)]
pub struct MockRemoteStore {
    inner: Arc<Mutex<MockRemoteInner>>,
}

#[derive(Debug, Default)]
struct MockRemoteInner {
    sessions: BTreeMap<SessionId, RemoteSnapshot>,
    parties: Option<SessionParties>,
    listings: Vec<(ListQuery, Vec<RemoteSnapshot>)>,
    saves: Vec<(SessionId, SaveRequest)>,
    get_calls: usize,
    list_calls: Vec<ListQuery>,
    server_time: Option<Timestamp>,
    offline: bool,
    fail_next_get: Option<String>,
    fail_next_save: Option<String>,
    fail_next_list: Option<String>,
}

impl MockRemoteStore {
    /// Create an empty mock store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `snapshot` as if another device had saved it.
    pub fn put(&self, snapshot: RemoteSnapshot) {
        let mut inner = self.inner.lock().unwrap();
        inner.sessions.insert(snapshot.session_id.clone(), snapshot);
    }

    /// The stored copy of `id`.
    pub fn stored(&self, id: &SessionId) -> Option<RemoteSnapshot> {
        let inner = self.inner.lock().unwrap();
        inner.sessions.get(id).cloned()
    }

    /// Attach `parties` to every `get` and `save` response.
    pub fn set_parties(&self, parties: SessionParties) {
        let mut inner = self.inner.lock().unwrap();
        inner.parties = Some(parties);
    }

    /// Answer `list(query)` with `sessions`.
    pub fn set_listing(&self, query: ListQuery, sessions: Vec<RemoteSnapshot>) {
        let mut inner = self.inner.lock().unwrap();
        inner.listings.retain(|(q, _)| q != &query);
        inner.listings.push((query, sessions));
    }

    /// Stamp saves with `now` (whole seconds are kept) instead of the system clock.
    pub fn set_server_time(&self, now: Timestamp) {
        let mut inner = self.inner.lock().unwrap();
        inner.server_time = Some(now);
    }

    /// Fail every call until set back.
    pub fn set_offline(&self, offline: bool) {
        let mut inner = self.inner.lock().unwrap();
        inner.offline = offline;
    }

    /// Get all saves that were sent.
    pub fn saves(&self) -> Vec<(SessionId, SaveRequest)> {
        let inner = self.inner.lock().unwrap();
        inner.saves.clone()
    }

    /// Number of `get` calls.
    pub fn get_calls(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.get_calls
    }

    /// Queries passed to `list`.
    pub fn list_calls(&self) -> Vec<ListQuery> {
        let inner = self.inner.lock().unwrap();
        inner.list_calls.clone()
    }

    /// Cause the next get() to fail with the given error.
    pub fn fail_next_get(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_get = Some(error.to_string());
    }

    /// Cause the next save() to fail with the given error.
    pub fn fail_next_save(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_save = Some(error.to_string());
    }

    /// Cause the next list() to fail with the given error.
    pub fn fail_next_list(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_list = Some(error.to_string());
    }

    /// Clear all state.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        *inner = MockRemoteInner::default();
    }
}

impl Clone for MockRemoteStore {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl MockRemoteInner {
    fn check(&mut self, forced: impl FnOnce(&mut Self) -> Option<String>) -> Result<(), RemoteError> {
        if self.offline {
            return Err(RemoteError::ConnectionFailed("offline".into()));
        }
        match forced(self) {
            Some(error) => Err(RemoteError::Http(error)),
            None => Ok(()),
        }
    }

    fn with_parties(&self, mut snapshot: RemoteSnapshot) -> RemoteSnapshot {
        snapshot.parties = self.parties.clone();
        snapshot
    }
}

#[async_trait]
impl RemoteStore for MockRemoteStore {
    async fn get(&self, id: &SessionId) -> Result<Option<RemoteSnapshot>, RemoteError> {
        let mut inner = self.inner.lock().unwrap();
        inner.get_calls += 1;
        inner.check(|inner| inner.fail_next_get.take())?;

        Ok(inner
            .sessions
            .get(id)
            .cloned()
            .map(|snapshot| inner.with_parties(snapshot)))
    }

    async fn save(&self, id: &SessionId, request: &SaveRequest) -> Result<RemoteSnapshot, RemoteError> {
        let mut inner = self.inner.lock().unwrap();
        inner.check(|inner| inner.fail_next_save.take())?;

        let updated_at = inner
            .server_time
            .unwrap_or_else(Timestamp::now)
            .truncate_to_secs();
        let snapshot = RemoteSnapshot {
            session_id: id.clone(),
            state: request.state.clone(),
            updated_at,
            parties: None,
        };
        inner.saves.push((id.clone(), request.clone()));
        inner.sessions.insert(id.clone(), snapshot.clone());
        Ok(inner.with_parties(snapshot))
    }

    async fn list(&self, query: &ListQuery) -> Result<Vec<RemoteSnapshot>, RemoteError> {
        let mut inner = self.inner.lock().unwrap();
        inner.list_calls.push(query.clone());
        inner.check(|inner| inner.fail_next_list.take())?;

        Ok(inner
            .listings
            .iter()
            .find(|(q, _)| q == query)
            .map(|(_, sessions)| sessions.clone())
            .unwrap_or_default())
    }
}
