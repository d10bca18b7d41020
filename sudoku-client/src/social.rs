//! Cache of friends' sessions, used for racing and the leaderboard.
//!
//! Built from remote `list` queries and patched with the fresher copies
//! polls bring back. Never persisted.

use crate::directory::friend_ids;
use crate::remote::{ListQuery, RemoteStore};
use futures_util::future::join_all;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use sudoku_types::{MemberSession, Party, RemoteSnapshot, SessionId, SessionParties, SessionParty, Timestamp, UserId};
use tracing::{debug, info, warn};

/// One friend's cached sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserSessions {
    /// A fetch for this user is in flight.
    pub is_loading: bool,
    /// Sessions, once fetched. `None` if the fetch failed.
    pub sessions: Option<Vec<RemoteSnapshot>>,
}

#[derive(Debug, Default)]
struct FriendInner {
    users: BTreeMap<UserId, UserSessions>,
    loading: bool,
    initialized: bool,
}

/// Friends' sessions keyed by user. Clones share the same cache.
#[derive(Debug, Clone)]
pub struct FriendSessions {
    inner: Arc<Mutex<FriendInner>>,
    max_age: Duration,
}

impl FriendSessions {
    /// An empty cache keeping sessions updated within `max_age`.
    pub fn new(max_age: Duration) -> Self {
        Self {
            inner: Arc::default(),
            max_age,
        }
    }

    /// A fetch is in flight.
    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    /// The cached entry for `user_id`.
    pub fn get(&self, user_id: &UserId) -> Option<UserSessions> {
        self.lock().users.get(user_id).cloned()
    }

    /// Drop everything, e.g. when the user changes.
    pub fn clear(&self) {
        *self.lock() = FriendInner::default();
    }

    /// Fetch sessions of every friend that has none cached and is not
    /// already loading. Ignored while another fetch is in flight.
    ///
    /// Each friend is queried through the first party listing them; sessions
    /// older than the cache's max age are dropped.
    pub async fn fetch<R: RemoteStore + ?Sized>(&self, remote: &R, parties: &[Party], me: &UserId, now: Timestamp) {
        let pending: Vec<(UserId, Option<&Party>)> = {
            let mut inner = self.lock();
            if inner.loading {
                return;
            }
            inner.loading = true;
            inner.initialized = true;

            let pending: Vec<_> = friend_ids(parties, me)
                .into_iter()
                .filter(|id| {
                    inner
                        .users
                        .get(id)
                        .map_or(true, |user| !user.is_loading && user.sessions.is_none())
                })
                .collect();
            for id in &pending {
                inner.users.insert(
                    id.clone(),
                    UserSessions {
                        is_loading: true,
                        sessions: None,
                    },
                );
            }
            pending
                .into_iter()
                .map(|id| {
                    let party = parties
                        .iter()
                        .find(|party| party.members.iter().any(|m| m.user_id == id));
                    (id, party)
                })
                .collect()
        };

        info!(friends = pending.len(), "fetching friend sessions");
        let cutoff = now.minus(self.max_age);

        let results = join_all(pending.into_iter().map(|(user_id, party)| async move {
            let Some(party) = party else {
                return (user_id, None);
            };
            let query = ListQuery::member(party.party_id.clone(), user_id.clone());
            match remote.list(&query).await {
                Ok(sessions) => {
                    let recent: Vec<_> = sessions
                        .into_iter()
                        .filter(|session| session.updated_at >= cutoff)
                        .collect();
                    (user_id, Some(recent))
                }
                Err(e) => {
                    warn!(user = %user_id, error = %e, "failed to fetch friend sessions");
                    (user_id, None)
                }
            }
        }))
        .await;

        let mut inner = self.lock();
        for (user_id, sessions) in results {
            inner.users.insert(
                user_id,
                UserSessions {
                    is_loading: false,
                    sessions,
                },
            );
        }
        inner.loading = false;
    }

    /// [`fetch`](Self::fetch) unless a fetch was already started or there
    /// are no parties.
    pub async fn lazy_fetch<R: RemoteStore + ?Sized>(&self, remote: &R, parties: &[Party], me: &UserId, now: Timestamp) {
        let skip = {
            let inner = self.lock();
            inner.initialized || inner.loading || parties.is_empty()
        };
        if !skip {
            self.fetch(remote, parties, me, now).await;
        }
    }

    /// Replace each member's copy of `session_id` with the polled one.
    ///
    /// Members without fetched sessions are left alone; nothing changes
    /// while a fetch is in flight.
    pub fn patch(&self, session_id: &SessionId, member_sessions: &BTreeMap<UserId, MemberSession>) {
        let mut inner = self.lock();
        if inner.loading {
            return;
        }
        for (user_id, member) in member_sessions {
            let Some(user) = inner.users.get_mut(user_id) else {
                continue;
            };
            if user.is_loading {
                continue;
            }
            let Some(sessions) = user.sessions.as_mut() else {
                continue;
            };
            sessions.retain(|session| &session.session_id != session_id);
            sessions.push(RemoteSnapshot {
                session_id: session_id.clone(),
                state: member.state.clone(),
                updated_at: member.updated_at,
                parties: None,
            });
            debug!(user = %user_id, session = %session_id, "patched friend session");
        }
    }

    /// [`patch`](Self::patch) with every member of every party.
    pub fn patch_parties(&self, session_id: &SessionId, parties: &SessionParties) {
        let members: BTreeMap<UserId, MemberSession> = parties
            .values()
            .flat_map(|party| party.member_sessions.clone())
            .collect();
        self.patch(session_id, &members);
    }

    /// Cached copies of `session_id`, grouped by party.
    pub fn session_parties(&self, parties: &[Party], session_id: &SessionId) -> SessionParties {
        let inner = self.lock();
        parties
            .iter()
            .map(|party| {
                let member_sessions = party
                    .members
                    .iter()
                    .filter_map(|member| {
                        let session = inner
                            .users
                            .get(&member.user_id)?
                            .sessions
                            .as_ref()?
                            .iter()
                            .find(|session| &session.session_id == session_id)?;
                        Some((
                            member.user_id.clone(),
                            MemberSession {
                                session_id: Some(session.session_id.clone()),
                                state: session.state.clone(),
                                updated_at: session.updated_at,
                            },
                        ))
                    })
                    .collect();
                (party.party_id.clone(), SessionParty { member_sessions })
            })
            .collect()
    }

    /// Every fetched friend with their sessions, for scoring.
    pub fn leaderboard_input(&self) -> Vec<(UserId, Vec<RemoteSnapshot>)> {
        self.lock()
            .users
            .iter()
            .map(|(id, user)| (id.clone(), user.sessions.clone().unwrap_or_default()))
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, FriendInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
