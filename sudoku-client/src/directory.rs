//! Friend directory: the parties the current user belongs to.

use crate::remote::{HttpRemoteStore, RemoteError};
use async_trait::async_trait;
use reqwest::Method;
use std::sync::{Arc, Mutex};
use sudoku_types::{Party, UserId};
use tracing::debug;

/// Lists the current user's parties.
#[async_trait]
pub trait FriendDirectory: Send + Sync {
    /// Every party the current user is a member of.
    async fn list(&self) -> Result<Vec<Party>, RemoteError>;
}

/// Every distinct member of `parties` except `me`, in first-seen order.
pub fn friend_ids(parties: &[Party], me: &UserId) -> Vec<UserId> {
    let mut ids: Vec<UserId> = Vec::new();
    for member in parties.iter().flat_map(|party| party.members.iter()) {
        if &member.user_id != me && !ids.contains(&member.user_id) {
            ids.push(member.user_id.clone());
        }
    }
    ids
}

#[async_trait]
impl FriendDirectory for HttpRemoteStore {
    async fn list(&self) -> Result<Vec<Party>, RemoteError> {
        debug!("fetching parties");
        let response = self.request(Method::GET, "parties").send().await?;
        match Self::check(response).await? {
            Some(response) => Ok(response.json().await?),
            None => Ok(Vec::new()),
        }
    }
}

/// A fixed list of parties. Clones share the same list.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    parties: Arc<Mutex<Vec<Party>>>,
}

impl StaticDirectory {
    /// A directory listing `parties`.
    pub fn new(parties: Vec<Party>) -> Self {
        Self {
            parties: Arc::new(Mutex::new(parties)),
        }
    }

    /// Replace the listed parties.
    pub fn set(&self, parties: Vec<Party>) {
        *self.parties.lock().unwrap_or_else(|e| e.into_inner()) = parties;
    }
}

#[async_trait]
impl FriendDirectory for StaticDirectory {
    async fn list(&self) -> Result<Vec<Party>, RemoteError> {
        Ok(self.parties.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }
}
