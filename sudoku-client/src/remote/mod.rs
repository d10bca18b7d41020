//! Remote session store.
//!
//! The remote store holds one copy of each session, stamped by the server
//! in whole seconds. Responses to `get` and `save` may carry the sessions
//! other party members have on the same puzzle.
//!
//! - `get()` fetches one session; a missing session is `Ok(None)`
//! - `save()` writes one session and returns the stored copy
//! - `list()` enumerates sessions, optionally for one member of one party

mod http;
mod mock;

pub use http::HttpRemoteStore;
pub use mock::MockRemoteStore;

use async_trait::async_trait;
use sudoku_types::{PartyId, RemoteSnapshot, SaveRequest, SessionId, UserId};
use thiserror::Error;

/// Remote store errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Request failed.
    #[error("http error: {0}")]
    Http(String),

    /// Could not reach the server.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The request timed out.
    #[error("request timeout")]
    Timeout,

    /// The server refused the credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Unexpected response status.
    #[error("unexpected status: {0}")]
    Status(u16),

    /// The response body did not decode.
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            RemoteError::ConnectionFailed(e.to_string())
        } else if e.is_timeout() {
            RemoteError::Timeout
        } else if e.is_decode() {
            RemoteError::Decode(e.to_string())
        } else {
            RemoteError::Http(e.to_string())
        }
    }
}

/// Filter for [`RemoteStore::list`]. Empty lists the caller's own sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Party the user belongs to.
    pub party_id: Option<PartyId>,
    /// Whose sessions to list.
    pub user_id: Option<UserId>,
}

impl ListQuery {
    /// Sessions of `user_id`, visible through `party_id`.
    pub fn member(party_id: PartyId, user_id: UserId) -> Self {
        Self {
            party_id: Some(party_id),
            user_id: Some(user_id),
        }
    }
}

/// A networked session store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch one session. `Ok(None)` when the server has no copy.
    async fn get(&self, id: &SessionId) -> Result<Option<RemoteSnapshot>, RemoteError>;

    /// Store one session, returning the copy as the server now holds it.
    async fn save(&self, id: &SessionId, request: &SaveRequest) -> Result<RemoteSnapshot, RemoteError>;

    /// Enumerate sessions.
    async fn list(&self, query: &ListQuery) -> Result<Vec<RemoteSnapshot>, RemoteError>;
}
