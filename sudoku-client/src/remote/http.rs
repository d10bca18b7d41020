//! HTTP client for the session API.

use super::{ListQuery, RemoteError, RemoteStore};
use crate::config::RemoteConfig;
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use sudoku_types::timestamp::{self, Timestamp};
use sudoku_types::{GameState, RemoteSnapshot, SaveRequest, SessionId, SessionParties};
use tracing::{debug, warn};

/// Session as returned by the API. `sessionId` is omitted on single-session
/// responses.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    #[serde(default)]
    session_id: Option<SessionId>,
    state: GameState,
    #[serde(with = "timestamp::secs")]
    updated_at: Timestamp,
    #[serde(default)]
    parties: Option<SessionParties>,
}

impl SessionResponse {
    fn into_snapshot(self, id: SessionId) -> RemoteSnapshot {
        RemoteSnapshot {
            session_id: self.session_id.unwrap_or(id),
            state: self.state,
            updated_at: self.updated_at,
            parties: self.parties,
        }
    }
}

/// Client for the remote session API.
///
/// - `GET   {base}/sessions/{id}`
/// - `PATCH {base}/sessions/{id}` with `{state, expiresAt}`
/// - `GET   {base}/sessions?partyId=&userId=`
#[derive(Debug, Clone)]
pub struct HttpRemoteStore {
    config: RemoteConfig,
    http: reqwest::Client,
}

impl HttpRemoteStore {
    /// Create a client with the configured request timeout.
    pub fn new(config: RemoteConfig) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder().timeout(config.timeout()).build()?;
        Ok(Self { config, http })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Build the URL for `path` under the base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, self.url(path))
            .query(&[("app", self.config.app.as_str())]);
        match &self.config.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Map error statuses; `None` for 404.
    pub(crate) async fn check(response: Response) -> Result<Option<Response>, RemoteError> {
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(RemoteError::Unauthorized),
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                warn!(status = status.as_u16(), body, "session api error");
                Err(RemoteError::Status(status.as_u16()))
            }
            _ => Ok(Some(response)),
        }
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn get(&self, id: &SessionId) -> Result<Option<RemoteSnapshot>, RemoteError> {
        debug!(session = %id, "fetching session");
        let response = self
            .request(Method::GET, &format!("sessions/{id}"))
            .send()
            .await?;

        match Self::check(response).await? {
            Some(response) => {
                let body: SessionResponse = response.json().await?;
                Ok(Some(body.into_snapshot(id.clone())))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, id: &SessionId, request: &SaveRequest) -> Result<RemoteSnapshot, RemoteError> {
        debug!(session = %id, "saving session");
        let response = self
            .request(Method::PATCH, &format!("sessions/{id}"))
            .json(request)
            .send()
            .await?;

        let response = Self::check(response)
            .await?
            .ok_or(RemoteError::Status(StatusCode::NOT_FOUND.as_u16()))?;
        let body: SessionResponse = response.json().await?;
        Ok(body.into_snapshot(id.clone()))
    }

    async fn list(&self, query: &ListQuery) -> Result<Vec<RemoteSnapshot>, RemoteError> {
        let mut params = Vec::new();
        if let Some(party_id) = &query.party_id {
            params.push(("partyId", party_id.as_str()));
        }
        if let Some(user_id) = &query.user_id {
            params.push(("userId", user_id.as_str()));
        }

        let response = self
            .request(Method::GET, "sessions")
            .query(&params)
            .send()
            .await?;

        let Some(response) = Self::check(response).await? else {
            return Ok(Vec::new());
        };
        let body: Vec<SessionResponse> = response.json().await?;

        Ok(body
            .into_iter()
            .filter_map(|session| match session.session_id.clone() {
                Some(id) => Some(session.into_snapshot(id)),
                None => {
                    warn!("listed session without id, skipping");
                    None
                }
            })
            .collect())
    }
}
