//! Stored copies of a session and the party records attached to them.

use crate::ids::{PartyId, SessionId, UserId};
use crate::state::GameState;
use crate::timestamp::{self, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A record in the local store, stamped in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalSnapshot<T> {
    /// When the record was written.
    pub last_updated: Timestamp,
    /// The stored value.
    pub state: T,
}

/// Another participant's latest copy of the same puzzle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberSession {
    /// Session key, when the server includes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    /// The participant's state.
    pub state: GameState,
    /// Server write time.
    #[serde(with = "timestamp::secs")]
    pub updated_at: Timestamp,
}

/// Sessions of one party's members for the puzzle being fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionParty {
    /// userId → that member's session.
    #[serde(default)]
    pub member_sessions: BTreeMap<UserId, MemberSession>,
}

/// partyId → member sessions, piggy-backed on remote responses.
pub type SessionParties = BTreeMap<PartyId, SessionParty>;

/// A session as held by the remote store, stamped in whole seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSnapshot {
    /// Session key.
    pub session_id: SessionId,
    /// The stored state.
    pub state: GameState,
    /// Server write time.
    #[serde(with = "timestamp::secs")]
    pub updated_at: Timestamp,
    /// Other participants' copies, when the server attaches them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parties: Option<SessionParties>,
}

/// Body of a remote save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    /// State to store.
    pub state: GameState,
    /// When the server may drop the record.
    #[serde(with = "timestamp::secs")]
    pub expires_at: Timestamp,
}

/// A member of a party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    /// Member's user id.
    pub user_id: UserId,
    /// Display name within the party.
    pub member_nickname: String,
}

/// A group of friends, as listed by the friend directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    /// Party id.
    pub party_id: PartyId,
    /// Display name.
    pub party_name: String,
    /// Creator's user id.
    pub created_by: UserId,
    /// Members, including the creator.
    #[serde(default)]
    pub members: Vec<Member>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use crate::state::Metadata;

    fn state() -> GameState {
        GameState::new(Grid::empty(), Grid::empty(), Metadata::default())
    }

    #[test]
    fn local_snapshot_keeps_millis() {
        let snapshot = LocalSnapshot {
            last_updated: Timestamp::from_millis(1_700_000_000_123),
            state: 5u32,
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        assert_eq!(json, r#"{"lastUpdated":1700000000123,"state":5}"#);
    }

    #[test]
    fn remote_snapshot_decodes_seconds() {
        let json = serde_json::json!({
            "sessionId": "sudoku-1",
            "state": state(),
            "updatedAt": 1_700_000_000u64,
            "parties": {
                "party-1": {
                    "memberSessions": {
                        "user-2": { "state": state(), "updatedAt": 1_700_000_005u64 }
                    }
                }
            }
        });

        let remote: RemoteSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(remote.updated_at, Timestamp::from_millis(1_700_000_000_000));

        let parties = remote.parties.unwrap();
        let member = &parties[&PartyId::new("party-1")].member_sessions[&UserId::new("user-2")];
        assert_eq!(member.updated_at, Timestamp::from_secs(1_700_000_005));
        assert_eq!(member.session_id, None);
    }

    #[test]
    fn save_request_writes_seconds() {
        let request = SaveRequest {
            state: state(),
            expires_at: Timestamp::from_millis(2_000_999),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["expiresAt"], 2_000);
    }
}
