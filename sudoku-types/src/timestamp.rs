//! Normalized timestamps.
//!
//! The local store stamps writes in milliseconds and the remote store in
//! whole seconds. Both decode into [`Timestamp`] (milliseconds since the Unix
//! epoch) so last-writer-wins comparisons never mix granularities. The
//! [`secs`] module is a serde adapter for second-granularity wire fields.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The Unix epoch. Used as the timestamp of a copy that does not exist.
    pub const ZERO: Timestamp = Timestamp(0);

    /// Create a timestamp from milliseconds.
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Create a timestamp from whole seconds.
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(1000))
    }

    /// The current wall-clock time.
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self(millis)
    }

    /// Milliseconds since the epoch.
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Whole seconds since the epoch (floored).
    pub const fn as_secs(self) -> u64 {
        self.0 / 1000
    }

    /// Drop the sub-second part, matching what a second-granularity store keeps.
    pub const fn truncate_to_secs(self) -> Self {
        Self(self.0 / 1000 * 1000)
    }

    /// Time elapsed from `earlier` to `self`, zero if `earlier` is later.
    pub fn saturating_since(self, earlier: Timestamp) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }

    /// This timestamp moved forward by `duration`.
    pub fn plus(self, duration: Duration) -> Self {
        Self(self.0.saturating_add(duration.as_millis() as u64))
    }

    /// This timestamp moved back by `duration`, clamped at the epoch.
    pub fn minus(self, duration: Duration) -> Self {
        Self(self.0.saturating_sub(duration.as_millis() as u64))
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({}ms)", self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Serde adapter storing a [`Timestamp`] as whole seconds.
pub mod secs {
    use super::Timestamp;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize as seconds since the epoch.
    pub fn serialize<S: Serializer>(ts: &Timestamp, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(ts.as_secs())
    }

    /// Deserialize from seconds since the epoch.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Timestamp, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(Timestamp::from_secs(secs))
    }
}
