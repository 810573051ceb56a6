//! Millisecond durations with a bare-integer wire format.
//!
//! Handler timeouts, measured invocation times and config values all use
//! [`DurationMs`] so that JSON config files and serialized results read
//! `"default_timeout": 30000` rather than serde's `{"secs", "nanos"}` pair.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Duration in whole milliseconds.
///
/// # Examples
///
/// ```
/// use switchyard_proto::DurationMs;
///
/// let timeout = DurationMs::from_secs(5);
/// assert_eq!(timeout.as_millis(), 5000);
/// assert_eq!(serde_json::to_string(&timeout).unwrap(), "5000");
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct DurationMs(u64);

impl DurationMs {
    /// Zero duration.
    pub const ZERO: Self = Self(0);

    /// Create from milliseconds.
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    /// Create from seconds, saturating on overflow.
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(1000))
    }

    /// Value in milliseconds.
    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Convert to `std::time::Duration`.
    pub fn to_std(&self) -> Duration {
        Duration::from_millis(self.0)
    }
}

impl From<Duration> for DurationMs {
    fn from(d: Duration) -> Self {
        Self(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }
}

impl From<DurationMs> for Duration {
    fn from(d: DurationMs) -> Self {
        d.to_std()
    }
}

impl std::fmt::Display for DurationMs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ms", self.0)
    }
}
