//! Audit thresholds and policy lists.

use serde::Deserialize;
use switchyard_proto::error::ConfigurationError;

/// Knobs for matching and the safety gate.
///
/// The confidence thresholds are fractions of a requirement's keywords that
/// must appear in an artifact. They are heuristics, tuned so that a
/// two-keyword requirement needs both keywords for an exact match and one
/// of them for a partial match.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Score at or above which a match is `Exact`.
    pub high_confidence: f64,
    /// Score at or above which a match is `Partial`.
    pub low_confidence: f64,
    /// Days without modification after which an artifact is stale.
    pub stale_after_days: u32,
    /// Artifacts modified within this many days are fresh.
    pub active_within_days: u32,
    /// Paths that are invoked from outside the inventory (binaries, routes).
    pub entry_points: Vec<String>,
    /// Path prefixes that form a public interface.
    pub public_interfaces: Vec<String>,
    /// Regexes over paths that are always protected, on top of the built-in
    /// categories.
    pub extra_protected_patterns: Vec<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            high_confidence: 0.6,
            low_confidence: 0.25,
            stale_after_days: 90,
            active_within_days: 14,
            entry_points: vec![],
            public_interfaces: vec![],
            extra_protected_patterns: vec![],
        }
    }
}

impl AuditConfig {
    /// Reject thresholds outside `0 < low <= high <= 1` and windows where
    /// the fresh window reaches past the stale one.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let (low, high) = (self.low_confidence, self.high_confidence);
        if !(low > 0.0 && low <= high && high <= 1.0) {
            return Err(ConfigurationError::InvalidConfig(format!(
                "confidence thresholds must satisfy 0 < low <= high <= 1, got low={low} high={high}"
            )));
        }
        if self.active_within_days > self.stale_after_days {
            return Err(ConfigurationError::InvalidConfig(format!(
                "active_within_days ({}) exceeds stale_after_days ({})",
                self.active_within_days, self.stale_after_days
            )));
        }
        Ok(())
    }
}
