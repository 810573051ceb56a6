//! The deletion safety gate.

use crate::config::AuditConfig;
use crate::inventory::ArtifactDescriptor;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use switchyard_proto::error::ConfigurationError;

/// A precondition for automatic deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SafetyCondition {
    /// Nothing references the artifact and it is not an entry point.
    InboundReferences,
    /// Untouched for the stale window.
    NotStale,
    /// Not in a protected category or protected path.
    ProtectedCategory,
    /// Not part of a public interface.
    PublicInterface,
}

/// Conditions an artifact fails. Empty means safe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SafetyVerdict {
    unmet: Vec<SafetyCondition>,
}

impl SafetyVerdict {
    /// Whether every condition holds.
    pub fn is_safe(&self) -> bool {
        self.unmet.is_empty()
    }

    /// The conditions that failed, in declaration order.
    pub fn unmet(&self) -> &[SafetyCondition] {
        &self.unmet
    }
}

/// Decides whether an artifact can be deleted without review.
///
/// An artifact is safe only when all four conditions hold: no inbound
/// references, stale, unprotected, and not public. The gate only reports;
/// it never rejects the audit as a whole.
#[derive(Debug, Clone)]
pub struct SafetyGate {
    stale_after_days: u32,
    entry_points: BTreeSet<String>,
    public_interfaces: Vec<String>,
    protected: Vec<Regex>,
}

impl SafetyGate {
    /// Build from config, compiling the extra protected patterns.
    pub fn new(config: &AuditConfig) -> Result<Self, ConfigurationError> {
        let protected = config
            .extra_protected_patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| {
                    ConfigurationError::InvalidConfig(format!("protected pattern {p:?}: {e}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            stale_after_days: config.stale_after_days,
            entry_points: config.entry_points.iter().cloned().collect(),
            public_interfaces: config.public_interfaces.clone(),
            protected,
        })
    }

    /// Whether the path is a declared entry point.
    pub fn is_entry_point(&self, artifact: &ArtifactDescriptor) -> bool {
        self.entry_points.contains(&artifact.path)
    }

    /// Protected by category or by an extra pattern.
    pub fn is_protected(&self, artifact: &ArtifactDescriptor) -> bool {
        artifact.effective_category().is_protected()
            || self.protected.iter().any(|re| re.is_match(&artifact.path))
    }

    /// Flagged public or under a public-interface prefix.
    pub fn is_public(&self, artifact: &ArtifactDescriptor) -> bool {
        artifact.public_interface
            || self
                .public_interfaces
                .iter()
                .any(|prefix| artifact.path.starts_with(prefix.as_str()))
    }

    /// Check every condition.
    pub fn evaluate(&self, artifact: &ArtifactDescriptor) -> SafetyVerdict {
        let mut unmet = vec![];
        if artifact.reference_count > 0 || self.is_entry_point(artifact) {
            unmet.push(SafetyCondition::InboundReferences);
        }
        if artifact.days_since_modified < self.stale_after_days {
            unmet.push(SafetyCondition::NotStale);
        }
        if self.is_protected(artifact) {
            unmet.push(SafetyCondition::ProtectedCategory);
        }
        if self.is_public(artifact) {
            unmet.push(SafetyCondition::PublicInterface);
        }
        SafetyVerdict { unmet }
    }

    /// Shorthand for `evaluate(artifact).is_safe()`.
    pub fn is_safe_to_delete(&self, artifact: &ArtifactDescriptor) -> bool {
        self.evaluate(artifact).is_safe()
    }
}
