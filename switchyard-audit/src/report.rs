//! The audit report, its parts, and the append-only ledger of reports.

use crate::corpus::Priority;
use crate::inventory::{ArtifactCategory, RecencyBucket};
use crate::matching::MatchStrength;
use crate::safety::SafetyCondition;
use serde::Serialize;
use std::sync::Arc;
use switchyard_proto::id::RequirementId;
use thiserror::Error;

/// Something in the inputs that does not add up. Recorded in the report;
/// never aborts the audit.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditInconsistency {
    /// The same requirement id appears twice; the later record was dropped.
    #[error("duplicate requirement id {id}")]
    DuplicateRequirement {
        /// The repeated id.
        id: RequirementId,
    },

    /// An artifact claims a requirement that does not exist. The artifact
    /// is retained and left out of the deletion plan.
    #[error("{artifact} claims unknown requirement {requirement}")]
    UnknownRequirementClaim {
        /// Claiming artifact.
        artifact: String,
        /// Claimed id.
        requirement: RequirementId,
    },

    /// The same path appears twice in the inventory; the later entry was
    /// dropped.
    #[error("duplicate artifact {path}")]
    DuplicateArtifact {
        /// The repeated path.
        path: String,
    },
}

/// Requirement-side classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementStatus {
    /// A high-confidence match exists.
    Implemented,
    /// Only low-confidence matches exist.
    Partial,
    /// Nothing matches.
    Missing,
}

/// Artifact-side classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactScope {
    /// Serves a requirement, or protected.
    InScope,
    /// Serves nothing.
    OutOfScope,
    /// One weak match; needs a human.
    Uncertain,
}

/// A match recorded on a classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchRef {
    /// The other side: an artifact path or a requirement id.
    pub target: String,
    /// Strength of the match.
    pub strength: MatchStrength,
    /// Raw score.
    pub score: f64,
}

/// Classification of one non-excluded requirement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequirementClassification {
    /// Requirement id.
    pub id: RequirementId,
    /// Priority.
    pub priority: Priority,
    /// Coverage status.
    pub status: RequirementStatus,
    /// Artifacts matching at `Partial` or better, by path.
    pub matches: Vec<MatchRef>,
}

/// Classification of one artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactClassification {
    /// Artifact path.
    pub path: String,
    /// Declared or inferred category.
    pub category: ArtifactCategory,
    /// Recency bucket.
    pub recency: RecencyBucket,
    /// Scope.
    pub scope: ArtifactScope,
    /// Requirements matching at `Partial` or better, by id.
    pub matches: Vec<MatchRef>,
    /// Left out of the deletion plan because of an inconsistency.
    pub held: bool,
}

/// A requirement that is not fully implemented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Gap {
    /// Requirement id.
    pub id: RequirementId,
    /// Priority.
    pub priority: Priority,
    /// `partial` or `missing`.
    pub status: RequirementStatus,
    /// Requirement text.
    pub description: String,
}

/// An out-of-scope artifact proposed for deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Overage {
    /// Artifact path.
    pub path: String,
    /// Size in bytes.
    pub size_bytes: u64,
    /// Safety conditions that failed. Empty in phase 1.
    pub unmet: Vec<SafetyCondition>,
}

/// Something to sort out before removing an out-of-scope artifact.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DependencyNote {
    /// Other artifacts still reference it.
    StillReferenced {
        /// Artifact path.
        path: String,
        /// Inbound reference count.
        references: u32,
    },
    /// It is a declared entry point.
    EntryPoint {
        /// Artifact path.
        path: String,
    },
    /// It is part of a public interface.
    PublicInterface {
        /// Artifact path.
        path: String,
    },
}

/// Outcome of one audit. Immutable once built; re-runs append a new report
/// to an [`AuditLedger`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditReport {
    coverage: f64,
    requirements: Vec<RequirementClassification>,
    artifacts: Vec<ArtifactClassification>,
    gaps: Vec<Gap>,
    excluded: Vec<RequirementId>,
    phase1: Vec<Overage>,
    phase2: Vec<Overage>,
    dependency_notes: Vec<DependencyNote>,
    inconsistencies: Vec<AuditInconsistency>,
}

/// Parts of an [`AuditReport`], assembled by the auditor.
#[derive(Debug, Default)]
pub(crate) struct ReportParts {
    pub(crate) coverage: f64,
    pub(crate) requirements: Vec<RequirementClassification>,
    pub(crate) artifacts: Vec<ArtifactClassification>,
    pub(crate) gaps: Vec<Gap>,
    pub(crate) excluded: Vec<RequirementId>,
    pub(crate) phase1: Vec<Overage>,
    pub(crate) phase2: Vec<Overage>,
    pub(crate) dependency_notes: Vec<DependencyNote>,
    pub(crate) inconsistencies: Vec<AuditInconsistency>,
}

impl AuditReport {
    pub(crate) fn from_parts(parts: ReportParts) -> Self {
        Self {
            coverage: parts.coverage,
            requirements: parts.requirements,
            artifacts: parts.artifacts,
            gaps: parts.gaps,
            excluded: parts.excluded,
            phase1: parts.phase1,
            phase2: parts.phase2,
            dependency_notes: parts.dependency_notes,
            inconsistencies: parts.inconsistencies,
        }
    }

    /// Implemented share of non-excluded requirements, in percent, rounded
    /// to two decimals. 100 when there are none.
    pub fn coverage(&self) -> f64 {
        self.coverage
    }

    /// Requirement classifications, by id.
    pub fn requirements(&self) -> &[RequirementClassification] {
        &self.requirements
    }

    /// Look up one requirement classification.
    pub fn requirement(&self, id: &RequirementId) -> Option<&RequirementClassification> {
        self.requirements.iter().find(|r| &r.id == id)
    }

    /// Artifact classifications, by path.
    pub fn artifacts(&self) -> &[ArtifactClassification] {
        &self.artifacts
    }

    /// Look up one artifact classification.
    pub fn artifact(&self, path: &str) -> Option<&ArtifactClassification> {
        self.artifacts.iter().find(|a| a.path == path)
    }

    /// Partial and missing requirements, highest priority first.
    pub fn gaps(&self) -> &[Gap] {
        &self.gaps
    }

    /// Ids of requirements documented as intentionally unbuilt.
    pub fn excluded(&self) -> &[RequirementId] {
        &self.excluded
    }

    /// Safe deletions.
    pub fn phase1(&self) -> &[Overage] {
        &self.phase1
    }

    /// Deletions needing manual review.
    pub fn phase2(&self) -> &[Overage] {
        &self.phase2
    }

    /// Notes about out-of-scope artifacts other code still relies on.
    pub fn dependency_notes(&self) -> &[DependencyNote] {
        &self.dependency_notes
    }

    /// Input problems found along the way.
    pub fn inconsistencies(&self) -> &[AuditInconsistency] {
        &self.inconsistencies
    }

    /// Canonical JSON encoding. Equal reports encode to equal bytes.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }
}

/// One entry of an [`AuditLedger`].
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    /// 1-based position in the ledger.
    pub sequence: u64,
    /// The report.
    pub report: Arc<AuditReport>,
}

/// Append-only history of audit reports.
#[derive(Debug, Default)]
pub struct AuditLedger {
    entries: Vec<LedgerEntry>,
}

impl AuditLedger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a report and return its sequence number.
    pub fn append(&mut self, report: AuditReport) -> u64 {
        let sequence = self.entries.len() as u64 + 1;
        self.entries.push(LedgerEntry {
            sequence,
            report: Arc::new(report),
        });
        sequence
    }

    /// Report by sequence number.
    pub fn get(&self, sequence: u64) -> Option<&LedgerEntry> {
        usize::try_from(sequence)
            .ok()
            .and_then(|s| s.checked_sub(1))
            .and_then(|i| self.entries.get(i))
    }

    /// Most recent entry.
    pub fn latest(&self) -> Option<&LedgerEntry> {
        self.entries.last()
    }

    /// Number of reports.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no report was appended yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.iter()
    }
}
