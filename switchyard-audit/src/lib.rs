#![deny(missing_docs)]
//! Compliance audit for switchyard.
//!
//! Reconciles a requirements corpus against a codebase inventory supplied
//! by an external scanner:
//!
//! 1. [`CorpusParser`] turns plain text into [`RequirementRecord`]s.
//! 2. Requirements and artifacts are reduced to keyword sets and scored
//!    against each other ([`matching`]).
//! 3. [`Auditor`] classifies both sides, computes coverage and gaps, and
//!    splits out-of-scope artifacts into a safe phase and a review phase
//!    using the [`SafetyGate`].
//! 4. The result is an immutable [`AuditReport`]; re-runs append to an
//!    [`AuditLedger`].
//!
//! [`AuditCapability`] exposes the whole thing as a handler.

pub mod auditor;
pub mod capability;
pub mod config;
pub mod corpus;
pub mod inventory;
pub mod matching;
pub mod report;
pub mod safety;

pub use auditor::Auditor;
pub use capability::AuditCapability;
pub use config::AuditConfig;
pub use corpus::{CorpusParser, ParsedCorpus, Priority, RequirementRecord};
pub use inventory::{ArtifactCategory, ArtifactDescriptor, RecencyBucket};
pub use matching::{MatchStrength, Matcher};
pub use report::{
    ArtifactClassification, ArtifactScope, AuditInconsistency, AuditLedger, AuditReport,
    DependencyNote, Gap, LedgerEntry, MatchRef, Overage, RequirementClassification,
    RequirementStatus,
};
pub use safety::{SafetyCondition, SafetyGate, SafetyVerdict};
