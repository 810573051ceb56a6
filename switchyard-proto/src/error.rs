//! Error types shared across components.
//!
//! Only two of these are ever returned as `Err` from a top-level operation:
//! [`ConfigurationError`] (fatal, raised before any run starts) and
//! [`DispatchError`] (a malformed work item, rejected before routing).
//! Handler failures travel inside results instead, see
//! [`crate::result::HandlerFailure`].

use thiserror::Error;

/// Bad registry or workflow configuration. Always fatal, always surfaced at
/// construction time rather than during a run.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// A handler with the same identity is already registered.
    #[error("duplicate capability: {0}")]
    DuplicateCapability(String),

    /// Two independent handlers declare overlapping write scopes.
    #[error("scope conflict: {first} and {second} both write {resource}")]
    ScopeConflict {
        /// Handler already in the registry.
        first: String,
        /// Handler being registered.
        second: String,
        /// The overlapping resource.
        resource: String,
    },

    /// A workflow has no stages.
    #[error("workflow has no stages")]
    EmptyWorkflow,

    /// Two stages share a name.
    #[error("duplicate stage: {0}")]
    DuplicateStage(String),

    /// A stage names a predecessor that does not exist.
    #[error("stage {stage} names unknown predecessor {predecessor}")]
    UnknownPredecessor {
        /// The stage declaring the dependency.
        stage: String,
        /// The missing predecessor.
        predecessor: String,
    },

    /// The stage graph contains a cycle through the listed stages.
    #[error("stage cycle detected: {}", .0.join(" -> "))]
    CycleDetected(Vec<String>),

    /// No stage is free of predecessors.
    #[error("workflow has no initial stage")]
    NoInitialStage,

    /// More than one stage is free of predecessors.
    #[error("workflow has several initial stages: {}", .0.join(", "))]
    MultipleInitialStages(Vec<String>),

    /// A stage cannot be reached from the initial stage.
    #[error("stage {0} is unreachable from the initial stage")]
    UnreachableStage(String),

    /// No terminal stage can be reached from the given stage.
    #[error("no terminal stage is reachable from {0}")]
    NoReachableTerminal(String),

    /// A terminal stage has successors.
    #[error("terminal stage {0} has successors")]
    TerminalHasSuccessors(String),

    /// A configuration document could not be parsed or is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// A work item rejected before handler selection.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The work item id is empty.
    #[error("work item has an empty id")]
    EmptyId,

    /// The payload is neither a JSON object nor null.
    #[error("work item {id}: payload must be an object or null, got {kind}")]
    InvalidPayload {
        /// Offending work item.
        id: String,
        /// JSON kind that was supplied.
        kind: &'static str,
    },

    /// The originating stage is present but empty.
    #[error("work item {0}: originating stage is empty")]
    EmptyStage(String),

    /// A tag is empty.
    #[error("work item {0}: empty tag")]
    EmptyTag(String),
}

/// Error returned by a handler invocation. Converted by the executor into a
/// `failure` result; never propagated past the batch.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The handler could not do its work with this input.
    #[error("rejected input: {0}")]
    InvalidInput(String),

    /// The handler tried and failed.
    #[error("{0}")]
    Failed(String),

    /// Catch-all. Include context.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}
