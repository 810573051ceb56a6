#![deny(missing_docs)]
//! # switchyard — umbrella crate
//!
//! One import surface for the switchyard components. Re-exports each crate
//! behind a feature flag, an aggregated [`SwitchyardConfig`], and a
//! `prelude` for the common path.

#[cfg(feature = "core")]
mod config;

#[cfg(feature = "core")]
pub use config::SwitchyardConfig;

#[cfg(feature = "audit")]
pub use switchyard_audit;
#[cfg(feature = "core")]
pub use switchyard_exec;
#[cfg(feature = "core")]
pub use switchyard_proto;
#[cfg(feature = "core")]
pub use switchyard_registry;
#[cfg(feature = "workflow")]
pub use switchyard_workflow;

/// Common imports for wiring a switchyard.
pub mod prelude {
    #[cfg(feature = "core")]
    pub use switchyard_proto::{
        Capability, Category, ConcurrencyClass, DurationMs, HandlerError, HandlerFailure,
        HandlerId, HandlerOutput, HandlerResult, HandlerSpec, ResultStatus, ToolScope, Trigger,
        WorkItem,
    };

    #[cfg(feature = "core")]
    pub use switchyard_registry::CapabilityRegistry;

    #[cfg(feature = "core")]
    pub use switchyard_exec::{Executor, ExecutorConfig};

    #[cfg(feature = "workflow")]
    pub use switchyard_workflow::{
        Dispatcher, EngineConfig, Gate, Receipt, RunState, RunStatus, Stage, Submission,
        Workflow, WorkflowEngine,
    };

    #[cfg(feature = "audit")]
    pub use switchyard_audit::{
        AuditCapability, AuditConfig, AuditReport, Auditor, ArtifactDescriptor, SafetyGate,
    };

    #[cfg(feature = "core")]
    pub use crate::SwitchyardConfig;
}
