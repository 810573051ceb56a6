#![deny(missing_docs)]
//! Gated stage workflows for switchyard.
//!
//! A [`Workflow`] is a validated DAG of [`Stage`]s, each guarded by a
//! [`Gate`]. The [`WorkflowEngine`] executes one stage at a time through the
//! executor, drains follow-up work inside the stage, and only releases
//! successor stages whose predecessors have all passed their gates. A gate
//! failure halts the run with a [`GateFailure`].
//!
//! [`Dispatcher`] is the inbound side: it either executes a work item once
//! or starts a background run and hands back its [`RunId`].
//!
//! [`RunId`]: switchyard_proto::id::RunId

pub mod dispatcher;
pub mod engine;
pub mod gate;
pub mod workflow;

pub use dispatcher::{Dispatcher, Receipt, RunState, Submission};
pub use engine::{
    Advance, EngineConfig, GateFailure, RunStatus, StageOutcome, WorkflowEngine, WorkflowError,
    WorkflowRun,
};
pub use gate::{Gate, GateVerdict};
pub use workflow::{Stage, Workflow, WorkflowBuilder};
