//! # switchyard-proto — Protocol types for capability routing
//!
//! This crate defines the vocabulary shared by every switchyard component:
//! what a unit of work looks like, how a capability handler declares itself,
//! what a handler invocation produces, and how things go wrong.
//!
//! ## The Pieces
//!
//! | Concept | Types | What it is |
//! |---------|-------|------------|
//! | Work | [`WorkItem`] | An opaque request routed to handlers |
//! | Capability | [`Capability`], [`HandlerSpec`] | One operation behind a uniform contract |
//! | Selection | [`Trigger`], [`Category`] | Typed predicates over work-item attributes |
//! | Scheduling | [`ConcurrencyClass`], [`ToolScope`] | How a handler may run next to others |
//! | Outcome | [`HandlerResult`], [`HandlerFailure`] | What one invocation produced |
//!
//! ## Design Principle
//!
//! The handler contract is a single operation. [`Capability::invoke`] means
//! "do your one thing with this work item". Whether the handler calls a
//! model, shells out or computes locally is its own concern. The router,
//! executor and workflow engine only ever see specs and results.
//!
//! Failure results are never built by handlers: a handler returns
//! `Err(HandlerError)` and the executor turns errors, timeouts and panics
//! into a [`HandlerResult`] whose diagnostic is guaranteed to be non-empty.

#![deny(missing_docs)]

pub mod duration;
pub mod error;
pub mod handler;
pub mod id;
pub mod result;
pub mod trigger;
pub mod work;

#[cfg(feature = "test-utils")]
pub mod test_utils;

// Re-exports for convenience
pub use duration::DurationMs;
pub use error::{ConfigurationError, DispatchError, HandlerError};
pub use handler::{Access, Capability, Category, ConcurrencyClass, HandlerSpec, ToolScope};
pub use id::{HandlerId, RequirementId, RunId, StageName, WorkItemId};
pub use result::{HandlerFailure, HandlerOutput, HandlerResult, ResultStatus};
pub use trigger::Trigger;
pub use work::WorkItem;
