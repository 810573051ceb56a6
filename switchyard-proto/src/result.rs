//! What one handler invocation produced.

use crate::duration::DurationMs;
use crate::handler::Category;
use crate::id::HandlerId;
use crate::work::WorkItem;
use serde::Serialize;
use thiserror::Error;

/// Replacement diagnostic for handlers that fail with an empty message.
pub const MISSING_DIAGNOSTIC: &str = "handler reported failure without diagnostic";

/// Outcome class of a handler invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    /// The handler did everything it was asked.
    Success,
    /// The handler did some of it.
    Partial,
    /// The handler failed; a diagnostic is attached.
    Failure,
}

/// What a handler returns on the `Ok` path. Only `success` and `partial`
/// can be expressed here; failure goes through `Err(HandlerError)`.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerOutput {
    /// Whether only part of the work was done.
    pub partial: bool,
    /// Structured output payload.
    pub output: serde_json::Value,
    /// New work the handler wants done (e.g. review emits a fix item).
    pub follow_ups: Vec<WorkItem>,
}

impl HandlerOutput {
    /// A complete result.
    pub fn success(output: serde_json::Value) -> Self {
        Self {
            partial: false,
            output,
            follow_ups: vec![],
        }
    }

    /// A partial result.
    pub fn partial(output: serde_json::Value) -> Self {
        Self {
            partial: true,
            output,
            follow_ups: vec![],
        }
    }

    /// Attach a follow-up work item.
    pub fn with_follow_up(mut self, item: WorkItem) -> Self {
        self.follow_ups.push(item);
        self
    }
}

/// Why a handler result is a failure. Every variant renders a non-empty
/// diagnostic.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HandlerFailure {
    /// The invocation did not finish within its time bound. The handler
    /// itself may still be running in the background.
    #[error("Timeout after {after}")]
    Timeout {
        /// The bound that was exceeded.
        after: DurationMs,
    },
    /// The handler panicked or its task was lost.
    #[error("handler fault: {message}")]
    Fault {
        /// Captured panic or join message.
        message: String,
    },
    /// The handler returned an error.
    #[error("{message}")]
    Reported {
        /// The handler's own diagnostic.
        message: String,
    },
    /// A sequential handler whose dependency never produced a result.
    #[error("unresolved dependency: {dependency}")]
    UnresolvedDependency {
        /// The dependency key that could not be satisfied.
        dependency: String,
    },
}

impl HandlerFailure {
    /// Build a `Reported` failure, substituting a placeholder for an empty
    /// message.
    pub fn reported(message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            MISSING_DIAGNOSTIC.to_string()
        } else {
            message
        };
        Self::Reported { message }
    }

    /// Build a `Fault` failure with the same empty-message guard.
    pub fn fault(message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            "unknown fault".to_string()
        } else {
            message
        };
        Self::Fault { message }
    }

    /// Whether this failure is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// One handler's contribution to a batch.
///
/// Fields are read-only so that a `failure` status always comes with a
/// [`HandlerFailure`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerResult {
    handler: HandlerId,
    category: Category,
    status: ResultStatus,
    output: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure: Option<HandlerFailure>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    follow_ups: Vec<WorkItem>,
    duration: DurationMs,
}

impl HandlerResult {
    /// Result of a handler that returned `Ok`.
    pub fn completed(
        handler: HandlerId,
        category: Category,
        output: HandlerOutput,
        duration: DurationMs,
    ) -> Self {
        Self {
            handler,
            category,
            status: if output.partial {
                ResultStatus::Partial
            } else {
                ResultStatus::Success
            },
            output: output.output,
            failure: None,
            follow_ups: output.follow_ups,
            duration,
        }
    }

    /// Result of a handler that failed, timed out or faulted.
    pub fn failed(
        handler: HandlerId,
        category: Category,
        failure: HandlerFailure,
        duration: DurationMs,
    ) -> Self {
        Self {
            handler,
            category,
            status: ResultStatus::Failure,
            output: serde_json::Value::Null,
            failure: Some(failure),
            follow_ups: vec![],
            duration,
        }
    }

    /// Handler that produced this result.
    pub fn handler(&self) -> &HandlerId {
        &self.handler
    }

    /// Category of that handler.
    pub fn category(&self) -> Category {
        self.category
    }

    /// Outcome class.
    pub fn status(&self) -> ResultStatus {
        self.status
    }

    /// Whether the status is `success`.
    pub fn is_success(&self) -> bool {
        self.status == ResultStatus::Success
    }

    /// Whether the status is `failure`.
    pub fn is_failure(&self) -> bool {
        self.status == ResultStatus::Failure
    }

    /// Structured output. Null for failures.
    pub fn output(&self) -> &serde_json::Value {
        &self.output
    }

    /// Failure diagnostic, present exactly when the status is `failure`.
    pub fn failure(&self) -> Option<&HandlerFailure> {
        self.failure.as_ref()
    }

    /// Rendered diagnostic, if this is a failure.
    pub fn diagnostic(&self) -> Option<String> {
        self.failure.as_ref().map(ToString::to_string)
    }

    /// Follow-up work emitted by the handler.
    pub fn follow_ups(&self) -> &[WorkItem] {
        &self.follow_ups
    }

    /// Take the follow-up items out, leaving the list empty.
    pub fn take_follow_ups(&mut self) -> Vec<WorkItem> {
        std::mem::take(&mut self.follow_ups)
    }

    /// Wall-clock duration of the invocation as observed by the executor.
    pub fn duration(&self) -> DurationMs {
        self.duration
    }
}
