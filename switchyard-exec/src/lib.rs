#![deny(missing_docs)]
//! Concurrent, time-bounded executor for switchyard handler batches.
//!
//! Independent handlers are launched together with `tokio::spawn`;
//! `sequential-after` handlers run one at a time afterwards, each once its
//! dependency's results are in. Every invocation gets a deadline. A timeout
//! yields a `failure` result but does not abort the handler's task, which
//! may keep running in the background. Panics and errors become `failure`
//! results too. Nothing short-circuits: the executor waits for every
//! handler before returning, and results come back in registration order.
//!
//! The only `Err` the executor returns is a [`DispatchError`] for a work
//! item that fails validation, before any handler is touched.

mod plan;

use futures::FutureExt;
use serde::Deserialize;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use switchyard_proto::duration::DurationMs;
use switchyard_proto::error::{DispatchError, HandlerError};
use switchyard_proto::handler::ConcurrencyClass;
use switchyard_proto::result::{HandlerFailure, HandlerOutput, HandlerResult};
use switchyard_proto::work::WorkItem;
use switchyard_registry::{CapabilityRegistry, RegisteredHandler};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Executor settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Time bound for handlers that don't declare their own.
    pub default_timeout: DurationMs,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            default_timeout: DurationMs::from_secs(30),
        }
    }
}

/// Runs batches of routed handlers.
#[derive(Debug, Clone, Default)]
pub struct Executor {
    config: ExecutorConfig,
}

/// What a spawned invocation reports back: its outcome, or the panic
/// payload, and the instant it finished.
type Invocation = (
    Result<Result<HandlerOutput, HandlerError>, Box<dyn Any + Send>>,
    Instant,
);

/// A launched invocation that has not been collected yet.
struct InFlight {
    handle: JoinHandle<Invocation>,
    started: Instant,
    deadline: Instant,
    timeout: DurationMs,
}

impl Executor {
    /// Create an executor.
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Validate, route through `registry`, and execute the matches.
    pub async fn dispatch(
        &self,
        registry: &CapabilityRegistry,
        item: &WorkItem,
    ) -> Result<Vec<HandlerResult>, DispatchError> {
        item.validate()?;
        let handlers = registry.route(item);
        self.execute(&handlers, item).await
    }

    /// Execute a batch of handlers against one work item.
    ///
    /// The returned list has one result per handler, ordered by
    /// registration position regardless of completion order.
    pub async fn execute(
        &self,
        handlers: &[RegisteredHandler],
        item: &WorkItem,
    ) -> Result<Vec<HandlerResult>, DispatchError> {
        item.validate()?;

        let mut batch = handlers.to_vec();
        batch.sort_by_key(RegisteredHandler::position);
        let (independent, sequential) = plan::partition(&batch);
        let mut slots: Vec<Option<HandlerResult>> = vec![None; batch.len()];

        tracing::debug!(
            item = %item.id,
            independent = independent.len(),
            sequential = sequential.len(),
            "switchyard.exec.batch"
        );

        // Launch every independent handler before collecting any of them.
        let launched: Vec<(usize, InFlight)> = independent
            .iter()
            .map(|&i| (i, self.launch(&batch[i], item.clone())))
            .collect();
        for (i, in_flight) in launched {
            slots[i] = Some(collect(&batch[i], in_flight).await);
        }

        let mut pending = sequential;
        while !pending.is_empty() {
            let runnable = pending.iter().position(|&i| {
                let key = dependency_key(&batch[i]);
                plan::dependencies(&batch, i, key)
                    .iter()
                    .all(|&d| slots[d].is_some())
            });
            let Some(at) = runnable else {
                for &i in &pending {
                    let key = dependency_key(&batch[i]).to_string();
                    tracing::warn!(
                        handler = %batch[i].id(),
                        dependency = %key,
                        "switchyard.exec.unresolved_dependency"
                    );
                    slots[i] = Some(HandlerResult::failed(
                        batch[i].id().clone(),
                        batch[i].spec().category,
                        HandlerFailure::UnresolvedDependency { dependency: key },
                        DurationMs::ZERO,
                    ));
                }
                break;
            };
            let i = pending.remove(at);
            let mut own = item.clone();
            for d in plan::dependencies(&batch, i, dependency_key(&batch[i])) {
                if let Some(result) = &slots[d] {
                    own.context
                        .insert(result.handler().clone(), result.output().clone());
                }
            }
            let in_flight = self.launch(&batch[i], own);
            slots[i] = Some(collect(&batch[i], in_flight).await);
        }

        Ok(slots.into_iter().flatten().collect())
    }

    fn launch(&self, handler: &RegisteredHandler, item: WorkItem) -> InFlight {
        let timeout = handler.spec().timeout.unwrap_or(self.config.default_timeout);
        let capability = handler.capability().clone();
        tracing::debug!(handler = %handler.id(), timeout = %timeout, "switchyard.exec.dispatch");
        let started = Instant::now();
        InFlight {
            handle: tokio::spawn(async move {
                let outcome = AssertUnwindSafe(capability.invoke(item)).catch_unwind().await;
                (outcome, Instant::now())
            }),
            started,
            deadline: started + timeout.to_std(),
            timeout,
        }
    }
}

fn dependency_key(handler: &RegisteredHandler) -> &str {
    match &handler.spec().concurrency {
        ConcurrencyClass::SequentialAfter(key) => key,
        ConcurrencyClass::Independent => "",
    }
}

/// Wait for one invocation up to its deadline and turn the outcome into a
/// result. On timeout the join handle is dropped, which detaches the task
/// instead of cancelling it.
///
/// Siblings are collected one after another, so an invocation may already
/// be finished when its turn comes. Its own finish instant decides both the
/// timeout and the recorded duration.
async fn collect(handler: &RegisteredHandler, in_flight: InFlight) -> HandlerResult {
    let id = handler.id().clone();
    let category = handler.spec().category;
    let joined = tokio::time::timeout_at(in_flight.deadline, in_flight.handle).await;

    let (outcome, finished) = match joined {
        Ok(Ok((_, finished))) if finished > in_flight.deadline => {
            return timed_out(handler, in_flight.timeout);
        }
        Ok(Ok(invocation)) => invocation,
        Ok(Err(join_error)) => {
            let message = join_error.to_string();
            tracing::warn!(handler = %id, message = %message, "switchyard.exec.fault");
            let elapsed = DurationMs::from(in_flight.started.elapsed());
            return HandlerResult::failed(id, category, HandlerFailure::fault(message), elapsed);
        }
        Err(_elapsed) => return timed_out(handler, in_flight.timeout),
    };
    let elapsed = DurationMs::from(finished.duration_since(in_flight.started));

    match outcome {
        Ok(Ok(output)) => {
            tracing::debug!(handler = %id, partial = output.partial, elapsed = %elapsed, "switchyard.exec.complete");
            HandlerResult::completed(id, category, output, elapsed)
        }
        Ok(Err(error)) => {
            tracing::debug!(handler = %id, error = %error, "switchyard.exec.failed");
            HandlerResult::failed(id, category, HandlerFailure::reported(error.to_string()), elapsed)
        }
        Err(payload) => {
            let message = panic_message(payload);
            tracing::warn!(handler = %id, message = %message, "switchyard.exec.fault");
            HandlerResult::failed(id, category, HandlerFailure::fault(message), elapsed)
        }
    }
}

fn timed_out(handler: &RegisteredHandler, timeout: DurationMs) -> HandlerResult {
    tracing::warn!(handler = %handler.id(), timeout = %timeout, "switchyard.exec.timeout");
    HandlerResult::failed(
        handler.id().clone(),
        handler.spec().category,
        HandlerFailure::Timeout { after: timeout },
        timeout,
    )
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}
