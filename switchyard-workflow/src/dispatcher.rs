//! Inbound work submission.

use crate::engine::{WorkflowEngine, WorkflowError, WorkflowRun};
use crate::workflow::Workflow;
use futures::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use switchyard_proto::id::RunId;
use switchyard_proto::result::HandlerResult;
use switchyard_proto::work::WorkItem;
use tokio::sync::watch;

/// A request to process one work item.
#[derive(Debug, Clone)]
pub enum Submission {
    /// Route and execute once, returning results to the caller.
    Direct(WorkItem),
    /// Start a run of the dispatcher's workflow in the background.
    Staged(WorkItem),
}

/// What [`Dispatcher::submit`] hands back.
#[derive(Debug, Clone)]
pub enum Receipt {
    /// Results of a direct dispatch, in registration order.
    Direct(Vec<HandlerResult>),
    /// Handle for a background run.
    Staged(RunId),
}

/// Snapshot of a background run.
#[derive(Debug, Clone)]
pub enum RunState {
    /// Still executing.
    Running,
    /// Halted or completed. The run's status says which.
    Finished(Arc<WorkflowRun>),
    /// The run stopped on an error before reaching a verdict.
    Errored(WorkflowError),
}

impl RunState {
    /// Anything but `Running`.
    pub fn is_done(&self) -> bool {
        !matches!(self, RunState::Running)
    }
}

/// Accepts submissions and tracks the runs they start.
pub struct Dispatcher {
    engine: Arc<WorkflowEngine>,
    workflow: Arc<Workflow>,
    runs: Mutex<HashMap<RunId, watch::Receiver<RunState>>>,
    next_run: AtomicU64,
}

impl Dispatcher {
    /// Staged submissions run `workflow` on `engine`.
    pub fn new(engine: Arc<WorkflowEngine>, workflow: Arc<Workflow>) -> Self {
        Self {
            engine,
            workflow,
            runs: Mutex::new(HashMap::new()),
            next_run: AtomicU64::new(1),
        }
    }

    /// The engine runs execute on.
    pub fn engine(&self) -> &Arc<WorkflowEngine> {
        &self.engine
    }

    /// Validate and accept a submission.
    ///
    /// Staged runs are spawned on the current tokio runtime and the receipt
    /// is returned immediately.
    pub async fn submit(&self, submission: Submission) -> Result<Receipt, WorkflowError> {
        match submission {
            Submission::Direct(item) => {
                let results = self
                    .engine
                    .executor()
                    .dispatch(self.engine.registry(), &item)
                    .await?;
                Ok(Receipt::Direct(results))
            }
            Submission::Staged(item) => {
                item.validate()?;
                let n = self.next_run.fetch_add(1, Ordering::Relaxed);
                let id = RunId::new(format!("run-{n}"));
                let (tx, rx) = watch::channel(RunState::Running);
                self.runs_guard().insert(id.clone(), rx);

                let engine = Arc::clone(&self.engine);
                let workflow = Arc::clone(&self.workflow);
                let run_id = id.clone();
                tracing::info!(run = %id, item = %item.id, "switchyard.dispatcher.staged");
                tokio::spawn(async move {
                    let run = AssertUnwindSafe(engine.run(run_id.clone(), workflow, &item));
                    let state = match run.catch_unwind().await {
                        Ok(Ok(run)) => RunState::Finished(Arc::new(run)),
                        Ok(Err(e)) => RunState::Errored(e),
                        Err(payload) => {
                            let reason = panic_message(payload);
                            tracing::error!(run = %run_id, reason = %reason, "switchyard.dispatcher.aborted");
                            RunState::Errored(WorkflowError::RunAborted {
                                run: run_id.to_string(),
                                reason,
                            })
                        }
                    };
                    // No receivers left only means nobody is watching.
                    let _ = tx.send(state);
                });
                Ok(Receipt::Staged(id))
            }
        }
    }

    /// Latest state of a run, or `None` if the id is unknown.
    pub fn status(&self, id: &RunId) -> Option<RunState> {
        self.runs_guard().get(id).map(|rx| rx.borrow().clone())
    }

    /// Wait for a run to finish.
    pub async fn wait(&self, id: &RunId) -> Result<RunState, WorkflowError> {
        let mut rx = self
            .runs_guard()
            .get(id)
            .cloned()
            .ok_or_else(|| WorkflowError::RunNotFound(id.to_string()))?;
        rx.wait_for(RunState::is_done)
            .await
            .map(|state| state.clone())
            .map_err(|_| WorkflowError::RunAborted {
                run: id.to_string(),
                reason: "run task ended without a verdict".into(),
            })
    }

    /// Stop tracking a run and release its results. Returns the last known
    /// state. A run still executing keeps going; its verdict is discarded.
    pub fn forget(&self, id: &RunId) -> Option<RunState> {
        let rx = self.runs_guard().remove(id)?;
        let state = rx.borrow().clone();
        Some(state)
    }

    /// Number of runs currently tracked.
    pub fn tracked(&self) -> usize {
        self.runs_guard().len()
    }

    fn runs_guard(&self) -> std::sync::MutexGuard<'_, HashMap<RunId, watch::Receiver<RunState>>> {
        // A poisoned map is still structurally valid.
        self.runs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "run task panicked".to_string()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("workflow_stages", &self.workflow.stages().len())
            .field("next_run", &self.next_run.load(Ordering::Relaxed))
            .finish()
    }
}
