//! Gated advancement through a workflow.

use crate::gate::GateVerdict;
use crate::workflow::Workflow;
use serde::Deserialize;
use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use switchyard_exec::Executor;
use switchyard_proto::error::DispatchError;
use switchyard_proto::id::{RunId, StageName};
use switchyard_proto::result::HandlerResult;
use switchyard_proto::work::WorkItem;
use switchyard_registry::CapabilityRegistry;
use thiserror::Error;

/// Engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound on follow-up items executed per stage.
    pub max_followups: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { max_followups: 128 }
    }
}

/// A stage gate that did not hold. Halts the run.
#[derive(Debug, Clone, Error)]
#[error("gate {gate} failed at stage {stage} ({} offending result(s))", .offending.len())]
pub struct GateFailure {
    /// Stage whose gate failed.
    pub stage: StageName,
    /// Description of the gate.
    pub gate: String,
    /// Results that made the gate fail.
    pub offending: Vec<HandlerResult>,
}

/// Errors returned by the engine and dispatcher.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    /// The work item was rejected before dispatch.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Some predecessors of the stage have not passed their gates.
    #[error("stage {stage} is not ready, waiting on {}", .waiting_on.join(", "))]
    StageNotReady {
        /// Requested stage.
        stage: String,
        /// Predecessors still outstanding.
        waiting_on: Vec<String>,
    },

    /// The stage already passed its gate in this run.
    #[error("stage {0} already passed")]
    StageAlreadyPassed(String),

    /// The workflow has no stage with this name.
    #[error("unknown stage: {0}")]
    UnknownStage(String),

    /// No run with this id is known.
    #[error("run not found: {0}")]
    RunNotFound(String),

    /// The run has already halted or completed.
    #[error("run {0} has already finished")]
    AlreadyFinished(String),

    /// The run task died without a verdict, e.g. a gate predicate panicked.
    #[error("run {run} aborted: {reason}")]
    RunAborted {
        /// Run id.
        run: String,
        /// Panic message or cause.
        reason: String,
    },
}

/// Where a run stands.
#[derive(Debug, Clone)]
pub enum RunStatus {
    /// Stages remain to be executed.
    Running,
    /// A gate failed; no further stages run.
    Halted(GateFailure),
    /// The frontier is empty and a terminal stage passed.
    Completed,
}

impl RunStatus {
    /// Halted or completed.
    pub fn is_finished(&self) -> bool {
        !matches!(self, RunStatus::Running)
    }
}

/// Everything that happened in one executed stage.
#[derive(Debug, Clone)]
pub struct StageOutcome {
    /// The stage.
    pub stage: StageName,
    /// Results of the routed handlers followed by those of drained follow-ups.
    pub results: Vec<HandlerResult>,
    /// Whether the gate held.
    pub passed: bool,
    /// Follow-up items not executed because the bound was reached.
    pub dropped_followups: usize,
    /// Follow-up items rejected by validation, with the reason.
    pub rejected_followups: Vec<String>,
}

/// Result of a single [`WorkflowEngine::advance`].
#[derive(Debug, Clone)]
pub enum Advance {
    /// The gate passed. `next` lists stages that just became ready.
    Passed {
        /// Newly ready stages, in declaration order.
        next: Vec<StageName>,
    },
    /// The gate passed and the run is complete.
    Completed,
    /// The gate failed and the run is halted.
    Halted(GateFailure),
}

/// State of one pass through a workflow.
#[derive(Debug, Clone)]
pub struct WorkflowRun {
    id: RunId,
    workflow: Arc<Workflow>,
    satisfied: BTreeSet<StageName>,
    outcomes: Vec<StageOutcome>,
    ready: Vec<StageName>,
    terminal_passed: bool,
    status: RunStatus,
}

impl WorkflowRun {
    /// A fresh run whose frontier holds the initial stage.
    pub fn new(id: impl Into<RunId>, workflow: Arc<Workflow>) -> Self {
        let ready = vec![workflow.initial().name.clone()];
        Self {
            id: id.into(),
            workflow,
            satisfied: BTreeSet::new(),
            outcomes: vec![],
            ready,
            terminal_passed: false,
            status: RunStatus::Running,
        }
    }

    /// Run id.
    pub fn id(&self) -> &RunId {
        &self.id
    }

    /// The workflow being run.
    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    /// Stages whose gates passed.
    pub fn satisfied(&self) -> &BTreeSet<StageName> {
        &self.satisfied
    }

    /// Outcomes in execution order.
    pub fn outcomes(&self) -> &[StageOutcome] {
        &self.outcomes
    }

    /// Outcome of a given stage, if it ran.
    pub fn outcome(&self, stage: &StageName) -> Option<&StageOutcome> {
        self.outcomes.iter().find(|o| &o.stage == stage)
    }

    /// Stages ready to execute, in declaration order.
    pub fn ready(&self) -> &[StageName] {
        &self.ready
    }

    /// Current status.
    pub fn status(&self) -> &RunStatus {
        &self.status
    }
}

/// Runs stages through the executor and enforces their gates.
#[derive(Debug, Clone)]
pub struct WorkflowEngine {
    registry: Arc<CapabilityRegistry>,
    executor: Executor,
    config: EngineConfig,
}

impl WorkflowEngine {
    /// Create an engine.
    pub fn new(registry: Arc<CapabilityRegistry>, executor: Executor, config: EngineConfig) -> Self {
        Self {
            registry,
            executor,
            config,
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The registry handlers are routed from.
    pub fn registry(&self) -> &Arc<CapabilityRegistry> {
        &self.registry
    }

    /// The executor stages dispatch through.
    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Execute `stage` for `item` and evaluate its gate.
    ///
    /// The item is tagged with the stage as its origin, routed and executed;
    /// follow-ups are then drained breadth-first up to the configured bound.
    /// A passing gate marks the stage satisfied and releases successors
    /// whose predecessors have all passed. A failing gate halts the run.
    pub async fn advance(
        &self,
        run: &mut WorkflowRun,
        stage: &StageName,
        item: &WorkItem,
    ) -> Result<Advance, WorkflowError> {
        if run.status.is_finished() {
            return Err(WorkflowError::AlreadyFinished(run.id.to_string()));
        }
        let workflow = Arc::clone(&run.workflow);
        let Some(spec) = workflow.stage(stage) else {
            return Err(WorkflowError::UnknownStage(stage.to_string()));
        };
        if run.satisfied.contains(stage) {
            return Err(WorkflowError::StageAlreadyPassed(stage.to_string()));
        }
        let waiting_on: Vec<String> = spec
            .predecessors
            .iter()
            .filter(|p| !run.satisfied.contains(*p))
            .map(ToString::to_string)
            .collect();
        if !waiting_on.is_empty() {
            return Err(WorkflowError::StageNotReady {
                stage: stage.to_string(),
                waiting_on,
            });
        }

        let staged = item.clone().with_origin(stage.clone());
        let mut results = self.executor.dispatch(&self.registry, &staged).await?;
        let (dropped_followups, rejected_followups) =
            self.drain_followups(stage, &mut results).await;

        let GateVerdict { passed, offending } = spec.gate.evaluate(&results);
        tracing::debug!(
            run = %run.id,
            stage = %stage,
            gate = %spec.gate,
            passed,
            results = results.len(),
            "switchyard.workflow.gate"
        );
        run.outcomes.push(StageOutcome {
            stage: stage.clone(),
            results,
            passed,
            dropped_followups,
            rejected_followups,
        });
        run.ready.retain(|s| s != stage);

        if !passed {
            let failure = GateFailure {
                stage: stage.clone(),
                gate: spec.gate.to_string(),
                offending,
            };
            tracing::warn!(run = %run.id, error = %failure, "switchyard.workflow.halted");
            run.status = RunStatus::Halted(failure.clone());
            return Ok(Advance::Halted(failure));
        }

        run.satisfied.insert(stage.clone());
        run.terminal_passed |= spec.terminal;
        let mut next = vec![];
        for successor in workflow.successors(stage) {
            let released = successor
                .predecessors
                .iter()
                .all(|p| run.satisfied.contains(p));
            if released && !run.ready.contains(&successor.name) {
                next.push(successor.name.clone());
                run.ready.push(successor.name.clone());
            }
        }
        run.ready
            .sort_by_key(|s| workflow.position(s).unwrap_or(usize::MAX));
        tracing::info!(run = %run.id, stage = %stage, next = next.len(), "switchyard.workflow.advance");

        if run.ready.is_empty() && run.terminal_passed {
            run.status = RunStatus::Completed;
            tracing::info!(run = %run.id, stages = run.satisfied.len(), "switchyard.workflow.completed");
            return Ok(Advance::Completed);
        }
        Ok(Advance::Passed { next })
    }

    /// Drive a fresh run to completion or halt, always picking the earliest
    /// declared ready stage.
    pub async fn run(
        &self,
        id: impl Into<RunId>,
        workflow: Arc<Workflow>,
        item: &WorkItem,
    ) -> Result<WorkflowRun, WorkflowError> {
        item.validate()?;
        let mut run = WorkflowRun::new(id, workflow);
        tracing::info!(run = %run.id, item = %item.id, "switchyard.workflow.start");
        while !run.status.is_finished() {
            let Some(stage) = run.ready.first().cloned() else {
                break;
            };
            self.advance(&mut run, &stage, item).await?;
        }
        Ok(run)
    }

    /// Execute follow-ups produced by `results` (and by their own results),
    /// appending to `results`. Returns the dropped count and rejection
    /// reasons.
    async fn drain_followups(
        &self,
        stage: &StageName,
        results: &mut Vec<HandlerResult>,
    ) -> (usize, Vec<String>) {
        let mut queue: VecDeque<WorkItem> = results
            .iter()
            .flat_map(|r| r.follow_ups().iter().cloned())
            .collect();
        let mut executed = 0usize;
        let mut rejected = vec![];

        while let Some(follow_up) = queue.pop_front() {
            if executed >= self.config.max_followups {
                let dropped = queue.len() + 1;
                tracing::warn!(
                    stage = %stage,
                    dropped,
                    max_followups = self.config.max_followups,
                    "switchyard.workflow.followups_dropped"
                );
                return (dropped, rejected);
            }
            executed += 1;
            let follow_up = match follow_up.origin {
                Some(_) => follow_up,
                None => follow_up.with_origin(stage.clone()),
            };
            match self.executor.dispatch(&self.registry, &follow_up).await {
                Ok(more) => {
                    queue.extend(more.iter().flat_map(|r| r.follow_ups().iter().cloned()));
                    results.extend(more);
                }
                Err(e) => {
                    tracing::warn!(stage = %stage, item = %follow_up.id, error = %e, "switchyard.workflow.followup_rejected");
                    rejected.push(e.to_string());
                }
            }
        }
        (0, rejected)
    }
}
