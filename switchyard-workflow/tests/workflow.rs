use serde_json::json;
use std::sync::{Arc, Mutex};
use switchyard_exec::Executor;
use switchyard_proto::error::ConfigurationError;
use switchyard_proto::handler::{Category, HandlerSpec};
use switchyard_proto::id::StageName;
use switchyard_proto::test_utils::{EchoHandler, FailingHandler, FollowUpHandler, RecordingHandler};
use switchyard_proto::trigger::Trigger;
use switchyard_proto::work::WorkItem;
use switchyard_registry::CapabilityRegistry;
use switchyard_workflow::{
    Advance, Dispatcher, EngineConfig, Gate, Receipt, RunState, RunStatus, Stage, Submission,
    Workflow, WorkflowEngine, WorkflowError,
};

fn item() -> WorkItem {
    WorkItem::new("task-1").with_payload(json!({"goal": "ship"}))
}

fn engine(registry: CapabilityRegistry) -> WorkflowEngine {
    WorkflowEngine::new(Arc::new(registry), Executor::default(), EngineConfig::default())
}

fn at(stage: &str, id: &str, category: Category) -> HandlerSpec {
    HandlerSpec::new(id, category).with_trigger(Trigger::Stage(stage.into()))
}

fn three_stage() -> Arc<Workflow> {
    Arc::new(
        Workflow::builder()
            .stage(Stage::new("plan").with_gate(Gate::NoFailures))
            .stage(Stage::new("review").after("plan").with_gate(Gate::AllSucceeded))
            .stage(Stage::new("test").after("review").with_gate(Gate::AllSucceeded).terminal())
            .build()
            .unwrap(),
    )
}

// --- Validation ---

#[test]
fn cyclic_workflow_is_rejected_at_construction() {
    let err = Workflow::builder()
        .stage(Stage::new("plan"))
        .stage(Stage::new("a").after("plan").after("b"))
        .stage(Stage::new("b").after("a"))
        .stage(Stage::new("done").after("b").terminal())
        .build()
        .unwrap_err();
    assert!(matches!(err, ConfigurationError::CycleDetected(_)), "{err:?}");
}

#[test]
fn malformed_workflows_are_rejected() {
    assert_eq!(
        Workflow::builder().build().unwrap_err(),
        ConfigurationError::EmptyWorkflow
    );
    assert_eq!(
        Workflow::builder()
            .stage(Stage::new("a").terminal())
            .stage(Stage::new("a"))
            .build()
            .unwrap_err(),
        ConfigurationError::DuplicateStage("a".into())
    );
    assert_eq!(
        Workflow::builder()
            .stage(Stage::new("a"))
            .stage(Stage::new("b").after("ghost").terminal())
            .build()
            .unwrap_err(),
        ConfigurationError::UnknownPredecessor {
            stage: "b".into(),
            predecessor: "ghost".into()
        }
    );
    assert_eq!(
        Workflow::builder()
            .stage(Stage::new("a").terminal())
            .stage(Stage::new("b").terminal())
            .build()
            .unwrap_err(),
        ConfigurationError::MultipleInitialStages(vec!["a".into(), "b".into()])
    );
    assert_eq!(
        Workflow::builder()
            .stage(Stage::new("a").terminal())
            .stage(Stage::new("b").after("a").terminal())
            .build()
            .unwrap_err(),
        ConfigurationError::TerminalHasSuccessors("a".into())
    );
    assert_eq!(
        Workflow::builder()
            .stage(Stage::new("a"))
            .stage(Stage::new("b").after("a"))
            .build()
            .unwrap_err(),
        ConfigurationError::NoReachableTerminal("a".into())
    );
}

#[test]
fn dead_end_branch_is_rejected() {
    let err = Workflow::builder()
        .stage(Stage::new("plan"))
        .stage(Stage::new("side").after("plan"))
        .stage(Stage::new("ship").after("plan").terminal())
        .build()
        .unwrap_err();
    assert_eq!(err, ConfigurationError::NoReachableTerminal("side".into()));
}

// --- Runs ---

#[tokio::test]
async fn valid_dag_runs_to_completion_in_declaration_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = CapabilityRegistry::new();
    for (stage, id, category) in [
        ("plan", "planner", Category::Planning),
        ("review", "reviewer", Category::Review),
        ("test", "tester", Category::Testing),
    ] {
        registry
            .register(at(stage, id, category), Arc::new(RecordingHandler::new(id, log.clone())))
            .unwrap();
    }

    let run = engine(registry).run("run-a", three_stage(), &item()).await.unwrap();

    assert!(matches!(run.status(), RunStatus::Completed));
    assert_eq!(RecordingHandler::names(&log), vec!["planner", "reviewer", "tester"]);
    assert_eq!(run.satisfied().len(), 3);
    assert!(run.ready().is_empty());
    let seen = log.lock().unwrap();
    assert_eq!(seen[1].item.origin, Some(StageName::new("review")));
}

#[tokio::test]
async fn diamond_waits_for_both_branches() {
    let workflow = Arc::new(
        Workflow::builder()
            .stage(Stage::new("plan"))
            .stage(Stage::new("security").after("plan"))
            .stage(Stage::new("review").after("plan"))
            .stage(Stage::new("ship").after("security").after("review").terminal())
            .build()
            .unwrap(),
    );
    let engine = engine(CapabilityRegistry::new());
    let mut run = switchyard_workflow::WorkflowRun::new("run-d", workflow);

    let step = engine.advance(&mut run, &"plan".into(), &item()).await.unwrap();
    match step {
        Advance::Passed { next } => {
            assert_eq!(next, vec![StageName::new("security"), StageName::new("review")])
        }
        other => panic!("expected Passed, got {other:?}"),
    }

    let err = engine.advance(&mut run, &"ship".into(), &item()).await.unwrap_err();
    assert_eq!(
        err,
        WorkflowError::StageNotReady {
            stage: "ship".into(),
            waiting_on: vec!["security".into(), "review".into()],
        }
    );

    engine.advance(&mut run, &"review".into(), &item()).await.unwrap();
    let step = engine.advance(&mut run, &"security".into(), &item()).await.unwrap();
    assert!(matches!(step, Advance::Passed { ref next } if next == &[StageName::new("ship")]));
    let step = engine.advance(&mut run, &"ship".into(), &item()).await.unwrap();
    assert!(matches!(step, Advance::Completed));
}

#[tokio::test]
async fn gate_failure_halts_and_blocks_successors() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = CapabilityRegistry::new();
    registry
        .register(at("plan", "planner", Category::Planning), Arc::new(EchoHandler))
        .unwrap();
    registry
        .register(
            at("review", "reviewer", Category::Review),
            Arc::new(FailingHandler::new("style violations")),
        )
        .unwrap();
    registry
        .register(
            at("test", "tester", Category::Testing),
            Arc::new(RecordingHandler::new("tester", log.clone())),
        )
        .unwrap();

    let engine = engine(registry);
    let mut run = engine.run("run-h", three_stage(), &item()).await.unwrap();

    let RunStatus::Halted(failure) = run.status().clone() else {
        panic!("expected halt, got {:?}", run.status());
    };
    assert_eq!(failure.stage.as_str(), "review");
    assert_eq!(failure.gate, "all-succeeded");
    assert_eq!(failure.offending.len(), 1);
    assert_eq!(failure.offending[0].diagnostic().unwrap(), "style violations");
    assert!(log.lock().unwrap().is_empty(), "test stage must not run");
    assert!(!run.satisfied().contains(&StageName::new("review")));

    let err = engine.advance(&mut run, &"test".into(), &item()).await.unwrap_err();
    assert_eq!(err, WorkflowError::AlreadyFinished("run-h".into()));
}

#[tokio::test]
async fn unknown_and_repeated_stages_are_rejected() {
    let engine = engine(CapabilityRegistry::new());
    let mut run = switchyard_workflow::WorkflowRun::new("run-u", three_stage());
    assert_eq!(
        engine.advance(&mut run, &"deploy".into(), &item()).await.unwrap_err(),
        WorkflowError::UnknownStage("deploy".into())
    );
    engine.advance(&mut run, &"plan".into(), &item()).await.unwrap();
    assert_eq!(
        engine.advance(&mut run, &"plan".into(), &item()).await.unwrap_err(),
        WorkflowError::StageAlreadyPassed("plan".into())
    );
}

#[tokio::test]
async fn malformed_item_never_starts_a_run() {
    let engine = engine(CapabilityRegistry::new());
    let bad = WorkItem::new("x").with_payload(json!([1, 2]));
    let err = engine.run("run-m", three_stage(), &bad).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Dispatch(_)));
}

// --- Follow-ups ---

/// Fans out at the plan stage but ignores its own follow-ups.
fn splitter() -> HandlerSpec {
    HandlerSpec::new("splitter", Category::Planning).with_trigger(Trigger::All(vec![
        Trigger::Stage("plan".into()),
        Trigger::Not(Box::new(Trigger::Tag("follow-up".into()))),
    ]))
}

#[tokio::test]
async fn follow_ups_run_inside_the_stage_before_the_gate() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = CapabilityRegistry::new();
    let template = WorkItem::new("sub").with_category(Category::Cleanup);
    registry
        .register(splitter(), Arc::new(FollowUpHandler::new(template, 3)))
        .unwrap();
    registry
        .register(
            HandlerSpec::new("cleaner", Category::Cleanup),
            Arc::new(RecordingHandler::new("cleaner", log.clone())),
        )
        .unwrap();

    let engine = engine(registry);
    let mut run = switchyard_workflow::WorkflowRun::new("run-f", three_stage());
    engine.advance(&mut run, &"plan".into(), &item()).await.unwrap();

    let outcome = run.outcome(&"plan".into()).unwrap();
    // splitter's own result plus one cleaner result per follow-up.
    assert_eq!(outcome.results.len(), 4);
    assert_eq!(outcome.dropped_followups, 0);
    assert_eq!(RecordingHandler::names(&log), vec!["cleaner"; 3]);
    let seen = log.lock().unwrap();
    assert_eq!(seen[0].item.id.as_str(), "sub-0");
    assert_eq!(seen[0].item.origin, Some(StageName::new("plan")));
}

#[tokio::test]
async fn follow_ups_beyond_the_bound_are_counted_not_run() {
    let mut registry = CapabilityRegistry::new();
    let template = WorkItem::new("sub").with_category(Category::Cleanup);
    registry
        .register(splitter(), Arc::new(FollowUpHandler::new(template, 5)))
        .unwrap();
    registry
        .register(HandlerSpec::new("cleaner", Category::Cleanup), Arc::new(EchoHandler))
        .unwrap();

    let engine = WorkflowEngine::new(
        Arc::new(registry),
        Executor::default(),
        EngineConfig { max_followups: 2 },
    );
    let mut run = switchyard_workflow::WorkflowRun::new("run-b", three_stage());
    engine.advance(&mut run, &"plan".into(), &item()).await.unwrap();

    let outcome = run.outcome(&"plan".into()).unwrap();
    assert_eq!(outcome.results.len(), 3);
    assert_eq!(outcome.dropped_followups, 3);
    assert!(outcome.passed);
}

// --- Dispatcher ---

#[tokio::test]
async fn dispatcher_direct_and_staged_submissions() {
    let mut registry = CapabilityRegistry::new();
    registry
        .register(
            HandlerSpec::new("echo", Category::Review).with_trigger(Trigger::Always),
            Arc::new(EchoHandler),
        )
        .unwrap();
    let dispatcher = Dispatcher::new(Arc::new(engine(registry)), three_stage());

    let Receipt::Direct(results) = dispatcher.submit(Submission::Direct(item())).await.unwrap() else {
        panic!("expected direct receipt");
    };
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].output(), &json!({"goal": "ship"}));

    let Receipt::Staged(id) = dispatcher.submit(Submission::Staged(item())).await.unwrap() else {
        panic!("expected staged receipt");
    };
    assert_eq!(id.as_str(), "run-1");
    assert!(dispatcher.status(&id).is_some());

    let RunState::Finished(run) = dispatcher.wait(&id).await.unwrap() else {
        panic!("run should finish");
    };
    assert!(matches!(run.status(), RunStatus::Completed));
    assert_eq!(run.outcomes().len(), 3);
    assert!(matches!(dispatcher.status(&id), Some(RunState::Finished(_))));

    let Receipt::Staged(second) = dispatcher.submit(Submission::Staged(item())).await.unwrap() else {
        panic!("expected staged receipt");
    };
    assert_eq!(second.as_str(), "run-2");
}

#[tokio::test]
async fn dispatcher_rejects_bad_items_and_unknown_runs() {
    let dispatcher = Dispatcher::new(Arc::new(engine(CapabilityRegistry::new())), three_stage());
    let bad = WorkItem::new("");
    assert!(matches!(
        dispatcher.submit(Submission::Staged(bad)).await,
        Err(WorkflowError::Dispatch(_))
    ));
    assert_eq!(
        dispatcher.wait(&"run-99".into()).await.unwrap_err(),
        WorkflowError::RunNotFound("run-99".into())
    );
    assert!(dispatcher.status(&"run-99".into()).is_none());
}

#[tokio::test]
async fn panicking_run_is_reported_as_aborted() {
    let workflow = Arc::new(
        Workflow::builder()
            .stage(
                Stage::new("only")
                    .with_gate(Gate::custom("boom", |_| panic!("gate bug")))
                    .terminal(),
            )
            .build()
            .unwrap(),
    );
    let dispatcher = Dispatcher::new(Arc::new(engine(CapabilityRegistry::new())), workflow);

    let Receipt::Staged(id) = dispatcher.submit(Submission::Staged(item())).await.unwrap() else {
        panic!("expected staged receipt");
    };
    let state = dispatcher.wait(&id).await.unwrap();
    assert!(state.is_done());
    match state {
        RunState::Errored(WorkflowError::RunAborted { run, reason }) => {
            assert_eq!(run, "run-1");
            assert!(reason.contains("gate bug"), "{reason}");
        }
        other => panic!("expected an aborted run, got {other:?}"),
    }
    assert!(matches!(dispatcher.status(&id), Some(RunState::Errored(_))));
}

#[tokio::test]
async fn forgotten_runs_are_released() {
    let dispatcher = Dispatcher::new(Arc::new(engine(CapabilityRegistry::new())), three_stage());
    let mut ids = vec![];
    for _ in 0..3 {
        let Receipt::Staged(id) = dispatcher.submit(Submission::Staged(item())).await.unwrap() else {
            panic!("expected staged receipt");
        };
        ids.push(id);
    }
    assert_eq!(dispatcher.tracked(), 3);

    dispatcher.wait(&ids[0]).await.unwrap();
    assert!(matches!(dispatcher.forget(&ids[0]), Some(RunState::Finished(_))));
    assert_eq!(dispatcher.tracked(), 2);
    assert!(dispatcher.status(&ids[0]).is_none());
    assert!(dispatcher.forget(&ids[0]).is_none());
    assert_eq!(
        dispatcher.wait(&ids[0]).await.unwrap_err(),
        WorkflowError::RunNotFound("run-1".into())
    );
}
