//! Stages and the validated stage DAG.

use crate::gate::Gate;
use std::collections::{HashMap, HashSet, VecDeque};
use switchyard_proto::error::ConfigurationError;
use switchyard_proto::handler::Category;
use switchyard_proto::id::StageName;

/// A named phase of a workflow.
#[derive(Debug, Clone)]
pub struct Stage {
    /// Stage name, unique within its workflow.
    pub name: StageName,
    /// Stages whose gates must pass before this one runs.
    pub predecessors: Vec<StageName>,
    /// Predicate over this stage's results.
    pub gate: Gate,
    /// Whether passing this stage can complete the run.
    pub terminal: bool,
}

impl Stage {
    /// A non-terminal stage with no predecessors and an `Always` gate.
    pub fn new(name: impl Into<StageName>) -> Self {
        Self {
            name: name.into(),
            predecessors: vec![],
            gate: Gate::Always,
            terminal: false,
        }
    }

    /// Add a predecessor.
    pub fn after(mut self, predecessor: impl Into<StageName>) -> Self {
        self.predecessors.push(predecessor.into());
        self
    }

    /// Set the gate.
    pub fn with_gate(mut self, gate: Gate) -> Self {
        self.gate = gate;
        self
    }

    /// Mark as terminal.
    pub fn terminal(mut self) -> Self {
        self.terminal = true;
        self
    }
}

/// Collects stages; [`WorkflowBuilder::build`] validates them.
#[derive(Debug, Default)]
pub struct WorkflowBuilder {
    stages: Vec<Stage>,
}

impl WorkflowBuilder {
    /// Empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage. Declaration order is the run order among ready stages.
    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    /// Validate the stage graph.
    ///
    /// Checks run in a fixed order and the first violation is returned:
    /// empty workflow, duplicate names, unknown predecessors, cycles,
    /// initial stage count, reachability, terminal successors, and finally
    /// that every stage can reach some terminal stage.
    pub fn build(self) -> Result<Workflow, ConfigurationError> {
        let result = validate(self.stages);
        if let Err(e) = &result {
            tracing::error!(error = %e, "switchyard.workflow.invalid");
        }
        result
    }
}

/// A validated stage DAG with a single initial stage.
#[derive(Debug, Clone)]
pub struct Workflow {
    stages: Vec<Stage>,
    index: HashMap<StageName, usize>,
    successors: Vec<Vec<usize>>,
    initial: usize,
}

impl Workflow {
    /// Start building a workflow.
    pub fn builder() -> WorkflowBuilder {
        WorkflowBuilder::new()
    }

    /// plan → implement → review → security → audit → build → test.
    ///
    /// Security requires every security-category result to succeed; build
    /// and test require every result to succeed; the remaining stages only
    /// reject outright failures.
    pub fn development() -> Self {
        let stages = vec![
            Stage::new("plan").with_gate(Gate::NoFailures),
            Stage::new("implement").after("plan").with_gate(Gate::NoFailures),
            Stage::new("review").after("implement").with_gate(Gate::NoFailures),
            Stage::new("security")
                .after("review")
                .with_gate(Gate::CategorySucceeded(Category::Security)),
            Stage::new("audit").after("security").with_gate(Gate::NoFailures),
            Stage::new("build").after("audit").with_gate(Gate::AllSucceeded),
            Stage::new("test")
                .after("build")
                .with_gate(Gate::AllSucceeded)
                .terminal(),
        ];
        // A linear chain with one terminal always validates.
        let index = stages
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name.clone(), i))
            .collect();
        let n = stages.len();
        let successors = (0..n).map(|i| if i + 1 < n { vec![i + 1] } else { vec![] }).collect();
        Self {
            stages,
            index,
            successors,
            initial: 0,
        }
    }

    /// Stages in declaration order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Look up a stage by name.
    pub fn stage(&self, name: &StageName) -> Option<&Stage> {
        self.index.get(name).map(|&i| &self.stages[i])
    }

    /// The stage without predecessors.
    pub fn initial(&self) -> &Stage {
        &self.stages[self.initial]
    }

    /// Direct successors of a stage, in declaration order.
    pub fn successors(&self, name: &StageName) -> Vec<&Stage> {
        self.index
            .get(name)
            .map(|&i| self.successors[i].iter().map(|&s| &self.stages[s]).collect())
            .unwrap_or_default()
    }

    /// Declaration position of a stage.
    pub fn position(&self, name: &StageName) -> Option<usize> {
        self.index.get(name).copied()
    }
}

fn validate(stages: Vec<Stage>) -> Result<Workflow, ConfigurationError> {
    if stages.is_empty() {
        return Err(ConfigurationError::EmptyWorkflow);
    }

    let mut index = HashMap::with_capacity(stages.len());
    for (i, stage) in stages.iter().enumerate() {
        if index.insert(stage.name.clone(), i).is_some() {
            return Err(ConfigurationError::DuplicateStage(stage.name.to_string()));
        }
    }

    let mut preds: Vec<Vec<usize>> = Vec::with_capacity(stages.len());
    let mut successors: Vec<Vec<usize>> = vec![vec![]; stages.len()];
    for (i, stage) in stages.iter().enumerate() {
        let mut own = vec![];
        for p in &stage.predecessors {
            let Some(&pi) = index.get(p) else {
                return Err(ConfigurationError::UnknownPredecessor {
                    stage: stage.name.to_string(),
                    predecessor: p.to_string(),
                });
            };
            if !own.contains(&pi) {
                own.push(pi);
                successors[pi].push(i);
            }
        }
        preds.push(own);
    }
    for s in &mut successors {
        s.sort_unstable();
    }

    // Kahn's algorithm: whatever never reaches in-degree zero sits on or
    // behind a cycle.
    let mut in_degree: Vec<usize> = preds.iter().map(Vec::len).collect();
    let mut queue: VecDeque<usize> = (0..stages.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut sorted = 0usize;
    while let Some(i) = queue.pop_front() {
        sorted += 1;
        for &s in &successors[i] {
            in_degree[s] -= 1;
            if in_degree[s] == 0 {
                queue.push_back(s);
            }
        }
    }
    if sorted < stages.len() {
        return Err(ConfigurationError::CycleDetected(cycle_path(
            &stages,
            &preds,
            &in_degree,
        )));
    }

    let roots: Vec<usize> = (0..stages.len()).filter(|&i| preds[i].is_empty()).collect();
    let initial = match roots.as_slice() {
        [] => return Err(ConfigurationError::NoInitialStage),
        [only] => *only,
        many => {
            return Err(ConfigurationError::MultipleInitialStages(
                many.iter().map(|&i| stages[i].name.to_string()).collect(),
            ));
        }
    };

    let reachable = walk(initial, &successors);
    if let Some(i) = (0..stages.len()).find(|i| !reachable.contains(i)) {
        return Err(ConfigurationError::UnreachableStage(stages[i].name.to_string()));
    }

    if let Some(stage) = stages
        .iter()
        .enumerate()
        .find(|(i, s)| s.terminal && !successors[*i].is_empty())
        .map(|(_, s)| s)
    {
        return Err(ConfigurationError::TerminalHasSuccessors(stage.name.to_string()));
    }

    // Walk backwards from every terminal stage.
    let mut reaches_terminal: HashSet<usize> = HashSet::new();
    for t in (0..stages.len()).filter(|&i| stages[i].terminal) {
        reaches_terminal.extend(walk(t, &preds));
    }
    if let Some(i) = (0..stages.len()).find(|i| !reaches_terminal.contains(i)) {
        return Err(ConfigurationError::NoReachableTerminal(stages[i].name.to_string()));
    }

    Ok(Workflow {
        stages,
        index,
        successors,
        initial,
    })
}

fn walk(from: usize, edges: &[Vec<usize>]) -> HashSet<usize> {
    let mut seen = HashSet::from([from]);
    let mut stack = vec![from];
    while let Some(i) = stack.pop() {
        for &next in &edges[i] {
            if seen.insert(next) {
                stack.push(next);
            }
        }
    }
    seen
}

/// Extract one concrete cycle from the stages Kahn's algorithm left behind.
///
/// Every leftover stage has a leftover predecessor, so following those
/// backwards must revisit a stage.
fn cycle_path(stages: &[Stage], preds: &[Vec<usize>], in_degree: &[usize]) -> Vec<String> {
    let leftover = |i: usize| in_degree[i] > 0;
    let Some(start) = (0..stages.len()).find(|&i| leftover(i)) else {
        return vec![];
    };
    let mut trail = vec![start];
    let mut current = start;
    loop {
        let Some(&prev) = preds[current].iter().find(|&&p| leftover(p)) else {
            break;
        };
        if let Some(at) = trail.iter().position(|&t| t == prev) {
            let mut cycle: Vec<usize> = trail[at..].to_vec();
            cycle.reverse();
            cycle.push(cycle[0]);
            return cycle.into_iter().map(|i| stages[i].name.to_string()).collect();
        }
        trail.push(prev);
        current = prev;
    }
    trail.into_iter().map(|i| stages[i].name.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(err: &ConfigurationError) -> Vec<String> {
        match err {
            ConfigurationError::CycleDetected(path) => path.clone(),
            other => panic!("expected CycleDetected, got {other:?}"),
        }
    }

    #[test]
    fn development_preset_matches_a_validated_build() {
        let preset = Workflow::development();
        let rebuilt = preset
            .stages()
            .iter()
            .cloned()
            .fold(Workflow::builder(), WorkflowBuilder::stage)
            .build()
            .unwrap();
        assert_eq!(rebuilt.initial().name.as_str(), "plan");
        let order: Vec<_> = preset.stages().iter().map(|s| s.name.to_string()).collect();
        assert_eq!(
            order,
            vec!["plan", "implement", "review", "security", "audit", "build", "test"]
        );
        assert!(preset.stage(&"test".into()).unwrap().terminal);
        assert_eq!(preset.successors(&"review".into())[0].name.as_str(), "security");
    }

    #[test]
    fn cycle_path_is_closed_and_forward() {
        let err = Workflow::builder()
            .stage(Stage::new("start"))
            .stage(Stage::new("a").after("start").after("c"))
            .stage(Stage::new("b").after("a"))
            .stage(Stage::new("c").after("b"))
            .stage(Stage::new("end").after("c").terminal())
            .build()
            .unwrap_err();
        let path = names(&err);
        assert_eq!(path.first(), path.last());
        assert_eq!(path.len(), 4);
        for pair in path.windows(2) {
            let (from, to) = (&pair[0], &pair[1]);
            let expected = match from.as_str() {
                "a" => "b",
                "b" => "c",
                "c" => "a",
                other => panic!("unexpected stage {other}"),
            };
            assert_eq!(to, expected);
        }
    }

    #[test]
    fn duplicate_predecessor_is_collapsed() {
        let wf = Workflow::builder()
            .stage(Stage::new("a"))
            .stage(Stage::new("b").after("a").after("a").terminal())
            .build()
            .unwrap();
        assert_eq!(wf.successors(&"a".into()).len(), 1);
    }
}
