//! Stage gates: predicates over a stage's accumulated results.

use std::fmt;
use std::sync::Arc;
use switchyard_proto::handler::Category;
use switchyard_proto::result::HandlerResult;

/// Signature of a custom gate predicate.
pub type GatePredicate = dyn Fn(&[HandlerResult]) -> bool + Send + Sync;

/// Must hold over a stage's results before the workflow moves on.
#[derive(Clone)]
#[non_exhaustive]
pub enum Gate {
    /// Always passes.
    Always,
    /// Every result is `success`. Vacuously true for an empty stage.
    AllSucceeded,
    /// No result is `failure`; `partial` is fine.
    NoFailures,
    /// Every result from handlers of this category is `success`.
    CategorySucceeded(Category),
    /// At least this many results are `success`.
    MinSuccesses(usize),
    /// Every inner gate passes.
    All(Vec<Gate>),
    /// A named caller-supplied predicate.
    Custom {
        /// Name used in logs and failure reports.
        name: String,
        /// The predicate.
        predicate: Arc<GatePredicate>,
    },
}

/// Outcome of evaluating a gate.
#[derive(Debug, Clone)]
pub struct GateVerdict {
    /// Whether the gate holds.
    pub passed: bool,
    /// Results responsible for a failed gate. Empty when it passed.
    pub offending: Vec<HandlerResult>,
}

impl Gate {
    /// Wrap a closure as a named gate.
    pub fn custom(
        name: impl Into<String>,
        predicate: impl Fn(&[HandlerResult]) -> bool + Send + Sync + 'static,
    ) -> Self {
        Gate::Custom {
            name: name.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Evaluate over a stage's results.
    pub fn evaluate(&self, results: &[HandlerResult]) -> GateVerdict {
        let offending: Vec<HandlerResult> = match self {
            Gate::Always => vec![],
            Gate::AllSucceeded => not_success(results),
            Gate::NoFailures => results.iter().filter(|r| r.is_failure()).cloned().collect(),
            Gate::CategorySucceeded(category) => results
                .iter()
                .filter(|r| r.category() == *category && !r.is_success())
                .cloned()
                .collect(),
            Gate::MinSuccesses(n) => {
                if results.iter().filter(|r| r.is_success()).count() >= *n {
                    vec![]
                } else {
                    return GateVerdict {
                        passed: false,
                        offending: not_success(results),
                    };
                }
            }
            Gate::All(gates) => {
                let mut passed = true;
                let mut offending: Vec<HandlerResult> = vec![];
                for gate in gates {
                    let verdict = gate.evaluate(results);
                    passed &= verdict.passed;
                    for r in verdict.offending {
                        if !offending.iter().any(|o| o.handler() == r.handler()) {
                            offending.push(r);
                        }
                    }
                }
                return GateVerdict { passed, offending };
            }
            Gate::Custom { predicate, .. } => {
                if predicate(results) {
                    vec![]
                } else {
                    return GateVerdict {
                        passed: false,
                        offending: not_success(results),
                    };
                }
            }
        };
        GateVerdict {
            passed: offending.is_empty(),
            offending,
        }
    }

    /// The results that make this gate fail. Empty when it passes.
    pub fn offending(&self, results: &[HandlerResult]) -> Vec<HandlerResult> {
        self.evaluate(results).offending
    }
}

fn not_success(results: &[HandlerResult]) -> Vec<HandlerResult> {
    results.iter().filter(|r| !r.is_success()).cloned().collect()
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gate::Always => f.write_str("always"),
            Gate::AllSucceeded => f.write_str("all-succeeded"),
            Gate::NoFailures => f.write_str("no-failures"),
            Gate::CategorySucceeded(c) => write!(f, "{c}-succeeded"),
            Gate::MinSuccesses(n) => write!(f, "min-successes({n})"),
            Gate::All(gates) => {
                let names: Vec<String> = gates.iter().map(ToString::to_string).collect();
                write!(f, "all({})", names.join(", "))
            }
            Gate::Custom { name, .. } => f.write_str(name),
        }
    }
}

impl fmt::Debug for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Gate({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use switchyard_proto::duration::DurationMs;
    use switchyard_proto::result::{HandlerFailure, HandlerOutput};

    fn ok(id: &str, category: Category) -> HandlerResult {
        HandlerResult::completed(
            id.into(),
            category,
            HandlerOutput::success(json!(null)),
            DurationMs::ZERO,
        )
    }

    fn partial(id: &str, category: Category) -> HandlerResult {
        HandlerResult::completed(
            id.into(),
            category,
            HandlerOutput::partial(json!(null)),
            DurationMs::ZERO,
        )
    }

    fn failed(id: &str, category: Category) -> HandlerResult {
        HandlerResult::failed(
            id.into(),
            category,
            HandlerFailure::reported("nope"),
            DurationMs::ZERO,
        )
    }

    #[test]
    fn empty_stage_passes_all_succeeded() {
        assert!(Gate::AllSucceeded.evaluate(&[]).passed);
        assert!(!Gate::MinSuccesses(1).evaluate(&[]).passed);
    }

    #[test]
    fn no_failures_tolerates_partial() {
        let results = vec![ok("a", Category::Review), partial("b", Category::Review)];
        assert!(Gate::NoFailures.evaluate(&results).passed);
        let verdict = Gate::AllSucceeded.evaluate(&results);
        assert!(!verdict.passed);
        assert_eq!(verdict.offending.len(), 1);
        assert_eq!(verdict.offending[0].handler().as_str(), "b");
    }

    #[test]
    fn category_gate_ignores_other_categories() {
        let results = vec![ok("sec", Category::Security), failed("docs", Category::Documentation)];
        assert!(Gate::CategorySucceeded(Category::Security).evaluate(&results).passed);

        let results = vec![partial("sec", Category::Security), ok("docs", Category::Documentation)];
        let verdict = Gate::CategorySucceeded(Category::Security).evaluate(&results);
        assert!(!verdict.passed);
        assert_eq!(verdict.offending[0].handler().as_str(), "sec");
    }

    #[test]
    fn all_gate_merges_offenders_without_duplicates() {
        let results = vec![failed("sec", Category::Security), ok("r", Category::Review)];
        let gate = Gate::All(vec![Gate::NoFailures, Gate::CategorySucceeded(Category::Security)]);
        let verdict = gate.evaluate(&results);
        assert!(!verdict.passed);
        assert_eq!(verdict.offending.len(), 1);
        assert_eq!(gate.to_string(), "all(no-failures, security-succeeded)");
    }

    #[test]
    fn custom_gate_uses_predicate() {
        let gate = Gate::custom("two-results", |r| r.len() == 2);
        assert!(gate.evaluate(&[ok("a", Category::Review), ok("b", Category::Review)]).passed);
        let verdict = gate.evaluate(&[partial("a", Category::Review)]);
        assert!(!verdict.passed);
        assert_eq!(verdict.offending.len(), 1);
        assert_eq!(gate.to_string(), "two-results");
    }
}
