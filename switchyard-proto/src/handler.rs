//! The Capability protocol and how a handler declares itself.

use crate::duration::DurationMs;
use crate::error::HandlerError;
use crate::id::HandlerId;
use crate::result::HandlerOutput;
use crate::trigger::Trigger;
use crate::work::WorkItem;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// The kind of capability a handler offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// Breaking work down into steps.
    Planning,
    /// Reviewing produced work.
    Review,
    /// Writing or running tests.
    Testing,
    /// Repairing a broken build.
    BuildFix,
    /// Security review.
    Security,
    /// Removing dead or out-of-scope code.
    Cleanup,
    /// Vertical-specific knowledge.
    DomainSpecific,
    /// Writing documentation.
    Documentation,
}

impl Category {
    /// Every category, in declaration order.
    pub const ALL: [Category; 8] = [
        Category::Planning,
        Category::Review,
        Category::Testing,
        Category::BuildFix,
        Category::Security,
        Category::Cleanup,
        Category::DomainSpecific,
        Category::Documentation,
    ];

    /// Stable kebab-case label, identical to the serde form.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Planning => "planning",
            Category::Review => "review",
            Category::Testing => "testing",
            Category::BuildFix => "build-fix",
            Category::Security => "security",
            Category::Cleanup => "cleanup",
            Category::DomainSpecific => "domain-specific",
            Category::Documentation => "documentation",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A kind of access a handler may exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    /// Read files or state.
    Read,
    /// Modify files or state.
    Write,
    /// Run commands.
    Execute,
    /// Reach the network.
    Network,
}

/// The resources a handler declares it touches.
///
/// `resources` are path prefixes matched on segment boundaries. An empty
/// list means the handler is unrestricted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolScope {
    /// Granted access kinds.
    pub access: BTreeSet<Access>,
    /// Path prefixes the access applies to.
    #[serde(default)]
    pub resources: Vec<String>,
}

impl ToolScope {
    /// Unrestricted read-only access.
    pub fn read_only() -> Self {
        Self {
            access: BTreeSet::from([Access::Read]),
            resources: vec![],
        }
    }

    /// Scope with the given access kinds and no resource restriction.
    pub fn with_access(access: impl IntoIterator<Item = Access>) -> Self {
        Self {
            access: access.into_iter().collect(),
            resources: vec![],
        }
    }

    /// Restrict the scope to a path prefix.
    pub fn on(mut self, resource: impl Into<String>) -> Self {
        self.resources.push(resource.into());
        self
    }

    /// Whether the scope grants `access`.
    pub fn allows(&self, access: Access) -> bool {
        self.access.contains(&access)
    }

    /// The first resource both scopes may write, if any.
    ///
    /// An unrestricted writer overlaps every other writer; the returned
    /// resource is then `*` or the other side's first prefix.
    pub fn write_overlap(&self, other: &ToolScope) -> Option<String> {
        if !self.allows(Access::Write) || !other.allows(Access::Write) {
            return None;
        }
        match (self.resources.is_empty(), other.resources.is_empty()) {
            (true, true) => Some("*".to_string()),
            (true, false) => other.resources.first().cloned(),
            (false, true) => self.resources.first().cloned(),
            (false, false) => self.resources.iter().find_map(|mine| {
                other
                    .resources
                    .iter()
                    .find(|theirs| prefixes_overlap(mine, theirs))
                    .map(|theirs| shorter(mine, theirs).to_string())
            }),
        }
    }
}

impl Default for ToolScope {
    fn default() -> Self {
        Self::read_only()
    }
}

fn prefixes_overlap(a: &str, b: &str) -> bool {
    let a = a.trim_end_matches('/');
    let b = b.trim_end_matches('/');
    is_path_prefix(a, b) || is_path_prefix(b, a)
}

fn is_path_prefix(prefix: &str, path: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => prefix.is_empty() || rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

fn shorter<'a>(a: &'a str, b: &'a str) -> &'a str {
    if a.len() <= b.len() { a } else { b }
}

/// How a handler may be scheduled relative to the rest of its batch.
///
/// Textual form is `independent` or `sequential-after:<dependency>`, where
/// the dependency names a handler id, a category label or an earlier stage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConcurrencyClass {
    /// Runs concurrently with the other independent handlers.
    Independent,
    /// Runs after the named dependency's results are available.
    SequentialAfter(String),
}

impl ConcurrencyClass {
    /// Shorthand for `SequentialAfter`.
    pub fn after(dependency: impl Into<String>) -> Self {
        Self::SequentialAfter(dependency.into())
    }

    /// Whether this is the independent class.
    pub fn is_independent(&self) -> bool {
        matches!(self, Self::Independent)
    }
}

impl fmt::Display for ConcurrencyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Independent => f.write_str("independent"),
            Self::SequentialAfter(dep) => write!(f, "sequential-after:{dep}"),
        }
    }
}

impl FromStr for ConcurrencyClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "independent" {
            return Ok(Self::Independent);
        }
        match s.strip_prefix("sequential-after:") {
            Some(dep) if !dep.trim().is_empty() => Ok(Self::SequentialAfter(dep.trim().into())),
            _ => Err(format!("unrecognised concurrency class: {s}")),
        }
    }
}

/// Everything the registry knows about a handler. Immutable once registered.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerSpec {
    /// Unique identity.
    pub id: HandlerId,
    /// The kind of capability offered.
    pub category: Category,
    /// Which work items this handler wants.
    pub trigger: Trigger,
    /// Declared resource scope.
    #[serde(default)]
    pub scope: ToolScope,
    /// Scheduling class.
    pub concurrency: ConcurrencyClass,
    /// Per-handler timeout. None means the executor default.
    #[serde(default)]
    pub timeout: Option<DurationMs>,
}

impl HandlerSpec {
    /// A read-only independent handler triggered by its own category.
    pub fn new(id: impl Into<HandlerId>, category: Category) -> Self {
        Self {
            id: id.into(),
            category,
            trigger: Trigger::Category(category),
            scope: ToolScope::read_only(),
            concurrency: ConcurrencyClass::Independent,
            timeout: None,
        }
    }

    /// Replace the trigger predicate.
    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.trigger = trigger;
        self
    }

    /// Replace the declared scope.
    pub fn with_scope(mut self, scope: ToolScope) -> Self {
        self.scope = scope;
        self
    }

    /// Replace the concurrency class.
    pub fn with_concurrency(mut self, concurrency: ConcurrencyClass) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Override the executor's default timeout.
    pub fn with_timeout(mut self, timeout: DurationMs) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// THE TRAIT
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A capability handler.
///
/// One operation, synchronous from the caller's point of view: send a work
/// item, get an output. Any suspension happens inside the invocation.
///
/// Implementations:
/// - a planner, reviewer or test writer backed by a model
/// - a build fixer shelling out to a toolchain
/// - the compliance auditor (see `switchyard-audit`)
/// - in-memory mocks behind the `test-utils` feature
///
/// Returning `Err` is how a handler reports failure. The executor turns
/// the error into a `failure` result with a non-empty diagnostic.
#[async_trait]
pub trait Capability: Send + Sync {
    /// Perform the capability on one work item.
    async fn invoke(&self, item: WorkItem) -> Result<HandlerOutput, HandlerError>;
}
