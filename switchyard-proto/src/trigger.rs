//! Typed trigger predicates: matchers over the work-item attribute schema.

use crate::handler::Category;
use crate::id::StageName;
use crate::work::WorkItem;
use serde::{Deserialize, Serialize};

/// Decides whether a handler wants a work item.
///
/// Predicates only see the fixed attribute schema of [`WorkItem`]:
/// category hint, originating stage, tags and top-level payload keys.
/// Evaluation is pure and cheap.
///
/// # Examples
///
/// ```
/// use switchyard_proto::{Category, Trigger, WorkItem};
///
/// let trigger = Trigger::All(vec![
///     Trigger::Stage("review".into()),
///     Trigger::Not(Box::new(Trigger::Tag("docs-only".into()))),
/// ]);
/// let item = WorkItem::new("w-1").with_origin("review");
/// assert!(trigger.matches(&item));
/// assert!(!trigger.matches(&item.clone().with_tag("docs-only")));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// Matches every item.
    Always,
    /// Category hint equals the given category.
    Category(Category),
    /// Originating stage equals the given stage.
    Stage(StageName),
    /// Item carries the tag.
    Tag(String),
    /// Payload object has the top-level key.
    PayloadKey(String),
    /// Every inner trigger matches. Empty is true.
    All(Vec<Trigger>),
    /// Some inner trigger matches. Empty is false.
    Any(Vec<Trigger>),
    /// Inner trigger does not match.
    Not(Box<Trigger>),
}

impl Trigger {
    /// Evaluate against a work item.
    pub fn matches(&self, item: &WorkItem) -> bool {
        match self {
            Trigger::Always => true,
            Trigger::Category(category) => item.category == Some(*category),
            Trigger::Stage(stage) => item.origin.as_ref() == Some(stage),
            Trigger::Tag(tag) => item.tags.contains(tag),
            Trigger::PayloadKey(key) => item.has_payload_key(key),
            Trigger::All(inner) => inner.iter().all(|t| t.matches(item)),
            Trigger::Any(inner) => inner.iter().any(|t| t.matches(item)),
            Trigger::Not(inner) => !inner.matches(item),
        }
    }
}
