//! The unit of requested work.

use crate::error::DispatchError;
use crate::handler::Category;
use crate::id::{HandlerId, StageName, WorkItemId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// An opaque request routed to one or more handlers.
///
/// The router only looks at the attribute schema: `category` hint,
/// `origin` stage, `tags` and the top-level keys of `payload`. Everything
/// else in the payload is for the handlers.
///
/// Each handler receives its own clone. Sequential handlers additionally
/// see the outputs of the handlers they were ordered after in `context`.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Identifier, unique per request.
    pub id: WorkItemId,

    /// What kind of capability the submitter expects to need.
    pub category: Option<Category>,

    /// Stage that produced this item, if it came out of a workflow.
    pub origin: Option<StageName>,

    /// Free-form labels the trigger predicates can match on.
    #[serde(default)]
    pub tags: BTreeSet<String>,

    /// Free-form payload. Must be a JSON object or null.
    #[serde(default)]
    pub payload: serde_json::Value,

    /// Outputs of dependency handlers, keyed by handler id.
    #[serde(default)]
    pub context: BTreeMap<HandlerId, serde_json::Value>,
}

impl WorkItem {
    /// Create a work item with an empty payload.
    pub fn new(id: impl Into<WorkItemId>) -> Self {
        Self {
            id: id.into(),
            category: None,
            origin: None,
            tags: BTreeSet::new(),
            payload: serde_json::Value::Null,
            context: BTreeMap::new(),
        }
    }

    /// Set the category hint.
    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    /// Set the originating stage.
    pub fn with_origin(mut self, stage: impl Into<StageName>) -> Self {
        self.origin = Some(stage.into());
        self
    }

    /// Add a tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Replace the payload.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// Whether the payload has the given top-level key.
    pub fn has_payload_key(&self, key: &str) -> bool {
        self.payload
            .as_object()
            .is_some_and(|map| map.contains_key(key))
    }

    /// Reject malformed items before any handler is selected.
    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.id.as_str().trim().is_empty() {
            return Err(DispatchError::EmptyId);
        }
        let kind = match &self.payload {
            serde_json::Value::Null | serde_json::Value::Object(_) => None,
            serde_json::Value::Bool(_) => Some("bool"),
            serde_json::Value::Number(_) => Some("number"),
            serde_json::Value::String(_) => Some("string"),
            serde_json::Value::Array(_) => Some("array"),
        };
        if let Some(kind) = kind {
            return Err(DispatchError::InvalidPayload {
                id: self.id.to_string(),
                kind,
            });
        }
        if self
            .origin
            .as_ref()
            .is_some_and(|stage| stage.as_str().trim().is_empty())
        {
            return Err(DispatchError::EmptyStage(self.id.to_string()));
        }
        if self.tags.iter().any(|tag| tag.trim().is_empty()) {
            return Err(DispatchError::EmptyTag(self.id.to_string()));
        }
        Ok(())
    }
}
