//! Typed ID wrappers for handlers, work items, stages, requirements and runs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Typed ID wrappers keep a stage name from being passed where a handler
/// id is expected. They are plain strings underneath with no format rules.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(
            Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new typed ID from anything that converts to String.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

typed_id!(HandlerId, "Unique identity of a registered capability handler.");
typed_id!(WorkItemId, "Identifier of a single work item.");
typed_id!(StageName, "Name of a workflow stage.");
typed_id!(RequirementId, "Identifier of a requirement record.");
typed_id!(RunId, "Identifier of a staged workflow run.");
