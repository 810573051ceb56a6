//! RecordingHandler — remembers every invocation in a shared log.

use crate::error::HandlerError;
use crate::handler::Capability;
use crate::id::HandlerId;
use crate::result::HandlerOutput;
use crate::work::WorkItem;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// One recorded invocation.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// Name the handler was created with.
    pub name: String,
    /// The work item it received.
    pub item: WorkItem,
}

/// A handler that appends each invocation to a log shared between handlers,
/// so tests can assert on invocation order and on the context a sequential
/// handler received. Succeeds with `{"handler": name}`.
pub struct RecordingHandler {
    name: String,
    log: Arc<Mutex<Vec<RecordedCall>>>,
}

impl RecordingHandler {
    /// Create a handler writing to `log`.
    pub fn new(name: impl Into<String>, log: Arc<Mutex<Vec<RecordedCall>>>) -> Self {
        Self {
            name: name.into(),
            log,
        }
    }

    /// Names in the log, in invocation order.
    pub fn names(log: &Mutex<Vec<RecordedCall>>) -> Vec<String> {
        log.lock().unwrap().iter().map(|c| c.name.clone()).collect()
    }

    /// Context the named handler saw on its most recent call.
    pub fn context_of(
        log: &Mutex<Vec<RecordedCall>>,
        name: &str,
    ) -> Option<Vec<HandlerId>> {
        log.lock()
            .unwrap()
            .iter()
            .rev()
            .find(|c| c.name == name)
            .map(|c| c.item.context.keys().cloned().collect())
    }
}

#[async_trait]
impl Capability for RecordingHandler {
    async fn invoke(&self, item: WorkItem) -> Result<HandlerOutput, HandlerError> {
        self.log.lock().unwrap().push(RecordedCall {
            name: self.name.clone(),
            item,
        });
        Ok(HandlerOutput::success(
            serde_json::json!({ "handler": self.name }),
        ))
    }
}
