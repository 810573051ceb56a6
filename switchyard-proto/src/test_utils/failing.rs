//! Handlers that fail on purpose.

use crate::error::HandlerError;
use crate::handler::Capability;
use crate::result::HandlerOutput;
use crate::work::WorkItem;
use async_trait::async_trait;

/// A handler that always returns `HandlerError::Failed` with its message.
pub struct FailingHandler {
    message: String,
}

impl FailingHandler {
    /// Create a handler failing with `message`. An empty message is allowed
    /// so tests can check the executor's placeholder diagnostic.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl Capability for FailingHandler {
    async fn invoke(&self, _item: WorkItem) -> Result<HandlerOutput, HandlerError> {
        Err(HandlerError::Failed(self.message.clone()))
    }
}

/// A handler that panics inside its invocation.
pub struct PanickingHandler;

#[async_trait]
impl Capability for PanickingHandler {
    async fn invoke(&self, item: WorkItem) -> Result<HandlerOutput, HandlerError> {
        panic!("handler blew up on {}", item.id);
    }
}
