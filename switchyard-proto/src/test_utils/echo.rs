//! EchoHandler — returns the work item payload as the output.

use crate::error::HandlerError;
use crate::handler::Capability;
use crate::result::HandlerOutput;
use crate::work::WorkItem;
use async_trait::async_trait;

/// A handler that echoes the payload back as a successful output.
pub struct EchoHandler;

#[async_trait]
impl Capability for EchoHandler {
    async fn invoke(&self, item: WorkItem) -> Result<HandlerOutput, HandlerError> {
        Ok(HandlerOutput::success(item.payload))
    }
}
