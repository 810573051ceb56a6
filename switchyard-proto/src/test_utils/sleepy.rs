//! SleepyHandler — waits before answering.

use crate::duration::DurationMs;
use crate::error::HandlerError;
use crate::handler::Capability;
use crate::result::HandlerOutput;
use crate::work::WorkItem;
use async_trait::async_trait;

/// A handler that sleeps for a fixed time and then succeeds with a fixed
/// output. Pair with `#[tokio::test(start_paused = true)]` for
/// deterministic timing.
pub struct SleepyHandler {
    delay: DurationMs,
    output: serde_json::Value,
}

impl SleepyHandler {
    /// Create a handler that answers `output` after `delay`.
    pub fn new(delay: DurationMs, output: serde_json::Value) -> Self {
        Self { delay, output }
    }
}

#[async_trait]
impl Capability for SleepyHandler {
    async fn invoke(&self, _item: WorkItem) -> Result<HandlerOutput, HandlerError> {
        tokio::time::sleep(self.delay.to_std()).await;
        Ok(HandlerOutput::success(self.output.clone()))
    }
}
