//! Running the auditor as a handler, so a workflow `audit` stage can route
//! work to it.

use crate::auditor::Auditor;
use crate::inventory::ArtifactDescriptor;
use async_trait::async_trait;
use std::sync::Arc;
use switchyard_proto::error::HandlerError;
use switchyard_proto::handler::Capability;
use switchyard_proto::result::HandlerOutput;
use switchyard_proto::work::WorkItem;

/// Audits `payload.requirements` (corpus text) against `payload.inventory`
/// (artifact descriptors) and returns the report as output.
///
/// The output is `partial` when the report records inconsistencies.
pub struct AuditCapability {
    auditor: Arc<Auditor>,
}

impl AuditCapability {
    /// Wrap an auditor.
    pub fn new(auditor: Arc<Auditor>) -> Self {
        Self { auditor }
    }
}

#[async_trait]
impl Capability for AuditCapability {
    async fn invoke(&self, item: WorkItem) -> Result<HandlerOutput, HandlerError> {
        let corpus = item
            .payload
            .get("requirements")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                HandlerError::InvalidInput("payload.requirements must be corpus text".into())
            })?;
        let inventory = item
            .payload
            .get("inventory")
            .ok_or_else(|| HandlerError::InvalidInput("payload.inventory is missing".into()))?;
        let inventory: Vec<ArtifactDescriptor> = serde_json::from_value(inventory.clone())
            .map_err(|e| HandlerError::InvalidInput(format!("payload.inventory: {e}")))?;

        let report = self.auditor.audit_corpus(corpus, &inventory);
        let output = serde_json::to_value(&report)
            .map_err(|e| HandlerError::Failed(format!("report encoding failed: {e}")))?;

        if report.inconsistencies().is_empty() {
            Ok(HandlerOutput::success(output))
        } else {
            Ok(HandlerOutput::partial(output))
        }
    }
}
