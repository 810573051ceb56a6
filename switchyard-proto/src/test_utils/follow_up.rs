//! FollowUpHandler — emits new work items.

use crate::error::HandlerError;
use crate::handler::Capability;
use crate::result::HandlerOutput;
use crate::work::WorkItem;
use async_trait::async_trait;

/// A handler that succeeds and emits clones of a template item as
/// follow-ups, with ids `<template-id>-<n>`. Items that already carry the
/// `follow-up` tag produce nothing, so chains stop after one hop unless the
/// template says otherwise.
pub struct FollowUpHandler {
    template: WorkItem,
    count: usize,
}

impl FollowUpHandler {
    /// Emit `count` copies of `template` per invocation.
    pub fn new(template: WorkItem, count: usize) -> Self {
        Self { template, count }
    }
}

#[async_trait]
impl Capability for FollowUpHandler {
    async fn invoke(&self, item: WorkItem) -> Result<HandlerOutput, HandlerError> {
        let mut output = HandlerOutput::success(serde_json::json!({ "source": item.id }));
        if item.tags.contains("follow-up") {
            return Ok(output);
        }
        for n in 0..self.count {
            let mut next = self.template.clone();
            next.id = format!("{}-{n}", self.template.id).into();
            output = output.with_follow_up(next.with_tag("follow-up"));
        }
        Ok(output)
    }
}
