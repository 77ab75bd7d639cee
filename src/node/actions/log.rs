use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    node::{Element, Execute, Execution, Header, LastResult, NodeKind},
    runtime::Context,
};

/// Publishes a message on the event channel.
#[derive(Serialize, Deserialize, Debug)]
pub struct LogAction {
    #[serde(flatten)]
    pub header: Header,
    pub message: String,
}

impl LogAction {
    pub fn new(
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            header: Header::new(name),
            message: message.into(),
        }
    }
}

impl Element for LogAction {
    fn header(&self) -> &Header {
        &self.header
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Action
    }

    fn type_name(&self) -> &'static str {
        "log action"
    }

    fn validate(
        &self,
        _ctx: &Context,
    ) {
        if self.message.trim().is_empty() {
            self.mark_sick("log message is empty".to_string());
        }
    }
}

#[async_trait]
impl Execute for LogAction {
    async fn execute(
        &self,
        ctx: &Arc<Context>,
    ) -> Execution {
        let Some(started) = self.header.begin(ctx) else {
            return Execution::Skipped;
        };

        info!(node = %self.header.id, message = %self.message, "log action");
        ctx.emit_log(&self.header.id, self.message.clone());

        self.header.finish(ctx, started, LastResult::Success);
        Execution::Completed(LastResult::Success)
    }
}
