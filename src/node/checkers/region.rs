use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    matcher::RegionMatcher,
    node::{Check, Element, Header, NodeKind, PatternSource, pattern},
    runtime::Context,
    vision::Rect,
};

/// True when one image pattern is found inside a screen region.
#[derive(Serialize, Deserialize, Debug)]
pub struct RegionChecker {
    #[serde(flatten)]
    pub header: Header,
    pub region: Rect,
    #[serde(flatten)]
    pub pattern: PatternSource,
}

impl RegionChecker {
    pub fn new(
        name: impl Into<String>,
        region: Rect,
        pattern: PatternSource,
    ) -> Self {
        Self {
            header: Header::new(name),
            region,
            pattern,
        }
    }
}

impl Element for RegionChecker {
    fn header(&self) -> &Header {
        &self.header
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Checker
    }

    fn type_name(&self) -> &'static str {
        "region checker"
    }

    fn validate(
        &self,
        ctx: &Context,
    ) {
        if self.region.is_empty() {
            self.mark_broken("region is empty".to_string());
            return;
        }
        self.pattern.bind(self, self.region, ctx);
    }
}

#[async_trait]
impl Check for RegionChecker {
    async fn check(
        &self,
        ctx: &Arc<Context>,
    ) -> bool {
        let Some(started) = self.header.begin(ctx) else {
            return false;
        };

        let found = match (pattern::capture(ctx, self.region).await, self.pattern.bound()) {
            (Some(capture), Some(bound)) => {
                let matcher = RegionMatcher::new(ctx.pool(), ctx.matcher(), vec![bound]);
                matcher.find_first(capture).await.is_some()
            }
            _ => false,
        };
        debug!(node = %self.header.id, found, "region checked");

        self.header.finish(ctx, started, found.into());
        found
    }
}
