use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    node::{Check, Element, Header, NodeKind},
    runtime::Context,
};

/// Comparison operator
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ComparisonOperator {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

impl ComparisonOperator {
    pub fn compare(
        self,
        actual: i64,
        expected: i64,
    ) -> bool {
        match self {
            ComparisonOperator::Eq => actual == expected,
            ComparisonOperator::Ne => actual != expected,
            ComparisonOperator::Gt => actual > expected,
            ComparisonOperator::Lt => actual < expected,
            ComparisonOperator::Ge => actual >= expected,
            ComparisonOperator::Le => actual <= expected,
        }
    }
}

/// True when a counter compares to `value` under `operator`.
#[derive(Serialize, Deserialize, Debug)]
pub struct CounterChecker {
    #[serde(flatten)]
    pub header: Header,
    pub counter: String,
    pub operator: ComparisonOperator,
    pub value: i64,
}

impl CounterChecker {
    pub fn new(
        name: impl Into<String>,
        counter: impl Into<String>,
        operator: ComparisonOperator,
        value: i64,
    ) -> Self {
        Self {
            header: Header::new(name),
            counter: counter.into(),
            operator,
            value,
        }
    }
}

impl Element for CounterChecker {
    fn header(&self) -> &Header {
        &self.header
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Checker
    }

    fn type_name(&self) -> &'static str {
        "counter checker"
    }

    fn validate(
        &self,
        ctx: &Context,
    ) {
        if ctx.counter(&self.counter).is_none() {
            self.mark_broken(format!("counter '{}' is not defined", self.counter));
        }
    }
}

#[async_trait]
impl Check for CounterChecker {
    async fn check(
        &self,
        ctx: &Arc<Context>,
    ) -> bool {
        let Some(started) = self.header.begin(ctx) else {
            return false;
        };

        let passed = ctx.counter(&self.counter).is_some_and(|cell| self.operator.compare(cell.get(), self.value));
        debug!(node = %self.header.id, counter = %self.counter, operator = self.operator.as_ref(), passed, "counter checked");

        self.header.finish(ctx, started, passed.into());
        passed
    }
}
