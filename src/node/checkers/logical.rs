use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    node::{Arity, Check, Checker, ChildSlot, Element, Header, NodeKind},
    runtime::Context,
};

/// Logical operator
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LogicalOperator {
    #[default]
    And,
    Or,
}

/// Combines child checkers; evaluation stops as soon as the outcome is known.
#[derive(Serialize, Deserialize, Debug)]
pub struct LogicalChecker {
    #[serde(flatten)]
    pub header: Header,
    #[serde(default)]
    pub operator: LogicalOperator,
    #[serde(default)]
    pub negate: bool,
    #[serde(default)]
    pub conditions: Vec<Checker>,
}

impl LogicalChecker {
    pub fn new(
        name: impl Into<String>,
        operator: LogicalOperator,
        conditions: Vec<Checker>,
    ) -> Self {
        Self {
            header: Header::new(name),
            operator,
            negate: false,
            conditions,
        }
    }

    pub fn negated(mut self) -> Self {
        self.negate = !self.negate;
        self
    }

    async fn evaluate(
        &self,
        ctx: &Arc<Context>,
    ) -> bool {
        match self.operator {
            LogicalOperator::And => {
                for condition in &self.conditions {
                    if !condition.check(ctx).await {
                        return false;
                    }
                }
                true
            }
            LogicalOperator::Or => {
                for condition in &self.conditions {
                    if condition.check(ctx).await {
                        return true;
                    }
                }
                false
            }
        }
    }
}

impl Element for LogicalChecker {
    fn header(&self) -> &Header {
        &self.header
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Checker
    }

    fn type_name(&self) -> &'static str {
        "logical checker"
    }

    fn slots(&self) -> Vec<ChildSlot<'_>> {
        vec![ChildSlot::list("condition", Arity::AT_LEAST_ONE, &self.conditions)]
    }
}

#[async_trait]
impl Check for LogicalChecker {
    async fn check(
        &self,
        ctx: &Arc<Context>,
    ) -> bool {
        let Some(started) = self.header.begin(ctx) else {
            return false;
        };

        let passed = self.evaluate(ctx).await != self.negate;

        self.header.finish(ctx, started, passed.into());
        passed
    }
}
