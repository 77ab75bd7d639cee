use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    node::{CounterCell, Element, Execute, Execution, Header, LastResult, NodeKind},
    runtime::Context,
};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CounterOperation {
    #[default]
    Increment,
    Decrement,
    Set,
    Reset,
}

impl CounterOperation {
    fn apply(
        self,
        cell: &CounterCell,
        value: i64,
    ) {
        match self {
            CounterOperation::Increment => {
                cell.add(value);
            }
            CounterOperation::Decrement => {
                cell.add(value.wrapping_neg());
            }
            CounterOperation::Set => cell.set(value),
            CounterOperation::Reset => cell.reset(),
        }
    }
}

fn default_value() -> i64 {
    1
}

/// Adjusts a named counter.
#[derive(Serialize, Deserialize, Debug)]
pub struct CounterAction {
    #[serde(flatten)]
    pub header: Header,
    pub counter: String,
    #[serde(default)]
    pub operation: CounterOperation,
    /// step for increment/decrement, target for set
    #[serde(default = "default_value")]
    pub value: i64,
}

impl CounterAction {
    pub fn new(
        name: impl Into<String>,
        counter: impl Into<String>,
        operation: CounterOperation,
        value: i64,
    ) -> Self {
        Self {
            header: Header::new(name),
            counter: counter.into(),
            operation,
            value,
        }
    }

    pub fn increment(
        name: impl Into<String>,
        counter: impl Into<String>,
    ) -> Self {
        Self::new(name, counter, CounterOperation::Increment, 1)
    }
}

impl Element for CounterAction {
    fn header(&self) -> &Header {
        &self.header
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Action
    }

    fn type_name(&self) -> &'static str {
        "counter action"
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
impl Execute for CounterAction {
    async fn execute(
        &self,
        ctx: &Arc<Context>,
    ) -> Execution {
        let Some(started) = self.header.begin(ctx) else {
            return Execution::Skipped;
        };

        let result = match ctx.counter(&self.counter) {
            Some(cell) => {
                self.operation.apply(&cell, self.value);
                debug!(counter = %self.counter, operation = self.operation.as_ref(), value = cell.get(), "counter adjusted");
                LastResult::Success
            }
            None => {
                warn!(node = %self.header.id, counter = %self.counter, "counter disappeared");
                LastResult::Fail
            }
        };

        self.header.finish(ctx, started, result);
        Execution::Completed(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        node::{Counter, Health},
        testing,
    };

    async fn run(
        ctx: &Arc<Context>,
        operation: CounterOperation,
        value: i64,
    ) -> i64 {
        let action = CounterAction::new("Adjust", "hits", operation, value);
        action.init(ctx).unwrap();
        action.execute(ctx).await;
        ctx.counter("hits").unwrap().get()
    }

    #[tokio::test]
    async fn operations() {
        let ctx = testing::context();
        Counter::new("Hits", "hits", 5).init(&ctx).unwrap();

        assert_eq!(run(&ctx, CounterOperation::Increment, 2).await, 7);
        assert_eq!(run(&ctx, CounterOperation::Decrement, 10).await, -3);
        assert_eq!(run(&ctx, CounterOperation::Set, 42).await, 42);
        assert_eq!(run(&ctx, CounterOperation::Reset, 0).await, 5);
    }

    #[tokio::test]
    async fn extreme_values_do_not_panic() {
        let ctx = testing::context();
        Counter::new("Hits", "hits", i64::MAX).init(&ctx).unwrap();

        assert_eq!(run(&ctx, CounterOperation::Increment, 1).await, i64::MIN);
        assert_eq!(run(&ctx, CounterOperation::Set, 0).await, 0);
        assert_eq!(run(&ctx, CounterOperation::Decrement, i64::MIN).await, i64::MIN);
    }

    #[tokio::test]
    async fn unknown_counter_breaks_the_action() {
        let ctx = testing::context();
        let action = CounterAction::increment("Bump", "missing");

        action.init(&ctx).unwrap();

        assert_eq!(action.record().health(), Health::Broken);
        assert_eq!(action.record().unhealthy_reason(), "counter 'missing' is not defined");
        assert!(action.execute(&ctx).await.is_skipped());
    }

    #[test]
    fn operation_defaults_to_increment_by_one() {
        let action: CounterAction = serde_json::from_str(r#"{"name":"Bump","counter":"hits"}"#).unwrap();
        assert_eq!(action.operation, CounterOperation::Increment);
        assert_eq!(action.value, 1);
    }
}
