//! Conditions evaluated by the scheduler and by guarded actions.

mod counter;
mod logical;
mod region;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{node::Element, runtime::Context};

pub use counter::{ComparisonOperator, CounterChecker};
pub use logical::{LogicalChecker, LogicalOperator};
pub use region::RegionChecker;

#[async_trait]
pub trait Check: Element {
    /// Evaluate the condition.
    ///
    /// A node that may not execute answers `false` and leaves its record
    /// untouched.
    async fn check(
        &self,
        ctx: &Arc<Context>,
    ) -> bool;
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Checker {
    Region(RegionChecker),
    Counter(CounterChecker),
    Logical(LogicalChecker),
}

delegate_element!(Checker {
    Region,
    Counter,
    Logical,
});

#[async_trait]
impl Check for Checker {
    async fn check(
        &self,
        ctx: &Arc<Context>,
    ) -> bool {
        match self {
            Checker::Region(c) => c.check(ctx).await,
            Checker::Counter(c) => c.check(ctx).await,
            Checker::Logical(c) => c.check(ctx).await,
        }
    }
}

impl From<RegionChecker> for Checker {
    fn from(checker: RegionChecker) -> Self {
        Checker::Region(checker)
    }
}

impl From<CounterChecker> for Checker {
    fn from(checker: CounterChecker) -> Self {
        Checker::Counter(checker)
    }
}

impl From<LogicalChecker> for Checker {
    fn from(checker: LogicalChecker) -> Self {
        Checker::Logical(checker)
    }
}
