//! Responses fired by the scheduler or by other actions.

mod counter;
mod delayed;
mod log;
mod region_switch;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    node::{Element, Execution},
    runtime::Context,
};

pub use counter::{CounterAction, CounterOperation};
pub use delayed::{ConfirmedDelayedAction, DelayedAction};
pub use log::LogAction;
pub use region_switch::{RegionSwitchAction, RegionTarget};

#[async_trait]
pub trait Execute: Element {
    /// Runs the action.
    ///
    /// Returns [`Execution::Skipped`] without touching the record when the
    /// node may not execute. A deferred action returns as soon as its
    /// background run is scheduled; its record leaves `Working` when the run
    /// ends.
    async fn execute(
        &self,
        ctx: &Arc<Context>,
    ) -> Execution;
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Delayed(DelayedAction),
    ConfirmedDelayed(ConfirmedDelayedAction),
    RegionSwitch(RegionSwitchAction),
    Counter(CounterAction),
    Log(LogAction),
}

delegate_element!(Action {
    Delayed,
    ConfirmedDelayed,
    RegionSwitch,
    Counter,
    Log,
});

#[async_trait]
impl Execute for Action {
    async fn execute(
        &self,
        ctx: &Arc<Context>,
    ) -> Execution {
        match self {
            Action::Delayed(a) => a.execute(ctx).await,
            Action::ConfirmedDelayed(a) => a.execute(ctx).await,
            Action::RegionSwitch(a) => a.execute(ctx).await,
            Action::Counter(a) => a.execute(ctx).await,
            Action::Log(a) => a.execute(ctx).await,
        }
    }
}

/// Execute `actions` one after another in declaration order.
///
/// Deferred children are only scheduled here; their runs are not awaited.
pub(crate) async fn run_all(
    actions: &[Action],
    ctx: &Arc<Context>,
) {
    for action in actions {
        action.execute(ctx).await;
    }
}

macro_rules! impl_from_action {
    ($($variant:ident($ty:ty)),+ $(,)?) => {
        $(
            impl From<$ty> for Action {
                fn from(action: $ty) -> Self {
                    Action::$variant(action)
                }
            }
        )+
    };
}

impl_from_action!(
    Delayed(DelayedAction),
    ConfirmedDelayed(ConfirmedDelayedAction),
    RegionSwitch(RegionSwitchAction),
    Counter(CounterAction),
    Log(LogAction),
);
