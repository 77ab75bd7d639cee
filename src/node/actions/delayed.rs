//! Deferred execution of an action list.
//!
//! Every `execute()` schedules an independent background run on the engine
//! runtime: sleep for the delay, optionally re-check a guard, then run the
//! child actions in order. Overlapping calls are not serialized. Only the
//! sleep can be cancelled; once the children start the run goes to the end.

use std::{
    sync::{Arc, RwLock},
    time::Duration,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    events::NodeEvent,
    node::{Action, Arity, Check, Checker, ChildSlot, Element, Execute, Execution, Header, LastResult, NodeKind, actions::run_all},
    runtime::Context,
};

/// Cancellation scope owned by a deferred node.
///
/// Renewed on every init, which cancels the runs scheduled before it.
#[derive(Debug, Default)]
struct Scope {
    token: RwLock<CancellationToken>,
}

impl Scope {
    fn renew(
        &self,
        ctx: &Context,
    ) {
        let previous = std::mem::replace(&mut *self.token.write().unwrap(), ctx.child_token());
        previous.cancel();
    }

    fn token(&self) -> CancellationToken {
        self.token.read().unwrap().clone()
    }

    fn cancel(&self) {
        self.token.read().unwrap().cancel();
    }
}

/// Runs its actions `delay_ms` after each execution.
#[derive(Serialize, Deserialize, Debug)]
pub struct DelayedAction {
    #[serde(flatten)]
    pub header: Header,
    pub delay_ms: u64,
    #[serde(default)]
    pub actions: Arc<Vec<Action>>,

    #[serde(skip)]
    scope: Scope,
}

impl DelayedAction {
    pub fn new(
        name: impl Into<String>,
        delay_ms: u64,
        actions: Vec<Action>,
    ) -> Self {
        Self {
            header: Header::new(name),
            delay_ms,
            actions: Arc::new(actions),
            scope: Scope::default(),
        }
    }

    /// Cancel every run of this node that is still sleeping.
    pub fn cancel(&self) {
        self.scope.cancel();
    }
}

impl Element for DelayedAction {
    fn header(&self) -> &Header {
        &self.header
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Action
    }

    fn type_name(&self) -> &'static str {
        "delayed action"
    }

    fn validate(
        &self,
        ctx: &Context,
    ) {
        self.scope.renew(ctx);
    }

    fn slots(&self) -> Vec<ChildSlot<'_>> {
        vec![ChildSlot::list("action", Arity::AT_LEAST_ONE, self.actions.as_slice())]
    }
}

#[async_trait]
impl Execute for DelayedAction {
    async fn execute(
        &self,
        ctx: &Arc<Context>,
    ) -> Execution {
        schedule(&self.header, self.delay_ms, &self.actions, None, &self.scope, ctx)
    }
}

/// Like [`DelayedAction`], but re-checks a guard right before the actions
/// would run and skips them when it fails.
///
/// A failed guard is not a failure of this node: the run still reports
/// `Success`.
#[derive(Serialize, Deserialize, Debug)]
pub struct ConfirmedDelayedAction {
    #[serde(flatten)]
    pub header: Header,
    pub delay_ms: u64,
    pub guard: Option<Arc<Checker>>,
    #[serde(default)]
    pub actions: Arc<Vec<Action>>,

    #[serde(skip)]
    scope: Scope,
}

impl ConfirmedDelayedAction {
    pub fn new(
        name: impl Into<String>,
        delay_ms: u64,
        guard: Checker,
        actions: Vec<Action>,
    ) -> Self {
        Self {
            header: Header::new(name),
            delay_ms,
            guard: Some(Arc::new(guard)),
            actions: Arc::new(actions),
            scope: Scope::default(),
        }
    }

    pub fn cancel(&self) {
        self.scope.cancel();
    }
}

impl Element for ConfirmedDelayedAction {
    fn header(&self) -> &Header {
        &self.header
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Action
    }

    fn type_name(&self) -> &'static str {
        "confirmed delayed action"
    }

    fn validate(
        &self,
        ctx: &Context,
    ) {
        self.scope.renew(ctx);
    }

    fn slots(&self) -> Vec<ChildSlot<'_>> {
        vec![
            ChildSlot::new("guard checker", Arity::ONE, vec![self.guard.as_deref().map(|guard| guard as &dyn Element)]),
            ChildSlot::list("action", Arity::AT_LEAST_ONE, self.actions.as_slice()),
        ]
    }
}

#[async_trait]
impl Execute for ConfirmedDelayedAction {
    async fn execute(
        &self,
        ctx: &Arc<Context>,
    ) -> Execution {
        schedule(&self.header, self.delay_ms, &self.actions, self.guard.clone(), &self.scope, ctx)
    }
}

fn schedule(
    header: &Header,
    delay_ms: u64,
    actions: &Arc<Vec<Action>>,
    guard: Option<Arc<Checker>>,
    scope: &Scope,
    ctx: &Arc<Context>,
) -> Execution {
    let Some(started) = header.begin(ctx) else {
        return Execution::Skipped;
    };

    let header = header.clone();
    let actions = actions.clone();
    let token = scope.token();
    let delay = Duration::from_millis(delay_ms);
    let ctx = ctx.clone();
    debug!(node = %header.id, delay_ms, "deferred run scheduled");

    let handle = ctx.runtime().clone().spawn(async move {
        let result = tokio::select! {
            _ = token.cancelled() => {
                warn!(node = %header.id, "deferred run cancelled");
                ctx.emit(&header.id, &header.name, NodeEvent::Cancelled);
                LastResult::Fail
            }
            _ = tokio::time::sleep(delay) => {
                let confirmed = match &guard {
                    Some(guard) => guard.check(&ctx).await,
                    None => true,
                };
                if confirmed {
                    info!(node = %header.id, actions = actions.len(), "deferred run firing");
                    run_all(&actions, &ctx).await;
                } else {
                    info!(node = %header.id, "guard not confirmed, actions skipped");
                }
                LastResult::Success
            }
        };
        header.finish(&ctx, started, result);
        result
    });

    Execution::Deferred(handle)
}
