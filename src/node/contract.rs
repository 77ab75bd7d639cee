//! What every tree node implements.

use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{
    Result,
    events::NodeEvent,
    node::{HealthRecord, LastResult, validation},
    runtime::Context,
    utils,
};

/// Coarse family of a node, used in diagnostics.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeKind {
    Action,
    Checker,
    Counter,
    Container,
    Target,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MinChildren {
    Zero,
    One,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MaxChildren {
    Zero,
    One,
    Many,
}

/// Declared child-count bounds of one child slot.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub min: MinChildren,
    pub max: MaxChildren,
}

impl Arity {
    /// exactly one child
    pub const ONE: Arity = Arity::new(MinChildren::One, MaxChildren::One);
    /// one or more children
    pub const AT_LEAST_ONE: Arity = Arity::new(MinChildren::One, MaxChildren::Many);
    /// any number of children, including none
    pub const ANY: Arity = Arity::new(MinChildren::Zero, MaxChildren::Many);

    pub const fn new(
        min: MinChildren,
        max: MaxChildren,
    ) -> Self {
        Self {
            min,
            max,
        }
    }

    pub fn below_min(
        &self,
        count: usize,
    ) -> bool {
        match self.min {
            MinChildren::Zero => false,
            MinChildren::One => count < 1,
        }
    }

    pub fn above_max(
        &self,
        count: usize,
    ) -> bool {
        match self.max {
            MaxChildren::Zero => count > 0,
            MaxChildren::One => count > 1,
            MaxChildren::Many => false,
        }
    }
}

/// One typed child list of a node.
///
/// A `None` entry is a child that was expected but is not defined.
pub struct ChildSlot<'a> {
    /// declared child type, named in diagnostics
    pub child_type: &'static str,
    pub arity: Arity,
    pub children: Vec<Option<&'a dyn Element>>,
}

impl<'a> ChildSlot<'a> {
    pub fn new(
        child_type: &'static str,
        arity: Arity,
        children: Vec<Option<&'a dyn Element>>,
    ) -> Self {
        Self {
            child_type,
            arity,
            children,
        }
    }

    /// Slot over a list of present children.
    pub fn list<E: Element>(
        child_type: &'static str,
        arity: Arity,
        children: &'a [E],
    ) -> Self {
        Self::new(child_type, arity, children.iter().map(|c| Some(c as &dyn Element)).collect())
    }

    /// Number of children actually present.
    pub fn count(&self) -> usize {
        self.children.iter().filter(|c| c.is_some()).count()
    }
}

/// Identity and health record shared by every node.
///
/// Serialized as `id`, `name` and `enabled`; the rest of the record is
/// runtime state and starts over on every load.
#[derive(Clone)]
pub struct Header {
    pub id: String,
    pub name: String,
    record: Arc<HealthRecord>,
}

impl std::fmt::Debug for Header {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Header").field("id", &self.id).field("name", &self.name).field("record", &self.record).finish()
    }
}

#[derive(Serialize)]
struct HeaderRef<'a> {
    id: &'a str,
    name: &'a str,
    enabled: bool,
}

#[derive(Deserialize)]
struct HeaderModel {
    #[serde(default = "utils::longid")]
    id: String,
    name: String,
    #[serde(default = "default_enabled")]
    enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Serialize for Header {
    fn serialize<S: Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        HeaderRef {
            id: &self.id,
            name: &self.name,
            enabled: self.record.enabled(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Header {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let model = HeaderModel::deserialize(deserializer)?;
        Ok(Self {
            id: model.id,
            name: model.name,
            record: Arc::new(HealthRecord::new(model.enabled)),
        })
    }
}

impl Header {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: utils::longid(),
            name: name.into(),
            record: Arc::new(HealthRecord::default()),
        }
    }

    pub fn record(&self) -> &HealthRecord {
        &self.record
    }

    /// Enter `Working` and publish it. `None` when the node may not execute.
    pub(crate) fn begin(
        &self,
        ctx: &Context,
    ) -> Option<i64> {
        if !self.record.begin() {
            debug!(node = %self.id, name = %self.name, "execution skipped");
            return None;
        }
        let started = utils::time::time_millis();
        ctx.emit(&self.id, &self.name, NodeEvent::Working(started));
        Some(started)
    }

    /// Leave `Working` with `result` and publish it.
    pub(crate) fn finish(
        &self,
        ctx: &Context,
        started: i64,
        result: LastResult,
    ) {
        self.record.finish(result);
        ctx.emit(
            &self.id,
            &self.name,
            NodeEvent::Finished {
                result,
                elapsed: utils::time::millis_since(started),
            },
        );
    }
}

/// The node contract: identity, health record, subtype validation and child
/// enumeration. Tree initialization is driven generically from these.
pub trait Element: Send + Sync {
    fn header(&self) -> &Header;

    fn kind(&self) -> NodeKind;

    /// Human-readable node type, e.g. `"delayed action"`.
    fn type_name(&self) -> &'static str;

    /// Subtype-specific checks, run after the record is reset and before the
    /// children are initialized. Problems are reported through the record.
    fn validate(
        &self,
        _ctx: &Context,
    ) {
    }

    /// Typed child lists with their declared bounds.
    fn slots(&self) -> Vec<ChildSlot<'_>> {
        Vec::new()
    }

    fn id(&self) -> &str {
        &self.header().id
    }

    fn name(&self) -> &str {
        &self.header().name
    }

    fn record(&self) -> &HealthRecord {
        self.header().record()
    }

    fn can_execute(&self) -> bool {
        self.record().can_execute()
    }

    /// Reset, validate and recursively initialize this node.
    ///
    /// Configuration problems end up in the health records; only invariant
    /// violations are returned as errors.
    fn init(
        &self,
        ctx: &Context,
    ) -> Result<()>
    where
        Self: Sized,
    {
        validation::init(self, ctx)
    }

    fn mark_broken(
        &self,
        reason: String,
    ) {
        warn!(node = %self.id(), name = %self.name(), %reason, "node broken");
        self.record().mark_broken(reason);
    }

    fn mark_sick(
        &self,
        reason: String,
    ) {
        warn!(node = %self.id(), name = %self.name(), %reason, "node sick");
        self.record().mark_sick(reason);
    }
}

/// What an `execute()`/`check()` call did.
#[derive(Debug)]
pub enum Execution {
    /// The node could not execute; nothing happened.
    Skipped,
    /// The run finished before the call returned.
    Completed(LastResult),
    /// The run continues on a background task.
    Deferred(JoinHandle<LastResult>),
}

impl Execution {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Execution::Skipped)
    }

    /// Wait for the run to end. Skipped runs yield `Unknown`.
    pub async fn wait(self) -> LastResult {
        match self {
            Execution::Skipped => LastResult::Unknown,
            Execution::Completed(result) => result,
            Execution::Deferred(handle) => handle.await.unwrap_or(LastResult::Fail),
        }
    }
}
