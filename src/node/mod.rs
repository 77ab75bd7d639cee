//! The node tree: contract, health record, validation and the concrete node
//! types.

/// Implement [`Element`] for a sum type by forwarding to its variants.
macro_rules! delegate_element {
    ($ty:ident { $($variant:ident),+ $(,)? }) => {
        impl $crate::node::Element for $ty {
            fn header(&self) -> &$crate::node::Header {
                match self {
                    $(Self::$variant(n) => n.header(),)+
                }
            }

            fn kind(&self) -> $crate::node::NodeKind {
                match self {
                    $(Self::$variant(n) => n.kind(),)+
                }
            }

            fn type_name(&self) -> &'static str {
                match self {
                    $(Self::$variant(n) => n.type_name(),)+
                }
            }

            fn validate(
                &self,
                ctx: &$crate::runtime::Context,
            ) {
                match self {
                    $(Self::$variant(n) => n.validate(ctx),)+
                }
            }

            fn slots(&self) -> Vec<$crate::node::ChildSlot<'_>> {
                match self {
                    $(Self::$variant(n) => n.slots(),)+
                }
            }
        }
    };
}

pub mod actions;
pub mod checkers;
mod container;
mod contract;
mod counter;
mod health;
mod pattern;
mod project;
pub mod validation;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::runtime::Context;

pub use actions::{Action, Execute};
pub use checkers::{Check, Checker};
pub use container::Container;
pub use contract::{Arity, ChildSlot, Element, Execution, Header, MaxChildren, MinChildren, NodeKind};
pub use counter::{Counter, CounterCell};
pub use health::{Health, HealthRecord, HealthSnapshot, LastResult, State};
pub use pattern::PatternSource;
pub use project::Project;

/// Any node that can sit at the top of a project or inside a container.
#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Action(Action),
    Checker(Checker),
    Counter(Counter),
    Container(Container),
}

delegate_element!(Node {
    Action,
    Checker,
    Counter,
    Container,
});

impl Node {
    /// Every counter declared by this node, containers included.
    pub fn counters(&self) -> Vec<&Counter> {
        match self {
            Node::Counter(counter) => vec![counter],
            Node::Container(container) => container.children.iter().flat_map(Node::counters).collect(),
            _ => Vec::new(),
        }
    }

    /// Run the node: actions execute, checkers check. Counters and containers
    /// have nothing to run.
    pub async fn run(
        &self,
        ctx: &Arc<Context>,
    ) -> Execution {
        match self {
            Node::Action(action) => action.execute(ctx).await,
            Node::Checker(checker) => {
                if !checker.can_execute() {
                    return Execution::Skipped;
                }
                Execution::Completed(checker.check(ctx).await.into())
            }
            Node::Counter(_) | Node::Container(_) => Execution::Skipped,
        }
    }
}

impl From<Action> for Node {
    fn from(action: Action) -> Self {
        Node::Action(action)
    }
}

impl From<Checker> for Node {
    fn from(checker: Checker) -> Self {
        Node::Checker(checker)
    }
}

impl From<Counter> for Node {
    fn from(counter: Counter) -> Self {
        Node::Counter(counter)
    }
}

impl From<Container> for Node {
    fn from(container: Container) -> Self {
        Node::Container(container)
    }
}
