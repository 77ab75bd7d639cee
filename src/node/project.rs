use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    Result, model,
    node::{Element, Node, validation},
    runtime::Context,
    utils,
};

/// Root of a node tree.
#[derive(Serialize, Deserialize, Debug)]
pub struct Project {
    #[serde(default = "utils::longid")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<Node>,
}

impl Project {
    pub fn new(
        name: impl Into<String>,
        nodes: Vec<Node>,
    ) -> Self {
        Self {
            id: utils::longid(),
            name: name.into(),
            nodes,
        }
    }

    /// Parse a project document, checking it against the project schema
    /// first.
    pub fn from_json(s: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(s)?;
        model::validate(&value)?;
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Number of elements a full `init()` visits.
    pub fn element_count(&self) -> usize {
        self.nodes.iter().map(|node| validation::element_count(node)).sum()
    }

    /// Initialize every node.
    ///
    /// Counters are registered before any node is initialized so references
    /// resolve regardless of declaration order. Fails only when an internal
    /// invariant does not hold, e.g. the number of initialized elements does
    /// not match [`Project::element_count`].
    pub fn init(
        &self,
        ctx: &Context,
    ) -> Result<()> {
        ctx.clear_counters();
        for counter in self.nodes.iter().flat_map(Node::counters) {
            ctx.register_counter(&counter.cell());
        }

        let elements = validation::init_roots(self.nodes.iter().map(|node| node as &dyn Element), ctx, &format!("project '{}'", self.name))?;

        info!(project = %self.id, elements, "project initialized");
        Ok(())
    }

    /// Any node of the tree by id.
    pub fn find(
        &self,
        id: &str,
    ) -> Option<&dyn Element> {
        self.nodes.iter().find_map(|node| find_in(node, id))
    }
}

fn find_in<'a>(
    element: &'a dyn Element,
    id: &str,
) -> Option<&'a dyn Element> {
    if element.id() == id {
        return Some(element);
    }
    element.slots().into_iter().flat_map(|slot| slot.children).flatten().find_map(|child| find_in(child, id))
}
