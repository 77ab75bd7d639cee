use serde::{Deserialize, Serialize};

use crate::{
    node::{Arity, ChildSlot, Element, Header, Node, NodeKind},
    runtime::Context,
};

/// Groups nodes for presentation. Has no behavior of its own.
#[derive(Serialize, Deserialize, Debug)]
pub struct Container {
    #[serde(flatten)]
    pub header: Header,
    #[serde(default)]
    pub children: Vec<Node>,
}

impl Container {
    pub fn new(
        name: impl Into<String>,
        children: Vec<Node>,
    ) -> Self {
        Self {
            header: Header::new(name),
            children,
        }
    }
}

impl Element for Container {
    fn header(&self) -> &Header {
        &self.header
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Container
    }

    fn type_name(&self) -> &'static str {
        "container"
    }

    fn validate(
        &self,
        _ctx: &Context,
    ) {
        if self.children.is_empty() {
            self.mark_sick("container is empty".to_string());
        }
    }

    fn slots(&self) -> Vec<ChildSlot<'_>> {
        vec![ChildSlot::list("node", Arity::ANY, &self.children)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        node::{Counter, Health, State},
        testing,
    };

    #[tokio::test]
    async fn empty_container_is_sick_but_usable() {
        let ctx = testing::context();
        let container = Container::new("Scenes", Vec::new());

        container.init(&ctx).unwrap();

        assert_eq!(container.record().health(), Health::Sick);
        assert_eq!(container.record().state(), State::Ready);
        assert_eq!(container.record().unhealthy_reason(), "container is empty");
        assert!(container.can_execute());
    }

    #[tokio::test]
    async fn broken_member_breaks_container() {
        let ctx = testing::context();
        let container = Container::new("Counters", vec![Counter::new("Hits", "hits", 0).into(), Counter::new("Again", "hits", 0).into()]);

        container.init(&ctx).unwrap();

        assert_eq!(container.record().health(), Health::Broken);
        assert_eq!(container.record().unhealthy_reason(), "contained node 'Again' is broken");
        assert_eq!(ctx.init_count(), 3);
    }
}
