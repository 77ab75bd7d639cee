use std::sync::{
    Arc, RwLock,
    atomic::{AtomicI64, Ordering},
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    node::{Element, Header, NodeKind},
    runtime::Context,
};

/// Live value of a named counter, shared by the counter node and every
/// action or checker that refers to it.
#[derive(Debug)]
pub struct CounterCell {
    name: String,
    initial: AtomicI64,
    value: AtomicI64,
}

impl CounterCell {
    pub fn new(
        name: impl Into<String>,
        initial: i64,
    ) -> Self {
        Self {
            name: name.into(),
            initial: AtomicI64::new(initial),
            value: AtomicI64::new(initial),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self) -> i64 {
        self.value.load(Ordering::SeqCst)
    }

    pub fn initial(&self) -> i64 {
        self.initial.load(Ordering::SeqCst)
    }

    pub fn set(
        &self,
        value: i64,
    ) {
        self.value.store(value, Ordering::SeqCst);
    }

    /// Add `delta` and return the new value. Wraps on overflow.
    pub fn add(
        &self,
        delta: i64,
    ) -> i64 {
        self.value.fetch_add(delta, Ordering::SeqCst).wrapping_add(delta)
    }

    /// Back to the initial value.
    pub fn reset(&self) {
        self.set(self.initial());
    }

    /// Replace the initial value and reset to it.
    pub(crate) fn rebase(
        &self,
        initial: i64,
    ) {
        self.initial.store(initial, Ordering::SeqCst);
        self.set(initial);
    }
}

/// A named integer other nodes can adjust and compare.
#[derive(Serialize, Deserialize, Debug)]
pub struct Counter {
    #[serde(flatten)]
    pub header: Header,
    /// name actions and checkers refer to
    pub counter: String,
    #[serde(default)]
    pub initial: i64,

    #[serde(skip)]
    cell: RwLock<Option<Arc<CounterCell>>>,
}

impl Counter {
    pub fn new(
        name: impl Into<String>,
        counter: impl Into<String>,
        initial: i64,
    ) -> Self {
        Self {
            header: Header::new(name),
            counter: counter.into(),
            initial,
            cell: RwLock::new(None),
        }
    }

    /// The cell backing this counter, created on first use.
    pub fn cell(&self) -> Arc<CounterCell> {
        if let Some(cell) = self.cell.read().unwrap().as_ref().filter(|cell| cell.name() == self.counter) {
            return cell.clone();
        }

        let mut slot = self.cell.write().unwrap();
        match slot.as_ref() {
            Some(cell) if cell.name() == self.counter => cell.clone(),
            _ => {
                let cell = Arc::new(CounterCell::new(self.counter.clone(), self.initial));
                *slot = Some(cell.clone());
                cell
            }
        }
    }

    pub fn value(&self) -> i64 {
        self.cell().get()
    }
}

impl Element for Counter {
    fn header(&self) -> &Header {
        &self.header
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Counter
    }

    fn type_name(&self) -> &'static str {
        "counter"
    }

    fn validate(
        &self,
        ctx: &Context,
    ) {
        if self.counter.is_empty() {
            self.mark_broken("counter name is empty".to_string());
            return;
        }

        let cell = self.cell();
        if !ctx.register_counter(&cell) {
            self.mark_broken(format!("counter name '{}' is already used", self.counter));
            return;
        }
        cell.rebase(self.initial);
        debug!(counter = %self.counter, value = self.initial, "counter reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{node::Health, testing};

    #[test]
    fn cell_arithmetic() {
        let cell = CounterCell::new("hits", 3);
        assert_eq!(cell.add(2), 5);
        assert_eq!(cell.add(-6), -1);
        cell.set(10);
        assert_eq!(cell.get(), 10);
        cell.reset();
        assert_eq!(cell.get(), 3);
    }

    #[test]
    fn add_wraps_at_the_edges() {
        let cell = CounterCell::new("hits", i64::MAX);
        assert_eq!(cell.add(1), i64::MIN);
        assert_eq!(cell.get(), i64::MIN);
        assert_eq!(cell.add(-1), i64::MAX);
    }

    #[tokio::test]
    async fn init_resets_and_registers() {
        let ctx = testing::context();
        let counter = Counter::new("Hits", "hits", 7);
        counter.cell().set(100);

        counter.init(&ctx).unwrap();

        assert_eq!(counter.value(), 7);
        assert_eq!(counter.cell().initial(), 7);
        assert_eq!(ctx.counter("hits").unwrap().get(), 7);
        assert!(counter.can_execute());
    }

    #[tokio::test]
    async fn duplicate_name_breaks_the_later_counter() {
        let ctx = testing::context();
        let first = Counter::new("First", "hits", 0);
        let second = Counter::new("Second", "hits", 0);

        first.init(&ctx).unwrap();
        second.init(&ctx).unwrap();

        assert_eq!(first.record().health(), Health::Healthy);
        assert_eq!(second.record().health(), Health::Broken);
        assert_eq!(second.record().unhealthy_reason(), "counter name 'hits' is already used");
    }

    #[tokio::test]
    async fn reinit_keeps_registration() {
        let ctx = testing::context();
        let counter = Counter::new("Hits", "hits", 0);
        counter.init(&ctx).unwrap();
        counter.init(&ctx).unwrap();
        assert_eq!(counter.record().health(), Health::Healthy);
    }
}
