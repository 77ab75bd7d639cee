//! Event types for node execution.
//!
//! Events are emitted while nodes are initialized and executed to notify
//! subscribers (typically a UI) about health changes, completions and logs.

mod node;

pub use node::*;

/// Generic event wrapper.
#[derive(Debug, Clone)]
pub struct Event<T> {
    inner: T,
}

/// Event message naming the node it is about.
#[derive(Debug, Clone)]
pub struct Message {
    /// Id of the node that generated this event.
    pub nid: String,
    /// Display name of that node.
    pub name: String,
    /// The actual event data.
    pub event: NodeEvent,
}

/// User-facing log entry, published by log actions and health diagnostics.
#[derive(Debug, Clone)]
pub struct Log {
    /// Id of the node that generated this log.
    pub nid: String,
    /// Log message content.
    pub content: String,
    /// Timestamp in milliseconds of the log entry.
    pub timestamp: i64,
}

impl<T> std::ops::Deref for Event<T>
where
    T: std::fmt::Debug + Clone,
{
    type Target = T;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T> Event<T>
where
    T: std::fmt::Debug + Clone,
{
    pub fn new(inner: &T) -> Self {
        Self {
            inner: inner.clone(),
        }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}
