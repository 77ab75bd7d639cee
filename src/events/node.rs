use crate::node::LastResult;

#[derive(Debug, Clone, PartialEq)]
pub enum NodeEvent {
    /// Execution started, with the start timestamp.
    Working(i64),
    /// Execution completed.
    Finished {
        result: LastResult,
        /// how long the run took, in milliseconds
        elapsed: i64,
    },
    /// A deferred run was cancelled while waiting.
    Cancelled,
    /// Initialization left the node broken.
    Broken(String),
    /// Initialization left the node usable but degraded.
    Sick(String),
}

impl NodeEvent {
    pub fn str(&self) -> &str {
        match self {
            NodeEvent::Working(_) => "Working",
            NodeEvent::Finished {
                ..
            } => "Finished",
            NodeEvent::Cancelled => "Cancelled",
            NodeEvent::Broken(_) => "Broken",
            NodeEvent::Sick(_) => "Sick",
        }
    }

    pub fn is_health(&self) -> bool {
        matches!(self, NodeEvent::Broken(_) | NodeEvent::Sick(_))
    }
}
