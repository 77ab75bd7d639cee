//! # Cueflow
//!
//! Cueflow is an embeddable engine that watches screen regions and fires
//! scripted responses. Users compose a tree of typed nodes (checkers,
//! actions, counters and containers) that a scheduler evaluates repeatedly.
//!
//! ## Core Features
//!
//! - **Node Contract**: every node carries an observable health record and
//!   declares typed child slots; initialization validates the whole tree
//!   bottom-up
//! - **Region Matching**: one screen capture is searched for several target
//!   images on a fixed pool of matcher threads, first hit or best score
//! - **Deferred Execution**: action lists run after a delay on a background
//!   task, optionally gated by a guard re-checked at fire time
//! - **Event Channel**: node transitions and user logs are published for UIs
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cueflow::{EngineBuilder, vision::StaticScreen};
//!
//! let engine = EngineBuilder::new().screen(Arc::new(screen)).build()?;
//! engine.launch();
//!
//! let project = engine.load(json_str)?;
//! engine.init(&project)?;
//! for node in &project.nodes {
//!     engine.run(node);
//! }
//! ```

mod builder;
mod common;
mod config;
mod engine;
mod error;
mod events;
pub mod matcher;
pub mod model;
pub mod node;
pub mod runtime;
mod utils;
pub mod vision;

#[cfg(test)]
mod testing;

use std::sync::{Arc, RwLock};

pub use builder::EngineBuilder;
pub use config::{Config, MatcherConfig};
pub use engine::Engine;
pub use error::CueflowError;
pub use events::{Event, Log, Message, NodeEvent};
pub use node::{Action, Check, Checker, Element, Execute, Execution, Health, HealthSnapshot, LastResult, Node, Project, State};
pub use runtime::{ChannelEvent, ChannelOptions};

/// Result type alias for Cueflow operations.
pub type Result<T> = std::result::Result<T, CueflowError>;

/// Thread-safe shared lock wrapper using Arc<RwLock<T>>.
pub(crate) type ShareLock<T> = Arc<RwLock<T>>;
