//! Cueflow engine - the main entry point.
//!
//! The engine ties the pieces together:
//! - the tokio runtime deferred runs and channel handlers are spawned on
//! - the [`Context`] every node is initialized and executed with
//! - project loading and initialization
//! - shutdown of pending deferred runs and the event channel

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tokio::runtime::{Builder, Runtime};
use tracing::info;

use crate::{
    Config, CueflowError, Result,
    node::{Action, Check, Checker, Execute, Execution, Node, Project},
    runtime::{Channel, Collaborators, Context},
};

/// The cueflow engine.
///
/// # Example
///
/// ```rust,ignore
/// let engine = EngineBuilder::new().screen(screen).build()?;
/// engine.launch();
///
/// let project = engine.load(&json)?;
/// engine.init(&project)?;
///
/// // called by the scheduler on every tick
/// if let Node::Action(action) = &project.nodes[0] {
///     engine.execute(action);
/// }
///
/// engine.shutdown();
/// ```
pub struct Engine {
    ctx: Arc<Context>,

    /// Flag indicating if the engine is running.
    running: AtomicBool,
    /// Tokio runtime for async task execution.
    runtime: Arc<Runtime>,
}

impl Engine {
    /// Creates a new engine with the given configuration and collaborators.
    pub fn new_with_config(
        config: Config,
        collaborators: Collaborators,
    ) -> Result<Self> {
        config.validate()?;
        let runtime = Arc::new(Builder::new_multi_thread().worker_threads(config.async_worker_thread_number.into()).enable_all().build()?);
        Self::new(runtime, collaborators, &config)
    }

    pub(crate) fn new(
        runtime: Arc<Runtime>,
        collaborators: Collaborators,
        config: &Config,
    ) -> Result<Self> {
        let ctx = Context::new(runtime.handle().clone(), collaborators, &config.matcher)?;
        Ok(Self {
            ctx: Arc::new(ctx),
            running: AtomicBool::new(false),
            runtime,
        })
    }

    /// Starts dispatching channel events to registered handlers.
    ///
    /// An engine shut down earlier can be launched again; projects must be
    /// re-initialized before their deferred runs work again.
    pub fn launch(&self) {
        if self.running.swap(true, Ordering::Relaxed) {
            return;
        }
        self.ctx.revive();
        self.ctx.channel().listen();
    }

    /// Cancels every deferred run still sleeping and stops the channel.
    pub fn shutdown(&self) {
        if !self.running.swap(false, Ordering::Relaxed) {
            return;
        }
        self.ctx.cancel_all();
        self.ctx.channel().shutdown();
        info!("engine shut down");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Parses and schema-checks a project document.
    pub fn load(
        &self,
        json: &str,
    ) -> Result<Project> {
        Project::from_json(json)
    }

    /// Initializes the whole project tree.
    pub fn init(
        &self,
        project: &Project,
    ) -> Result<()> {
        if !self.is_running() {
            return Err(CueflowError::Engine("engine is not running".to_string()));
        }
        project.init(&self.ctx)
    }

    /// Executes an action on the engine runtime and waits until `execute()`
    /// returns. Deferred runs keep going in the background.
    pub fn execute(
        &self,
        action: &Action,
    ) -> Execution {
        self.runtime.block_on(action.execute(&self.ctx))
    }

    /// Evaluates a checker on the engine runtime.
    pub fn check(
        &self,
        checker: &Checker,
    ) -> bool {
        self.runtime.block_on(checker.check(&self.ctx))
    }

    /// Runs any node: actions execute, checkers check.
    pub fn run(
        &self,
        node: &Node,
    ) -> Execution {
        self.runtime.block_on(node.run(&self.ctx))
    }

    /// Returns a reference to the event channel.
    pub fn channel(&self) -> Arc<Channel> {
        self.ctx.channel()
    }

    pub fn context(&self) -> Arc<Context> {
        self.ctx.clone()
    }

    pub fn runtime(&self) -> Arc<Runtime> {
        self.runtime.clone()
    }
}
