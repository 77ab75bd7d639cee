use std::{
    collections::HashMap,
    sync::{
        Arc, RwLock,
        atomic::{AtomicUsize, Ordering},
    },
};

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::{
    MatcherConfig, Result, ShareLock,
    events::{Event, Log, Message, NodeEvent},
    matcher::MatcherPool,
    node::CounterCell,
    runtime::Channel,
    utils,
    vision::{ImageStore, PatternMatcher, ScreenCapture},
};

/// External collaborators the engine talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub screen: Arc<dyn ScreenCapture>,
    pub matcher: Arc<dyn PatternMatcher>,
    pub images: Arc<dyn ImageStore>,
}

/// Engine-wide context handed to `init()` and to every execution.
///
/// Holds what would otherwise be process-wide state: the init counter, the
/// matcher pool, the counter registry and the root cancellation token.
pub struct Context {
    runtime: Handle,
    channel: Arc<Channel>,
    pool: Arc<MatcherPool>,
    collaborators: Collaborators,
    counters: ShareLock<HashMap<String, Arc<CounterCell>>>,
    init_count: AtomicUsize,
    default_similarity: f64,
    cancel: RwLock<CancellationToken>,
}

impl Context {
    pub fn new(
        runtime: Handle,
        collaborators: Collaborators,
        config: &MatcherConfig,
    ) -> Result<Self> {
        Ok(Self {
            channel: Arc::new(Channel::new(runtime.clone())),
            runtime,
            pool: Arc::new(MatcherPool::new(config.worker_threads)?),
            collaborators,
            counters: Arc::new(RwLock::new(HashMap::new())),
            init_count: AtomicUsize::new(0),
            default_similarity: config.default_similarity,
            cancel: RwLock::new(CancellationToken::new()),
        })
    }

    pub fn runtime(&self) -> &Handle {
        &self.runtime
    }

    pub fn channel(&self) -> Arc<Channel> {
        self.channel.clone()
    }

    pub fn pool(&self) -> Arc<MatcherPool> {
        self.pool.clone()
    }

    pub fn screen(&self) -> Arc<dyn ScreenCapture> {
        self.collaborators.screen.clone()
    }

    pub fn matcher(&self) -> Arc<dyn PatternMatcher> {
        self.collaborators.matcher.clone()
    }

    pub fn images(&self) -> Arc<dyn ImageStore> {
        self.collaborators.images.clone()
    }

    /// Similarity used by targets that do not declare their own.
    pub fn default_similarity(&self) -> f64 {
        self.default_similarity
    }

    pub fn init_count(&self) -> usize {
        self.init_count.load(Ordering::SeqCst)
    }

    pub(crate) fn increment_init_count(&self) {
        self.init_count.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn reset_init_count(&self) {
        self.init_count.store(0, Ordering::SeqCst);
    }

    /// Register a counter cell under its name.
    ///
    /// Returns false when the name already belongs to a different cell.
    pub(crate) fn register_counter(
        &self,
        cell: &Arc<CounterCell>,
    ) -> bool {
        let mut counters = self.counters.write().unwrap();
        match counters.get(cell.name()) {
            Some(existing) => Arc::ptr_eq(existing, cell),
            None => {
                counters.insert(cell.name().to_string(), cell.clone());
                true
            }
        }
    }

    pub(crate) fn clear_counters(&self) {
        self.counters.write().unwrap().clear();
    }

    pub fn counter(
        &self,
        name: &str,
    ) -> Option<Arc<CounterCell>> {
        self.counters.read().unwrap().get(name).cloned()
    }

    /// Current values of every registered counter.
    pub fn counter_values(&self) -> HashMap<String, i64> {
        self.counters.read().unwrap().iter().map(|(name, cell)| (name.clone(), cell.get())).collect()
    }

    /// Token for a node-owned cancellation scope, cancelled on engine shutdown.
    pub fn child_token(&self) -> CancellationToken {
        self.cancel.read().unwrap().child_token()
    }

    pub(crate) fn cancel_all(&self) {
        self.cancel.read().unwrap().cancel();
    }

    /// Replace a root token cancelled by an earlier shutdown. Scopes created
    /// before that stay cancelled until their node is initialized again.
    pub(crate) fn revive(&self) {
        let mut cancel = self.cancel.write().unwrap();
        if cancel.is_cancelled() {
            *cancel = CancellationToken::new();
        }
    }

    pub(crate) fn emit(
        &self,
        nid: &str,
        name: &str,
        event: NodeEvent,
    ) {
        let _ = self.channel.event_queue().send(Event::new(&Message {
            nid: nid.to_string(),
            name: name.to_string(),
            event,
        }));
    }

    pub(crate) fn emit_log(
        &self,
        nid: &str,
        content: String,
    ) {
        let log = Log {
            nid: nid.to_string(),
            content,
            timestamp: utils::time::time_millis(),
        };
        let _ = self.channel.log_queue().send(Event::new(&log));
    }
}
