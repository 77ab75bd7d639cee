use std::sync::{Arc, RwLock};

use futures::future::BoxFuture;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::{
    CueflowError, Result, ShareLock,
    common::BroadcastQueue,
    events::{Event, Log, Message, NodeEvent},
    node::LastResult,
};

macro_rules! dispatch_event {
    ($handles:expr, $(&$item:ident), +) => {
        let handlers = $handles.read().unwrap();
        for handle in handlers.iter() {
            (handle)($(&$item),+);
        }
    };
}

macro_rules! dispatch_event_async {
    ($handles:expr, $(&$item:ident), +) => {
        let handles = $handles.clone();

        tokio::spawn(async move {
            let handlers = handles.read().unwrap().clone();
            for handle in handlers.iter() {
                (handle)($(&$item),+).await;
            }
        });
    };
}

const EVENT_QUEUE_SIZE: usize = 2048;
const LOG_QUEUE_SIZE: usize = 4096;

pub type NodeEventHandle = Arc<dyn Fn(&Event<Message>) + Send + Sync>;
pub type NodeLogHandle = Arc<dyn Fn(&Event<Log>) + Send + Sync>;
pub type NodeEventHandleAsync = Arc<dyn Fn(&Event<Message>) -> BoxFuture<'static, ()> + Send + Sync>;
pub type NodeLogHandleAsync = Arc<dyn Fn(&Event<Log>) -> BoxFuture<'static, ()> + Send + Sync>;

#[derive(Debug, Clone)]
pub struct ChannelOptions {
    /// use the glob pattern to match the node id
    /// eg. nid1*
    pub nid: String,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            nid: "*".to_string(),
        }
    }
}

impl ChannelOptions {
    pub fn with_nid(nid: impl Into<String>) -> Self {
        Self {
            nid: nid.into(),
        }
    }
}

/// Event bus between executing nodes and observers.
///
/// Nodes publish on the queues; [`Channel::listen`] fans every message out to
/// the handlers registered through [`ChannelEvent`].
#[derive(Clone)]
pub struct Channel {
    event_queue: Arc<BroadcastQueue<Event<Message>>>,
    log_queue: Arc<BroadcastQueue<Event<Log>>>,

    events: ShareLock<Vec<NodeEventHandle>>,
    logs: ShareLock<Vec<NodeLogHandle>>,
    events_async: ShareLock<Vec<NodeEventHandleAsync>>,
    logs_async: ShareLock<Vec<NodeLogHandleAsync>>,

    runtime: Handle,
    shutdown: ShareLock<CancellationToken>,
}

impl Channel {
    pub(crate) fn new(runtime: Handle) -> Self {
        Self {
            event_queue: BroadcastQueue::new(EVENT_QUEUE_SIZE),
            log_queue: BroadcastQueue::new(LOG_QUEUE_SIZE),
            events: Arc::new(RwLock::new(Vec::new())),
            logs: Arc::new(RwLock::new(Vec::new())),
            events_async: Arc::new(RwLock::new(Vec::new())),
            logs_async: Arc::new(RwLock::new(Vec::new())),
            runtime,
            shutdown: Arc::new(RwLock::new(CancellationToken::new())),
        }
    }

    pub(crate) fn log_queue(&self) -> Arc<BroadcastQueue<Event<Log>>> {
        self.log_queue.clone()
    }

    pub(crate) fn event_queue(&self) -> Arc<BroadcastQueue<Event<Message>>> {
        self.event_queue.clone()
    }

    /// Subscribe to raw node events without going through handlers.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event<Message>> {
        self.event_queue.subscribe()
    }

    /// Subscribe to raw logs without going through handlers.
    pub fn subscribe_logs(&self) -> tokio::sync::broadcast::Receiver<Event<Log>> {
        self.log_queue.subscribe()
    }

    pub(crate) fn listen(&self) {
        let mut event_queue = self.event_queue.subscribe();
        let mut log_queue = self.log_queue.subscribe();
        let events = self.events.clone();
        let logs = self.logs.clone();
        let events_async = self.events_async.clone();
        let logs_async = self.logs_async.clone();

        // a channel shut down earlier listens again on a fresh token
        let shutdown = {
            let mut token = self.shutdown.write().unwrap();
            if token.is_cancelled() {
                *token = CancellationToken::new();
            }
            token.clone()
        };
        self.runtime.spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    Ok(e) = event_queue.recv() => {
                        let evt = e.clone();
                        dispatch_event!(events, &evt);
                        dispatch_event_async!(events_async, &e);
                    }
                    Ok(log) = log_queue.recv() => {
                        let l = log.clone();
                        dispatch_event!(logs, &l);
                        dispatch_event_async!(logs_async, &log);
                    }
                }
            }
        });
    }

    pub(crate) fn shutdown(&self) {
        self.shutdown.read().unwrap().cancel();
    }
}

/// Handler registration scoped to the node ids matching a glob.
#[derive(Clone)]
pub struct ChannelEvent {
    channel: Arc<Channel>,

    glob: globset::GlobMatcher,
}

impl ChannelEvent {
    pub fn channel(
        channel: Arc<Channel>,
        options: ChannelOptions,
    ) -> Result<Self> {
        let glob = globset::Glob::new(&options.nid).map_err(|e| CueflowError::Config(format!("invalid node id pattern '{}': {}", options.nid, e)))?;

        Ok(Self {
            channel,
            glob: glob.compile_matcher(),
        })
    }

    /// Called with the node id and result each time a node finishes a run.
    pub fn on_finished(
        &self,
        f: impl Fn(&str, LastResult) + Send + Sync + 'static,
    ) {
        let glob = self.glob.clone();

        self.channel.events.write().unwrap().push(Arc::new(move |e| {
            if let NodeEvent::Finished {
                result,
                ..
            } = e.event
            {
                if glob.is_match(&e.nid) {
                    f(&e.nid, result);
                }
            }
        }));
    }

    /// Called when initialization leaves a node broken or sick.
    pub fn on_health(
        &self,
        f: impl Fn(&Event<Message>) + Send + Sync + 'static,
    ) {
        let glob = self.glob.clone();

        self.channel.events.write().unwrap().push(Arc::new(move |e| {
            if e.event.is_health() && glob.is_match(&e.nid) {
                f(e);
            }
        }));
    }

    pub fn on_event(
        &self,
        f: impl Fn(&Event<Message>) + Send + Sync + 'static,
    ) {
        let glob = self.glob.clone();

        self.channel.events.write().unwrap().push(Arc::new(move |e| {
            if glob.is_match(&e.nid) {
                f(e);
            }
        }));
    }

    pub fn on_log(
        &self,
        f: impl Fn(&Event<Log>) + Send + Sync + 'static,
    ) {
        let glob = self.glob.clone();

        self.channel.logs.write().unwrap().push(Arc::new(move |e| {
            if glob.is_match(&e.nid) {
                f(e);
            }
        }));
    }

    pub fn on_event_async<F>(
        &self,
        f: F,
    ) where
        F: Fn(&Event<Message>) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        let glob = self.glob.clone();

        self.channel.events_async.write().unwrap().push(Arc::new(move |e| {
            if glob.is_match(&e.nid) { f(e) } else { Box::pin(async {}) }
        }));
    }

    pub fn on_log_async<F>(
        &self,
        f: F,
    ) where
        F: Fn(&Event<Log>) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        let glob = self.glob.clone();

        self.channel.logs_async.write().unwrap().push(Arc::new(move |e| {
            if glob.is_match(&e.nid) { f(e) } else { Box::pin(async {}) }
        }));
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use super::*;

    fn message(
        nid: &str,
        event: NodeEvent,
    ) -> Event<Message> {
        Event::new(&Message {
            nid: nid.to_string(),
            name: nid.to_string(),
            event,
        })
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn handlers_only_see_matching_nodes() {
        let channel = Arc::new(Channel::new(Handle::current()));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        ChannelEvent::channel(channel.clone(), ChannelOptions::with_nid("intro*")).unwrap().on_finished(move |nid, result| {
            sink.lock().unwrap().push((nid.to_string(), result));
        });
        channel.listen();

        let finished = NodeEvent::Finished {
            result: LastResult::Success,
            elapsed: 0,
        };
        channel.event_queue().send(message("intro-1", finished.clone())).unwrap();
        channel.event_queue().send(message("outro-1", finished)).unwrap();
        channel.event_queue().send(message("intro-2", NodeEvent::Working(0))).unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        channel.shutdown();

        assert_eq!(*seen.lock().unwrap(), vec![("intro-1".to_string(), LastResult::Success)]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn health_and_log_handlers() {
        let channel = Arc::new(Channel::new(Handle::current()));
        let health = Arc::new(Mutex::new(Vec::new()));
        let logs = Arc::new(Mutex::new(Vec::new()));

        let events = ChannelEvent::channel(channel.clone(), ChannelOptions::default()).unwrap();
        let sink = health.clone();
        events.on_health(move |e| sink.lock().unwrap().push(e.event.str().to_string()));
        let sink = logs.clone();
        events.on_log(move |l| sink.lock().unwrap().push(l.content.clone()));
        channel.listen();

        channel.event_queue().send(message("a", NodeEvent::Broken("missing image".to_string()))).unwrap();
        channel.event_queue().send(message("a", NodeEvent::Working(1))).unwrap();
        channel
            .log_queue()
            .send(Event::new(&Log {
                nid: "a".to_string(),
                content: "scene switched".to_string(),
                timestamp: 0,
            }))
            .unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        channel.shutdown();

        assert_eq!(*health.lock().unwrap(), vec!["Broken".to_string()]);
        assert_eq!(*logs.lock().unwrap(), vec!["scene switched".to_string()]);
    }

    #[test]
    fn invalid_glob_is_a_config_error() {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let channel = Arc::new(Channel::new(rt.handle().clone()));
        let err = ChannelEvent::channel(channel, ChannelOptions::with_nid("[")).err().unwrap();
        assert!(matches!(err, CueflowError::Config(_)));
    }
}
