//! Fixed-size pool of matcher threads.
//!
//! Pattern searches are CPU-bound and not cooperative, so they run on plain
//! OS threads fed from a shared work queue. The pool lives as long as the
//! engine context and is reused by every region matcher.

use std::{
    panic::AssertUnwindSafe,
    sync::Arc,
    thread::{self, JoinHandle},
};

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::{CueflowError, Result, common::Queue};

type Job = Box<dyn FnOnce() + Send + 'static>;

enum Task {
    Run(Job),
    Stop,
}

pub struct MatcherPool {
    queue: Arc<Queue<Task>>,
    workers: Vec<JoinHandle<()>>,
}

impl MatcherPool {
    /// Start `size` worker threads (at least one).
    pub fn new(size: usize) -> Result<Self> {
        let queue = Queue::new();
        let workers = (0..size.max(1))
            .map(|index| {
                let queue = queue.clone();
                thread::Builder::new()
                    .name(format!("cueflow-matcher-{}", index))
                    .spawn(move || {
                        while let Some(Task::Run(job)) = queue.next() {
                            job();
                        }
                        debug!(worker = index, "matcher worker stopped");
                    })
            })
            .collect::<std::io::Result<Vec<_>>>()?;

        Ok(Self {
            queue,
            workers,
        })
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Queue `f` on the pool.
    ///
    /// The receiver yields the job's result; a panicking job yields a
    /// `Matcher` error instead of taking the worker down.
    pub fn submit<T, F>(
        &self,
        f: F,
    ) -> oneshot::Receiver<Result<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::new(move || {
            let result = std::panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|_| Err(CueflowError::Matcher("matcher task panicked".to_string())));
            let _ = tx.send(result);
        });

        if let Err(e) = self.queue.send(Task::Run(job)) {
            // the dropped sender makes the receiver report an interruption
            warn!(error = %e, "matcher pool rejected a task");
        }
        rx
    }
}

impl Drop for MatcherPool {
    fn drop(&mut self) {
        for _ in &self.workers {
            let _ = self.queue.send(Task::Stop);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashSet,
        sync::{Arc, Barrier},
    };

    use super::*;

    #[tokio::test]
    async fn runs_jobs_and_returns_results() {
        let pool = MatcherPool::new(2).unwrap();
        assert_eq!(pool.size(), 2);

        let rx = pool.submit(|| Ok(21 * 2));
        assert_eq!(rx.await.unwrap().unwrap(), 42);
    }

    #[tokio::test]
    async fn jobs_run_in_parallel_on_distinct_threads() {
        let pool = MatcherPool::new(3).unwrap();
        let barrier = Arc::new(Barrier::new(3));

        // every job waits for the other two, so this only finishes when all
        // three run at the same time
        let receivers: Vec<_> = (0..3)
            .map(|_| {
                let barrier = barrier.clone();
                pool.submit(move || {
                    barrier.wait();
                    Ok(thread::current().name().unwrap_or_default().to_string())
                })
            })
            .collect();

        let mut names = HashSet::new();
        for rx in receivers {
            names.insert(rx.await.unwrap().unwrap());
        }
        assert_eq!(names.len(), 3);
    }

    #[tokio::test]
    async fn panicking_job_becomes_an_error() {
        let pool = MatcherPool::new(1).unwrap();

        let rx = pool.submit::<(), _>(|| panic!("matcher crashed"));
        assert!(matches!(rx.await.unwrap(), Err(CueflowError::Matcher(_))));

        // the worker survived
        let rx = pool.submit(|| Ok(1));
        assert_eq!(rx.await.unwrap().unwrap(), 1);
    }

    #[tokio::test]
    async fn errors_are_passed_through() {
        let pool = MatcherPool::new(1).unwrap();
        let rx = pool.submit::<(), _>(|| Err(CueflowError::Vision("capture lost".to_string())));
        assert_eq!(rx.await.unwrap().unwrap_err(), CueflowError::Vision("capture lost".to_string()));
    }
}
