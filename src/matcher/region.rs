//! Multi-target search over one screen capture.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    CueflowError, Result,
    matcher::MatcherPool,
    vision::{Image, Match, PatternMatcher},
};

/// How a winner is chosen among several targets.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MatchPolicy {
    /// Earliest declared target with a hit, searched one by one.
    #[default]
    FindFirst,
    /// Highest scoring target, searched in parallel; earliest wins ties.
    FindBest,
}

/// A pattern image bound to its minimum similarity.
#[derive(Debug, Clone)]
pub struct BoundPattern {
    pub image: Arc<Image>,
    pub min_similarity: f64,
}

/// Searches an ordered list of patterns against a capture.
///
/// Holds no state between calls; the pool and the matcher primitive are
/// shared with the rest of the engine.
pub struct RegionMatcher {
    pool: Arc<MatcherPool>,
    matcher: Arc<dyn PatternMatcher>,
    patterns: Vec<BoundPattern>,
}

impl RegionMatcher {
    pub fn new(
        pool: Arc<MatcherPool>,
        matcher: Arc<dyn PatternMatcher>,
        patterns: Vec<BoundPattern>,
    ) -> Self {
        Self {
            pool,
            matcher,
            patterns,
        }
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Index of the winning pattern under `policy`, `None` when nothing matched.
    ///
    /// Matcher failures are reported as "nothing matched".
    pub async fn find(
        &self,
        capture: Arc<Image>,
        policy: MatchPolicy,
    ) -> Option<usize> {
        match policy {
            MatchPolicy::FindFirst => self.find_first(capture).await,
            MatchPolicy::FindBest => self.find_best(capture).await,
        }
    }

    /// Sequential scan. Stops at the first pattern with a hit; later patterns
    /// are never searched. A pattern whose search fails counts as a miss.
    pub async fn find_first(
        &self,
        capture: Arc<Image>,
    ) -> Option<usize> {
        for (index, pattern) in self.patterns.iter().enumerate() {
            match collect(self.submit(capture.clone(), pattern)).await {
                Ok(Some(hit)) => {
                    debug!(index, score = hit.score, "first match");
                    return Some(index);
                }
                Ok(None) => {}
                Err(e) => warn!(index, error = %e, "pattern search failed, treating as no match"),
            }
        }
        None
    }

    /// Parallel search, one pool task per pattern.
    ///
    /// Results are read back in submission order and compared with a strict
    /// `>`, so equal scores go to the lowest index. Any failed task voids the
    /// whole call.
    pub async fn find_best(
        &self,
        capture: Arc<Image>,
    ) -> Option<usize> {
        let pending: Vec<_> = self.patterns.iter().map(|pattern| self.submit(capture.clone(), pattern)).collect();

        let mut best: Option<(usize, f64)> = None;
        for (index, rx) in pending.into_iter().enumerate() {
            match collect(rx).await {
                Ok(Some(hit)) => {
                    if best.is_none_or(|(_, score)| hit.score > score) {
                        best = Some((index, hit.score));
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(index, error = %e, "pattern search failed, discarding all results");
                    return None;
                }
            }
        }

        if let Some((index, score)) = best {
            debug!(index, score, "best match");
        }
        best.map(|(index, _)| index)
    }

    fn submit(
        &self,
        capture: Arc<Image>,
        pattern: &BoundPattern,
    ) -> tokio::sync::oneshot::Receiver<Result<Option<Match>>> {
        let matcher = self.matcher.clone();
        let pattern = pattern.clone();
        self.pool.submit(move || matcher.find_match(&capture, &pattern.image, pattern.min_similarity))
    }
}

async fn collect(rx: tokio::sync::oneshot::Receiver<Result<Option<Match>>>) -> Result<Option<Match>> {
    rx.await.unwrap_or_else(|_| Err(CueflowError::Matcher("pattern search was interrupted".to_string())))
}
