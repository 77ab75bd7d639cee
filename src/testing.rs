//! Scripted collaborators and context builders shared by the unit tests.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::runtime::Handle;

use crate::{
    CueflowError, MatcherConfig, Result,
    runtime::{Collaborators, Context},
    vision::{Image, ImageStore, Match, MemImageStore, PatternMatcher, Rect, ScreenCapture, SimilarityMatcher, StaticScreen},
};

/// What the scripted matcher answers for one pattern.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Scripted {
    Hit(f64),
    /// hit after sleeping for the given milliseconds
    SlowHit(u64, f64),
    Miss,
    Fail,
    Panic,
}

/// Pattern matcher driven by a script keyed on the pattern's first pixel.
///
/// Unscripted patterns miss. Every call is recorded.
#[derive(Default)]
pub(crate) struct ScriptedMatcher {
    script: HashMap<u8, Scripted>,
    calls: Mutex<Vec<u8>>,
}

impl ScriptedMatcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with(
        mut self,
        key: u8,
        outcome: Scripted,
    ) -> Self {
        self.script.insert(key, outcome);
        self
    }

    /// Keys of the patterns searched so far, in call order.
    pub(crate) fn calls(&self) -> Vec<u8> {
        self.calls.lock().unwrap().clone()
    }
}

impl PatternMatcher for ScriptedMatcher {
    fn find_match(
        &self,
        _image: &Image,
        pattern: &Image,
        min_similarity: f64,
    ) -> Result<Option<Match>> {
        let key = pattern.pixel(0, 0);
        self.calls.lock().unwrap().push(key);

        let hit = |score: f64| {
            (score >= min_similarity).then(|| Match {
                score,
                bounds: Rect::new(0, 0, pattern.width(), pattern.height()),
            })
        };

        match self.script.get(&key).copied().unwrap_or(Scripted::Miss) {
            Scripted::Hit(score) => Ok(hit(score)),
            Scripted::SlowHit(delay, score) => {
                std::thread::sleep(Duration::from_millis(delay));
                Ok(hit(score))
            }
            Scripted::Miss => Ok(None),
            Scripted::Fail => Err(CueflowError::Matcher(format!("scripted failure for pattern {}", key))),
            Scripted::Panic => panic!("scripted panic for pattern {}", key),
        }
    }
}

/// Screen that never delivers a frame.
pub(crate) struct BlindScreen;

impl ScreenCapture for BlindScreen {
    fn capture(
        &self,
        _region: Rect,
    ) -> Result<Image> {
        Err(CueflowError::Vision("display is not available".to_string()))
    }
}

/// Uniform pattern whose pixels all carry `key`.
pub(crate) fn pattern(
    key: u8,
    width: u32,
    height: u32,
) -> Image {
    Image::filled(width, height, key)
}

/// Context on the current tokio runtime with a 200x200 black screen, the
/// similarity matcher and an empty image store.
pub(crate) fn context() -> Arc<Context> {
    context_with(Arc::new(SimilarityMatcher), Arc::new(MemImageStore::new()))
}

pub(crate) fn context_with(
    matcher: Arc<dyn PatternMatcher>,
    images: Arc<dyn ImageStore>,
) -> Arc<Context> {
    context_on(Arc::new(StaticScreen::new(Image::filled(200, 200, 0))), matcher, images)
}

pub(crate) fn context_on(
    screen: Arc<dyn ScreenCapture>,
    matcher: Arc<dyn PatternMatcher>,
    images: Arc<dyn ImageStore>,
) -> Arc<Context> {
    let collaborators = Collaborators {
        screen,
        matcher,
        images,
    };
    Arc::new(Context::new(Handle::current(), collaborators, &MatcherConfig::default()).unwrap())
}
