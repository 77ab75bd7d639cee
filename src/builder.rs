use std::sync::Arc;

use tokio::runtime::{Builder, Runtime};

use crate::{
    Config, CueflowError, Engine, Result,
    runtime::Collaborators,
    vision::{ImageStore, MemImageStore, PatternMatcher, ScreenCapture, SimilarityMatcher},
};

pub struct EngineBuilder {
    config: Config,
    rt: Option<Arc<Runtime>>,

    screen: Option<Arc<dyn ScreenCapture>>,
    matcher: Option<Arc<dyn PatternMatcher>>,
    images: Option<Arc<dyn ImageStore>>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            config: Config::default(),
            rt: None,
            screen: None,
            matcher: None,
            images: None,
        }
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(
        mut self,
        config: Config,
    ) -> Self {
        self.config = config;
        self
    }

    pub fn async_worker_thread_number(
        mut self,
        n: u16,
    ) -> Self {
        self.config.async_worker_thread_number = n;
        self
    }

    pub fn matcher_worker_threads(
        mut self,
        n: usize,
    ) -> Self {
        self.config.matcher.worker_threads = n;
        self
    }

    pub fn default_similarity(
        mut self,
        similarity: f64,
    ) -> Self {
        self.config.matcher.default_similarity = similarity;
        self
    }

    pub fn runtime(
        mut self,
        runtime: Arc<Runtime>,
    ) -> Self {
        self.rt = Some(runtime);
        self
    }

    /// Screen capture provider. Required.
    pub fn screen(
        mut self,
        screen: Arc<dyn ScreenCapture>,
    ) -> Self {
        self.screen = Some(screen);
        self
    }

    /// Pattern matcher primitive, [`SimilarityMatcher`] when not set.
    pub fn matcher(
        mut self,
        matcher: Arc<dyn PatternMatcher>,
    ) -> Self {
        self.matcher = Some(matcher);
        self
    }

    /// Source of pattern images, an empty [`MemImageStore`] when not set.
    pub fn images(
        mut self,
        images: Arc<dyn ImageStore>,
    ) -> Self {
        self.images = Some(images);
        self
    }

    pub fn build(&self) -> Result<Engine> {
        self.config.validate()?;

        let screen = self.screen.clone().ok_or_else(|| CueflowError::Engine("a screen capture provider is required".to_string()))?;
        let collaborators = Collaborators {
            screen,
            matcher: self.matcher.clone().unwrap_or_else(|| Arc::new(SimilarityMatcher)),
            images: self.images.clone().unwrap_or_else(|| Arc::new(MemImageStore::new())),
        };

        let runtime = match &self.rt {
            Some(rt) => rt.clone(),
            None => Arc::new(Builder::new_multi_thread().worker_threads(self.config.async_worker_thread_number.into()).enable_all().build()?),
        };

        Engine::new(runtime, collaborators, &self.config)
    }
}
