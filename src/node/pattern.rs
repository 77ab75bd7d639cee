//! Image pattern parameters shared by region targets and region checkers.

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    matcher::BoundPattern,
    node::Element,
    runtime::Context,
    vision::{Image, Rect},
};

/// Capture `region` off the async workers. `None` when no frame could be
/// taken.
pub(crate) async fn capture(
    ctx: &Context,
    region: Rect,
) -> Option<Arc<Image>> {
    let screen = ctx.screen();
    match tokio::task::spawn_blocking(move || screen.capture(region)).await {
        Ok(Ok(image)) => Some(Arc::new(image)),
        Ok(Err(e)) => {
            warn!(error = %e, ?region, "screen capture failed");
            None
        }
        Err(e) => {
            warn!(error = %e, ?region, "screen capture task failed");
            None
        }
    }
}

/// Where a pattern image comes from and how close a hit has to be.
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct PatternSource {
    pub image_path: String,
    /// minimum similarity in `[0, 1]`, the engine default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
    /// image used when `image_path` cannot be loaded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_path: Option<String>,

    #[serde(skip)]
    bound: RwLock<Option<BoundPattern>>,
}

impl PatternSource {
    pub fn new(image_path: impl Into<String>) -> Self {
        Self {
            image_path: image_path.into(),
            ..Default::default()
        }
    }

    pub fn with_similarity(
        mut self,
        similarity: f64,
    ) -> Self {
        self.similarity = Some(similarity);
        self
    }

    pub fn with_fallback(
        mut self,
        path: impl Into<String>,
    ) -> Self {
        self.fallback_path = Some(path.into());
        self
    }

    /// Pattern loaded by the last successful `bind`.
    pub fn bound(&self) -> Option<BoundPattern> {
        self.bound.read().unwrap().clone()
    }

    /// Load the image, check it against `region` and keep it for matching.
    ///
    /// Problems are reported on `owner`.
    pub(crate) fn bind(
        &self,
        owner: &dyn Element,
        region: Rect,
        ctx: &Context,
    ) {
        *self.bound.write().unwrap() = None;

        let min_similarity = self.similarity.unwrap_or(ctx.default_similarity());
        if !(0.0..=1.0).contains(&min_similarity) {
            owner.mark_broken(format!("similarity {} is outside [0, 1]", min_similarity));
            return;
        }
        if self.image_path.is_empty() {
            owner.mark_broken("image path is empty".to_string());
            return;
        }

        let Some(image) = self.load(owner, ctx) else {
            return;
        };
        if !region.fits(image.width(), image.height()) {
            owner.mark_broken(format!(
                "image '{}' ({}x{}) does not fit in region {}x{}",
                self.image_path,
                image.width(),
                image.height(),
                region.width,
                region.height
            ));
            return;
        }

        *self.bound.write().unwrap() = Some(BoundPattern {
            image,
            min_similarity,
        });
    }

    fn load(
        &self,
        owner: &dyn Element,
        ctx: &Context,
    ) -> Option<Arc<Image>> {
        let images = ctx.images();
        match (images.load(&self.image_path), &self.fallback_path) {
            (Ok(image), Some(fallback)) => {
                owner.mark_sick(format!("fallback image '{}' is no longer needed", fallback));
                Some(image)
            }
            (Ok(image), None) => Some(image),
            (Err(_), Some(fallback)) => match images.load(fallback) {
                Ok(image) => Some(image),
                Err(_) => {
                    owner.mark_broken(format!("neither image '{}' nor fallback '{}' exists", self.image_path, fallback));
                    None
                }
            },
            (Err(_), None) => {
                owner.mark_broken(format!("image '{}' does not exist", self.image_path));
                None
            }
        }
    }
}
