use std::sync::{Arc, RwLock};

use crate::{
    Result,
    vision::{Image, Rect, ScreenCapture},
};

/// Screen backed by a still frame.
///
/// Serves crops of the current frame; the frame can be swapped at any time,
/// which is how replays and tests drive the engine.
pub struct StaticScreen {
    frame: RwLock<Arc<Image>>,
}

impl StaticScreen {
    pub fn new(frame: Image) -> Self {
        Self {
            frame: RwLock::new(Arc::new(frame)),
        }
    }

    /// Replace the frame returned by later captures.
    pub fn show(
        &self,
        frame: Image,
    ) {
        *self.frame.write().unwrap() = Arc::new(frame);
    }
}

impl ScreenCapture for StaticScreen {
    fn capture(
        &self,
        region: Rect,
    ) -> Result<Image> {
        let frame = self.frame.read().unwrap().clone();
        frame.crop(region)
    }
}
