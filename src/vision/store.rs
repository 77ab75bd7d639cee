use std::sync::Arc;

use crate::{
    CueflowError, Result,
    common::MemCache,
    vision::{Image, ImageStore},
};

/// Image store holding pattern images registered under their path.
#[derive(Clone)]
pub struct MemImageStore {
    images: MemCache<String, Arc<Image>>,
}

impl Default for MemImageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemImageStore {
    pub fn new() -> Self {
        Self {
            images: MemCache::new(),
        }
    }

    /// Register (or replace) the image behind `path`.
    pub fn insert(
        &self,
        path: impl Into<String>,
        image: Image,
    ) {
        self.images.set(path.into(), Arc::new(image));
    }

    pub fn remove(
        &self,
        path: &str,
    ) {
        self.images.remove(&path.to_string());
    }

    pub fn contains(
        &self,
        path: &str,
    ) -> bool {
        self.images.contains(&path.to_string())
    }
}

impl ImageStore for MemImageStore {
    fn load(
        &self,
        path: &str,
    ) -> Result<Arc<Image>> {
        self.images.get(&path.to_string()).ok_or_else(|| CueflowError::Vision(format!("image '{}' does not exist", path)))
    }
}
