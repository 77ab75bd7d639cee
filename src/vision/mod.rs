//! Screen-side collaborators of the engine.
//!
//! The engine never grabs pixels or runs template matching itself; it talks to
//! a [`ScreenCapture`], a [`PatternMatcher`] and an [`ImageStore`]. Default
//! in-process implementations are provided for embedding and testing.

mod screen;
mod similarity;
mod store;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{CueflowError, Result};

pub use screen::StaticScreen;
pub use similarity::SimilarityMatcher;
pub use store::MemImageStore;

/// Screen rectangle in pixels.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether an image of the given size fits inside this rectangle.
    pub fn fits(
        &self,
        width: u32,
        height: u32,
    ) -> bool {
        width <= self.width && height <= self.height
    }
}

/// 8-bit grayscale image.
///
/// Pixel storage is shared, so cloning an image is cheap and captures can be
/// handed to several matcher tasks at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    width: u32,
    height: u32,
    pixels: Arc<[u8]>,
}

impl Image {
    /// Build an image from row-major pixels.
    pub fn new(
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    ) -> Result<Self> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(CueflowError::Vision(format!(
                "image of {}x{} needs {} pixels, got {}",
                width,
                height,
                expected,
                pixels.len()
            )));
        }

        Ok(Self {
            width,
            height,
            pixels: pixels.into(),
        })
    }

    /// Image where every pixel has the same value.
    pub fn filled(
        width: u32,
        height: u32,
        value: u8,
    ) -> Self {
        Self {
            width,
            height,
            pixels: vec![value; width as usize * height as usize].into(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(
        &self,
        x: u32,
        y: u32,
    ) -> u8 {
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    /// Copy out the part of the image covered by `rect`.
    pub fn crop(
        &self,
        rect: Rect,
    ) -> Result<Image> {
        if rect.x < 0 || rect.y < 0 {
            return Err(CueflowError::Vision(format!("crop origin ({}, {}) is outside the image", rect.x, rect.y)));
        }
        let (x, y) = (rect.x as u32, rect.y as u32);
        if x + rect.width > self.width || y + rect.height > self.height {
            return Err(CueflowError::Vision(format!(
                "crop {}x{} at ({}, {}) exceeds image of {}x{}",
                rect.width, rect.height, x, y, self.width, self.height
            )));
        }

        let mut pixels = Vec::with_capacity(rect.width as usize * rect.height as usize);
        for row in y..y + rect.height {
            let start = row as usize * self.width as usize + x as usize;
            pixels.extend_from_slice(&self.pixels[start..start + rect.width as usize]);
        }

        Image::new(rect.width, rect.height, pixels)
    }
}

/// A pattern hit inside a capture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    /// similarity in [0, 1]
    pub score: f64,
    /// where the pattern was found, relative to the capture
    pub bounds: Rect,
}

/// Grabs the pixels of a screen region.
pub trait ScreenCapture: Send + Sync {
    fn capture(
        &self,
        region: Rect,
    ) -> Result<Image>;
}

/// Single-pattern search primitive.
///
/// Implementations are called from matcher pool threads and may block.
pub trait PatternMatcher: Send + Sync {
    /// Returns the best hit of `pattern` in `image` scoring at least `min_similarity`.
    fn find_match(
        &self,
        image: &Image,
        pattern: &Image,
        min_similarity: f64,
    ) -> Result<Option<Match>>;
}

/// Resolves pattern image paths to pixels.
pub trait ImageStore: Send + Sync {
    fn load(
        &self,
        path: &str,
    ) -> Result<Arc<Image>>;
}
