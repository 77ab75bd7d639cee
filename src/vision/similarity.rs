use crate::{
    Result,
    vision::{Image, Match, PatternMatcher, Rect},
};

/// Brute-force template matcher.
///
/// Slides the pattern over every position of the image and scores each one as
/// `1 - mean_abs_diff / 255`. The best position wins; earlier positions (row
/// major) win ties.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimilarityMatcher;

impl SimilarityMatcher {
    fn score_at(
        image: &Image,
        pattern: &Image,
        ox: u32,
        oy: u32,
    ) -> f64 {
        let mut diff: u64 = 0;
        for y in 0..pattern.height() {
            for x in 0..pattern.width() {
                diff += image.pixel(ox + x, oy + y).abs_diff(pattern.pixel(x, y)) as u64;
            }
        }
        let count = pattern.width() as u64 * pattern.height() as u64;
        1.0 - diff as f64 / (count as f64 * 255.0)
    }
}

impl PatternMatcher for SimilarityMatcher {
    fn find_match(
        &self,
        image: &Image,
        pattern: &Image,
        min_similarity: f64,
    ) -> Result<Option<Match>> {
        if pattern.width() == 0 || pattern.height() == 0 || pattern.width() > image.width() || pattern.height() > image.height() {
            return Ok(None);
        }

        let mut best: Option<Match> = None;
        'search: for oy in 0..=image.height() - pattern.height() {
            for ox in 0..=image.width() - pattern.width() {
                let score = Self::score_at(image, pattern, ox, oy);
                if best.is_none_or(|b| score > b.score) {
                    best = Some(Match {
                        score,
                        bounds: Rect::new(ox as i32, oy as i32, pattern.width(), pattern.height()),
                    });
                    if score >= 1.0 {
                        break 'search;
                    }
                }
            }
        }

        Ok(best.filter(|m| m.score >= min_similarity))
    }
}
