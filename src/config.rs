use std::{fs, path::Path};

use serde::Deserialize;

use crate::{CueflowError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// number of async worker threads, range [1, 32768), defaults to 16
    #[serde(default = "default_async_worker_thread_number")]
    pub async_worker_thread_number: u16,
    /// region matcher config
    #[serde(default)]
    pub matcher: MatcherConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatcherConfig {
    /// number of matcher pool threads, defaults to 4
    #[serde(default = "default_matcher_worker_threads")]
    pub worker_threads: usize,
    /// similarity applied to targets that do not declare one, range [0, 1]
    #[serde(default = "default_similarity")]
    pub default_similarity: f64,
}

fn default_async_worker_thread_number() -> u16 {
    16
}

fn default_matcher_worker_threads() -> usize {
    4
}

fn default_similarity() -> f64 {
    0.9
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            worker_threads: default_matcher_worker_threads(),
            default_similarity: default_similarity(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            async_worker_thread_number: default_async_worker_thread_number(),
            matcher: MatcherConfig::default(),
        }
    }
}

impl Config {
    pub fn create<T: AsRef<Path>>(path: T) -> Result<Self> {
        let data = fs::read_to_string(path.as_ref()).map_err(|e| CueflowError::Config(format!("failed to load config file {:?}: {}", path.as_ref(), e)))?;

        Self::load_from_str(data.as_str())
    }

    pub fn load_from_str(toml_str: &str) -> Result<Self> {
        let config = toml::from_str::<Config>(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.async_worker_thread_number == 0 {
            return Err(CueflowError::Config("async_worker_thread_number must be at least 1".to_string()));
        }
        if self.matcher.worker_threads == 0 {
            return Err(CueflowError::Config("matcher.worker_threads must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.matcher.default_similarity) {
            return Err(CueflowError::Config(format!(
                "matcher.default_similarity must be within [0, 1], got {}",
                self.matcher.default_similarity
            )));
        }
        Ok(())
    }
}
