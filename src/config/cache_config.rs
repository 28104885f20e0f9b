use super::{Lookup, parse_var};
use crate::application::pricing::prediction_cache::DEFAULT_CACHE_CAPACITY;
use anyhow::{Result, ensure};

/// Prediction cache environment configuration
#[derive(Debug, Clone)]
pub struct CacheEnvConfig {
    pub capacity: usize,
}

impl Default for CacheEnvConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl CacheEnvConfig {
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let capacity = parse_var(lookup, "PREDICTION_CACHE_CAPACITY", DEFAULT_CACHE_CAPACITY)?;
        ensure!(capacity > 0, "PREDICTION_CACHE_CAPACITY must be at least 1");
        Ok(Self { capacity })
    }
}
