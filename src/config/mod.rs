//! Configuration module for the pricing engine.
//!
//! This module provides structured configuration loading from environment variables,
//! organized by concern: Model, Cache, and Observability.

mod cache_config;
mod model_config;
mod observability_config;

pub use cache_config::CacheEnvConfig;
pub use model_config::{DEFAULT_MODEL_DIR, DEFAULT_TRAINING_SEED, ModelEnvConfig};
pub use observability_config::ObservabilityEnvConfig;

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Resolves a variable name to its raw value.
pub(crate) type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Parses `key` when set, `default` otherwise. A set but invalid value is an error.
pub(crate) fn parse_var<T>(lookup: Lookup<'_>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Failed to parse {}={:?}", key, raw)),
        None => Ok(default),
    }
}

/// Main engine configuration.
///
/// Aggregates the per-concern configs into flat fields.
#[derive(Debug, Clone)]
pub struct Config {
    // Model (from ModelEnvConfig)
    pub model_dir: PathBuf,
    pub training_seed: u64,
    pub eager_init: bool,
    pub force_retrain: bool,
    pub use_ensemble: bool,

    // Cache (from CacheEnvConfig)
    pub cache_capacity: usize,

    // Observability (from ObservabilityEnvConfig)
    pub metrics_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::compose(
            ModelEnvConfig::default(),
            CacheEnvConfig::default(),
            ObservabilityEnvConfig::default(),
        )
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_source(|key| env::var(key).ok())
    }

    /// Load configuration from any key/value source.
    pub fn from_source<F>(source: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup: Lookup<'_> = &source;
        let model = ModelEnvConfig::from_lookup(lookup).context("Failed to load model config")?;
        let cache = CacheEnvConfig::from_lookup(lookup).context("Failed to load cache config")?;
        let observability = ObservabilityEnvConfig::from_lookup(lookup);

        Ok(Self::compose(model, cache, observability))
    }

    fn compose(
        model: ModelEnvConfig,
        cache: CacheEnvConfig,
        observability: ObservabilityEnvConfig,
    ) -> Self {
        Self {
            model_dir: model.model_dir,
            training_seed: model.seed,
            eager_init: model.eager_init,
            force_retrain: model.force_retrain,
            use_ensemble: model.use_ensemble,
            cache_capacity: cache.capacity,
            metrics_enabled: observability.metrics_enabled,
        }
    }
}
