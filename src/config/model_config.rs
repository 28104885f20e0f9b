//! Model configuration parsing from environment variables.
//!
//! Where the trained model lives, how it is trained and when it is brought up.

use super::{Lookup, parse_var};
use anyhow::Result;
use std::path::PathBuf;

pub const DEFAULT_MODEL_DIR: &str = "data/ml/price_model";
pub const DEFAULT_TRAINING_SEED: u64 = 42;

/// Model environment configuration
#[derive(Debug, Clone)]
pub struct ModelEnvConfig {
    pub model_dir: PathBuf,
    pub seed: u64,
    /// Load or train at construction instead of on the first quote
    pub eager_init: bool,
    pub force_retrain: bool,
    /// Average model and rule price (`false` quotes the banded model output alone)
    pub use_ensemble: bool,
}

impl Default for ModelEnvConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from(DEFAULT_MODEL_DIR),
            seed: DEFAULT_TRAINING_SEED,
            eager_init: false,
            force_retrain: false,
            use_ensemble: true,
        }
    }
}

impl ModelEnvConfig {
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            model_dir: lookup("PRICE_MODEL_DIR")
                .filter(|dir| !dir.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.model_dir),
            seed: parse_var(lookup, "PRICE_MODEL_SEED", defaults.seed)?,
            eager_init: parse_var(lookup, "PRICE_MODEL_EAGER_INIT", defaults.eager_init)?,
            force_retrain: parse_var(lookup, "PRICE_MODEL_FORCE_RETRAIN", defaults.force_retrain)?,
            use_ensemble: parse_var(lookup, "PRICE_USE_ENSEMBLE", defaults.use_ensemble)?,
        })
    }
}
