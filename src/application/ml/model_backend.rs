use super::predictor::PriceModel;
use super::training::{self, MODEL_VERSION, PriceRegressor, TrainedModel, TrainingConfig};
use crate::domain::errors::BackendError;
use crate::domain::pricing::{FEATURE_NAMES, FeatureVector, ModelMetadata, TrainedBounds};
use crate::infrastructure::persistence::ModelStore;
use std::sync::OnceLock;
use tracing::{error, info, warn};

/// Owns the trained regression model.
///
/// The model is loaded from the store, or trained and persisted when no usable
/// artifact exists. This happens at most once per backend: concurrent first
/// callers wait on the same initialization and later calls only read.
pub struct ModelBackend {
    store: ModelStore,
    training: TrainingConfig,
    force_retrain: bool,
    state: OnceLock<Option<TrainedModel>>,
}

impl ModelBackend {
    pub fn new(store: ModelStore, training: TrainingConfig) -> Self {
        Self {
            store,
            training,
            force_retrain: false,
            state: OnceLock::new(),
        }
    }

    /// Skip loading and always train (and persist) a fresh model.
    pub fn with_force_retrain(mut self, force_retrain: bool) -> Self {
        self.force_retrain = force_retrain;
        self
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    pub fn is_initialized(&self) -> bool {
        self.state.get().is_some()
    }

    /// Bounds recorded with the model, or the configured training bounds before initialization.
    pub fn trained_bounds(&self) -> TrainedBounds {
        self.metadata()
            .map(|m| m.model_config)
            .unwrap_or(self.training.bounds)
    }

    fn model(&self) -> Option<&TrainedModel> {
        self.state.get_or_init(|| self.load_or_train()).as_ref()
    }

    fn load_or_train(&self) -> Option<TrainedModel> {
        if self.force_retrain {
            info!("Forced retrain requested; ignoring persisted model");
        } else {
            match self.load() {
                Ok(Some(model)) => return Some(model),
                Ok(None) => info!(
                    "No persisted price model in {:?}. Training a new one.",
                    self.store.model_dir()
                ),
                Err(e) => warn!("Persisted price model unusable ({:#}). Retraining.", e),
            }
        }

        match training::train(&self.training) {
            Ok(model) => {
                if let Err(e) = self.store.save(model.regressor(), model.metadata()) {
                    error!(
                        "Failed to persist trained model: {:#}. Using in-memory model.",
                        e
                    );
                }
                Some(model)
            }
            Err(e) => {
                error!("{}. Pricing falls back to rules.", e);
                None
            }
        }
    }

    fn load(&self) -> anyhow::Result<Option<TrainedModel>> {
        let Some((regressor, metadata)) = self.store.load::<PriceRegressor>()? else {
            return Ok(None);
        };

        let norm = &metadata.norm_params;
        if !norm.is_consistent() || norm.feature_count() != FEATURE_NAMES.len() {
            anyhow::bail!(
                "normalization parameters do not describe {} features",
                FEATURE_NAMES.len()
            );
        }

        Ok(Some(TrainedModel::from_parts(regressor, metadata)))
    }
}

impl PriceModel for ModelBackend {
    fn infer(&self, features: &FeatureVector) -> Result<f64, BackendError> {
        self.model()
            .ok_or_else(|| BackendError::Unavailable {
                reason: "no trained model".to_string(),
            })?
            .predict(features)
    }

    fn initialize(&self) -> bool {
        self.model().is_some()
    }

    fn is_available(&self) -> bool {
        self.model().is_some()
    }

    fn name(&self) -> &str {
        "SmartCore Linear Regression"
    }

    fn version(&self) -> &str {
        self.metadata()
            .map(|m| m.version.as_str())
            .unwrap_or(MODEL_VERSION)
    }

    /// Does not trigger initialization.
    fn metadata(&self) -> Option<&ModelMetadata> {
        self.state
            .get()
            .and_then(|m| m.as_ref())
            .map(|m| m.metadata())
    }
}
