use crate::domain::errors::BackendError;
use crate::domain::pricing::{FeatureVector, ModelMetadata};

/// Interface for trained price models
pub trait PriceModel: Send + Sync {
    /// Predict the raw price (currency units) for one feature vector
    fn infer(&self, features: &FeatureVector) -> Result<f64, BackendError>;

    /// Bring the model up (load or train). Idempotent; returns availability.
    fn initialize(&self) -> bool {
        self.is_available()
    }

    /// Whether inference can currently succeed
    fn is_available(&self) -> bool;

    /// Get model name/type
    fn name(&self) -> &str;

    /// Get model version/id
    fn version(&self) -> &str;

    /// Training metadata, once the model is loaded
    fn metadata(&self) -> Option<&ModelMetadata> {
        None
    }
}

/// A model that is never available. The engine then quotes rule-only.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleOnlyModel;

impl PriceModel for RuleOnlyModel {
    fn infer(&self, _features: &FeatureVector) -> Result<f64, BackendError> {
        Err(BackendError::Unavailable {
            reason: "rule-only pricing configured".to_string(),
        })
    }

    fn is_available(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "Rule-only"
    }

    fn version(&self) -> &str {
        "n/a"
    }
}
