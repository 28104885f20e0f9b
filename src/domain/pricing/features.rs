use serde::{Deserialize, Serialize};

/// Ordered list of feature names.
/// This order MUST match the order the persisted model and its
/// normalization vectors were trained with.
pub const FEATURE_NAMES: &[&str] = &["distance", "base_rate"];

/// Model input in `FEATURE_NAMES` order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Maps a validated request onto the model's input space.
pub trait FeatureExtractor: Send + Sync {
    fn extract(&self, distance: f64, base_rate: f64) -> FeatureVector;

    /// Names of the produced features, in order.
    fn feature_names(&self) -> &[&'static str] {
        FEATURE_NAMES
    }
}

/// The production extractor: the two raw inputs, unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawFeatureExtractor;

impl FeatureExtractor for RawFeatureExtractor {
    fn extract(&self, distance: f64, base_rate: f64) -> FeatureVector {
        FeatureVector(vec![distance, base_rate])
    }
}
