pub mod features;
pub mod model;
pub mod travel_cost;
pub mod types;

pub use features::{FEATURE_NAMES, FeatureExtractor, FeatureVector, RawFeatureExtractor};
pub use model::{
    BoundViolation, FitStatistics, ModelMetadata, NormalizationParams, RangeWarning, TrainedBounds,
};
pub use travel_cost::{expected_price, travel_cost};
pub use types::{
    ClampedInputs, Confidence, PredictionMethod, PredictionRequest, PredictionResult,
    PriceBreakdown, PriceEstimate,
};
