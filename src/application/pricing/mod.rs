pub mod ensemble;
pub mod prediction_cache;
pub mod quote_service;

pub use ensemble::EnsemblePredictor;
pub use prediction_cache::{CacheStats, PredictionCache};
pub use quote_service::{
    BatchEntry, BatchItem, BatchResponse, BatchSummary, MAX_BATCH_SIZE, ModelInfo,
    PriceEstimationService, ProviderCandidate, RankedProvider,
};
