use super::ensemble::EnsemblePredictor;
use super::prediction_cache::{CacheStats, DEFAULT_CACHE_CAPACITY, PredictionCache};
use crate::application::ml::{ModelBackend, PriceModel, TrainingConfig};
use crate::config::Config;
use crate::domain::errors::{InputError, InputRejection};
use crate::domain::pricing::{
    FitStatistics, PredictionRequest, PredictionResult, PriceBreakdown,
    PriceEstimate, TrainedBounds, travel_cost,
};
use crate::domain::validation::{ValidationGate, ValidationReport};
use crate::infrastructure::observability::EngineMetrics;
use crate::infrastructure::persistence::ModelStore;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Largest batch callers are expected to submit. Enforcing it is up to the caller.
pub const MAX_BATCH_SIZE: usize = 100;

/// One batch entry as received from a JSON body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItem {
    #[serde(default)]
    pub distance: Option<Value>,
    #[serde(default)]
    pub base_rate: Option<Value>,
}

impl BatchItem {
    pub fn new(distance: f64, base_rate: f64) -> Self {
        Self {
            distance: Some(Value::from(distance)),
            base_rate: Some(Value::from(base_rate)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEntry {
    pub success: bool,
    pub input: BatchItem,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PriceEstimate>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<InputError>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total_requests: usize,
    pub successful_predictions: usize,
    pub failed_predictions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    pub results: Vec<BatchEntry>,
    pub summary: BatchSummary,
}

/// A provider offering the job at `base_rate`, `distance_km` away from the customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCandidate {
    pub provider_id: String,
    pub distance_km: f64,
    pub base_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedProvider {
    pub provider_id: String,
    pub distance_km: f64,
    pub estimate: PriceEstimate,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InputRange {
    pub min: f64,
    pub max: f64,
    pub unit: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputRanges {
    pub distance: InputRange,
    pub base_rate: InputRange,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub model_version: String,
    pub backend: String,
    pub features: Vec<&'static str>,
    pub input_ranges: InputRanges,
    pub training_date: Option<DateTime<Utc>>,
    pub fit: Option<FitStatistics>,
    /// A trained model has been loaded or fitted
    pub model_loaded: bool,
    /// False after an inference fault switched quoting to rules
    pub model_enabled: bool,
    pub use_ensemble: bool,
}

/// Price Estimation Service
///
/// Entry point of the engine: validation, then the prediction cache, then the
/// ensemble predictor. Only invalid input fails a quote; model problems degrade
/// to the rule-based price.
pub struct PriceEstimationService {
    gate: ValidationGate,
    predictor: EnsemblePredictor,
    cache: PredictionCache,
    use_ensemble: bool,
    metrics: Option<EngineMetrics>,
}

impl PriceEstimationService {
    pub fn new(model: Arc<dyn PriceModel>, bounds: TrainedBounds) -> Self {
        Self::from_predictor(EnsemblePredictor::new(model, bounds))
    }

    pub fn from_predictor(predictor: EnsemblePredictor) -> Self {
        Self {
            gate: ValidationGate::new(*predictor.bounds()),
            predictor,
            cache: PredictionCache::new(DEFAULT_CACHE_CAPACITY),
            use_ensemble: true,
            metrics: None,
        }
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache = PredictionCache::new(capacity);
        self
    }

    pub fn with_ensemble(mut self, use_ensemble: bool) -> Self {
        self.use_ensemble = use_ensemble;
        self
    }

    pub fn with_metrics(mut self, metrics: EngineMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Builds the service around a persisted (or freshly trained) model.
    pub fn from_config(config: &Config) -> Result<Self> {
        let training = TrainingConfig {
            seed: config.training_seed,
            ..TrainingConfig::default()
        };
        let backend = Arc::new(
            ModelBackend::new(ModelStore::new(&config.model_dir), training)
                .with_force_retrain(config.force_retrain),
        );

        if config.eager_init {
            if backend.initialize() {
                info!("Price model ready ({} v{})", backend.name(), backend.version());
            } else {
                warn!("Price model unavailable. Quotes will use rule-based pricing.");
            }
        }

        let bounds = backend.trained_bounds();
        let mut service = Self::new(backend, bounds)
            .with_cache_capacity(config.cache_capacity)
            .with_ensemble(config.use_ensemble);

        if config.metrics_enabled {
            let metrics = EngineMetrics::new().context("Failed to register pricing metrics")?;
            service = service.with_metrics(metrics);
        }

        Ok(service)
    }

    /// Loads or trains the model now. Idempotent; returns model availability.
    pub fn initialize(&self) -> bool {
        self.predictor.model().initialize()
    }

    pub fn validate_inputs(&self, distance: f64, base_rate: f64) -> ValidationReport {
        self.gate.validate(distance, base_rate)
    }

    pub fn validate_raw(&self, distance: Option<&Value>, base_rate: Option<&Value>) -> ValidationReport {
        self.gate.validate_raw(distance, base_rate)
    }

    pub fn get_estimated_price(&self, distance: f64, base_rate: f64) -> Result<PriceEstimate, InputRejection> {
        let report = self.gate.validate(distance, base_rate);
        self.estimate_validated(report)
    }

    /// Like [`get_estimated_price`](Self::get_estimated_price) for untyped JSON values.
    pub fn estimate_raw(
        &self,
        distance: Option<&Value>,
        base_rate: Option<&Value>,
    ) -> Result<PriceEstimate, InputRejection> {
        let report = self.gate.validate_raw(distance, base_rate);
        self.estimate_validated(report)
    }

    fn estimate_validated(&self, report: ValidationReport) -> Result<PriceEstimate, InputRejection> {
        let _timer = self
            .metrics
            .as_ref()
            .map(|m| m.prediction_latency_seconds.start_timer());

        let (request, _) = report.into_result().inspect_err(|_| {
            if let Some(metrics) = &self.metrics {
                metrics.validation_rejections_total.inc();
            }
        })?;

        let result = self.predict(request);
        Ok(to_estimate(request, result))
    }

    /// Cached ensemble prediction for an already validated request.
    pub fn predict(&self, request: PredictionRequest) -> PredictionResult {
        let PredictionRequest {
            distance,
            base_rate,
        } = request;

        let (result, hit) = self.cache.get_or_compute(distance, base_rate, || {
            self.predictor.predict(distance, base_rate, self.use_ensemble)
        });

        if let Some(metrics) = &self.metrics {
            metrics.inc_cache_lookup(hit);
            metrics.set_cache_entries(self.cache.len());
            metrics.inc_predictions(result.method.as_str(), result.confidence.as_str());
            if !hit && !self.model_in_use() {
                metrics.backend_fallbacks_total.inc();
            }
        }

        result
    }

    fn model_in_use(&self) -> bool {
        self.predictor.model_enabled() && self.predictor.model().is_available()
    }

    /// Quotes items in order. A failing item never aborts the rest.
    pub fn estimate_batch(&self, items: &[BatchItem]) -> BatchResponse {
        if items.len() > MAX_BATCH_SIZE {
            warn!(
                "Batch of {} items exceeds the documented maximum of {}",
                items.len(),
                MAX_BATCH_SIZE
            );
        }

        let results: Vec<BatchEntry> = items
            .iter()
            .map(|item| {
                match self.estimate_raw(item.distance.as_ref(), item.base_rate.as_ref()) {
                    Ok(estimate) => BatchEntry {
                        success: true,
                        input: item.clone(),
                        output: Some(estimate),
                        errors: Vec::new(),
                    },
                    Err(rejection) => BatchEntry {
                        success: false,
                        input: item.clone(),
                        output: None,
                        errors: rejection.errors,
                    },
                }
            })
            .collect();

        let successful = results.iter().filter(|r| r.success).count();
        let summary = BatchSummary {
            total_requests: items.len(),
            successful_predictions: successful,
            failed_predictions: items.len() - successful,
        };

        info!(
            "Batch quoted: {}/{} successful",
            summary.successful_predictions, summary.total_requests
        );

        BatchResponse { results, summary }
    }

    /// Quotes every candidate and returns them cheapest first.
    /// Candidates with invalid inputs are skipped; ties keep their input order.
    pub fn rank_providers<I>(&self, candidates: I) -> Vec<RankedProvider>
    where
        I: IntoIterator<Item = ProviderCandidate>,
    {
        let mut ranked: Vec<RankedProvider> = candidates
            .into_iter()
            .filter_map(|candidate| {
                match self.get_estimated_price(candidate.distance_km, candidate.base_rate) {
                    Ok(estimate) => Some(RankedProvider {
                        provider_id: candidate.provider_id,
                        distance_km: candidate.distance_km,
                        estimate,
                    }),
                    Err(rejection) => {
                        warn!("Skipping provider {}: {}", candidate.provider_id, rejection);
                        None
                    }
                }
            })
            .collect();

        ranked.sort_by_key(|p| p.estimate.estimated_price);
        ranked
    }

    pub fn model_info(&self) -> ModelInfo {
        let model = self.predictor.model();
        let bounds = self.predictor.bounds();
        let metadata = model.metadata();

        ModelInfo {
            model_version: model.version().to_string(),
            backend: model.name().to_string(),
            features: self.predictor.extractor().feature_names().to_vec(),
            input_ranges: InputRanges {
                distance: InputRange {
                    min: bounds.min_distance,
                    max: bounds.max_distance,
                    unit: "km",
                },
                base_rate: InputRange {
                    min: bounds.min_base_rate,
                    max: bounds.max_base_rate,
                    unit: "PKR",
                },
            },
            training_date: metadata.map(|m| m.training_date),
            fit: metadata.and_then(|m| m.fit),
            model_loaded: metadata.is_some(),
            model_enabled: self.predictor.model_enabled(),
            use_ensemble: self.use_ensemble,
        }
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn bounds(&self) -> &TrainedBounds {
        self.predictor.bounds()
    }

    pub fn metrics(&self) -> Option<&EngineMetrics> {
        self.metrics.as_ref()
    }
}

fn to_estimate(request: PredictionRequest, result: PredictionResult) -> PriceEstimate {
    PriceEstimate {
        estimated_price: result.estimated_price,
        confidence: result.confidence,
        breakdown: PriceBreakdown {
            estimated_travel_cost: travel_cost(request.distance),
            base_rate: request.base_rate,
            prediction: result.estimated_price,
            ml_prediction: result.ml_prediction,
            expected_prediction: result.expected_prediction,
            method: result.method,
        },
        warnings: result.warnings,
    }
}
