use crate::application::ml::PriceModel;
use crate::domain::pricing::{
    ClampedInputs, Confidence, FeatureExtractor, PredictionMethod, PredictionResult,
    RawFeatureExtractor, TrainedBounds, travel_cost,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

/// Envelope the model inputs are clamped to, independent of the trained bounds.
pub const SAFE_DISTANCE_RANGE: (f64, f64) = (0.1, 200.0);
pub const SAFE_BASE_RATE_RANGE: (f64, f64) = (100.0, 12000.0);

/// Band around the rule price, as multiples of the travel cost, that model output is held to.
pub const ML_TRAVEL_LOWER: f64 = 0.85;
pub const ML_TRAVEL_UPPER: f64 = 1.25;

/// Ensemble Predictor
///
/// Averages the trained model with the rule price `baseRate + travelCost`.
/// - Model output is clamped into a band around the rule price and floored at the base rate
/// - Without a model both components are the rule price
/// - Confidence drops to medium in regions with known higher error
pub struct EnsemblePredictor {
    model: Arc<dyn PriceModel>,
    extractor: Arc<dyn FeatureExtractor>,
    bounds: TrainedBounds,
    model_disabled: AtomicBool,
}

impl EnsemblePredictor {
    pub fn new(model: Arc<dyn PriceModel>, bounds: TrainedBounds) -> Self {
        Self::with_extractor(model, Arc::new(RawFeatureExtractor), bounds)
    }

    pub fn with_extractor(
        model: Arc<dyn PriceModel>,
        extractor: Arc<dyn FeatureExtractor>,
        bounds: TrainedBounds,
    ) -> Self {
        Self {
            model,
            extractor,
            bounds,
            model_disabled: AtomicBool::new(false),
        }
    }

    pub fn bounds(&self) -> &TrainedBounds {
        &self.bounds
    }

    pub fn model(&self) -> &Arc<dyn PriceModel> {
        &self.model
    }

    pub fn extractor(&self) -> &Arc<dyn FeatureExtractor> {
        &self.extractor
    }

    /// False once an inference fault switched this predictor to rule-only pricing.
    pub fn model_enabled(&self) -> bool {
        !self.model_disabled.load(Ordering::Relaxed)
    }

    pub fn predict(&self, distance: f64, base_rate: f64, use_ensemble: bool) -> PredictionResult {
        let model_distance = distance.clamp(SAFE_DISTANCE_RANGE.0, SAFE_DISTANCE_RANGE.1);
        let model_base_rate = base_rate.clamp(SAFE_BASE_RATE_RANGE.0, SAFE_BASE_RATE_RANGE.1);
        let clamped_inputs = if model_distance != distance || model_base_rate != base_rate {
            Some(ClampedInputs {
                distance: model_distance,
                base_rate: model_base_rate,
            })
        } else {
            None
        };

        let travel = travel_cost(distance);
        let expected = base_rate + travel;

        // integer quotes may not round below a fractional base rate
        let floor = base_rate.ceil() as i64;
        let expected_prediction = expected.round() as i64;
        let ml_prediction = match self.model_price(model_distance, model_base_rate) {
            Some(raw) => raw
                .clamp(base_rate + travel * ML_TRAVEL_LOWER, base_rate + travel * ML_TRAVEL_UPPER)
                .round() as i64,
            None => expected_prediction,
        }
        .max(floor);

        let (estimated_price, method) = if use_ensemble {
            let averaged = ((ml_prediction + expected_prediction) as f64 / 2.0).round() as i64;
            (averaged.max(floor), PredictionMethod::Ensemble)
        } else {
            (ml_prediction, PredictionMethod::MlOnly)
        };

        let within_bounds = self.bounds.contains(distance, base_rate);
        let warnings: Vec<String> = self
            .bounds
            .violations(distance, base_rate)
            .into_iter()
            .map(|v| v.message)
            .collect();

        let confidence = confidence_for(within_bounds, distance, base_rate);

        debug!(
            "Quote {}km / {}: ml={} expected={} estimate={} ({:?}, {:?})",
            distance, base_rate, ml_prediction, expected_prediction, estimated_price, method, confidence
        );

        PredictionResult {
            estimated_price,
            ml_prediction,
            expected_prediction,
            method,
            confidence,
            within_bounds,
            clamped_inputs,
            warnings,
        }
    }

    fn model_price(&self, distance: f64, base_rate: f64) -> Option<f64> {
        if !self.model_enabled() {
            return None;
        }
        if !self.model.is_available() {
            return None;
        }

        let features = self.extractor.extract(distance, base_rate);
        match self.model.infer(&features) {
            Ok(price) => Some(price),
            Err(e) => {
                if !self.model_disabled.swap(true, Ordering::Relaxed) {
                    warn!(
                        "{} ({}). Switching to rule-based pricing.",
                        e,
                        self.model.name()
                    );
                }
                None
            }
        }
    }
}

/// High unless the inputs sit in a region with known higher relative error.
pub fn confidence_for(within_bounds: bool, distance: f64, base_rate: f64) -> Confidence {
    let risky = !within_bounds
        || distance > 120.0
        || (distance > 80.0 && base_rate < 800.0)
        || (distance < 15.0 && base_rate > 5000.0);

    if risky {
        Confidence::Medium
    } else {
        Confidence::High
    }
}
