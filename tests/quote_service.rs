use fixit_pricing::application::ml::{PriceModel, RuleOnlyModel};
use fixit_pricing::application::pricing::{
    BatchItem, EnsemblePredictor, PriceEstimationService, ProviderCandidate,
};
use fixit_pricing::domain::errors::{BackendError, InputError, InputField};
use fixit_pricing::domain::pricing::{
    Confidence, FeatureVector, PredictionMethod, TrainedBounds, expected_price,
};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Healthy until `fail_after` calls, then every inference faults.
struct FlakyModel {
    calls: AtomicUsize,
    fail_after: usize,
}

impl FlakyModel {
    fn new(fail_after: usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_after,
        }
    }
}

impl PriceModel for FlakyModel {
    fn infer(&self, features: &FeatureVector) -> Result<f64, BackendError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call >= self.fail_after {
            return Err(BackendError::InferenceFailed {
                reason: "singular matrix".to_string(),
            });
        }
        let v = features.values();
        // travel cost plus 10%, inside the ensemble band
        Ok(v[1] + (expected_price(v[0], v[1]) - v[1]) * 1.1)
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "flaky"
    }

    fn version(&self) -> &str {
        "test"
    }
}

#[test]
fn test_rule_only_backend_quotes_expected_price() {
    let service = PriceEstimationService::new(Arc::new(RuleOnlyModel), TrainedBounds::default());
    let estimate = service.get_estimated_price(100.0, 2000.0).unwrap();

    assert_eq!(estimate.estimated_price, 2500);
    assert_eq!(estimate.breakdown.ml_prediction, 2500);
    assert_eq!(estimate.breakdown.expected_prediction, 2500);
    assert!(estimate.warnings.is_empty());
}

#[test]
fn test_tiny_distance_with_fractional_base_rate_stays_above_base() {
    let service = PriceEstimationService::new(Arc::new(RuleOnlyModel), TrainedBounds::default());
    let estimate = service.get_estimated_price(0.01, 200.4).unwrap();

    assert_eq!(estimate.estimated_price, 201);
    assert!(estimate.estimated_price as f64 >= 200.4);
    assert_eq!(estimate.warnings.len(), 1);
}

#[test]
fn test_inference_fault_degrades_without_user_warning() {
    let model = Arc::new(FlakyModel::new(1));
    let service = PriceEstimationService::new(model.clone(), TrainedBounds::default());

    // 50km travel 300, model says 1500 + 330
    let healthy = service.get_estimated_price(50.0, 1500.0).unwrap();
    assert_eq!(healthy.breakdown.ml_prediction, 1830);
    assert_eq!(healthy.estimated_price, 1815);

    let degraded = service.get_estimated_price(60.0, 1500.0).unwrap();
    assert_eq!(degraded.estimated_price, degraded.breakdown.expected_prediction);
    assert!(degraded.warnings.is_empty());
    assert!(!service.model_info().model_enabled);

    // no further inference once switched
    service.get_estimated_price(70.0, 1500.0).unwrap();
    assert_eq!(model.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_ml_only_method() {
    let predictor = EnsemblePredictor::new(
        Arc::new(FlakyModel::new(usize::MAX)),
        TrainedBounds::default(),
    );
    let service = PriceEstimationService::from_predictor(predictor).with_ensemble(false);
    let estimate = service.get_estimated_price(50.0, 1500.0).unwrap();

    assert_eq!(estimate.breakdown.method, PredictionMethod::MlOnly);
    assert_eq!(estimate.estimated_price, 1830);
}

#[test]
fn test_rejection_lists_every_error() {
    let service = PriceEstimationService::new(Arc::new(RuleOnlyModel), TrainedBounds::default());
    let rejection = service.get_estimated_price(0.0, -10.0).unwrap_err();

    assert_eq!(rejection.errors.len(), 2);
    assert_eq!(rejection.errors[0].field(), InputField::Distance);
    assert_eq!(rejection.errors[1].field(), InputField::BaseRate);
    assert!(rejection.to_string().contains("Distance must be positive"));

    let nan = service.get_estimated_price(f64::NAN, 1000.0).unwrap_err();
    assert!(matches!(nan.errors[0], InputError::NotANumber { .. }));
}

#[test]
fn test_batch_from_json_body() {
    let service = PriceEstimationService::new(Arc::new(RuleOnlyModel), TrainedBounds::default());
    let body = json!([
        {"distance": 10, "baseRate": 1000},
        {"distance": "25", "baseRate": "800"},
        {"distance": null, "baseRate": 1000},
        {"distance": 5, "baseRate": "cheap"},
        {"distance": 200, "baseRate": 1000}
    ]);
    let items: Vec<BatchItem> = serde_json::from_value(body).unwrap();

    let response = service.estimate_batch(&items);
    assert_eq!(response.summary.total_requests, 5);
    assert_eq!(response.summary.successful_predictions, 3);
    assert_eq!(response.summary.failed_predictions, 2);

    let prices: Vec<Option<i64>> = response
        .results
        .iter()
        .map(|r| r.output.as_ref().map(|o| o.estimated_price))
        .collect();
    assert_eq!(prices, vec![Some(1080), Some(1000), None, None, Some(1900)]);

    assert!(matches!(
        response.results[2].errors[0],
        InputError::Missing {
            field: InputField::Distance
        }
    ));
    let out_of_range = response.results[4].output.as_ref().unwrap();
    assert_eq!(out_of_range.confidence, Confidence::Medium);
    assert_eq!(out_of_range.warnings.len(), 1);

    let wire = serde_json::to_value(&response).unwrap();
    assert_eq!(wire["summary"]["successfulPredictions"], 3);
    assert_eq!(wire["results"][0]["output"]["breakdown"]["estimatedTravelCost"], 80.0);
}

#[test]
fn test_rank_providers_from_json() {
    let service = PriceEstimationService::new(Arc::new(RuleOnlyModel), TrainedBounds::default());
    let candidates: Vec<ProviderCandidate> = serde_json::from_value(json!([
        {"providerId": "a", "distanceKm": 40.0, "baseRate": 1200.0},
        {"providerId": "b", "distanceKm": 2.0, "baseRate": 1500.0},
        {"providerId": "c", "distanceKm": 12.0, "baseRate": 900.0},
        {"providerId": "d", "distanceKm": -1.0, "baseRate": 100.0}
    ]))
    .unwrap();

    let ranked = service.rank_providers(candidates);
    let order: Vec<(&str, i64)> = ranked
        .iter()
        .map(|p| (p.provider_id.as_str(), p.estimate.estimated_price))
        .collect();
    // c: 900 + 96, a: 1200 + 260, b: 1500 + 16; d is rejected
    assert_eq!(order, vec![("c", 996), ("a", 1460), ("b", 1516)]);
}
