//! Offline evaluation of a pricing function against a synthetic reference set.
//!
//! The reference price differs from the plain travel-cost rule: mid-range trips
//! (40 to 80 km) carry a 5% peak surcharge, trips above 100 km a 5% long-haul
//! discount, and every price gets up to ±5% of the travel cost as noise.

use crate::domain::pricing::{expected_price, travel_cost};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

pub const PEAK_RANGE_KM: (f64, f64) = (40.0, 80.0);
pub const PEAK_FACTOR: f64 = 1.05;
pub const LONG_HAUL_FROM_KM: f64 = 100.0;
pub const LONG_HAUL_FACTOR: f64 = 0.95;

/// Relative error under which a prediction counts as accurate.
pub const ACCURACY_TOLERANCE: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub distance: f64,
    pub base_rate: f64,
    pub reference_price: i64,
}

/// Random cases with distance in `[0.1, 150.1)` km and base rate in `[200, 8000)`.
pub fn generate_test_set(size: usize, seed: u64) -> Vec<TestCase> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..size)
        .map(|_| {
            let distance = rng.random_range(0.1..150.1);
            let base_rate = rng.random_range(200.0..8000.0);
            let noise = rng.random_range(-0.5..0.5);
            TestCase {
                distance,
                base_rate,
                reference_price: reference_price(distance, base_rate, noise),
            }
        })
        .collect()
}

/// `noise` in `[-0.5, 0.5)` is applied as that fraction of 10% of the travel cost.
fn reference_price(distance: f64, base_rate: f64, noise: f64) -> i64 {
    let mut price = expected_price(distance, base_rate);
    if (PEAK_RANGE_KM.0..=PEAK_RANGE_KM.1).contains(&distance) {
        price *= PEAK_FACTOR;
    }
    if distance > LONG_HAUL_FROM_KM {
        price *= LONG_HAUL_FACTOR;
    }
    price += noise * 0.1 * travel_cost(distance);
    price.round() as i64
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationReport {
    pub samples: usize,
    /// Cases the pricing function declined to quote
    pub skipped: usize,
    pub mae: f64,
    pub rmse: f64,
    /// Mean absolute percentage error, in percent
    pub mape: f64,
    /// Share (0-1) of predictions within 30% of the reference
    pub within_tolerance: f64,
}

/// Scores `predict` on every case. `None` from `predict` counts as skipped.
pub fn evaluate<F>(mut predict: F, cases: &[TestCase]) -> EvaluationReport
where
    F: FnMut(f64, f64) -> Option<i64>,
{
    let mut abs_sum = 0.0;
    let mut sq_sum = 0.0;
    let mut pct_sum = 0.0;
    let mut accurate = 0usize;
    let mut scored = 0usize;
    let mut skipped = 0usize;

    for case in cases {
        let Some(prediction) = predict(case.distance, case.base_rate) else {
            skipped += 1;
            continue;
        };
        let reference = case.reference_price as f64;
        let err = (prediction - case.reference_price) as f64;
        abs_sum += err.abs();
        sq_sum += err * err;
        if reference > 0.0 {
            pct_sum += err.abs() / reference;
            if (prediction as f64 / reference - 1.0).abs() < ACCURACY_TOLERANCE {
                accurate += 1;
            }
        }
        scored += 1;
    }

    if scored == 0 {
        return EvaluationReport {
            skipped,
            ..EvaluationReport::default()
        };
    }

    let n = scored as f64;
    EvaluationReport {
        samples: scored,
        skipped,
        mae: abs_sum / n,
        rmse: (sq_sum / n).sqrt(),
        mape: pct_sum / n * 100.0,
        within_tolerance: accurate as f64 / n,
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegressionDetail {
    pub distance: f64,
    pub base_rate: f64,
    pub reference_price: i64,
    pub old_prediction: i64,
    pub new_prediction: i64,
    /// How much further the new prediction is from the reference
    pub regression: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelComparison {
    pub improvements: usize,
    pub regressions: usize,
    pub unchanged: usize,
    /// Regressed cases, worst first
    pub details: Vec<RegressionDetail>,
}

/// Compares absolute error per case. Cases either side declines are ignored.
pub fn compare_models<O, N>(mut old: O, mut new: N, cases: &[TestCase]) -> ModelComparison
where
    O: FnMut(f64, f64) -> Option<i64>,
    N: FnMut(f64, f64) -> Option<i64>,
{
    let mut comparison = ModelComparison::default();

    for case in cases {
        let (Some(old_prediction), Some(new_prediction)) = (
            old(case.distance, case.base_rate),
            new(case.distance, case.base_rate),
        ) else {
            continue;
        };
        let old_error = (old_prediction - case.reference_price).abs();
        let new_error = (new_prediction - case.reference_price).abs();

        match new_error.cmp(&old_error) {
            std::cmp::Ordering::Less => comparison.improvements += 1,
            std::cmp::Ordering::Equal => comparison.unchanged += 1,
            std::cmp::Ordering::Greater => {
                comparison.regressions += 1;
                comparison.details.push(RegressionDetail {
                    distance: case.distance,
                    base_rate: case.base_rate,
                    reference_price: case.reference_price,
                    old_prediction,
                    new_prediction,
                    regression: new_error - old_error,
                });
            }
        }
    }

    comparison
        .details
        .sort_by(|a, b| b.regression.cmp(&a.regression));
    comparison
}
