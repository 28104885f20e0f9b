//! Synthetic training set and regression fit for the price model.
//!
//! Labels follow the travel-cost rule with bounded noise. A fixed set of
//! long-distance / low-rate jobs, which the rule over-quotes, is repeated at a
//! budget price so the fitted model leans toward cheaper quotes for them.

use crate::domain::errors::BackendError;
use crate::domain::pricing::{
    FeatureExtractor, FeatureVector, FitStatistics, ModelMetadata, NormalizationParams,
    RawFeatureExtractor, TrainedBounds, expected_price, travel_cost,
};
use anyhow::{Context, Result};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::linear_regression::{
    LinearRegression, LinearRegressionParameters, LinearRegressionSolverName,
};
use std::path::Path;
use tracing::{debug, info};

pub type PriceRegressor = LinearRegression<f64, f64, DenseMatrix<f64>, Vec<f64>>;

pub const MODEL_VERSION: &str = "2.0.0";

/// Share of the travel cost charged for the long-distance / low-rate problem cases.
pub const LONG_HAUL_BUDGET_FACTOR: f64 = 0.9;

/// (distance km, base rate) pairs the rule-based price over-quotes.
pub const PROBLEM_CASES: &[(f64, f64)] = &[
    (100.0, 400.0),
    (120.0, 300.0),
    (80.0, 600.0),
    (150.0, 300.0),
    (160.0, 200.0),
    (140.0, 500.0),
    (110.0, 350.0),
    (90.0, 450.0),
    (130.0, 250.0),
    (160.0, 400.0),
];

#[derive(Debug, Clone)]
pub struct TrainingConfig {
    pub bounds: TrainedBounds,
    /// Points per axis of the systematic grid
    pub grid_steps: usize,
    pub random_samples: usize,
    pub problem_case_repeats: usize,
    /// Maximum noise as a fraction of the travel cost
    pub noise_pct: f64,
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            bounds: TrainedBounds::default(),
            grid_steps: 25,
            random_samples: 600,
            problem_case_repeats: 15,
            noise_pct: 0.05,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingSample {
    pub distance: f64,
    pub base_rate: f64,
    pub label: f64,
}

/// Builds the grid, problem-case and random samples, then shuffles them.
pub fn synthesize_training_set(config: &TrainingConfig) -> Vec<TrainingSample> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let b = &config.bounds;
    let mut samples = Vec::with_capacity(
        config.grid_steps * config.grid_steps
            + PROBLEM_CASES.len() * config.problem_case_repeats
            + config.random_samples,
    );

    for i in 0..config.grid_steps {
        let distance = lerp(b.min_distance, b.max_distance, grid_fraction(i, config.grid_steps));
        for j in 0..config.grid_steps {
            let base_rate = lerp(
                b.min_base_rate,
                b.max_base_rate,
                grid_fraction(j, config.grid_steps),
            );
            let label = noisy_label(&mut rng, distance, base_rate, config.noise_pct);
            samples.push(TrainingSample {
                distance,
                base_rate,
                label,
            });
        }
    }

    for &(distance, base_rate) in PROBLEM_CASES {
        let label = base_rate + travel_cost(distance) * LONG_HAUL_BUDGET_FACTOR;
        for _ in 0..config.problem_case_repeats {
            samples.push(TrainingSample {
                distance,
                base_rate,
                label,
            });
        }
    }

    for _ in 0..config.random_samples {
        let distance = rng.random_range(b.min_distance..=b.max_distance);
        let base_rate = rng.random_range(b.min_base_rate..=b.max_base_rate);
        let label = noisy_label(&mut rng, distance, base_rate, config.noise_pct);
        samples.push(TrainingSample {
            distance,
            base_rate,
            label,
        });
    }

    samples.shuffle(&mut rng);
    debug!("Synthesized {} training samples", samples.len());
    samples
}

fn grid_fraction(i: usize, steps: usize) -> f64 {
    if steps > 1 {
        i as f64 / (steps - 1) as f64
    } else {
        0.0
    }
}

fn lerp(lo: f64, hi: f64, t: f64) -> f64 {
    lo + (hi - lo) * t
}

fn noisy_label(rng: &mut StdRng, distance: f64, base_rate: f64, noise_pct: f64) -> f64 {
    let noise = rng.random_range(-1.0..=1.0) * noise_pct * travel_cost(distance);
    (expected_price(distance, base_rate) + noise).max(base_rate)
}

/// Writes samples as `distance,base_rate,label` rows.
pub fn export_csv(samples: &[TrainingSample], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create export directory")?;
    }
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to open {:?} for writing", path))?;
    for sample in samples {
        wtr.serialize(sample)
            .context("Failed to serialize training sample")?;
    }
    wtr.flush().context("Failed to flush CSV writer")?;
    Ok(())
}

/// A fitted regressor together with the statistics it must be used with.
#[derive(Debug)]
pub struct TrainedModel {
    regressor: PriceRegressor,
    metadata: ModelMetadata,
}

impl TrainedModel {
    pub fn from_parts(regressor: PriceRegressor, metadata: ModelMetadata) -> Self {
        Self {
            regressor,
            metadata,
        }
    }

    pub fn regressor(&self) -> &PriceRegressor {
        &self.regressor
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    /// Normalize with the stored parameters, run the regressor, denormalize.
    /// The input matrix and output vector are owned by this call and freed on every return path.
    pub fn predict(&self, features: &FeatureVector) -> Result<f64, BackendError> {
        let norm = &self.metadata.norm_params;
        let z = norm.normalize(features)?;

        let input = DenseMatrix::from_2d_vec(&vec![z]).map_err(|e| {
            BackendError::InferenceFailed {
                reason: format!("Matrix creation failed: {}", e),
            }
        })?;
        let output = self
            .regressor
            .predict(&input)
            .map_err(|e| BackendError::InferenceFailed {
                reason: format!("Prediction failed: {}", e),
            })?;
        let raw = output
            .first()
            .copied()
            .ok_or_else(|| BackendError::InferenceFailed {
                reason: "No prediction returned".to_string(),
            })?;

        let price = norm.denormalize_label(raw);
        if !price.is_finite() {
            return Err(BackendError::InferenceFailed {
                reason: format!("non-finite prediction {}", price),
            });
        }
        Ok(price)
    }
}

/// Synthesizes a training set and fits a model on it.
pub fn train(config: &TrainingConfig) -> Result<TrainedModel, BackendError> {
    let samples = synthesize_training_set(config);
    fit(&samples, config.bounds)
}

/// Fits least squares on normalized features and labels.
pub fn fit(samples: &[TrainingSample], bounds: TrainedBounds) -> Result<TrainedModel, BackendError> {
    let extractor = RawFeatureExtractor;
    let features: Vec<FeatureVector> = samples
        .iter()
        .map(|s| extractor.extract(s.distance, s.base_rate))
        .collect();
    let labels: Vec<f64> = samples.iter().map(|s| s.label).collect();

    let norm_params = NormalizationParams::fit(&features, &labels)?;

    let x: Vec<Vec<f64>> = features
        .iter()
        .map(|f| norm_params.normalize(f))
        .collect::<Result<_, _>>()
        .map_err(|e| BackendError::TrainingFailed {
            reason: e.to_string(),
        })?;
    let y: Vec<f64> = labels
        .iter()
        .map(|l| norm_params.normalize_label(*l))
        .collect();

    let x_matrix = DenseMatrix::from_2d_vec(&x).map_err(|e| BackendError::TrainingFailed {
        reason: format!("Matrix error: {}", e),
    })?;

    info!("Training linear price model on {} samples...", samples.len());
    let params =
        LinearRegressionParameters::default().with_solver(LinearRegressionSolverName::QR);
    let regressor =
        LinearRegression::fit(&x_matrix, &y, params).map_err(|e| BackendError::TrainingFailed {
            reason: format!("Training error: {}", e),
        })?;

    let fitted: Vec<f64> = regressor
        .predict(&x_matrix)
        .map_err(|e| BackendError::TrainingFailed {
            reason: format!("Predict error: {}", e),
        })?
        .into_iter()
        .map(|z| norm_params.denormalize_label(z))
        .collect();
    let fit = fit_statistics(&fitted, &labels);

    info!(
        "In-sample fit (n={}): RMSE={:.2}, MAE={:.2}, R²={:.4}",
        samples.len(),
        fit.rmse,
        fit.mae,
        fit.r2
    );

    let metadata = ModelMetadata {
        norm_params,
        model_config: bounds,
        training_date: Utc::now(),
        version: MODEL_VERSION.to_string(),
        sample_count: Some(samples.len()),
        fit: Some(fit),
    };

    Ok(TrainedModel::from_parts(regressor, metadata))
}

fn fit_statistics(predictions: &[f64], actuals: &[f64]) -> FitStatistics {
    let n = predictions.len().max(1) as f64;
    let sq_err: f64 = predictions
        .iter()
        .zip(actuals)
        .map(|(p, t)| (p - t).powi(2))
        .sum();
    let mae = predictions
        .iter()
        .zip(actuals)
        .map(|(p, t)| (p - t).abs())
        .sum::<f64>()
        / n;
    let mean_y = actuals.iter().sum::<f64>() / n;
    let var_y = actuals.iter().map(|t| (t - mean_y).powi(2)).sum::<f64>() / n;
    let r2 = if var_y > 0.0 {
        1.0 - (sq_err / n) / var_y
    } else {
        0.0
    };

    FitStatistics {
        rmse: (sq_err / n).sqrt(),
        mae,
        r2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesis_is_seeded() {
        let config = TrainingConfig::default();
        let a = synthesize_training_set(&config);
        let b = synthesize_training_set(&config);
        assert_eq!(a, b);

        let other = synthesize_training_set(&TrainingConfig {
            seed: 7,
            ..config.clone()
        });
        assert_ne!(a, other);
    }

    #[test]
    fn test_synthesis_size_and_label_floor() {
        let config = TrainingConfig::default();
        let samples = synthesize_training_set(&config);
        assert_eq!(samples.len(), 25 * 25 + PROBLEM_CASES.len() * 15 + 600);

        for s in &samples {
            assert!(s.label >= s.base_rate);
            assert!(config.bounds.contains(s.distance, s.base_rate));
            let travel = travel_cost(s.distance);
            // noise never exceeds 5% of travel cost
            assert!(s.label <= s.base_rate + travel * 1.05 + 1e-9);
        }
    }

    #[test]
    fn test_problem_cases_repeated_at_budget_price() {
        let samples = synthesize_training_set(&TrainingConfig::default());
        let budget: Vec<_> = samples
            .iter()
            .filter(|s| s.distance == 120.0 && s.base_rate == 300.0)
            .collect();
        assert_eq!(budget.len(), 15);
        assert!(budget.iter().all(|s| s.label == 300.0 + 580.0 * 0.9));
    }

    #[test]
    fn test_fit_tracks_rule_price() {
        let model = train(&TrainingConfig::default()).unwrap();
        let price = model
            .predict(&FeatureVector::new(vec![50.0, 1500.0]))
            .unwrap();
        // within the ensemble band of the rule price
        assert!(price > 1500.0 + 300.0 * 0.85 && price < 1500.0 + 300.0 * 1.25);

        let fit = model.metadata().fit.unwrap();
        assert!(fit.r2 > 0.99);
        assert_eq!(model.metadata().version, MODEL_VERSION);
    }

    #[test]
    fn test_predict_rejects_wrong_width() {
        let model = train(&TrainingConfig::default()).unwrap();
        let err = model.predict(&FeatureVector::new(vec![1.0, 2.0, 3.0]));
        assert!(matches!(err, Err(BackendError::InferenceFailed { .. })));
    }

    #[test]
    fn test_fit_rejects_empty_set() {
        let err = fit(&[], TrainedBounds::default());
        assert!(matches!(err, Err(BackendError::TrainingFailed { .. })));
    }
}
