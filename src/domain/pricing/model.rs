//! Immutable records fixed at training time: trained input ranges,
//! normalization statistics and the metadata persisted beside the model.

use super::features::FeatureVector;
use crate::domain::errors::{BackendError, InputField};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Input ranges the model was trained over.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainedBounds {
    pub min_distance: f64,
    pub max_distance: f64,
    pub min_base_rate: f64,
    pub max_base_rate: f64,
}

impl Default for TrainedBounds {
    fn default() -> Self {
        Self {
            min_distance: 0.1,
            max_distance: 160.0,
            min_base_rate: 200.0,
            max_base_rate: 8000.0,
        }
    }
}

/// Which side of a trained range an input fell on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeWarning {
    BelowMinimum,
    AboveMaximum,
}

/// One input lying outside the trained range.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundViolation {
    pub field: InputField,
    pub kind: RangeWarning,
    pub message: String,
}

impl TrainedBounds {
    pub fn contains_distance(&self, distance: f64) -> bool {
        distance >= self.min_distance && distance <= self.max_distance
    }

    pub fn contains_base_rate(&self, base_rate: f64) -> bool {
        base_rate >= self.min_base_rate && base_rate <= self.max_base_rate
    }

    pub fn contains(&self, distance: f64, base_rate: f64) -> bool {
        self.contains_distance(distance) && self.contains_base_rate(base_rate)
    }

    /// Lists every input outside the trained ranges, distance first.
    pub fn violations(&self, distance: f64, base_rate: f64) -> Vec<BoundViolation> {
        let mut out = Vec::new();

        if distance < self.min_distance {
            out.push(BoundViolation {
                field: InputField::Distance,
                kind: RangeWarning::BelowMinimum,
                message: format!(
                    "Distance {}km is below minimum trained range ({}km)",
                    distance, self.min_distance
                ),
            });
        } else if distance > self.max_distance {
            out.push(BoundViolation {
                field: InputField::Distance,
                kind: RangeWarning::AboveMaximum,
                message: format!(
                    "Distance {}km is above maximum trained range ({}km)",
                    distance, self.max_distance
                ),
            });
        }

        if base_rate < self.min_base_rate {
            out.push(BoundViolation {
                field: InputField::BaseRate,
                kind: RangeWarning::BelowMinimum,
                message: format!(
                    "Base rate {} is below minimum trained range ({})",
                    base_rate, self.min_base_rate
                ),
            });
        } else if base_rate > self.max_base_rate {
            out.push(BoundViolation {
                field: InputField::BaseRate,
                kind: RangeWarning::AboveMaximum,
                message: format!(
                    "Base rate {} is above maximum trained range ({})",
                    base_rate, self.max_base_rate
                ),
            });
        }

        out
    }
}

/// Feature and label scaling statistics captured from the training set.
/// Inference must reuse these verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizationParams {
    pub input_mean: Vec<f64>,
    pub input_std: Vec<f64>,
    pub label_mean: f64,
    pub label_std: f64,
}

impl NormalizationParams {
    /// Computes population mean and standard deviation per feature and for the label.
    /// A zero deviation is replaced with 1.0 so a constant column cannot divide by zero.
    pub fn fit(features: &[FeatureVector], labels: &[f64]) -> Result<Self, BackendError> {
        if features.is_empty() || features.len() != labels.len() {
            return Err(BackendError::TrainingFailed {
                reason: format!(
                    "cannot normalize {} feature rows against {} labels",
                    features.len(),
                    labels.len()
                ),
            });
        }

        let width = features[0].len();
        if features.iter().any(|f| f.len() != width) {
            return Err(BackendError::TrainingFailed {
                reason: "feature rows have inconsistent widths".to_string(),
            });
        }

        let n = features.len() as f64;
        let mut input_mean = vec![0.0; width];
        for row in features {
            for (acc, v) in input_mean.iter_mut().zip(row.values()) {
                *acc += v;
            }
        }
        for m in input_mean.iter_mut() {
            *m /= n;
        }

        let mut input_std = vec![0.0; width];
        for row in features {
            for ((acc, v), m) in input_std.iter_mut().zip(row.values()).zip(&input_mean) {
                *acc += (v - m).powi(2);
            }
        }
        for s in input_std.iter_mut() {
            *s = non_zero((*s / n).sqrt());
        }

        let label_mean = labels.iter().sum::<f64>() / n;
        let label_std = non_zero(
            (labels.iter().map(|y| (y - label_mean).powi(2)).sum::<f64>() / n).sqrt(),
        );

        Ok(Self {
            input_mean,
            input_std,
            label_mean,
            label_std,
        })
    }

    pub fn feature_count(&self) -> usize {
        self.input_mean.len()
    }

    /// True when the vectors agree in length and every statistic is usable.
    pub fn is_consistent(&self) -> bool {
        self.input_mean.len() == self.input_std.len()
            && !self.input_mean.is_empty()
            && self.input_mean.iter().all(|v| v.is_finite())
            && self.input_std.iter().all(|v| v.is_finite() && *v > 0.0)
            && self.label_mean.is_finite()
            && self.label_std.is_finite()
            && self.label_std > 0.0
    }

    pub fn normalize(&self, features: &FeatureVector) -> Result<Vec<f64>, BackendError> {
        if features.len() != self.feature_count() {
            return Err(BackendError::InferenceFailed {
                reason: format!(
                    "expected {} features, got {}",
                    self.feature_count(),
                    features.len()
                ),
            });
        }

        Ok(features
            .values()
            .iter()
            .zip(self.input_mean.iter().zip(&self.input_std))
            .map(|(v, (m, s))| (v - m) / s)
            .collect())
    }

    pub fn normalize_label(&self, label: f64) -> f64 {
        (label - self.label_mean) / self.label_std
    }

    pub fn denormalize_label(&self, normalized: f64) -> f64 {
        normalized * self.label_std + self.label_mean
    }
}

fn non_zero(std: f64) -> f64 {
    if std > f64::EPSILON { std } else { 1.0 }
}

/// Metadata persisted beside the model artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelMetadata {
    pub norm_params: NormalizationParams,
    pub model_config: TrainedBounds,
    pub training_date: DateTime<Utc>,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fit: Option<FitStatistics>,
}

/// In-sample goodness of fit, recorded for monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FitStatistics {
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_violations() {
        let bounds = TrainedBounds::default();

        assert!(bounds.violations(50.0, 1500.0).is_empty());

        let v = bounds.violations(0.05, 1000.0);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].field, InputField::Distance);
        assert_eq!(v[0].kind, RangeWarning::BelowMinimum);
        assert!(v[0].message.contains("0.05km"));

        let v = bounds.violations(170.0, 9000.0);
        assert_eq!(v.len(), 2);
        assert_eq!(v[0].kind, RangeWarning::AboveMaximum);
        assert_eq!(v[1].field, InputField::BaseRate);
        assert_eq!(v[1].kind, RangeWarning::AboveMaximum);
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let bounds = TrainedBounds::default();
        assert!(bounds.contains(0.1, 200.0));
        assert!(bounds.contains(160.0, 8000.0));
        assert!(!bounds.contains(160.5, 8000.0));
    }

    #[test]
    fn test_normalization_fit() {
        let features = vec![
            FeatureVector::new(vec![1.0, 10.0]),
            FeatureVector::new(vec![3.0, 10.0]),
        ];
        let labels = vec![100.0, 300.0];
        let params = NormalizationParams::fit(&features, &labels).unwrap();

        assert_eq!(params.input_mean, vec![2.0, 10.0]);
        assert_eq!(params.input_std[0], 1.0);
        // constant column falls back to unit deviation
        assert_eq!(params.input_std[1], 1.0);
        assert_eq!(params.label_mean, 200.0);
        assert_eq!(params.label_std, 100.0);

        let z = params.normalize(&FeatureVector::new(vec![3.0, 12.0])).unwrap();
        assert_eq!(z, vec![1.0, 2.0]);
        assert_eq!(params.denormalize_label(params.normalize_label(250.0)), 250.0);
    }

    #[test]
    fn test_normalize_rejects_wrong_width() {
        let params = NormalizationParams {
            input_mean: vec![0.0, 0.0],
            input_std: vec![1.0, 1.0],
            label_mean: 0.0,
            label_std: 1.0,
        };
        let result = params.normalize(&FeatureVector::new(vec![1.0]));
        assert!(matches!(result, Err(BackendError::InferenceFailed { .. })));
    }

    #[test]
    fn test_metadata_json_layout() {
        let metadata = ModelMetadata {
            norm_params: NormalizationParams {
                input_mean: vec![80.0, 4100.0],
                input_std: vec![46.0, 2250.0],
                label_mean: 4500.0,
                label_std: 2260.0,
            },
            model_config: TrainedBounds::default(),
            training_date: Utc::now(),
            version: "2.0.0".to_string(),
            sample_count: None,
            fit: None,
        };

        let json = serde_json::to_value(&metadata).unwrap();
        assert!(json["normParams"]["inputMean"].is_array());
        assert_eq!(json["modelConfig"]["maxDistance"], 160.0);
        assert!(json["trainingDate"].is_string());
        assert_eq!(json["version"], "2.0.0");
        assert!(json.get("sampleCount").is_none());
    }
}
