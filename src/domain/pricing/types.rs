use serde::{Deserialize, Serialize};

/// A single quote request: trip distance in km and the provider's base rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRequest {
    pub distance: f64,
    pub base_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionMethod {
    Ensemble,
    MlOnly,
}

impl PredictionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionMethod::Ensemble => "ensemble",
            PredictionMethod::MlOnly => "ml_only",
        }
    }
}

/// Coarse reliability label for a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
        }
    }
}

/// Inputs after the safety envelope was applied, recorded only when clamping changed them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClampedInputs {
    pub distance: f64,
    pub base_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    pub estimated_price: i64,
    pub ml_prediction: i64,
    pub expected_prediction: i64,
    pub method: PredictionMethod,
    pub confidence: Confidence,
    pub within_bounds: bool,
    pub clamped_inputs: Option<ClampedInputs>,
    pub warnings: Vec<String>,
}

/// Price breakdown returned to callers alongside the estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub estimated_travel_cost: f64,
    pub base_rate: f64,
    pub prediction: i64,
    pub ml_prediction: i64,
    pub expected_prediction: i64,
    pub method: PredictionMethod,
}

/// Public answer of the engine for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceEstimate {
    pub estimated_price: i64,
    pub confidence: Confidence,
    pub breakdown: PriceBreakdown,
    pub warnings: Vec<String>,
}
