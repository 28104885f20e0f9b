use crate::domain::errors::{InputError, InputField, InputRejection};
use crate::domain::pricing::{PredictionRequest, RangeWarning, TrainedBounds};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// Per-field range tags attached to a validation report.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_warning: Option<RangeWarning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_rate_warning: Option<RangeWarning>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<InputError>,
    pub warnings: Vec<String>,
    pub details: ValidationDetails,
    #[serde(skip)]
    request: Option<PredictionRequest>,
}

impl ValidationReport {
    fn rejected(errors: Vec<InputError>) -> Self {
        Self {
            valid: false,
            errors,
            warnings: Vec::new(),
            details: ValidationDetails::default(),
            request: None,
        }
    }

    /// The parsed request, present only when the report is valid.
    pub fn request(&self) -> Option<PredictionRequest> {
        self.request
    }

    pub fn into_result(self) -> Result<(PredictionRequest, Vec<String>), InputRejection> {
        match self.request {
            Some(request) if self.valid => Ok((request, self.warnings)),
            _ => Err(InputRejection {
                errors: self.errors,
            }),
        }
    }
}

/// Checks quote inputs before they reach the engine.
///
/// Structural problems (missing, non-numeric, non-finite, non-positive) make the
/// report invalid. Values outside the trained ranges only add warnings.
#[derive(Debug, Clone)]
pub struct ValidationGate {
    bounds: TrainedBounds,
}

impl ValidationGate {
    pub fn new(bounds: TrainedBounds) -> Self {
        Self { bounds }
    }

    pub fn bounds(&self) -> &TrainedBounds {
        &self.bounds
    }

    pub fn validate(&self, distance: f64, base_rate: f64) -> ValidationReport {
        let mut errors = Vec::new();
        check_numeric(InputField::Distance, distance, &mut errors);
        check_numeric(InputField::BaseRate, base_rate, &mut errors);
        if !errors.is_empty() {
            debug!("Validation FAILED: {:?}", errors);
            return ValidationReport::rejected(errors);
        }

        if distance <= 0.0 {
            errors.push(InputError::NonPositive {
                field: InputField::Distance,
                value: distance,
            });
        }
        if base_rate <= 0.0 {
            errors.push(InputError::NonPositive {
                field: InputField::BaseRate,
                value: base_rate,
            });
        }

        let mut warnings = Vec::new();
        let mut details = ValidationDetails::default();
        for violation in self.bounds.violations(distance, base_rate) {
            match violation.field {
                InputField::Distance => details.distance_warning = Some(violation.kind),
                InputField::BaseRate => details.base_rate_warning = Some(violation.kind),
            }
            warnings.push(violation.message);
        }

        let valid = errors.is_empty();
        if !valid {
            debug!("Validation FAILED: {:?}", errors);
        }

        ValidationReport {
            valid,
            errors,
            warnings,
            details,
            request: valid.then_some(PredictionRequest {
                distance,
                base_rate,
            }),
        }
    }

    /// Validates untyped values as received from a JSON body.
    /// Numbers and numeric strings are accepted; `null` counts as missing.
    pub fn validate_raw(&self, distance: Option<&Value>, base_rate: Option<&Value>) -> ValidationReport {
        let distance = parse_field(InputField::Distance, distance);
        let base_rate = parse_field(InputField::BaseRate, base_rate);

        match (distance, base_rate) {
            (Ok(d), Ok(r)) => self.validate(d, r),
            (d, r) => {
                let errors: Vec<InputError> = [d.err(), r.err()].into_iter().flatten().collect();
                debug!("Validation FAILED: {:?}", errors);
                ValidationReport::rejected(errors)
            }
        }
    }
}

fn check_numeric(field: InputField, value: f64, errors: &mut Vec<InputError>) {
    if value.is_nan() {
        errors.push(InputError::NotANumber { field });
    } else if value.is_infinite() {
        errors.push(InputError::NotFinite { field });
    }
}

fn parse_field(field: InputField, value: Option<&Value>) -> Result<f64, InputError> {
    match value {
        None | Some(Value::Null) => Err(InputError::Missing { field }),
        Some(Value::Number(n)) => n.as_f64().ok_or(InputError::NotANumber { field }),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| InputError::NotANumber { field }),
        Some(_) => Err(InputError::NotANumber { field }),
    }
}
