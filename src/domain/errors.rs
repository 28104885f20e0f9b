use serde::{Serialize, Serializer};
use thiserror::Error;

/// Structural problems with a quote request. Any of these stops computation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("{field} is required")]
    Missing { field: InputField },

    #[error("{field} must be a number")]
    NotANumber { field: InputField },

    #[error("{field} must be a finite number")]
    NotFinite { field: InputField },

    #[error("{field} must be positive")]
    NonPositive { field: InputField, value: f64 },
}

impl InputError {
    pub fn field(&self) -> InputField {
        match self {
            InputError::Missing { field }
            | InputError::NotANumber { field }
            | InputError::NotFinite { field }
            | InputError::NonPositive { field, .. } => *field,
        }
    }
}

impl Serialize for InputError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The two request fields the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum InputField {
    Distance,
    BaseRate,
}

impl std::fmt::Display for InputField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputField::Distance => write!(f, "Distance"),
            InputField::BaseRate => write!(f, "Base rate"),
        }
    }
}

/// A request that failed validation, carrying every structural error found.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("Invalid quote request: {}", join_messages(.errors))]
pub struct InputRejection {
    pub errors: Vec<InputError>,
}

fn join_messages(errors: &[InputError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Failures of the trained model. Callers recover by falling back to the rule-based price.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    #[error("Model backend unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Model training failed: {reason}")]
    TrainingFailed { reason: String },

    #[error("Model inference failed: {reason}")]
    InferenceFailed { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_error_formatting() {
        let error = InputError::NonPositive {
            field: InputField::Distance,
            value: -5.0,
        };
        assert_eq!(error.to_string(), "Distance must be positive");

        let error = InputError::Missing {
            field: InputField::BaseRate,
        };
        assert_eq!(error.to_string(), "Base rate is required");
    }

    #[test]
    fn test_rejection_joins_messages() {
        let rejection = InputRejection {
            errors: vec![
                InputError::Missing {
                    field: InputField::Distance,
                },
                InputError::NotANumber {
                    field: InputField::BaseRate,
                },
            ],
        };

        let msg = rejection.to_string();
        assert!(msg.contains("Distance is required, Base rate must be a number"));
    }

    #[test]
    fn test_input_error_serializes_as_message() {
        let error = InputError::NotFinite {
            field: InputField::Distance,
        };
        let json = serde_json::to_string(&error).unwrap();
        assert_eq!(json, "\"Distance must be a finite number\"");
    }
}
