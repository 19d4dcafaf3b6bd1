//! Error types.
//!
//! Two layers:
//!
//! - [`ScoreError`]: per-request failures of the scoring pipeline. Each variant is
//!   tagged with an [`ErrorKind`] so front-ends can tell "fix your input" apart
//!   from "the model is not usable".
//! - [`AppError`]: process-level failures (CLI, I/O, terminal, startup checks),
//!   carrying the exit code the binary should return.

use std::path::PathBuf;

/// Broad classification of a scoring failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller supplied an incomplete or malformed record. Affects this request only.
    Input,
    /// The model is missing or its invocation failed.
    Infrastructure,
}

/// A failure of a single pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreError {
    /// A schema field is absent from the record.
    MissingField { field: String },
    /// A field value could not be read as a finite number.
    NonNumeric { field: String, raw: String },
    /// A field value lies outside the field's documented range.
    OutOfRange {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },
    /// A vector had the wrong length for the requested operation.
    DimensionMismatch { expected: usize, actual: usize },
    /// No model artifact is loaded; prediction was not attempted.
    ModelUnavailable { path: PathBuf, reason: String },
    /// The artifact was invoked and failed.
    Prediction { reason: String },
}

impl ScoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScoreError::MissingField { .. }
            | ScoreError::NonNumeric { .. }
            | ScoreError::OutOfRange { .. }
            | ScoreError::DimensionMismatch { .. } => ErrorKind::Input,
            ScoreError::ModelUnavailable { .. } | ScoreError::Prediction { .. } => {
                ErrorKind::Infrastructure
            }
        }
    }

    pub fn is_input_error(&self) -> bool {
        self.kind() == ErrorKind::Input
    }
}

impl std::fmt::Display for ScoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScoreError::MissingField { field } => {
                write!(f, "Missing value for field '{field}'.")
            }
            ScoreError::NonNumeric { field, raw } => {
                write!(f, "Field '{field}' is not a finite number (got '{raw}').")
            }
            ScoreError::OutOfRange {
                field,
                value,
                min,
                max,
            } => write!(f, "Field '{field}' = {value} is outside [{min}, {max}]."),
            ScoreError::DimensionMismatch { expected, actual } => {
                write!(f, "Expected {expected} feature values, got {actual}.")
            }
            ScoreError::ModelUnavailable { path, reason } => write!(
                f,
                "Prediction unavailable: no model loaded from '{}' ({reason}).",
                path.display()
            ),
            ScoreError::Prediction { reason } => write!(f, "Prediction failed: {reason}"),
        }
    }
}

impl std::error::Error for ScoreError {}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<ScoreError> for AppError {
    fn from(err: ScoreError) -> Self {
        let exit_code = match err.kind() {
            ErrorKind::Input => 2,
            ErrorKind::Infrastructure => 4,
        };
        AppError::new(exit_code, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_and_infrastructure_errors_are_distinguished() {
        let missing = ScoreError::MissingField {
            field: "tot_enq".to_string(),
        };
        let unavailable = ScoreError::ModelUnavailable {
            path: PathBuf::from("model.json"),
            reason: "file not found".to_string(),
        };
        assert_eq!(missing.kind(), ErrorKind::Input);
        assert_eq!(unavailable.kind(), ErrorKind::Infrastructure);
        assert!(missing.is_input_error());
        assert!(!unavailable.is_input_error());
    }

    #[test]
    fn app_error_exit_code_follows_kind() {
        let input: AppError = ScoreError::DimensionMismatch {
            expected: 12,
            actual: 11,
        }
        .into();
        let infra: AppError = ScoreError::Prediction {
            reason: "boom".to_string(),
        }
        .into();
        assert_eq!(input.exit_code(), 2);
        assert_eq!(infra.exit_code(), 4);
        assert!(input.to_string().contains("Expected 12"));
    }
}
