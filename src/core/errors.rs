// src/core/errors.rs
use thiserror::Error;

/// Reasons an explanation request is rejected before any model call is made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("background data cannot be empty")]
    EmptyBackground,

    #[error("background row {row} has {found} features, expected {expected}")]
    RaggedBackground {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("instance {instance} has {found} features, but the background has {expected}")]
    FeatureCountMismatch {
        instance: usize,
        expected: usize,
        found: usize,
    },

    #[error("instance {instance} has {found} observed outputs, expected {expected}")]
    OutputCountMismatch {
        instance: usize,
        expected: usize,
        found: usize,
    },

    #[error("cannot pair {inputs} inputs with {outputs} outputs")]
    LengthMismatch { inputs: usize, outputs: usize },
}

#[derive(Error, Debug)]
pub enum ShapError {
    #[error("Validation Error: {0}")]
    Validation(#[from] ValidationError),

    /// Failure reported by, or contract violation of, the prediction provider.
    #[error("Model Prediction Error: {0}")]
    Prediction(String),

    #[error("Incompatible Dimensions: {0}")]
    IncompatibleDimensions(String),

    #[error("Internal Error: {0}")]
    Internal(String),

    #[error("Ndarray Error: {0}")]
    Ndarray(#[from] ndarray::ShapeError),

    #[cfg(feature = "linalg")]
    #[error("Linalg Error: {0}")]
    Linalg(#[from] ndarray_linalg::error::LinalgError),
}

impl ShapError {
    /// The validation reason, if this error is a validation failure.
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            ShapError::Validation(reason) => Some(reason),
            _ => None,
        }
    }
}

// Convenience type alias for Result
pub type Result<T> = std::result::Result<T, ShapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_convert_and_display() {
        let err: ShapError = ValidationError::FeatureCountMismatch {
            instance: 0,
            expected: 10,
            found: 4,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Validation Error: instance 0 has 4 features, but the background has 10"
        );
        assert_eq!(
            err.as_validation(),
            Some(&ValidationError::FeatureCountMismatch {
                instance: 0,
                expected: 10,
                found: 4
            })
        );
        assert!(ShapError::Prediction("boom".into()).as_validation().is_none());
    }
}
