//! Definition of errors.

use thiserror::Error;

pub type Result<T, E = EstimatorError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum EstimatorError {
    #[error(transparent)]
    InvalidModel(#[from] InvalidModelError),

    #[error(transparent)]
    InvalidArgument(#[from] InvalidArgumentError),

    #[error(transparent)]
    Analyzer(#[from] AnalyzerError),

    #[error("CsvError: {0}")]
    Csv(#[from] csv::Error),

    #[error("DecodeError: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("EncodeError: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("IOError: {0}")]
    Io(#[from] std::io::Error),

    #[error("TryFromIntError: {0}")]
    TryFromInt(#[from] std::num::TryFromIntError),
}

impl EstimatorError {
    pub(crate) fn invalid_model<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidModel(InvalidModelError { msg: msg.into() })
    }

    pub(crate) fn invalid_argument<S>(arg: &'static str, msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidArgument(InvalidArgumentError {
            arg,
            msg: msg.into(),
        })
    }

    /// Wraps a failure reported by a morphological analyzer.
    pub fn analyzer<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::Analyzer(AnalyzerError { msg: msg.into() })
    }
}

/// Error used when the model is invalid.
#[derive(Debug, Error)]
#[error("InvalidModelError: {msg}")]
pub struct InvalidModelError {
    /// Error message.
    pub(crate) msg: String,
}

/// Error used when the argument is invalid.
#[derive(Debug, Error)]
#[error("InvalidArgumentError: {arg}: {msg}")]
pub struct InvalidArgumentError {
    /// Name of the argument.
    pub(crate) arg: &'static str,

    /// Error message.
    pub(crate) msg: String,
}

/// Error used when the underlying morphological analyzer fails.
#[derive(Debug, Error)]
#[error("AnalyzerError: {msg}")]
pub struct AnalyzerError {
    /// Error message.
    pub(crate) msg: String,
}

/// Error returned by [`Estimator::predict`](crate::Estimator::predict).
///
/// An empty input is a validation problem on the caller's side and is kept apart from failures
/// inside the pipeline.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("input text is empty")]
    EmptyInput,

    #[error("prediction failed: {0}")]
    Failed(#[from] EstimatorError),
}

impl PredictError {
    /// Returns `true` if the error is a validation warning rather than a pipeline failure.
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::EmptyInput)
    }
}
