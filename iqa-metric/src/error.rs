use thiserror::Error;

/// The error type for score correlation metrics.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetricError {
    /// Error for when predictions and ground truth differ in length.
    #[error("Length mismatch: {predictions} predictions vs {targets} targets")]
    LengthMismatch {
        /// Number of predicted scores.
        predictions: usize,
        /// Number of ground-truth scores.
        targets: usize,
    },

    /// Error for when a statistic needs more samples than provided.
    #[error("{metric} needs at least {required} samples, got {actual}")]
    InsufficientSamples {
        /// The metric that was computed.
        metric: &'static str,
        /// Minimum number of samples.
        required: usize,
        /// Number of samples provided.
        actual: usize,
    },

    /// Error for when the logistic curve fit does not converge.
    #[error("Curve fit failed after {evaluations} evaluations: {reason}")]
    FitFailed {
        /// Number of model evaluations performed.
        evaluations: usize,
        /// Why the solver stopped.
        reason: String,
    },

    /// Error for when a curve type name is not recognized.
    #[error("Invalid curve type: '{name}' (expected '4params' or '5params')")]
    InvalidCurveType {
        /// The rejected name.
        name: String,
    },

    /// Error for when a metric name is not recognized.
    #[error("Unknown metric: '{name}'")]
    UnknownMetric {
        /// The rejected name.
        name: String,
    },

    /// Error for when tensor data cannot be read back as floats.
    #[error("Tensor data conversion failed: {reason}")]
    TensorData {
        /// Description of the conversion failure.
        reason: String,
    },
}

/// A specialized `Result` type for metric computations.
pub type MetricResult<T> = Result<T, MetricError>;
