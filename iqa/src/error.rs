use iqa_data::DatasetError;
use iqa_metric::MetricError;
use thiserror::Error;

/// The error type for registry lookups and the operations they dispatch to.
#[derive(Error, Debug)]
pub enum IqaError {
    /// Error for when no entry is registered under the requested name.
    #[error("Unknown {kind} '{name}'. Available: {}", available.join(", "))]
    UnknownEntry {
        /// What the registry holds (`"dataset"`, `"metric"`).
        kind: &'static str,
        /// The requested name.
        name: String,
        /// Registered names, sorted.
        available: Vec<&'static str>,
    },

    /// Error for when a name is registered twice.
    #[error("{kind} '{name}' is already registered")]
    DuplicateEntry {
        /// What the registry holds.
        kind: &'static str,
        /// The conflicting name.
        name: &'static str,
    },

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Metric(#[from] MetricError),
}

/// A specialized `Result` type for this crate.
pub type IqaResult<T> = Result<T, IqaError>;
