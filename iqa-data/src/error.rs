//! Error types specific to the iqa-data crate.
//!
//! This module provides dataset-specific error handling for metadata parsing,
//! split selection, image decoding and paired transforms.

use std::path::PathBuf;

use thiserror::Error;

/// Error type for dataset operations in iqa-data.
#[derive(Error, Debug)]
pub enum DatasetError {
    /// Error when the metadata table cannot be opened or read.
    #[error("Failed to read metadata file: {path}")]
    MetaReadFailed {
        /// The metadata file path.
        path: PathBuf,
        /// The underlying CSV/IO error.
        #[source]
        source: csv::Error,
    },

    /// Error when a metadata row does not match `[tag_or_ref, distA, distB, score]`.
    #[error("Malformed metadata row {row} in {path}")]
    MetaParseFailed {
        /// The metadata file path.
        path: PathBuf,
        /// Zero-based data row (header excluded).
        row: usize,
        /// The underlying deserialization error.
        #[source]
        source: csv::Error,
    },

    /// Error when the split file cannot be opened.
    #[error("Failed to read split file: {path}")]
    SplitReadFailed {
        /// The split file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Error when the split file is not a `{index: {phase: [rows]}}` mapping.
    #[error("Failed to parse split file: {path}")]
    SplitParseFailed {
        /// The split file path.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Error when the requested split index or phase is absent from the split file.
    #[error("Split {split_index} has no entry for phase '{phase}'")]
    SplitNotFound {
        /// The requested split index.
        split_index: usize,
        /// The requested phase.
        phase: String,
    },

    /// Error when a split references a row that the metadata table does not have.
    #[error("Split row index {index} out of range for metadata table with {len} rows")]
    SplitIndexOutOfRange {
        /// The offending row index.
        index: usize,
        /// Number of rows in the unfiltered table.
        len: usize,
    },

    /// Error when the dataset mode string is not recognized.
    #[error("Invalid dataset mode: '{mode}' (expected '2afc' or 'jnd')")]
    InvalidMode {
        /// The rejected mode string.
        mode: String,
    },

    /// Error when configuration parameters are logically inconsistent.
    #[error("Invalid dataset configuration: {reason}")]
    InvalidConfiguration {
        /// The reason why the configuration is invalid.
        reason: String,
    },

    /// Error when a sample index is outside `[0, len)`.
    #[error("Index {index} out of bounds for dataset of length {len}")]
    IndexOutOfBounds {
        /// The requested index.
        index: usize,
        /// The dataset length.
        len: usize,
    },

    /// Error when opening or decoding an image file fails.
    #[error("Failed to open image: {path}")]
    ImageOpenFailed {
        /// The image file path that failed to open.
        path: PathBuf,
        /// The underlying image processing error.
        #[source]
        source: image::ImageError,
    },

    /// Error when images passed through one paired transform differ in size.
    #[error("Paired images must share dimensions: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// `(width, height)` of the first image.
        expected: (u32, u32),
        /// `(width, height)` of the mismatching image.
        actual: (u32, u32),
    },

    /// Error when a crop window is larger than the image.
    #[error("Crop size {crop:?} exceeds image size {image:?}")]
    CropTooLarge {
        /// Requested `(height, width)`.
        crop: (u32, u32),
        /// Image `(height, width)`.
        image: (u32, u32),
    },

    /// Error when a paired transform receives no images.
    #[error("Paired transform received an empty image list")]
    EmptyImageList,
}

/// A specialized `Result` type for dataset operations.
pub type DatasetResult<T> = Result<T, DatasetError>;
