//! # IQA-Burn
//!
//! Image quality assessment tooling for the Burn framework: the BAPPS
//! perceptual-similarity dataset loader ([`iqa_data`]) and the score
//! correlation metrics ([`iqa_metric`]), plus string-keyed registries that
//! let drivers pick either by name.
//!
//! ```rust,ignore
//! use iqa_burn::{build_dataset, calculate_metric, BappsDatasetConfig};
//!
//! let config = BappsDatasetConfig::new(
//!     "val".into(),
//!     "datasets/PerceptualSimilarity/dataset".into(),
//!     "datasets/meta_info/meta_info_BAPPSDataset.csv".into(),
//! );
//! let dataset = build_dataset("BAPPSDataset", config)?;
//!
//! let srcc = calculate_metric("calculate_srcc", &predictions, &mos, false)?;
//! ```

pub mod error;
pub mod registry;

pub use error::{IqaError, IqaResult};
pub use iqa_data::{
    self, BappsBatch, BappsBatcher, BappsDataset, BappsDatasetConfig, BappsItem, DatasetError,
    DatasetMode, ImageData, ImageDataStats, TransformSpec,
};
pub use iqa_metric::{
    self, calculate_krcc, calculate_plcc, calculate_rmse, calculate_srcc, fit_curve,
    CorrelationMetric, CorrelationReport, CurveType, MetricError, MetricResult, ScoreCollector,
};
pub use registry::{
    build_dataset, calculate_metric, DatasetFactory, Registry, DATASETS, METRICS,
};
