//! # IQA Data
//!
//! Dataset loading for perceptual similarity benchmarks, implemented for the
//! Burn framework.
//!
//! - [`BappsDataset`]: 2AFC triplets and JND pairs of the BAPPS benchmark,
//!   selected by split, mode and category.
//! - [`PairedTransforms`]: augmentation applied atomically to all images of a
//!   sample so references and distortions stay aligned.
//! - [`BappsBatcher`]: stacks samples into `[B, 3, H, W]` tensors.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use iqa_data::{BappsDataset, BappsDatasetConfig, DatasetMode};
//! use burn::data::dataset::Dataset;
//!
//! let config = BappsDatasetConfig::new(
//!     "train".into(),
//!     "datasets/PerceptualSimilarity/dataset".into(),
//!     "datasets/meta_info/meta_info_BAPPSDataset.csv".into(),
//! )
//! .with_mode(DatasetMode::TwoAfc);
//!
//! let dataset = BappsDataset::new(&config)?;
//! let item = dataset.try_get(0)?;
//! println!("label: {:?}", item.label);
//! ```

pub mod config;
pub mod dataset;
pub mod error;
pub mod meta;
pub mod transforms;

pub use config::{BappsDatasetConfig, DatasetMode, Size, TransformSpec, JND_TAG};
pub use dataset::{BappsBatch, BappsBatcher, BappsDataset, BappsItem};
pub use error::{DatasetError, DatasetResult};
pub use meta::{MetaRecord, MetaTable};
pub use transforms::{ImageData, ImageDataStats, PairedTransform, PairedTransforms};
