//! Configuration for the BAPPS dataset.

use std::{fmt, path::PathBuf, str::FromStr};

use burn::config::Config;
use serde::{Deserialize, Serialize};

use crate::error::{DatasetError, DatasetResult};

/// Metadata tag marking a just-noticeable-difference row.
pub const JND_TAG: &str = "jnd";

/// Which kind of BAPPS judgment the dataset serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DatasetMode {
    /// Two-alternative forced choice triplets (reference, distortion A, distortion B).
    #[default]
    #[serde(rename = "2afc")]
    TwoAfc,
    /// Just-noticeable-difference pairs without a reference.
    #[serde(rename = "jnd")]
    Jnd,
}

impl DatasetMode {
    /// Whether a row with the given tag belongs to this mode.
    pub fn keeps(&self, tag: &str) -> bool {
        match self {
            Self::TwoAfc => tag != JND_TAG,
            Self::Jnd => tag == JND_TAG,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TwoAfc => "2afc",
            Self::Jnd => "jnd",
        }
    }
}

impl FromStr for DatasetMode {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "2afc" => Ok(Self::TwoAfc),
            "jnd" => Ok(Self::Jnd),
            _ => Err(DatasetError::InvalidMode { mode: s.to_owned() }),
        }
    }
}

impl fmt::Display for DatasetMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Spatial size parameter: a single edge length or an explicit `[height, width]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Size {
    Square(u32),
    Rect([u32; 2]),
}

impl Size {
    /// `(height, width)` of the size. A square size returns the same value twice.
    pub const fn dims(&self) -> (u32, u32) {
        match *self {
            Self::Square(n) => (n, n),
            Self::Rect([h, w]) => (h, w),
        }
    }
}

/// One augmentation step, written as a single-key object `{name: params}`.
///
/// ```json
/// "augment": [{"hflip": true}, {"random_crop": 48}, {"resize": [64, 64]}]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformSpec {
    /// Random horizontal flip with probability 0.5, when enabled.
    Hflip(bool),
    /// Random vertical flip with probability 0.5, when enabled.
    Vflip(bool),
    /// Random rotation by a multiple of 90 degrees, when enabled.
    Rot90(bool),
    /// Random crop to the given size.
    RandomCrop(Size),
    /// Center crop to the given size.
    CenterCrop(Size),
    /// Resize: a square size scales the shorter side, a rect size is exact.
    Resize(Size),
}

impl TransformSpec {
    /// Name of the step as it appears in configuration files.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Hflip(_) => "hflip",
            Self::Vflip(_) => "vflip",
            Self::Rot90(_) => "rot90",
            Self::RandomCrop(_) => "random_crop",
            Self::CenterCrop(_) => "center_crop",
            Self::Resize(_) => "resize",
        }
    }
}

/// Configuration of [`BappsDataset`](crate::BappsDataset).
#[derive(Config, Debug)]
pub struct BappsDatasetConfig {
    /// Phase name used to select rows from the split file (`train`, `val`, `test`).
    pub phase: String,
    /// Replaces `phase` when set.
    #[config(default = "None")]
    pub override_phase: Option<String>,
    #[config(default = "DatasetMode::TwoAfc")]
    pub mode: DatasetMode,
    /// Category substrings; rows whose distortion A path contains one are kept.
    #[config(default = "None")]
    pub val_types: Option<Vec<String>>,
    /// Root directory the metadata paths are relative to.
    pub dataroot_target: PathBuf,
    /// Metadata CSV with `[tag_or_ref, distA, distB, score]` rows.
    pub meta_info_file: PathBuf,
    #[config(default = "None")]
    pub split_file: Option<PathBuf>,
    #[config(default = 1)]
    pub split_index: usize,
    /// Augmentation steps applied before tensor conversion, in order.
    #[config(default = "Vec::new()")]
    pub augment: Vec<TransformSpec>,
    /// Seed for augmentation randomness. A random seed is drawn when absent.
    #[config(default = "None")]
    pub seed: Option<u64>,
}

impl BappsDatasetConfig {
    /// The phase actually used for split selection.
    pub fn effective_phase(&self) -> &str {
        self.override_phase.as_deref().unwrap_or(&self.phase)
    }

    /// Check the configuration for logically inconsistent parameters.
    pub fn validate(&self) -> DatasetResult<()> {
        if self.effective_phase().is_empty() {
            return Err(DatasetError::InvalidConfiguration {
                reason: "phase must not be empty".to_owned(),
            });
        }

        for spec in &self.augment {
            if let TransformSpec::RandomCrop(size)
            | TransformSpec::CenterCrop(size)
            | TransformSpec::Resize(size) = spec
            {
                let (h, w) = size.dims();
                if h == 0 || w == 0 {
                    return Err(DatasetError::InvalidConfiguration {
                        reason: format!("{} size must be non-zero, got {size:?}", spec.name()),
                    });
                }
            }
        }

        Ok(())
    }
}
