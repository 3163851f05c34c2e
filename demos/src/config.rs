//! Configuration for the `bapps_test` tool.

use std::path::PathBuf;

use iqa_burn::{BappsDatasetConfig, DatasetMode, TransformSpec};
use serde::{Deserialize, Deserializer, Serialize};

/// Settings read from the optional `--config` JSON file; command-line flags
/// override individual fields.
///
/// Every field may be left out of the file. Missing dataset fields keep the
/// values of [`default_dataset`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BappsTestConfig {
    /// Dataset selection and augmentation.
    #[serde(deserialize_with = "dataset_with_defaults")]
    pub dataset: BappsDatasetConfig,
    /// Number of samples to inspect one by one.
    pub num_samples: usize,
    /// Batch size for the data loader test.
    pub batch_size: usize,
    /// Number of data loader workers.
    pub num_workers: usize,
    /// Number of batches to pull through the data loader.
    pub max_batches: usize,
    /// Shuffle seed for the data loader.
    pub shuffle_seed: u64,
}

impl Default for BappsTestConfig {
    fn default() -> Self {
        Self {
            dataset: default_dataset(),
            num_samples: 5,
            batch_size: 4,
            num_workers: 2,
            max_batches: 3,
            shuffle_seed: 42,
        }
    }
}

/// Validation split of the standard BAPPS download layout.
pub fn default_dataset() -> BappsDatasetConfig {
    BappsDatasetConfig::new(
        "val".to_owned(),
        "datasets/PerceptualSimilarity/dataset".into(),
        "datasets/meta_info/meta_info_BAPPSDataset.csv".into(),
    )
}

/// Dataset fields that replace the current value when present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatasetOverrides {
    pub phase: Option<String>,
    pub override_phase: Option<String>,
    pub mode: Option<DatasetMode>,
    pub val_types: Option<Vec<String>>,
    pub dataroot_target: Option<PathBuf>,
    pub meta_info_file: Option<PathBuf>,
    pub split_file: Option<PathBuf>,
    pub split_index: Option<usize>,
    pub augment: Option<Vec<TransformSpec>>,
    pub seed: Option<u64>,
}

impl DatasetOverrides {
    pub fn apply_to(self, config: &mut BappsDatasetConfig) {
        if let Some(phase) = self.phase {
            config.phase = phase;
        }
        if self.override_phase.is_some() {
            config.override_phase = self.override_phase;
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if self.val_types.is_some() {
            config.val_types = self.val_types;
        }
        if let Some(path) = self.dataroot_target {
            config.dataroot_target = path;
        }
        if let Some(path) = self.meta_info_file {
            config.meta_info_file = path;
        }
        if self.split_file.is_some() {
            config.split_file = self.split_file;
        }
        if let Some(index) = self.split_index {
            config.split_index = index;
        }
        if let Some(augment) = self.augment {
            config.augment = augment;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
    }
}

fn dataset_with_defaults<'de, D>(deserializer: D) -> Result<BappsDatasetConfig, D::Error>
where
    D: Deserializer<'de>,
{
    let overrides = DatasetOverrides::deserialize(deserializer)?;
    let mut config = default_dataset();
    overrides.apply_to(&mut config);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    #[test]
    fn parses_partial_dataset_config() {
        let json = r#"{
            "dataset": {
                "phase": "train",
                "mode": "jnd",
                "dataroot_target": "data/bapps",
                "meta_info_file": "data/meta.csv",
                "augment": [{"hflip": true}, {"random_crop": 64}]
            },
            "num_samples": 2,
            "batch_size": 8,
            "num_workers": 0,
            "max_batches": 1,
            "shuffle_seed": 7
        }"#;

        let config: BappsTestConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.dataset.phase, "train");
        assert_eq!(config.dataset.mode, DatasetMode::Jnd);
        assert_eq!(config.dataset.split_index, 1);
        assert_eq!(config.dataset.split_file, None);
        assert_eq!(config.dataset.seed, None);
        assert_eq!(config.dataset.dataroot_target, Path::new("data/bapps"));
        assert_eq!(config.dataset.augment.len(), 2);
        assert!(matches!(config.dataset.augment[0], TransformSpec::Hflip(true)));
        assert_eq!(config.batch_size, 8);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config: BappsTestConfig =
            serde_json::from_str(r#"{"dataset": {"split_index": 3}, "num_samples": 9}"#).unwrap();
        let defaults = BappsTestConfig::default();

        assert_eq!(config.dataset.split_index, 3);
        assert_eq!(config.dataset.phase, defaults.dataset.phase);
        assert_eq!(config.dataset.mode, DatasetMode::TwoAfc);
        assert_eq!(config.dataset.meta_info_file, defaults.dataset.meta_info_file);
        assert_eq!(config.num_samples, 9);
        assert_eq!(config.batch_size, defaults.batch_size);

        let empty: BappsTestConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.dataset.phase, "val");
        assert_eq!(empty.shuffle_seed, 42);
    }

    #[test]
    fn saved_config_loads_back() {
        let mut config = BappsTestConfig::default();
        config.dataset.split_index = 2;
        config.dataset.val_types = Some(vec!["cnn".to_owned()]);
        config.dataset.augment = vec![TransformSpec::Vflip(true)];

        let json = serde_json::to_string(&config).unwrap();
        let loaded: BappsTestConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(loaded.dataset.split_index, 2);
        assert_eq!(loaded.dataset.val_types, config.dataset.val_types);
        assert_eq!(loaded.dataset.augment, config.dataset.augment);
    }

    #[test]
    fn unknown_dataset_fields_are_rejected() {
        let result =
            serde_json::from_str::<BappsTestConfig>(r#"{"dataset": {"split_idx": 2}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn overrides_leave_unset_fields_alone() {
        let mut config = default_dataset().with_seed(Some(5));
        DatasetOverrides {
            mode: Some(DatasetMode::Jnd),
            split_file: Some("split.json".into()),
            ..Default::default()
        }
        .apply_to(&mut config);

        assert_eq!(config.mode, DatasetMode::Jnd);
        assert_eq!(config.split_file.as_deref(), Some(Path::new("split.json")));
        assert_eq!(config.seed, Some(5));
        assert_eq!(config.phase, "val");
    }
}
