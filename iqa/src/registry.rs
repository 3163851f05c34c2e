//! Name-to-implementation lookup tables for datasets and metrics.
//!
//! Both tables are built on first access and are read-only afterwards.

use std::collections::BTreeMap;

use iqa_data::{BappsDataset, BappsDatasetConfig, DatasetResult};
use iqa_metric::CorrelationMetric;
use once_cell::sync::Lazy;

use crate::error::{IqaError, IqaResult};

/// Builds a dataset from its configuration.
pub type DatasetFactory = fn(BappsDatasetConfig) -> DatasetResult<BappsDataset>;

/// A string-keyed table of entries of one kind.
#[derive(Debug, Clone)]
pub struct Registry<T> {
    kind: &'static str,
    entries: BTreeMap<&'static str, T>,
}

impl<T> Registry<T> {
    /// An empty registry; `kind` names the entries in error messages.
    pub const fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: BTreeMap::new(),
        }
    }

    /// Add `entry` under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`IqaError::DuplicateEntry`] if `name` is taken; the existing
    /// entry is kept.
    pub fn register(&mut self, name: &'static str, entry: T) -> IqaResult<()> {
        if self.entries.contains_key(name) {
            return Err(IqaError::DuplicateEntry {
                kind: self.kind,
                name,
            });
        }
        self.entries.insert(name, entry);
        Ok(())
    }

    /// Look up `name`.
    ///
    /// # Errors
    ///
    /// Returns [`IqaError::UnknownEntry`] listing the registered names.
    pub fn get(&self, name: &str) -> IqaResult<&T> {
        self.entries.get(name).ok_or_else(|| IqaError::UnknownEntry {
            kind: self.kind,
            name: name.to_owned(),
            available: self.names(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &T)> {
        self.entries.iter().map(|(name, entry)| (*name, entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub const fn kind(&self) -> &'static str {
        self.kind
    }
}

fn register_all<T>(
    registry: &mut Registry<T>,
    entries: impl IntoIterator<Item = (&'static str, T)>,
) {
    for (name, entry) in entries {
        if let Err(e) = registry.register(name, entry) {
            log::error!("{e}");
        }
    }
}

fn bapps_dataset(config: BappsDatasetConfig) -> DatasetResult<BappsDataset> {
    BappsDataset::new(&config)
}

/// Dataset constructors by name.
pub static DATASETS: Lazy<Registry<DatasetFactory>> = Lazy::new(|| {
    let mut registry = Registry::new("dataset");
    register_all(
        &mut registry,
        [("BAPPSDataset", bapps_dataset as DatasetFactory)],
    );
    registry
});

/// Correlation metrics by name.
pub static METRICS: Lazy<Registry<CorrelationMetric>> = Lazy::new(|| {
    let mut registry = Registry::new("metric");
    register_all(
        &mut registry,
        CorrelationMetric::ALL.map(|metric| (metric.name(), metric)),
    );
    registry
});

/// Build the dataset registered under `name`.
///
/// # Errors
///
/// Fails if `name` is unknown or the dataset cannot be loaded.
pub fn build_dataset(name: &str, config: BappsDatasetConfig) -> IqaResult<BappsDataset> {
    let factory = DATASETS.get(name)?;
    Ok(factory(config)?)
}

/// Compute the metric registered under `name` on predictions `x` against
/// ground truth `y`.
///
/// # Errors
///
/// Fails if `name` is unknown or the metric rejects its inputs.
pub fn calculate_metric(name: &str, x: &[f64], y: &[f64], fit_scale: bool) -> IqaResult<f64> {
    let metric = METRICS.get(name)?;
    Ok(metric.compute(x, y, fit_scale)?)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use iqa_data::DatasetError;
    use iqa_metric::{calculate_krcc, calculate_plcc, MetricError};

    use super::*;

    #[test]
    fn default_registries_hold_every_entry() {
        assert_eq!(DATASETS.names(), vec!["BAPPSDataset"]);
        assert_eq!(
            METRICS.names(),
            vec!["calculate_krcc", "calculate_plcc", "calculate_rmse", "calculate_srcc"]
        );
        for (name, metric) in METRICS.iter() {
            assert_eq!(metric.name(), name);
        }
    }

    #[test]
    fn unknown_name_lists_available_entries() {
        let err = METRICS.get("calculate_mae").unwrap_err();
        match &err {
            IqaError::UnknownEntry {
                kind,
                name,
                available,
            } => {
                assert_eq!(*kind, "metric");
                assert_eq!(name, "calculate_mae");
                assert_eq!(available.len(), 4);
            }
            other => panic!("Expected UnknownEntry error, got {other:?}"),
        }
        assert!(err.to_string().contains("calculate_plcc"));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = Registry::new("metric");
        registry.register("plcc", CorrelationMetric::Plcc).unwrap();

        assert!(matches!(
            registry.register("plcc", CorrelationMetric::Srcc),
            Err(IqaError::DuplicateEntry { name: "plcc", .. })
        ));
        assert_eq!(*registry.get("plcc").unwrap(), CorrelationMetric::Plcc);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn metric_dispatch_matches_direct_calls() {
        let x = [0.3, 0.1, 0.9, 0.5, 0.7];
        let y = [2.0, 1.0, 4.0, 3.5, 3.0];

        assert_abs_diff_eq!(
            calculate_metric("calculate_plcc", &x, &y, false).unwrap(),
            calculate_plcc(&x, &y, false).unwrap(),
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(
            calculate_metric("calculate_krcc", &x, &y, true).unwrap(),
            calculate_krcc(&x, &y).unwrap(),
            epsilon = 1e-12
        );
        assert!(matches!(
            calculate_metric("calculate_srcc", &x, &y[..4], false),
            Err(IqaError::Metric(MetricError::LengthMismatch { .. }))
        ));
    }

    #[test]
    fn dataset_factory_surfaces_load_errors() {
        let missing = std::env::temp_dir().join("iqa_burn_registry_missing_meta.csv");
        let config = BappsDatasetConfig::new("train".into(), "unused".into(), missing);

        assert!(matches!(
            build_dataset("BAPPSDataset", config.clone()),
            Err(IqaError::Dataset(DatasetError::MetaReadFailed { .. }))
        ));
        assert!(matches!(
            build_dataset("PIPAL", config),
            Err(IqaError::UnknownEntry { kind: "dataset", .. })
        ));
    }
}
