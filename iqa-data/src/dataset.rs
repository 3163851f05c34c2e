//! BAPPS dataset implementation.
//!
//! The BAPPS benchmark was introduced in "The Unreasonable Effectiveness of
//! Deep Features as a Perceptual Metric" (Zhang et al., CVPR 2018). Each 2AFC
//! row is a triplet (reference, distortion A, distortion B) with the fraction
//! of judges preferring A; each JND row is a pair (A, B) with the fraction of
//! judges who saw them as the same.
//!
//! Following Burn's convention, the dataset returns raw image data and the
//! batcher handles tensor creation and device placement.

use std::{
    marker::PhantomData,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

use burn::{
    data::{dataloader::batcher::Batcher, dataset::Dataset},
    tensor::{backend::Backend, Tensor, TensorData},
};
use image::DynamicImage;
use rand::{rngs::StdRng, SeedableRng};

use crate::{
    config::BappsDatasetConfig,
    error::{DatasetError, DatasetResult},
    meta::{load_split, MetaRecord, MetaTable},
    transforms::{ImageData, PairedTransforms},
};

/// A single BAPPS sample.
///
/// `reference` and `reference_path` are `None` for JND rows.
#[derive(Debug, Clone)]
pub struct BappsItem {
    pub reference: Option<ImageData>,
    pub dist_a: ImageData,
    pub dist_b: ImageData,
    /// Single-element preference label.
    pub label: Vec<f32>,
    pub reference_path: Option<PathBuf>,
    pub dist_a_path: PathBuf,
    pub dist_b_path: PathBuf,
}

impl BappsItem {
    pub fn is_jnd(&self) -> bool {
        self.reference.is_none()
    }
}

/// A batch of BAPPS samples.
#[derive(Debug, Clone)]
pub struct BappsBatch<B: Backend> {
    /// `[B, 3, H, W]`; present only when every item of the batch has a reference.
    pub reference: Option<Tensor<B, 4>>,
    /// `[B, 3, H, W]`
    pub dist_a: Tensor<B, 4>,
    /// `[B, 3, H, W]`
    pub dist_b: Tensor<B, 4>,
    /// `[B, 1]`
    pub labels: Tensor<B, 2>,
    pub reference_paths: Vec<Option<PathBuf>>,
    pub dist_a_paths: Vec<PathBuf>,
    pub dist_b_paths: Vec<PathBuf>,
}

/// Batcher converting [`BappsItem`]s into a [`BappsBatch`].
#[derive(Clone, Default)]
pub struct BappsBatcher<B: Backend> {
    _phantom: PhantomData<B>,
}

impl<B: Backend> BappsBatcher<B> {
    pub const fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<B: Backend> Batcher<B, BappsItem, BappsBatch<B>> for BappsBatcher<B> {
    fn batch(&self, items: Vec<BappsItem>, device: &B::Device) -> BappsBatch<B> {
        let batch_size = items.len();
        let with_reference = items.iter().all(|item| item.reference.is_some());

        let mut references = Vec::with_capacity(batch_size);
        let mut dist_a = Vec::with_capacity(batch_size);
        let mut dist_b = Vec::with_capacity(batch_size);
        let mut labels = Vec::with_capacity(batch_size);
        let mut reference_paths = Vec::with_capacity(batch_size);
        let mut dist_a_paths = Vec::with_capacity(batch_size);
        let mut dist_b_paths = Vec::with_capacity(batch_size);

        for item in items {
            if with_reference {
                if let Some(reference) = item.reference {
                    references.push(reference.to_tensor::<B>(device));
                }
            }
            dist_a.push(item.dist_a.to_tensor::<B>(device));
            dist_b.push(item.dist_b.to_tensor::<B>(device));

            let label_len = item.label.len();
            labels.push(Tensor::<B, 2>::from_data(
                TensorData::new(item.label, [1, label_len]),
                device,
            ));

            reference_paths.push(item.reference_path);
            dist_a_paths.push(item.dist_a_path);
            dist_b_paths.push(item.dist_b_path);
        }

        let reference = (with_reference && !references.is_empty())
            .then(|| Tensor::stack(references, 0));

        BappsBatch {
            reference,
            dist_a: Tensor::stack(dist_a, 0),
            dist_b: Tensor::stack(dist_b, 0),
            labels: Tensor::cat(labels, 0),
            reference_paths,
            dist_a_paths,
            dist_b_paths,
        }
    }
}

/// BAPPS dataset serving 2AFC triplets or JND pairs.
#[derive(Debug)]
pub struct BappsDataset {
    records: Vec<MetaRecord>,
    dataroot: PathBuf,
    transforms: PairedTransforms,
    seed: u64,
    draws: AtomicU64,
}

impl BappsDataset {
    /// Create a new BAPPS dataset.
    ///
    /// Rows are loaded from the metadata file, reduced to the configured split
    /// (indices into the unfiltered table), then filtered by mode and by
    /// category, in that order.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the metadata or split
    /// file cannot be read, or the split does not exist.
    pub fn new(config: &BappsDatasetConfig) -> DatasetResult<Self> {
        config.validate()?;

        let mut table = MetaTable::load(&config.meta_info_file)?;

        if let Some(split_file) = &config.split_file {
            let rows = load_split(split_file, config.split_index, config.effective_phase())?;
            table = table.select(&rows)?;
        }

        table = table.filter_mode(config.mode);

        if let Some(val_types) = &config.val_types {
            table = table.filter_categories(val_types);
        }

        log::info!(
            "Loaded {} {} rows for phase '{}' from {}",
            table.len(),
            config.mode,
            config.effective_phase(),
            config.meta_info_file.display()
        );

        Ok(Self::from_records(
            table.into_records(),
            config.dataroot_target.clone(),
            PairedTransforms::from_specs(&config.augment),
            config.seed.unwrap_or_else(rand::random),
        ))
    }

    /// Create a dataset from already filtered rows.
    pub fn from_records(
        records: Vec<MetaRecord>,
        dataroot: PathBuf,
        transforms: PairedTransforms,
        seed: u64,
    ) -> Self {
        Self {
            records,
            dataroot,
            transforms,
            seed,
            draws: AtomicU64::new(0),
        }
    }

    pub fn records(&self) -> &[MetaRecord] {
        &self.records
    }

    pub fn dataroot(&self) -> &Path {
        &self.dataroot
    }

    /// Load the sample at `index`, drawing fresh augmentation parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if `index` is out of bounds, an image cannot be
    /// decoded, or a transform fails.
    pub fn try_get(&self, index: usize) -> DatasetResult<BappsItem> {
        let draw = self.draws.fetch_add(1, Ordering::Relaxed);
        self.get_with_seed(index, self.seed.wrapping_add(draw))
    }

    /// Load the sample at `index` with augmentation randomness seeded by `seed`.
    pub fn get_with_seed(&self, index: usize, seed: u64) -> DatasetResult<BappsItem> {
        let record = self
            .records
            .get(index)
            .ok_or(DatasetError::IndexOutOfBounds {
                index,
                len: self.records.len(),
            })?;

        let dist_a_path = self.dataroot.join(&record.dist_a);
        let dist_b_path = self.dataroot.join(&record.dist_b);
        let reference_path = record
            .reference()
            .map(|reference| self.dataroot.join(reference));

        let mut images = vec![load_rgb(&dist_a_path)?, load_rgb(&dist_b_path)?];
        if let Some(path) = &reference_path {
            images.push(load_rgb(path)?);
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut images = self.transforms.apply(images, &mut rng)?.into_iter();

        let (Some(dist_a), Some(dist_b)) = (images.next(), images.next()) else {
            return Err(DatasetError::EmptyImageList);
        };
        let reference = images.next();

        Ok(BappsItem {
            reference,
            dist_a,
            dist_b,
            label: vec![record.score as f32],
            reference_path,
            dist_a_path,
            dist_b_path,
        })
    }
}

/// Decode an image file as 8-bit RGB.
fn load_rgb(path: &Path) -> DatasetResult<DynamicImage> {
    let image = image::open(path).map_err(|e| DatasetError::ImageOpenFailed {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(DynamicImage::ImageRgb8(image.to_rgb8()))
}

impl Dataset<BappsItem> for BappsDataset {
    fn get(&self, index: usize) -> Option<BappsItem> {
        match self.try_get(index) {
            Ok(item) => Some(item),
            Err(e) => {
                log::warn!("Failed to load BAPPS sample {index}: {e}");
                None
            }
        }
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}
