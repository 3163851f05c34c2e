//! Paired image transforms.
//!
//! Every transform takes the full list of images of one sample (distortion A,
//! distortion B and, for 2AFC rows, the reference) and draws its random
//! parameters once, so all images of the sample stay spatially aligned.
//!
//! Available steps:
//! 1. Horizontal flip (`hflip`) - 50% probability
//! 2. Vertical flip (`vflip`) - 50% probability
//! 3. Quarter-turn rotation (`rot90`) - uniform over 0/90/180/270 degrees
//! 4. Random crop (`random_crop`)
//! 5. Center crop (`center_crop`)
//! 6. Resize (`resize`) - shorter side for a single size, exact for `[h, w]`
//!
//! The pipeline always ends with [`PairedToTensor`], which converts the images
//! to float data in `[0, 1]`.

use std::fmt;

use burn::tensor::{backend::Backend, Tensor, TensorData};
use image::{imageops::FilterType, DynamicImage, GenericImageView};
use rand::{rngs::StdRng, Rng};

use crate::{
    config::{Size, TransformSpec},
    error::{DatasetError, DatasetResult},
};

/// Decoded image as raw HWC float data in `[0, 1]`.
///
/// Datasets return raw data; tensors are created by the batcher on the target device.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    /// RGB pixel data in `[H, W, C]` order.
    pub data: Vec<f32>,
    pub height: usize,
    pub width: usize,
}

impl ImageData {
    /// Convert to a `[3, H, W]` tensor.
    pub fn to_tensor<B: Backend>(self, device: &B::Device) -> Tensor<B, 3> {
        let data = TensorData::new(self.data, [self.height, self.width, 3]);
        // HWC to CHW
        Tensor::<B, 3>::from_data(data, device).permute([2, 0, 1])
    }

    /// Minimum, maximum and mean over all channels.
    pub fn stats(&self) -> ImageDataStats {
        let (min, max, sum) = self.data.iter().fold(
            (f32::INFINITY, f32::NEG_INFINITY, 0.0f64),
            |(min, max, sum), &v| (min.min(v), max.max(v), sum + f64::from(v)),
        );
        ImageDataStats {
            min,
            max,
            mean: (sum / self.data.len().max(1) as f64) as f32,
        }
    }

    /// RGB value at column `x`, row `y`.
    pub fn pixel(&self, x: usize, y: usize) -> [f32; 3] {
        let offset = (y * self.width + x) * 3;
        [
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
        ]
    }
}

/// Pixel value summary of an [`ImageData`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageDataStats {
    pub min: f32,
    pub max: f32,
    pub mean: f32,
}

/// A transform applied atomically to all images of one sample.
pub trait PairedTransform: Send + Sync + fmt::Debug {
    /// Transform `images`, drawing random parameters from `rng` once for the whole list.
    fn apply(&self, images: Vec<DynamicImage>, rng: &mut StdRng)
        -> DatasetResult<Vec<DynamicImage>>;
}

/// Returns the shared `(width, height)` of `images`.
fn shared_dimensions(images: &[DynamicImage]) -> DatasetResult<(u32, u32)> {
    let first = images.first().ok_or(DatasetError::EmptyImageList)?;
    let expected = first.dimensions();

    for image in &images[1..] {
        let actual = image.dimensions();
        if actual != expected {
            return Err(DatasetError::ShapeMismatch { expected, actual });
        }
    }

    Ok(expected)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PairedHorizontalFlip;

impl PairedTransform for PairedHorizontalFlip {
    fn apply(
        &self,
        images: Vec<DynamicImage>,
        rng: &mut StdRng,
    ) -> DatasetResult<Vec<DynamicImage>> {
        shared_dimensions(&images)?;
        if rng.random_bool(0.5) {
            Ok(images.iter().map(DynamicImage::fliph).collect())
        } else {
            Ok(images)
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PairedVerticalFlip;

impl PairedTransform for PairedVerticalFlip {
    fn apply(
        &self,
        images: Vec<DynamicImage>,
        rng: &mut StdRng,
    ) -> DatasetResult<Vec<DynamicImage>> {
        shared_dimensions(&images)?;
        if rng.random_bool(0.5) {
            Ok(images.iter().map(DynamicImage::flipv).collect())
        } else {
            Ok(images)
        }
    }
}

/// Rotates every image by the same random number of quarter turns.
#[derive(Debug, Clone, Copy, Default)]
pub struct PairedRandomRot90;

impl PairedTransform for PairedRandomRot90 {
    fn apply(
        &self,
        images: Vec<DynamicImage>,
        rng: &mut StdRng,
    ) -> DatasetResult<Vec<DynamicImage>> {
        shared_dimensions(&images)?;
        let quarter_turns = rng.random_range(0..4u8);
        let rotated = match quarter_turns {
            1 => images.iter().map(DynamicImage::rotate90).collect(),
            2 => images.iter().map(DynamicImage::rotate180).collect(),
            3 => images.iter().map(DynamicImage::rotate270).collect(),
            _ => images,
        };
        Ok(rotated)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PairedRandomCrop {
    pub height: u32,
    pub width: u32,
}

impl PairedRandomCrop {
    pub const fn new(size: Size) -> Self {
        let (height, width) = size.dims();
        Self { height, width }
    }
}

impl PairedTransform for PairedRandomCrop {
    fn apply(
        &self,
        images: Vec<DynamicImage>,
        rng: &mut StdRng,
    ) -> DatasetResult<Vec<DynamicImage>> {
        let (width, height) = shared_dimensions(&images)?;
        check_crop(self.height, self.width, height, width)?;

        let top = rng.random_range(0..=height - self.height);
        let left = rng.random_range(0..=width - self.width);

        Ok(images
            .iter()
            .map(|image| image.crop_imm(left, top, self.width, self.height))
            .collect())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PairedCenterCrop {
    pub height: u32,
    pub width: u32,
}

impl PairedCenterCrop {
    pub const fn new(size: Size) -> Self {
        let (height, width) = size.dims();
        Self { height, width }
    }
}

impl PairedTransform for PairedCenterCrop {
    fn apply(
        &self,
        images: Vec<DynamicImage>,
        _rng: &mut StdRng,
    ) -> DatasetResult<Vec<DynamicImage>> {
        let (width, height) = shared_dimensions(&images)?;
        check_crop(self.height, self.width, height, width)?;

        let top = (f64::from(height - self.height) / 2.0).round() as u32;
        let left = (f64::from(width - self.width) / 2.0).round() as u32;

        Ok(images
            .iter()
            .map(|image| image.crop_imm(left, top, self.width, self.height))
            .collect())
    }
}

fn check_crop(crop_h: u32, crop_w: u32, height: u32, width: u32) -> DatasetResult<()> {
    if crop_h > height || crop_w > width {
        return Err(DatasetError::CropTooLarge {
            crop: (crop_h, crop_w),
            image: (height, width),
        });
    }
    Ok(())
}

/// Bilinear resize. `Size::Square(n)` matches the shorter side to `n`.
#[derive(Debug, Clone, Copy)]
pub struct PairedResize {
    pub size: Size,
}

impl PairedResize {
    pub const fn new(size: Size) -> Self {
        Self { size }
    }

    /// Output `(width, height)` for an input of `(width, height)`.
    fn target_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        match self.size {
            Size::Rect([h, w]) => (w, h),
            Size::Square(short) => {
                if width <= height {
                    let long = (u64::from(short) * u64::from(height) / u64::from(width)) as u32;
                    (short, long)
                } else {
                    let long = (u64::from(short) * u64::from(width) / u64::from(height)) as u32;
                    (long, short)
                }
            }
        }
    }
}

impl PairedTransform for PairedResize {
    fn apply(
        &self,
        images: Vec<DynamicImage>,
        _rng: &mut StdRng,
    ) -> DatasetResult<Vec<DynamicImage>> {
        let (width, height) = shared_dimensions(&images)?;
        let (target_w, target_h) = self.target_dimensions(width, height);

        if (target_w, target_h) == (width, height) {
            return Ok(images);
        }

        Ok(images
            .iter()
            .map(|image| image.resize_exact(target_w, target_h, FilterType::Triangle))
            .collect())
    }
}

/// Final conversion of same-shaped images to `[0, 1]` float data.
#[derive(Debug, Clone, Copy, Default)]
pub struct PairedToTensor;

impl PairedToTensor {
    pub fn apply(&self, images: Vec<DynamicImage>) -> DatasetResult<Vec<ImageData>> {
        let (width, height) = shared_dimensions(&images)?;

        Ok(images
            .into_iter()
            .map(|image| ImageData {
                data: image.to_rgb32f().into_raw(),
                height: height as usize,
                width: width as usize,
            })
            .collect())
    }
}

/// Build the transform for one configured step; disabled boolean steps yield `None`.
pub fn transform_mapping(spec: &TransformSpec) -> Option<Box<dyn PairedTransform>> {
    match *spec {
        TransformSpec::Hflip(true) => Some(Box::new(PairedHorizontalFlip)),
        TransformSpec::Vflip(true) => Some(Box::new(PairedVerticalFlip)),
        TransformSpec::Rot90(true) => Some(Box::new(PairedRandomRot90)),
        TransformSpec::Hflip(false) | TransformSpec::Vflip(false) | TransformSpec::Rot90(false) => {
            None
        }
        TransformSpec::RandomCrop(size) => Some(Box::new(PairedRandomCrop::new(size))),
        TransformSpec::CenterCrop(size) => Some(Box::new(PairedCenterCrop::new(size))),
        TransformSpec::Resize(size) => Some(Box::new(PairedResize::new(size))),
    }
}

/// Ordered augmentation steps followed by the mandatory tensor conversion.
#[derive(Debug, Default)]
pub struct PairedTransforms {
    steps: Vec<Box<dyn PairedTransform>>,
    to_tensor: PairedToTensor,
}

impl PairedTransforms {
    pub fn new(steps: Vec<Box<dyn PairedTransform>>) -> Self {
        Self {
            steps,
            to_tensor: PairedToTensor,
        }
    }

    pub fn from_specs(specs: &[TransformSpec]) -> Self {
        Self::new(specs.iter().filter_map(transform_mapping).collect())
    }

    /// Run all steps on `images` as one unit and convert the result.
    pub fn apply(
        &self,
        mut images: Vec<DynamicImage>,
        rng: &mut StdRng,
    ) -> DatasetResult<Vec<ImageData>> {
        for step in &self.steps {
            images = step.apply(images, rng)?;
        }
        self.to_tensor.apply(images)
    }

    /// Number of augmentation steps, excluding the tensor conversion.
    pub fn num_steps(&self) -> usize {
        self.steps.len()
    }
}
