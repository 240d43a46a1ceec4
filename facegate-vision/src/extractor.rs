use std::path::Path;

use anyhow::{Context, Result};
use image::DynamicImage;

use crate::face::{BoundingBox, Signature};

/// Face detection and feature extraction backend.
///
/// Implementations are expected to be expensive; run them before touching any
/// shared identity state.
pub trait FeatureExtractor {
    /// Detect faces, in detection order. May be empty.
    fn detect(&mut self, image: &DynamicImage) -> Result<Vec<BoundingBox>>;

    /// One signature per region, same order as `regions`.
    ///
    /// An empty result means extraction failed for every region.
    fn extract(&mut self, image: &DynamicImage, regions: &[BoundingBox]) -> Result<Vec<Signature>>;
}

impl<E: FeatureExtractor + ?Sized> FeatureExtractor for &mut E {
    fn detect(&mut self, image: &DynamicImage) -> Result<Vec<BoundingBox>> {
        (**self).detect(image)
    }

    fn extract(&mut self, image: &DynamicImage, regions: &[BoundingBox]) -> Result<Vec<Signature>> {
        (**self).extract(image, regions)
    }
}

/// Decode an image file into an RGB buffer
pub fn decode_image(path: &Path) -> Result<DynamicImage> {
    let img = image::open(path).with_context(|| format!("decoding image {}", path.display()))?;
    Ok(DynamicImage::ImageRgb8(img.to_rgb8()))
}

/// Decode an in-memory encoded image (PNG, JPEG, ...) into an RGB buffer
pub fn decode_image_bytes(bytes: &[u8]) -> Result<DynamicImage> {
    let img = image::load_from_memory(bytes).context("decoding image bytes")?;
    Ok(DynamicImage::ImageRgb8(img.to_rgb8()))
}
