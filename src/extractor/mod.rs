//! Final validation gate, cropping and encoding of accepted regions.
//!
//! The gate runs after classification: regions must sit inside the image,
//! be large enough to be useful, not swallow most of the canvas, and carry
//! enough detector (and, when present, classifier) confidence. Survivors
//! are sorted by confidence and encoded as standalone PNGs.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, RgbaImage, imageops};
use tracing::{debug, warn};

use crate::domain::region::{EnhancedDesignRegion, ExtractedDesign};
use crate::processors::geometry::Rect;

const PNG_CONTENT_TYPE: &str = "image/png";
const UNKNOWN_CATEGORY: &str = "unknown";

/// Crops a region out of `image`, clamped to the image bounds.
///
/// Returns `None` when nothing of the region lies inside the image.
pub fn crop_region(image: &RgbaImage, rect: &Rect) -> Option<RgbaImage> {
    let clamped = rect.clamp_to(image.width(), image.height())?;
    Some(imageops::crop_imm(image, clamped.x, clamped.y, clamped.width, clamped.height).to_image())
}

/// Extractor applying the validation gate and producing encoded designs.
#[derive(Debug, Clone)]
pub struct DesignExtractor {
    min_size: u32,
    max_extent_fraction: f32,
    min_confidence: f32,
    min_category_confidence: f32,
}

impl DesignExtractor {
    /// Creates an extractor with the given gate thresholds.
    pub fn new(
        min_size: u32,
        max_extent_fraction: f32,
        min_confidence: f32,
        min_category_confidence: f32,
    ) -> Self {
        Self {
            min_size,
            max_extent_fraction,
            min_confidence,
            min_category_confidence,
        }
    }

    /// Returns true when a region passes the extraction gate.
    pub fn passes_gate(
        &self,
        enhanced: &EnhancedDesignRegion,
        image_width: u32,
        image_height: u32,
    ) -> bool {
        let region = &enhanced.region;
        if !region.fits_within(image_width, image_height) {
            return false;
        }
        if region.width < self.min_size || region.height < self.min_size {
            return false;
        }
        let max_width = image_width as f32 * self.max_extent_fraction;
        let max_height = image_height as f32 * self.max_extent_fraction;
        if region.width as f32 > max_width || region.height as f32 > max_height {
            return false;
        }
        if region.confidence < self.min_confidence {
            return false;
        }
        if let Some(category_confidence) = enhanced.category_confidence
            && category_confidence < self.min_category_confidence
        {
            return false;
        }
        true
    }

    /// Crops and encodes every region that passes the gate, highest
    /// confidence first. A region that fails to encode is skipped with a
    /// warning rather than failing the batch.
    pub fn extract(
        &self,
        image: &RgbaImage,
        regions: &[EnhancedDesignRegion],
    ) -> Vec<ExtractedDesign> {
        let mut accepted: Vec<&EnhancedDesignRegion> = regions
            .iter()
            .filter(|r| self.passes_gate(r, image.width(), image.height()))
            .collect();
        accepted.sort_by(|a, b| {
            b.region
                .confidence
                .partial_cmp(&a.region.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        debug!(
            accepted = accepted.len(),
            rejected = regions.len() - accepted.len(),
            "extraction gate applied"
        );

        let mut designs = Vec::with_capacity(accepted.len());
        for enhanced in accepted {
            let rect = Rect::from(&enhanced.region);
            let Some(crop) = crop_region(image, &rect) else {
                warn!(region = ?enhanced.region, "region vanished during crop, skipping");
                continue;
            };

            let mut bytes = Cursor::new(Vec::new());
            if let Err(e) =
                DynamicImage::ImageRgba8(crop.clone()).write_to(&mut bytes, ImageFormat::Png)
            {
                warn!(region = ?enhanced.region, error = %e, "failed to encode region, skipping");
                continue;
            }

            designs.push(ExtractedDesign {
                id: format!("design_{}", designs.len() + 1),
                category: enhanced
                    .category
                    .clone()
                    .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string()),
                confidence: enhanced.region.confidence,
                x: enhanced.region.x,
                y: enhanced.region.y,
                width: crop.width(),
                height: crop.height(),
                image_bytes: bytes.into_inner(),
                content_type: PNG_CONTENT_TYPE.to_string(),
            });
        }
        designs
    }
}
