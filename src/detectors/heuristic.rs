//! Heuristic design detection from raw pixel statistics.
//!
//! Three independent strategies run over the same image:
//!
//! - **edge**: Sobel magnitude, binarized and flood-filled into components
//! - **color**: regions whose colors differ from the dominant background
//! - **texture**: regions of high local intensity variance
//!
//! Each strategy yields labeled candidates with a fixed per-strategy
//! confidence; overlapping candidates are reconciled later by the merger.

use image::RgbaImage;
use itertools::Itertools;
use tracing::debug;

use crate::core::config::HeuristicConfig;
use crate::domain::region::{DesignRegion, DetectionSource};
use crate::processors::geometry::Rect;
use crate::processors::pixel::{
    BoolMask, connected_component_boxes, contrast_ratio, grayscale, local_variance_map,
    region_variance, sobel_magnitude,
};

const EDGE_LABEL: &str = "edge_detected";
const COLOR_LABEL: &str = "color_detected";
const TEXTURE_LABEL: &str = "texture_detected";

/// Stride between sampled pixels when building the color histogram.
const HISTOGRAM_SAMPLE_STEP: u32 = 4;
/// Seed stride for the color flood fill.
const COLOR_SCAN_STEP: u32 = 8;
/// Seed stride for the texture flood fill.
const TEXTURE_SCAN_STEP: u32 = 4;
/// Margin in pixels added around a color candidate when measuring contrast
/// against its surround.
const CONTRAST_MARGIN: u32 = 5;
/// Local variance window side length.
const VARIANCE_WINDOW: u32 = 3;

/// Quantizes an RGB triple to the 32-wide buckets the color histogram uses.
#[inline]
fn quantize_rgb(r: u8, g: u8, b: u8) -> [u8; 3] {
    [r / 32 * 32, g / 32 * 32, b / 32 * 32]
}

/// Detector running the edge, color and texture strategies.
#[derive(Debug, Clone)]
pub struct HeuristicDetector {
    config: HeuristicConfig,
}

impl HeuristicDetector {
    /// Creates a detector with the given configuration.
    pub fn new(config: HeuristicConfig) -> Self {
        Self { config }
    }

    /// Runs all three strategies and returns their candidates unmerged.
    pub fn detect(&self, image: &RgbaImage) -> Vec<DesignRegion> {
        let gray = grayscale(image);

        let edge_regions = self.detect_by_edges(image, &gray);
        debug!(count = edge_regions.len(), "edge strategy candidates");

        let color_regions = self.detect_by_color(image, &gray);
        debug!(count = color_regions.len(), "color strategy candidates");

        let texture_regions = self.detect_by_texture(&gray);
        debug!(count = texture_regions.len(), "texture strategy candidates");

        let mut regions = edge_regions;
        regions.extend(color_regions);
        regions.extend(texture_regions);
        regions
    }

    fn size_ok(&self, rect: &Rect) -> bool {
        let (min, max) = (self.config.min_design_size, self.config.max_design_size);
        rect.width >= min && rect.width <= max && rect.height >= min && rect.height <= max
    }

    fn detect_by_edges(&self, image: &RgbaImage, gray: &image::GrayImage) -> Vec<DesignRegion> {
        let magnitude = sobel_magnitude(gray);
        let threshold = self.config.edge_magnitude_threshold;
        let mask = BoolMask::from_fn(image.width(), image.height(), |x, y| {
            magnitude.get_pixel(x, y).0[0] > threshold
        });

        connected_component_boxes(&mask, 1, self.config.min_edge_component)
            .into_iter()
            .filter(|rect| self.size_ok(rect))
            .filter(|rect| mask.density_in(rect) > self.config.min_edge_density)
            .map(|rect| {
                DesignRegion::new(
                    rect.x,
                    rect.y,
                    rect.width,
                    rect.height,
                    self.config.edge_confidence,
                    EDGE_LABEL,
                    DetectionSource::Heuristic,
                )
            })
            .collect()
    }

    fn detect_by_color(&self, image: &RgbaImage, gray: &image::GrayImage) -> Vec<DesignRegion> {
        let dominant = self.dominant_colors(image);
        if dominant.is_empty() {
            return Vec::new();
        }

        let threshold_sq = self.config.color_distance_threshold * self.config.color_distance_threshold;
        // Distance is measured in quantized space so a background pixel
        // always matches its own histogram bucket.
        let is_background = |x: u32, y: u32| -> bool {
            let [r, g, b, _] = image.get_pixel(x, y).0;
            let [qr, qg, qb] = quantize_rgb(r, g, b);
            dominant.iter().any(|&[dr, dg, db]| {
                let dr = f32::from(qr) - f32::from(dr);
                let dg = f32::from(qg) - f32::from(dg);
                let db = f32::from(qb) - f32::from(db);
                dr * dr + dg * dg + db * db < threshold_sq
            })
        };
        let mask = BoolMask::from_fn(image.width(), image.height(), |x, y| !is_background(x, y));

        connected_component_boxes(&mask, COLOR_SCAN_STEP, self.config.min_color_component)
            .into_iter()
            .filter(|rect| self.size_ok(rect))
            .filter(|rect| {
                // Judge contrast against the surround, not just the region
                // interior, so solid-color designs pass.
                let surround = rect.expand(CONTRAST_MARGIN, image.width(), image.height());
                contrast_ratio(gray, &surround) > self.config.min_contrast_ratio
            })
            .map(|rect| {
                DesignRegion::new(
                    rect.x,
                    rect.y,
                    rect.width,
                    rect.height,
                    self.config.color_confidence,
                    COLOR_LABEL,
                    DetectionSource::Heuristic,
                )
            })
            .collect()
    }

    /// Finds the quantized colors that dominate the image.
    ///
    /// A color counts as dominant when it ranks in the top
    /// `dominant_color_count` by sample frequency and covers at least
    /// `min_background_fraction` of the sampled pixels, so large foreground
    /// shapes are not mistaken for background.
    fn dominant_colors(&self, image: &RgbaImage) -> Vec<[u8; 3]> {
        let mut histogram: std::collections::HashMap<[u8; 3], u32> =
            std::collections::HashMap::new();
        let mut samples = 0u32;
        for y in (0..image.height()).step_by(HISTOGRAM_SAMPLE_STEP as usize) {
            for x in (0..image.width()).step_by(HISTOGRAM_SAMPLE_STEP as usize) {
                let [r, g, b, _] = image.get_pixel(x, y).0;
                *histogram.entry(quantize_rgb(r, g, b)).or_insert(0) += 1;
                samples += 1;
            }
        }
        if samples == 0 {
            return Vec::new();
        }

        let min_count = (f64::from(samples) * f64::from(self.config.min_background_fraction)) as u32;
        histogram
            .into_iter()
            .sorted_by(|a, b| b.1.cmp(&a.1))
            .take(self.config.dominant_color_count)
            .filter(|&(_, count)| count >= min_count.max(1))
            .map(|(color, _)| color)
            .collect()
    }

    fn detect_by_texture(&self, gray: &image::GrayImage) -> Vec<DesignRegion> {
        let variance = local_variance_map(gray, VARIANCE_WINDOW);
        let width = gray.width();
        let threshold = self.config.variance_threshold;
        let mask = BoolMask::from_fn(width, gray.height(), |x, y| {
            variance[(y as usize) * (width as usize) + (x as usize)] > threshold
        });

        connected_component_boxes(&mask, TEXTURE_SCAN_STEP, self.config.min_texture_component)
            .into_iter()
            .filter(|rect| self.size_ok(rect))
            .filter(|rect| region_variance(gray, rect) > self.config.min_texture_variance)
            .map(|rect| {
                DesignRegion::new(
                    rect.x,
                    rect.y,
                    rect.width,
                    rect.height,
                    self.config.texture_confidence,
                    TEXTURE_LABEL,
                    DetectionSource::Heuristic,
                )
            })
            .collect()
    }
}
