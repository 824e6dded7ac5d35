//! Quality validation of extracted design crops.
//!
//! Scores five aspects of a crop (dimensions, content coverage,
//! transparency balance, edge sharpness, color variety), combines them into
//! a weighted overall score and emits advisory recommendations for the weak
//! aspects.

use std::collections::HashMap;

use image::RgbaImage;
use tracing::debug;

use crate::domain::quality::{QualityLevel, QualityReport};
use crate::domain::region::DesignRegion;

const DIMENSION_WEIGHT: f32 = 0.2;
const CONTENT_WEIGHT: f32 = 0.3;
const TRANSPARENCY_WEIGHT: f32 = 0.2;
const EDGE_WEIGHT: f32 = 0.15;
const COLOR_WEIGHT: f32 = 0.15;

/// Alpha at or below which a pixel counts as fully transparent.
const ALPHA_TRANSPARENT: u8 = 10;
/// Sub-score below which a recommendation is emitted.
const RECOMMENDATION_THRESHOLD: f32 = 0.7;

/// Validator producing a [`QualityReport`] per crop.
#[derive(Debug, Clone, Default)]
pub struct QualityValidator;

impl QualityValidator {
    /// Creates a validator.
    pub fn new() -> Self {
        Self
    }

    /// Scores `crop` against the region it was cut from.
    pub fn validate(&self, crop: &RgbaImage, region: &DesignRegion) -> QualityReport {
        let dimension_score = self.score_dimensions(crop, region);
        let content_score = self.score_content(crop);
        let transparency_score = self.score_transparency(crop);
        let edge_score = self.score_edges(crop);
        let color_score = self.score_colors(crop);

        let overall_score = dimension_score * DIMENSION_WEIGHT
            + content_score * CONTENT_WEIGHT
            + transparency_score * TRANSPARENCY_WEIGHT
            + edge_score * EDGE_WEIGHT
            + color_score * COLOR_WEIGHT;

        let report = QualityReport {
            dimension_score,
            content_score,
            transparency_score,
            edge_score,
            color_score,
            overall_score,
            quality_level: QualityLevel::from_score(overall_score),
            recommendations: Self::recommendations(
                dimension_score,
                content_score,
                transparency_score,
                edge_score,
                color_score,
            ),
        };
        debug!(
            overall = report.overall_score,
            level = ?report.quality_level,
            "quality validated"
        );
        report
    }

    /// Dimension plausibility: size floor, aspect sanity, match with the
    /// source region.
    fn score_dimensions(&self, crop: &RgbaImage, region: &DesignRegion) -> f32 {
        let (width, height) = crop.dimensions();
        if width < 20 || height < 20 {
            return 0.0;
        }
        let aspect = width as f32 / height as f32;
        if !(0.1..=10.0).contains(&aspect) {
            return 0.3;
        }
        if width != region.width || height != region.height {
            return 0.7;
        }
        1.0
    }

    /// Fraction of non-transparent pixels, bucketed.
    fn score_content(&self, crop: &RgbaImage) -> f32 {
        let total = crop.pixels().len();
        if total == 0 {
            return 0.0;
        }
        let opaque = crop
            .pixels()
            .filter(|p| p.0[3] > ALPHA_TRANSPARENT)
            .count();
        let ratio = opaque as f32 / total as f32;
        if ratio < 0.01 {
            0.0
        } else if ratio < 0.1 {
            0.3
        } else if ratio < 0.3 {
            0.7
        } else {
            1.0
        }
    }

    /// Transparency balance. A crop with its background removed has some,
    /// but not overwhelming, fully-transparent area.
    fn score_transparency(&self, crop: &RgbaImage) -> f32 {
        let total = crop.pixels().len();
        if total == 0 {
            return 0.3;
        }
        let mut transparent = 0usize;
        let mut semi_transparent = 0usize;
        for pixel in crop.pixels() {
            let alpha = pixel.0[3];
            if alpha < ALPHA_TRANSPARENT {
                transparent += 1;
            } else if alpha < u8::MAX {
                semi_transparent += 1;
            }
        }
        let transparent_ratio = transparent as f32 / total as f32;
        let semi_ratio = semi_transparent as f32 / total as f32;

        if transparent_ratio > 0.1 && transparent_ratio < 0.8 {
            1.0
        } else if semi_ratio > 0.1 {
            0.8
        } else if transparent_ratio > 0.8 {
            0.5
        } else {
            0.3
        }
    }

    /// Edge sharpness from the fraction of strong-gradient interior pixels.
    fn score_edges(&self, crop: &RgbaImage) -> f32 {
        let (width, height) = crop.dimensions();
        if width < 3 || height < 3 {
            return 0.5;
        }

        let gray = |x: u32, y: u32| -> i32 {
            let [r, g, b, _] = crop.get_pixel(x, y).0;
            (i32::from(r) + i32::from(g) + i32::from(b)) / 3
        };

        let mut edge_pixels = 0usize;
        for y in 1..height - 1 {
            for x in 1..width - 1 {
                if crop.get_pixel(x, y).0[3] < ALPHA_TRANSPARENT {
                    continue;
                }
                let gx = (gray(x + 1, y) - gray(x - 1, y)).abs();
                let gy = (gray(x, y + 1) - gray(x, y - 1)).abs();
                if gx.max(gy) > 30 {
                    edge_pixels += 1;
                }
            }
        }

        let total = ((width - 2) as usize) * ((height - 2) as usize);
        let ratio = edge_pixels as f32 / total as f32;
        if ratio > 0.1 {
            1.0
        } else if ratio > 0.05 {
            0.7
        } else {
            0.4
        }
    }

    /// Color variety from the number of distinct quantized colors among
    /// opaque pixels.
    fn score_colors(&self, crop: &RgbaImage) -> f32 {
        let mut colors: HashMap<[u8; 3], u32> = HashMap::new();
        let mut opaque = 0usize;
        for pixel in crop.pixels() {
            let [r, g, b, a] = pixel.0;
            if a < ALPHA_TRANSPARENT {
                continue;
            }
            // 4 bits per channel is enough to separate palettes.
            colors
                .entry([r >> 4 << 4, g >> 4 << 4, b >> 4 << 4])
                .and_modify(|c| *c += 1)
                .or_insert(1);
            opaque += 1;
        }
        if opaque == 0 {
            return 0.0;
        }
        let variety = colors.len() as f32 / (opaque.min(1000)) as f32;
        if variety > 0.1 {
            1.0
        } else if variety > 0.05 {
            0.7
        } else {
            0.4
        }
    }

    fn recommendations(
        dimension: f32,
        content: f32,
        transparency: f32,
        edge: f32,
        color: f32,
    ) -> HashMap<String, String> {
        let mut recommendations = HashMap::new();
        let mut advise = |score: f32, key: &str, text: &str| {
            if score < RECOMMENDATION_THRESHOLD {
                recommendations.insert(key.to_string(), text.to_string());
            }
        };
        advise(
            dimension,
            "dimensions",
            "Consider resizing the design to improve aspect ratio",
        );
        advise(
            content,
            "content",
            "Design may be too sparse, consider adding more visual elements",
        );
        advise(
            transparency,
            "transparency",
            "Background removal may be needed for better design extraction",
        );
        advise(
            edge,
            "edges",
            "Design may be blurry, consider using higher resolution source",
        );
        advise(
            color,
            "colors",
            "Consider adding more color variety to the design",
        );
        recommendations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::region::DetectionSource;
    use image::Rgba;

    fn region(width: u32, height: u32) -> DesignRegion {
        DesignRegion::new(0, 0, width, height, 0.8, "edge_detected", DetectionSource::Heuristic)
    }

    fn opaque_crop(width: u32, height: u32, rgb: [u8; 3]) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([rgb[0], rgb[1], rgb[2], 255]))
    }

    #[test]
    fn test_overall_is_weighted_sum() {
        let crop = opaque_crop(100, 100, [255, 0, 0]);
        let report = QualityValidator::new().validate(&crop, &region(100, 100));
        let expected = report.dimension_score * 0.2
            + report.content_score * 0.3
            + report.transparency_score * 0.2
            + report.edge_score * 0.15
            + report.color_score * 0.15;
        assert!((report.overall_score - expected).abs() < 1e-5);
    }

    #[test]
    fn test_opaque_matching_crop_scores_dimension_and_content_one() {
        let crop = opaque_crop(100, 100, [255, 0, 0]);
        let report = QualityValidator::new().validate(&crop, &region(100, 100));
        assert!((report.dimension_score - 1.0).abs() < 1e-6);
        assert!((report.content_score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_tiny_crop_scores_zero_dimensions() {
        let crop = opaque_crop(10, 10, [0, 0, 0]);
        let report = QualityValidator::new().validate(&crop, &region(10, 10));
        assert_eq!(report.dimension_score, 0.0);
    }

    #[test]
    fn test_dimension_mismatch_scores_lower() {
        let crop = opaque_crop(80, 80, [0, 0, 255]);
        let report = QualityValidator::new().validate(&crop, &region(100, 100));
        assert!((report.dimension_score - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_fully_transparent_crop_has_no_content() {
        let crop = RgbaImage::from_pixel(50, 50, Rgba([0, 0, 0, 0]));
        let report = QualityValidator::new().validate(&crop, &region(50, 50));
        assert_eq!(report.content_score, 0.0);
        assert_eq!(report.color_score, 0.0);
        assert_eq!(report.quality_level, QualityLevel::Poor);
    }

    #[test]
    fn test_partial_transparency_scores_best() {
        let mut crop = RgbaImage::from_pixel(40, 40, Rgba([255, 0, 0, 255]));
        // Make ~25% of the crop transparent, inside the (0.1, 0.8) band.
        for y in 0..20 {
            for x in 0..20 {
                crop.put_pixel(x, y, Rgba([0, 0, 0, 0]));
            }
        }
        let report = QualityValidator::new().validate(&crop, &region(40, 40));
        assert!((report.transparency_score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_recommendations_cover_weak_scores() {
        let crop = opaque_crop(100, 100, [128, 128, 128]);
        let report = QualityValidator::new().validate(&crop, &region(100, 100));
        // A solid opaque crop is weak on transparency, edges and colors.
        assert!(report.transparency_score < 0.7);
        assert!(report.recommendations.contains_key("transparency"));
        assert!(report.recommendations.contains_key("edges"));
        assert!(report.recommendations.contains_key("colors"));
        assert!(!report.recommendations.contains_key("dimensions"));
        assert!(!report.recommendations.contains_key("content"));
    }

    #[test]
    fn test_level_matches_overall_score() {
        let crop = opaque_crop(100, 100, [255, 0, 0]);
        let report = QualityValidator::new().validate(&crop, &region(100, 100));
        assert_eq!(report.quality_level, QualityLevel::from_score(report.overall_score));
    }
}
