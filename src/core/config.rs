//! Configuration structures for the extraction pipeline.
//!
//! All thresholds and sizes used by the pipeline live here so they can be
//! loaded from serialized configuration. Every config struct provides a
//! `Default` implementation matching the tuned production values and a
//! `validate()` method that rejects out-of-range settings up front.

use serde::{Deserialize, Serialize};

use super::errors::ExtractError;

fn check_unit_range(name: &str, value: f32) -> Result<(), ExtractError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ExtractError::config_error(
            name,
            format!("must be in [0.0, 1.0], got {value}"),
        ));
    }
    Ok(())
}

/// Configuration for the heuristic detection strategies.
///
/// The three strategies (edge, color, texture) run over raw pixels and share
/// the size filter; everything else is per strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeuristicConfig {
    /// Sobel magnitude threshold used to binarize the edge map (default: 128).
    pub edge_magnitude_threshold: u16,
    /// Minimum fraction of edge pixels inside an edge candidate box (default: 0.05).
    pub min_edge_density: f32,
    /// Minimum local contrast ratio for a color candidate box (default: 0.3).
    pub min_contrast_ratio: f32,
    /// Number of dominant colors treated as background (default: 3).
    pub dominant_color_count: usize,
    /// Minimum fraction of sampled pixels a color must cover to count as
    /// background (default: 0.3).
    pub min_background_fraction: f32,
    /// Euclidean RGB distance under which a pixel matches a dominant color
    /// (default: 50.0).
    pub color_distance_threshold: f32,
    /// Local variance above which a pixel counts as textured (default: 10.0).
    pub variance_threshold: f32,
    /// Minimum mean variance inside a texture candidate box (default: 50.0).
    pub min_texture_variance: f32,
    /// Minimum side length of an accepted candidate in pixels (default: 50).
    pub min_design_size: u32,
    /// Maximum side length of an accepted candidate in pixels (default: 400).
    pub max_design_size: u32,
    /// Minimum side of a connected component kept by the edge strategy (default: 10).
    pub min_edge_component: u32,
    /// Minimum side of a connected component kept by the color strategy (default: 20).
    pub min_color_component: u32,
    /// Minimum side of a connected component kept by the texture strategy (default: 15).
    pub min_texture_component: u32,
    /// Confidence assigned to edge-detected candidates (default: 0.8).
    pub edge_confidence: f32,
    /// Confidence assigned to color-detected candidates (default: 0.7).
    pub color_confidence: f32,
    /// Confidence assigned to texture-detected candidates (default: 0.6).
    pub texture_confidence: f32,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            edge_magnitude_threshold: 128,
            min_edge_density: 0.05,
            min_contrast_ratio: 0.3,
            dominant_color_count: 3,
            min_background_fraction: 0.3,
            color_distance_threshold: 50.0,
            variance_threshold: 10.0,
            min_texture_variance: 50.0,
            min_design_size: 50,
            max_design_size: 400,
            min_edge_component: 10,
            min_color_component: 20,
            min_texture_component: 15,
            edge_confidence: 0.8,
            color_confidence: 0.7,
            texture_confidence: 0.6,
        }
    }
}

impl HeuristicConfig {
    /// Validates the configuration, returning a `ConfigError` on the first
    /// out-of-range field.
    pub fn validate(&self) -> Result<(), ExtractError> {
        check_unit_range("min_edge_density", self.min_edge_density)?;
        check_unit_range("min_contrast_ratio", self.min_contrast_ratio)?;
        check_unit_range("min_background_fraction", self.min_background_fraction)?;
        check_unit_range("edge_confidence", self.edge_confidence)?;
        check_unit_range("color_confidence", self.color_confidence)?;
        check_unit_range("texture_confidence", self.texture_confidence)?;
        if self.dominant_color_count == 0 {
            return Err(ExtractError::config_error(
                "dominant_color_count",
                "must be at least 1",
            ));
        }
        if self.min_design_size == 0 {
            return Err(ExtractError::config_error(
                "min_design_size",
                "must be positive",
            ));
        }
        if self.max_design_size < self.min_design_size {
            return Err(ExtractError::config_error(
                "max_design_size",
                format!(
                    "must be >= min_design_size ({}), got {}",
                    self.min_design_size, self.max_design_size
                ),
            ));
        }
        if self.color_distance_threshold < 0.0 {
            return Err(ExtractError::config_error(
                "color_distance_threshold",
                "must be non-negative",
            ));
        }
        Ok(())
    }
}

/// Top-level configuration for the extraction pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Score threshold for learned detections (default: 0.5).
    pub confidence_threshold: f32,
    /// IoU threshold for greedy non-maximum suppression (default: 0.4).
    pub nms_iou_threshold: f32,
    /// IoU threshold above which a heuristic candidate duplicates a learned
    /// one (default: 0.5).
    pub dedup_iou_threshold: f32,
    /// Square input side length for the learned detector (default: 640).
    pub input_size: u32,
    /// Square input side length for the classifier crop (default: 224).
    pub classifier_input_size: u32,
    /// Dimensionality of the produced embeddings (default: 512).
    pub embedding_dim: usize,
    /// Category vocabulary scored by the classifier.
    pub category_vocabulary: Vec<String>,
    /// Minimum side length a region must have to be extracted (default: 20).
    pub min_extract_size: u32,
    /// Maximum fraction of an image dimension a region may span (default: 0.8).
    pub max_extent_fraction: f32,
    /// Minimum detector confidence for extraction (default: 0.3).
    pub min_extract_confidence: f32,
    /// Minimum classifier confidence for extraction when a category is
    /// present (default: 0.2).
    pub min_category_confidence: f32,
    /// Heuristic detector configuration.
    pub heuristic: HeuristicConfig,
}

impl PipelineConfig {
    /// Default category vocabulary used when none is configured.
    pub fn default_vocabulary() -> Vec<String> {
        [
            "logo",
            "text",
            "graphic design",
            "illustration",
            "pattern",
            "symbol",
            "icon",
            "artwork",
            "brand",
            "decoration",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    /// Validates the configuration, including the nested heuristic config.
    pub fn validate(&self) -> Result<(), ExtractError> {
        check_unit_range("confidence_threshold", self.confidence_threshold)?;
        check_unit_range("nms_iou_threshold", self.nms_iou_threshold)?;
        check_unit_range("dedup_iou_threshold", self.dedup_iou_threshold)?;
        check_unit_range("max_extent_fraction", self.max_extent_fraction)?;
        check_unit_range("min_extract_confidence", self.min_extract_confidence)?;
        check_unit_range("min_category_confidence", self.min_category_confidence)?;
        if self.input_size == 0 {
            return Err(ExtractError::config_error("input_size", "must be positive"));
        }
        if self.classifier_input_size == 0 {
            return Err(ExtractError::config_error(
                "classifier_input_size",
                "must be positive",
            ));
        }
        if self.embedding_dim == 0 {
            return Err(ExtractError::config_error(
                "embedding_dim",
                "must be positive",
            ));
        }
        if self.category_vocabulary.is_empty() {
            return Err(ExtractError::config_error(
                "category_vocabulary",
                "must not be empty",
            ));
        }
        self.heuristic.validate()
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            nms_iou_threshold: 0.4,
            dedup_iou_threshold: 0.5,
            input_size: 640,
            classifier_input_size: 224,
            embedding_dim: 512,
            category_vocabulary: Self::default_vocabulary(),
            min_extract_size: 20,
            max_extent_fraction: 0.8,
            min_extract_confidence: 0.3,
            min_category_confidence: 0.2,
            heuristic: HeuristicConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
        assert!(HeuristicConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_out_of_range_threshold() {
        let mut config = PipelineConfig::default();
        config.nms_iou_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_inverted_size_filter() {
        let mut config = HeuristicConfig::default();
        config.min_design_size = 500;
        config.max_design_size = 400;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_empty_vocabulary() {
        let mut config = PipelineConfig::default();
        config.category_vocabulary.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = PipelineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let restored: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.input_size, config.input_size);
        assert_eq!(restored.category_vocabulary, config.category_vocabulary);
    }
}
