//! Region types flowing through the pipeline.
//!
//! A [`DesignRegion`] is a raw detection from either the heuristic or the
//! learned detector. After merging, each survivor is wrapped into an
//! [`EnhancedDesignRegion`] which accumulates classification, embedding and
//! quality data as it moves through the later stages. The final output of
//! the pipeline is a list of [`ExtractedDesign`] values carrying encoded
//! image bytes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::quality::QualityReport;

/// Which detector produced a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionSource {
    /// Produced by one of the pixel-statistics strategies.
    Heuristic,
    /// Decoded from the ONNX detector output.
    Learned,
}

/// An axis-aligned candidate region in original image coordinates.
///
/// Invariants: `width` and `height` are positive and the box lies fully
/// inside the image it was detected in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignRegion {
    /// Left edge in pixels.
    pub x: u32,
    /// Top edge in pixels.
    pub y: u32,
    /// Box width in pixels (positive).
    pub width: u32,
    /// Box height in pixels (positive).
    pub height: u32,
    /// Detector confidence in [0, 1].
    pub confidence: f32,
    /// Strategy label, e.g. `edge_detected` or `design`.
    pub label: String,
    /// Which detector produced this region.
    pub source: DetectionSource,
}

impl DesignRegion {
    /// Creates a new region.
    pub fn new(
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        confidence: f32,
        label: impl Into<String>,
        source: DetectionSource,
    ) -> Self {
        Self {
            x,
            y,
            width,
            height,
            confidence,
            label: label.into(),
            source,
        }
    }

    /// Returns true when the box has positive extent and lies fully inside
    /// an image of the given dimensions.
    pub fn fits_within(&self, image_width: u32, image_height: u32) -> bool {
        self.width > 0
            && self.height > 0
            && self.x.checked_add(self.width).is_some_and(|r| r <= image_width)
            && self.y.checked_add(self.height).is_some_and(|b| b <= image_height)
    }

    /// Area of the box in pixels.
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// A merged region enriched with classification and quality data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancedDesignRegion {
    /// The underlying detection.
    pub region: DesignRegion,
    /// Best-scoring category from the vocabulary, once classified.
    pub category: Option<String>,
    /// Score of the best category, once classified.
    pub category_confidence: Option<f32>,
    /// Unit-norm feature embedding, once computed.
    pub embedding: Option<Vec<f32>>,
    /// Quality report, once validated.
    pub quality: Option<QualityReport>,
    /// Free-form per-region metadata.
    pub metadata: HashMap<String, serde_json::Value>,
}

impl EnhancedDesignRegion {
    /// Wraps a merged detection with empty enrichment slots.
    pub fn from_region(region: DesignRegion) -> Self {
        Self {
            region,
            category: None,
            category_confidence: None,
            embedding: None,
            quality: None,
            metadata: HashMap::new(),
        }
    }
}

/// A fully extracted design, ready to hand to storage or an index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedDesign {
    /// Stable identifier within one pipeline run (`design_1`, `design_2`, ...).
    pub id: String,
    /// Assigned category, or `unknown` when classification produced none.
    pub category: String,
    /// Detector confidence of the source region.
    pub confidence: f32,
    /// Left edge of the source region in the original image.
    pub x: u32,
    /// Top edge of the source region in the original image.
    pub y: u32,
    /// Width of the extracted crop.
    pub width: u32,
    /// Height of the extracted crop.
    pub height: u32,
    /// Encoded image bytes.
    pub image_bytes: Vec<u8>,
    /// MIME type of `image_bytes`.
    pub content_type: String,
}
