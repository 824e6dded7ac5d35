//! Learned detection via an external ONNX detector.
//!
//! The detector model takes a `[1, 3, S, S]` normalized image tensor and
//! produces a `[1, 4+C, N]` tensor of candidate boxes: four rows of
//! normalized center-size coordinates followed by `C` per-class score rows.
//! [`decode_detections`] turns that layout into [`DesignRegion`]s in original
//! image coordinates; the class channels carry no vocabulary, so every
//! decoded region is labeled `design`.

use std::sync::Arc;

use image::RgbaImage;
use tracing::{debug, warn};

use crate::core::errors::{ExtractError, ProcessingStage};
use crate::core::inference::{DetectorSession, Tensor3D};
use crate::domain::region::{DesignRegion, DetectionSource};
use crate::processors::pixel::{resize_rgba, to_chw_tensor};

const LEARNED_LABEL: &str = "design";

/// Adapter around [`DetectorSession`] producing decoded regions.
#[derive(Debug, Clone)]
pub struct LearnedDetector {
    session: Arc<DetectorSession>,
    input_size: u32,
    confidence_threshold: f32,
}

impl LearnedDetector {
    /// Creates a detector over a shared session.
    pub fn new(session: Arc<DetectorSession>, input_size: u32, confidence_threshold: f32) -> Self {
        Self {
            session,
            input_size,
            confidence_threshold,
        }
    }

    /// Runs the model and decodes its output.
    ///
    /// Returns an empty list when the session is unavailable so the pipeline
    /// can continue with heuristic candidates only.
    pub fn detect(&self, image: &RgbaImage) -> Result<Vec<DesignRegion>, ExtractError> {
        let resized = resize_rgba(image, self.input_size, self.input_size);
        let input = to_chw_tensor(&resized);

        let Some(output) = self.session.infer_3d(&input)? else {
            debug!("detector session unavailable, skipping learned detection");
            return Ok(Vec::new());
        };

        let regions = decode_detections(
            &output,
            image.width(),
            image.height(),
            self.confidence_threshold,
        )?;
        debug!(count = regions.len(), "learned detection candidates");
        Ok(regions)
    }
}

/// Decodes a `[1, 4+C, N]` detector output into regions.
///
/// Per candidate column: rows 0..4 hold normalized `(cx, cy, w, h)`, rows
/// 4.. hold class scores. The best class score is taken as the region
/// confidence; candidates below `confidence_threshold` are skipped, and
/// decoded boxes that land outside the image or collapse to zero extent are
/// dropped with a warning.
pub fn decode_detections(
    output: &Tensor3D,
    image_width: u32,
    image_height: u32,
    confidence_threshold: f32,
) -> Result<Vec<DesignRegion>, ExtractError> {
    let shape = output.shape();
    if shape[0] != 1 || shape[1] < 5 {
        return Err(ExtractError::processing(
            ProcessingStage::LearnedDetection,
            format!("unexpected detector output shape {shape:?}, want [1, 4+C, N] with C >= 1"),
        ));
    }
    let class_rows = shape[1] - 4;
    let candidates = shape[2];
    let mut regions = Vec::new();

    for n in 0..candidates {
        let mut best_score = f32::MIN;
        for c in 0..class_rows {
            best_score = best_score.max(output[[0, 4 + c, n]]);
        }
        if best_score <= confidence_threshold {
            continue;
        }

        let cx = output[[0, 0, n]] * image_width as f32;
        let cy = output[[0, 1, n]] * image_height as f32;
        let w = output[[0, 2, n]] * image_width as f32;
        let h = output[[0, 3, n]] * image_height as f32;

        let left = cx - w / 2.0;
        let top = cy - h / 2.0;
        let right = cx + w / 2.0;
        let bottom = cy + h / 2.0;

        let x0 = left.max(0.0).round() as u32;
        let y0 = top.max(0.0).round() as u32;
        let x1 = (right.min(image_width as f32).round() as u32).min(image_width);
        let y1 = (bottom.min(image_height as f32).round() as u32).min(image_height);

        if x1 <= x0 || y1 <= y0 {
            warn!(
                candidate = n,
                cx, cy, w, h, "dropping decoded box with no usable extent"
            );
            continue;
        }

        regions.push(DesignRegion::new(
            x0,
            y0,
            x1 - x0,
            y1 - y0,
            best_score,
            LEARNED_LABEL,
            DetectionSource::Learned,
        ));
    }

    Ok(regions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    /// Builds a [1, 4+C, N] tensor from per-candidate (cx, cy, w, h, scores).
    fn output_from(candidates: &[(f32, f32, f32, f32, Vec<f32>)]) -> Tensor3D {
        let class_rows = candidates[0].4.len();
        let mut tensor = Tensor3D::zeros((1, 4 + class_rows, candidates.len()));
        for (n, (cx, cy, w, h, scores)) in candidates.iter().enumerate() {
            tensor[[0, 0, n]] = *cx;
            tensor[[0, 1, n]] = *cy;
            tensor[[0, 2, n]] = *w;
            tensor[[0, 3, n]] = *h;
            for (c, s) in scores.iter().enumerate() {
                tensor[[0, 4 + c, n]] = *s;
            }
        }
        tensor
    }

    #[test]
    fn test_decode_centered_box() {
        let output = output_from(&[(0.5, 0.5, 0.25, 0.5, vec![0.9, 0.2])]);
        let regions = decode_detections(&output, 400, 200, 0.5).unwrap();
        assert_eq!(regions.len(), 1);
        let r = &regions[0];
        assert_eq!((r.x, r.y, r.width, r.height), (150, 50, 100, 100));
        assert!((r.confidence - 0.9).abs() < 1e-6);
        assert_eq!(r.source, DetectionSource::Learned);
        assert_eq!(r.label, "design");
    }

    #[test]
    fn test_decode_takes_best_class_score() {
        let output = output_from(&[(0.5, 0.5, 0.2, 0.2, vec![0.1, 0.7, 0.3])]);
        let regions = decode_detections(&output, 100, 100, 0.5).unwrap();
        assert_eq!(regions.len(), 1);
        assert!((regions[0].confidence - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_decode_skips_low_confidence() {
        let output = output_from(&[(0.5, 0.5, 0.2, 0.2, vec![0.4])]);
        assert!(decode_detections(&output, 100, 100, 0.5).unwrap().is_empty());
    }

    #[test]
    fn test_decode_drops_zero_width_box() {
        let output = output_from(&[(0.5, 0.5, 0.0, 0.5, vec![0.9])]);
        assert!(decode_detections(&output, 100, 100, 0.5).unwrap().is_empty());
    }

    #[test]
    fn test_decode_drops_box_outside_image() {
        let output = output_from(&[(1.5, 1.5, 0.2, 0.2, vec![0.9])]);
        assert!(decode_detections(&output, 100, 100, 0.5).unwrap().is_empty());
    }

    #[test]
    fn test_decode_clamps_overflowing_box() {
        let output = output_from(&[(0.95, 0.5, 0.2, 0.2, vec![0.9])]);
        let regions = decode_detections(&output, 100, 100, 0.5).unwrap();
        assert_eq!(regions.len(), 1);
        assert!(regions[0].fits_within(100, 100));
    }

    #[test]
    fn test_decode_rejects_malformed_shape() {
        let output = Tensor3D::zeros((1, 4, 10));
        let err = decode_detections(&output, 100, 100, 0.5).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::Processing {
                stage: ProcessingStage::LearnedDetection,
                ..
            }
        ));
    }

    #[test]
    fn test_missing_model_yields_empty_detections() {
        let session = Arc::new(DetectorSession::new("models/nonexistent.onnx"));
        let detector = LearnedDetector::new(session, 64, 0.5);
        let image = RgbaImage::from_pixel(64, 64, Rgba([255, 255, 255, 255]));
        assert!(detector.detect(&image).unwrap().is_empty());
    }
}
