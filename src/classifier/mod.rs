//! Semantic classification of merged regions.
//!
//! Each region is cropped, resized to the classifier input size, embedded,
//! and scored against the category vocabulary. Category scores are
//! deterministic functions of the embedding's color, texture and edge block
//! aggregates; categories without a dedicated formula receive a small floor
//! score.

pub mod embedding;
pub mod features;

use std::sync::Arc;

use image::{RgbaImage, imageops};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::domain::region::EnhancedDesignRegion;
use crate::processors::geometry::Rect;
use crate::processors::pixel::resize_rgba;

pub use embedding::{
    EmbeddingProvider, EngineeredEmbedder, HashSeededEmbedder, SimilarDesign, cosine_similarity,
    find_similar,
};

/// Floor score for vocabulary categories with no dedicated formula.
const DEFAULT_CATEGORY_SCORE: f32 = 0.1;

/// Classifier assigning vocabulary categories and embeddings to regions.
pub struct SemanticClassifier {
    input_size: u32,
    vocabulary: Vec<String>,
    embedder: Arc<dyn EmbeddingProvider + Send + Sync>,
}

impl std::fmt::Debug for SemanticClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticClassifier")
            .field("input_size", &self.input_size)
            .field("vocabulary", &self.vocabulary)
            .field("embedding_dim", &self.embedder.dim())
            .finish()
    }
}

impl SemanticClassifier {
    /// Creates a classifier using the engineered feature embedder.
    pub fn new(input_size: u32, embedding_dim: usize, vocabulary: Vec<String>) -> Self {
        Self::with_embedder(
            input_size,
            vocabulary,
            Arc::new(EngineeredEmbedder::new(embedding_dim)),
        )
    }

    /// Creates a classifier over a custom embedding provider.
    pub fn with_embedder(
        input_size: u32,
        vocabulary: Vec<String>,
        embedder: Arc<dyn EmbeddingProvider + Send + Sync>,
    ) -> Self {
        Self {
            input_size,
            vocabulary,
            embedder,
        }
    }

    /// Classifies every region in place, filling category, confidence and
    /// embedding. Regions whose box falls outside the image are skipped
    /// with a warning and left unclassified.
    pub fn classify_regions(&self, image: &RgbaImage, regions: &mut [EnhancedDesignRegion]) {
        regions.par_iter_mut().for_each(|enhanced| {
            let rect = Rect::from(&enhanced.region);
            let Some(clamped) = rect.clamp_to(image.width(), image.height()) else {
                warn!(region = ?enhanced.region, "skipping region outside image bounds");
                return;
            };

            let crop = imageops::crop_imm(image, clamped.x, clamped.y, clamped.width, clamped.height)
                .to_image();
            let resized = resize_rgba(&crop, self.input_size, self.input_size);
            let embedding = self.embedder.embed(&resized);

            let scores = self.score_categories(&embedding);
            if let Some((category, confidence)) = scores
                .iter()
                .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            {
                enhanced.category = Some(category.clone());
                enhanced.category_confidence = Some(*confidence);
            }
            enhanced.embedding = Some(embedding);
        });
        debug!(count = regions.len(), "regions classified");
    }

    /// Scores every vocabulary category against an embedding.
    pub fn score_categories(&self, embedding: &[f32]) -> Vec<(String, f32)> {
        let color = block_aggregate(embedding, 0, 64, 10.0);
        let texture = block_aggregate(embedding, 64, 96, 5.0);
        let edge = block_aggregate(embedding, 96, 112, 3.0);

        self.vocabulary
            .iter()
            .map(|category| {
                let score = match category.as_str() {
                    "logo" => color * 0.8,
                    "graphic design" => color * 0.75,
                    "illustration" => color * 0.7,
                    "pattern" => texture * 0.85,
                    "decoration" => texture * 0.8,
                    "text" => edge * 0.9,
                    "symbol" => edge * 0.8,
                    "icon" => edge * 0.7,
                    _ => DEFAULT_CATEGORY_SCORE,
                };
                (category.clone(), score)
            })
            .collect()
    }
}

/// Sums absolute values over `embedding[start..end]` and squashes by
/// `divisor`, capped at 1.0.
fn block_aggregate(embedding: &[f32], start: usize, end: usize, divisor: f32) -> f32 {
    let end = end.min(embedding.len());
    if start >= end {
        return 0.0;
    }
    let sum: f32 = embedding[start..end].iter().map(|v| v.abs()).sum();
    (sum / divisor).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::PipelineConfig;
    use crate::domain::region::{DesignRegion, DetectionSource};
    use image::Rgba;

    fn classifier() -> SemanticClassifier {
        SemanticClassifier::new(224, 512, PipelineConfig::default_vocabulary())
    }

    fn enhanced(x: u32, y: u32, side: u32) -> EnhancedDesignRegion {
        EnhancedDesignRegion::from_region(DesignRegion::new(
            x,
            y,
            side,
            side,
            0.8,
            "edge_detected",
            DetectionSource::Heuristic,
        ))
    }

    #[test]
    fn test_classification_fills_all_fields() {
        let mut image = RgbaImage::from_pixel(200, 200, Rgba([255, 255, 255, 255]));
        for y in 50..150 {
            for x in 50..150 {
                image.put_pixel(x, y, Rgba([255, 0, 0, 255]));
            }
        }
        let mut regions = vec![enhanced(50, 50, 100)];
        classifier().classify_regions(&image, &mut regions);

        let region = &regions[0];
        assert!(region.category.is_some());
        let confidence = region.category_confidence.unwrap();
        assert!((0.0..=1.0).contains(&confidence));
        let embedding = region.embedding.as_ref().unwrap();
        assert_eq!(embedding.len(), 512);
        let norm: f32 = embedding.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_out_of_bounds_region_left_unclassified() {
        let image = RgbaImage::from_pixel(100, 100, Rgba([255, 255, 255, 255]));
        let mut regions = vec![enhanced(200, 200, 50)];
        classifier().classify_regions(&image, &mut regions);
        assert!(regions[0].category.is_none());
        assert!(regions[0].embedding.is_none());
    }

    #[test]
    fn test_scores_cover_whole_vocabulary() {
        let scores = classifier().score_categories(&vec![0.1; 512]);
        assert_eq!(scores.len(), 10);
        for (_, score) in &scores {
            assert!((0.0..=1.0).contains(score));
        }
    }

    #[test]
    fn test_unknown_category_gets_floor_score() {
        let classifier =
            SemanticClassifier::new(224, 512, vec!["artwork".into(), "brand".into()]);
        let scores = classifier.score_categories(&vec![0.5; 512]);
        assert!(scores.iter().all(|(_, s)| (*s - 0.1).abs() < 1e-6));
    }

    #[test]
    fn test_edge_heavy_embedding_prefers_text() {
        let mut embedding = vec![0.0f32; 512];
        for v in embedding.iter_mut().take(112).skip(96) {
            *v = 0.25;
        }
        let scores = classifier().score_categories(&embedding);
        let best = scores
            .iter()
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
            .unwrap();
        assert_eq!(best.0, "text");
    }

    #[test]
    fn test_injected_test_embedder_is_used() {
        let classifier = SemanticClassifier::with_embedder(
            32,
            PipelineConfig::default_vocabulary(),
            Arc::new(HashSeededEmbedder::new(64)),
        );
        let image = RgbaImage::from_pixel(60, 60, Rgba([10, 20, 30, 255]));
        let mut regions = vec![enhanced(0, 0, 60)];
        classifier.classify_regions(&image, &mut regions);
        assert_eq!(regions[0].embedding.as_ref().unwrap().len(), 64);
    }
}
