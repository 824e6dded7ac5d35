//! Embedding providers and similarity search helpers.
//!
//! [`EmbeddingProvider`] is the seam between the pipeline and whatever
//! produces region embeddings. The production implementation,
//! [`EngineeredEmbedder`], concatenates the engineered feature blocks and
//! zero-pads to the configured dimensionality. [`HashSeededEmbedder`] is a
//! deterministic stand-in for tests that exercises the same vector shape
//! without depending on pixel statistics.

use std::hash::{Hash, Hasher};

use image::RgbaImage;
use serde::Serialize;

use super::features::{color_features, edge_features, texture_features};

/// Produces a fixed-dimension embedding for a region crop.
pub trait EmbeddingProvider {
    /// Embedding dimensionality.
    fn dim(&self) -> usize;

    /// Computes a unit-norm embedding for the crop.
    fn embed(&self, crop: &RgbaImage) -> Vec<f32>;
}

/// Embedder built from the engineered color, texture and edge blocks.
///
/// The blocks occupy the first 112 dimensions (64 color, 32 texture,
/// 16 edge); the rest is zero padding. The final vector is L2-normalized.
#[derive(Debug, Clone)]
pub struct EngineeredEmbedder {
    dim: usize,
}

impl EngineeredEmbedder {
    /// Creates an embedder producing vectors of the given dimensionality.
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl EmbeddingProvider for EngineeredEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, crop: &RgbaImage) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dim];
        let blocks = color_features(crop)
            .into_iter()
            .chain(texture_features(crop))
            .chain(edge_features(crop));
        for (slot, value) in embedding.iter_mut().zip(blocks) {
            *slot = value;
        }
        normalize(&mut embedding);
        embedding
    }
}

/// Deterministic test embedder seeded from a hash of the crop bytes.
///
/// Identical crops always embed identically, distinct crops almost never
/// do, and the output is unit-norm like the real embedder.
#[derive(Debug, Clone)]
pub struct HashSeededEmbedder {
    dim: usize,
}

impl HashSeededEmbedder {
    /// Creates a test embedder of the given dimensionality.
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl EmbeddingProvider for HashSeededEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, crop: &RgbaImage) -> Vec<f32> {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        crop.dimensions().hash(&mut hasher);
        crop.as_raw().hash(&mut hasher);
        let mut state = hasher.finish() | 1;

        let mut embedding = Vec::with_capacity(self.dim);
        for _ in 0..self.dim {
            // xorshift64
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            embedding.push(((state >> 40) as f32 / (1u64 << 24) as f32) - 0.5);
        }
        normalize(&mut embedding);
        embedding
    }
}

/// Scales a vector to unit L2 norm; zero vectors are left unchanged.
pub fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

/// Cosine similarity of two vectors; zero when lengths differ or either
/// vector is zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())) as f32
}

/// A nearest-neighbor hit from [`find_similar`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarDesign {
    /// Index into the searched collection.
    pub index: usize,
    /// Cosine similarity to the query.
    pub similarity: f32,
}

/// Ranks `database` embeddings by cosine similarity to `query`.
///
/// Entries at or below `threshold` are excluded; at most `top_k` results
/// are returned, best first.
pub fn find_similar(
    query: &[f32],
    database: &[Vec<f32>],
    top_k: usize,
    threshold: f32,
) -> Vec<SimilarDesign> {
    let mut hits: Vec<SimilarDesign> = database
        .iter()
        .enumerate()
        .map(|(index, candidate)| SimilarDesign {
            index,
            similarity: cosine_similarity(query, candidate),
        })
        .filter(|hit| hit.similarity > threshold)
        .collect();
    hits.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    hits.truncate(top_k);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([rgb[0], rgb[1], rgb[2], 255]))
    }

    fn norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    #[test]
    fn test_engineered_embedding_is_unit_norm() {
        let embedder = EngineeredEmbedder::new(512);
        let embedding = embedder.embed(&solid(50, 50, [200, 30, 90]));
        assert_eq!(embedding.len(), 512);
        assert!((norm(&embedding) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_engineered_embedding_pads_with_zeros() {
        let embedder = EngineeredEmbedder::new(512);
        let embedding = embedder.embed(&solid(50, 50, [200, 30, 90]));
        assert!(embedding[112..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_engineered_embedding_is_deterministic() {
        let embedder = EngineeredEmbedder::new(512);
        let image = solid(40, 40, [10, 200, 55]);
        assert_eq!(embedder.embed(&image), embedder.embed(&image));
    }

    #[test]
    fn test_hash_seeded_embedder_is_deterministic_and_unit_norm() {
        let embedder = HashSeededEmbedder::new(128);
        let a = solid(10, 10, [1, 2, 3]);
        let b = solid(10, 10, [3, 2, 1]);
        assert_eq!(embedder.embed(&a), embedder.embed(&a));
        assert_ne!(embedder.embed(&a), embedder.embed(&b));
        assert!((norm(&embedder.embed(&a)) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_cosine_similarity_bounds() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        let c = vec![2.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &c) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&a, &b), 0.0);
        assert_eq!(cosine_similarity(&a, &[]), 0.0);
    }

    #[test]
    fn test_find_similar_ranks_and_truncates() {
        let query = vec![1.0, 0.0];
        let database = vec![
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.5],
            vec![-1.0, 0.0],
        ];
        let hits = find_similar(&query, &database, 2, 0.3);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].index, 0);
        assert_eq!(hits[1].index, 2);
    }
}
