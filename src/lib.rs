//! # design-extract
//!
//! A Rust library that locates candidate design regions inside composite
//! mockup images, reconciles overlapping detections, classifies and
//! quality-scores each surviving region, and crops the accepted regions into
//! standalone PNG artifacts.
//!
//! ## Pipeline
//!
//! The pipeline is a pure left-to-right composition over one decoded image:
//!
//! 1. **Heuristic detection** — edge density, color contrast and texture
//!    variance strategies over raw pixels ([`detectors::HeuristicDetector`])
//! 2. **Learned detection** — decodes the output tensor of an external ONNX
//!    detector ([`detectors::LearnedDetector`]); degrades gracefully to
//!    heuristic-only when no model is available
//! 3. **Merge** — IoU deduplication plus greedy non-maximum suppression
//!    ([`detectors::RegionMerger`])
//! 4. **Classification** — engineered feature embedding and category scoring
//!    against a fixed vocabulary ([`classifier::SemanticClassifier`])
//! 5. **Quality validation** — five weighted sub-scores per region
//!    ([`quality::QualityValidator`])
//! 6. **Extraction** — bounds gate, crop and PNG encode
//!    ([`extractor::DesignExtractor`])
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use design_extract::pipeline::DesignExtractionPipeline;
//! use design_extract::core::PipelineConfig;
//!
//! # fn main() -> Result<(), design_extract::core::ExtractError> {
//! let pipeline = DesignExtractionPipeline::builder()
//!     .config(PipelineConfig::default())
//!     .model_path("models/detector.onnx")
//!     .build()?;
//!
//! let image = image::open("mockup.png")?.to_rgba8();
//! let output = pipeline.process(&image)?;
//! for design in &output.designs {
//!     println!("{} {} ({:.2})", design.id, design.category, design.confidence);
//! }
//! # Ok(())
//! # }
//! ```

pub mod classifier;
pub mod core;
pub mod detectors;
pub mod domain;
pub mod extractor;
pub mod pipeline;
pub mod processors;
pub mod quality;
pub mod utils;

pub use crate::core::{ExtractError, HeuristicConfig, PipelineConfig};
pub use domain::{
    DesignRegion, DetectionSource, EnhancedDesignRegion, ExtractedDesign, QualityLevel,
    QualityReport,
};
pub use pipeline::{DesignExtractionPipeline, PipelineOutput};
