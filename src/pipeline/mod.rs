//! End-to-end design extraction pipeline.
//!
//! [`DesignExtractionPipeline`] wires the stages together: heuristic and
//! learned detection, merging, classification, quality validation and
//! extraction. Build one with [`DesignExtractionPipeline::builder`]; without
//! a model path the pipeline runs heuristic-only, and a model that fails to
//! load degrades it to the same mode instead of erroring.

use std::path::PathBuf;
use std::sync::Arc;

use image::RgbaImage;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::classifier::{EmbeddingProvider, SemanticClassifier};
use crate::core::config::PipelineConfig;
use crate::core::errors::ExtractError;
use crate::core::inference::{DetectorSession, ModelInfo};
use crate::detectors::{HeuristicDetector, LearnedDetector, RegionMerger};
use crate::domain::region::{EnhancedDesignRegion, ExtractedDesign};
use crate::extractor::{DesignExtractor, crop_region};
use crate::processors::geometry::Rect;
use crate::quality::QualityValidator;

/// Everything one pipeline run produces.
#[derive(Debug)]
pub struct PipelineOutput {
    /// Encoded designs that passed the extraction gate, best first.
    pub designs: Vec<ExtractedDesign>,
    /// All merged regions with their classification and quality data,
    /// including those the extraction gate rejected.
    pub regions: Vec<EnhancedDesignRegion>,
}

/// Builder for [`DesignExtractionPipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
    model_path: Option<PathBuf>,
    embedder: Option<Arc<dyn EmbeddingProvider + Send + Sync>>,
}

impl PipelineBuilder {
    /// Sets the pipeline configuration. Defaults to [`PipelineConfig::default`].
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the path of the ONNX detector model. Without one the pipeline
    /// runs heuristic-only.
    pub fn model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = Some(path.into());
        self
    }

    /// Overrides the embedding provider used by the classifier.
    pub fn embedder(mut self, embedder: Arc<dyn EmbeddingProvider + Send + Sync>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Validates the configuration and assembles the pipeline.
    pub fn build(self) -> Result<DesignExtractionPipeline, ExtractError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let session = self.model_path.map(|path| Arc::new(DetectorSession::new(path)));
        let learned = session.as_ref().map(|session| {
            LearnedDetector::new(
                Arc::clone(session),
                config.input_size,
                config.confidence_threshold,
            )
        });

        let classifier = match self.embedder {
            Some(embedder) => SemanticClassifier::with_embedder(
                config.classifier_input_size,
                config.category_vocabulary.clone(),
                embedder,
            ),
            None => SemanticClassifier::new(
                config.classifier_input_size,
                config.embedding_dim,
                config.category_vocabulary.clone(),
            ),
        };

        Ok(DesignExtractionPipeline {
            heuristic: HeuristicDetector::new(config.heuristic.clone()),
            learned,
            merger: RegionMerger::new(config.dedup_iou_threshold, config.nms_iou_threshold),
            classifier,
            validator: QualityValidator::new(),
            extractor: DesignExtractor::new(
                config.min_extract_size,
                config.max_extent_fraction,
                config.min_extract_confidence,
                config.min_category_confidence,
            ),
            session,
        })
    }
}

/// The assembled extraction pipeline.
pub struct DesignExtractionPipeline {
    heuristic: HeuristicDetector,
    learned: Option<LearnedDetector>,
    merger: RegionMerger,
    classifier: SemanticClassifier,
    validator: QualityValidator,
    extractor: DesignExtractor,
    session: Option<Arc<DetectorSession>>,
}

impl DesignExtractionPipeline {
    /// Starts building a pipeline.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Returns true when a detector model is loaded and usable.
    pub fn is_model_ready(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_ready())
    }

    /// Returns a summary of the configured detector model, if any.
    pub fn model_info(&self) -> Option<ModelInfo> {
        self.session.as_ref().map(|s| s.model_info())
    }

    /// Resets a failed detector session so the next run retries the load.
    pub fn re_arm_model(&self) -> Result<(), ExtractError> {
        if let Some(session) = &self.session {
            session.re_arm()?;
        }
        Ok(())
    }

    /// Runs the full pipeline over one image.
    pub fn process(&self, image: &RgbaImage) -> Result<PipelineOutput, ExtractError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(ExtractError::invalid_input("image has zero extent"));
        }
        info!(
            width = image.width(),
            height = image.height(),
            "starting design extraction"
        );

        let heuristic_regions = self.heuristic.detect(image);
        let learned_regions = match &self.learned {
            Some(detector) => detector.detect(image)?,
            None => Vec::new(),
        };
        debug!(
            heuristic = heuristic_regions.len(),
            learned = learned_regions.len(),
            "detection complete"
        );

        let mut regions = self.merger.merge(heuristic_regions, learned_regions);
        self.classifier.classify_regions(image, &mut regions);

        regions.par_iter_mut().for_each(|enhanced| {
            let rect = Rect::from(&enhanced.region);
            if let Some(crop) = crop_region(image, &rect) {
                enhanced.quality = Some(self.validator.validate(&crop, &enhanced.region));
            }
        });

        let designs = self.extractor.extract(image, &regions);
        info!(
            regions = regions.len(),
            designs = designs.len(),
            "design extraction finished"
        );
        Ok(PipelineOutput { designs, regions })
    }
}
