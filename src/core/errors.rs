//! Core error types for the design extraction pipeline.
//!
//! Defines [`ExtractError`], the single error enum used across every pipeline
//! stage, together with [`ProcessingStage`] which identifies where in the
//! pipeline a processing failure occurred.

use thiserror::Error;

/// Enum identifying the pipeline stage an error occurred in.
///
/// Carried inside [`ExtractError::Processing`] so callers can tell which part
/// of the pipeline failed without parsing message strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Error occurred while decoding learned detections.
    LearnedDetection,
    /// Error occurred during tensor operations.
    TensorOperation,
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStage::LearnedDetection => write!(f, "learned detection"),
            ProcessingStage::TensorOperation => write!(f, "tensor operation"),
        }
    }
}

/// Enum representing the errors that can occur in the extraction pipeline.
///
/// Covers image loading, per-stage processing failures, ONNX session errors,
/// invalid input and configuration problems.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Error occurred while loading or decoding an image.
    #[error("image load")]
    ImageLoad(#[source] image::ImageError),

    /// Error occurred during a pipeline stage.
    #[error("{stage} failed: {context}")]
    Processing {
        /// The stage of the pipeline where the error occurred.
        stage: ProcessingStage,
        /// Additional context about the error.
        context: String,
    },

    /// Error occurred while loading or running the detector model.
    #[error("inference failed for model '{model_name}': {context}")]
    Inference {
        /// The name of the model where inference failed.
        model_name: String,
        /// Additional context about the inference error.
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error indicating invalid input.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },

    /// Error indicating a configuration problem.
    #[error("configuration: {message}")]
    ConfigError {
        /// A message describing the configuration error.
        message: String,
    },

    /// Error from the ONNX Runtime session.
    #[error(transparent)]
    Session(#[from] ort::Error),

    /// Error from basic tensor operations.
    #[error("tensor operation")]
    Tensor(#[from] ndarray::ShapeError),
}

impl From<image::ImageError> for ExtractError {
    fn from(error: image::ImageError) -> Self {
        Self::ImageLoad(error)
    }
}

impl ExtractError {
    /// Creates a configuration error with context and details.
    pub fn config_error(context: impl Into<String>, details: impl Into<String>) -> Self {
        Self::ConfigError {
            message: format!("{}: {}", context.into(), details.into()),
        }
    }

    /// Creates an invalid-input error from a message.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates a processing error for the given stage.
    pub fn processing(stage: ProcessingStage, context: impl Into<String>) -> Self {
        Self::Processing {
            stage,
            context: context.into(),
        }
    }

    /// Wraps an error that occurred while running the detector session.
    pub fn inference(
        model_name: impl Into<String>,
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Inference {
            model_name: model_name.into(),
            context: context.into(),
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_message() {
        let err = ExtractError::config_error("pipeline config", "nms_iou_threshold must be in [0, 1]");
        assert!(matches!(err, ExtractError::ConfigError { .. }));
        assert!(err.to_string().contains("nms_iou_threshold"));
    }

    #[test]
    fn test_processing_stage_display() {
        assert_eq!(
            ProcessingStage::LearnedDetection.to_string(),
            "learned detection"
        );
        assert_eq!(
            ProcessingStage::TensorOperation.to_string(),
            "tensor operation"
        );
    }

    #[test]
    fn test_processing_error_carries_stage() {
        let err = ExtractError::processing(ProcessingStage::TensorOperation, "mismatched shape");
        assert!(err.to_string().starts_with("tensor operation failed"));
    }
}
