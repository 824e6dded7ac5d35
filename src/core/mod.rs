//! Core building blocks shared by every pipeline stage.
//!
//! Contains the error types, configuration structures and the ONNX session
//! wrapper used by the learned detector.

pub mod config;
pub mod errors;
pub mod inference;

pub use config::{HeuristicConfig, PipelineConfig};
pub use errors::{ExtractError, ProcessingStage};
pub use inference::{DetectorSession, ModelInfo, SessionState, Tensor3D, Tensor4D};
