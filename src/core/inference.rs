//! ONNX Runtime session management for the learned detector.
//!
//! [`DetectorSession`] wraps an `ort` session behind a mutex and a small
//! state machine. The session is loaded lazily on first use; a load failure
//! parks the slot in `Failed` so later calls skip inference without retrying
//! the load. [`DetectorSession::re_arm`] resets the slot so a fixed model
//! file can be picked up without rebuilding the pipeline.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ndarray::{Array3, Array4, ArrayView3};
use ort::session::Session;
use ort::value::TensorRef;
use serde::Serialize;
use tracing::{debug, warn};

use super::errors::{ExtractError, ProcessingStage};

/// 3D tensor of f32 values.
pub type Tensor3D = Array3<f32>;
/// 4D tensor of f32 values.
pub type Tensor4D = Array4<f32>;

enum SessionSlot {
    /// No load attempted yet.
    Uninitialized,
    /// Session loaded and usable.
    Ready(Session),
    /// Load failed; inference is skipped until `re_arm`.
    Failed,
}

/// Lifecycle state of the detector session, as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// The model has not been loaded yet.
    Uninitialized,
    /// The model is loaded and ready for inference.
    Ready,
    /// The model failed to load.
    Failed,
}

/// Serializable summary of the detector model.
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    /// Path of the model file on disk.
    pub model_path: String,
    /// Current lifecycle state of the session.
    pub state: SessionState,
    /// Name of the model input, once the session is loaded.
    pub input_name: Option<String>,
    /// Name of the model output, once the session is loaded.
    pub output_name: Option<String>,
}

/// A lazily-initialized, mutex-serialized ONNX detector session.
pub struct DetectorSession {
    model_path: PathBuf,
    slot: Mutex<SessionSlot>,
}

impl std::fmt::Debug for DetectorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectorSession")
            .field("model_path", &self.model_path)
            .field("state", &self.state())
            .finish()
    }
}

impl DetectorSession {
    /// Creates a session handle for the model at `model_path`.
    ///
    /// The model file is not touched until the first inference call.
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            slot: Mutex::new(SessionSlot::Uninitialized),
        }
    }

    /// Returns the path of the model file.
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> SessionState {
        match self.slot.lock() {
            Ok(guard) => match &*guard {
                SessionSlot::Uninitialized => SessionState::Uninitialized,
                SessionSlot::Ready(_) => SessionState::Ready,
                SessionSlot::Failed => SessionState::Failed,
            },
            // A poisoned lock means a panic mid-inference; report Failed.
            Err(_) => SessionState::Failed,
        }
    }

    /// Returns true once the session has been loaded successfully.
    pub fn is_ready(&self) -> bool {
        self.state() == SessionState::Ready
    }

    /// Returns a serializable summary of the model and session state.
    pub fn model_info(&self) -> ModelInfo {
        let (state, input_name, output_name) = match self.slot.lock() {
            Ok(guard) => match &*guard {
                SessionSlot::Uninitialized => (SessionState::Uninitialized, None, None),
                SessionSlot::Ready(session) => (
                    SessionState::Ready,
                    session.inputs.first().map(|i| i.name.clone()),
                    session.outputs.first().map(|o| o.name.clone()),
                ),
                SessionSlot::Failed => (SessionState::Failed, None, None),
            },
            Err(_) => (SessionState::Failed, None, None),
        };
        ModelInfo {
            model_path: self.model_path.display().to_string(),
            state,
            input_name,
            output_name,
        }
    }

    /// Resets a `Failed` (or `Ready`) slot back to `Uninitialized` so the
    /// next inference call attempts a fresh load.
    pub fn re_arm(&self) -> Result<(), ExtractError> {
        let mut guard = self.slot.lock().map_err(|_| {
            ExtractError::invalid_input("detector session lock poisoned")
        })?;
        *guard = SessionSlot::Uninitialized;
        debug!(model_path = %self.model_path.display(), "detector session re-armed");
        Ok(())
    }

    /// Runs the detector over a `[1, 3, S, S]` input tensor.
    ///
    /// Returns `Ok(None)` when the session is in the `Failed` state (including
    /// when the lazy load fails on this call), so the caller can degrade to
    /// heuristic-only detection. Inference errors on a loaded session are
    /// reported as `Err`.
    pub fn infer_3d(&self, x: &Tensor4D) -> Result<Option<Tensor3D>, ExtractError> {
        let mut guard = self.slot.lock().map_err(|_| {
            ExtractError::invalid_input("detector session lock poisoned")
        })?;

        if matches!(*guard, SessionSlot::Uninitialized) {
            match Session::builder().and_then(|b| b.commit_from_file(&self.model_path)) {
                Ok(session) => {
                    debug!(model_path = %self.model_path.display(), "detector model loaded");
                    *guard = SessionSlot::Ready(session);
                }
                Err(e) => {
                    warn!(
                        model_path = %self.model_path.display(),
                        error = %e,
                        "detector model failed to load, continuing without learned detection"
                    );
                    *guard = SessionSlot::Failed;
                }
            }
        }

        let session = match &mut *guard {
            SessionSlot::Ready(session) => session,
            _ => return Ok(None),
        };

        let model_name = "design_detector";
        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .ok_or_else(|| {
                ExtractError::invalid_input("detector model declares no inputs")
            })?;
        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| {
                ExtractError::invalid_input("detector model declares no outputs")
            })?;

        let input_tensor = TensorRef::from_array_view(x.view()).map_err(|e| {
            ExtractError::inference(model_name, "failed to convert input tensor", e)
        })?;
        let inputs = ort::inputs![input_name.as_str() => input_tensor];

        let outputs = session.run(inputs).map_err(|e| {
            ExtractError::inference(model_name, "forward pass failed", e)
        })?;

        let (output_shape, output_data) = outputs[output_name.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(|e| {
                ExtractError::inference(
                    model_name,
                    format!("failed to extract output '{output_name}' as f32"),
                    e,
                )
            })?;

        if output_shape.len() != 3 {
            return Err(ExtractError::processing(
                ProcessingStage::TensorOperation,
                format!(
                    "expected 3D detector output, got {}D with shape {:?}",
                    output_shape.len(),
                    output_shape
                ),
            ));
        }

        let dims = (
            output_shape[0] as usize,
            output_shape[1] as usize,
            output_shape[2] as usize,
        );
        let view = ArrayView3::from_shape(dims, output_data).map_err(ExtractError::Tensor)?;
        Ok(Some(view.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_uninitialized() {
        let session = DetectorSession::new("models/nonexistent.onnx");
        assert_eq!(session.state(), SessionState::Uninitialized);
        assert!(!session.is_ready());
    }

    #[test]
    fn test_missing_model_degrades_to_none() {
        let session = DetectorSession::new("models/nonexistent.onnx");
        let input = Tensor4D::zeros((1, 3, 8, 8));
        let result = session.infer_3d(&input).unwrap();
        assert!(result.is_none());
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[test]
    fn test_failed_load_is_not_retried() {
        let session = DetectorSession::new("models/nonexistent.onnx");
        let input = Tensor4D::zeros((1, 3, 8, 8));
        assert!(session.infer_3d(&input).unwrap().is_none());
        // Still Failed on the second call, no fresh load attempt observable.
        assert!(session.infer_3d(&input).unwrap().is_none());
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[test]
    fn test_corrupt_model_file_degrades_to_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.onnx");
        std::fs::write(&path, b"not a model").unwrap();
        let session = DetectorSession::new(&path);
        let input = Tensor4D::zeros((1, 3, 8, 8));
        assert!(session.infer_3d(&input).unwrap().is_none());
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[test]
    fn test_re_arm_resets_state() {
        let session = DetectorSession::new("models/nonexistent.onnx");
        let input = Tensor4D::zeros((1, 3, 8, 8));
        assert!(session.infer_3d(&input).unwrap().is_none());
        session.re_arm().unwrap();
        assert_eq!(session.state(), SessionState::Uninitialized);
    }

    #[test]
    fn test_model_info_reports_path_and_state() {
        let session = DetectorSession::new("models/detector.onnx");
        let info = session.model_info();
        assert_eq!(info.model_path, "models/detector.onnx");
        assert_eq!(info.state, SessionState::Uninitialized);
        assert!(info.input_name.is_none());
    }
}
