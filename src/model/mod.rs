// Scoring model - the pretrained function from feature vector to probability
//
// The model artifact is loaded once at startup and then only read. Backends:
// - dense: pure Rust feed-forward network from a JSON export (default)
// - onnx: ONNX Runtime session (requires the `onnx` feature)

mod dense;
#[cfg(feature = "onnx")]
mod onnx;

pub use dense::{Activation, DenseModel};
#[cfg(feature = "onnx")]
pub use onnx::OnnxModel;

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::analysis::features::FeatureBatch;
use crate::error::{ClassifyError, ModelError};

/// Immutable scorer shared read-only across classification calls
///
/// `predict` returns the probability of "Not Faulty" for every row of the
/// batch, in row order.
pub trait ScoringModel: Send + Sync {
    /// Number of features expected per row
    fn input_len(&self) -> usize;

    /// Score a batch of feature rows
    fn predict(&self, batch: &FeatureBatch) -> Result<Vec<f32>, ClassifyError>;

    /// Short description for logs and health checks
    fn describe(&self) -> String {
        "scoring-model".to_string()
    }
}

/// Lock a backend's inner state, recovering it if a prior holder panicked
///
/// Backend state stays valid across a panic in one call, so later calls keep
/// scoring instead of failing on a poisoned lock.
#[cfg_attr(not(feature = "onnx"), allow(dead_code))]
pub(crate) fn lock_backend<T>(state: &Mutex<T>) -> MutexGuard<'_, T> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Load a model artifact, choosing the backend from the file extension
///
/// `.json` loads a `DenseModel`; `.onnx` loads an `OnnxModel` when the
/// `onnx` feature is enabled.
pub fn load_model(path: &Path) -> Result<Arc<dyn ScoringModel>, ModelError> {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    let model: Arc<dyn ScoringModel> = match extension.as_str() {
        "json" => Arc::new(DenseModel::load(path)?),
        #[cfg(feature = "onnx")]
        "onnx" => Arc::new(OnnxModel::load(path)?),
        _ => {
            return Err(ModelError::UnsupportedFormat {
                path: path.display().to_string(),
            })
        }
    };

    log::info!(
        "[Model] Loaded {} from {}",
        model.describe(),
        path.display()
    );
    Ok(model)
}
