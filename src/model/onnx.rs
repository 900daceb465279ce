// ONNX model - scorer backed by ONNX Runtime
//
// For classifiers exported straight from Keras (tf2onnx). The graph must take
// one f32 input of shape [batch, 40] and produce one probability per row as
// its first output.

use std::path::Path;
use std::sync::Mutex;

use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;

use crate::analysis::features::{FeatureBatch, FEATURE_LEN};
use crate::error::{ClassifyError, ModelError};
use crate::model::{lock_backend, ScoringModel};

/// ONNX Runtime session scoring one probability per row
///
/// `Session::run` needs `&mut self`, so the session sits behind a mutex; this
/// is the only lock on the classification path. A panic in one call does not
/// poison later ones.
pub struct OnnxModel {
    session: Mutex<Session>,
    path: String,
}

impl OnnxModel {
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let display = path.display().to_string();
        if !path.exists() {
            return Err(ModelError::ArtifactUnreadable {
                path: display,
                details: "file does not exist".to_string(),
            });
        }

        let builder = Session::builder().map_err(|err| ModelError::Malformed {
            reason: format!("failed to create ONNX session builder: {}", err),
        })?;
        #[allow(unused_mut)]
        let mut builder = builder
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|err| ModelError::Malformed {
                reason: format!("failed to configure ONNX session: {}", err),
            })?;
        let session = builder
            .commit_from_file(path)
            .map_err(|err| ModelError::Malformed {
                reason: format!("failed to load ONNX graph: {}", err),
            })?;

        log::info!("[OnnxModel] Loaded {}", display);

        Ok(Self {
            session: Mutex::new(session),
            path: display,
        })
    }
}

impl ScoringModel for OnnxModel {
    fn input_len(&self) -> usize {
        FEATURE_LEN
    }

    fn predict(&self, batch: &FeatureBatch) -> Result<Vec<f32>, ClassifyError> {
        let [rows, cols] = batch.shape();
        let input = Tensor::from_array(([rows, cols], batch.as_slice().to_vec()))
            .map_err(|err| ClassifyError::inference(format!("building input tensor: {}", err)))?;

        let mut session = lock_backend(&self.session);
        let outputs = session
            .run(ort::inputs![input])
            .map_err(|err| ClassifyError::inference(format!("ONNX inference failed: {}", err)))?;

        let (_, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|err| ClassifyError::inference(format!("reading ONNX output: {}", err)))?;

        Ok(data.to_vec())
    }

    fn describe(&self) -> String {
        format!("onnx[{}]", self.path)
    }
}
