// Dense model - pure Rust feed-forward scorer
//
// Loads a stack of fully-connected layers exported from the trained Keras
// classifier as JSON. Weights use the Keras `Dense` layout: `weights[i][j]`
// connects input `i` to output `j`.
//
// {
//   "input_dim": 40,
//   "layers": [
//     { "weights": [[...], ...], "bias": [...], "activation": "relu" },
//     { "weights": [[...], ...], "bias": [...], "activation": "sigmoid" }
//   ]
// }

use std::path::Path;

use serde::Deserialize;

use crate::analysis::features::{FeatureBatch, FEATURE_LEN};
use crate::error::{ClassifyError, ModelError};
use crate::model::ScoringModel;

/// Element-wise activation applied after a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Linear,
    Relu,
    Sigmoid,
    Tanh,
}

impl Activation {
    fn apply(self, x: f32) -> f32 {
        match self {
            Activation::Linear => x,
            Activation::Relu => x.max(0.0),
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Activation::Tanh => x.tanh(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DenseModelFile {
    input_dim: usize,
    layers: Vec<DenseLayerFile>,
}

#[derive(Debug, Deserialize)]
struct DenseLayerFile {
    weights: Vec<Vec<f32>>,
    bias: Vec<f32>,
    #[serde(default)]
    activation: Activation,
}

/// One fully-connected layer, weights stored row-major [inputs, outputs]
#[derive(Debug, Clone)]
struct DenseLayer {
    inputs: usize,
    outputs: usize,
    weights: Vec<f32>,
    bias: Vec<f32>,
    activation: Activation,
}

impl DenseLayer {
    fn forward(&self, input: &[f32], output: &mut Vec<f32>) {
        debug_assert_eq!(input.len(), self.inputs);
        output.clear();
        output.extend_from_slice(&self.bias);
        for (i, &x) in input.iter().enumerate() {
            if x == 0.0 {
                continue;
            }
            let row = &self.weights[i * self.outputs..(i + 1) * self.outputs];
            for (o, &w) in output.iter_mut().zip(row) {
                *o += x * w;
            }
        }
        for o in output.iter_mut() {
            *o = self.activation.apply(*o);
        }
    }
}

/// Feed-forward network scoring one probability per feature row
#[derive(Debug, Clone)]
pub struct DenseModel {
    input_dim: usize,
    layers: Vec<DenseLayer>,
}

impl DenseModel {
    /// Load and validate a JSON model artifact
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let contents =
            std::fs::read_to_string(path).map_err(|err| ModelError::ArtifactUnreadable {
                path: path.display().to_string(),
                details: err.to_string(),
            })?;
        Self::from_json(&contents)
    }

    /// Parse and validate a JSON model description
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let file: DenseModelFile =
            serde_json::from_str(json).map_err(|err| ModelError::Malformed {
                reason: err.to_string(),
            })?;

        if file.input_dim != FEATURE_LEN {
            return Err(ModelError::ShapeMismatch {
                reason: format!(
                    "input_dim must be {} (got {})",
                    FEATURE_LEN, file.input_dim
                ),
            });
        }
        if file.layers.is_empty() {
            return Err(ModelError::Malformed {
                reason: "model has no layers".to_string(),
            });
        }

        let mut layers = Vec::with_capacity(file.layers.len());
        let mut width = file.input_dim;

        for (index, layer) in file.layers.into_iter().enumerate() {
            if layer.weights.len() != width {
                return Err(ModelError::ShapeMismatch {
                    reason: format!(
                        "layer {} expects {} inputs but has {} weight rows",
                        index,
                        width,
                        layer.weights.len()
                    ),
                });
            }
            let outputs = layer.bias.len();
            if outputs == 0 {
                return Err(ModelError::ShapeMismatch {
                    reason: format!("layer {} has no outputs", index),
                });
            }
            if let Some(bad) = layer.weights.iter().position(|row| row.len() != outputs) {
                return Err(ModelError::ShapeMismatch {
                    reason: format!(
                        "layer {} weight row {} has {} columns, bias has {}",
                        index,
                        bad,
                        layer.weights[bad].len(),
                        outputs
                    ),
                });
            }

            layers.push(DenseLayer {
                inputs: width,
                outputs,
                weights: layer.weights.into_iter().flatten().collect(),
                bias: layer.bias,
                activation: layer.activation,
            });
            width = outputs;
        }

        if width != 1 {
            return Err(ModelError::ShapeMismatch {
                reason: format!("final layer must have 1 output (got {})", width),
            });
        }

        Ok(Self {
            input_dim: FEATURE_LEN,
            layers,
        })
    }

    fn forward_row(&self, row: &[f32]) -> f32 {
        let mut current = row.to_vec();
        let mut next = Vec::new();
        for layer in &self.layers {
            layer.forward(&current, &mut next);
            std::mem::swap(&mut current, &mut next);
        }
        current[0]
    }
}

impl ScoringModel for DenseModel {
    fn input_len(&self) -> usize {
        self.input_dim
    }

    fn predict(&self, batch: &FeatureBatch) -> Result<Vec<f32>, ClassifyError> {
        let [rows, cols] = batch.shape();
        if cols != self.input_dim {
            return Err(ClassifyError::inference(format!(
                "expected {} features per row, got {}",
                self.input_dim, cols
            )));
        }

        Ok((0..rows)
            .filter_map(|r| batch.row(r))
            .map(|row| self.forward_row(row))
            .collect())
    }

    fn describe(&self) -> String {
        let widths: Vec<String> = std::iter::once(self.input_dim)
            .chain(self.layers.iter().map(|l| l.outputs))
            .map(|w| w.to_string())
            .collect();
        format!("dense[{}]", widths.join("-"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::features::FeatureVector;

    fn single_layer_json(weight: f32, bias: f32, activation: &str) -> String {
        let rows: Vec<String> = (0..FEATURE_LEN).map(|_| format!("[{}]", weight)).collect();
        format!(
            r#"{{"input_dim":{},"layers":[{{"weights":[{}],"bias":[{}],"activation":"{}"}}]}}"#,
            FEATURE_LEN,
            rows.join(","),
            bias,
            activation
        )
    }

    #[test]
    fn test_zero_weights_sigmoid_scores_half() {
        let model = DenseModel::from_json(&single_layer_json(0.0, 0.0, "sigmoid")).unwrap();
        let batch = FeatureVector::new([3.0; FEATURE_LEN]).into_batch();
        let scores = model.predict(&batch).unwrap();
        assert_eq!(scores, vec![0.5]);
    }

    #[test]
    fn test_linear_layer_is_weighted_sum() {
        let model = DenseModel::from_json(&single_layer_json(0.5, 1.0, "linear")).unwrap();
        let batch = FeatureVector::new([2.0; FEATURE_LEN]).into_batch();
        let scores = model.predict(&batch).unwrap();
        // 40 * 2.0 * 0.5 + 1.0
        assert!((scores[0] - 41.0).abs() < 1e-4);
    }

    #[test]
    fn test_hidden_relu_layer_chains() {
        let hidden: Vec<String> = (0..FEATURE_LEN).map(|_| "[1.0, -1.0]".to_string()).collect();
        let json = format!(
            r#"{{"input_dim":40,"layers":[
                {{"weights":[{}],"bias":[0.0,0.0],"activation":"relu"}},
                {{"weights":[[1.0],[1.0]],"bias":[0.0]}}
            ]}}"#,
            hidden.join(",")
        );
        let model = DenseModel::from_json(&json).unwrap();
        assert_eq!(model.describe(), "dense[40-2-1]");

        let positive = FeatureVector::new([0.1; FEATURE_LEN]).into_batch();
        let negative = FeatureVector::new([-0.1; FEATURE_LEN]).into_batch();
        // relu keeps exactly one of the two hidden units alive
        assert!((model.predict(&positive).unwrap()[0] - 4.0).abs() < 1e-4);
        assert!((model.predict(&negative).unwrap()[0] - 4.0).abs() < 1e-4);
    }

    #[test]
    fn test_rejects_wrong_input_dim() {
        let err = DenseModel::from_json(r#"{"input_dim":13,"layers":[]}"#).unwrap_err();
        assert!(matches!(err, ModelError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_rejects_multi_output_head() {
        let rows: Vec<String> = (0..FEATURE_LEN).map(|_| "[0.0, 0.0]".to_string()).collect();
        let json = format!(
            r#"{{"input_dim":40,"layers":[{{"weights":[{}],"bias":[0.0,0.0],"activation":"sigmoid"}}]}}"#,
            rows.join(",")
        );
        let err = DenseModel::from_json(&json).unwrap_err();
        assert!(err.to_string().contains("final layer must have 1 output"));
    }

    #[test]
    fn test_rejects_ragged_weights() {
        let mut rows: Vec<String> = (0..FEATURE_LEN).map(|_| "[0.0]".to_string()).collect();
        rows[7] = "[0.0, 1.0]".to_string();
        let json = format!(
            r#"{{"input_dim":40,"layers":[{{"weights":[{}],"bias":[0.0]}}]}}"#,
            rows.join(",")
        );
        let err = DenseModel::from_json(&json).unwrap_err();
        assert!(err.to_string().contains("row 7"));
    }

    #[test]
    fn test_rejects_invalid_json() {
        let err = DenseModel::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ModelError::Malformed { .. }));
    }
}
