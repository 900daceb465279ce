// Classifier - maps a model probability to an engine condition
//
// The scoring model emits p = P(Not Faulty). The decision rule is a strict
// threshold: class 1 ("Not Faulty") iff p > 0.5, so a tie at exactly 0.5
// resolves to class 0 ("Faulty"). Confidence is the probability of the chosen
// class as a percentage.

use std::sync::Arc;

use serde::Serialize;

use crate::analysis::features::FeatureVector;
use crate::error::ClassifyError;
use crate::model::ScoringModel;

/// Probability above which a recording is "Not Faulty"
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Predicted engine condition
///
/// Class indices are fixed: 0 = Faulty, 1 = Not Faulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EngineCondition {
    Faulty,
    NotFaulty,
}

impl EngineCondition {
    /// Apply the strict 0.5 threshold
    pub fn from_probability(probability: f64) -> Self {
        if probability > DECISION_THRESHOLD {
            EngineCondition::NotFaulty
        } else {
            EngineCondition::Faulty
        }
    }

    pub fn class_index(self) -> u8 {
        match self {
            EngineCondition::Faulty => 0,
            EngineCondition::NotFaulty => 1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EngineCondition::Faulty => "Faulty",
            EngineCondition::NotFaulty => "Not Faulty",
        }
    }
}

/// Successful classification of one recording
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub condition: EngineCondition,
    /// Probability of the chosen class in percent, 2 decimal places
    pub confidence: f64,
    /// Raw model probability of "Not Faulty", 4 decimal places
    pub probability: f64,
}

impl Prediction {
    /// Build a prediction from the raw model output
    ///
    /// Rounding happens after the decision and confidence are computed from
    /// the unrounded value.
    pub fn from_probability(probability: f64) -> Self {
        let condition = EngineCondition::from_probability(probability);
        let confidence = match condition {
            EngineCondition::NotFaulty => probability,
            EngineCondition::Faulty => 1.0 - probability,
        };

        Self {
            condition,
            confidence: round_to(confidence * 100.0, 2),
            probability: round_to(probability, 4),
        }
    }

    pub fn predicted_class(&self) -> u8 {
        self.condition.class_index()
    }

    pub fn predicted_label(&self) -> &'static str {
        self.condition.label()
    }
}

/// Round half away from zero to `places` decimal places
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Classifier scores feature vectors with an injected model
///
/// The model is shared read-only (`Arc<dyn ScoringModel>`); the classifier
/// itself holds no mutable state.
pub struct Classifier {
    model: Arc<dyn ScoringModel>,
}

impl Classifier {
    /// Create a new Classifier around a loaded model
    pub fn new(model: Arc<dyn ScoringModel>) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &Arc<dyn ScoringModel> {
        &self.model
    }

    /// Score one feature vector
    ///
    /// The vector is reshaped into a single-row batch, scored, and the one
    /// output probability is mapped to a `Prediction`.
    ///
    /// # Errors
    /// `Inference` if the model rejects the batch, returns a row count other
    /// than 1, or returns a value that is not a probability in [0, 1].
    pub fn classify(&self, features: &FeatureVector) -> Result<Prediction, ClassifyError> {
        if self.model.input_len() != features.len() {
            return Err(ClassifyError::inference(format!(
                "model expects {} features, extractor produced {}",
                self.model.input_len(),
                features.len()
            )));
        }

        let batch = features.into_batch();
        let scores = self.model.predict(&batch)?;

        let probability = match scores.as_slice() {
            [p] => *p as f64,
            other => {
                return Err(ClassifyError::inference(format!(
                    "expected 1 output row, got {}",
                    other.len()
                )))
            }
        };

        if !(0.0..=1.0).contains(&probability) {
            return Err(ClassifyError::inference(format!(
                "model output {} is not a probability in [0, 1]",
                probability
            )));
        }

        let prediction = Prediction::from_probability(probability);
        log::debug!(
            "[Classifier] p={:.6} -> {} ({:.2}%)",
            probability,
            prediction.predicted_label(),
            prediction.confidence
        );
        Ok(prediction)
    }
}

#[cfg(test)]
#[path = "classifier_tests.rs"]
mod tests;
