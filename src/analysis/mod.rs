// Analysis module - audio file to engine-condition decision
//
// This module orchestrates the complete classification pipeline for one
// recording and folds every failure into a result record.
//
// Architecture:
// - AnalysisPipeline: existence check → FormatNormalizer → WAV decode →
//   FeatureExtractor → Classifier
// - Output: ClassificationResult, serialized to JSON by the CLI and HTTP layer

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::audio::{read_wav, FormatNormalizer};
use crate::error::{log_classify_error, ClassifyError, ErrorCode};

pub mod classifier;
pub mod features;

use classifier::{Classifier, Prediction};
use features::{FeatureExtractor, FeatureVector};

/// Failure half of a classification result
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationFailure {
    /// Human-readable message, includes the offending path
    pub error: String,
    /// Stable category name (see `ClassifyError::kind`)
    pub kind: &'static str,
    /// Numeric error code (see `ClassifyErrorCodes`)
    pub code: i32,
}

/// Outcome of classifying one recording
///
/// Serializes to `{success: true, predicted_class, predicted_label,
/// confidence, probability}` or `{success: false, error, error_kind,
/// error_code}`.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassificationResult {
    Success(Prediction),
    Failure(ClassificationFailure),
}

impl ClassificationResult {
    /// Fold a pipeline error into a failure record
    ///
    /// Missing files keep their bare "File not found: <path>" message; every
    /// other error gets the path appended.
    pub fn from_error(err: &ClassifyError, path: Option<&Path>) -> Self {
        let error = match (err, path) {
            (ClassifyError::FileNotFound { .. }, _) | (_, None) => err.message(),
            (_, Some(path)) => format!("{} | file_path: {}", err.message(), path.display()),
        };

        ClassificationResult::Failure(ClassificationFailure {
            error,
            kind: err.kind(),
            code: err.code(),
        })
    }

    /// Failure without an underlying pipeline error (e.g. empty upload)
    pub fn failure_message(message: impl Into<String>) -> Self {
        let err = ClassifyError::Unknown {
            details: message.into(),
        };
        Self::from_error(&err, None)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ClassificationResult::Success(_))
    }

    pub fn prediction(&self) -> Option<&Prediction> {
        match self {
            ClassificationResult::Success(prediction) => Some(prediction),
            ClassificationResult::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&ClassificationFailure> {
        match self {
            ClassificationResult::Success(_) => None,
            ClassificationResult::Failure(failure) => Some(failure),
        }
    }
}

impl From<Prediction> for ClassificationResult {
    fn from(prediction: Prediction) -> Self {
        ClassificationResult::Success(prediction)
    }
}

impl Serialize for ClassificationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ClassificationResult::Success(prediction) => {
                let mut state = serializer.serialize_struct("ClassificationResult", 5)?;
                state.serialize_field("success", &true)?;
                state.serialize_field("predicted_class", &prediction.predicted_class())?;
                state.serialize_field("predicted_label", prediction.predicted_label())?;
                state.serialize_field("confidence", &prediction.confidence)?;
                state.serialize_field("probability", &prediction.probability)?;
                state.end()
            }
            ClassificationResult::Failure(failure) => {
                let mut state = serializer.serialize_struct("ClassificationResult", 4)?;
                state.serialize_field("success", &false)?;
                state.serialize_field("error", &failure.error)?;
                state.serialize_field("error_kind", failure.kind)?;
                state.serialize_field("error_code", &failure.code)?;
                state.end()
            }
        }
    }
}

/// End-to-end pipeline for a single recording
///
/// Stateless between calls: every intermediate (temp WAV, samples, features)
/// is scoped to one `classify` call. Safe to share across threads.
pub struct AnalysisPipeline {
    normalizer: FormatNormalizer,
    extractor: FeatureExtractor,
    classifier: Classifier,
}

impl AnalysisPipeline {
    pub fn new(
        normalizer: FormatNormalizer,
        extractor: FeatureExtractor,
        classifier: Classifier,
    ) -> Self {
        Self {
            normalizer,
            extractor,
            classifier,
        }
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Compute the feature vector of an audio file
    ///
    /// Non-WAV input is transcoded to a temporary WAV first; the temporary
    /// file is removed when this function returns, on success or failure.
    /// A panic during extraction is returned as `ClassifyError::Unknown`.
    pub fn extract(&self, path: &Path) -> Result<FeatureVector, ClassifyError> {
        contain_panics(|| self.decode_and_extract(path))
    }

    fn decode_and_extract(&self, path: &Path) -> Result<FeatureVector, ClassifyError> {
        if !path.exists() {
            return Err(ClassifyError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let normalized = self.normalizer.normalize(path)?;
        if normalized.is_transcoded() {
            tracing::debug!(
                "[AnalysisPipeline] Transcoded {} -> {}",
                path.display(),
                normalized.path().display()
            );
        }

        let audio = read_wav(normalized.path())?;
        tracing::debug!(
            "[AnalysisPipeline] Decoded {} ({} Hz, {} ch, {} ms)",
            path.display(),
            audio.sample_rate,
            audio.source_channels,
            audio.duration_ms()
        );

        self.extractor.extract(&audio)
    }

    /// Classify an audio file, returning the typed error on failure
    pub fn try_classify(&self, path: &Path) -> Result<Prediction, ClassifyError> {
        contain_panics(|| {
            let features = self.decode_and_extract(path)?;
            self.classifier.classify(&features)
        })
    }

    /// Classify an audio file
    ///
    /// Never fails and never panics: every error, including a panic inside
    /// the pipeline, comes back as a failure result.
    pub fn classify(&self, path: &Path) -> ClassificationResult {
        match self.try_classify(path) {
            Ok(prediction) => {
                tracing::info!(
                    "[AnalysisPipeline] {} -> {} ({:.2}%)",
                    path.display(),
                    prediction.predicted_label(),
                    prediction.confidence
                );
                ClassificationResult::Success(prediction)
            }
            Err(err) => {
                log_classify_error(
                    &err,
                    &format!("AnalysisPipeline::classify({})", path.display()),
                );
                ClassificationResult::from_error(&err, Some(path))
            }
        }
    }
}

/// Run one pipeline stage, turning a panic into `ClassifyError::Unknown`
fn contain_panics<T>(
    stage: impl FnOnce() -> Result<T, ClassifyError>,
) -> Result<T, ClassifyError> {
    panic::catch_unwind(AssertUnwindSafe(stage)).unwrap_or_else(|payload| {
        Err(ClassifyError::Unknown {
            details: format!("internal error: {}", panic_message(payload.as_ref())),
        })
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::classifier::EngineCondition;
    use crate::analysis::features::{FeatureBatch, FeatureConfig, FEATURE_LEN};
    use crate::model::ScoringModel;
    use std::path::PathBuf;
    use std::sync::Arc;

    struct ConstantModel(f32);

    impl ScoringModel for ConstantModel {
        fn input_len(&self) -> usize {
            FEATURE_LEN
        }

        fn predict(&self, batch: &FeatureBatch) -> Result<Vec<f32>, ClassifyError> {
            Ok(vec![self.0; batch.rows()])
        }
    }

    struct PanickingModel;

    impl ScoringModel for PanickingModel {
        fn input_len(&self) -> usize {
            FEATURE_LEN
        }

        fn predict(&self, _batch: &FeatureBatch) -> Result<Vec<f32>, ClassifyError> {
            panic!("model exploded");
        }
    }

    fn pipeline(model: Arc<dyn ScoringModel>) -> AnalysisPipeline {
        AnalysisPipeline::new(
            FormatNormalizer::new(),
            FeatureExtractor::default(),
            Classifier::new(model),
        )
    }

    fn write_tone(dir: &Path, name: &str, sample_rate: u32) -> PathBuf {
        let path = dir.join(name);
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..sample_rate {
            let t = i as f32 / sample_rate as f32;
            let sample = (2.0 * std::f32::consts::PI * 120.0 * t).sin() * 0.5;
            writer.write_sample((sample * i16::MAX as f32) as i16).unwrap();
        }
        writer.finalize().unwrap();
        path
    }

    #[test]
    fn test_success_serializes_to_wire_shape() {
        let result = ClassificationResult::from(Prediction::from_probability(0.9));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["predicted_class"], 1);
        assert_eq!(json["predicted_label"], "Not Faulty");
        assert_eq!(json["confidence"], 90.0);
        assert_eq!(json["probability"], 0.9);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_failure_serializes_to_wire_shape() {
        let err = ClassifyError::decode("bad header");
        let result = ClassificationResult::from_error(&err, Some(Path::new("/tmp/x.wav")));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(
            json["error"],
            "Decode error: bad header | file_path: /tmp/x.wav"
        );
        assert_eq!(json["error_kind"], "decode_error");
        assert_eq!(json["error_code"], 3003);
        assert!(json.get("predicted_class").is_none());
    }

    #[test]
    fn test_missing_file_message_has_no_suffix() {
        let result = pipeline(Arc::new(ConstantModel(0.9)))
            .classify(Path::new("/no/such/engine.wav"));
        let failure = result.failure().expect("must fail");
        assert_eq!(failure.error, "File not found: /no/such/engine.wav");
        assert_eq!(failure.kind, "file_not_found");
    }

    #[test]
    fn test_classify_tone_with_constant_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tone(dir.path(), "engine.wav", 16_000);

        let result = pipeline(Arc::new(ConstantModel(0.8))).classify(&path);
        let prediction = result.prediction().expect("success");
        assert_eq!(prediction.condition, EngineCondition::NotFaulty);
        assert_eq!(prediction.confidence, 80.0);
    }

    #[test]
    fn test_try_classify_returns_typed_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.wav");
        std::fs::write(&path, b"definitely not RIFF").unwrap();

        let err = pipeline(Arc::new(ConstantModel(0.8)))
            .try_classify(&path)
            .unwrap_err();
        assert_eq!(err.kind(), "decode_error");
    }

    #[test]
    fn test_panic_in_model_becomes_unknown_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tone(dir.path(), "engine.wav", 8_000);

        let result = pipeline(Arc::new(PanickingModel)).classify(&path);
        let failure = result.failure().expect("panic must be contained");
        assert_eq!(failure.kind, "unknown");
        assert!(failure.error.contains("model exploded"));
        assert!(failure.error.contains("engine.wav"));
    }

    #[test]
    fn test_extract_contains_invalid_hop_panic() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tone(dir.path(), "engine.wav", 8_000);
        let extractor = FeatureExtractor::new(FeatureConfig {
            hop_length: 0,
            ..FeatureConfig::default()
        });
        let pipeline = AnalysisPipeline::new(
            FormatNormalizer::new(),
            extractor,
            Classifier::new(Arc::new(ConstantModel(0.9))),
        );

        let err = pipeline.extract(&path).unwrap_err();
        assert_eq!(err.kind(), "unknown");
        assert!(err.message().contains("internal error"));

        let err = pipeline.try_classify(&path).unwrap_err();
        assert_eq!(err.kind(), "unknown");
    }

    #[test]
    fn test_failure_is_logged_and_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.wav");
        std::fs::write(&path, b"RIFF\x10\x00\x00\x00WAVEjunkjunkjunk").unwrap();

        let result = pipeline(Arc::new(ConstantModel(0.9))).classify(&path);
        let failure = result.failure().expect("truncated WAV must fail");
        assert_eq!(failure.kind, "decode_error");
        assert!(failure.error.ends_with(&format!("| file_path: {}", path.display())));
    }

    #[test]
    fn test_failure_message_without_path() {
        let result = ClassificationResult::failure_message("No audio file or data provided");
        let failure = result.failure().unwrap();
        assert_eq!(failure.error, "No audio file or data provided");
        assert!(!result.is_success());
    }
}
