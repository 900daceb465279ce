// AppContext: Dependency Injection Container
// Owns the process-wide scoring model and the pipeline built around it

use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;

use crate::analysis::classifier::Classifier;
use crate::analysis::features::{FeatureExtractor, FeatureVector};
use crate::analysis::{AnalysisPipeline, ClassificationResult};
use crate::audio::FormatNormalizer;
use crate::config::AppConfig;
use crate::error::{log_model_error, ClassifyError};
use crate::model::{load_model, ScoringModel};

/// AppContext: Dependency injection container for all application state
///
/// Loaded once before any request is served:
/// - AppConfig the context was built from
/// - Scoring model, shared read-only across calls
/// - AnalysisPipeline with the model injected into its Classifier
///
/// Nothing here is mutable after construction, so one context can be shared
/// across threads behind an `Arc`.
pub struct AppContext {
    config: AppConfig,
    model: Arc<dyn ScoringModel>,
    pipeline: AnalysisPipeline,
}

impl AppContext {
    /// Load the model named by `config` and build the pipeline
    ///
    /// A model that cannot be loaded is fatal: no context is created.
    pub fn init(config: AppConfig) -> anyhow::Result<Self> {
        let model_path = config.resolve_model_path();
        let model = load_model(&model_path)
            .map_err(|err| {
                log_model_error(&err, "AppContext::init");
                err
            })
            .with_context(|| format!("loading scoring model from {}", model_path.display()))?;

        Self::from_parts(config, model)
    }

    /// Build a context around an already-loaded model
    ///
    /// Feature parameters are checked here so an invalid configuration never
    /// reaches the STFT.
    pub fn from_parts(config: AppConfig, model: Arc<dyn ScoringModel>) -> anyhow::Result<Self> {
        config
            .features
            .validate()
            .map_err(|reason| anyhow::anyhow!("invalid feature configuration: {}", reason))?;

        let normalizer = match &config.server.temp_dir {
            Some(dir) => FormatNormalizer::with_temp_dir(dir.clone()),
            None => FormatNormalizer::new(),
        };
        let extractor = FeatureExtractor::new(config.features.clone());
        let classifier = Classifier::new(Arc::clone(&model));

        tracing::info!(
            "[AppContext] Ready with {} (n_fft={}, hop={}, n_mels={})",
            model.describe(),
            config.features.n_fft,
            config.features.hop_length,
            config.features.n_mels
        );

        Ok(Self {
            pipeline: AnalysisPipeline::new(normalizer, extractor, classifier),
            config,
            model,
        })
    }

    /// Classify one audio file; failures come back as a failure result
    pub fn classify(&self, path: &Path) -> ClassificationResult {
        self.pipeline.classify(path)
    }

    /// Compute the feature vector of one audio file
    pub fn extract_features(&self, path: &Path) -> Result<FeatureVector, ClassifyError> {
        self.pipeline.extract(path)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn model(&self) -> &Arc<dyn ScoringModel> {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::features::{FeatureBatch, FEATURE_LEN};

    struct HalfModel;

    impl ScoringModel for HalfModel {
        fn input_len(&self) -> usize {
            FEATURE_LEN
        }

        fn predict(&self, batch: &FeatureBatch) -> Result<Vec<f32>, ClassifyError> {
            Ok(vec![0.5; batch.rows()])
        }
    }

    #[test]
    fn test_init_fails_without_model() {
        let mut config = AppConfig::default();
        config.model.path = "/nonexistent/engine_fault_classifier.json".into();
        let err = match AppContext::init(config) {
            Err(err) => err,
            Ok(_) => panic!("init must fail without a model"),
        };
        assert!(format!("{:#}", err).contains("loading scoring model"));
    }

    #[test]
    fn test_init_loads_json_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let rows: Vec<String> = (0..FEATURE_LEN).map(|_| "[0.0]".to_string()).collect();
        std::fs::write(
            &path,
            format!(
                r#"{{"input_dim":40,"layers":[{{"weights":[{}],"bias":[0.0],"activation":"sigmoid"}}]}}"#,
                rows.join(",")
            ),
        )
        .unwrap();

        let mut config = AppConfig::default();
        config.model.path = path;
        let ctx = AppContext::init(config).expect("init");
        assert_eq!(ctx.model().input_len(), FEATURE_LEN);
    }

    #[test]
    fn test_from_parts_injects_model() {
        let ctx = AppContext::from_parts(AppConfig::default(), Arc::new(HalfModel)).unwrap();
        let result = ctx.classify(Path::new("/no/such/file.wav"));
        assert!(!result.is_success());
        assert_eq!(ctx.config().features.n_mels, 128);
    }

    #[test]
    fn test_from_parts_rejects_invalid_features() {
        let mut config = AppConfig::default();
        config.features.hop_length = 0;
        let err = match AppContext::from_parts(config, Arc::new(HalfModel)) {
            Err(err) => err,
            Ok(_) => panic!("hop_length 0 must be rejected"),
        };
        assert!(err.to_string().contains("invalid feature configuration"));
        assert!(err.to_string().contains("hop_length"));
    }

    #[test]
    fn test_parallel_contexts_are_independent() {
        let ctx1 = AppContext::from_parts(AppConfig::default(), Arc::new(HalfModel)).unwrap();
        let mut config = AppConfig::default();
        config.features.hop_length = 256;
        let ctx2 = AppContext::from_parts(config, Arc::new(HalfModel)).unwrap();

        assert_eq!(ctx1.config().features.hop_length, 512);
        assert_eq!(ctx2.config().features.hop_length, 256);
    }
}
