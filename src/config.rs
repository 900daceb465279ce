//! Configuration management for the classification service
//!
//! This module provides runtime configuration loading from JSON files, so
//! the model artifact, MFCC framing and server settings can be changed
//! without recompilation. Missing or invalid files fall back to defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::analysis::features::FeatureConfig;

/// Environment variable naming the config file used by `AppConfig::load`
pub const CONFIG_ENV_VAR: &str = "ENGINE_DETECTOR_CONFIG";

/// Environment variable overriding the project root for relative paths
pub const ROOT_ENV_VAR: &str = "ENGINE_DETECTOR_ROOT";

/// Config file read when `ENGINE_DETECTOR_CONFIG` is unset
pub const DEFAULT_CONFIG_PATH: &str = "assets/engine_config.json";

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub model: ModelConfig,
    pub features: FeatureConfig,
    pub server: ServerConfig,
}

/// Scoring model artifact location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model artifact path, relative paths resolve against the project root
    pub path: PathBuf,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("engine_fault_detection/engine_fault_classifier.json"),
        }
    }
}

/// HTTP boundary configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind
    pub addr: String,
    /// Directory for uploaded audio (None = system temp dir)
    pub temp_dir: Option<PathBuf>,
    /// Largest accepted request body in bytes
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8000".to_string(),
            temp_dir: None,
            max_body_bytes: 50 * 1024 * 1024,
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The loaded configuration. If the file doesn't exist, the JSON is
    /// invalid, or the feature parameters fail validation, returns the
    /// default config.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        let config: Self = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    return Self::default();
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                return Self::default();
            }
        };

        if let Err(reason) = config.features.validate() {
            log::warn!(
                "[Config] Invalid feature parameters in {:?}: {}. Using defaults.",
                path.as_ref(),
                reason
            );
            return Self::default();
        }

        config
    }

    /// Load configuration from `ENGINE_DETECTOR_CONFIG`, or the bundled
    /// `assets/engine_config.json` under the project root
    pub fn load() -> Self {
        match env::var_os(CONFIG_ENV_VAR) {
            Some(path) => Self::load_from_file(PathBuf::from(path)),
            None => Self::load_from_file(project_root().join(DEFAULT_CONFIG_PATH)),
        }
    }

    /// Absolute path of the model artifact
    pub fn resolve_model_path(&self) -> PathBuf {
        self.resolve_model_path_from(&project_root())
    }

    /// Resolve the model path against an explicit root
    pub fn resolve_model_path_from(&self, root: &Path) -> PathBuf {
        if self.model.path.is_absolute() {
            self.model.path.clone()
        } else {
            root.join(&self.model.path)
        }
    }
}

/// Project root: `ENGINE_DETECTOR_ROOT` if set, else the current directory
pub fn project_root() -> PathBuf {
    env::var_os(ROOT_ENV_VAR)
        .map(PathBuf::from)
        .or_else(|| env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}
