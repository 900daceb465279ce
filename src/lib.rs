// Engine Fault Detector Core - Rust classification engine
// Audio file in, "Faulty" / "Not Faulty" decision out

// Module declarations
pub mod analysis;
pub mod audio;
pub mod config;
pub mod context;
pub mod error;
#[cfg(feature = "http")]
pub mod http;
pub mod model;

// Re-exports for convenience
pub use analysis::classifier::{EngineCondition, Prediction};
pub use analysis::features::{FeatureVector, FEATURE_LEN};
pub use analysis::ClassificationResult;
pub use config::AppConfig;
pub use context::AppContext;
pub use error::{ClassifyError, ErrorCode, ModelError};
pub use model::{load_model, ScoringModel};

use tracing_subscriber::EnvFilter;

/// Install the stderr tracing subscriber used by the binaries
///
/// `RUST_LOG` overrides `default_filter`. Calling this more than once is a
/// no-op. `log` records from library code are bridged into tracing.
pub fn init_logging(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
