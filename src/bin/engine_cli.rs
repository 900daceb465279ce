use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
#[cfg(feature = "http")]
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use engine_fault_detector::analysis::ClassificationResult;
use engine_fault_detector::config::AppConfig;
use engine_fault_detector::context::AppContext;

#[derive(Parser, Debug)]
#[command(
    name = "engine_cli",
    about = "Classify engine recordings as Faulty / Not Faulty"
)]
struct Cli {
    /// Config file (defaults to $ENGINE_DETECTOR_CONFIG or assets/engine_config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Override the scoring model artifact (.json or .onnx)
    #[arg(long, global = true)]
    model: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify audio files, one JSON result per line
    Classify {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Pretty-print each result
        #[arg(long)]
        pretty: bool,
        /// Write results to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print the 40-value MFCC feature vector of an audio file
    Features { file: PathBuf },
    /// Serve the HTTP classification API
    #[cfg(feature = "http")]
    Serve {
        /// Bind address (defaults to server.addr from config)
        #[arg(long)]
        addr: Option<String>,
    },
}

fn main() -> ExitCode {
    engine_fault_detector::init_logging("warn");
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::load(),
    };
    if let Some(model) = cli.model {
        config.model.path = model;
    }

    let context = AppContext::init(config).context("initializing classifier")?;

    match cli.command {
        Commands::Classify {
            files,
            pretty,
            output,
        } => run_classify(&context, &files, pretty, output),
        Commands::Features { file } => run_features(&context, &file),
        #[cfg(feature = "http")]
        Commands::Serve { addr } => run_serve(context, addr),
    }
}

fn run_classify(
    context: &AppContext,
    files: &[PathBuf],
    pretty: bool,
    output_path: Option<PathBuf>,
) -> Result<ExitCode> {
    let mut lines = Vec::with_capacity(files.len());
    let mut failures = 0usize;

    for file in files {
        let result = context.classify(file);
        if !result.is_success() {
            failures += 1;
        }
        lines.push(render(&result, pretty)?);
    }

    let report = lines.join("\n");
    if let Some(path) = output_path {
        fs::write(&path, format!("{report}\n"))
            .with_context(|| format!("writing {}", path.display()))?;
    } else {
        println!("{report}");
    }

    if failures > 0 {
        eprintln!("{failures} of {} file(s) failed", files.len());
        Ok(ExitCode::from(2))
    } else {
        Ok(ExitCode::from(0))
    }
}

fn run_features(context: &AppContext, file: &Path) -> Result<ExitCode> {
    match context.extract_features(file) {
        Ok(features) => {
            println!("{}", serde_json::to_string(&features)?);
            Ok(ExitCode::from(0))
        }
        Err(err) => {
            let result = ClassificationResult::from_error(&err, Some(file));
            println!("{}", render(&result, false)?);
            Ok(ExitCode::from(2))
        }
    }
}

#[cfg(feature = "http")]
fn run_serve(context: AppContext, addr: Option<String>) -> Result<ExitCode> {
    let addr = addr.unwrap_or_else(|| context.config().server.addr.clone());
    let addr: std::net::SocketAddr = addr
        .parse()
        .with_context(|| format!("parsing bind address {addr}"))?;

    engine_fault_detector::http::serve_blocking(Arc::new(context), addr)?;
    Ok(ExitCode::from(0))
}

fn render(result: &ClassificationResult, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };
    Ok(json)
}
