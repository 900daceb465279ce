use std::io::Write;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::analysis::ClassificationResult;
use crate::context::AppContext;

const NO_AUDIO_MESSAGE: &str = "No audio file or data provided";

/// Container assumed for browser recordings
const RECORDING_EXTENSION: &str = "webm";

/// Shared application state for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub context: Arc<AppContext>,
}

impl HttpState {
    pub fn new(context: Arc<AppContext>) -> Self {
        Self { context }
    }
}

/// Query payload naming the uploaded file.
#[derive(Debug, Default, Deserialize)]
pub struct UploadQuery {
    pub filename: Option<String>,
}

/// Browser recording payload, a data URL or bare base64.
#[derive(Debug, Default, Deserialize)]
pub struct RecordingPayload {
    #[serde(default)]
    pub audio_data: Option<String>,
}

/// HTTP error variants mapped to JSON responses.
///
/// Only infrastructure failures end up here; classification failures are
/// regular 200 responses.
#[derive(Debug)]
pub enum HttpServerError {
    Internal(String),
}

impl IntoResponse for HttpServerError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (
            status,
            Json(serde_json::json!({ "success": false, "error": message })),
        )
            .into_response()
    }
}

/// Health endpoint response payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model_input_len: usize,
    pub model: String,
}

/// Build the Axum router with all handlers.
pub fn build_router(state: HttpState) -> Router {
    let body_limit = state.context.config().server.max_body_bytes;
    Router::new()
        .route("/health", get(health))
        .route("/classify", post(classify_upload))
        .route("/classify/", post(classify_form))
        .route("/classify/recording", post(classify_recording))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Run the HTTP server loop until Ctrl-C.
pub async fn run_http_server(state: HttpState, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("binding HTTP listener")?;
    let router = build_router(state);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP router")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("[HTTP] Failed to listen for Ctrl-C: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("[HTTP] Shutdown requested");
}

pub async fn health(State(state): State<HttpState>) -> Json<HealthResponse> {
    let model = state.context.model();
    Json(HealthResponse {
        status: "ok",
        model_input_len: model.input_len(),
        model: model.describe(),
    })
}

pub async fn classify_upload(
    State(state): State<HttpState>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<Json<ClassificationResult>, HttpServerError> {
    if body.is_empty() {
        return Ok(Json(ClassificationResult::failure_message(NO_AUDIO_MESSAGE)));
    }

    let extension = query.filename.as_deref().and_then(upload_extension);
    tracing::info!(
        "[HTTP] /classify upload {:?} ({} bytes)",
        query.filename,
        body.len()
    );

    classify_bytes(state.context, body.to_vec(), extension).await
}

pub async fn classify_recording(
    State(state): State<HttpState>,
    Json(payload): Json<RecordingPayload>,
) -> Result<Json<ClassificationResult>, HttpServerError> {
    let bytes = match decode_recording(payload.audio_data.as_deref()) {
        Ok(bytes) => bytes,
        Err(failure) => return Ok(Json(failure)),
    };

    tracing::info!("[HTTP] /classify/recording ({} bytes)", bytes.len());
    classify_bytes(state.context, bytes, Some(RECORDING_EXTENSION.to_string())).await
}

/// Browser form upload: `audio_file` (file part) or `audio_data` (data URL)
///
/// A file part wins over recorded data when both are present.
pub async fn classify_form(
    State(state): State<HttpState>,
    mut multipart: Multipart,
) -> Result<Json<ClassificationResult>, HttpServerError> {
    let mut upload: Option<(Vec<u8>, Option<String>)> = None;
    let mut recording: Option<String> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                return Ok(Json(ClassificationResult::failure_message(format!(
                    "Invalid form data: {}",
                    err
                ))))
            }
        };

        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("audio_file") => {
                let extension = field.file_name().and_then(upload_extension);
                match field.bytes().await {
                    Ok(bytes) if !bytes.is_empty() => upload = Some((bytes.to_vec(), extension)),
                    Ok(_) => {}
                    Err(err) => {
                        return Ok(Json(ClassificationResult::failure_message(format!(
                            "Invalid form data: {}",
                            err
                        ))))
                    }
                }
            }
            Some("audio_data") => match field.text().await {
                Ok(text) => recording = Some(text),
                Err(err) => {
                    return Ok(Json(ClassificationResult::failure_message(format!(
                        "Invalid form data: {}",
                        err
                    ))))
                }
            },
            _ => {}
        }
    }

    if let Some((bytes, extension)) = upload {
        tracing::info!("[HTTP] /classify/ file part ({} bytes)", bytes.len());
        return classify_bytes(state.context, bytes, extension).await;
    }

    let bytes = match decode_recording(recording.as_deref()) {
        Ok(bytes) => bytes,
        Err(failure) => return Ok(Json(failure)),
    };
    tracing::info!("[HTTP] /classify/ recording ({} bytes)", bytes.len());
    classify_bytes(state.context, bytes, Some(RECORDING_EXTENSION.to_string())).await
}

/// Decode a data URL or bare base64 recording into raw container bytes
fn decode_recording(audio_data: Option<&str>) -> Result<Vec<u8>, ClassificationResult> {
    let encoded = match audio_data {
        Some(data) if !data.trim().is_empty() => data,
        _ => return Err(ClassificationResult::failure_message(NO_AUDIO_MESSAGE)),
    };

    // Data URLs carry a "data:audio/webm;base64," header before the payload
    let encoded = match encoded.split_once(',') {
        Some((_, rest)) => rest,
        None => encoded,
    };

    match base64::engine::general_purpose::STANDARD.decode(encoded.trim()) {
        Ok(bytes) if !bytes.is_empty() => Ok(bytes),
        Ok(_) => Err(ClassificationResult::failure_message(NO_AUDIO_MESSAGE)),
        Err(err) => Err(ClassificationResult::failure_message(format!(
            "Invalid base64 audio data: {}",
            err
        ))),
    }
}

/// Store the upload in a scoped temp file and classify it on the blocking pool
async fn classify_bytes(
    context: Arc<AppContext>,
    bytes: Vec<u8>,
    extension: Option<String>,
) -> Result<Json<ClassificationResult>, HttpServerError> {
    let result = tokio::task::spawn_blocking(move || {
        let suffix = extension.map(|ext| format!(".{}", ext)).unwrap_or_default();
        let mut builder = tempfile::Builder::new();
        builder.prefix("engine-upload-").suffix(&suffix);

        let mut upload = match &context.config().server.temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(|err| format!("creating upload file: {}", err))?;

        upload
            .write_all(&bytes)
            .and_then(|_| upload.flush())
            .map_err(|err| format!("writing upload file: {}", err))?;

        Ok::<_, String>(context.classify(upload.path()))
    })
    .await
    .map_err(|err| HttpServerError::Internal(format!("classification task failed: {}", err)))?
    .map_err(HttpServerError::Internal)?;

    Ok(Json(result))
}

/// Lowercase extension of an uploaded filename, if it is a plain token
fn upload_extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 10)
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase())
}
