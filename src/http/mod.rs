//! HTTP boundary for the classification pipeline.
//!
//! This module exposes a small Axum server with a health check and two upload
//! endpoints. Classification itself is blocking and runs on tokio's blocking
//! pool; pipeline failures are reported as `success: false` bodies with
//! HTTP 200.

mod routes;

pub use routes::{build_router, run_http_server, HttpServerError, HttpState};

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use log::info;

use crate::context::AppContext;

/// Run the HTTP server on a dedicated multi-thread runtime until Ctrl-C.
pub fn serve_blocking(context: Arc<AppContext>, addr: SocketAddr) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime for HTTP server")?;

    info!("[HTTP] Binding {}", addr);

    runtime.block_on(async move {
        let state = HttpState::new(context);
        run_http_server(state, addr).await
    })
}
