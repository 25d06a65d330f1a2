//! HTTP metrics endpoint.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use sshstat_core::exposition::{batch_samples, render_text};
use sshstat_core::monitoring::{PollBatch, Poller};
use sshstat_core::trace_operation;
use sshstat_core::tracing::span_names;
use tokio::sync::Mutex;
use tokio::task::JoinError;
use tracing::Instrument as _;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::util::{build_poller, load_settings, load_target_list, optional_identity, runtime};

/// Content type of the text exposition format
const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Shared state for the HTTP handlers
#[derive(Clone)]
struct AppState {
    poller: Arc<Poller>,
    /// Held until a sweep's poll tasks have finished, so sweeps never overlap
    scrape_lock: Arc<Mutex<()>>,
}

/// Serve command handler
pub fn cmd_serve(
    opts: GlobalOpts<'_>,
    listen: Option<SocketAddr>,
    targets: Option<&Path>,
    identity: Option<&Path>,
) -> Result<(), CliError> {
    let (manager, settings) = load_settings(opts.config)?;
    let list = load_target_list(&manager, &settings, targets)?;
    let key = optional_identity(identity, &settings.poll)?;
    let target_count = list.len();
    let poller = Arc::new(build_poller(list, &settings.poll, key));

    let addr = listen.unwrap_or(settings.metrics.listen);
    let path = settings.metrics.route_path();
    let app = router(poller, &path);

    runtime()?.block_on(async move {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| CliError::Server(format!("Failed to bind {addr}: {e}")))?;

        tracing::info!(%addr, path = %path, targets = target_count, "Serving metrics");
        if !opts.quiet {
            eprintln!("Serving metrics for {target_count} targets on http://{addr}{path}");
        }

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| CliError::Server(e.to_string()))
    })
}

/// Routes: the exposition on `path` and a liveness probe on `/healthz`
fn router(poller: Arc<Poller>, path: &str) -> Router {
    Router::new()
        .route(path, get(metrics_handler))
        .route("/healthz", get(healthz))
        .with_state(AppState {
            poller,
            scrape_lock: Arc::new(Mutex::new(())),
        })
}

/// Polls every target and renders the gauges
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match scrape(&state).await {
        Ok(batch) => {
            if batch.all_failed() {
                tracing::warn!(targets = batch.total(), "Every target failed during scrape");
            }
            (
                [(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)],
                render_text(&batch_samples(&batch)),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Scrape task failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "scrape failed\n").into_response()
        }
    }
}

/// Runs one sweep under the scrape lock
///
/// The sweep runs on its own task that owns the lock guard. A scraper that
/// gives up early drops only this future, and the next scrape waits for the
/// abandoned sweep instead of finding its targets busy.
async fn scrape(state: &AppState) -> Result<PollBatch, JoinError> {
    let guard = Arc::clone(&state.scrape_lock).lock_owned().await;
    let poller = Arc::clone(&state.poller);
    let span = trace_operation!(
        span_names::METRICS_SCRAPE,
        targets = poller.registry().len()
    );
    tokio::spawn(
        async move {
            let _scrape = guard;
            poller.poll_all().await
        }
        .instrument(span),
    )
    .await
}

async fn healthz() -> &'static str {
    "ok"
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
