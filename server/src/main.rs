//! voidd — scream into the void.
//!
//! Messages posted to `/message` fade out over a few seconds on every
//! viewer's screen. Each viewer holds an SSE stream on `/void` fed by its
//! own broadcast loop over a shared in-memory store.

mod broadcast;
mod config;
mod error;
mod ingest;
mod render;
mod session;
mod state;
mod store;
mod types;

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::state::AppState;

/// Multipart bodies above this are rejected before parsing.
const MAX_FORM_BYTES: usize = 1024 * 1024;

#[tokio::main]
async fn main() {
    // Load .env if present (local dev).
    let _ = dotenvy::dotenv();

    let config = config::Config::from_env();

    // Tracing.
    tracing_subscriber::fmt()
        .with_env_filter(&config.log_level)
        .with_target(true)
        .init();

    info!("voidd starting");
    info!(
        listen = %config.listen_addr,
        ttl_ms = config.message_ttl.as_millis() as u64,
        tick_ms = config.tick_interval.as_millis() as u64,
        cookie_secure = config.cookie_secure
    );

    // ── Shared state ────────────────────────────────────────
    let state = AppState::new(config.clone()).expect("invalid session configuration");

    // ── Routes ──────────────────────────────────────────────
    let app = router(Arc::clone(&state));

    // ── Bind & serve ────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .expect("failed to bind");

    info!(addr = %config.listen_addr, "voidd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state.shutdown.clone()))
        .await
        .expect("server error");

    info!("voidd stopped");
}

fn router(state: Arc<AppState>) -> Router {
    let app = Router::new().route("/", get(index));
    let app = match &state.config.static_dir {
        Some(dir) => app.nest_service("/static", ServeDir::new(dir)),
        None => app.route("/static/css/main.css", get(stylesheet)),
    };
    app
        // Live feed, one SSE stream per viewer.
        .route("/void", get(broadcast::void_stream))
        .route(
            "/message",
            post(ingest::post_message).layer(DefaultBodyLimit::max(MAX_FORM_BYTES)),
        )
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Root page: the feed container and the submission form.
async fn index() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

/// Embedded stylesheet, served when no STATIC_DIR is configured.
async fn stylesheet() -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "text/css; charset=utf-8")],
        include_str!("../static/css/main.css"),
    )
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    messages: usize,
    viewers: usize,
}

/// Liveness check with store and viewer counts.
async fn healthz(State(state): State<Arc<AppState>>) -> Json<Health> {
    Json(Health {
        status: "ok",
        messages: state.store.len(),
        viewers: state.viewers.len(),
    })
}

/// Resolve on SIGINT/SIGTERM and cancel every broadcast loop so open
/// streams end and graceful shutdown can complete.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received, closing viewer streams");
    shutdown.cancel();
}
