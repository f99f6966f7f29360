use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::runner::Runner;
use crate::status::{RunState, StatusSnapshot};

const HELP_PAGE: &str = r#"<!doctype html>
<html><head><meta charset="utf-8"><title>Riftbound card scraper</title></head>
<body>
<h1>Riftbound card scraper</h1>
<ul>
<li><code>POST /scrape</code> start a scrape run</li>
<li><code>GET /status</code> current run status</li>
<li><code>GET /cards</code> cards from the last successful run</li>
</ul>
</body></html>
"#;

pub struct AppState {
    pub runner: Runner,
    pub status: RunState,
    pub static_dir: Option<PathBuf>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/scrape", post(start_scrape))
        .route("/status", get(get_status))
        .route("/cards", get(get_cards))
        .fallback(not_found)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: Arc<AppState>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Server listening on http://{}", addr);
    info!("Cards are stored in {}", state.runner.store().path().display());

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

// ── Handlers ──

async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    if let Some(dir) = &state.static_dir {
        match tokio::fs::read_to_string(dir.join("index.html")).await {
            Ok(page) => return Html(page),
            Err(e) => info!("No index.html in {}: {}", dir.display(), e),
        }
    }
    Html(HELP_PAGE.to_string())
}

async fn start_scrape(State(state): State<Arc<AppState>>) -> Response {
    match state.runner.clone().spawn(state.status.clone()) {
        Ok(_) => {
            info!("Scrape run started");
            (
                StatusCode::ACCEPTED,
                Json(json!({ "message": "Scraping started" })),
            )
                .into_response()
        }
        Err(e) => (StatusCode::CONFLICT, Json(json!({ "error": e.to_string() }))).into_response(),
    }
}

async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusSnapshot> {
    Json(state.status.snapshot())
}

async fn get_cards(State(state): State<Arc<AppState>>) -> Response {
    let store = state.runner.store().clone();
    let loaded = tokio::task::spawn_blocking(move || store.load()).await;

    match loaded {
        Ok(Ok(cards)) => Json(cards).into_response(),
        Ok(Err(e)) => {
            error!("{}", e);
            read_error()
        }
        Err(e) => {
            error!("Card load task failed: {}", e);
            read_error()
        }
    }
}

async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Endpoint not found" })),
    )
        .into_response()
}

fn read_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Error reading cards file" })),
    )
        .into_response()
}
