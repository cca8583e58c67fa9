// Copyright 2026 Pomforge Contributors
// SPDX-License-Identifier: Apache-2.0

//! HTTP REST API for page analysis and crawling.
//!
//! Both operations run on the renderer the server was started with. The
//! crawl endpoint never waits for a human: a login page without a saved
//! session is reported as `409 Conflict`.

use crate::analyzer::analyze_url;
use crate::config::Settings;
use crate::crawler::links::page_slug;
use crate::crawler::login::FailFastPrompt;
use crate::crawler::Crawler;
use crate::error::{classify, PomforgeError};
use crate::pom::generator::write_pom;
use crate::renderer::Renderer;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

pub const DEFAULT_PORT: u16 = 3001;

/// Shared by every request.
pub struct AppState {
    pub renderer: Arc<dyn Renderer>,
    pub settings: Settings,
}

/// Build the axum Router with all REST endpoints.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/analyze", post(handle_analyze))
        .route("/crawl", post(handle_crawl))
        .layer(cors)
        .with_state(state)
}

/// Serve the REST API on `127.0.0.1:<port>` until the task is dropped.
pub async fn start(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = router(state);
    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));
    tracing::info!("REST API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

// ── Helpers ─────────────────────────────────────────────────────

fn missing_url() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "url is required" })),
    )
        .into_response()
}

fn failure(what: &str, err: &anyhow::Error) -> Response {
    let status = match classify(err) {
        Some(PomforgeError::LoginRequired { .. }) => StatusCode::CONFLICT,
        Some(PomforgeError::InvalidUrl(_)) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    tracing::warn!("{what} failed: {err:#}");
    (
        status,
        Json(json!({ "error": format!("{what} failed"), "details": format!("{err:#}") })),
    )
        .into_response()
}

fn required(url: Option<String>) -> Option<String> {
    url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty())
}

/// Resolve a requested POM file name under `dir`. Absolute paths and any
/// component other than a plain name are refused.
fn output_under(dir: &Path, requested: &Path) -> Option<PathBuf> {
    let mut components = requested.components().peekable();
    components.peek()?;
    if components.all(|c| matches!(c, Component::Normal(_))) {
        Some(dir.join(requested))
    } else {
        None
    }
}

// ── Handlers ────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Debug, Deserialize)]
struct AnalyzeRequest {
    url: Option<String>,
    /// POM file name relative to the output directory; defaults to `<slug>.ts`.
    output: Option<PathBuf>,
}

async fn handle_analyze(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> Response {
    let Some(url) = required(req.url) else {
        return missing_url();
    };

    let output = match req.output {
        Some(requested) => match output_under(&state.settings.output_dir, &requested) {
            Some(path) => Some(path),
            None => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "error": "output must be a relative path inside the output directory"
                    })),
                )
                    .into_response()
            }
        },
        None => None,
    };

    let opts = state.settings.analyze_options();
    let result = async {
        let analysis = analyze_url(state.renderer.as_ref(), &url, &opts).await?;
        let slug = page_slug(&analysis.url);
        let path = output.unwrap_or_else(|| state.settings.output_dir.join(format!("{slug}.ts")));
        let pom = write_pom(&analysis.elements, &path, &slug)?;
        anyhow::Ok((analysis, path, pom))
    }
    .await;

    match result {
        Ok((analysis, path, pom)) => Json(json!({
            "success": true,
            "url": analysis.url,
            "elements": analysis.elements.len(),
            "file": path,
            "locators": pom.entries,
        }))
        .into_response(),
        Err(e) => failure("analyze", &e),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CrawlRequest {
    url: Option<String>,
    max_pages: Option<usize>,
}

async fn handle_crawl(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CrawlRequest>,
) -> Response {
    let Some(url) = required(req.url) else {
        return missing_url();
    };

    let mut config = state.settings.crawl_config();
    config.max_pages = req.max_pages;
    let crawler = Crawler::new(state.renderer.clone(), Arc::new(FailFastPrompt), config);

    match crawler.crawl(&url).await {
        Ok(report) => Json(json!({
            "success": true,
            "pages": report.visited,
            "pomFiles": report.pom_files,
            "failures": report.failures,
            "session": report.session,
        }))
        .into_response(),
        Err(e) => failure("crawl", &e),
    }
}
