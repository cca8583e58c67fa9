//! `pomforge serve`: run the REST API.

use crate::config::Settings;
use crate::renderer::chromium::ChromiumRenderer;
use crate::renderer::Renderer;
use crate::rest::{self, AppState};
use anyhow::Result;
use std::sync::Arc;

/// Launch a browser and serve until interrupted.
pub async fn run(port: u16, settings: Settings) -> Result<()> {
    let renderer = Arc::new(ChromiumRenderer::launch(&settings.browser_options()).await?);
    let state = Arc::new(AppState {
        renderer: renderer.clone(),
        settings,
    });

    let result = tokio::select! {
        served = rest::start(port, state) => served,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
            Ok(())
        }
    };

    if let Err(e) = renderer.shutdown().await {
        tracing::warn!("browser shutdown failed: {e:#}");
    }
    result
}
