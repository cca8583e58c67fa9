//! Page analyzer: scan one page for locatable elements.
//!
//! Two entry points share the scan:
//! - [`analyze_url`] opens its own context, owns its teardown and propagates
//!   navigation failures.
//! - [`analyze_page`] works on a caller's context (the crawler's), navigates
//!   only when needed and degrades navigation failures to an empty result.

use crate::crawler::links::strip_fragment;
use crate::dom::OutlineColor;
use crate::locator::selector::{select_elements, Candidate};
use crate::locator::AnalyzedElement;
use crate::renderer::{RenderContext, Renderer};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Marker of a rendered single-page app: first child of `#root`.
pub const ROOT_CONTENT_SELECTOR: &str = "#root > *";

#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    pub nav_timeout_ms: u64,
    /// Budget for the root content marker; running out only warns.
    pub content_wait_ms: u64,
    pub root_selector: String,
    /// Outline results and keep the page open for inspection.
    pub highlight: bool,
    pub inspect_window: Duration,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            nav_timeout_ms: 60_000,
            content_wait_ms: 7_000,
            root_selector: ROOT_CONTENT_SELECTOR.to_string(),
            highlight: false,
            inspect_window: Duration::from_secs(60),
        }
    }
}

/// Result of analyzing one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageAnalysis {
    /// Final address after redirects.
    pub url: String,
    pub elements: Vec<AnalyzedElement>,
}

/// Analyze `url` in a fresh context owned by this call.
pub async fn analyze_url(
    renderer: &dyn Renderer,
    url: &str,
    opts: &AnalyzeOptions,
) -> Result<PageAnalysis> {
    let mut ctx = renderer
        .new_context()
        .await
        .context("failed to open browser context")?;

    info!("analyzing {url}");
    if let Err(e) = ctx.navigate(url, opts.nav_timeout_ms).await {
        let _ = ctx.close().await;
        return Err(e).with_context(|| format!("could not load {url}"));
    }

    let outcome = scan_and_mark(ctx.as_ref(), opts).await;
    let final_url = ctx.get_url().await.unwrap_or_else(|_| url.to_string());
    ctx.close().await?;

    let elements = outcome?;
    info!("analysis of {final_url} found {} elements", elements.len());
    Ok(PageAnalysis {
        url: final_url,
        elements,
    })
}

/// Analyze `url` on an existing context.
///
/// Navigates only if the context is not already there (fragments ignored).
/// A navigation failure yields an empty element list with a warning.
pub async fn analyze_page(
    ctx: &mut dyn RenderContext,
    url: &str,
    opts: &AnalyzeOptions,
) -> Result<PageAnalysis> {
    let current = ctx.get_url().await.unwrap_or_default();
    if strip_fragment(&current) != strip_fragment(url) {
        debug!("navigating existing page to {url}");
        if let Err(e) = ctx.navigate(url, opts.nav_timeout_ms).await {
            warn!("navigation to {url} failed: {e:#}");
            let here = ctx.get_url().await.unwrap_or(current);
            return Ok(PageAnalysis {
                url: here,
                elements: Vec::new(),
            });
        }
    }

    let candidates = scan(ctx, opts).await?;
    let final_url = ctx.get_url().await.unwrap_or_else(|_| url.to_string());
    debug!("{final_url}: {} elements", candidates.len());
    Ok(PageAnalysis {
        url: final_url,
        elements: candidates.into_iter().map(|c| c.element).collect(),
    })
}

/// Wait for content, snapshot and run the selector engine.
pub async fn scan(ctx: &dyn RenderContext, opts: &AnalyzeOptions) -> Result<Vec<Candidate>> {
    match ctx
        .wait_for_visible(&opts.root_selector, opts.content_wait_ms)
        .await
    {
        Ok(true) => debug!("initial content found"),
        Ok(false) => warn!(
            "no visible content under '{}' after {}ms; scanning anyway",
            opts.root_selector, opts.content_wait_ms
        ),
        Err(e) => warn!("content wait failed: {e:#}; scanning anyway"),
    }

    let snapshots = ctx
        .snapshot_elements()
        .await
        .context("failed to snapshot page elements")?;
    Ok(select_elements(&snapshots))
}

async fn scan_and_mark(
    ctx: &dyn RenderContext,
    opts: &AnalyzeOptions,
) -> Result<Vec<AnalyzedElement>> {
    let candidates = scan(ctx, opts).await?;

    if opts.highlight && !candidates.is_empty() {
        let indices: Vec<usize> = candidates.iter().map(|c| c.index).collect();
        info!("highlighting {} elements", indices.len());
        if let Err(e) = ctx.outline(&indices, OutlineColor::Found).await {
            warn!("highlighting failed: {e:#}");
        }
        info!(
            "keeping the page open {}s for review",
            opts.inspect_window.as_secs()
        );
        tokio::time::sleep(opts.inspect_window).await;
    }

    Ok(candidates.into_iter().map(|c| c.element).collect())
}
