//! Renderer abstraction for browser-based page inspection.
//!
//! Defines the `Renderer` and `RenderContext` traits that abstract over
//! the browser engine (currently Chromium via chromiumoxide). Everything
//! page-specific that can be expressed as a script has a default
//! implementation on top of [`RenderContext::execute_js`].

pub mod chromium;

use crate::crawler::session::StorageState;
use crate::dom::{scripts, ElementSnapshot, OutlineColor};
use crate::locator::query::LocatorQuery;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Interval between polls while waiting for an element.
const POLL_INTERVAL_MS: u64 = 100;

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// Time taken to load the page in milliseconds.
    pub load_time_ms: u64,
}

/// How to launch the browser.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// Run without a window. Manual login and inspection need a visible one.
    pub headless: bool,
    /// Explicit binary; discovered with [`chromium::find_chromium`] otherwise.
    pub executable: Option<PathBuf>,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
        }
    }
}

/// A browser engine that can create rendering contexts.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Create a new isolated browser context with one page.
    async fn new_context(&self) -> Result<Box<dyn RenderContext>>;
    /// Shut down the browser engine.
    async fn shutdown(&self) -> Result<()>;
    /// Number of currently active contexts.
    fn active_contexts(&self) -> usize;
}

/// A single browser context (one page) for rendering.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Navigate to a URL with a timeout.
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult>;
    /// Execute JavaScript in the page context and return the result.
    async fn execute_js(&self, script: &str) -> Result<serde_json::Value>;
    /// Get the full page HTML.
    async fn get_html(&self) -> Result<String>;
    /// Get the current URL.
    async fn get_url(&self) -> Result<String>;

    /// Wait until `selector` matches a visible element.
    ///
    /// Returns `false` when the budget runs out; that is not an error.
    async fn wait_for_visible(&self, selector: &str, timeout_ms: u64) -> Result<bool> {
        let probe = scripts::visible_probe(selector);
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            if self.execute_js(&probe).await?.as_bool().unwrap_or(false) {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
        }
    }

    /// Type `value` into the first element matching `selector`.
    async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        let found = self.execute_js(&scripts::fill(selector, value)).await?;
        if !found.as_bool().unwrap_or(false) {
            bail!("no element matches {selector}");
        }
        Ok(())
    }

    /// Click the first element matching `selector`.
    async fn click(&self, selector: &str) -> Result<()> {
        let found = self.execute_js(&scripts::click(selector)).await?;
        if !found.as_bool().unwrap_or(false) {
            bail!("no element matches {selector}");
        }
        Ok(())
    }

    /// Snapshot every candidate element on the current page.
    async fn snapshot_elements(&self) -> Result<Vec<ElementSnapshot>> {
        let value = self.execute_js(scripts::SNAPSHOT_JS).await?;
        serde_json::from_value(value).context("unexpected element snapshot shape")
    }

    /// Outline snapshotted elements by index.
    async fn outline(&self, indices: &[usize], color: OutlineColor) -> Result<()> {
        if indices.is_empty() {
            return Ok(());
        }
        self.execute_js(&scripts::outline(indices, color)).await?;
        Ok(())
    }

    /// Pin a panel listing locators that were not found.
    async fn show_missing(&self, labels: &[String]) -> Result<()> {
        if labels.is_empty() {
            return Ok(());
        }
        self.execute_js(&scripts::missing_panel(labels)).await?;
        Ok(())
    }

    /// Resolve each query to the index of its first match on the page.
    async fn resolve(&self, queries: &[LocatorQuery]) -> Result<Vec<Option<usize>>> {
        if queries.is_empty() {
            return Ok(Vec::new());
        }
        let value = self.execute_js(&scripts::resolve(queries)).await?;
        serde_json::from_value(value).context("unexpected locator resolution shape")
    }

    /// Capture cookies and localStorage of the current origin.
    async fn storage_state(&self) -> Result<StorageState>;
    /// Install a saved session into this context.
    async fn apply_storage_state(&mut self, state: &StorageState) -> Result<()>;
    /// Close this context.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// A renderer used when Chromium is unavailable; every context request fails.
pub struct NoopRenderer;

#[async_trait]
impl Renderer for NoopRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        Err(anyhow::anyhow!("Browser not available"))
    }
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
    fn active_contexts(&self) -> usize {
        0
    }
}
