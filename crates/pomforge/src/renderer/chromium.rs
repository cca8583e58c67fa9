//! Chromium-based renderer using chromiumoxide.

use super::{BrowserOptions, NavigationResult, RenderContext, Renderer};
use crate::crawler::session::{Cookie, LocalStorageEntry, OriginState, SameSite, StorageState};
use crate::error::PomforgeError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{CookieParam, CookieSameSite, TimeSinceEpoch};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. POMFORGE_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("POMFORGE_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. ~/.pomforge/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".pomforge/chromium/chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".pomforge/chromium/chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".pomforge/chromium/chrome"),
            ]
        } else {
            vec![
                home.join(".pomforge/chromium/chrome-linux64/chrome"),
                home.join(".pomforge/chromium/chrome"),
            ]
        };
        for c in candidates {
            if c.exists() {
                return Some(c);
            }
        }
    }

    // 3. System PATH
    for bin in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(bin) {
            return Some(path);
        }
    }

    // 4. Common macOS location
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Chromium-based renderer. Every context is an isolated browser context,
/// so cookies from one never leak into another.
pub struct ChromiumRenderer {
    browser: Arc<Browser>,
    active_count: Arc<AtomicUsize>,
}

impl ChromiumRenderer {
    /// Launch a Chromium instance.
    pub async fn launch(opts: &BrowserOptions) -> Result<Self> {
        let chrome_path = match &opts.executable {
            Some(p) => p.clone(),
            None => find_chromium().context(
                "Chromium not found. Install Chrome or set POMFORGE_CHROMIUM_PATH.",
            )?,
        };

        let mut builder = BrowserConfig::builder().chrome_executable(chrome_path);
        builder = if opts.headless {
            builder.arg("--headless=new")
        } else {
            builder.with_head()
        };
        let config = builder
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        tracing::debug!(headless = opts.headless, "launched Chromium");
        Ok(Self {
            browser: Arc::new(browser),
            active_count: Arc::new(AtomicUsize::new(0)),
        })
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        let created = self
            .browser
            .execute(CreateBrowserContextParams::default())
            .await
            .context("failed to create browser context")?;
        let context_id = created.result.browser_context_id.clone();

        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context_id.clone())
            .build()
            .map_err(|e| anyhow::anyhow!("invalid target params: {e}"))?;
        let page = self
            .browser
            .new_page(target)
            .await
            .context("failed to create new page")?;

        self.active_count.fetch_add(1, Ordering::Relaxed);

        Ok(Box::new(ChromiumContext {
            page,
            context_id,
            browser: Arc::clone(&self.browser),
            active_count: Arc::clone(&self.active_count),
        }))
    }

    async fn shutdown(&self) -> Result<()> {
        // The browser process is killed when the last handle is dropped.
        Ok(())
    }

    fn active_contexts(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }
}

/// A single Chromium page in its own browser context.
pub struct ChromiumContext {
    page: Page,
    context_id: BrowserContextId,
    browser: Arc<Browser>,
    active_count: Arc<AtomicUsize>,
}

const LOCAL_STORAGE_JS: &str = r#"(() => {
  const entries = [];
  for (let i = 0; i < localStorage.length; i++) {
    const name = localStorage.key(i);
    entries.push({ name, value: localStorage.getItem(name) ?? '' });
  }
  return { origin: location.origin, localStorage: entries };
})()"#;

#[async_trait]
impl RenderContext for ChromiumContext {
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult> {
        let start = Instant::now();

        let result = tokio::time::timeout(
            std::time::Duration::from_millis(timeout_ms),
            self.page.goto(url),
        )
        .await;

        let load_time_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(_)) => {
                let _ = self.page.wait_for_navigation().await;

                let final_url = self
                    .page
                    .url()
                    .await
                    .unwrap_or_default()
                    .map(|u| u.to_string())
                    .unwrap_or_else(|| url.to_string());

                Ok(NavigationResult {
                    final_url,
                    load_time_ms,
                })
            }
            Ok(Err(e)) => Err(PomforgeError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            }
            .into()),
            Err(_) => Err(PomforgeError::Timeout {
                what: format!("navigation to {url}"),
                timeout_ms,
            }
            .into()),
        }
    }

    async fn execute_js(&self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .context("JS execution failed")?;

        result
            .into_value()
            .map_err(|e| anyhow::anyhow!("failed to convert JS result: {e:?}"))
    }

    async fn get_html(&self) -> Result<String> {
        self.page.content().await.context("failed to get HTML")
    }

    async fn get_url(&self) -> Result<String> {
        let url = self
            .page
            .url()
            .await
            .context("failed to get URL")?
            .map(|u| u.to_string())
            .unwrap_or_default();
        Ok(url)
    }

    async fn storage_state(&self) -> Result<StorageState> {
        let cookies = self
            .page
            .get_cookies()
            .await
            .context("failed to read cookies")?
            .into_iter()
            .map(|c| Cookie {
                name: c.name,
                value: c.value,
                domain: c.domain,
                path: c.path,
                expires: if c.session { -1.0 } else { c.expires },
                http_only: c.http_only,
                secure: c.secure,
                same_site: match c.same_site {
                    Some(CookieSameSite::Strict) => SameSite::Strict,
                    Some(CookieSameSite::None) => SameSite::None,
                    _ => SameSite::Lax,
                },
            })
            .collect();

        let mut origins = Vec::new();
        match self.execute_js(LOCAL_STORAGE_JS).await {
            Ok(value) => match serde_json::from_value::<OriginState>(value) {
                Ok(origin) if !origin.local_storage.is_empty() => origins.push(origin),
                Ok(_) => {}
                Err(e) => tracing::debug!("unexpected localStorage shape: {e}"),
            },
            Err(e) => tracing::debug!("localStorage not readable: {e:#}"),
        }

        Ok(StorageState { cookies, origins })
    }

    async fn apply_storage_state(&mut self, state: &StorageState) -> Result<()> {
        if !state.cookies.is_empty() {
            let params: Vec<CookieParam> = state.cookies.iter().map(cookie_param).collect();
            self.page
                .set_cookies(params)
                .await
                .context("failed to install cookies")?;
        }
        for origin in &state.origins {
            self.page
                .evaluate_on_new_document(AddScriptToEvaluateOnNewDocumentParams::new(
                    restore_local_storage_js(origin),
                ))
                .await
                .context("failed to install localStorage restore script")?;
        }
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let Self {
            page,
            context_id,
            browser,
            active_count,
        } = *self;
        active_count.fetch_sub(1, Ordering::Relaxed);
        let _ = page.close().await;
        if let Err(e) = browser
            .execute(DisposeBrowserContextParams::new(context_id))
            .await
        {
            tracing::debug!("failed to dispose browser context: {e}");
        }
        Ok(())
    }
}

fn cookie_param(c: &Cookie) -> CookieParam {
    let mut p = CookieParam::new(c.name.clone(), c.value.clone());
    p.domain = Some(c.domain.clone());
    p.path = Some(c.path.clone());
    p.secure = Some(c.secure);
    p.http_only = Some(c.http_only);
    p.same_site = Some(match c.same_site {
        SameSite::Strict => CookieSameSite::Strict,
        SameSite::Lax => CookieSameSite::Lax,
        SameSite::None => CookieSameSite::None,
    });
    if c.expires >= 0.0 {
        p.expires = Some(TimeSinceEpoch::new(c.expires));
    }
    p
}

/// Seed localStorage once per tab when the page lands on `origin`.
fn restore_local_storage_js(origin: &OriginState) -> String {
    let target = serde_json::to_string(&origin.origin).unwrap_or_else(|_| "\"\"".into());
    let entries: Vec<&LocalStorageEntry> = origin.local_storage.iter().collect();
    let entries = serde_json::to_string(&entries).unwrap_or_else(|_| "[]".into());
    format!(
        r#"(() => {{
  if (location.origin !== {target} || sessionStorage.getItem('__pomforge_restored')) return;
  for (const e of {entries}) localStorage.setItem(e.name, e.value);
  sessionStorage.setItem('__pomforge_restored', '1');
}})()"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_param_maps_session_cookie() {
        let cookie = Cookie {
            name: "sid".into(),
            value: "1".into(),
            domain: "app.test".into(),
            path: "/".into(),
            expires: -1.0,
            http_only: true,
            secure: true,
            same_site: SameSite::None,
        };
        let p = cookie_param(&cookie);
        assert_eq!(p.domain.as_deref(), Some("app.test"));
        assert!(p.expires.is_none());
        assert_eq!(p.same_site, Some(CookieSameSite::None));
    }

    #[test]
    fn test_restore_script_is_origin_guarded() {
        let js = restore_local_storage_js(&OriginState {
            origin: "https://app.test".into(),
            local_storage: vec![LocalStorageEntry {
                name: "token".into(),
                value: "a'b".into(),
            }],
        });
        assert!(js.contains(r#"location.origin !== "https://app.test""#));
        assert!(js.contains(r#"{"name":"token","value":"a'b"}"#));
    }

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_chromium_navigate_and_snapshot() {
        let renderer = ChromiumRenderer::launch(&BrowserOptions::default())
            .await
            .expect("failed to create renderer");
        let mut ctx = renderer
            .new_context()
            .await
            .expect("failed to create context");

        ctx.navigate(
            "data:text/html,<div id='root'><button data-testid='go'>Go</button></div>",
            10000,
        )
        .await
        .expect("navigation failed");

        assert!(ctx.wait_for_visible("#root > *", 2000).await.unwrap());
        let snaps = ctx.snapshot_elements().await.expect("snapshot failed");
        assert_eq!(snaps.len(), 1);
        assert_eq!(snaps[0].test_id.as_deref(), Some("go"));

        ctx.close().await.expect("close failed");
        assert_eq!(renderer.active_contexts(), 0);
        renderer.shutdown().await.expect("shutdown failed");
    }
}
