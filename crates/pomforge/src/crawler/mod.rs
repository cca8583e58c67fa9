//! Site crawler: analyze every same-origin page reachable from a start URL
//! and write one POM file per page.
//!
//! The crawl runs through these phases:
//!
//! 1. **Init**: open a context with the saved session, or a bare one if the
//!    session is missing, corrupt, cannot be installed or the start page
//!    does not load with it.
//! 2. **Session check** (bare context only): load the start page and look for
//!    a same-origin login link.
//! 3. **Manual login**: hand the login page to a [`login::LoginPrompt`], save
//!    the resulting session and reopen a session-backed context. This is the
//!    only step without a timeout.
//! 4. **Traverse**: analyze the current page, then repeatedly take the
//!    lexically smallest pending link, analyze it and queue its links. Every
//!    URL is analyzed at most once; a failing page is recorded and skipped.

pub mod links;
pub mod login;
pub mod session;

use crate::analyzer::{analyze_page, AnalyzeOptions};
use crate::error::{classify, parse_http_url, PomforgeError};
use crate::pom::generator::write_pom;
use crate::renderer::chromium::ChromiumRenderer;
use crate::renderer::{BrowserOptions, RenderContext, Renderer};
use anyhow::{Context, Result};
use links::{find_login_link, page_slug, same_origin_links, strip_fragment};
use login::LoginPrompt;
use serde::Serialize;
use session::StorageState;
use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Directory receiving `<slug>.ts` files.
    pub output_dir: PathBuf,
    pub storage_state: PathBuf,
    /// Stop after this many analyzed pages.
    pub max_pages: Option<usize>,
    pub analyze: AnalyzeOptions,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            storage_state: PathBuf::from("storageState.json"),
            max_pages: None,
            analyze: AnalyzeOptions::default(),
        }
    }
}

/// How the crawl was authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// Reused the saved session file.
    Saved,
    /// Saved a new session after a manual login.
    Established,
    Anonymous,
}

/// A page that could not be analyzed.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlFailure {
    pub url: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    /// Every URL marked visited, including failed ones and redirect targets.
    pub visited: BTreeSet<String>,
    pub pom_files: Vec<PathBuf>,
    pub failures: Vec<CrawlFailure>,
    pub session: SessionMode,
}

pub struct Crawler {
    renderer: Arc<dyn Renderer>,
    prompt: Arc<dyn LoginPrompt>,
    config: CrawlConfig,
    owns_renderer: bool,
}

impl Crawler {
    /// Crawl with a caller-provided renderer; the caller shuts it down.
    pub fn new(
        renderer: Arc<dyn Renderer>,
        prompt: Arc<dyn LoginPrompt>,
        config: CrawlConfig,
    ) -> Self {
        Self {
            renderer,
            prompt,
            config,
            owns_renderer: false,
        }
    }

    /// Launch Chromium for this crawl; it is shut down when the crawl ends.
    pub async fn launch(
        browser: &BrowserOptions,
        prompt: Arc<dyn LoginPrompt>,
        config: CrawlConfig,
    ) -> Result<Self> {
        let renderer = ChromiumRenderer::launch(browser).await?;
        Ok(Self {
            renderer: Arc::new(renderer),
            prompt,
            config,
            owns_renderer: true,
        })
    }

    pub async fn crawl(&self, start_url: &str) -> Result<CrawlReport> {
        let start = parse_http_url(start_url)?;
        let started = Instant::now();
        info!("crawling {start}");

        let result = self.run(&start).await;

        if self.owns_renderer {
            if let Err(e) = self.renderer.shutdown().await {
                warn!("browser shutdown failed: {e:#}");
            }
        }

        let report = result?;
        info!(
            "crawl finished in {:.1}s: {} visited, {} POM files, {} failures",
            started.elapsed().as_secs_f64(),
            report.visited.len(),
            report.pom_files.len(),
            report.failures.len()
        );
        Ok(report)
    }

    async fn run(&self, start: &Url) -> Result<CrawlReport> {
        let (mut ctx, session) = self.open_session(start).await?;
        let mut state = Traversal {
            visited: BTreeSet::new(),
            pending: BTreeSet::new(),
            pom_files: Vec::new(),
            failures: Vec::new(),
            written_slugs: HashSet::new(),
        };

        let outcome = self.traverse(ctx.as_mut(), start, &mut state).await;
        if let Err(e) = ctx.close().await {
            debug!("context close failed: {e:#}");
        }
        outcome?;

        Ok(CrawlReport {
            visited: state.visited,
            pom_files: state.pom_files,
            failures: state.failures,
            session,
        })
    }

    /// Init, session check and manual login. Returns a context positioned
    /// on the start page (or its redirect target).
    async fn open_session(&self, start: &Url) -> Result<(Box<dyn RenderContext>, SessionMode)> {
        let nav_timeout = self.config.analyze.nav_timeout_ms;

        if let Some(mut ctx) = self.saved_session_context().await? {
            match ctx.navigate(start.as_str(), nav_timeout).await {
                Ok(_) => return Ok((ctx, SessionMode::Saved)),
                Err(e) => {
                    warn!("start page failed with the saved session: {e:#}; retrying without it");
                    let _ = ctx.close().await;
                }
            }
        }

        let mut ctx = self.renderer.new_context().await?;
        if let Err(e) = ctx.navigate(start.as_str(), nav_timeout).await {
            let _ = ctx.close().await;
            return Err(e).with_context(|| format!("could not load start page {start}"));
        }

        let here = current_url(ctx.as_ref(), start).await;
        let html = ctx.get_html().await.unwrap_or_default();
        let Some(login_url) = find_login_link(&html, &here) else {
            info!("no login link on the start page; continuing without session");
            return Ok((ctx, SessionMode::Anonymous));
        };

        warn!("login link detected at {login_url}; starting manual login");
        let established = self.manual_login(ctx.as_mut(), &login_url).await;
        let state = match established {
            Ok(state) => state,
            Err(e) => {
                let _ = ctx.close().await;
                return Err(e);
            }
        };
        let _ = ctx.close().await;

        let mut ctx = self.renderer.new_context().await?;
        let reopened = async {
            ctx.apply_storage_state(&state)
                .await
                .context("failed to install the new session")?;
            ctx.navigate(start.as_str(), nav_timeout)
                .await
                .with_context(|| format!("could not reload start page {start} after login"))
        }
        .await;
        if let Err(e) = reopened {
            let _ = ctx.close().await;
            return Err(e);
        }
        info!("landed on {} after manual login", current_url(ctx.as_ref(), start).await);
        Ok((ctx, SessionMode::Established))
    }

    async fn saved_session_context(&self) -> Result<Option<Box<dyn RenderContext>>> {
        let saved = match session::load(&self.config.storage_state) {
            Ok(state) => state,
            Err(e) => {
                match classify(&e) {
                    Some(PomforgeError::SessionUnavailable { .. }) => {
                        info!("no usable saved session ({e}); opening a bare context")
                    }
                    _ => warn!("session load failed: {e:#}"),
                }
                return Ok(None);
            }
        };

        let mut ctx = self.renderer.new_context().await?;
        match ctx.apply_storage_state(&saved).await {
            Ok(()) => {
                info!(
                    "reusing saved session from {}",
                    self.config.storage_state.display()
                );
                Ok(Some(ctx))
            }
            Err(e) => {
                warn!("saved session could not be installed: {e:#}");
                let _ = ctx.close().await;
                Ok(None)
            }
        }
    }

    async fn manual_login(&self, ctx: &mut dyn RenderContext, login_url: &str) -> Result<StorageState> {
        ctx.navigate(login_url, self.config.analyze.nav_timeout_ms)
            .await
            .with_context(|| format!("could not open login page {login_url}"))?;
        self.prompt.wait_for_login(login_url).await?;

        let state = ctx
            .storage_state()
            .await
            .context("failed to capture session after login")?;
        session::save(&self.config.storage_state, &state)?;
        Ok(state)
    }

    async fn traverse(
        &self,
        ctx: &mut dyn RenderContext,
        start: &Url,
        state: &mut Traversal,
    ) -> Result<()> {
        let opts = &self.config.analyze;
        let first = strip_fragment(&current_url(ctx, start).await.to_string());
        if !state.visited.contains(&first) {
            match analyze_page(ctx, &first, opts).await {
                Ok(analysis) => {
                    state.visited.insert(first.clone());
                    self.persist(&analysis.url, &analysis.elements, state);
                }
                Err(e) => {
                    warn!("failed to analyze start page {first}: {e:#}");
                    state.fail(&first, &e);
                }
            }
        }
        self.discover(ctx, start, state).await;

        while let Some(next) = state.pending.pop_first() {
            if state.visited.contains(&next) {
                continue;
            }
            if self
                .config
                .max_pages
                .is_some_and(|max| state.pom_files.len() >= max)
            {
                info!("page limit reached; {} links left unvisited", state.pending.len() + 1);
                break;
            }

            debug!("visiting {next}");
            if let Err(e) = ctx.navigate(&next, opts.nav_timeout_ms).await {
                warn!("failed to load {next}: {e:#}");
                state.fail(&next, &e);
                continue;
            }

            let landed = strip_fragment(&current_url(ctx, start).await.to_string());
            if landed != next && state.visited.contains(&landed) {
                debug!("{next} redirected to already visited {landed}");
                state.visited.insert(next);
                continue;
            }

            match analyze_page(ctx, &landed, opts).await {
                Ok(analysis) => {
                    state.visited.insert(next.clone());
                    state.visited.insert(landed.clone());
                    self.persist(&analysis.url, &analysis.elements, state);
                    self.discover(ctx, start, state).await;
                }
                Err(e) => {
                    warn!("failed to analyze {next} (landed on {landed}): {e:#}");
                    state.fail(&next, &e);
                    state.visited.insert(landed);
                }
            }
        }
        Ok(())
    }

    /// Queue every unvisited same-origin link of the current page.
    async fn discover(&self, ctx: &dyn RenderContext, start: &Url, state: &mut Traversal) {
        let here = current_url(ctx, start).await;
        let html = match ctx.get_html().await {
            Ok(html) => html,
            Err(e) => {
                warn!("could not read links from {here}: {e:#}");
                return;
            }
        };
        let before = state.pending.len();
        for link in same_origin_links(&html, &here) {
            if !state.visited.contains(&link) {
                state.pending.insert(link);
            }
        }
        debug!("{here}: {} new links queued", state.pending.len() - before);
    }

    fn persist(&self, url: &str, elements: &[crate::locator::AnalyzedElement], state: &mut Traversal) {
        let mut slug = page_slug(url);
        if !state.written_slugs.insert(slug.clone()) {
            let base = slug.clone();
            let mut n = 2;
            while !state.written_slugs.insert(format!("{base}-{n}")) {
                n += 1;
            }
            slug = format!("{base}-{n}");
        }
        let path = self.config.output_dir.join(format!("{slug}.ts"));
        match write_pom(elements, &path, &slug) {
            Ok(_) => state.pom_files.push(path),
            Err(e) => {
                warn!("failed to write POM for {url}: {e:#}");
                state.failures.push(CrawlFailure {
                    url: url.to_string(),
                    error: format!("{e:#}"),
                });
            }
        }
    }
}

struct Traversal {
    visited: BTreeSet<String>,
    pending: BTreeSet<String>,
    pom_files: Vec<PathBuf>,
    failures: Vec<CrawlFailure>,
    written_slugs: HashSet<String>,
}

impl Traversal {
    fn fail(&mut self, url: &str, err: &anyhow::Error) {
        self.visited.insert(url.to_string());
        self.failures.push(CrawlFailure {
            url: url.to_string(),
            error: format!("{err:#}"),
        });
    }
}

async fn current_url(ctx: &dyn RenderContext, fallback: &Url) -> Url {
    match ctx.get_url().await {
        Ok(raw) => Url::parse(&raw).unwrap_or_else(|_| fallback.clone()),
        Err(_) => fallback.clone(),
    }
}
