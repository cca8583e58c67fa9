//! Getting a saved session.
//!
//! Two ways in: the crawler's human-in-the-loop step, and a scripted login
//! that fills a credentials form. Waiting for an operator has no timeout,
//! so it is kept behind a trait: interactive runs block on the terminal,
//! unattended runs fail fast.

use super::session::{self, StorageState};
use crate::error::PomforgeError;
use crate::renderer::{RenderContext, Renderer};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const DEFAULT_USERNAME_SELECTOR: &str = r#"[data-testid="email-input"]"#;
pub const DEFAULT_PASSWORD_SELECTOR: &str = r#"[data-testid="password-input"]"#;
pub const DEFAULT_SUBMIT_SELECTOR: &str = r#"[data-testid="login-button"]"#;
pub const DEFAULT_SUCCESS_SELECTOR: &str = r#"[data-testid="welcome-message"]"#;

const URL_POLL_MS: u64 = 100;

/// Decides how to get through a login page when no session is saved.
#[async_trait]
pub trait LoginPrompt: Send + Sync {
    /// Return once the operator has logged in on the page at `login_url`.
    async fn wait_for_login(&self, login_url: &str) -> Result<()>;
}

/// Blocks on stdin until the operator presses ENTER.
pub struct StdinPrompt;

#[async_trait]
impl LoginPrompt for StdinPrompt {
    async fn wait_for_login(&self, login_url: &str) -> Result<()> {
        eprintln!();
        eprintln!("  Login page opened: {login_url}");
        eprintln!("  Complete the login in the browser window, then press ENTER here.");

        tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            std::io::stdin().read_line(&mut line)
        })
        .await
        .context("login prompt task failed")?
        .context("failed to read from stdin")?;

        tracing::info!("operator confirmed login");
        Ok(())
    }
}

/// Refuses to wait; used by headless and server runs.
pub struct FailFastPrompt;

#[async_trait]
impl LoginPrompt for FailFastPrompt {
    async fn wait_for_login(&self, login_url: &str) -> Result<()> {
        Err(PomforgeError::LoginRequired {
            login_url: login_url.to_string(),
        }
        .into())
    }
}

/// A password that never shows up in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

/// Credentials and the selectors of the form they go into.
#[derive(Debug, Clone)]
pub struct LoginForm {
    pub username: String,
    pub password: Password,
    pub username_selector: String,
    pub password_selector: String,
    pub submit_selector: String,
    /// Element that only a logged-in page shows.
    pub success_selector: String,
    /// Budget for the page load, the post-submit navigation and the
    /// success marker, each.
    pub timeout_ms: u64,
}

impl LoginForm {
    pub fn new(username: impl Into<String>, password: Password) -> Self {
        Self {
            username: username.into(),
            password,
            username_selector: DEFAULT_USERNAME_SELECTOR.to_string(),
            password_selector: DEFAULT_PASSWORD_SELECTOR.to_string(),
            submit_selector: DEFAULT_SUBMIT_SELECTOR.to_string(),
            success_selector: DEFAULT_SUCCESS_SELECTOR.to_string(),
            timeout_ms: 15_000,
        }
    }
}

/// Log in by filling `form` on `login_url` and save the session to
/// `storage_path`.
///
/// Runs in its own context, which is closed whatever the outcome. Nothing
/// is written unless the success marker shows up.
pub async fn scripted_login(
    renderer: &dyn Renderer,
    login_url: &str,
    form: &LoginForm,
    storage_path: &Path,
) -> Result<StorageState> {
    let mut ctx = renderer
        .new_context()
        .await
        .context("failed to open browser context")?;

    let outcome = match submit(ctx.as_mut(), login_url, form).await {
        Ok(()) => ctx
            .storage_state()
            .await
            .context("failed to capture session after login"),
        Err(e) => Err(e),
    };
    if let Err(e) = ctx.close().await {
        debug!("context close failed: {e:#}");
    }
    let state = outcome?;

    if state.is_empty() {
        warn!("login succeeded but the page set no cookies or localStorage");
    }
    session::save(storage_path, &state)?;
    Ok(state)
}

async fn submit(ctx: &mut dyn RenderContext, login_url: &str, form: &LoginForm) -> Result<()> {
    info!("opening login page {login_url}");
    ctx.navigate(login_url, form.timeout_ms)
        .await
        .with_context(|| format!("could not open login page {login_url}"))?;
    let before = ctx.get_url().await.unwrap_or_else(|_| login_url.to_string());

    ctx.fill(&form.username_selector, &form.username)
        .await
        .context("failed to fill the username field")?;
    ctx.fill(&form.password_selector, form.password.expose())
        .await
        .context("failed to fill the password field")?;
    ctx.click(&form.submit_selector)
        .await
        .context("failed to submit the login form")?;

    match wait_for_url_change(ctx, &before, form.timeout_ms).await {
        Some(after) => debug!("login navigated to {after}"),
        None => warn!("no navigation within {}ms of submitting the login form", form.timeout_ms),
    }

    if !ctx
        .wait_for_visible(&form.success_selector, form.timeout_ms)
        .await?
    {
        return Err(PomforgeError::Timeout {
            what: format!("login success marker {}", form.success_selector),
            timeout_ms: form.timeout_ms,
        }
        .into());
    }
    info!("login verified");
    Ok(())
}

async fn wait_for_url_change(ctx: &dyn RenderContext, from: &str, timeout_ms: u64) -> Option<String> {
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        if let Ok(url) = ctx.get_url().await {
            if url != from {
                return Some(url);
            }
        }
        if Instant::now() >= deadline {
            return None;
        }
        tokio::time::sleep(Duration::from_millis(URL_POLL_MS)).await;
    }
}
