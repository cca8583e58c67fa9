//! `pomforge login [url]`: fill the login form with configured credentials
//! and save the session for later crawls.

use crate::cli::output;
use crate::config::Settings;
use crate::crawler::login::scripted_login;
use crate::renderer::chromium::ChromiumRenderer;
use crate::renderer::Renderer;
use anyhow::{bail, Result};

/// The explicit URL, else `POMFORGE_LOGIN_URL`, else `BASEURL`.
pub fn login_url(arg: Option<String>, settings: &Settings) -> Result<String> {
    let candidates = [arg, settings.login_url.clone(), settings.base_url.clone()];
    match candidates
        .into_iter()
        .flatten()
        .map(|url| url.trim().to_string())
        .find(|url| !url.is_empty())
    {
        Some(url) => Ok(url),
        None => bail!("no login URL: pass one, or set POMFORGE_LOGIN_URL or BASEURL"),
    }
}

pub async fn run(url: Option<String>, settings: &Settings) -> Result<()> {
    let url = login_url(url, settings)?;
    let form = settings.login_form()?;

    output::say(format!("Logging in at {url} as {}...", form.username));
    let renderer = ChromiumRenderer::launch(&settings.browser_options()).await?;
    let result = scripted_login(&renderer, &url, &form, &settings.storage_state).await;
    if let Err(e) = renderer.shutdown().await {
        tracing::warn!("browser shutdown failed: {e:#}");
    }
    let state = result?;

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "url": url,
            "storageState": settings.storage_state,
            "cookies": state.cookies.len(),
            "origins": state.origins.len(),
        }));
    } else {
        output::say(format!(
            "Session saved to {} ({} cookies)",
            settings.storage_state.display(),
            state.cookies.len()
        ));
    }
    Ok(())
}
