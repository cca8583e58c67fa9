//! `pomforge locators [URL]` and `pomforge analyze -u <url>`: generate one
//! POM file from a live page.

use crate::analyzer::analyze_url;
use crate::cli::{output, target_url};
use crate::config::Settings;
use crate::crawler::links::page_slug;
use crate::pom::generator::write_pom;
use crate::renderer::chromium::ChromiumRenderer;
use crate::renderer::Renderer;
use anyhow::Result;
use std::path::PathBuf;

/// Run `locators`: URL from the argument or `BASEURL`, default output path.
pub async fn run_locators(url: Option<String>, settings: &Settings) -> Result<()> {
    let url = target_url(url, settings)?;
    generate(&url, None, false, settings).await
}

/// Run `analyze`.
pub async fn run(
    url: &str,
    output_path: Option<PathBuf>,
    highlight: bool,
    settings: &Settings,
) -> Result<()> {
    generate(url, output_path, highlight, settings).await
}

async fn generate(
    url: &str,
    output_path: Option<PathBuf>,
    highlight: bool,
    settings: &Settings,
) -> Result<()> {
    let mut browser = settings.browser_options();
    if highlight {
        browser.headless = false;
    }
    let mut opts = settings.analyze_options();
    opts.highlight = highlight;

    output::say(format!("Analyzing {url}..."));
    let renderer = ChromiumRenderer::launch(&browser).await?;
    let result = analyze_url(&renderer, url, &opts).await;
    if let Err(e) = renderer.shutdown().await {
        tracing::warn!("browser shutdown failed: {e:#}");
    }
    let analysis = result?;

    let slug = page_slug(&analysis.url);
    let path = output_path.unwrap_or_else(|| settings.output_dir.join(format!("{slug}.ts")));
    let pom = write_pom(&analysis.elements, &path, &slug)?;

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "url": analysis.url,
            "elements": analysis.elements,
            "file": path,
            "locators": pom.entries,
        }));
    } else {
        output::say(format!(
            "{} locators for {} written to {}",
            pom.entries.len(),
            analysis.url,
            path.display()
        ));
    }
    Ok(())
}
