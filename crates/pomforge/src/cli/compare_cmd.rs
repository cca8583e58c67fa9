//! `pomforge compare` and `pomforge highlight`: check a POM file against a
//! live page in a visible browser.

use crate::cli::output;
use crate::config::Settings;
use crate::crawler::session;
use crate::pom::compare::{compare_live, highlight_live};
use crate::pom::reader::read_pom;
use crate::pom::LocatorEntry;
use crate::renderer::chromium::ChromiumRenderer;
use crate::renderer::{RenderContext, Renderer};
use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Run the compare command.
pub async fn run_compare(
    url: &str,
    pom_path: &Path,
    use_session: bool,
    settings: &Settings,
) -> Result<()> {
    let pom = read_pom(pom_path)?;
    let opts = settings.analyze_options();
    let (renderer, mut ctx) = open_page(settings, use_session).await?;

    let result = compare_live(ctx.as_mut(), url, &pom, &opts, true).await;
    if let Ok(comparison) = &result {
        if output::is_json() {
            output::print_json(comparison);
        } else {
            print_entries("Found", &comparison.found);
            print_entries("Missing", &comparison.missing);
            output::say(format!("Unmapped elements: {}", comparison.unmapped.len()));
            for element in &comparison.unmapped {
                output::say(format!("  <{}> {}", element.tag, element.selector));
            }
        }
    }

    close_page(renderer, ctx, result.is_ok(), settings).await;
    result.map(|_| ())
}

/// Run the highlight command.
pub async fn run_highlight(url: &str, pom_path: &Path, settings: &Settings) -> Result<()> {
    let pom = read_pom(pom_path)?;
    let opts = settings.analyze_options();
    let (renderer, mut ctx) = open_page(settings, false).await?;

    let result = highlight_live(ctx.as_mut(), url, &pom, &opts).await;
    if let Ok(report) = &result {
        if output::is_json() {
            output::print_json(report);
        } else {
            print_entries("Found", &report.found);
            print_entries("Missing", &report.missing);
        }
    }

    close_page(renderer, ctx, result.is_ok(), settings).await;
    result.map(|_| ())
}

fn print_entries(label: &str, entries: &[LocatorEntry]) {
    output::say(format!("{label}: {}", entries.len()));
    for entry in entries {
        output::say(format!("  {} = '{}'", entry.name, entry.value));
    }
}

/// Launch a visible browser with one context, optionally logged in.
async fn open_page(
    settings: &Settings,
    use_session: bool,
) -> Result<(ChromiumRenderer, Box<dyn RenderContext>)> {
    let mut browser = settings.browser_options();
    browser.headless = false;
    let renderer = ChromiumRenderer::launch(&browser).await?;

    let opened = async {
        let mut ctx = renderer.new_context().await?;
        if use_session {
            let state = session::load(&settings.storage_state)
                .context("--use-session needs a saved session")?;
            ctx.apply_storage_state(&state).await?;
        }
        anyhow::Ok(ctx)
    }
    .await;

    match opened {
        Ok(ctx) => Ok((renderer, ctx)),
        Err(e) => {
            if let Err(shutdown) = renderer.shutdown().await {
                warn!("browser shutdown failed: {shutdown:#}");
            }
            Err(e)
        }
    }
}

/// Leave a marked page up for inspection, then tear everything down.
async fn close_page(
    renderer: ChromiumRenderer,
    ctx: Box<dyn RenderContext>,
    inspect: bool,
    settings: &Settings,
) {
    if inspect && settings.inspect_secs > 0 {
        output::say(format!(
            "Keeping the page open for {}s for inspection...",
            settings.inspect_secs
        ));
        tokio::time::sleep(Duration::from_secs(settings.inspect_secs)).await;
    }
    if let Err(e) = ctx.close().await {
        warn!("context close failed: {e:#}");
    }
    if let Err(e) = renderer.shutdown().await {
        warn!("browser shutdown failed: {e:#}");
    }
}
