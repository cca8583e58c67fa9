//! `pomforge crawl <url>`: crawl a site and write one POM file per page.

use crate::cli::output;
use crate::config::Settings;
use crate::crawler::login::{FailFastPrompt, LoginPrompt, StdinPrompt};
use crate::crawler::Crawler;
use anyhow::Result;
use std::sync::Arc;

/// Run the crawl command.
///
/// Interactive runs open a visible browser so the operator can log in;
/// `--non-interactive` keeps the configured headless mode and fails when
/// a login is required.
pub async fn run(
    url: &str,
    non_interactive: bool,
    max_pages: Option<usize>,
    settings: &Settings,
) -> Result<()> {
    let mut browser = settings.browser_options();
    let prompt: Arc<dyn LoginPrompt> = if non_interactive {
        Arc::new(FailFastPrompt)
    } else {
        browser.headless = false;
        Arc::new(StdinPrompt)
    };

    let mut config = settings.crawl_config();
    config.max_pages = max_pages;

    output::say(format!("Crawling {url}..."));
    let crawler = Crawler::launch(&browser, prompt, config).await?;
    let report = crawler.crawl(url).await?;

    if output::is_json() {
        output::print_json(&report);
        return Ok(());
    }

    output::say(format!(
        "Visited {} pages, wrote {} POM files ({:?} session)",
        report.visited.len(),
        report.pom_files.len(),
        report.session
    ));
    for path in &report.pom_files {
        output::say(format!("  {}", path.display()));
    }
    if !report.failures.is_empty() {
        output::say(format!("{} pages failed:", report.failures.len()));
        for failure in &report.failures {
            output::say(format!("  {}: {}", failure.url, failure.error));
        }
    }
    Ok(())
}
