//! `pomforge link-test`: report broken links and images.

use crate::cli::{output, target_url};
use crate::config::Settings;
use crate::linkcheck::{check_page, check_site, FailurePolicy};
use anyhow::Result;

/// Run the link checker over one page, or the whole site with `full`.
pub async fn run(url: Option<String>, full: bool, fail_fast: bool, settings: &Settings) -> Result<()> {
    let url = target_url(url, settings)?;
    let mut config = settings.check_config();
    if fail_fast {
        config.policy = FailurePolicy::Stop;
    }

    let report = if full {
        check_site(&url, &config).await?
    } else {
        check_page(&url, &config).await?
    };

    if output::is_json() {
        output::print_json(&report);
    } else if !report.is_clean() {
        output::say(format!(
            "{} broken resources, {} failed pages; see {}",
            report.broken.len(),
            report.failures.len(),
            config.report_dir.display()
        ));
    }
    Ok(())
}
