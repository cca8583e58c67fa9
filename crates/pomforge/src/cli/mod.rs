//! CLI subcommand implementations for the pomforge binary.

pub mod analyze_cmd;
pub mod compare_cmd;
pub mod crawl_cmd;
pub mod link_test_cmd;
pub mod login_cmd;
pub mod output;
pub mod record_cmd;
pub mod serve_cmd;
pub mod transpile_cmd;

use crate::config::Settings;
use anyhow::{bail, Result};

/// The explicit URL argument, else `BASEURL`.
pub fn target_url(arg: Option<String>, settings: &Settings) -> Result<String> {
    match arg.or_else(|| settings.base_url.clone()) {
        Some(url) if !url.trim().is_empty() => Ok(url.trim().to_string()),
        _ => bail!("no URL given: pass one as an argument or set BASEURL"),
    }
}
