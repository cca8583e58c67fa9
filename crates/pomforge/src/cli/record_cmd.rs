//! `pomforge record [url]`: open the Playwright recorder, whose output is
//! the input of `pomforge transpile`.

use crate::cli::{output, target_url};
use crate::config::Settings;
use anyhow::{bail, Context, Result};
use std::path::Path;

/// Arguments passed to `npx`.
pub fn codegen_args(url: &str, output: &Path) -> Vec<String> {
    vec![
        "playwright".to_string(),
        "codegen".to_string(),
        url.to_string(),
        "--target=javascript".to_string(),
        format!("--output={}", output.display()),
    ]
}

pub async fn run(url: Option<String>, output_path: &Path, settings: &Settings) -> Result<()> {
    let url = target_url(url, settings)?;
    let npx = which::which("npx").context("npx not found on PATH; install Node.js to record")?;
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    output::say(format!("Recording {url} into {}...", output_path.display()));
    let status = tokio::process::Command::new(&npx)
        .args(codegen_args(&url, output_path))
        .status()
        .await
        .with_context(|| format!("failed to start {}", npx.display()))?;
    if !status.success() {
        bail!("playwright codegen exited with {status}");
    }

    output::say(format!(
        "Recorded script saved; run `pomforge transpile --input {}` next",
        output_path.display()
    ));
    Ok(())
}
