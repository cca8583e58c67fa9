//! Check a locator file against a live page.

use super::{LocatorEntry, PomFile};
use crate::analyzer::{scan, AnalyzeOptions};
use crate::dom::OutlineColor;
use crate::locator::query::LocatorQuery;
use crate::locator::selector::Candidate;
use crate::locator::AnalyzedElement;
use crate::renderer::RenderContext;
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{info, warn};

/// Outcome of comparing a POM file with a fresh scan.
#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub url: String,
    pub found: Vec<LocatorEntry>,
    pub missing: Vec<LocatorEntry>,
    /// Scanned elements no entry refers to.
    pub unmapped: Vec<AnalyzedElement>,
}

/// Outcome of resolving every entry of a POM file in a page.
#[derive(Debug, Clone, Serialize)]
pub struct HighlightReport {
    pub url: String,
    pub found: Vec<LocatorEntry>,
    pub missing: Vec<LocatorEntry>,
}

/// Index of the scanned candidate whose selector or text equals `value`.
pub fn match_scanned(value: &str, scanned: &[Candidate]) -> Option<usize> {
    scanned
        .iter()
        .find(|c| c.element.selector == value || c.element.text == value)
        .map(|c| c.index)
}

/// Scanned elements that no entry literal refers to.
pub fn unmapped<'a>(pom: &PomFile, scanned: &'a [Candidate]) -> Vec<&'a Candidate> {
    let literals: HashSet<&str> = pom.entries.iter().map(|e| e.value.as_str()).collect();
    scanned
        .iter()
        .filter(|c| {
            !literals.contains(c.element.selector.as_str())
                && !literals.contains(c.element.text.as_str())
        })
        .collect()
}

/// Navigate to `url`, scan it and compare the scan with `pom`.
///
/// Entries not matched by the scan are resolved in the page itself, so text
/// and label locators on elements outside the scan still count as found.
/// With `mark`, found elements are outlined green and unmapped ones blue.
pub async fn compare_live(
    ctx: &mut dyn RenderContext,
    url: &str,
    pom: &PomFile,
    opts: &AnalyzeOptions,
    mark: bool,
) -> Result<Comparison> {
    ctx.navigate(url, opts.nav_timeout_ms)
        .await
        .with_context(|| format!("could not load {url}"))?;
    let scanned = scan(ctx, opts).await?;

    let mut indices: Vec<Option<usize>> = pom
        .entries
        .iter()
        .map(|e| match_scanned(&e.value, &scanned))
        .collect();

    let pending: Vec<usize> = (0..indices.len()).filter(|i| indices[*i].is_none()).collect();
    if !pending.is_empty() {
        let queries: Vec<LocatorQuery> = pending
            .iter()
            .map(|i| LocatorQuery::parse(&pom.entries[*i].value))
            .collect();
        match ctx.resolve(&queries).await {
            Ok(resolved) => {
                for (slot, hit) in pending.iter().zip(resolved) {
                    indices[*slot] = hit;
                }
            }
            Err(e) => warn!("in-page locator resolution failed: {e:#}"),
        }
    }

    let (found, missing) = split(pom, &indices);
    let stray = unmapped(pom, &scanned);

    if mark {
        let green: Vec<usize> = indices.iter().flatten().copied().collect();
        let blue: Vec<usize> = stray.iter().map(|c| c.index).collect();
        ctx.outline(&green, OutlineColor::Found).await?;
        ctx.outline(&blue, OutlineColor::Unmapped).await?;
    }

    let final_url = ctx.get_url().await.unwrap_or_else(|_| url.to_string());
    info!(
        "{final_url}: {} found, {} missing, {} unmapped",
        found.len(),
        missing.len(),
        stray.len()
    );
    Ok(Comparison {
        url: final_url,
        found,
        missing,
        unmapped: stray.into_iter().map(|c| c.element.clone()).collect(),
    })
}

/// Navigate to `url` and resolve every entry; outline hits green and list
/// misses in a red panel.
pub async fn highlight_live(
    ctx: &mut dyn RenderContext,
    url: &str,
    pom: &PomFile,
    opts: &AnalyzeOptions,
) -> Result<HighlightReport> {
    ctx.navigate(url, opts.nav_timeout_ms)
        .await
        .with_context(|| format!("could not load {url}"))?;
    // Stamp indices on candidates first so resolution can reuse them.
    scan(ctx, opts).await?;

    let queries: Vec<LocatorQuery> = pom
        .entries
        .iter()
        .map(|e| LocatorQuery::parse(&e.value))
        .collect();
    let indices = ctx.resolve(&queries).await?;
    let (found, missing) = split(pom, &indices);

    let green: Vec<usize> = indices.iter().flatten().copied().collect();
    ctx.outline(&green, OutlineColor::Found).await?;
    let labels: Vec<String> = missing
        .iter()
        .map(|e| format!("{} = {}", e.name, e.value))
        .collect();
    ctx.show_missing(&labels).await?;

    Ok(HighlightReport {
        url: ctx.get_url().await.unwrap_or_else(|_| url.to_string()),
        found,
        missing,
    })
}

fn split(pom: &PomFile, indices: &[Option<usize>]) -> (Vec<LocatorEntry>, Vec<LocatorEntry>) {
    let mut found = Vec::new();
    let mut missing = Vec::new();
    for (entry, hit) in pom.entries.iter().zip(indices) {
        if hit.is_some() {
            found.push(entry.clone());
        } else {
            missing.push(entry.clone());
        }
    }
    (found, missing)
}
