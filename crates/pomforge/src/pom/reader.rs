//! Read locator files back into entries.

use super::{LocatorEntry, PomFile};
use crate::locator::unescape_next;
use anyhow::{Context, Result};
use std::path::Path;

const HEADER: &str = "// Locators for page:";

pub fn read_pom(path: &Path) -> Result<PomFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read POM file {}", path.display()))?;
    let mut pom = parse_pom(&raw);
    if pom.page_name.is_empty() {
        pom.page_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
    }
    Ok(pom)
}

/// Parse `export const name = '...';` lines; anything else is ignored.
pub fn parse_pom(source: &str) -> PomFile {
    let mut page_name = String::new();
    let mut entries = Vec::new();

    for line in source.lines().map(str::trim) {
        if let Some(name) = line.strip_prefix(HEADER) {
            page_name = name.trim().to_string();
            continue;
        }
        let Some(rest) = line.strip_prefix("export const ") else {
            continue;
        };
        let Some((name, value)) = rest.split_once('=') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$') {
            continue;
        }
        if let Some(value) = string_literal(value.trim()) {
            entries.push(LocatorEntry {
                name: name.to_string(),
                value,
            });
        }
    }

    PomFile { page_name, entries }
}

/// Decode a quoted literal followed by an optional `;`.
fn string_literal(src: &str) -> Option<String> {
    let mut chars = src.chars();
    let quote = chars.next().filter(|q| *q == '\'' || *q == '"')?;
    let mut out = String::new();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push(unescape_next(&mut chars)?),
            c if c == quote => {
                let tail = chars.as_str().trim();
                return (tail.is_empty() || tail == ";").then_some(out);
            }
            c => out.push(c),
        }
    }
    None
}
