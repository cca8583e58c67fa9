//! Turn analyzer output into uniquely named locator bindings.
//!
//! Element text is used as the literal only when it is short and occurs once
//! on the page; otherwise the selector is used. Names come from the text, a
//! test id or an `#id`, falling back to the tag, plus a tag-specific suffix.
//! Output is deterministic for a given element order.

use super::{LocatorEntry, PomFile};
use crate::locator::naming::{camel_case, NameRegistry};
use crate::locator::AnalyzedElement;
use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Build the locator file for one page.
pub fn generate_pom(elements: &[AnalyzedElement], page_name: &str) -> PomFile {
    let mut frequency: HashMap<&str, usize> = HashMap::new();
    for el in elements {
        if is_name_sized(&el.text) {
            *frequency.entry(el.text.as_str()).or_default() += 1;
        }
    }

    let mut names = NameRegistry::new();
    let mut seen_selectors: HashSet<&str> = HashSet::new();
    let mut entries = Vec::new();

    for el in elements {
        if el.selector.is_empty() || !seen_selectors.insert(el.selector.as_str()) {
            continue;
        }
        let name = names.claim(&locator_name(el));
        let unique_text = is_name_sized(&el.text) && frequency.get(el.text.as_str()) == Some(&1);
        let value = if unique_text {
            el.text.clone()
        } else {
            el.selector.clone()
        };
        entries.push(LocatorEntry { name, value });
    }

    PomFile {
        page_name: page_name.to_string(),
        entries,
    }
}

/// Generate and write a locator file, creating parent directories.
pub fn write_pom(elements: &[AnalyzedElement], path: &Path, page_name: &str) -> Result<PomFile> {
    let pom = generate_pom(elements, page_name);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, pom.render())
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(
        "wrote {} locators for {page_name} to {}",
        pom.entries.len(),
        path.display()
    );
    Ok(pom)
}

fn is_name_sized(text: &str) -> bool {
    let len = text.chars().count();
    len > 2 && len < 30
}

/// Unsuffixed-collision name for an element.
fn locator_name(el: &AnalyzedElement) -> String {
    let tag = el.tag.as_str();
    let base = if is_name_sized(&el.text) {
        camel_case(&el.text)
    } else if el.selector.starts_with("[data-testid=") {
        match test_id_of(&el.selector) {
            Some(id) => camel_case(id),
            None => camel_case(&format!("testid {tag}")),
        }
    } else if let Some(id) = el.selector.strip_prefix('#') {
        camel_case(id)
    } else {
        tag.to_string()
    };

    let suffix = match tag {
        "button" => "Button",
        "a" => "Link",
        "input" => "Input",
        "select" => "Select",
        "textarea" => "Textarea",
        _ => "Element",
    };

    if base.ends_with(suffix) {
        base
    } else {
        format!("{base}{suffix}")
    }
}

/// Value inside `[data-testid="..."]`.
fn test_id_of(selector: &str) -> Option<&str> {
    let inner = selector.strip_prefix("[data-testid=")?.strip_suffix(']')?;
    let inner = inner.trim_matches('"');
    (!inner.is_empty()).then_some(inner)
}
