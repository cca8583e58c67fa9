//! Page-Object-Model locator files: generation, reading and live comparison.

pub mod compare;
pub mod generator;
pub mod reader;

use crate::locator::push_escaped;
use serde::{Deserialize, Serialize};

/// One exported binding in a locator file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorEntry {
    pub name: String,
    /// Literal locator value: element text, attribute value or selector.
    pub value: String,
}

/// A rendered locator file for one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PomFile {
    pub page_name: String,
    pub entries: Vec<LocatorEntry>,
}

impl PomFile {
    /// Header comment, a blank line, then one `export const` per entry.
    pub fn render(&self) -> String {
        let mut lines = Vec::with_capacity(self.entries.len() + 2);
        lines.push(format!("// Locators for page: {}", self.page_name));
        lines.push(String::new());
        for entry in &self.entries {
            lines.push(format!(
                "export const {} = {};",
                entry.name,
                quote_literal(&entry.value)
            ));
        }
        lines.join("\n")
    }
}

/// Single-quoted string literal; backslashes, `'` and control characters
/// are escaped.
pub fn quote_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        push_escaped(&mut out, c, false);
    }
    out.push('\'');
    out
}
