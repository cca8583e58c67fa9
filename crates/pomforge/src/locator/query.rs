//! Parse locator literals into queries a page can resolve.
//!
//! A literal in a POM file is either a locator expression produced by the
//! selector engine (`getByRole(...)`, `#id`, ...) or the plain text of an
//! element whose text was unique on its page.

use super::selector::is_allowed;
use super::unescape_js;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LocatorQuery {
    Role { role: String, name: String },
    Label { text: String },
    Placeholder { text: String },
    Text { text: String },
    Css { selector: String },
}

impl LocatorQuery {
    pub fn parse(literal: &str) -> Self {
        let literal = literal.trim();

        if let Some(args) = call_args(literal, "getByRole") {
            if let (Some(role), Some(name)) = (args.first(), args.get(1)) {
                return LocatorQuery::Role {
                    role: role.clone(),
                    name: name.clone(),
                };
            }
        }
        if let Some(text) = call_args(literal, "getByLabel").and_then(first) {
            return LocatorQuery::Label { text };
        }
        if let Some(text) = call_args(literal, "getByPlaceholder").and_then(first) {
            return LocatorQuery::Placeholder { text };
        }
        if let Some(text) = call_args(literal, "getByText").and_then(first) {
            return LocatorQuery::Text { text };
        }
        if let Some(rest) = literal.strip_prefix("text=") {
            let text = rest.trim_matches(|c| c == '"' || c == '\'');
            return LocatorQuery::Text {
                text: text.to_string(),
            };
        }
        let css_like = is_allowed(literal) || literal.starts_with('[') || literal.starts_with('.');
        if css_like && !literal.starts_with("getBy") {
            return LocatorQuery::Css {
                selector: literal.to_string(),
            };
        }
        LocatorQuery::Text {
            text: literal.to_string(),
        }
    }
}

fn first(args: Vec<String>) -> Option<String> {
    args.into_iter().next()
}

/// Quoted string arguments of `func(...)`, if `literal` is such a call.
fn call_args(literal: &str, func: &str) -> Option<Vec<String>> {
    let inner = literal.strip_prefix(func)?.strip_prefix('(')?;
    let inner = inner.strip_suffix(')')?;
    Some(quoted_strings(inner))
}

/// Every single- or double-quoted string in `src`, unescaped.
fn quoted_strings(src: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut chars = src.chars();
    while let Some(c) = chars.next() {
        if c != '\'' && c != '"' {
            continue;
        }
        let quote = c;
        let mut raw = String::new();
        let mut escaped = false;
        for next in chars.by_ref() {
            if escaped {
                raw.push(next);
                escaped = false;
            } else if next == '\\' {
                raw.push(next);
                escaped = true;
            } else if next == quote {
                break;
            } else {
                raw.push(next);
            }
        }
        out.push(unescape_js(&raw));
    }
    out
}
