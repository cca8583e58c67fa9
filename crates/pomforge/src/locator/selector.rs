//! Selector heuristic engine.
//!
//! Picks the single most robust locator expression for an element. Rules are
//! tried in priority order and the first match wins:
//!
//! 1. `data-testid` attribute
//! 2. button-like or link element with text, by role and name
//! 3. text of an associated `<label for=id>`
//! 4. `placeholder`
//! 5. `aria-label`
//! 6. generic text on `p`, `span`, `div`, `h1`..`h6`
//! 7. `#id` or `tag[name="..."]`
//!
//! An element matching none of them yields an empty selector and is dropped.

use super::{escape_js, AnalyzedElement};
use crate::dom::ElementSnapshot;
use std::collections::HashSet;

/// Maximum length of text embedded in a locator.
pub const MAX_LOCATOR_TEXT: usize = 100;

const TEXT_TAGS: &[&str] = &["p", "span", "div", "h1", "h2", "h3", "h4", "h5", "h6"];

/// A snapshot that survived selection, with its accepted element record.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Snapshot index, usable for highlighting.
    pub index: usize,
    pub element: AnalyzedElement,
}

/// Best locator for one element, or an empty string.
pub fn best_selector(el: &ElementSnapshot) -> String {
    if let Some(test_id) = el.test_id.as_deref().filter(|s| !s.is_empty()) {
        return format!("[data-testid=\"{test_id}\"]");
    }

    let tag = el.tag.as_str();
    let role = el.role.as_deref().filter(|s| !s.is_empty());
    let input_type = el.input_type.as_deref().map(str::to_ascii_lowercase);
    let text = clean(&el.text);

    let button_like = tag == "button"
        || role == Some("button")
        || (tag == "input"
            && matches!(input_type.as_deref(), Some("button" | "submit" | "reset")));
    if button_like && !text.is_empty() {
        return format!(
            "getByRole('{}', {{ name: '{text}' }})",
            role.unwrap_or("button")
        );
    }
    if tag == "a" && !text.is_empty() {
        return format!("getByRole('link', {{ name: '{text}' }})");
    }

    if el.id().is_some() {
        let label = el.label_text.as_deref().map(clean).unwrap_or_default();
        if !label.is_empty() {
            return format!("getByLabel('{label}')");
        }
    }

    if let Some(placeholder) = el.placeholder.as_deref().filter(|s| !s.is_empty()) {
        return format!("getByPlaceholder('{}')", clean(placeholder));
    }

    let aria = el.aria_label.as_deref().map(clean).unwrap_or_default();
    if !aria.is_empty() {
        return format!("getByLabel('{aria}')");
    }

    if !text.is_empty() && TEXT_TAGS.contains(&tag) {
        let len = text.chars().count();
        if len > 2 && len < 80 && !text.chars().all(|c| c.is_ascii_digit()) {
            return format!("getByText('{text}')");
        }
    }

    if let Some(id) = el.id() {
        return format!("#{}", escape_id(id));
    }
    if let Some(name) = el.name.as_deref().filter(|s| !s.is_empty()) {
        return format!("{tag}[name=\"{}\"]", name.replace('"', "\\\""));
    }

    String::new()
}

/// Only `getBy*`, test-id, `#id` and `tag[name=` selectors are accepted.
pub fn is_allowed(selector: &str) -> bool {
    if selector.starts_with("getBy") || selector.starts_with("[data-testid=") || selector.starts_with('#') {
        return true;
    }
    let tag_len = selector
        .bytes()
        .take_while(|b| b.is_ascii_lowercase())
        .count();
    tag_len > 0 && selector[tag_len..].starts_with("[name=")
}

/// Apply the engine to a page's snapshots.
///
/// Invisible elements, empty or disallowed selectors and repeated selectors
/// are dropped; the first occurrence of a selector wins.
pub fn select_elements(snapshots: &[ElementSnapshot]) -> Vec<Candidate> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();

    for snap in snapshots.iter().filter(|s| s.visible) {
        let selector = best_selector(snap);
        if selector.is_empty() || seen.contains(&selector) || !is_allowed(&selector) {
            continue;
        }
        seen.insert(selector.clone());
        out.push(Candidate {
            index: snap.index,
            element: AnalyzedElement {
                tag: snap.tag.clone(),
                text: snap.display_text(),
                selector,
            },
        });
    }

    out
}

/// Escaped text cut to [`MAX_LOCATOR_TEXT`] characters without splitting
/// an escape sequence.
fn clean(raw: &str) -> String {
    let mut out = String::new();
    let mut len = 0;
    for c in raw.trim().chars() {
        let piece = escape_js(c.encode_utf8(&mut [0; 4]));
        let width = piece.chars().count();
        if len + width > MAX_LOCATOR_TEXT {
            break;
        }
        out.push_str(&piece);
        len += width;
    }
    out
}

fn escape_id(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for c in id.chars() {
        if !(c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::html::snapshot_html;

    fn el(tag: &str) -> ElementSnapshot {
        ElementSnapshot {
            tag: tag.into(),
            visible: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_testid_beats_everything() {
        let snap = ElementSnapshot {
            test_id: Some("save".into()),
            text: "Save".into(),
            id: Some("save-btn".into()),
            aria_label: Some("Save draft".into()),
            placeholder: Some("x".into()),
            ..el("button")
        };
        assert_eq!(best_selector(&snap), "[data-testid=\"save\"]");
    }

    #[test]
    fn test_button_and_link_by_role() {
        let button = ElementSnapshot {
            text: "Log in".into(),
            ..el("button")
        };
        assert_eq!(best_selector(&button), "getByRole('button', { name: 'Log in' })");

        let tab = ElementSnapshot {
            text: "Settings".into(),
            role: Some("button".into()),
            ..el("div")
        };
        assert_eq!(best_selector(&tab), "getByRole('button', { name: 'Settings' })");

        let link = ElementSnapshot {
            text: "Don't miss".into(),
            ..el("a")
        };
        assert_eq!(best_selector(&link), "getByRole('link', { name: 'Don\\'t miss' })");
    }

    #[test]
    fn test_submit_input_without_text_falls_through() {
        let submit = ElementSnapshot {
            input_type: Some("SUBMIT".into()),
            name: Some("go".into()),
            ..el("input")
        };
        assert_eq!(best_selector(&submit), "input[name=\"go\"]");
    }

    #[test]
    fn test_label_placeholder_aria_order() {
        let labelled = ElementSnapshot {
            id: Some("email".into()),
            label_text: Some("Email".into()),
            placeholder: Some("you@x".into()),
            ..el("input")
        };
        assert_eq!(best_selector(&labelled), "getByLabel('Email')");

        let placeholder = ElementSnapshot {
            placeholder: Some(" Search ".into()),
            aria_label: Some("Search box".into()),
            ..el("input")
        };
        assert_eq!(best_selector(&placeholder), "getByPlaceholder('Search')");

        let aria = ElementSnapshot {
            aria_label: Some("Close".into()),
            ..el("span")
        };
        assert_eq!(best_selector(&aria), "getByLabel('Close')");
    }

    #[test]
    fn test_generic_text_bounds() {
        let heading = ElementSnapshot {
            text: "Welcome back".into(),
            role: Some("heading".into()),
            ..el("h2")
        };
        assert_eq!(best_selector(&heading), "getByText('Welcome back')");

        let short = ElementSnapshot {
            text: "OK".into(),
            ..el("span")
        };
        assert_eq!(best_selector(&short), "");

        let digits = ElementSnapshot {
            text: "12345".into(),
            ..el("p")
        };
        assert_eq!(best_selector(&digits), "");

        let long = ElementSnapshot {
            text: "x".repeat(90),
            id: Some("blurb".into()),
            ..el("div")
        };
        assert_eq!(best_selector(&long), "#blurb");
    }

    #[test]
    fn test_css_fallbacks_escape() {
        let odd_id = ElementSnapshot {
            id: Some("a.b:c".into()),
            ..el("section")
        };
        assert_eq!(best_selector(&odd_id), "#a\\.b\\:c");

        let named = ElementSnapshot {
            name: Some("q\"x".into()),
            ..el("textarea")
        };
        assert_eq!(best_selector(&named), "textarea[name=\"q\\\"x\"]");
    }

    #[test]
    fn test_no_rule_yields_empty() {
        assert_eq!(best_selector(&el("select")), "");
    }

    #[test]
    fn test_text_truncated_to_limit() {
        let long = ElementSnapshot {
            text: "y".repeat(150),
            ..el("button")
        };
        let sel = best_selector(&long);
        assert!(sel.contains(&"y".repeat(100)));
        assert!(!sel.contains(&"y".repeat(101)));

        let quoted = ElementSnapshot {
            text: format!("{}'tail", "z".repeat(99)),
            ..el("button")
        };
        assert_eq!(
            best_selector(&quoted),
            format!("getByRole('button', {{ name: '{}' }})", "z".repeat(99))
        );
    }

    #[test]
    fn test_allow_list() {
        assert!(is_allowed("getByText('x')"));
        assert!(is_allowed("[data-testid=\"x\"]"));
        assert!(is_allowed("#main"));
        assert!(is_allowed("input[name=\"q\"]"));
        assert!(!is_allowed("div.card > span"));
        assert!(!is_allowed("[name=\"q\"]"));
        assert!(!is_allowed(""));
    }

    #[test]
    fn test_select_elements_dedupes_and_skips_hidden() {
        let html = r#"<body>
            <button>Buy</button>
            <button>Buy</button>
            <button style="visibility: hidden">Secret</button>
            <a href="/x"></a>
            <input placeholder="Search">
        </body>"#;
        let picked = select_elements(&snapshot_html(html));
        let selectors: Vec<&str> = picked.iter().map(|c| c.element.selector.as_str()).collect();
        assert_eq!(
            selectors,
            vec![
                "getByRole('button', { name: 'Buy' })",
                "getByPlaceholder('Search')"
            ]
        );
        assert_eq!(picked[0].index, 0);
        assert_eq!(picked[1].element.tag, "input");
    }
}
