//! Element snapshots from static HTML, without a browser.
//!
//! Layout is unknown here, so visibility is approximated from markup:
//! `hidden`, `type="hidden"`, inline `display:none`/`visibility:hidden` on
//! the element or an ancestor, and anything under head/script/style.

use super::{ElementSnapshot, CANDIDATE_SELECTOR};
use scraper::node::Element;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;

/// Compile a static CSS selector, logging instead of panicking.
pub fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(sel) => Some(sel),
        Err(e) => {
            tracing::error!("invalid selector '{css}': {e:?}");
            None
        }
    }
}

/// Build snapshots for every candidate element in `html`.
pub fn snapshot_html(html: &str) -> Vec<ElementSnapshot> {
    let document = Html::parse_document(html);
    let (Some(candidates), Some(labels)) = (selector(CANDIDATE_SELECTOR), selector("label[for]"))
    else {
        return Vec::new();
    };

    let mut label_for: HashMap<String, String> = HashMap::new();
    for label in document.select(&labels) {
        if let Some(target) = label.value().attr("for") {
            label_for
                .entry(target.to_string())
                .or_insert_with(|| collect_text(&label));
        }
    }

    document
        .select(&candidates)
        .enumerate()
        .map(|(index, el)| {
            let v = el.value();
            let attr = |name: &str| v.attr(name).map(str::to_string);
            let id = attr("id").filter(|s| !s.is_empty());
            ElementSnapshot {
                index,
                tag: v.name().to_ascii_lowercase(),
                text: collect_text(&el),
                label_text: id.as_ref().and_then(|i| label_for.get(i).cloned()),
                id,
                role: attr("role"),
                input_type: attr("type"),
                name: attr("name"),
                placeholder: attr("placeholder"),
                aria_label: attr("aria-label"),
                test_id: attr("data-testid"),
                visible: !is_hidden(&el),
            }
        })
        .collect()
}

fn collect_text(el: &ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn is_hidden(el: &ElementRef) -> bool {
    let own = el.value();
    if hidden_by_markup(own) {
        return true;
    }
    if own.name() == "input"
        && own
            .attr("type")
            .is_some_and(|t| t.eq_ignore_ascii_case("hidden"))
    {
        return true;
    }
    el.ancestors().filter_map(ElementRef::wrap).any(|a| {
        matches!(a.value().name(), "head" | "script" | "style") || hidden_by_markup(a.value())
    })
}

fn hidden_by_markup(e: &Element) -> bool {
    if e.attr("hidden").is_some() {
        return true;
    }
    let Some(style) = e.attr("style") else {
        return false;
    };
    let compact: String = style
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    compact.contains("display:none") || compact.contains("visibility:hidden")
}
