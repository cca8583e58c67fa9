//! Link discovery, URL normalization and page slugs.

use crate::dom::html::selector;
use scraper::Html;
use std::collections::{BTreeSet, HashSet};
use url::Url;

const LOGIN_HINTS: &[&str] = &["/login", "/signin", "/auth"];

/// URL without its `#fragment`.
pub fn strip_fragment(url: &str) -> String {
    match url.split_once('#') {
        Some((base, _)) => base.to_string(),
        None => url.to_string(),
    }
}

/// Anchor targets of `html` in document order, resolved against `base`,
/// fragment-stripped and deduplicated. Non-navigational schemes are skipped.
pub fn anchor_targets(html: &str, base: &Url) -> Vec<String> {
    let Some(anchors) = selector("a[href]") else {
        return Vec::new();
    };
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for a in document.select(&anchors) {
        let href = a.value().attr("href").unwrap_or("").trim();
        let lower = href.to_ascii_lowercase();
        if href.is_empty()
            || href.starts_with('#')
            || lower.starts_with("mailto:")
            || lower.starts_with("tel:")
            || lower.starts_with("javascript:")
        {
            continue;
        }
        let Ok(mut resolved) = base.join(href) else {
            continue;
        };
        if !matches!(resolved.scheme(), "http" | "https") {
            continue;
        }
        resolved.set_fragment(None);
        let resolved = resolved.to_string();
        if seen.insert(resolved.clone()) {
            out.push(resolved);
        }
    }
    out
}

/// Same-origin links of a page in lexical order.
pub fn same_origin_links(html: &str, page_url: &Url) -> BTreeSet<String> {
    anchor_targets(html, page_url)
        .into_iter()
        .filter(|link| is_same_origin(link, page_url))
        .collect()
}

pub fn is_same_origin(link: &str, base: &Url) -> bool {
    Url::parse(link)
        .map(|u| u.origin() == base.origin())
        .unwrap_or(false)
}

/// Whether the URL's path suggests a login page.
pub fn is_login_url(link: &str) -> bool {
    let path = match Url::parse(link) {
        Ok(u) => u.path().to_ascii_lowercase(),
        Err(_) => link.to_ascii_lowercase(),
    };
    LOGIN_HINTS.iter().any(|hint| path.contains(hint))
}

/// First same-origin login link in document order.
pub fn find_login_link(html: &str, page_url: &Url) -> Option<String> {
    anchor_targets(html, page_url)
        .into_iter()
        .find(|link| is_same_origin(link, page_url) && is_login_url(link))
}

/// File-name slug of a page: `home` for the root, path segments joined by `--`.
pub fn page_slug(url: &str) -> String {
    let path = match Url::parse(url) {
        Ok(u) => u.path().to_string(),
        Err(_) => url.to_string(),
    };
    if path.is_empty() || path == "/" {
        return "home".to_string();
    }

    let mut slug = String::with_capacity(path.len());
    let mut in_gap = false;
    for c in path.trim_matches('/').to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '/' {
            if in_gap {
                slug.push('-');
                in_gap = false;
            }
            slug.push(c);
        } else {
            in_gap = true;
        }
    }
    if in_gap {
        slug.push('-');
    }
    let slug = slug.replace('/', "--");
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "page".to_string()
    } else {
        slug.to_string()
    }
}
