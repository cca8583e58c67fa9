//! Link and image extraction from fetched HTML.

use super::{Resource, ResourceKind};
use crate::dom::html::selector;
use regex::Regex;
use scraper::Html;
use std::collections::HashSet;
use std::sync::OnceLock;
use url::Url;

const SKIPPED_PREFIXES: [&str; 4] = ["data:", "#", "mailto:", "tel:"];

fn image_extension() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\.(jpe?g|png|gif|svg)$").expect("image extension regex is valid")
    })
}

/// Every checkable link and image on the page, resolved against `page_url`,
/// deduplicated in document order (links first).
pub fn extract_resources(html: &str, page_url: &Url) -> Vec<Resource> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let mut push = |url: Url, kind: ResourceKind| {
        let resource = Resource {
            url: url.to_string(),
            kind,
        };
        if seen.insert(resource.clone()) {
            out.push(resource);
        }
    };

    if let Some(anchors) = selector("a[href]") {
        for el in document.select(&anchors) {
            if let Some(url) = el.value().attr("href").and_then(|h| resolve(h, page_url)) {
                push(url, ResourceKind::Link);
            }
        }
    }

    if let Some(images) = selector("img") {
        for el in document.select(&images) {
            let mut candidates: Vec<&str> = el.value().attr("src").into_iter().collect();
            candidates.extend(el.value().attr("srcset").map(srcset_urls).unwrap_or_default());
            for raw in candidates {
                if let Some(url) = resolve_image(raw, page_url) {
                    push(url, ResourceKind::Image);
                }
            }
        }
    }

    if let Some(sources) = selector("source[srcset]") {
        for el in document.select(&sources) {
            for raw in el.value().attr("srcset").map(srcset_urls).unwrap_or_default() {
                if let Some(url) = resolve_image(raw, page_url) {
                    push(url, ResourceKind::Image);
                }
            }
        }
    }

    out
}

/// URL candidates of a `srcset`, dropping width/density descriptors.
fn srcset_urls(srcset: &str) -> Vec<&str> {
    srcset
        .split(',')
        .filter_map(|part| part.split_whitespace().next())
        .collect()
}

fn resolve(raw: &str, base: &Url) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty()
        || SKIPPED_PREFIXES.iter().any(|p| raw.starts_with(p))
        || raw.contains('[')
        || raw.contains(']')
    {
        return None;
    }
    let url = base.join(raw).ok()?;
    if url.fragment().is_some() {
        return None;
    }
    let href = url.as_str();
    if href.contains("PHPSESSID") || href.contains("/cdn-cgi/l/email-protection") {
        return None;
    }
    Some(url)
}

fn resolve_image(raw: &str, base: &Url) -> Option<Url> {
    resolve(raw, base).filter(|u| image_extension().is_match(u.path()))
}
