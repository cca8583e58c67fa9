//! Parse sitemap.xml and sitemap index files.

use super::http_client::HttpClient;
use anyhow::Result;
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{debug, warn};

/// Locations found in one sitemap document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sitemap {
    /// Page URLs from `<urlset>`.
    pub pages: Vec<String>,
    /// Child sitemaps from `<sitemapindex>`.
    pub children: Vec<String>,
}

pub fn parse_sitemap(xml: &str) -> Result<Sitemap> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut sitemap = Sitemap::default();
    let mut buf = Vec::new();

    let mut in_url = false;
    let mut in_sitemap = false;
    let mut current_tag = String::new();
    let mut current_loc = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                match name.as_str() {
                    "url" => {
                        in_url = true;
                        current_loc.clear();
                    }
                    "sitemap" => {
                        in_sitemap = true;
                        current_loc.clear();
                    }
                    _ => current_tag = name,
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                match name.as_str() {
                    "url" if in_url => {
                        if !current_loc.is_empty() {
                            sitemap.pages.push(current_loc.clone());
                        }
                        in_url = false;
                    }
                    "sitemap" if in_sitemap => {
                        if !current_loc.is_empty() {
                            sitemap.children.push(current_loc.clone());
                        }
                        in_sitemap = false;
                    }
                    _ => {}
                }
                current_tag.clear();
            }
            Ok(Event::Text(e)) => {
                if (in_url || in_sitemap) && current_tag == "loc" {
                    current_loc = e.unescape().unwrap_or_default().trim().to_string();
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(anyhow::anyhow!("XML parse error: {e}")),
            _ => {}
        }
        buf.clear();
    }

    Ok(sitemap)
}

/// Page URLs from `<base>/sitemap.xml`, following an index one level down.
///
/// A missing or malformed sitemap yields an empty list.
pub async fn fetch_sitemap_urls(client: &HttpClient, base_url: &str) -> Vec<String> {
    let root = format!("{}/sitemap.xml", base_url.trim_end_matches('/'));
    let Some(xml) = client.fetch_optional(&root).await else {
        return Vec::new();
    };
    let sitemap = match parse_sitemap(&xml) {
        Ok(s) => s,
        Err(e) => {
            warn!(url = %root, "ignoring sitemap: {e}");
            return Vec::new();
        }
    };

    let mut pages = sitemap.pages;
    for child in sitemap.children {
        let Some(xml) = client.fetch_optional(&child).await else {
            continue;
        };
        match parse_sitemap(&xml) {
            Ok(nested) => pages.extend(nested.pages),
            Err(e) => warn!(url = %child, "ignoring child sitemap: {e}"),
        }
    }
    debug!(count = pages.len(), "sitemap pages");
    pages
}
