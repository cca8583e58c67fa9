//! Link and image health checking over plain HTTP.
//!
//! Two modes share one pipeline: fetch a page, extract its links and
//! images, probe each one under a concurrency limit and classify the
//! result. Full-site mode seeds the queue from `sitemap.xml` and keeps
//! expanding through same-host links, a bounded batch of pages at a time.

pub mod checker;
pub mod extract;
pub mod http_client;
pub mod report;
pub mod sitemap;

pub use checker::{check_page, check_site};

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

pub const USER_AGENT: &str = "pomforge-link-tester/1.0";

/// What to do when a page itself cannot be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Record the failure and keep going.
    #[default]
    Continue,
    /// Flush the report and abort the run.
    Stop,
}

#[derive(Debug, Clone)]
pub struct CheckConfig {
    /// Pages fetched per crawl batch.
    pub page_concurrency: usize,
    /// Resource probes in flight at once.
    pub resource_concurrency: usize,
    /// Per-probe timeout.
    pub probe_timeout_ms: u64,
    /// Timeout for fetching a page's HTML.
    pub page_timeout_ms: u64,
    pub max_redirects: usize,
    pub policy: FailurePolicy,
    /// Directory receiving `output.txt` and `error_log.txt`.
    pub report_dir: PathBuf,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            page_concurrency: 5,
            resource_concurrency: 20,
            probe_timeout_ms: 5_000,
            page_timeout_ms: 30_000,
            max_redirects: 5,
            policy: FailurePolicy::Continue,
            report_dir: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Link,
    Image,
}

/// A link or image referenced by a page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Resource {
    pub url: String,
    pub kind: ResourceKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct BrokenResource {
    pub url: String,
    pub kind: ResourceKind,
    /// Page the resource was found on.
    pub page: String,
    pub status: Option<u16>,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageFailure {
    pub url: String,
    pub message: String,
    pub at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckMode {
    Single,
    Full,
}

/// Outcome of one checker run.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub mode: CheckMode,
    pub start_url: String,
    pub pages_scanned: usize,
    pub total_links: usize,
    pub total_images: usize,
    pub broken: Vec<BrokenResource>,
    pub failures: Vec<PageFailure>,
    #[serde(with = "duration_ms")]
    pub duration: Duration,
}

impl CheckReport {
    pub fn broken_links(&self) -> impl Iterator<Item = &BrokenResource> {
        self.broken.iter().filter(|b| b.kind == ResourceKind::Link)
    }

    pub fn broken_images(&self) -> impl Iterator<Item = &BrokenResource> {
        self.broken.iter().filter(|b| b.kind == ResourceKind::Image)
    }

    pub fn is_clean(&self) -> bool {
        self.broken.is_empty() && self.failures.is_empty()
    }
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}
