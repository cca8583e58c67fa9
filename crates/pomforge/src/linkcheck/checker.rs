//! Page scanning, resource probing and the full-site crawl loop.

use super::extract::extract_resources;
use super::http_client::{HttpClient, ProbeOutcome};
use super::report::{self, format_duration, RunLog};
use super::sitemap::fetch_sitemap_urls;
use super::{
    BrokenResource, CheckConfig, CheckMode, CheckReport, FailurePolicy, PageFailure, Resource,
    ResourceKind,
};
use crate::error::{parse_http_url, PomforgeError};
use anyhow::Result;
use futures::future::join_all;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::debug;
use url::Url;

/// Why a probed resource counts as broken, or `None` if it is healthy.
///
/// Broken means no response at all, status 400, 404 or 5xx, or an image
/// served with a non-image content type.
pub fn classify(resource: &Resource, outcome: &ProbeOutcome) -> Option<String> {
    let Some(status) = outcome.status else {
        return Some("unreachable".to_string());
    };
    if status == 400 || status == 404 || (500..600).contains(&status) {
        return Some(format!("HTTP {status}"));
    }
    if resource.kind == ResourceKind::Image {
        let content_type = outcome.content_type.as_deref().unwrap_or_default();
        if !content_type.starts_with("image/") {
            let shown = if content_type.is_empty() { "none" } else { content_type };
            return Some(format!("content-type {shown}"));
        }
    }
    None
}

/// Check every link and image on one page.
pub async fn check_page(url: &str, config: &CheckConfig) -> Result<CheckReport> {
    let start = parse_http_url(url)?;
    Checker::new(config).run(start, CheckMode::Single).await
}

/// Check the whole site reachable from `url`, seeded by its sitemap.
pub async fn check_site(url: &str, config: &CheckConfig) -> Result<CheckReport> {
    let start = parse_http_url(url)?;
    Checker::new(config).run(start, CheckMode::Full).await
}

struct PageScan {
    resources: Vec<Resource>,
    broken: Vec<BrokenResource>,
}

struct Checker<'a> {
    client: HttpClient,
    config: &'a CheckConfig,
    limiter: Arc<Semaphore>,
    log: RunLog,
}

impl<'a> Checker<'a> {
    fn new(config: &'a CheckConfig) -> Self {
        Self {
            client: HttpClient::new(config),
            config,
            limiter: Arc::new(Semaphore::new(config.resource_concurrency.max(1))),
            log: RunLog::new(),
        }
    }

    async fn run(mut self, start: Url, mode: CheckMode) -> Result<CheckReport> {
        let started = Instant::now();
        report::reset_error_log(&self.config.report_dir)?;

        let mut report = CheckReport {
            mode,
            start_url: start.to_string(),
            pages_scanned: 0,
            total_links: 0,
            total_images: 0,
            broken: Vec::new(),
            failures: Vec::new(),
            duration: Default::default(),
        };

        match mode {
            CheckMode::Single => {
                self.log.line(format!("Starting single-page scan of {start}"));
                let page = start.to_string();
                report.pages_scanned = 1;
                let result = self.scan_page(&page).await;
                self.record(&mut report, &page, result)?;
            }
            CheckMode::Full => {
                self.log.line(format!("Starting full scan of {start}"));
                self.crawl(&start, &mut report).await?;
            }
        }

        report.duration = started.elapsed();
        self.summarize(&report);
        let path = self.log.write(&self.config.report_dir)?;
        self.log
            .line(format!("Results saved to: {}", path.display()));
        Ok(report)
    }

    async fn crawl(&mut self, start: &Url, report: &mut CheckReport) -> Result<()> {
        let host = start.host_str().unwrap_or_default().to_string();
        let seeds = fetch_sitemap_urls(&self.client, start.as_str()).await;

        let mut queued: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<String> = VecDeque::new();
        for url in std::iter::once(start.clone())
            .chain(seeds.iter().filter_map(|s| Url::parse(s).ok()))
            .filter(|u| same_site(u, &host))
        {
            if queued.insert(url.to_string()) {
                queue.push_back(url.to_string());
            }
        }

        let batch_size = self.config.page_concurrency.max(1);
        while !queue.is_empty() {
            let take = batch_size.min(queue.len());
            let batch: Vec<String> = queue.drain(..take).collect();
            for page in &batch {
                self.log.line(format!("Scanning: {page}"));
            }
            report.pages_scanned += batch.len();

            let this = &*self;
            let results = join_all(batch.iter().map(|page| this.scan_page(page))).await;

            for (page, result) in batch.iter().zip(results) {
                if let Ok(scan) = &result {
                    for link in scan.resources.iter().filter(|r| r.kind == ResourceKind::Link) {
                        let Ok(url) = Url::parse(&link.url) else {
                            continue;
                        };
                        if same_site(&url, &host) && queued.insert(url.to_string()) {
                            queue.push_back(url.to_string());
                        }
                    }
                }
                self.record(report, page, result)?;
            }
        }
        Ok(())
    }

    async fn scan_page(&self, page: &str) -> Result<PageScan, PomforgeError> {
        let html = self.client.fetch_page(page).await?;
        let base = Url::parse(page).map_err(|e| PomforgeError::InvalidUrl(format!("{page}: {e}")))?;
        let resources = extract_resources(&html, &base);
        debug!(page, count = resources.len(), "resources extracted");

        let probes = resources.iter().map(|resource| {
            let limiter = self.limiter.clone();
            async move {
                let _permit = limiter.acquire_owned().await.ok()?;
                let outcome = self.client.probe(&resource.url, resource.kind).await;
                classify(resource, &outcome).map(|reason| BrokenResource {
                    url: resource.url.clone(),
                    kind: resource.kind,
                    page: page.to_string(),
                    status: outcome.status,
                    reason,
                })
            }
        });
        let broken = join_all(probes).await.into_iter().flatten().collect();

        Ok(PageScan { resources, broken })
    }

    /// Fold one page's result into the report, applying the failure policy.
    fn record(
        &mut self,
        report: &mut CheckReport,
        page: &str,
        result: Result<PageScan, PomforgeError>,
    ) -> Result<()> {
        match result {
            Ok(scan) => {
                for resource in &scan.resources {
                    match resource.kind {
                        ResourceKind::Link => report.total_links += 1,
                        ResourceKind::Image => report.total_images += 1,
                    }
                }
                for broken in &scan.broken {
                    let label = match broken.kind {
                        ResourceKind::Link => "Broken link",
                        ResourceKind::Image => "Broken image",
                    };
                    self.log
                        .line(format!("- {label}: {} ({})", broken.url, broken.reason));
                }
                report.broken.extend(scan.broken);
                Ok(())
            }
            Err(err) => {
                let failure = PageFailure {
                    url: page.to_string(),
                    message: err.to_string(),
                    at: chrono::Utc::now(),
                };
                report::append_error(&self.config.report_dir, &failure, &format!("{err:?}"))?;
                self.log
                    .line(format!("- Failed page: {page} ({})", failure.message));
                report.failures.push(failure);

                if self.config.policy == FailurePolicy::Stop {
                    self.log.write(&self.config.report_dir)?;
                    return Err(anyhow::Error::new(err)
                        .context("link check aborted; see error_log.txt for details"));
                }
                Ok(())
            }
        }
    }

    fn summarize(&mut self, report: &CheckReport) {
        let links = report.broken_links().count();
        let images = report.broken_images().count();
        self.log.line("");
        match report.mode {
            CheckMode::Single => self.log.line("Single-page results:"),
            CheckMode::Full => self.log.line("Full scan finished."),
        }
        self.log
            .line(format!("Pages scanned: {}", report.pages_scanned));
        self.log.line(format!(
            "Total links: {} | Broken links: {links}",
            report.total_links
        ));
        self.log.line(format!(
            "Total images: {} | Broken images: {images}",
            report.total_images
        ));
        self.log
            .line(format!("Failed pages: {}", report.failures.len()));
        self.log
            .line(format!("Duration: {}", format_duration(report.duration)));
    }
}

/// Same host as the crawl start, or a subdomain of it.
fn same_site(url: &Url, host: &str) -> bool {
    match url.host_str() {
        Some(h) => h == host || h.ends_with(&format!(".{host}")),
        None => false,
    }
}
