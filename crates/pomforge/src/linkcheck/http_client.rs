//! HTTP access for the link checker, wrapping reqwest.
//!
//! Not a browser: pages are fetched as text and resources are only probed
//! for status and content type. Bodies of probe responses are never read.

use super::{CheckConfig, ResourceKind, USER_AGENT};
use crate::error::PomforgeError;
use std::time::Duration;
use tracing::debug;

/// Status and content type of one probed resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeOutcome {
    /// `None` when no HTTP response was received at all.
    pub status: Option<u16>,
    pub content_type: Option<String>,
}

#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    probe_timeout: Duration,
    page_timeout: Duration,
}

impl HttpClient {
    pub fn new(config: &CheckConfig) -> Self {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            probe_timeout: Duration::from_millis(config.probe_timeout_ms),
            page_timeout: Duration::from_millis(config.page_timeout_ms),
        }
    }

    /// Fetch a page's HTML. Any non-success status is an error.
    pub async fn fetch_page(&self, url: &str) -> Result<String, PomforgeError> {
        let resp = self
            .client
            .get(url)
            .timeout(self.page_timeout)
            .send()
            .await
            .map_err(|e| PomforgeError::PageFetch {
                url: url.to_string(),
                status: e.status().map(|s| s.as_u16()),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PomforgeError::PageFetch {
                url: url.to_string(),
                status: Some(status.as_u16()),
                reason: format!("HTTP {status}"),
            });
        }

        resp.text().await.map_err(|e| PomforgeError::PageFetch {
            url: url.to_string(),
            status: Some(status.as_u16()),
            reason: e.to_string(),
        })
    }

    /// Fetch a document if it exists, `None` on any failure.
    pub async fn fetch_optional(&self, url: &str) -> Option<String> {
        match self.fetch_page(url).await {
            Ok(body) => Some(body),
            Err(e) => {
                debug!("optional fetch skipped: {e}");
                None
            }
        }
    }

    /// HEAD the resource, falling back to a GET when HEAD is rejected
    /// (405) or fails without a response.
    ///
    /// Image URLs are probed without their query string.
    pub async fn probe(&self, url: &str, kind: ResourceKind) -> ProbeOutcome {
        let target = match kind {
            ResourceKind::Image => strip_query(url),
            ResourceKind::Link => url,
        };

        match self
            .client
            .head(target)
            .timeout(self.probe_timeout)
            .send()
            .await
        {
            Ok(resp) if resp.status().as_u16() != 405 => return outcome(&resp),
            Ok(_) => debug!(url = target, "HEAD rejected, retrying with GET"),
            Err(e) => debug!(url = target, "HEAD failed: {e}"),
        }

        match self
            .client
            .get(target)
            .timeout(self.probe_timeout)
            .send()
            .await
        {
            Ok(resp) => outcome(&resp),
            Err(e) => ProbeOutcome {
                status: e.status().map(|s| s.as_u16()),
                content_type: None,
            },
        }
    }
}

fn outcome(resp: &reqwest::Response) -> ProbeOutcome {
    ProbeOutcome {
        status: Some(resp.status().as_u16()),
        content_type: resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    }
}

fn strip_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}
