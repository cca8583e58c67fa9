//! Classified failures that callers branch on.
//!
//! Everything else travels as a plain `anyhow::Error` with context; these
//! variants are wrapped into `anyhow` too and recovered with
//! [`classify`] where policy depends on them.

use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum PomforgeError {
    #[error("login required: found login page {login_url} but no saved session is available")]
    LoginRequired { login_url: String },

    #[error("session state {} unavailable: {reason}", path.display())]
    SessionUnavailable { path: PathBuf, reason: String },

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("{what} timed out after {timeout_ms}ms")]
    Timeout { what: String, timeout_ms: u64 },

    #[error("failed to fetch page {url}: {reason}")]
    PageFetch {
        url: String,
        status: Option<u16>,
        reason: String,
    },

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Find the first [`PomforgeError`] in an error chain.
pub fn classify(err: &anyhow::Error) -> Option<&PomforgeError> {
    err.chain().find_map(|e| e.downcast_ref::<PomforgeError>())
}

/// Parse an absolute http(s) URL.
pub fn parse_http_url(raw: &str) -> Result<url::Url, PomforgeError> {
    let parsed = url::Url::parse(raw.trim()).map_err(|e| PomforgeError::InvalidUrl(format!("{raw}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(PomforgeError::InvalidUrl(format!(
            "{raw}: unsupported scheme '{other}'"
        ))),
    }
}
