//! Runtime settings resolved from environment variables.
//!
//! Resolution order is CLI flag > environment variable > default. The CLI
//! layer applies its flags on top of [`Settings::from_env`].

use crate::analyzer::AnalyzeOptions;
use crate::crawler::login::{self, LoginForm, Password};
use crate::crawler::CrawlConfig;
use crate::linkcheck::CheckConfig;
use crate::renderer::BrowserOptions;
use anyhow::{bail, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Process-wide settings for every pomforge operation.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Default target URL (`BASEURL`).
    pub base_url: Option<String>,
    /// Directory receiving generated POM files.
    pub output_dir: PathBuf,
    /// Session-state file reused across runs.
    pub storage_state: PathBuf,
    /// Explicit browser binary, bypassing discovery.
    pub chromium_path: Option<PathBuf>,
    pub headless: bool,
    pub nav_timeout_ms: u64,
    /// Budget for the root content marker to become visible.
    pub content_wait_ms: u64,
    /// How long highlighted pages stay open for inspection.
    pub inspect_secs: u64,
    pub page_concurrency: usize,
    pub resource_concurrency: usize,
    pub probe_timeout_ms: u64,
    /// Directory receiving `output.txt` and `error_log.txt`.
    pub report_dir: PathBuf,
    /// Scripted login page (`POMFORGE_LOGIN_URL`).
    pub login_url: Option<String>,
    pub login_username: Option<String>,
    pub login_password: Option<Password>,
    pub login_username_selector: String,
    pub login_password_selector: String,
    pub login_submit_selector: String,
    pub login_success_selector: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: None,
            output_dir: PathBuf::from("output"),
            storage_state: PathBuf::from("storageState.json"),
            chromium_path: None,
            headless: true,
            nav_timeout_ms: 60_000,
            content_wait_ms: 7_000,
            inspect_secs: 60,
            page_concurrency: 5,
            resource_concurrency: 20,
            probe_timeout_ms: 5_000,
            report_dir: PathBuf::from("."),
            login_url: None,
            login_username: None,
            login_password: None,
            login_username_selector: login::DEFAULT_USERNAME_SELECTOR.to_string(),
            login_password_selector: login::DEFAULT_PASSWORD_SELECTOR.to_string(),
            login_submit_selector: login::DEFAULT_SUBMIT_SELECTOR.to_string(),
            login_success_selector: login::DEFAULT_SUCCESS_SELECTOR.to_string(),
        }
    }
}

impl Settings {
    /// Resolve settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve settings through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Self {
            base_url: get("BASEURL"),
            output_dir: get("POMFORGE_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            storage_state: get("POMFORGE_STORAGE_STATE")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_state),
            chromium_path: get("POMFORGE_CHROMIUM_PATH").map(PathBuf::from),
            headless: get("POMFORGE_HEADLESS")
                .map(|v| !matches!(v.to_ascii_lowercase().as_str(), "0" | "false" | "no"))
                .unwrap_or(defaults.headless),
            nav_timeout_ms: parse_or(get("POMFORGE_NAV_TIMEOUT_MS"), defaults.nav_timeout_ms),
            content_wait_ms: parse_or(get("POMFORGE_CONTENT_WAIT_MS"), defaults.content_wait_ms),
            inspect_secs: parse_or(get("POMFORGE_INSPECT_SECS"), defaults.inspect_secs),
            page_concurrency: parse_or(get("POMFORGE_PAGE_CONCURRENCY"), defaults.page_concurrency)
                .max(1),
            resource_concurrency: parse_or(
                get("POMFORGE_RESOURCE_CONCURRENCY"),
                defaults.resource_concurrency,
            )
            .max(1),
            probe_timeout_ms: parse_or(get("POMFORGE_PROBE_TIMEOUT_MS"), defaults.probe_timeout_ms),
            report_dir: get("POMFORGE_REPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.report_dir),
            login_url: get("POMFORGE_LOGIN_URL"),
            login_username: get("POMFORGE_LOGIN_USERNAME"),
            // Passwords are taken verbatim, surrounding spaces included.
            login_password: lookup("POMFORGE_LOGIN_PASSWORD")
                .filter(|v| !v.is_empty())
                .map(Password::new),
            login_username_selector: get("POMFORGE_LOGIN_USERNAME_SELECTOR")
                .unwrap_or(defaults.login_username_selector),
            login_password_selector: get("POMFORGE_LOGIN_PASSWORD_SELECTOR")
                .unwrap_or(defaults.login_password_selector),
            login_submit_selector: get("POMFORGE_LOGIN_SUBMIT_SELECTOR")
                .unwrap_or(defaults.login_submit_selector),
            login_success_selector: get("POMFORGE_LOGIN_SUCCESS_SELECTOR")
                .unwrap_or(defaults.login_success_selector),
        }
    }

    /// The scripted login form; fails when credentials are not configured.
    pub fn login_form(&self) -> Result<LoginForm> {
        let (Some(username), Some(password)) = (&self.login_username, &self.login_password)
        else {
            bail!(
                "POMFORGE_LOGIN_USERNAME and POMFORGE_LOGIN_PASSWORD must be set for a scripted login"
            );
        };
        Ok(LoginForm {
            username_selector: self.login_username_selector.clone(),
            password_selector: self.login_password_selector.clone(),
            submit_selector: self.login_submit_selector.clone(),
            success_selector: self.login_success_selector.clone(),
            timeout_ms: self.nav_timeout_ms,
            ..LoginForm::new(username.clone(), password.clone())
        })
    }

    pub fn browser_options(&self) -> BrowserOptions {
        BrowserOptions {
            headless: self.headless,
            executable: self.chromium_path.clone(),
        }
    }

    pub fn analyze_options(&self) -> AnalyzeOptions {
        AnalyzeOptions {
            nav_timeout_ms: self.nav_timeout_ms,
            content_wait_ms: self.content_wait_ms,
            inspect_window: Duration::from_secs(self.inspect_secs),
            ..AnalyzeOptions::default()
        }
    }

    pub fn crawl_config(&self) -> CrawlConfig {
        CrawlConfig {
            output_dir: self.output_dir.clone(),
            storage_state: self.storage_state.clone(),
            analyze: self.analyze_options(),
            ..CrawlConfig::default()
        }
    }

    pub fn check_config(&self) -> CheckConfig {
        CheckConfig {
            page_concurrency: self.page_concurrency,
            resource_concurrency: self.resource_concurrency,
            probe_timeout_ms: self.probe_timeout_ms,
            report_dir: self.report_dir.clone(),
            ..CheckConfig::default()
        }
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, default: T) -> T {
    match raw {
        Some(v) => match v.parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                tracing::warn!("ignoring unparsable setting value '{v}'");
                default
            }
        },
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let s = Settings::from_lookup(lookup(&[]));
        assert_eq!(s.base_url, None);
        assert_eq!(s.output_dir, PathBuf::from("output"));
        assert_eq!(s.storage_state, PathBuf::from("storageState.json"));
        assert!(s.headless);
        assert_eq!(s.page_concurrency, 5);
        assert_eq!(s.resource_concurrency, 20);
        assert_eq!(s.content_wait_ms, 7_000);
    }

    #[test]
    fn test_env_overrides() {
        let s = Settings::from_lookup(lookup(&[
            ("BASEURL", "https://shop.test"),
            ("POMFORGE_HEADLESS", "0"),
            ("POMFORGE_PAGE_CONCURRENCY", "2"),
            ("POMFORGE_PROBE_TIMEOUT_MS", "1500"),
            ("POMFORGE_REPORT_DIR", "/tmp/reports"),
        ]));
        assert_eq!(s.base_url.as_deref(), Some("https://shop.test"));
        assert!(!s.headless);
        assert_eq!(s.page_concurrency, 2);
        assert_eq!(s.probe_timeout_ms, 1500);
        assert_eq!(s.report_dir, PathBuf::from("/tmp/reports"));
    }

    #[test]
    fn test_bad_values_fall_back() {
        let s = Settings::from_lookup(lookup(&[
            ("POMFORGE_NAV_TIMEOUT_MS", "soon"),
            ("POMFORGE_RESOURCE_CONCURRENCY", "0"),
            ("BASEURL", "   "),
        ]));
        assert_eq!(s.nav_timeout_ms, 60_000);
        assert_eq!(s.resource_concurrency, 1);
        assert_eq!(s.base_url, None);
    }

    #[test]
    fn test_component_configs_follow_settings() {
        let s = Settings::from_lookup(lookup(&[("POMFORGE_INSPECT_SECS", "3")]));
        assert_eq!(s.analyze_options().inspect_window, Duration::from_secs(3));
        assert_eq!(s.crawl_config().storage_state, s.storage_state);
        assert_eq!(s.check_config().resource_concurrency, 20);
    }

    #[test]
    fn test_login_form_needs_credentials() {
        let s = Settings::from_lookup(lookup(&[("POMFORGE_LOGIN_USERNAME", "qa@shop.test")]));
        assert!(s.login_form().is_err());

        let s = Settings::from_lookup(lookup(&[
            ("POMFORGE_LOGIN_USERNAME", "qa@shop.test"),
            ("POMFORGE_LOGIN_PASSWORD", " pa ss "),
            ("POMFORGE_LOGIN_SUBMIT_SELECTOR", "#go"),
            ("POMFORGE_NAV_TIMEOUT_MS", "9000"),
        ]));
        let form = s.login_form().unwrap();
        assert_eq!(form.password.expose(), " pa ss ");
        assert_eq!(form.submit_selector, "#go");
        assert_eq!(form.username_selector, login::DEFAULT_USERNAME_SELECTOR);
        assert_eq!(form.timeout_ms, 9000);
        assert!(!format!("{s:?}").contains("pa ss"));
    }
}
