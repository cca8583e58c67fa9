//! A scripted in-memory site served through the renderer traits.

#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use pomforge::crawler::login::LoginPrompt;
use pomforge::crawler::session::{Cookie, SameSite, StorageState};
use pomforge::dom::html::snapshot_html;
use pomforge::dom::{ElementSnapshot, OutlineColor};
use pomforge::renderer::{NavigationResult, RenderContext, Renderer};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
pub struct SiteLog {
    pub navigations: Vec<String>,
    pub contexts_opened: usize,
    pub contexts_closed: usize,
    pub sessions_applied: usize,
    /// `(selector, value)` of every field filled.
    pub fills: Vec<(String, String)>,
}

/// A login form: submitting the right password moves to `landing`.
struct LoginPage {
    password_selector: String,
    submit_selector: String,
    password: String,
    landing: String,
}

#[derive(Default)]
pub struct FakeSite {
    pages: HashMap<String, String>,
    redirects: HashMap<String, String>,
    failing: HashSet<String>,
    flaky: Mutex<HashSet<String>>,
    logins: HashMap<String, LoginPage>,
    pub log: Mutex<SiteLog>,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    pub fn redirect(mut self, from: &str, to: &str) -> Self {
        self.redirects.insert(from.to_string(), to.to_string());
        self
    }

    pub fn failing(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    /// The next navigation to `url` fails; later ones succeed.
    pub fn fails_once(self, url: &str) -> Self {
        self.flaky.lock().unwrap().insert(url.to_string());
        self
    }

    /// Serve a login form at `url` whose submit button leads to `landing`
    /// when `password` was typed into `password_selector`.
    pub fn login_form(
        mut self,
        url: &str,
        password_selector: &str,
        submit_selector: &str,
        password: &str,
        landing: &str,
    ) -> Self {
        let html = r#"<form><input><input type="password"><button>Log in</button></form>"#;
        self.pages.insert(url.to_string(), html.to_string());
        self.logins.insert(
            url.to_string(),
            LoginPage {
                password_selector: password_selector.to_string(),
                submit_selector: submit_selector.to_string(),
                password: password.to_string(),
                landing: landing.to_string(),
            },
        );
        self
    }

    pub fn renderer(self) -> Arc<FakeRenderer> {
        Arc::new(FakeRenderer {
            site: Arc::new(self),
        })
    }

    pub fn navigations_to(&self, url: &str) -> usize {
        self.log
            .lock()
            .unwrap()
            .navigations
            .iter()
            .filter(|u| u.as_str() == url)
            .count()
    }
}

pub struct FakeRenderer {
    pub site: Arc<FakeSite>,
}

#[async_trait]
impl Renderer for FakeRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        self.site.log.lock().unwrap().contexts_opened += 1;
        Ok(Box::new(FakePage {
            site: Arc::clone(&self.site),
            url: Mutex::new("about:blank".to_string()),
        }))
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    fn active_contexts(&self) -> usize {
        let log = self.site.log.lock().unwrap();
        log.contexts_opened - log.contexts_closed
    }
}

pub struct FakePage {
    site: Arc<FakeSite>,
    url: Mutex<String>,
}

impl FakePage {
    fn current(&self) -> String {
        self.url.lock().unwrap().clone()
    }
}

#[async_trait]
impl RenderContext for FakePage {
    async fn navigate(&mut self, url: &str, _timeout_ms: u64) -> Result<NavigationResult> {
        self.site.log.lock().unwrap().navigations.push(url.to_string());
        if self.site.failing.contains(url) || self.site.flaky.lock().unwrap().remove(url) {
            bail!("net::ERR_CONNECTION_RESET at {url}");
        }
        let landed = self.site.redirects.get(url).cloned().unwrap_or_else(|| url.to_string());
        if !self.site.pages.contains_key(&landed) {
            bail!("net::ERR_NAME_NOT_RESOLVED at {landed}");
        }
        *self.url.lock().unwrap() = landed.clone();
        Ok(NavigationResult {
            final_url: landed,
            load_time_ms: 1,
        })
    }

    async fn execute_js(&self, _script: &str) -> Result<serde_json::Value> {
        Ok(serde_json::Value::Null)
    }

    async fn get_html(&self) -> Result<String> {
        Ok(self.site.pages.get(&self.current()).cloned().unwrap_or_default())
    }

    async fn get_url(&self) -> Result<String> {
        Ok(self.current())
    }

    /// Everything is visible except on a login form page.
    async fn wait_for_visible(&self, _selector: &str, _timeout_ms: u64) -> Result<bool> {
        Ok(!self.site.logins.contains_key(&self.current()))
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        self.site
            .log
            .lock()
            .unwrap()
            .fills
            .push((selector.to_string(), value.to_string()));
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let here = self.current();
        let Some(form) = self.site.logins.get(&here) else {
            return Ok(());
        };
        if selector != form.submit_selector {
            bail!("no element matches {selector}");
        }
        let typed = self
            .site
            .log
            .lock()
            .unwrap()
            .fills
            .iter()
            .rev()
            .find(|(sel, _)| *sel == form.password_selector)
            .map(|(_, value)| value.clone());
        if typed.as_deref() == Some(form.password.as_str()) {
            *self.url.lock().unwrap() = form.landing.clone();
        }
        Ok(())
    }

    async fn snapshot_elements(&self) -> Result<Vec<ElementSnapshot>> {
        Ok(snapshot_html(&self.get_html().await?))
    }

    async fn outline(&self, _indices: &[usize], _color: OutlineColor) -> Result<()> {
        Ok(())
    }

    async fn storage_state(&self) -> Result<StorageState> {
        Ok(logged_in_state())
    }

    async fn apply_storage_state(&mut self, _state: &StorageState) -> Result<()> {
        self.site.log.lock().unwrap().sessions_applied += 1;
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.site.log.lock().unwrap().contexts_closed += 1;
        Ok(())
    }
}

pub fn logged_in_state() -> StorageState {
    StorageState {
        cookies: vec![Cookie {
            name: "sid".into(),
            value: "s3cr3t".into(),
            domain: "site.test".into(),
            path: "/".into(),
            expires: -1.0,
            http_only: true,
            secure: true,
            same_site: SameSite::Lax,
        }],
        origins: Vec::new(),
    }
}

/// Confirms the login immediately and remembers where it was asked.
#[derive(Default)]
pub struct ScriptedPrompt {
    pub asked: Mutex<Vec<String>>,
}

#[async_trait]
impl LoginPrompt for ScriptedPrompt {
    async fn wait_for_login(&self, login_url: &str) -> Result<()> {
        self.asked.lock().unwrap().push(login_url.to_string());
        Ok(())
    }
}

/// A page body with one button and the given links.
pub fn html_with_links(title: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{href}">Go to {href}</a>"#))
        .collect();
    format!(r#"<div id="root"><h1>{title}</h1><button id="{title}-action">Do {title}</button>{anchors}</div>"#)
}
