//! Artifact synthesis from a named action list.
//!
//! All three artifacts walk the same ordered list, so step N in the feature
//! file is always handler N (or an earlier handler with identical text) in
//! the steps file.

use super::grammar::{Action, RoleTarget};
use super::{StepStyle, TranspileOptions};
use crate::pom::{quote_literal, LocatorEntry, PomFile};
use std::collections::HashSet;

const FALLBACK_SITE: &str = "Example";

/// Display name of the recorded site, from the host of the first `goto`.
///
/// `https://www.shop-demo.test/x` becomes `Shop-demo`.
pub fn site_name(actions: &[Action]) -> String {
    let host = actions.iter().find_map(|a| match a {
        Action::Goto { url } => url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string)),
        _ => None,
    });
    let Some(host) = host else {
        return FALLBACK_SITE.to_string();
    };
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let label = host.split('.').next().unwrap_or_default();
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => FALLBACK_SITE.to_string(),
    }
}

/// Gherkin keyword for each action position.
fn keywords(actions: &[Action], style: StepStyle) -> Vec<&'static str> {
    let last = actions.len().saturating_sub(1);
    let mut interior_seen = false;
    actions
        .iter()
        .enumerate()
        .map(|(i, action)| {
            if i == 0 && matches!(action, Action::Goto { .. }) {
                "Given"
            } else if i == last && actions.len() > 1 {
                "Then"
            } else if style == StepStyle::And && interior_seen {
                "And"
            } else {
                interior_seen = true;
                "When"
            }
        })
        .collect()
}

/// Human-readable step text for one action.
pub fn step_text(action: &Action, site: &str, first_goto: bool) -> String {
    match action {
        Action::Goto { url } => {
            if first_goto {
                format!("the user navigates to the {site} page")
            } else {
                format!("the user navigates to \"{url}\"")
            }
        }
        Action::ClickRole { target, .. } => {
            format!(
                "the user clicks the {} \"{}\"{}",
                target.role,
                target.name,
                target_suffix(target)
            )
        }
        Action::ClickRoleInLocator {
            container, target, ..
        } => format!(
            "the user clicks the {} \"{}\"{} inside \"{}\"",
            target.role,
            target.name,
            target_suffix(target),
            container
        ),
        Action::FillRole { target, value, .. } => format!(
            "the user enters \"{}\" in the \"{}\" field{}",
            value,
            target.name,
            target_suffix(target)
        ),
        Action::PressRole { target, key, .. } => format!(
            "the user presses \"{}\" in the \"{}\" field{}",
            key,
            target.name,
            target_suffix(target)
        ),
        Action::ClickLocator { selector, nth, .. } => {
            format!(
                "the user clicks the element \"{}\"{}",
                selector,
                match_suffix(*nth)
            )
        }
    }
}

/// Exact-name targets read differently so their handlers stay distinct.
fn target_suffix(target: &RoleTarget) -> String {
    let exact = if target.exact { " (exact)" } else { "" };
    format!("{exact}{}", match_suffix(target.nth))
}

fn match_suffix(nth: Option<usize>) -> String {
    match nth {
        Some(n) if n > 0 => format!(" (match {n})"),
        _ => String::new(),
    }
}

/// Step texts in action order, tagged with their keyword.
fn steps(actions: &[Action], site: &str, style: StepStyle) -> Vec<(&'static str, String)> {
    let mut first_goto = true;
    keywords(actions, style)
        .into_iter()
        .zip(actions)
        .map(|(keyword, action)| {
            let text = step_text(action, site, first_goto);
            if matches!(action, Action::Goto { .. }) {
                first_goto = false;
            }
            (keyword, text)
        })
        .collect()
}

// ── Feature file ────────────────────────────────────────────────

pub fn render_feature(actions: &[Action], site: &str, style: StepStyle) -> String {
    let mut out = String::new();
    out.push_str("@Regression\n");
    out.push_str(&format!("Feature: {site} page\n\n"));
    out.push_str("    Scenario: The user replays the recorded actions\n");
    for (keyword, text) in steps(actions, site, style) {
        out.push_str(&format!("        {keyword} {text}\n"));
    }
    out
}

// ── Locators file ───────────────────────────────────────────────

pub fn render_locators(entries: &[LocatorEntry], site: &str) -> String {
    let mut rendered = PomFile {
        page_name: site.to_string(),
        entries: entries.to_vec(),
    }
    .render();
    rendered.push('\n');
    rendered
}

// ── Steps file ──────────────────────────────────────────────────

pub fn render_steps(
    actions: &[Action],
    entries: &[LocatorEntry],
    site: &str,
    opts: &TranspileOptions,
) -> String {
    let mut out = String::new();
    out.push_str("import { Given, When, Then } from '@cucumber/cucumber';\n");
    out.push_str(&format!(
        "import type {{ PomforgeWorld }} from '{}';\n",
        opts.world_import
    ));
    out.push_str(&format!(
        "import {{ pause, STEP_DELAY_MS }} from '{}';\n",
        opts.helpers_import
    ));
    if !entries.is_empty() {
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        out.push_str(&format!(
            "import {{ {} }} from '{}';\n",
            names.join(", "),
            opts.locators_import
        ));
    }

    let mut registered = HashSet::new();
    for ((keyword, text), action) in steps(actions, site, opts.step_style)
        .into_iter()
        .zip(actions)
    {
        if !registered.insert(text.clone()) {
            continue;
        }
        let keyword = if keyword == "And" { "When" } else { keyword };
        out.push('\n');
        out.push_str(&format!(
            "{keyword}({}, async function (this: PomforgeWorld) {{\n",
            quote_literal(&cucumber_escape(&text))
        ));
        out.push_str("    for (const page of this.pages) {\n");
        out.push_str(&format!("        await {};\n", replay(action)));
        out.push_str("        await pause(STEP_DELAY_MS);\n");
        out.push_str("    }\n");
        out.push_str("});\n");
    }
    out
}

/// Escape the characters cucumber expressions treat as syntax.
fn cucumber_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '(' | ')' | '{' | '}' | '/' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn role_call(target: &RoleTarget, name: &str) -> String {
    let exact = if target.exact { ", exact: true" } else { "" };
    format!(
        "getByRole({}, {{ name: {name}{exact} }}).nth({})",
        quote_literal(&target.role),
        target.nth.unwrap_or(0)
    )
}

fn binding(name: &Option<String>, fallback: &str) -> String {
    match name {
        Some(name) => name.clone(),
        None => quote_literal(fallback),
    }
}

/// Playwright call replaying one action on `page`.
fn replay(action: &Action) -> String {
    match action {
        Action::Goto { url } => format!("page.goto({})", quote_literal(url)),
        Action::ClickRole {
            target,
            locator_name,
        } => format!(
            "page.{}.click()",
            role_call(target, &binding(locator_name, &target.name))
        ),
        Action::ClickRoleInLocator {
            container,
            container_nth,
            target,
            container_name,
            locator_name,
        } => format!(
            "page.locator({}).nth({}).{}.click()",
            binding(container_name, container),
            container_nth.unwrap_or(0),
            role_call(target, &binding(locator_name, &target.name))
        ),
        Action::FillRole {
            target,
            value,
            locator_name,
        } => format!(
            "page.{}.fill({})",
            role_call(target, &binding(locator_name, &target.name)),
            quote_literal(value)
        ),
        Action::PressRole {
            target,
            key,
            locator_name,
        } => format!(
            "page.{}.press({})",
            role_call(target, &binding(locator_name, &target.name)),
            quote_literal(key)
        ),
        Action::ClickLocator {
            selector,
            nth,
            locator_name,
        } => format!(
            "page.locator({}).nth({}).click()",
            binding(locator_name, selector),
            nth.unwrap_or(0)
        ),
    }
}
