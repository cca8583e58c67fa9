//! Action grammar for recorded scripts.
//!
//! ```text
//! statement := ['await'] 'page' call+ [';']
//! call      := '.' IDENT '(' [arg (',' arg)*] ')'
//! arg       := STRING | NUMBER | '{' [IDENT ':' arg (',' IDENT ':' arg)*] [','] '}' | IDENT
//!
//! goto        := goto(url)
//! role        := getByRole(role, { name, [exact] }) [index]
//! index       := nth(n) | first()
//! click-role  := role click()
//! fill-role   := role fill(value)
//! press-role  := role press(key)
//! in-locator  := locator(sel) [index] role click()
//! click-loc   := locator(sel) [index] click() | getByText(text) [index] click()
//! ```
//!
//! Lines that are not `page` statements are boilerplate and ignored. Every
//! `page` statement either becomes an [`Action`] or an [`UnsupportedLine`].

use super::lexer::{tokenize, Token};
use crate::locator::naming::{words_to_identifier, NameRegistry};
use crate::pom::LocatorEntry;
use anyhow::{bail, Result};
use serde::Serialize;
use std::collections::HashMap;

/// An element addressed by ARIA role and accessible name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleTarget {
    pub role: String,
    pub name: String,
    pub exact: bool,
    pub nth: Option<usize>,
}

/// One replayable step, in script order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Action {
    Goto {
        url: String,
    },
    ClickRole {
        target: RoleTarget,
        locator_name: Option<String>,
    },
    ClickRoleInLocator {
        container: String,
        container_nth: Option<usize>,
        target: RoleTarget,
        container_name: Option<String>,
        locator_name: Option<String>,
    },
    FillRole {
        target: RoleTarget,
        value: String,
        locator_name: Option<String>,
    },
    PressRole {
        target: RoleTarget,
        key: String,
        locator_name: Option<String>,
    },
    ClickLocator {
        selector: String,
        nth: Option<usize>,
        locator_name: Option<String>,
    },
}

/// A `page` statement the grammar does not cover.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnsupportedLine {
    /// 1-based line number.
    pub line_no: usize,
    pub text: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ParsedScript {
    pub actions: Vec<Action>,
    pub unsupported: Vec<UnsupportedLine>,
}

pub fn parse_script(source: &str) -> ParsedScript {
    let mut parsed = ParsedScript::default();

    for (idx, raw) in source.lines().enumerate() {
        let line = raw.trim();
        let unsupported = |reason: String| UnsupportedLine {
            line_no: idx + 1,
            text: line.to_string(),
            reason,
        };

        let tokens = match tokenize(line) {
            Ok(tokens) => tokens,
            Err(e) => {
                if looks_like_page_statement(line) {
                    parsed.unsupported.push(unsupported(e.to_string()));
                }
                continue;
            }
        };
        let Some(calls) = page_calls(&tokens) else {
            continue;
        };
        match calls.and_then(|calls| match_action(&calls)) {
            Ok(action) => parsed.actions.push(action),
            Err(e) => parsed.unsupported.push(unsupported(e.to_string())),
        }
    }

    parsed
}

fn looks_like_page_statement(line: &str) -> bool {
    let rest = line.strip_prefix("await").map(str::trim_start).unwrap_or(line);
    rest.starts_with("page.")
}

// ── Call chains ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Arg {
    Str(String),
    Num(f64),
    Object(Vec<(String, Arg)>),
    Ident(String),
}

#[derive(Debug, Clone)]
struct Call {
    name: String,
    args: Vec<Arg>,
}

/// `None` if the line is not a `page` statement at all.
fn page_calls(tokens: &[Token]) -> Option<Result<Vec<Call>>> {
    let mut pos = 0;
    if tokens.first() == Some(&Token::Ident("await".into())) {
        pos += 1;
    }
    if tokens.get(pos) != Some(&Token::Ident("page".into()))
        || tokens.get(pos + 1) != Some(&Token::Punct('.'))
    {
        return None;
    }
    pos += 1;
    Some(parse_chain(tokens, pos))
}

fn parse_chain(tokens: &[Token], mut pos: usize) -> Result<Vec<Call>> {
    let mut calls = Vec::new();
    while tokens.get(pos) == Some(&Token::Punct('.')) {
        pos += 1;
        let Some(Token::Ident(name)) = tokens.get(pos) else {
            bail!("expected method name after '.'");
        };
        pos += 1;
        expect(tokens, &mut pos, '(')?;
        let mut args = Vec::new();
        if tokens.get(pos) != Some(&Token::Punct(')')) {
            loop {
                args.push(parse_arg(tokens, &mut pos)?);
                if tokens.get(pos) == Some(&Token::Punct(',')) {
                    pos += 1;
                    continue;
                }
                break;
            }
        }
        expect(tokens, &mut pos, ')')?;
        calls.push(Call {
            name: name.clone(),
            args,
        });
    }
    if tokens.get(pos) == Some(&Token::Punct(';')) {
        pos += 1;
    }
    if pos != tokens.len() {
        bail!("unexpected trailing tokens");
    }
    Ok(calls)
}

fn parse_arg(tokens: &[Token], pos: &mut usize) -> Result<Arg> {
    match tokens.get(*pos) {
        Some(Token::Str(s)) => {
            *pos += 1;
            Ok(Arg::Str(s.clone()))
        }
        Some(Token::Number(n)) => {
            *pos += 1;
            Ok(Arg::Num(*n))
        }
        Some(Token::Ident(id)) => {
            *pos += 1;
            Ok(Arg::Ident(id.clone()))
        }
        Some(Token::Punct('{')) => {
            *pos += 1;
            let mut fields = Vec::new();
            while tokens.get(*pos) != Some(&Token::Punct('}')) {
                let key = match tokens.get(*pos) {
                    Some(Token::Ident(k)) | Some(Token::Str(k)) => k.clone(),
                    _ => bail!("expected object key"),
                };
                *pos += 1;
                expect(tokens, pos, ':')?;
                fields.push((key, parse_arg(tokens, pos)?));
                if tokens.get(*pos) == Some(&Token::Punct(',')) {
                    *pos += 1;
                }
            }
            *pos += 1;
            Ok(Arg::Object(fields))
        }
        _ => bail!("unsupported argument"),
    }
}

fn expect(tokens: &[Token], pos: &mut usize, punct: char) -> Result<()> {
    if tokens.get(*pos) == Some(&Token::Punct(punct)) {
        *pos += 1;
        Ok(())
    } else {
        bail!("expected '{punct}'")
    }
}

// ── Action matching ─────────────────────────────────────────────

struct Cursor<'a> {
    calls: &'a [Call],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, name: &str) -> Option<&'a Call> {
        let call = self.calls.get(self.pos).filter(|c| c.name == name)?;
        self.pos += 1;
        Some(call)
    }

    /// Optional `.nth(n)` or `.first()`.
    fn index(&mut self) -> Result<Option<usize>> {
        if self.take("first").is_some() {
            return Ok(Some(0));
        }
        match self.take("nth") {
            Some(call) => match call.args.first() {
                Some(Arg::Num(n)) if *n >= 0.0 && n.fract() == 0.0 => Ok(Some(*n as usize)),
                _ => bail!("nth() needs a non-negative integer"),
            },
            None => Ok(None),
        }
    }

    fn peek(&self) -> Option<&'a str> {
        self.calls.get(self.pos).map(|c| c.name.as_str())
    }

    fn done(&self) -> bool {
        self.pos == self.calls.len()
    }
}

fn match_action(calls: &[Call]) -> Result<Action> {
    let mut cur = Cursor { calls, pos: 0 };

    if let Some(goto) = cur.take("goto") {
        let url = str_arg(goto, 0)?;
        finish(&cur, calls)?;
        return Ok(Action::Goto { url });
    }

    if let Some(role_call) = cur.take("getByRole") {
        let target = role_target(role_call, &mut cur)?;
        let action = match cur.peek() {
            Some("click") => {
                cur.take("click");
                Action::ClickRole {
                    target,
                    locator_name: None,
                }
            }
            Some("fill") => {
                let value = cur.take("fill").map(|c| str_arg(c, 0)).transpose()?.unwrap_or_default();
                Action::FillRole {
                    target,
                    value,
                    locator_name: None,
                }
            }
            Some("press") => {
                let key = cur.take("press").map(|c| str_arg(c, 0)).transpose()?.unwrap_or_default();
                Action::PressRole {
                    target,
                    key,
                    locator_name: None,
                }
            }
            _ => bail!("unsupported call chain: {}", describe(calls)),
        };
        finish(&cur, calls)?;
        return Ok(action);
    }

    if let Some(locator) = cur.take("locator") {
        let selector = str_arg(locator, 0)?;
        let nth = cur.index()?;
        if let Some(role_call) = cur.take("getByRole") {
            let target = role_target(role_call, &mut cur)?;
            if cur.take("click").is_none() {
                bail!("unsupported call chain: {}", describe(calls));
            }
            finish(&cur, calls)?;
            return Ok(Action::ClickRoleInLocator {
                container: selector,
                container_nth: nth,
                target,
                container_name: None,
                locator_name: None,
            });
        }
        if cur.take("click").is_none() {
            bail!("unsupported call chain: {}", describe(calls));
        }
        finish(&cur, calls)?;
        return Ok(Action::ClickLocator {
            selector,
            nth,
            locator_name: None,
        });
    }

    if let Some(text_call) = cur.take("getByText") {
        let text = str_arg(text_call, 0)?;
        let nth = cur.index()?;
        if cur.take("click").is_none() {
            bail!("unsupported call chain: {}", describe(calls));
        }
        finish(&cur, calls)?;
        return Ok(Action::ClickLocator {
            selector: format!("text={text}"),
            nth,
            locator_name: None,
        });
    }

    bail!("unsupported call chain: {}", describe(calls))
}

fn role_target(call: &Call, cur: &mut Cursor) -> Result<RoleTarget> {
    let role = str_arg(call, 0)?;
    let Some(Arg::Object(options)) = call.args.get(1) else {
        bail!("getByRole('{role}') without a name is not supported");
    };
    let mut name = None;
    let mut exact = false;
    for (key, value) in options {
        match (key.as_str(), value) {
            ("name", Arg::Str(s)) => name = Some(s.clone()),
            ("exact", Arg::Ident(v)) => exact = v == "true",
            _ => {}
        }
    }
    let Some(name) = name else {
        bail!("getByRole('{role}') without a name is not supported");
    };
    Ok(RoleTarget {
        role,
        name,
        exact,
        nth: cur.index()?,
    })
}

fn str_arg(call: &Call, idx: usize) -> Result<String> {
    match call.args.get(idx) {
        Some(Arg::Str(s)) => Ok(s.clone()),
        _ => bail!("{}() expects a string argument", call.name),
    }
}

fn finish(cur: &Cursor, calls: &[Call]) -> Result<()> {
    if cur.done() {
        Ok(())
    } else {
        bail!("unsupported call chain: {}", describe(calls))
    }
}

fn describe(calls: &[Call]) -> String {
    let chain: Vec<String> = calls.iter().map(|c| format!("{}()", c.name)).collect();
    format!("page.{}", chain.join("."))
}

// ── Locator names ───────────────────────────────────────────────

/// Assign locator names to every targeted action.
///
/// The same literal under the same suffix always gets the same name; a
/// different literal whose name collides gets a numeric suffix. Returns the
/// bindings in first-use order.
pub fn assign_locator_names(actions: &mut [Action]) -> Vec<LocatorEntry> {
    let mut table = NameTable::default();

    for action in actions.iter_mut() {
        match action {
            Action::Goto { .. } => {}
            Action::ClickRole {
                target,
                locator_name,
            } => {
                let words = format!("{} {}", target.name, target.role);
                *locator_name = Some(table.name_for(&words, "Element", &target.name));
            }
            Action::ClickRoleInLocator {
                container,
                target,
                container_name,
                locator_name,
                ..
            } => {
                *container_name = Some(table.name_for(container, "Container", container));
                let words = format!("{} {}", target.name, target.role);
                *locator_name = Some(table.name_for(&words, "Element", &target.name));
            }
            Action::FillRole {
                target,
                locator_name,
                ..
            }
            | Action::PressRole {
                target,
                locator_name,
                ..
            } => {
                *locator_name = Some(table.name_for(&target.name, "Input", &target.name));
            }
            Action::ClickLocator {
                selector,
                locator_name,
                ..
            } => {
                let words = selector.strip_prefix("text=").unwrap_or(selector);
                *locator_name = Some(table.name_for(words, "Locator", selector));
            }
        }
    }

    table.entries
}

#[derive(Default)]
struct NameTable {
    registry: NameRegistry,
    by_literal: HashMap<(String, String), String>,
    entries: Vec<LocatorEntry>,
}

impl NameTable {
    fn name_for(&mut self, words: &str, suffix: &'static str, literal: &str) -> String {
        let base = format!("{}{suffix}", words_to_identifier(words));
        let key = (base, literal.to_string());
        if let Some(name) = self.by_literal.get(&key) {
            return name.clone();
        }
        let name = self.registry.claim(&key.0);
        self.by_literal.insert(key, name.clone());
        self.entries.push(LocatorEntry {
            name: name.clone(),
            value: literal.to_string(),
        });
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(line: &str) -> Action {
        let parsed = parse_script(line);
        assert!(parsed.unsupported.is_empty(), "{:?}", parsed.unsupported);
        assert_eq!(parsed.actions.len(), 1);
        parsed.actions[0].clone()
    }

    fn role(role: &str, name: &str, nth: Option<usize>) -> RoleTarget {
        RoleTarget {
            role: role.into(),
            name: name.into(),
            exact: false,
            nth,
        }
    }

    #[test]
    fn test_goto() {
        assert_eq!(
            single("  await page.goto('https://shop.test/');"),
            Action::Goto {
                url: "https://shop.test/".into()
            }
        );
    }

    #[test]
    fn test_role_actions() {
        assert_eq!(
            single("await page.getByRole('button', { name: 'Login' }).click();"),
            Action::ClickRole {
                target: role("button", "Login", None),
                locator_name: None
            }
        );
        assert_eq!(
            single("await page.getByRole('textbox', { name: 'Email' }).fill('me@x.test');"),
            Action::FillRole {
                target: role("textbox", "Email", None),
                value: "me@x.test".into(),
                locator_name: None
            }
        );
        assert_eq!(
            single("await page.getByRole('textbox', { name: 'Search' }).first().press('Enter');"),
            Action::PressRole {
                target: role("textbox", "Search", Some(0)),
                key: "Enter".into(),
                locator_name: None
            }
        );
    }

    #[test]
    fn test_exact_and_nth() {
        match single("await page.getByRole('link', { name: 'Vehículos', exact: true }).nth(3).click();") {
            Action::ClickRole { target, .. } => {
                assert!(target.exact);
                assert_eq!(target.nth, Some(3));
                assert_eq!(target.name, "Vehículos");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_locator_forms() {
        assert_eq!(
            single("await page.locator('#cart').nth(1).getByRole('button', { name: 'Remove' }).click();"),
            Action::ClickRoleInLocator {
                container: "#cart".into(),
                container_nth: Some(1),
                target: role("button", "Remove", None),
                container_name: None,
                locator_name: None
            }
        );
        assert_eq!(
            single("await page.locator('.promo a').click();"),
            Action::ClickLocator {
                selector: ".promo a".into(),
                nth: None,
                locator_name: None
            }
        );
        assert_eq!(
            single("await page.getByText('Ver más').click();"),
            Action::ClickLocator {
                selector: "text=Ver más".into(),
                nth: None,
                locator_name: None
            }
        );
    }

    #[test]
    fn test_boilerplate_ignored_and_unsupported_reported() {
        let script = "const { chromium } = require('playwright');\n\
                      const page1Promise = page.waitForEvent('popup');\n\
                      await page.close();\n\
                      await page.getByRole('button').click();\n\
                      await page.goto('https://x.test\n\
                      await context.close();\n";
        let parsed = parse_script(script);
        assert!(parsed.actions.is_empty());
        let lines: Vec<usize> = parsed.unsupported.iter().map(|u| u.line_no).collect();
        assert_eq!(lines, vec![3, 4, 5]);
        assert!(parsed.unsupported[0].reason.contains("page.close()"));
        assert!(parsed.unsupported[1].reason.contains("without a name"));
    }

    #[test]
    fn test_names_reuse_and_disambiguate() {
        let mut actions = parse_script(
            "await page.getByRole('button', { name: 'Login' }).click();\n\
             await page.getByRole('button', { name: 'Login' }).nth(1).click();\n\
             await page.getByRole('textbox', { name: 'User' }).fill('a');\n\
             await page.getByRole('textbox', { name: 'User' }).press('Tab');\n\
             await page.getByRole('textbox', { name: 'user!' }).fill('b');\n\
             await page.locator('form#login').getByRole('button', { name: 'Go' }).click();\n\
             await page.getByText('Forgot?').click();",
        )
        .actions;
        let entries = assign_locator_names(&mut actions);
        let names: Vec<(&str, &str)> = entries
            .iter()
            .map(|e| (e.name.as_str(), e.value.as_str()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("loginButtonElement", "Login"),
                ("userInput", "User"),
                ("userInput1", "user!"),
                ("formLoginContainer", "form#login"),
                ("goButtonElement", "Go"),
                ("forgotLocator", "text=Forgot?"),
            ]
        );
        match &actions[1] {
            Action::ClickRole { locator_name, .. } => {
                assert_eq!(locator_name.as_deref(), Some("loginButtonElement"))
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
