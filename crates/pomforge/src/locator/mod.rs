//! Locator synthesis: selector heuristics, identifier naming and parsing
//! locator literals back into resolvable queries.

pub mod naming;
pub mod query;
pub mod selector;

use serde::{Deserialize, Serialize};

/// One distinct interactive element found on a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzedElement {
    pub tag: String,
    pub text: String,
    /// Locator expression that identifies the element.
    pub selector: String,
}

/// Backslash, quotes and control characters escaped for a JS string literal.
pub fn escape_js(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        push_escaped(&mut out, c, true);
    }
    out
}

/// Append `c` to a JS string literal body. Double quotes are escaped only
/// when `double_quotes` is set.
pub(crate) fn push_escaped(out: &mut String, c: char, double_quotes: bool) {
    match c {
        '\\' => out.push_str("\\\\"),
        '\'' => out.push_str("\\'"),
        '"' if double_quotes => out.push_str("\\\""),
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '\t' => out.push_str("\\t"),
        c if c.is_ascii_control() => out.push_str(&format!("\\u{{{:04x}}}", c as u32)),
        c => out.push(c),
    }
}

/// Decode the character after a backslash. Unknown escapes keep the
/// escaped character; `None` means the input ended.
pub(crate) fn unescape_next(chars: &mut std::str::Chars<'_>) -> Option<char> {
    let c = match chars.next()? {
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        'u' => {
            let rest = chars.as_str();
            let decoded = rest
                .strip_prefix('{')
                .and_then(|r| r.split_once('}'))
                .and_then(|(hex, _)| u32::from_str_radix(hex, 16).ok().map(|v| (hex.len(), v)))
                .and_then(|(len, v)| char::from_u32(v).map(|ch| (len, ch)));
            match decoded {
                Some((len, ch)) => {
                    // `{` + hex digits + `}`
                    for _ in 0..len + 2 {
                        chars.next();
                    }
                    ch
                }
                None => 'u',
            }
        }
        other => other,
    };
    Some(c)
}

/// Reverse of [`escape_js`].
pub fn unescape_js(escaped: &str) -> String {
    let mut out = String::with_capacity(escaped.len());
    let mut chars = escaped.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            out.push(unescape_next(&mut chars).unwrap_or('\\'));
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_js() {
        assert_eq!(escape_js(r#"It's "fine" \o/"#), r#"It\'s \"fine\" \\o/"#);
        assert_eq!(escape_js("plain"), "plain");
    }

    #[test]
    fn test_escape_js_control_characters() {
        let escaped = escape_js("Log\rin\tnow\u{1b}");
        assert_eq!(escaped, "Log\\rin\\tnow\\u{001b}");
        assert!(!escaped.chars().any(|c| c.is_control()));
        assert_eq!(unescape_js(&escaped), "Log\rin\tnow\u{1b}");
    }

    #[test]
    fn test_unescape_reverses_escape() {
        let raw = r#"a\b'c"d"#;
        assert_eq!(unescape_js(&escape_js(raw)), raw);
        assert_eq!(unescape_js("trailing\\"), "trailing\\");
    }
}
