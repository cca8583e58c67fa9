//! JavaScript evaluated inside the page.
//!
//! Each builder embeds its arguments as JSON, so no caller-supplied string
//! is ever spliced into the script unquoted.

use super::OutlineColor;
use crate::locator::query::LocatorQuery;

/// Snapshot every candidate element and stamp it with its index.
pub const SNAPSHOT_JS: &str = r#"(() => {
  const nodes = document.querySelectorAll('button, a, input, textarea, select, [role], [data-testid]');
  const attr = (el, name) => el.getAttribute(name);
  const out = [];
  nodes.forEach((el, index) => {
    el.setAttribute('data-pomforge-idx', String(index));
    let labelText = null;
    if (el.id) {
      const label = document.querySelector('label[for="' + CSS.escape(el.id) + '"]');
      if (label) labelText = (label.textContent || '').trim();
    }
    out.push({
      index,
      tag: el.tagName.toLowerCase(),
      text: (el.textContent || '').trim(),
      id: el.id || null,
      role: attr(el, 'role'),
      inputType: attr(el, 'type'),
      name: attr(el, 'name'),
      placeholder: attr(el, 'placeholder'),
      ariaLabel: attr(el, 'aria-label'),
      testId: attr(el, 'data-testid'),
      labelText,
      visible: !!el.offsetParent && !el.closest('head, script, style')
        && el.offsetWidth > 0 && el.offsetHeight > 0,
    });
  });
  window.__pomforgeNextIdx = nodes.length;
  return out;
})()"#;

/// `true` once the first element matching `selector` has a visible box.
pub fn visible_probe(selector: &str) -> String {
    let sel = json(selector);
    format!(
        r#"(() => {{
  try {{
    const el = document.querySelector({sel});
    if (!el) return false;
    const r = el.getBoundingClientRect();
    const s = window.getComputedStyle(el);
    return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none';
  }} catch (e) {{
    return false;
  }}
}})()"#
    )
}

/// Set the value of the first element matching `selector` the way typing
/// would, firing `input` and `change`. `true` when the element exists.
pub fn fill(selector: &str, value: &str) -> String {
    let sel = json(selector);
    let val = json(value);
    format!(
        r#"(() => {{
  const el = document.querySelector({sel});
  if (!el) return false;
  el.focus();
  const proto = Object.getPrototypeOf(el);
  const setter = Object.getOwnPropertyDescriptor(proto, 'value');
  if (setter && setter.set) setter.set.call(el, {val}); else el.value = {val};
  el.dispatchEvent(new Event('input', {{ bubbles: true }}));
  el.dispatchEvent(new Event('change', {{ bubbles: true }}));
  return true;
}})()"#
    )
}

/// Click the first element matching `selector`. `true` when it exists.
pub fn click(selector: &str) -> String {
    let sel = json(selector);
    format!(
        r#"(() => {{
  const el = document.querySelector({sel});
  if (!el) return false;
  el.click();
  return true;
}})()"#
    )
}

/// Outline the elements stamped with the given indices.
pub fn outline(indices: &[usize], color: OutlineColor) -> String {
    let idx = json(indices);
    let css = json(color.css());
    format!(
        r#"(() => {{
  let n = 0;
  for (const i of {idx}) {{
    const el = document.querySelector('[data-pomforge-idx="' + i + '"]');
    if (!el) continue;
    el.style.outline = '2px solid ' + {css};
    el.style.outlineOffset = '1px';
    n++;
  }}
  return n;
}})()"#
    )
}

/// Pin a red panel listing locators that could not be found.
pub fn missing_panel(labels: &[String]) -> String {
    let items = json(labels);
    format!(
        r#"(() => {{
  const items = {items};
  if (!items.length) return 0;
  const panel = document.createElement('div');
  panel.setAttribute('data-pomforge-panel', 'missing');
  panel.style.cssText = 'position:fixed;top:8px;right:8px;z-index:2147483647;max-width:40vw;'
    + 'background:#fff;border:2px solid red;color:#900;font:12px monospace;padding:6px;';
  const title = document.createElement('strong');
  title.textContent = 'Missing locators (' + items.length + ')';
  panel.appendChild(title);
  for (const text of items) {{
    const row = document.createElement('div');
    row.textContent = text;
    panel.appendChild(row);
  }}
  document.body.appendChild(panel);
  return items.length;
}})()"#
    )
}

/// Resolve each query to the index of its first match, or `null`.
///
/// Matched elements that were not part of the last snapshot receive a fresh
/// index so they can be outlined like any other.
pub fn resolve(queries: &[LocatorQuery]) -> String {
    let qs = json(queries);
    format!(
        r#"(() => {{
  const queries = {qs};
  const norm = s => (s || '').replace(/\s+/g, ' ').trim();
  const roleOf = el => {{
    const explicit = el.getAttribute('role');
    if (explicit) return explicit;
    const tag = el.tagName.toLowerCase();
    if (tag === 'a' && el.hasAttribute('href')) return 'link';
    if (tag === 'button') return 'button';
    if (tag === 'select') return 'combobox';
    if (tag === 'textarea') return 'textbox';
    if (/^h[1-6]$/.test(tag)) return 'heading';
    if (tag === 'input') {{
      const type = (el.getAttribute('type') || 'text').toLowerCase();
      if (['button', 'submit', 'reset'].includes(type)) return 'button';
      if (type === 'checkbox' || type === 'radio') return type;
      return 'textbox';
    }}
    return '';
  }};
  const accName = el => norm(el.getAttribute('aria-label') || el.textContent || el.value);
  const labelOf = el => {{
    if (el.id) {{
      const label = document.querySelector('label[for="' + CSS.escape(el.id) + '"]');
      if (label) return norm(label.textContent);
    }}
    return norm(el.getAttribute('aria-label'));
  }};
  const all = Array.from(document.querySelectorAll('body *'));
  const innermost = hits => hits.find(el => !Array.from(el.children).some(c => hits.includes(c)));
  const find = q => {{
    try {{
      switch (q.kind) {{
        case 'role': return all.find(el => roleOf(el) === q.role && accName(el).includes(q.name));
        case 'label': return all.find(el => labelOf(el) === q.text);
        case 'placeholder': return all.find(el => norm(el.getAttribute('placeholder')) === q.text);
        case 'text': return innermost(all.filter(el => norm(el.textContent).includes(q.text)));
        default: return document.querySelector(q.selector);
      }}
    }} catch (e) {{
      return null;
    }}
  }};
  let next = window.__pomforgeNextIdx || 0;
  const out = queries.map(q => {{
    const el = find(q);
    if (!el) return null;
    if (!el.hasAttribute('data-pomforge-idx')) el.setAttribute('data-pomforge-idx', String(next++));
    return Number(el.getAttribute('data-pomforge-idx'));
  }});
  window.__pomforgeNextIdx = next;
  return out;
}})()"#
    )
}

fn json<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visible_probe_quotes_selector() {
        let js = visible_probe(r#"#root > *"#);
        assert!(js.contains(r##"document.querySelector("#root > *")"##));
        let hostile = visible_probe(r#"a"); alert(1); ("#);
        assert!(hostile.contains(r#""a\"); alert(1); (""#));
    }

    #[test]
    fn test_fill_and_click_quote_arguments() {
        let js = fill(r#"[data-testid="email-input"]"#, "o'neil\"@x.test");
        assert!(js.contains(r#"document.querySelector("[data-testid=\"email-input\"]")"#));
        assert!(js.contains(r#""o'neil\"@x.test""#));
        assert!(click("#go").contains(r##"document.querySelector("#go")"##));
    }

    #[test]
    fn test_outline_embeds_indices_and_color() {
        let js = outline(&[1, 4, 9], OutlineColor::Unmapped);
        assert!(js.contains("[1,4,9]"));
        assert!(js.contains("\"dodgerblue\""));
    }

    #[test]
    fn test_resolve_embeds_tagged_queries() {
        let js = resolve(&[
            LocatorQuery::Role {
                role: "button".into(),
                name: "Save".into(),
            },
            LocatorQuery::Css {
                selector: "#email".into(),
            },
        ]);
        assert!(js.contains(r#"{"kind":"role","role":"button","name":"Save"}"#));
        assert!(js.contains(r##"{"kind":"css","selector":"#email"}"##));
    }

    #[test]
    fn test_snapshot_script_stamps_index_attribute() {
        assert!(SNAPSHOT_JS.contains(super::super::INDEX_ATTR));
        assert!(SNAPSHOT_JS.contains(super::super::CANDIDATE_SELECTOR));
    }
}
