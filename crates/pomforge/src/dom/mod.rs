//! Element snapshots: the plain-data view of a page's candidate elements.
//!
//! Snapshots are produced in-page by [`scripts::SNAPSHOT_JS`] or from static
//! HTML by [`html::snapshot_html`]. Everything downstream (selector
//! synthesis, naming, POM output) works on snapshots only, never on a live
//! DOM handle.

pub mod html;
pub mod scripts;

use serde::{Deserialize, Serialize};

/// CSS selector list of elements considered by the analyzer.
pub const CANDIDATE_SELECTOR: &str = "button, a, input, textarea, select, [role], [data-testid]";

/// Attribute stamped on every snapshotted element so later scripts can find it.
pub const INDEX_ATTR: &str = "data-pomforge-idx";

/// One candidate element as seen at scan time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ElementSnapshot {
    /// Position in document order; matches the element's `data-pomforge-idx`.
    pub index: usize,
    /// Lowercase tag name.
    pub tag: String,
    /// Trimmed `textContent`.
    pub text: String,
    pub id: Option<String>,
    pub role: Option<String>,
    /// Raw `type` attribute.
    pub input_type: Option<String>,
    pub name: Option<String>,
    pub placeholder: Option<String>,
    pub aria_label: Option<String>,
    pub test_id: Option<String>,
    /// Trimmed text of the `<label for=id>` pointing at this element.
    pub label_text: Option<String>,
    /// Rendered box, has an offset parent, not inside head/script/style.
    pub visible: bool,
}

impl ElementSnapshot {
    /// Non-empty `id` attribute.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|s| !s.is_empty())
    }

    /// Descriptive text for reports: text content, else aria-label.
    pub fn display_text(&self) -> String {
        if !self.text.trim().is_empty() {
            return self.text.trim().to_string();
        }
        self.aria_label
            .as_deref()
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    }
}

/// Outline colours used when marking elements on a live page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutlineColor {
    /// Element produced by a scan or matched by a POM entry.
    Found,
    /// Scanned element no POM entry refers to.
    Unmapped,
    Missing,
}

impl OutlineColor {
    pub fn css(self) -> &'static str {
        match self {
            OutlineColor::Found => "lime",
            OutlineColor::Unmapped => "dodgerblue",
            OutlineColor::Missing => "red",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_deserializes_from_script_shape() {
        let raw = serde_json::json!({
            "index": 3,
            "tag": "input",
            "text": "",
            "id": "email",
            "role": null,
            "inputType": "email",
            "name": "email",
            "placeholder": "you@example.com",
            "ariaLabel": null,
            "testId": null,
            "labelText": "Email address",
            "visible": true
        });
        let snap: ElementSnapshot = serde_json::from_value(raw).unwrap();
        assert_eq!(snap.index, 3);
        assert_eq!(snap.input_type.as_deref(), Some("email"));
        assert_eq!(snap.label_text.as_deref(), Some("Email address"));
        assert!(snap.visible);
    }

    #[test]
    fn test_display_text_falls_back_to_aria_label() {
        let snap = ElementSnapshot {
            tag: "button".into(),
            aria_label: Some("  Close dialog ".into()),
            ..Default::default()
        };
        assert_eq!(snap.display_text(), "Close dialog");
        assert_eq!(snap.id(), None);
    }
}
