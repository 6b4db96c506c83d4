use serde::{Deserialize, Serialize};

/// Row of the `content_blocks` table.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct ContentBlock {
    /// Stable identifier chosen by the page author, e.g. `home.hero.title.primary`.
    pub key: String,
    /// Sanitized rich-text fragment (or an image URL for `image:` keys).
    pub html: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// `value` column of `section_styles`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct SectionStyleValue {
    #[serde(
        rename = "backgroundColor",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub background_color: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl SectionStyleValue {
    pub fn is_empty(&self) -> bool {
        self.background_color.is_none() && self.color.is_none()
    }

    /// Inline CSS for the section wrapper. Values that would break out of a
    /// declaration are skipped.
    pub fn to_css(&self) -> String {
        let mut decls = Vec::new();
        if let Some(bg) = self.background_color.as_deref() {
            if crate::html::is_safe_style_value(bg) {
                decls.push(format!("background-color: {bg}"));
            }
        }
        if let Some(c) = self.color.as_deref() {
            if crate::html::is_safe_style_value(c) {
                decls.push(format!("color: {c}"));
            }
        }
        decls.join("; ")
    }
}

/// Row of the `section_styles` table.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct SectionStyleRecord {
    pub id: String,
    #[serde(default)]
    pub value: SectionStyleValue,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Signed-in editor session, persisted in localStorage.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Session {
    pub email: String,
    pub access_token: String,
    pub expires_at_ms: i64,
}

impl Session {
    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_style_value_uses_camel_case_keys() {
        let v = SectionStyleValue {
            background_color: Some("#102030".to_string()),
            color: None,
        };
        let json = serde_json::to_value(&v).expect("serialize");
        assert_eq!(json, serde_json::json!({ "backgroundColor": "#102030" }));

        let back: SectionStyleValue =
            serde_json::from_str(r##"{"color":"#fff"}"##).expect("deserialize");
        assert_eq!(back.color.as_deref(), Some("#fff"));
        assert!(back.background_color.is_none());
    }

    #[test]
    fn section_style_css_skips_unsafe_values() {
        let v = SectionStyleValue {
            background_color: Some("#000; position: fixed".to_string()),
            color: Some("#ffffff".to_string()),
        };
        assert_eq!(v.to_css(), "color: #ffffff");
        assert_eq!(SectionStyleValue::default().to_css(), "");
    }

    #[test]
    fn section_style_record_tolerates_missing_value() {
        let rec: SectionStyleRecord =
            serde_json::from_str(r#"{"id":"home.hero","updated_at":null}"#).expect("deserialize");
        assert!(rec.value.is_empty());
    }

    #[test]
    fn content_block_row_contract_deserialize() {
        let json = r#"[{"key":"home.hero.title.primary","html":"Hello","updated_at":"2026-01-02T03:04:05+00:00"}]"#;
        let rows: Vec<ContentBlock> = serde_json::from_str(json).expect("rows should parse");
        assert_eq!(rows[0].key, "home.hero.title.primary");
        assert_eq!(rows[0].updated_at.as_deref(), Some("2026-01-02T03:04:05+00:00"));
    }

    #[test]
    fn session_expiry() {
        let s = Session {
            email: "editor@example.org".to_string(),
            access_token: "t".to_string(),
            expires_at_ms: 1_000,
        };
        assert!(!s.is_expired(999));
        assert!(s.is_expired(1_000));
    }
}
