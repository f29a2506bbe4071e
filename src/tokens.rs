//! Token substitution engine
//!
//! Replaces `{{ key }}` and `{{ key || default }}` placeholders in every
//! paragraph of a document: the body, tables at any depth, headers and
//! footers. Matching runs on the logical paragraph text (all runs joined), so
//! a token split across runs by the authoring tool still resolves. A rewritten
//! paragraph is collapsed into its first run.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;

use crate::document::{blocks, visit_paragraphs, Block, Document, Element, Paragraph, Table};

/// `{{ key }}` or `{{ key || default }}`
static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([a-zA-Z0-9_]+)\s*(?:\|\|\s*(.+?))?\s*\}\}").unwrap()
});

// ============================================================================
// MAPPING
// ============================================================================

/// Key -> replacement text for one generation request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenMapping {
    values: HashMap<String, String>,
}

impl TokenMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON object; anything else yields an empty mapping
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Object(object) => object
                .iter()
                .filter_map(|(key, value)| value_to_text(value).map(|text| (key.clone(), text)))
                .collect(),
            _ => Self::default(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Value to substitute for `key`; empty values count as absent
    pub fn resolve(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|value| !value.is_empty())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for TokenMapping
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Locale-independent text for a JSON value; `null` means "absent"
pub fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

// ============================================================================
// TEXT
// ============================================================================

/// A token occurrence found in text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRef {
    pub key: String,
    pub default: Option<String>,
}

/// All token occurrences in `text`, left to right
pub fn find_tokens(text: &str) -> Vec<TokenRef> {
    TOKEN_RE
        .captures_iter(text)
        .map(|caps| TokenRef {
            key: caps[1].to_string(),
            default: caps.get(2).map(|m| m.as_str().to_string()),
        })
        .collect()
}

/// Substitute every token in `text`. Replacement values are not rescanned.
pub fn render_text_with_tokens<'t>(text: &'t str, mapping: &TokenMapping) -> Cow<'t, str> {
    TOKEN_RE.replace_all(text, |caps: &Captures| {
        let default = caps.get(2).map_or("", |m| m.as_str());
        mapping.resolve(&caps[1]).unwrap_or(default).to_string()
    })
}

// ============================================================================
// DOCUMENT
// ============================================================================

/// Counts from one substitution pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubstitutionReport {
    pub stories: usize,
    pub paragraphs_rewritten: usize,
}

/// Rewrite one paragraph; returns whether its text changed
pub fn replace_in_paragraph(paragraph: &mut Paragraph<'_>, mapping: &TokenMapping) -> bool {
    let text = paragraph.text();
    let rendered = render_text_with_tokens(&text, mapping);
    if rendered == text.as_str() {
        return false;
    }
    let rendered = rendered.into_owned();
    paragraph.replace_runs_with_text(&rendered);
    true
}

/// Rewrite every cell paragraph of a table, nested tables included
pub fn replace_in_table(table: &mut Table<'_>, mapping: &TokenMapping) -> usize {
    let mut rewritten = 0;
    for mut row in table.rows() {
        for mut cell in row.cells() {
            rewritten += replace_in_container(cell.container(), mapping);
        }
    }
    rewritten
}

/// Rewrite the paragraphs and tables of a story container
pub fn replace_in_container(container: &mut Element, mapping: &TokenMapping) -> usize {
    let mut rewritten = 0;
    for block in blocks(container) {
        match block {
            Block::Paragraph(mut paragraph) => {
                if replace_in_paragraph(&mut paragraph, mapping) {
                    rewritten += 1;
                }
            }
            Block::Table(mut table) => rewritten += replace_in_table(&mut table, mapping),
        }
    }
    rewritten
}

/// Substitute tokens across the body, headers and footers, in place
pub fn replace_doc_tokens(document: &mut Document, mapping: &TokenMapping) -> SubstitutionReport {
    let mut report = SubstitutionReport::default();
    for story in document.stories_mut() {
        let rewritten = replace_in_container(story.container, mapping);
        tracing::debug!(
            part = story.part,
            kind = ?story.kind,
            rewritten,
            "substituted tokens"
        );
        report.stories += 1;
        report.paragraphs_rewritten += rewritten;
    }
    report
}

/// Distinct token keys used anywhere in the document, in first-seen order
pub fn document_token_keys(document: &mut Document) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for story in document.stories_mut() {
        visit_paragraphs(story.container, &mut |paragraph| {
            for token in find_tokens(&paragraph.text()) {
                if !keys.contains(&token.key) {
                    keys.push(token.key);
                }
            }
        });
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mapping(pairs: &[(&str, &str)]) -> TokenMapping {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_plain_and_spaced_tokens() {
        let m = mapping(&[("title", "清掃活動"), ("club", "京都衣笠クラブ")]);
        assert_eq!(
            render_text_with_tokens("事業名: {{title}} / {{  club  }}", &m),
            "事業名: 清掃活動 / 京都衣笠クラブ"
        );
    }

    #[test]
    fn test_default_applies_when_absent_or_empty() {
        let m = mapping(&[("place", "")]);
        assert_eq!(
            render_text_with_tokens("{{ place || 未定 }}|{{ owner || 担当者 A }}|{{ kpi }}", &m),
            "未定|担当者 A|"
        );
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let m = mapping(&[("a", "{{b}}"), ("b", "nope")]);
        assert_eq!(render_text_with_tokens("{{a}}", &m), "{{b}}");
    }

    #[test]
    fn test_repeated_token_substituted_everywhere() {
        let m = mapping(&[("x", "1")]);
        assert_eq!(render_text_with_tokens("{{x}}-{{x}}-{{ x }}", &m), "1-1-1");
    }

    #[test]
    fn test_text_without_tokens_is_borrowed() {
        let m = mapping(&[("x", "1")]);
        let out = render_text_with_tokens("{ x } {{ bad-key }} {{x||}}", &m);
        assert!(matches!(out, Cow::Borrowed(_)));
    }

    #[test]
    fn test_default_may_contain_symbols() {
        let m = TokenMapping::new();
        assert_eq!(
            render_text_with_tokens("{{ budget || ¥1,000 (税込) | 予定 }}", &m),
            "¥1,000 (税込) | 予定"
        );
    }

    #[test]
    fn test_find_tokens() {
        let tokens = find_tokens("{{a}} and {{ b || x y }}");
        assert_eq!(
            tokens,
            vec![
                TokenRef {
                    key: "a".into(),
                    default: None
                },
                TokenRef {
                    key: "b".into(),
                    default: Some("x y".into())
                },
            ]
        );
    }

    #[test]
    fn test_mapping_from_json_converts_scalars() {
        let m = TokenMapping::from_json(&json!({
            "title": "t",
            "expected_ivusa": 25,
            "budget_total": 1500.5,
            "is_new": true,
            "owner": null,
            "tags": ["a", "b"]
        }));
        assert_eq!(m.get("title"), Some("t"));
        assert_eq!(m.get("expected_ivusa"), Some("25"));
        assert_eq!(m.get("budget_total"), Some("1500.5"));
        assert_eq!(m.get("is_new"), Some("true"));
        assert_eq!(m.get("owner"), None);
        assert_eq!(m.get("tags"), Some(r#"["a","b"]"#));
    }

    #[test]
    fn test_mapping_from_non_object_is_empty() {
        assert!(TokenMapping::from_json(&json!([1, 2])).is_empty());
        assert!(TokenMapping::from_json(&Value::Null).is_empty());
    }

    #[test]
    fn test_split_token_in_paragraph() {
        let mut tree = crate::document::XmlTree::parse(
            r#"<w:p xmlns:w="urn:w"><w:r><w:rPr><w:b/></w:rPr><w:t>名称: {{tit</w:t></w:r><w:r><w:t>le}}</w:t></w:r></w:p>"#
                .as_bytes(),
        )
        .unwrap();
        let mut paragraph = Paragraph::new(tree.root_mut());
        assert!(replace_in_paragraph(&mut paragraph, &mapping(&[("title", "夏祭り")])));
        assert_eq!(paragraph.run_texts(), vec!["名称: 夏祭り".to_string()]);
    }

    #[test]
    fn test_unchanged_paragraph_keeps_runs() {
        let mut tree = crate::document::XmlTree::parse(
            r#"<w:p xmlns:w="urn:w"><w:r><w:t>no </w:t></w:r><w:r><w:t>tokens</w:t></w:r></w:p>"#
                .as_bytes(),
        )
        .unwrap();
        let mut paragraph = Paragraph::new(tree.root_mut());
        assert!(!replace_in_paragraph(&mut paragraph, &TokenMapping::new()));
        assert_eq!(paragraph.run_count(), 2);
    }
}
