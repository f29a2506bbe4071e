//! Template preview text.

use std::path::Path;

use crate::document::{blocks, Block, Document};
use crate::error::Result;
use crate::tokens::document_token_keys;

/// Visible text of a template plus the token keys it uses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplatePreview {
    pub text: String,
    pub tokens: Vec<String>,
}

/// Body paragraphs, one per line, then one tab-joined line per table row
pub fn document_text(document: &mut Document) -> Result<String> {
    let mut paragraphs = Vec::new();
    let mut rows = Vec::new();

    for block in blocks(document.body_mut()?) {
        match block {
            Block::Paragraph(paragraph) => paragraphs.push(paragraph.text()),
            Block::Table(mut table) => {
                for mut row in table.rows() {
                    rows.push(row.text());
                }
            }
        }
    }

    paragraphs.extend(rows);
    Ok(paragraphs.join("\n"))
}

pub fn extract_doc_text(path: impl AsRef<Path>) -> Result<String> {
    let mut document = Document::open(path)?;
    document_text(&mut document)
}

pub fn template_preview(path: impl AsRef<Path>) -> Result<TemplatePreview> {
    let mut document = Document::open(path)?;
    Ok(TemplatePreview {
        text: document_text(&mut document)?,
        tokens: document_token_keys(&mut document),
    })
}
