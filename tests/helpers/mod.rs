//! DOCX fixtures for integration tests.
//!
//! Builds minimal but well-formed WordprocessingML packages in memory so the
//! tests never depend on a binary template checked into the repository.

#![allow(dead_code)]

use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

use kikaku_docgen::document::{visit_paragraphs, Document, StoryKind};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

pub const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/header1.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.header+xml"/><Override PartName="/word/footer1.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.footer+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/></Types>"#;

pub const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

/// Not a story part: must come back byte-for-byte, tokens included
pub const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:style w:type="paragraph" w:styleId="Normal"><w:name w:val="{{title}}"/></w:style></w:styles>"#;

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// One run per fragment; the first run is bold so formatting survival is visible
pub fn paragraph(runs: &[&str]) -> String {
    let mut xml = String::from("<w:p><w:pPr><w:jc w:val=\"left\"/></w:pPr>");
    for (index, run) in runs.iter().enumerate() {
        xml.push_str("<w:r>");
        if index == 0 {
            xml.push_str("<w:rPr><w:b/></w:rPr>");
        }
        xml.push_str(&format!(
            "<w:t xml:space=\"preserve\">{}</w:t></w:r>",
            escape(run)
        ));
    }
    xml.push_str("</w:p>");
    xml
}

/// Table whose cells each hold the given block markup
pub fn table(rows: &[Vec<String>]) -> String {
    let mut xml = String::from("<w:tbl><w:tblPr/>");
    for row in rows {
        xml.push_str("<w:tr>");
        for cell in row {
            xml.push_str(&format!("<w:tc><w:tcPr/>{}</w:tc>", cell));
        }
        xml.push_str("</w:tr>");
    }
    xml.push_str("</w:tbl>");
    xml
}

#[derive(Debug, Clone, Default)]
pub struct DocxFixture {
    pub body: String,
    pub header: Option<String>,
    pub footer: Option<String>,
}

impl DocxFixture {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            ..Self::default()
        }
    }

    pub fn with_header(mut self, blocks: impl Into<String>) -> Self {
        self.header = Some(blocks.into());
        self
    }

    pub fn with_footer(mut self, blocks: impl Into<String>) -> Self {
        self.footer = Some(blocks.into());
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();

        let mut add = |name: &str, content: &str| {
            zip.start_file(name, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        };

        add("[Content_Types].xml", CONTENT_TYPES_XML);
        add("_rels/.rels", ROOT_RELS_XML);
        add(
            "word/document.xml",
            &format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="{}"><w:body>{}<w:sectPr/></w:body></w:document>"#,
                W_NS, self.body
            ),
        );
        if let Some(header) = &self.header {
            add(
                "word/header1.xml",
                &format!(r#"<w:hdr xmlns:w="{}">{}</w:hdr>"#, W_NS, header),
            );
        }
        if let Some(footer) = &self.footer {
            add(
                "word/footer1.xml",
                &format!(r#"<w:ftr xmlns:w="{}">{}</w:ftr>"#, W_NS, footer),
            );
        }
        add("word/styles.xml", STYLES_XML);

        zip.finish().unwrap().into_inner()
    }

    pub fn write_to(&self, path: &Path) -> PathBuf {
        std::fs::write(path, self.build()).unwrap();
        path.to_path_buf()
    }
}

/// The proposal layout the tests exercise: split tokens, defaults, a table
/// with a nested table, a header and a footer
pub fn proposal_fixture() -> DocxFixture {
    let body = [
        paragraph(&["事業名：", "{{tit", "le}}"]),
        paragraph(&["実施クラブ：{{ club || 京都衣笠クラブ }}"]),
        paragraph(&["日時：{{datetime}}"]),
        paragraph(&["この行は置換しない"]),
        table(&[
            vec![paragraph(&["活動場所"]), paragraph(&["{{ place }}"])],
            vec![
                paragraph(&["予算"]),
                table(&[vec![paragraph(&["総額 {{budget_total||0}} 円"])]]),
            ],
        ]),
    ]
    .concat();

    DocxFixture::new(body)
        .with_header(paragraph(&["{{title}} 企画書"]))
        .with_footer(paragraph(&["担当: {{ dept || 未定 }}"]))
}

pub fn write_proposal_template(dir: &Path) -> PathBuf {
    proposal_fixture().write_to(&dir.join("template.docx"))
}

/// Raw bytes of one package entry
pub fn part_bytes(docx: &[u8], name: &str) -> Vec<u8> {
    let mut archive = ZipArchive::new(Cursor::new(docx)).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).unwrap();
    bytes
}

pub fn part_text(docx: &[u8], name: &str) -> String {
    String::from_utf8(part_bytes(docx, name)).unwrap()
}

/// Paragraph texts of every story of the given kind, in order
pub fn story_paragraphs(document: &mut Document, kind: StoryKind) -> Vec<String> {
    let mut texts = Vec::new();
    for story in document.stories_mut() {
        if story.kind == kind {
            visit_paragraphs(story.container, &mut |p| texts.push(p.text()));
        }
    }
    texts
}
