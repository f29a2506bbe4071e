//! DOCX document layer.
//!
//! Opens a `.docx` package into an editable tree, exposes the story
//! containers the generator walks (main body, headers, footers) and writes
//! the edited package back out.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use kikaku_docgen::document::{blocks, Block, Document};
//!
//! let mut doc = Document::open("templates/proposal.docx")?;
//! for block in blocks(doc.body_mut()?) {
//!     if let Block::Paragraph(paragraph) = block {
//!         println!("{}", paragraph.text());
//!     }
//! }
//! doc.save("output/proposal.docx")?;
//! # Ok::<(), kikaku_docgen::error::DocumentError>(())
//! ```

pub mod package;
pub mod wordml;
pub mod xml;

use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;

use crate::error::DocumentError;

pub use package::{EntryContent, Package, PackageEntry};
pub use wordml::{blocks, visit_paragraphs, Block, Cell, Paragraph, Row, Table};
pub use xml::{Element, Node, XmlTree};

/// Part holding the main document story
pub const MAIN_DOCUMENT_PART: &str = "word/document.xml";

/// Which story a container belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoryKind {
    Body,
    Header,
    Footer,
}

impl StoryKind {
    /// Classify a package entry name; `None` for parts the generator never edits
    pub fn for_part(name: &str) -> Option<Self> {
        if name == MAIN_DOCUMENT_PART {
            return Some(StoryKind::Body);
        }
        let file = name.strip_prefix("word/")?;
        if file.contains('/') || !file.ends_with(".xml") {
            return None;
        }
        if file.starts_with("header") {
            Some(StoryKind::Header)
        } else if file.starts_with("footer") {
            Some(StoryKind::Footer)
        } else {
            None
        }
    }
}

/// A story container: the body element, or the root of a header/footer part
pub struct Story<'a> {
    pub part: &'a str,
    pub kind: StoryKind,
    pub container: &'a mut Element,
}

/// An opened DOCX document
#[derive(Debug, Clone)]
pub struct Document {
    package: Package,
}

impl Document {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self, DocumentError> {
        Self::from_reader(Cursor::new(bytes.into()))
    }

    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self, DocumentError> {
        let package = Package::read(reader, |name| StoryKind::for_part(name).is_some())?;
        let mut document = Self { package };
        document.body_mut()?;
        Ok(document)
    }

    pub fn package(&self) -> &Package {
        &self.package
    }

    /// The `w:body` element of the main document part
    pub fn body_mut(&mut self) -> Result<&mut Element, DocumentError> {
        let tree = self
            .package
            .xml_part_mut(MAIN_DOCUMENT_PART)
            .ok_or_else(|| DocumentError::MissingPart(MAIN_DOCUMENT_PART.to_string()))?;
        tree.root_mut()
            .child_mut("body")
            .ok_or_else(|| DocumentError::MissingElement {
                part: MAIN_DOCUMENT_PART.to_string(),
                element: "w:body".to_string(),
            })
    }

    /// Every story container in package order: body, headers and footers
    pub fn stories_mut(&mut self) -> Vec<Story<'_>> {
        self.package
            .xml_parts_mut()
            .filter_map(|(part, tree)| {
                let kind = StoryKind::for_part(part)?;
                let container = match kind {
                    StoryKind::Body => tree.root_mut().child_mut("body")?,
                    StoryKind::Header | StoryKind::Footer => tree.root_mut(),
                };
                Some(Story {
                    part,
                    kind,
                    container,
                })
            })
            .collect()
    }

    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<W, DocumentError> {
        self.package.write_to(writer)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DocumentError> {
        let file = File::create(path)?;
        let mut writer = self.write_to(BufWriter::new(file))?;
        writer.flush()?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, DocumentError> {
        Ok(self.write_to(Cursor::new(Vec::new()))?.into_inner())
    }
}
