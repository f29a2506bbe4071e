//! Error handling for the proposal generator
//!
//! This module provides idiomatic Rust error types using thiserror for
//! the document layer and the generation pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading, walking or writing a DOCX package
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse part '{part}': {message}")]
    InvalidPart { part: String, message: String },

    #[error("Unbalanced markup: {message}")]
    Unbalanced { message: String },

    #[error("Package has no '{0}' part")]
    MissingPart(String),

    #[error("Part '{part}' has no <{element}> element")]
    MissingElement { part: String, element: String },
}

/// Main error type for template loading and document generation
#[derive(Error, Debug)]
pub enum DocgenError {
    #[error("DOCX template not found")]
    TemplateNotFound { path: PathBuf },

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to persist generated document: {0}")]
    Persist(#[from] tempfile::PersistError),
}

impl DocgenError {
    /// True when the caller should answer with a remediation hint
    pub fn is_template_missing(&self) -> bool {
        matches!(self, DocgenError::TemplateNotFound { .. })
    }
}

pub type Result<T, E = DocgenError> = std::result::Result<T, E>;
