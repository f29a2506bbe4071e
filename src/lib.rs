//! kikaku-docgen - proposal document generator
//!
//! Fills a fixed DOCX proposal template (企画書) with form values and serves
//! the generated file for download.
//!
//! ## Architecture
//! Every generation request follows the same chain:
//! Payload -> TokenMapping -> Document::open(template) -> replace_doc_tokens -> save
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kikaku_docgen::{AppConfig, DocumentGenerator};
//!
//! let config = AppConfig::new("templates/proposal.docx", "output");
//! let generator = DocumentGenerator::new(config);
//! let payload = serde_json::json!({ "title": "河川清掃", "year": "2025", "month": "9",
//!     "day": "22", "timeStart": "15:00", "timeEnd": "19:00" });
//! let generated = generator.generate(&payload)?;
//! println!("{}", generated.download_url);
//! # Ok::<(), kikaku_docgen::DocgenError>(())
//! ```

// Core error handling
pub mod error;

// Process configuration
pub mod config;

// DOCX package, XML tree and WordprocessingML views
pub mod document;

// Token substitution engine
pub mod tokens;

// Japanese date formatting
pub mod datetime;

// Payload -> document pipeline
pub mod generate;

// Template preview
pub mod extract;

// HTTP endpoints (when the server feature is enabled)
pub mod api;

pub use config::AppConfig;
pub use datetime::{format_jp_date, try_format_jp_date, DateFormatError};
pub use document::{Document, StoryKind};
pub use error::{DocgenError, DocumentError};
pub use extract::{extract_doc_text, template_preview, TemplatePreview};
pub use generate::{build_mapping, output_filename, DocumentGenerator, GeneratedDocument};
pub use tokens::{
    find_tokens, render_text_with_tokens, replace_doc_tokens, SubstitutionReport, TokenMapping,
    TokenRef,
};

#[cfg(feature = "server")]
pub use api::create_docgen_router;
