//! REST API module for proposal generation
//!
//! This module provides the HTTP endpoints the form front end talks to:
//! health, template preview, generation and download of generated files.

#[cfg(feature = "server")]
pub mod docgen_routes;

#[cfg(feature = "server")]
pub use docgen_routes::{create_docgen_router, DocgenState};
