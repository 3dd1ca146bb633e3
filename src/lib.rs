//! Bulk editing of Postman-style API collections and conversion of HAR
//! captures into collections.
//!
//! ```no_run
//! use collection_kit::{CollectionEditor, HarConverter};
//! use std::path::Path;
//!
//! # fn main() -> collection_kit::Result<()> {
//! let written = HarConverter::default().convert_and_save(Path::new("session.har"), None, None)?;
//!
//! let mut editor = CollectionEditor::load(&written)?;
//! editor.backup()?;
//! editor.collection_mut().add_header_to_all("X-Api-Key", "{{apiKey}}", true);
//! editor.collection_mut().update_base_url("https://api.example.com", "{{baseUrl}}");
//! editor.save(None)?;
//! # Ok(())
//! # }
//! ```

pub mod collection;
pub mod common;
pub mod config;
pub mod document;
pub mod har;
pub mod logging;

pub use collection::{Collection, CollectionEditor, EditReport};
pub use common::error::{CollectionError, Result};
pub use config::{AppConfig, ConverterConfig};
pub use har::{Conversion, ConversionReport, HarConverter};
