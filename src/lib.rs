//! bsonjson library
//!
//! Conversion between concatenated BSON streams and tagged JSON, plus a
//! filter for JSON sub-documents embedded as base64 `Content` payloads.
//!
//! # Modules
//!
//! - `codec`: type-tag mapping for BSON values JSON cannot express
//! - `converter`: tree conversion, BSON stream framing, file conversion
//! - `filter`: `Content.$binary` payload filtering
//! - `pipeline`: fetch, convert, filter and re-encode a remote resource
//! - `cli`: Command-line interface and argument parsing
//! - `config`: Configuration management
//! - `error`: Error types and handling
//! - `utils`: Utility functions and helpers
//!
//! # Example
//!
//! ```no_run
//! use bsonjson::{BsonJsonError, DocumentConverter};
//!
//! fn main() -> bsonjson::Result<()> {
//!     let converter = DocumentConverter::default();
//!     let bytes = std::fs::read("store.bson").map_err(|e| BsonJsonError::io("store.bson", e))?;
//!     let json = converter.bson_to_json_text(&bytes, true)?;
//!     let back = converter.json_text_to_bson(&json)?;
//!     assert_eq!(back, bytes);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod codec;
pub mod config;
pub mod converter;
pub mod error;
pub mod filter;
pub mod pipeline;
pub mod utils;

// Re-export commonly used types
pub use codec::SpecialValue;
pub use config::Config;
pub use converter::DocumentConverter;
pub use error::{BsonJsonError, Result};
pub use filter::{FilterReport, PayloadFilter};
pub use pipeline::{Pipeline, ResourceFetcher};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string
///
/// # Returns
/// * `&str` - Version string
pub fn version() -> &'static str {
    VERSION
}
