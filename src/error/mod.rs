//! Error handling module for bsonjson.
//!
//! The taxonomy follows the stages of a conversion run:
//! - [`StructuralError`]: the BSON byte stream is not a sequence of documents
//! - [`ConversionError`]: a tag payload is malformed or a type has no tag form
//! - [`FilterError`]: one embedded payload could not be decoded (non-fatal)
//! - I/O, configuration and fetch failures with path or URL context
//!
//! # Example
//!
//! ```rust,no_run
//! use bsonjson::error::{BsonJsonError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(BsonJsonError::Generic("not yet".to_string()))
//! }
//! ```

pub mod kinds;
pub mod path;

// Re-export commonly used types
pub use kinds::{
    BsonJsonError, ConfigError, ConversionError, FetchError, FilterError, FilterFailure, Result,
    StructuralError,
};
pub use path::{FieldPath, PathSegment};
