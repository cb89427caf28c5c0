//! Document converter between BSON streams and tagged JSON text
//!
//! This module provides the conversion layer used by the CLI and the
//! resource pipeline:
//! - `stream`: splitting, validating and encoding concatenated BSON
//! - `strategies`: tree walkers applying the tag codec in each direction
//! - `files`: file-to-file conversion with overwrite handling
//!
//! JSON text is always rendered with insertion key order and a fixed
//! indentation, so converting the same documents twice yields the same
//! bytes.

pub mod stream;
pub mod strategies;

mod files;

pub use files::{
    ConvertOptions, convert_file_to_bson, convert_file_to_json, default_json_output_path,
};
pub use stream::{RawRecord, decode_stream, encode_stream, split_stream, validate_stream};
pub use strategies::{BsonToJson, JsonToBson, TreeConverter};

use bson::Document;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::{BsonJsonError, ConversionError, Result};

/// Indentation width of rendered JSON text
pub const DEFAULT_INDENT: usize = 4;

/// Render a value as pretty JSON with `indent` spaces per level
///
/// # Arguments
/// * `value` - The value to serialize
/// * `indent` - Spaces per nesting level
///
/// # Returns
/// * `Result<String>` - Pretty JSON string
pub fn to_pretty_json<T: Serialize>(value: &T, indent: usize) -> Result<String> {
    let mut buf = Vec::new();
    let indent = " ".repeat(indent);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut ser)
        .map_err(|source| BsonJsonError::InvalidJson { path: None, source })?;
    String::from_utf8(buf).map_err(|e| BsonJsonError::Generic(e.to_string()))
}

/// Converter between document sequences and tagged JSON
#[derive(Debug, Clone)]
pub struct DocumentConverter {
    to_json: BsonToJson,
    to_bson: JsonToBson,
    indent: usize,
}

impl Default for DocumentConverter {
    fn default() -> Self {
        Self::new(DEFAULT_INDENT)
    }
}

impl DocumentConverter {
    /// Create a converter rendering JSON with `indent` spaces per level
    pub fn new(indent: usize) -> Self {
        Self {
            to_json: BsonToJson::new(),
            to_bson: JsonToBson::new(),
            indent,
        }
    }

    pub fn indent(&self) -> usize {
        self.indent
    }

    /// Convert documents to a JSON array of tagged objects
    ///
    /// The result is an array even for zero or one document.
    pub fn documents_to_json(&self, docs: &[Document]) -> Result<JsonValue> {
        let items = docs
            .iter()
            .enumerate()
            .map(|(i, doc)| {
                self.to_json
                    .convert_document(doc)
                    .map(JsonValue::Object)
                    .map_err(|e| e.within_index(i))
            })
            .collect::<std::result::Result<Vec<_>, ConversionError>>()?;
        Ok(JsonValue::Array(items))
    }

    /// Convert tagged JSON to documents
    ///
    /// An array yields one document per element, an object yields a single
    /// document. Anything else is rejected.
    pub fn json_to_documents(&self, value: &JsonValue) -> Result<Vec<Document>> {
        match value {
            JsonValue::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    self.to_bson
                        .convert_document(item)
                        .map_err(|e| BsonJsonError::from(e.within_index(i)))
                })
                .collect(),
            JsonValue::Object(_) => Ok(vec![self.to_bson.convert_document(value)?]),
            _ => Err(ConversionError::NotADocument {
                path: Default::default(),
            }
            .into()),
        }
    }

    /// Decode a BSON stream, optionally validating every element first
    pub fn decode_bytes(&self, bytes: &[u8], validate: bool) -> Result<Vec<Document>> {
        if validate {
            let count = validate_stream(bytes)?;
            debug!("Stream validated: {} documents", count);
        }
        Ok(decode_stream(bytes)?)
    }

    /// BSON stream to rendered JSON text
    pub fn bson_to_json_text(&self, bytes: &[u8], validate: bool) -> Result<String> {
        let docs = self.decode_bytes(bytes, validate)?;
        let json = self.documents_to_json(&docs)?;
        self.to_pretty_string(&json)
    }

    /// JSON text to a BSON stream
    pub fn json_text_to_bson(&self, text: &str) -> Result<Vec<u8>> {
        let value: JsonValue = serde_json::from_str(text)
            .map_err(|source| BsonJsonError::InvalidJson { path: None, source })?;
        let docs = self.json_to_documents(&value)?;
        Ok(encode_stream(&docs)?)
    }

    /// Render a value with this converter's indentation
    pub fn to_pretty_string<T: Serialize>(&self, value: &T) -> Result<String> {
        to_pretty_json(value, self.indent)
    }
}
