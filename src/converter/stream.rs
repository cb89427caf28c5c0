//! Concatenated BSON streams
//!
//! A BSON file is zero or more length-prefixed documents written back to
//! back. These functions split, validate, decode and encode such streams.

use bson::{Document, RawBsonRef, RawDocument};
use tracing::debug;

use crate::error::{ConversionError, StructuralError};

/// Smallest possible document: 4-byte length plus the terminating null
const MIN_DOCUMENT_LEN: usize = 5;

/// One length-delimited document inside a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRecord<'a> {
    /// Byte offset of the document in the stream
    pub offset: usize,

    /// The document bytes, length prefix and terminator included
    pub bytes: &'a [u8],
}

impl RawRecord<'_> {
    fn error(&self, document: usize, reason: impl Into<String>) -> StructuralError {
        StructuralError {
            offset: self.offset,
            document,
            reason: reason.into(),
        }
    }
}

/// Split a stream into its documents by walking the length prefixes
///
/// Only the framing is checked: every prefix must be in range and every
/// document must end with a null byte. Element contents are not inspected.
pub fn split_stream(bytes: &[u8]) -> Result<Vec<RawRecord<'_>>, StructuralError> {
    let mut records = Vec::new();
    let mut offset = 0;

    while offset < bytes.len() {
        let remaining = &bytes[offset..];
        let fail = |reason: String| StructuralError {
            offset,
            document: records.len(),
            reason,
        };

        let Some(prefix) = remaining.first_chunk::<4>() else {
            return Err(fail(format!(
                "{} trailing bytes cannot hold a length prefix",
                remaining.len()
            )));
        };

        let declared = i32::from_le_bytes(*prefix);
        let len = usize::try_from(declared)
            .ok()
            .filter(|len| *len >= MIN_DOCUMENT_LEN)
            .ok_or_else(|| fail(format!("invalid length prefix {declared}")))?;

        if len > remaining.len() {
            return Err(fail(format!(
                "declared length {len} exceeds the {} bytes left",
                remaining.len()
            )));
        }
        if remaining[len - 1] != 0 {
            return Err(fail("document is not null-terminated".to_string()));
        }

        records.push(RawRecord {
            offset,
            bytes: &remaining[..len],
        });
        offset += len;
    }

    Ok(records)
}

/// Check that a stream is a well-formed sequence of documents
///
/// Walks every element of every document, nested documents and arrays
/// included, without building a value tree. No tag interpretation happens
/// here.
///
/// # Returns
/// Number of documents in the stream
pub fn validate_stream(bytes: &[u8]) -> Result<usize, StructuralError> {
    let records = split_stream(bytes)?;

    for (index, record) in records.iter().enumerate() {
        let raw = RawDocument::from_bytes(record.bytes)
            .map_err(|e| record.error(index, e.to_string()))?;
        validate_raw_document(raw).map_err(|e| record.error(index, e.to_string()))?;
    }

    debug!("Validated {} BSON documents", records.len());
    Ok(records.len())
}

fn validate_raw_document(doc: &RawDocument) -> Result<(), bson::raw::Error> {
    for element in doc {
        let (_, value) = element?;
        validate_raw_value(value)?;
    }
    Ok(())
}

fn validate_raw_value(value: RawBsonRef<'_>) -> Result<(), bson::raw::Error> {
    match value {
        RawBsonRef::Document(doc) => validate_raw_document(doc),
        RawBsonRef::Array(arr) => {
            for item in arr {
                validate_raw_value(item?)?;
            }
            Ok(())
        }
        RawBsonRef::JavaScriptCodeWithScope(code) => validate_raw_document(code.scope),
        _ => Ok(()),
    }
}

/// Decode every document of a stream
pub fn decode_stream(bytes: &[u8]) -> Result<Vec<Document>, StructuralError> {
    let records = split_stream(bytes)?;
    let mut docs = Vec::with_capacity(records.len());

    for (index, record) in records.iter().enumerate() {
        let doc = Document::from_reader(record.bytes)
            .map_err(|e| record.error(index, e.to_string()))?;
        docs.push(doc);
    }

    debug!("Decoded {} BSON documents", docs.len());
    Ok(docs)
}

/// Encode documents back to back into one stream
pub fn encode_stream(docs: &[Document]) -> Result<Vec<u8>, ConversionError> {
    let mut buf = Vec::new();

    for (index, doc) in docs.iter().enumerate() {
        doc.to_writer(&mut buf).map_err(|e| {
            ConversionError::Unencodable {
                path: Default::default(),
                reason: e.to_string(),
            }
            .within_index(index)
        })?;
    }

    Ok(buf)
}
