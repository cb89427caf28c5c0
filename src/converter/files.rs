//! File-to-file conversion

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use super::DocumentConverter;
use crate::error::{BsonJsonError, Result};

/// Options for BSON to JSON file conversion
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvertOptions {
    /// Replace an existing output file
    pub overwrite: bool,

    /// Walk every element of the stream before converting
    pub validate: bool,
}

/// Input path with its extension replaced by `.json`
pub fn default_json_output_path(input: &Path) -> PathBuf {
    input.with_extension("json")
}

/// Convert a BSON file to tagged JSON text
///
/// The output is rendered completely in memory before anything is written,
/// so a failed conversion leaves no partial file behind.
///
/// # Returns
/// Number of documents written
pub fn convert_file_to_json(
    converter: &DocumentConverter,
    input: &Path,
    output: &Path,
    options: ConvertOptions,
) -> Result<usize> {
    if output.exists() && !options.overwrite {
        return Err(BsonJsonError::OutputExists(output.to_path_buf()));
    }

    let bytes = fs::read(input).map_err(|e| BsonJsonError::io(input, e))?;
    let docs = converter.decode_bytes(&bytes, options.validate)?;
    let json = converter.documents_to_json(&docs)?;
    let text = converter.to_pretty_string(&json)?;

    fs::write(output, text).map_err(|e| BsonJsonError::io(output, e))?;
    info!(
        "Converted {} documents from {} to {}",
        docs.len(),
        input.display(),
        output.display()
    );
    Ok(docs.len())
}

/// Convert a tagged JSON file to a BSON stream
///
/// # Returns
/// Number of documents written
pub fn convert_file_to_bson(
    converter: &DocumentConverter,
    input: &Path,
    output: &Path,
) -> Result<usize> {
    let text = fs::read_to_string(input).map_err(|e| BsonJsonError::io(input, e))?;
    let value: serde_json::Value =
        serde_json::from_str(&text).map_err(|source| BsonJsonError::InvalidJson {
            path: Some(input.to_path_buf()),
            source,
        })?;
    let docs = converter.json_to_documents(&value)?;
    let bytes = super::encode_stream(&docs)?;

    fs::write(output, bytes).map_err(|e| BsonJsonError::io(output, e))?;
    info!(
        "Converted {} documents from {} to {}",
        docs.len(),
        input.display(),
        output.display()
    );
    Ok(docs.len())
}
