//! Helper functions shared by the tag codec
//!
//! Base64 and hex primitives plus small BSON inspection utilities.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bson::Bson;
use bson::oid::ObjectId;
use hex::FromHex;

/// Encode bytes as standard padded base64
///
/// # Arguments
/// * `bytes` - Raw bytes
///
/// # Returns
/// Base64 encoded string
pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode standard padded base64
///
/// # Arguments
/// * `text` - Base64 text
///
/// # Returns
/// Decoded bytes or the decoder's error
pub fn decode_base64(text: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(text)
}

/// Parse a 24-digit hex string into an ObjectId
///
/// # Arguments
/// * `text` - Hex representation of the 12 id bytes
///
/// # Returns
/// ObjectId or the hex decoder's error
pub fn parse_object_id(text: &str) -> Result<ObjectId, hex::FromHexError> {
    <[u8; 12]>::from_hex(text).map(ObjectId::from_bytes)
}

/// String form of a reference target id
///
/// ObjectIds render as hex, strings as themselves, anything else as its
/// relaxed extended JSON text.
pub fn id_string_form(id: &Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s.clone(),
        other => other.clone().into_relaxed_extjson().to_string(),
    }
}

/// Human readable BSON type name used in error messages
pub fn bson_type_name(value: &Bson) -> &'static str {
    match value {
        Bson::Double(_) => "double",
        Bson::String(_) => "string",
        Bson::Array(_) => "array",
        Bson::Document(_) => "document",
        Bson::Boolean(_) => "bool",
        Bson::Null => "null",
        Bson::RegularExpression(_) => "regex",
        Bson::JavaScriptCode(_) => "javascript",
        Bson::JavaScriptCodeWithScope(_) => "javascriptWithScope",
        Bson::Int32(_) => "int",
        Bson::Int64(_) => "long",
        Bson::Timestamp(_) => "timestamp",
        Bson::Binary(_) => "binData",
        Bson::ObjectId(_) => "objectId",
        Bson::DateTime(_) => "date",
        Bson::Symbol(_) => "symbol",
        Bson::Decimal128(_) => "decimal",
        Bson::Undefined => "undefined",
        Bson::MaxKey => "maxKey",
        Bson::MinKey => "minKey",
        Bson::DbPointer(_) => "dbPointer",
    }
}
