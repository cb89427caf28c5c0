//! Tagged special values and their JSON tag vocabulary
//!
//! A [`SpecialValue`] is a BSON value with no native JSON representation.
//! Each variant owns one entry of the reserved tag vocabulary and knows how
//! to render itself as a tagged JSON object and how to read itself back.

use bson::oid::ObjectId;
use bson::spec::BinarySubtype;
use bson::{Binary, Bson, Decimal128, Document, Timestamp};
use serde_json::{Map, Value as JsonValue, json};

use super::helpers::{decode_base64, encode_base64, id_string_form, parse_object_id};
use crate::error::ConversionError;

pub const BINARY_TAG: &str = "$binary";
pub const OID_TAG: &str = "$oid";
pub const REF_TAG: &str = "$ref";
pub const ID_TAG: &str = "$id";
pub const TIMESTAMP_TAG: &str = "$timestamp";
pub const DECIMAL_TAG: &str = "$numberDecimal";

/// Prefix of the legacy string form of a blob, `"$binary:<base64>"`.
///
/// Accepted when decoding, never produced when encoding.
pub const LEGACY_BINARY_PREFIX: &str = "$binary:";

/// Kind of tagged JSON object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Binary,
    ObjectId,
    Reference,
    Timestamp,
    Decimal,
}

/// Order in which a mapping is tested for tag keys. First match wins.
pub const TAG_PRIORITY: [Tag; 5] = [
    Tag::Binary,
    Tag::ObjectId,
    Tag::Reference,
    Tag::Timestamp,
    Tag::Decimal,
];

impl Tag {
    /// The reserved key identifying this tag
    pub fn key(self) -> &'static str {
        match self {
            Tag::Binary => BINARY_TAG,
            Tag::ObjectId => OID_TAG,
            Tag::Reference => REF_TAG,
            Tag::Timestamp => TIMESTAMP_TAG,
            Tag::Decimal => DECIMAL_TAG,
        }
    }

    /// Whether `map` carries this tag
    ///
    /// A reference needs both `$ref` and `$id`; every other tag needs only
    /// its own key.
    pub fn matches(self, map: &Map<String, JsonValue>) -> bool {
        match self {
            Tag::Reference => map.contains_key(REF_TAG) && map.contains_key(ID_TAG),
            other => map.contains_key(other.key()),
        }
    }

    /// First tag of [`TAG_PRIORITY`] carried by `map`
    pub fn detect(map: &Map<String, JsonValue>) -> Option<Tag> {
        TAG_PRIORITY.into_iter().find(|tag| tag.matches(map))
    }

    fn invalid(self, reason: impl Into<String>) -> ConversionError {
        ConversionError::invalid_tag(self.key(), reason)
    }

    /// Read the payload of a mapping known to carry this tag
    fn decode_payload(self, map: &Map<String, JsonValue>) -> Result<SpecialValue, ConversionError> {
        match self {
            Tag::Binary => {
                let text = expect_str(self, map, BINARY_TAG)?;
                decode_base64(text)
                    .map(SpecialValue::Blob)
                    .map_err(|e| self.invalid(e.to_string()))
            }
            Tag::ObjectId => {
                let text = expect_str(self, map, OID_TAG)?;
                parse_object_id(text)
                    .map(SpecialValue::ObjectId)
                    .map_err(|e| self.invalid(format!("'{text}' is not an object id: {e}")))
            }
            Tag::Reference => {
                let collection = expect_str(self, map, REF_TAG)?.to_string();
                let id = expect_str(self, map, ID_TAG)?;
                let id = match parse_object_id(id) {
                    Ok(oid) => Bson::ObjectId(oid),
                    Err(_) => Bson::String(id.to_string()),
                };
                Ok(SpecialValue::Reference { collection, id })
            }
            Tag::Timestamp => {
                let fields = map
                    .get(TIMESTAMP_TAG)
                    .and_then(JsonValue::as_object)
                    .ok_or_else(|| self.invalid("expected an object {t, i}"))?;
                let time = expect_u32(self, fields, "t")?;
                let increment = expect_u32(self, fields, "i")?;
                Ok(SpecialValue::Timestamp(Timestamp { time, increment }))
            }
            Tag::Decimal => {
                let text = expect_str(self, map, DECIMAL_TAG)?;
                text.parse::<Decimal128>()
                    .map(SpecialValue::Decimal)
                    .map_err(|e| self.invalid(format!("'{text}' is not a decimal: {e}")))
            }
        }
    }
}

fn expect_str<'a>(
    tag: Tag,
    map: &'a Map<String, JsonValue>,
    key: &str,
) -> Result<&'a str, ConversionError> {
    map.get(key)
        .and_then(JsonValue::as_str)
        .ok_or_else(|| tag.invalid(format!("{key} must be a string")))
}

fn expect_u32(tag: Tag, map: &Map<String, JsonValue>, key: &str) -> Result<u32, ConversionError> {
    map.get(key)
        .and_then(JsonValue::as_u64)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| tag.invalid(format!("{key} must be an unsigned 32-bit integer")))
}

/// A BSON value with no native JSON form
#[derive(Debug, Clone, PartialEq)]
pub enum SpecialValue {
    /// Opaque bytes
    Blob(Vec<u8>),

    /// 12-byte object identifier
    ObjectId(ObjectId),

    /// Reference to a document in another collection
    Reference { collection: String, id: Bson },

    /// Internal replication timestamp
    Timestamp(Timestamp),

    /// IEEE 754 decimal128
    Decimal(Decimal128),
}

impl SpecialValue {
    /// Classify a BSON value, returning `None` for plain values
    pub fn from_bson(value: &Bson) -> Option<SpecialValue> {
        match value {
            Bson::Binary(bin) => Some(SpecialValue::Blob(bin.bytes.clone())),
            Bson::ObjectId(oid) => Some(SpecialValue::ObjectId(*oid)),
            Bson::Timestamp(ts) => Some(SpecialValue::Timestamp(*ts)),
            Bson::Decimal128(d) => Some(SpecialValue::Decimal(*d)),
            Bson::Document(doc) => Self::reference_from_document(doc),
            Bson::DbPointer(_) => Self::reference_from_db_pointer(value),
            _ => None,
        }
    }

    /// A document `{ "$ref": <string>, "$id": <any>, ... }` is a reference
    fn reference_from_document(doc: &Document) -> Option<SpecialValue> {
        let collection = doc.get_str(REF_TAG).ok()?;
        let id = doc.get(ID_TAG)?;
        Some(SpecialValue::Reference {
            collection: collection.to_string(),
            id: id.clone(),
        })
    }

    /// DbPointer fields are private; read them through canonical extended JSON
    fn reference_from_db_pointer(value: &Bson) -> Option<SpecialValue> {
        let extjson = value.clone().into_canonical_extjson();
        let pointer = extjson.get("$dbPointer")?;
        let collection = pointer.get(REF_TAG)?.as_str()?.to_string();
        let oid = pointer.get(ID_TAG)?.get(OID_TAG)?.as_str()?;
        let id = parse_object_id(oid).ok()?;
        Some(SpecialValue::Reference {
            collection,
            id: Bson::ObjectId(id),
        })
    }

    /// Read a tagged JSON object, returning `None` when `map` carries no tag
    pub fn from_tagged_json(
        map: &Map<String, JsonValue>,
    ) -> Result<Option<SpecialValue>, ConversionError> {
        match Tag::detect(map) {
            Some(tag) => tag.decode_payload(map).map(Some),
            None => Ok(None),
        }
    }

    /// Read the legacy `"$binary:<base64>"` string form
    ///
    /// Returns `None` when `text` does not use the prefix.
    pub fn from_legacy_string(text: &str) -> Option<Result<SpecialValue, ConversionError>> {
        let encoded = text.strip_prefix(LEGACY_BINARY_PREFIX)?;
        Some(
            decode_base64(encoded)
                .map(SpecialValue::Blob)
                .map_err(|e| Tag::Binary.invalid(format!("legacy string form: {e}"))),
        )
    }

    pub fn tag(&self) -> Tag {
        match self {
            SpecialValue::Blob(_) => Tag::Binary,
            SpecialValue::ObjectId(_) => Tag::ObjectId,
            SpecialValue::Reference { .. } => Tag::Reference,
            SpecialValue::Timestamp(_) => Tag::Timestamp,
            SpecialValue::Decimal(_) => Tag::Decimal,
        }
    }

    /// Render as a tagged JSON object
    pub fn to_tagged_json(&self) -> JsonValue {
        match self {
            SpecialValue::Blob(bytes) => json!({ BINARY_TAG: encode_base64(bytes) }),
            SpecialValue::ObjectId(oid) => json!({ OID_TAG: oid.to_hex() }),
            SpecialValue::Reference { collection, id } => json!({
                REF_TAG: collection,
                ID_TAG: id_string_form(id),
            }),
            SpecialValue::Timestamp(ts) => json!({
                TIMESTAMP_TAG: { "t": ts.time, "i": ts.increment }
            }),
            SpecialValue::Decimal(d) => json!({ DECIMAL_TAG: d.to_string() }),
        }
    }

    /// Convert into the BSON value it stands for
    pub fn into_bson(self) -> Bson {
        match self {
            SpecialValue::Blob(bytes) => Bson::Binary(Binary {
                subtype: BinarySubtype::Generic,
                bytes,
            }),
            SpecialValue::ObjectId(oid) => Bson::ObjectId(oid),
            SpecialValue::Reference { collection, id } => {
                let mut doc = Document::new();
                doc.insert(REF_TAG, collection);
                doc.insert(ID_TAG, id);
                Bson::Document(doc)
            }
            SpecialValue::Timestamp(ts) => Bson::Timestamp(ts),
            SpecialValue::Decimal(d) => Bson::Decimal128(d),
        }
    }
}
