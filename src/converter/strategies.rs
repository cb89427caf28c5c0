//! Tree conversion strategies
//!
//! - [`BsonToJson`]: BSON values to tagged JSON
//! - [`JsonToBson`]: tagged JSON back to BSON values
//!
//! Both walk the whole tree and consult the tag codec at every node.
//! Errors raised below a container gain the container's key or index on
//! the way back up, so the reported path points at the offending field.

use bson::{Bson, Document};
use serde_json::{Map, Number, Value as JsonValue};

use crate::codec::{SpecialValue, bson_type_name};
use crate::error::{ConversionError, FieldPath};

/// Core trait for tree conversion
///
/// Implemented once per direction so callers can hold either strategy
/// behind the same interface.
pub trait TreeConverter {
    /// Tree type consumed by the conversion
    type Input;

    /// Tree type produced by the conversion
    type Output;

    /// Convert a value and everything below it
    ///
    /// # Arguments
    /// * `value` - Root of the tree to convert
    ///
    /// # Returns
    /// Converted tree or the first failure, located by field path
    fn convert(&self, value: &Self::Input) -> Result<Self::Output, ConversionError>;

    /// Convert every element of a sequence, locating failures by index
    fn convert_all(&self, values: &[Self::Input]) -> Result<Vec<Self::Output>, ConversionError> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| self.convert(v).map_err(|e| e.within_index(i)))
            .collect()
    }
}

/// BSON to tagged JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct BsonToJson;

impl BsonToJson {
    pub fn new() -> Self {
        Self
    }

    /// Convert a document to a JSON object, keeping field order
    pub fn convert_document(
        &self,
        doc: &Document,
    ) -> Result<Map<String, JsonValue>, ConversionError> {
        let mut map = Map::with_capacity(doc.len());
        for (key, value) in doc {
            let converted = self.convert(value).map_err(|e| e.within_key(key))?;
            map.insert(key.clone(), converted);
        }
        Ok(map)
    }

    fn unsupported(value: &Bson) -> ConversionError {
        ConversionError::UnsupportedType {
            path: FieldPath::root(),
            type_name: bson_type_name(value),
        }
    }
}

impl TreeConverter for BsonToJson {
    type Input = Bson;
    type Output = JsonValue;

    fn convert(&self, value: &Bson) -> Result<JsonValue, ConversionError> {
        if let Some(special) = SpecialValue::from_bson(value) {
            return Ok(special.to_tagged_json());
        }

        match value {
            Bson::Document(doc) => self.convert_document(doc).map(JsonValue::Object),
            Bson::Array(arr) => self.convert_all(arr).map(JsonValue::Array),
            Bson::String(s) | Bson::Symbol(s) | Bson::JavaScriptCode(s) => {
                Ok(JsonValue::String(s.clone()))
            }
            Bson::Int32(n) => Ok(JsonValue::from(*n)),
            Bson::Int64(n) => Ok(JsonValue::from(*n)),
            Bson::Double(f) => Number::from_f64(*f)
                .map(JsonValue::Number)
                .ok_or_else(|| Self::unsupported(value)),
            Bson::Boolean(b) => Ok(JsonValue::Bool(*b)),
            Bson::Null | Bson::Undefined => Ok(JsonValue::Null),
            other => Err(Self::unsupported(other)),
        }
    }
}

/// Tagged JSON to BSON
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonToBson;

impl JsonToBson {
    pub fn new() -> Self {
        Self
    }

    /// Convert a JSON value that must become a BSON document
    ///
    /// Tagged objects decode to special values, not documents, and are
    /// rejected here just like scalars and arrays. A reference is the one
    /// tagged form that is stored as a document.
    pub fn convert_document(&self, value: &JsonValue) -> Result<Document, ConversionError> {
        match self.convert(value)? {
            Bson::Document(doc) => Ok(doc),
            _ => Err(ConversionError::NotADocument {
                path: FieldPath::root(),
            }),
        }
    }

    fn convert_object(&self, map: &Map<String, JsonValue>) -> Result<Document, ConversionError> {
        let mut doc = Document::new();
        for (key, value) in map {
            let converted = self.convert(value).map_err(|e| e.within_key(key))?;
            doc.insert(key.clone(), converted);
        }
        Ok(doc)
    }

    /// Integers become Int32 when they fit, Int64 otherwise
    fn convert_number(&self, n: &Number) -> Result<Bson, ConversionError> {
        if let Some(i) = n.as_i64() {
            return Ok(match i32::try_from(i) {
                Ok(small) => Bson::Int32(small),
                Err(_) => Bson::Int64(i),
            });
        }
        if n.is_u64() {
            return Err(ConversionError::NumberOutOfRange {
                path: FieldPath::root(),
                value: n.to_string(),
            });
        }
        n.as_f64()
            .map(Bson::Double)
            .ok_or_else(|| ConversionError::NumberOutOfRange {
                path: FieldPath::root(),
                value: n.to_string(),
            })
    }
}

impl TreeConverter for JsonToBson {
    type Input = JsonValue;
    type Output = Bson;

    fn convert(&self, value: &JsonValue) -> Result<Bson, ConversionError> {
        match value {
            JsonValue::Object(map) => match SpecialValue::from_tagged_json(map)? {
                Some(special) => Ok(special.into_bson()),
                None => self.convert_object(map).map(Bson::Document),
            },
            JsonValue::Array(items) => self.convert_all(items).map(Bson::Array),
            JsonValue::String(s) => match SpecialValue::from_legacy_string(s) {
                Some(blob) => blob.map(SpecialValue::into_bson),
                None => Ok(Bson::String(s.clone())),
            },
            JsonValue::Number(n) => self.convert_number(n),
            JsonValue::Bool(b) => Ok(Bson::Boolean(*b)),
            JsonValue::Null => Ok(Bson::Null),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::oid::ObjectId;
    use bson::spec::BinarySubtype;
    use bson::{Binary, DateTime, Timestamp, doc};
    use serde_json::json;

    #[test]
    fn test_plain_document_to_json() {
        let doc = doc! { "name": "hat", "count": 3, "price": 2.5, "new": true, "tag": null };
        let json = BsonToJson::new().convert(&Bson::Document(doc)).unwrap();
        assert_eq!(
            json,
            json!({ "name": "hat", "count": 3, "price": 2.5, "new": true, "tag": null })
        );
    }

    #[test]
    fn test_nested_special_values_are_tagged() {
        let oid = ObjectId::parse_str("65705d84dfc3f3b5094e1f72").unwrap();
        let content = Binary {
            subtype: BinarySubtype::Generic,
            bytes: b"{}".to_vec(),
        };
        let at = Timestamp {
            time: 10,
            increment: 2,
        };
        let doc = doc! {
            "_id": oid,
            "Items": [ { "Content": content }, { "At": at } ],
        };
        let json = BsonToJson::new().convert(&Bson::Document(doc)).unwrap();
        assert_eq!(
            json,
            json!({
                "_id": { "$oid": "65705d84dfc3f3b5094e1f72" },
                "Items": [
                    { "Content": { "$binary": "e30=" } },
                    { "At": { "$timestamp": { "t": 10, "i": 2 } } }
                ]
            })
        );
    }

    #[test]
    fn test_field_order_is_kept() {
        let doc = doc! { "z": 1, "a": 2, "m": 3 };
        let json = BsonToJson::new().convert(&Bson::Document(doc)).unwrap();
        let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_unsupported_type_reports_path() {
        let doc = doc! { "meta": { "created": DateTime::from_millis(0) } };
        let err = BsonToJson::new().convert(&Bson::Document(doc)).unwrap_err();
        assert_eq!(
            err,
            ConversionError::UnsupportedType {
                path: FieldPath::root().key("meta").key("created"),
                type_name: "date",
            }
        );
    }

    #[test]
    fn test_non_finite_double_is_unsupported() {
        let err = BsonToJson::new().convert(&Bson::Double(f64::NAN)).unwrap_err();
        assert!(matches!(err, ConversionError::UnsupportedType { .. }));
    }

    #[test]
    fn test_json_to_bson_numbers() {
        let converter = JsonToBson::new();
        assert_eq!(converter.convert(&json!(5)).unwrap(), Bson::Int32(5));
        assert_eq!(
            converter.convert(&json!(5_000_000_000i64)).unwrap(),
            Bson::Int64(5_000_000_000)
        );
        assert_eq!(converter.convert(&json!(-2.5)).unwrap(), Bson::Double(-2.5));
        assert!(matches!(
            converter.convert(&json!(u64::MAX)).unwrap_err(),
            ConversionError::NumberOutOfRange { .. }
        ));
    }

    #[test]
    fn test_json_to_bson_decodes_tags_at_depth() {
        let json = json!({
            "outer": [ { "blob": { "$binary": "AQID" } }, "$binary:BAU=" ]
        });
        let bson = JsonToBson::new().convert(&json).unwrap();
        let blob = |bytes: Vec<u8>| {
            Bson::Binary(Binary {
                subtype: BinarySubtype::Generic,
                bytes,
            })
        };
        assert_eq!(
            bson,
            Bson::Document(doc! {
                "outer": [ { "blob": blob(vec![1, 2, 3]) }, blob(vec![4, 5]) ]
            })
        );
    }

    #[test]
    fn test_tag_error_reports_path() {
        let json = json!({ "Items": [ { "ok": 1 }, { "Content": { "$binary": "%%%" } } ] });
        let err = JsonToBson::new().convert(&json).unwrap_err();
        assert_eq!(err.path().to_string(), "Items[1].Content");
        assert!(matches!(
            err,
            ConversionError::InvalidTagPayload { tag: "$binary", .. }
        ));
    }

    #[test]
    fn test_convert_document_rejects_non_documents() {
        let converter = JsonToBson::new();
        assert!(converter.convert_document(&json!([1, 2])).is_err());
        assert!(converter.convert_document(&json!("text")).is_err());
        let tagged = json!({ "$oid": "65705d84dfc3f3b5094e1f72" });
        assert!(converter.convert_document(&tagged).is_err());
        assert!(converter.convert_document(&json!({ "a": 1 })).is_ok());
    }
}
