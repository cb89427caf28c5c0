//! Embedded payload filter
//!
//! Documents carry sub-documents serialized as JSON text, base64-encoded and
//! stored as `Content.$binary`. The filter decodes every such payload, drops
//! rejected entries from its `Elements` array, and re-encodes it.
//!
//! The pass never mutates its input. It returns a rebuilt tree together with
//! a [`FilterReport`]. A payload that cannot be decoded is left untouched and
//! recorded as a failure; the pass carries on with the rest of the tree.

mod elements;

pub use elements::ElementFilter;

use std::fs;
use std::path::Path;

use serde_json::{Map, Value as JsonValue};
use tracing::{debug, info, warn};

use crate::codec::{BINARY_TAG, decode_base64, encode_base64};
use crate::converter::{DEFAULT_INDENT, to_pretty_json};
use crate::error::{BsonJsonError, FieldPath, FilterError, FilterFailure, Result};

pub const CONTENT_FIELD: &str = "Content";
pub const ELEMENTS_FIELD: &str = "Elements";
pub const ASSET_NAME_FIELD: &str = "AssetName";
pub const INVENTORY_ID_FIELD: &str = "InventoryId";

/// Substring searched in `AssetName` when none is configured
pub const DEFAULT_SEARCH_KEY: &str = "pet";

/// Outcome of one filter pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterReport {
    /// Payloads decoded, filtered and re-encoded
    pub transformed: usize,

    /// Elements dropped across all payloads
    pub removed_elements: usize,

    /// Payloads left unchanged because they could not be decoded
    pub failures: Vec<FilterError>,
}

impl FilterReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Rebuilt tree plus what happened while building it
#[derive(Debug, Clone, PartialEq)]
pub struct Filtered {
    pub value: JsonValue,
    pub report: FilterReport,
}

/// Rewrites every `Content.$binary` payload of a tree
#[derive(Debug, Clone)]
pub struct PayloadFilter {
    elements: ElementFilter,
    indent: usize,
}

impl Default for PayloadFilter {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_KEY)
    }
}

impl PayloadFilter {
    pub fn new(search_key: impl Into<String>) -> Self {
        Self {
            elements: ElementFilter::new(search_key),
            indent: DEFAULT_INDENT,
        }
    }

    /// Indentation used when writing filtered files back
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    pub fn search_key(&self) -> &str {
        self.elements.search_key()
    }

    /// Filter a whole tree
    pub fn apply(&self, value: &JsonValue) -> Filtered {
        let mut report = FilterReport::default();
        let value = self.rebuild(value, &FieldPath::root(), &mut report);
        Filtered { value, report }
    }

    fn rebuild(
        &self,
        value: &JsonValue,
        path: &FieldPath,
        report: &mut FilterReport,
    ) -> JsonValue {
        match value {
            JsonValue::Object(fields) => {
                let mut out = Map::with_capacity(fields.len());
                for (key, child) in fields {
                    let child_path = path.key(key);
                    let rebuilt = if key == CONTENT_FIELD && carries_payload(child) {
                        self.rebuild_content(child, child_path, report)
                    } else {
                        self.rebuild(child, &child_path, report)
                    };
                    out.insert(key.clone(), rebuilt);
                }
                JsonValue::Object(out)
            }
            JsonValue::Array(items) => JsonValue::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| self.rebuild(item, &path.index(i), report))
                    .collect(),
            ),
            scalar => scalar.clone(),
        }
    }

    fn rebuild_content(
        &self,
        content: &JsonValue,
        path: FieldPath,
        report: &mut FilterReport,
    ) -> JsonValue {
        match self.rewrite_content(content) {
            Ok((rewritten, removed)) => {
                debug!("Filtered payload at {}: {} elements removed", path, removed);
                report.transformed += 1;
                report.removed_elements += removed;
                self.rebuild_siblings(rewritten, &path, report)
            }
            Err(reason) => {
                let failure = FilterError { path, reason };
                warn!("{}", failure);
                report.failures.push(failure);
                content.clone()
            }
        }
    }

    /// Filter the keys next to a rewritten `$binary`
    fn rebuild_siblings(
        &self,
        content: JsonValue,
        path: &FieldPath,
        report: &mut FilterReport,
    ) -> JsonValue {
        let JsonValue::Object(fields) = content else {
            return content;
        };
        let rebuilt = fields
            .into_iter()
            .map(|(key, child)| {
                let child = if key == BINARY_TAG {
                    child
                } else {
                    self.rebuild(&child, &path.key(&key), report)
                };
                (key, child)
            })
            .collect();
        JsonValue::Object(rebuilt)
    }

    /// Rewrite one `Content` mapping, keeping every key but `$binary`
    ///
    /// # Returns
    /// The new mapping and the number of removed elements
    pub fn rewrite_content(
        &self,
        content: &JsonValue,
    ) -> std::result::Result<(JsonValue, usize), FilterFailure> {
        let mut fields = content.as_object().cloned().unwrap_or_default();
        let encoded = fields
            .get(BINARY_TAG)
            .and_then(JsonValue::as_str)
            .ok_or(FilterFailure::NotAString)?;

        let (payload, removed) = self.filter_payload(encoded)?;
        fields.insert(BINARY_TAG.to_string(), JsonValue::String(payload));
        Ok((JsonValue::Object(fields), removed))
    }

    /// Decode, filter and re-encode one base64 payload
    pub fn filter_payload(
        &self,
        encoded: &str,
    ) -> std::result::Result<(String, usize), FilterFailure> {
        let bytes =
            decode_base64(encoded).map_err(|e| FilterFailure::InvalidBase64(e.to_string()))?;
        let text =
            String::from_utf8(bytes).map_err(|e| FilterFailure::InvalidUtf8(e.to_string()))?;
        let decoded: JsonValue =
            serde_json::from_str(&text).map_err(|e| FilterFailure::InvalidJson(e.to_string()))?;

        let (filtered, removed) = self.elements.apply(decoded);
        let compact = serde_json::to_string(&filtered)
            .map_err(|e| FilterFailure::InvalidJson(e.to_string()))?;
        Ok((encode_base64(compact.as_bytes()), removed))
    }

    /// Filter a JSON file in place
    pub fn filter_file(&self, path: &Path) -> Result<FilterReport> {
        let text = fs::read_to_string(path).map_err(|e| BsonJsonError::io(path, e))?;
        let value: JsonValue =
            serde_json::from_str(&text).map_err(|source| BsonJsonError::InvalidJson {
                path: Some(path.to_path_buf()),
                source,
            })?;

        let Filtered { value, report } = self.apply(&value);
        let rendered = to_pretty_json(&value, self.indent)?;
        fs::write(path, rendered).map_err(|e| BsonJsonError::io(path, e))?;

        info!(
            "Filtered {}: {} payloads rewritten, {} elements removed, {} failures",
            path.display(),
            report.transformed,
            report.removed_elements,
            report.failures.len()
        );
        Ok(report)
    }
}

/// `Content` nodes are candidates only when they are mappings with `$binary`
fn carries_payload(content: &JsonValue) -> bool {
    content
        .as_object()
        .is_some_and(|fields| fields.contains_key(BINARY_TAG))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn encode(value: &JsonValue) -> String {
        encode_base64(serde_json::to_string(value).unwrap().as_bytes())
    }

    fn decode(encoded: &str) -> JsonValue {
        serde_json::from_slice(&decode_base64(encoded).unwrap()).unwrap()
    }

    fn payload_at<'a>(value: &'a JsonValue, pointer: &str) -> &'a str {
        value.pointer(pointer).and_then(JsonValue::as_str).unwrap()
    }

    #[test]
    fn test_filters_embedded_elements() {
        let inner = json!({
            "Elements": [
                { "AssetName": "carpet" },
                { "AssetName": "chair", "InventoryId": null },
                { "AssetName": "chair", "InventoryId": 7 },
                {}
            ]
        });
        let tree = json!([{ "Content": { "$binary": encode(&inner) } }]);

        let Filtered { value, report } = PayloadFilter::default().apply(&tree);
        assert_eq!(report.transformed, 1);
        assert_eq!(report.removed_elements, 2);
        assert!(report.is_clean());
        assert_eq!(
            decode(payload_at(&value, "/0/Content/$binary")),
            json!({ "Elements": [ { "AssetName": "chair", "InventoryId": null }, {} ] })
        );
    }

    #[test]
    fn test_input_is_not_mutated() {
        let inner = json!({ "Elements": [ { "AssetName": "pet" } ] });
        let tree = json!({ "Content": { "$binary": encode(&inner) } });
        let before = tree.clone();
        let _ = PayloadFilter::default().apply(&tree);
        assert_eq!(tree, before);
    }

    #[test]
    fn test_malformed_payload_is_isolated() {
        let inner = json!({ "Elements": [ { "AssetName": "petunia" } ] });
        let tree = json!({
            "Items": [
                { "Content": { "$binary": "!!! not base64 !!!" } },
                { "Content": { "$binary": encode(&inner) } }
            ]
        });

        let Filtered { value, report } = PayloadFilter::default().apply(&tree);
        assert_eq!(report.transformed, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path.to_string(), "Items[0].Content");
        assert!(matches!(
            report.failures[0].reason,
            FilterFailure::InvalidBase64(_)
        ));
        assert_eq!(value["Items"][0], tree["Items"][0]);
        assert_eq!(
            decode(payload_at(&value, "/Items/1/Content/$binary")),
            json!({ "Elements": [] })
        );
    }

    #[test]
    fn test_decode_failure_kinds() {
        let filter = PayloadFilter::default();
        let not_utf8 = encode_base64(&[0xff, 0xfe]);
        let not_json = encode_base64(b"{ nope");

        assert!(matches!(
            filter.filter_payload(&not_utf8),
            Err(FilterFailure::InvalidUtf8(_))
        ));
        assert!(matches!(
            filter.filter_payload(&not_json),
            Err(FilterFailure::InvalidJson(_))
        ));
        assert_eq!(
            filter.rewrite_content(&json!({ "$binary": 5 })),
            Err(FilterFailure::NotAString)
        );
    }

    #[test]
    fn test_other_content_keys_are_kept() {
        let inner = json!({ "Elements": [] });
        let tree = json!({ "Content": { "Kind": "layout", "$binary": encode(&inner) } });
        let Filtered { value, .. } = PayloadFilter::default().apply(&tree);
        assert_eq!(value["Content"]["Kind"], "layout");
    }

    #[test]
    fn test_nested_matches_and_non_candidates() {
        let inner = json!({ "Elements": [ { "AssetName": "puppet" }, { "AssetName": "desk" } ] });
        let tree = json!({
            "Rooms": [
                { "Content": { "$binary": encode(&inner) } },
                { "Content": { "Nested": { "Content": { "$binary": encode(&inner) } } } },
                { "Content": "plain text" }
            ]
        });

        let Filtered { value, report } = PayloadFilter::default().apply(&tree);
        assert_eq!(report.transformed, 2);
        assert_eq!(report.removed_elements, 2);
        assert_eq!(value["Rooms"][2], json!({ "Content": "plain text" }));
        let expected = json!({ "Elements": [ { "AssetName": "desk" } ] });
        assert_eq!(
            decode(payload_at(&value, "/Rooms/1/Content/Nested/Content/$binary")),
            expected
        );
    }

    #[test]
    fn test_inventory_and_name_rules() {
        let inner = json!({
            "Elements": [
                { "AssetName": "red_pet_hat", "InventoryId": null },
                { "AssetName": "blue_hat", "InventoryId": "abc" },
                { "AssetName": "green_hat", "InventoryId": null }
            ]
        });
        let tree = json!({ "Content": { "$binary": encode(&inner) } });

        let Filtered { value, report } = PayloadFilter::new("pet").apply(&tree);
        assert_eq!(report.removed_elements, 2);
        assert_eq!(
            decode(payload_at(&value, "/Content/$binary")),
            json!({ "Elements": [ { "AssetName": "green_hat", "InventoryId": null } ] })
        );
    }

    #[test]
    fn test_content_beside_payload_is_filtered() {
        let inner = json!({ "Elements": [ { "AssetName": "pet_bed" }, { "AssetName": "rug" } ] });
        let tree = json!({
            "Content": {
                "$binary": encode(&inner),
                "Meta": { "Content": { "$binary": encode(&inner) } }
            }
        });

        let Filtered { value, report } = PayloadFilter::default().apply(&tree);
        assert_eq!(report.transformed, 2);
        assert_eq!(report.removed_elements, 2);
        let expected = json!({ "Elements": [ { "AssetName": "rug" } ] });
        assert_eq!(decode(payload_at(&value, "/Content/$binary")), expected);
        assert_eq!(
            decode(payload_at(&value, "/Content/Meta/Content/$binary")),
            expected
        );
    }

    #[test]
    fn test_payload_without_elements_is_reencoded() {
        let inner = json!({ "Title": "Room" });
        let tree = json!({ "Content": { "$binary": encode(&inner) } });
        let Filtered { value, report } = PayloadFilter::new("x").apply(&tree);
        assert_eq!(report.transformed, 1);
        assert_eq!(decode(payload_at(&value, "/Content/$binary")), inner);
    }

    #[test]
    fn test_filter_file_in_place() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.json");
        let inner = json!({ "Elements": [ { "AssetName": "sofa" }, { "AssetName": "carpet" } ] });
        let tree = json!([{ "Content": { "$binary": encode(&inner) } }]);
        fs::write(&path, serde_json::to_string(&tree).unwrap()).unwrap();

        let report = PayloadFilter::new("carpet").filter_file(&path).unwrap();
        assert_eq!(report.removed_elements, 1);

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("[\n    {\n        \"Content\""));
        let value: JsonValue = serde_json::from_str(&text).unwrap();
        assert_eq!(
            decode(payload_at(&value, "/0/Content/$binary")),
            json!({ "Elements": [ { "AssetName": "sofa" } ] })
        );
    }
}
