//! Element predicate applied inside decoded payloads

use serde_json::Value as JsonValue;

use super::{ASSET_NAME_FIELD, ELEMENTS_FIELD, INVENTORY_ID_FIELD};

/// Keeps elements whose asset name does not contain the search key and
/// which are not bound to an inventory entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementFilter {
    search_key: String,
}

impl ElementFilter {
    pub fn new(search_key: impl Into<String>) -> Self {
        Self {
            search_key: search_key.into(),
        }
    }

    pub fn search_key(&self) -> &str {
        &self.search_key
    }

    /// Whether an element survives filtering
    ///
    /// A missing or non-string `AssetName` reads as the empty string. Only
    /// an absent or null `InventoryId` counts as unbound. Elements that are
    /// not objects are kept.
    pub fn keeps(&self, element: &JsonValue) -> bool {
        let Some(fields) = element.as_object() else {
            return true;
        };
        let name = fields
            .get(ASSET_NAME_FIELD)
            .and_then(JsonValue::as_str)
            .unwrap_or_default();
        let bound = fields
            .get(INVENTORY_ID_FIELD)
            .is_some_and(|id| !id.is_null());

        !name.contains(self.search_key.as_str()) && !bound
    }

    /// Drop rejected entries from the `Elements` array of a decoded payload
    ///
    /// Payloads that are not objects, or have no `Elements` array, are
    /// returned as they are.
    ///
    /// # Returns
    /// The rebuilt payload and the number of removed elements
    pub fn apply(&self, payload: JsonValue) -> (JsonValue, usize) {
        let JsonValue::Object(mut fields) = payload else {
            return (payload, 0);
        };

        let removed = match fields.get_mut(ELEMENTS_FIELD) {
            Some(JsonValue::Array(elements)) => {
                let before = elements.len();
                elements.retain(|element| self.keeps(element));
                before - elements.len()
            }
            _ => 0,
        };

        (JsonValue::Object(fields), removed)
    }
}
