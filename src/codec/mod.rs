//! Type-tag codec between BSON values and tagged JSON
//!
//! BSON types that JSON cannot express are written as objects keyed by a
//! reserved tag:
//!
//! | BSON type | Tagged JSON |
//! |---|---|
//! | binary | `{"$binary": "<base64>"}` |
//! | ObjectId | `{"$oid": "<hex>"}` |
//! | reference | `{"$ref": "<collection>", "$id": "<id>"}` |
//! | timestamp | `{"$timestamp": {"t": <u32>, "i": <u32>}}` |
//! | decimal128 | `{"$numberDecimal": "<decimal>"}` |
//!
//! # Design
//!
//! Classification is an explicit match into the closed [`SpecialValue`]
//! enum. When reading JSON, tags are tested in [`TAG_PRIORITY`] order and
//! the first match wins, so `{"$oid": .., "$binary": ..}` is a blob.

mod helpers;
mod tags;

pub use helpers::{bson_type_name, decode_base64, encode_base64, id_string_form, parse_object_id};
pub use tags::{
    BINARY_TAG, DECIMAL_TAG, ID_TAG, LEGACY_BINARY_PREFIX, OID_TAG, REF_TAG, SpecialValue,
    TAG_PRIORITY, TIMESTAMP_TAG, Tag,
};
