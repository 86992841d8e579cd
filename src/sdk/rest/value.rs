//! Firestore REST wire models and the JSON value codec.
//!
//! Firestore encodes every field as a single-key object naming its type:
//!
//! ```text
//! {"stringValue": "hi"}   {"integerValue": "42"}   {"mapValue": {"fields": {...}}}
//! ```
//!
//! Request bodies carry plain JSON, so values are converted in both
//! directions here. Integers travel as decimal strings.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Number, Value};

use crate::sdk::{Document, Fields};

/// Ordered Firestore field map.
pub type WireFields = IndexMap<String, FirestoreValue>;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum FirestoreValue {
    NullValue(()),
    BooleanValue(bool),
    IntegerValue(String),
    DoubleValue(f64),
    StringValue(String),
    TimestampValue(String),
    BytesValue(String), // base64
    ReferenceValue(String),
    GeoPointValue(GeoPoint),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GeoPoint {
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ArrayValue {
    #[serde(default)]
    pub values: Vec<FirestoreValue>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct MapValue {
    #[serde(default)]
    pub fields: WireFields,
}

/// A document as the REST API returns it.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WireDocument {
    /// `projects/{p}/databases/(default)/documents/{collection}/{id}`
    pub name: String,
    #[serde(default)]
    pub fields: WireFields,
    pub create_time: Option<String>,
    pub update_time: Option<String>,
}

impl WireDocument {
    pub fn into_document(self) -> Document {
        let id = self
            .name
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();

        Document {
            id,
            data: decode_fields(self.fields),
            create_time: self.create_time,
            update_time: self.update_time,
        }
    }
}

/// Body of create/patch requests.
#[derive(Serialize, Debug)]
pub struct WriteBody {
    pub fields: WireFields,
}

// =============================================================================
// Codec
// =============================================================================

pub fn encode(value: &Value) -> FirestoreValue {
    match value {
        Value::Null => FirestoreValue::NullValue(()),
        Value::Bool(b) => FirestoreValue::BooleanValue(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => FirestoreValue::IntegerValue(i.to_string()),
            // u64 beyond i64::MAX and all floats
            None => FirestoreValue::DoubleValue(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => FirestoreValue::StringValue(s.clone()),
        Value::Array(items) => FirestoreValue::ArrayValue(ArrayValue {
            values: items.iter().map(encode).collect(),
        }),
        Value::Object(map) => FirestoreValue::MapValue(MapValue {
            fields: encode_fields(map),
        }),
    }
}

pub fn encode_fields(fields: &Fields) -> WireFields {
    fields
        .iter()
        .map(|(key, value)| (key.clone(), encode(value)))
        .collect()
}

pub fn decode(value: FirestoreValue) -> Value {
    match value {
        FirestoreValue::NullValue(()) => Value::Null,
        FirestoreValue::BooleanValue(b) => Value::Bool(b),
        FirestoreValue::IntegerValue(s) => match s.parse::<i64>() {
            Ok(i) => Value::from(i),
            Err(_) => Value::String(s),
        },
        FirestoreValue::DoubleValue(d) => Number::from_f64(d)
            .map(Value::Number)
            // NaN and infinities have no JSON number form
            .unwrap_or_else(|| Value::String(d.to_string())),
        FirestoreValue::StringValue(s)
        | FirestoreValue::TimestampValue(s)
        | FirestoreValue::BytesValue(s)
        | FirestoreValue::ReferenceValue(s) => Value::String(s),
        FirestoreValue::GeoPointValue(point) => {
            json!({ "latitude": point.latitude, "longitude": point.longitude })
        }
        FirestoreValue::ArrayValue(array) => {
            Value::Array(array.values.into_iter().map(decode).collect())
        }
        FirestoreValue::MapValue(map) => Value::Object(decode_fields(map.fields)),
    }
}

pub fn decode_fields(fields: WireFields) -> Fields {
    fields
        .into_iter()
        .map(|(key, value)| (key, decode(value)))
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
