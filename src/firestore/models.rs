//! Firestore REST wire types, limited to what reads need.

use super::FirestoreError;
use crate::store::StoredDocument;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value as Json};
use std::collections::HashMap;

#[derive(Deserialize, Debug, Clone)]
pub struct Document {
    /// Full resource name, ending in `<collection>/<id>`.
    pub name: String,
    #[serde(default)]
    pub fields: HashMap<String, Value>,
}

impl Document {
    /// Flattens the typed fields into a plain JSON object keyed by document id.
    pub fn into_stored(self) -> Result<StoredDocument, FirestoreError> {
        let id = self.name.rsplit('/').next().unwrap_or_default().to_string();
        Ok(StoredDocument {
            id,
            data: fields_to_json(self.fields)?,
        })
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct Value {
    #[serde(flatten)]
    pub value_type: ValueType,
}

/// One of Firestore's typed value encodings.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub enum ValueType {
    NullValue(()),
    BooleanValue(bool),
    // 64-bit integers travel as decimal strings.
    IntegerValue(String),
    DoubleValue(f64),
    TimestampValue(String),
    StringValue(String),
    BytesValue(String),
    ReferenceValue(String),
    GeoPointValue(GeoPoint),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

#[derive(Deserialize, Debug, Clone)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ArrayValue {
    #[serde(default)]
    pub values: Vec<Value>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct MapValue {
    #[serde(default)]
    pub fields: HashMap<String, Value>,
}

impl Value {
    pub fn into_json(self) -> Result<Json, FirestoreError> {
        let json = match self.value_type {
            ValueType::NullValue(()) => Json::Null,
            ValueType::BooleanValue(b) => Json::Bool(b),
            ValueType::IntegerValue(raw) => {
                let n: i64 = raw.parse().map_err(|_| {
                    <serde_json::Error as serde::de::Error>::custom(format!(
                        "integerValue '{}' is not an i64",
                        raw
                    ))
                })?;
                Json::from(n)
            }
            ValueType::DoubleValue(d) => Number::from_f64(d).map(Json::Number).ok_or_else(|| {
                <serde_json::Error as serde::de::Error>::custom(format!(
                    "doubleValue {} has no JSON form",
                    d
                ))
            })?,
            ValueType::TimestampValue(s)
            | ValueType::StringValue(s)
            | ValueType::BytesValue(s)
            | ValueType::ReferenceValue(s) => Json::String(s),
            ValueType::GeoPointValue(GeoPoint {
                latitude,
                longitude,
            }) => serde_json::json!({ "latitude": latitude, "longitude": longitude }),
            ValueType::ArrayValue(array) => Json::Array(
                array
                    .values
                    .into_iter()
                    .map(Value::into_json)
                    .collect::<Result<_, _>>()?,
            ),
            ValueType::MapValue(map) => fields_to_json(map.fields)?,
        };
        Ok(json)
    }
}

pub fn fields_to_json(fields: HashMap<String, Value>) -> Result<Json, FirestoreError> {
    fields
        .into_iter()
        .map(|(name, value)| Ok((name, value.into_json()?)))
        .collect::<Result<Map<_, _>, FirestoreError>>()
        .map(Json::Object)
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryRequest {
    pub structured_query: StructuredQuery,
}

#[derive(Serialize, Debug, Clone)]
pub struct StructuredQuery {
    pub from: Vec<CollectionSelector>,
    pub limit: i32,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSelector {
    pub collection_id: String,
}

/// One element of the `runQuery` response stream. Elements without a
/// document only carry the read time.
#[derive(Deserialize, Debug, Clone)]
pub struct RunQueryResponse {
    pub document: Option<Document>,
}
