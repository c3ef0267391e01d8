//! JSON views of bridge values and record types, used for inspection and by
//! the CLI.

use serde_json::{Map, Number, Value as Json, json};

use crate::bridge::record::{FieldKind, MaxOccurs, Record, RecordType};
use crate::bridge::types::{SharedMap, Value};

/// Render a bridge value as JSON.
pub fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(flag) => Json::Bool(*flag),
        Value::Int(num) => Json::Number((*num).into()),
        Value::Float(num) => Number::from_f64(*num).map_or(Json::Null, Json::Number),
        Value::Char(ch) => Json::String(ch.to_string()),
        Value::String(text) => Json::String(text.clone()),
        Value::Bytes(bytes) => Json::Array(bytes.iter().map(|b| Json::from(*b)).collect()),
        Value::List(items) | Value::Array(items) => {
            Json::Array(items.iter().map(value_to_json).collect())
        }
        Value::Map(map) => {
            let mut object = Map::new();
            for key in map.keys() {
                let value = map.get(&key).unwrap_or_default();
                object.insert(key, value_to_json(&value));
            }
            Json::Object(object)
        }
        Value::Record(record) => record_to_json(record),
        Value::Object(bean) => Json::Object(
            bean.properties
                .iter()
                .map(|(name, value)| (name.clone(), value_to_json(value)))
                .collect(),
        ),
    }
}

/// Render a structural record as a JSON object keyed by field name.
pub fn record_to_json(record: &Record) -> Json {
    Json::Object(
        record
            .entries()
            .map(|(field, value)| (field.name.clone(), value_to_json(value)))
            .collect(),
    )
}

/// Read a JSON document as a bridge value: objects become shared maps,
/// integral numbers become integers.
pub fn json_to_value(json: &Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(flag) => Value::Bool(*flag),
        Json::Number(num) => match num.as_i64() {
            Some(int) => Value::Int(int),
            None => num.as_f64().map_or(Value::Null, Value::Float),
        },
        Json::String(text) => Value::String(text.clone()),
        Json::Array(items) => Value::List(items.iter().map(json_to_value).collect()),
        Json::Object(object) => Value::Map(
            object
                .iter()
                .map(|(key, value)| (key.clone(), json_to_value(value)))
                .collect::<SharedMap>(),
        ),
    }
}

/// Describe a record type: name, namespace and fields with occurrence bounds.
pub fn record_type_to_json(ty: &RecordType) -> Json {
    let fields: Vec<Json> = ty
        .fields
        .iter()
        .map(|field| {
            let kind = match &field.kind {
                FieldKind::Scalar(scalar) => json!(scalar.name),
                FieldKind::Record(record) => record_type_to_json(record),
            };
            let max_occurs = match field.max_occurs {
                MaxOccurs::Bounded(max) => json!(max),
                MaxOccurs::Unbounded => json!("unbounded"),
            };
            json!({
                "name": field.name,
                "type": kind,
                "minOccurs": field.min_occurs,
                "maxOccurs": max_occurs,
                "collection": field.collection.as_ref().map(|handler| handler.name()),
            })
        })
        .collect();
    json!({
        "name": ty.name,
        "namespace": ty.namespace,
        "fields": fields,
    })
}
