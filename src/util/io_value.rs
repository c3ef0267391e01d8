//! Export of bridge values as `preserves::IOValue`.
//!
//! Structural records become preserves records labelled with their type name
//! and holding their field values positionally. Beans and maps become records
//! of `<name value>` pairs.

use preserves::IOValue;

use crate::bridge::record::Record;
use crate::bridge::types::Value;

/// Label used for the null value.
pub const NULL_SYMBOL: &str = "null";
/// Label of exported key/value maps.
pub const MAP_LABEL: &str = "map";

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

fn named(name: &str, value: IOValue) -> IOValue {
    IOValue::record(IOValue::symbol(name.to_string()), vec![value])
}

/// Convert a bridge value into a preserves value.
pub fn value_to_io(value: &Value) -> IOValue {
    match value {
        Value::Null => IOValue::symbol(NULL_SYMBOL),
        Value::Bool(flag) => IOValue::new(*flag),
        Value::Int(num) => IOValue::new(*num),
        Value::Float(num) => IOValue::new(*num),
        Value::Char(ch) => IOValue::new(ch.to_string()),
        Value::String(text) => IOValue::new(text.clone()),
        Value::Bytes(bytes) => IOValue::new(hex(bytes)),
        Value::List(items) | Value::Array(items) => {
            let converted: Vec<IOValue> = items.iter().map(value_to_io).collect();
            IOValue::new(converted)
        }
        Value::Map(map) => {
            let entries: Vec<IOValue> = map
                .keys()
                .into_iter()
                .map(|key| {
                    let value = map.get(&key).unwrap_or_default();
                    named(&key, value_to_io(&value))
                })
                .collect();
            IOValue::record(IOValue::symbol(MAP_LABEL), entries)
        }
        Value::Record(record) => record_to_io(record),
        Value::Object(bean) => {
            let properties: Vec<IOValue> = bean
                .properties
                .iter()
                .map(|(name, value)| named(name, value_to_io(value)))
                .collect();
            IOValue::record(IOValue::symbol(bean.class.clone()), properties)
        }
    }
}

/// Convert a structural record into a preserves record labelled with its
/// type name.
pub fn record_to_io(record: &Record) -> IOValue {
    let fields: Vec<IOValue> = record.entries().map(|(_, value)| value_to_io(value)).collect();
    IOValue::record(IOValue::symbol(record.record_type().name.clone()), fields)
}
