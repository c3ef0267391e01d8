//! Structural-to-native value conversion
//!
//! Shared by the invocation engine (record field -> argument) and the proxy
//! (output field -> return value).

use std::sync::Arc;

use super::collection::{CollectionHandler, CollectionHandlers};
use super::error::{BridgeError, BridgeResult};
use super::typesys::TypeSystem;
use super::types::{NativeType, Value};

/// A shared map handed to a map-typed target is passed through untouched, so
/// mutations the callee makes stay visible to whoever holds the original.
pub fn is_shared_map_passthrough(value: &Value, target: &NativeType) -> bool {
    matches!(value, Value::Map(_)) && target.is_map()
}

/// Converts structural values into values of a native target type.
pub struct Converter<'a> {
    types: &'a dyn TypeSystem,
    collections: &'a CollectionHandlers,
}

impl<'a> Converter<'a> {
    /// Create a converter over the given collaborators.
    pub fn new(types: &'a dyn TypeSystem, collections: &'a CollectionHandlers) -> Self {
        Self { types, collections }
    }

    /// Convert `value`, read from the field `field`, for a target of type `target`.
    pub fn to_native(&self, field: &str, value: Value, target: &NativeType) -> BridgeResult<Value> {
        if value.is_null() {
            return Ok(value);
        }

        if let Some(source) = self.collections.for_value(&value) {
            if *target != NativeType::Any && !is_shared_map_passthrough(&value, target) {
                return self.convert_collection(field, source, value, target);
            }
        }

        if let Value::Record(record) = &value {
            if !matches!(target, NativeType::Any | NativeType::Record) {
                return self.types.as_bean(record, target);
            }
        }
        Ok(value)
    }

    fn convert_collection(
        &self,
        field: &str,
        source: Arc<dyn CollectionHandler>,
        value: Value,
        target: &NativeType,
    ) -> BridgeResult<Value> {
        let target_handler =
            self.collections
                .for_type(target)
                .ok_or_else(|| BridgeError::CollectionTargetMismatch {
                    field: field.to_string(),
                    target: target.to_string(),
                })?;

        let component = target_handler.component_type(target);
        let indexes = source.indexes(&value);
        let mut converted = target_handler.create(target, indexes.len());
        for index in &indexes {
            let mut item = source.get(&value, index);
            if let Value::Record(record) = &item {
                if !item.is_instance_of(&component) {
                    item = self.types.as_bean(record, &component)?;
                }
            }
            target_handler.set(&mut converted, index, item)?;
        }
        Ok(converted)
    }
}
