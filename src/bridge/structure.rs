//! Structural type builder
//!
//! Turns a native type into a record field: a scalar or nested record,
//! with occurrence bounds and, for collection shapes, the handler that
//! converts its values.

use std::sync::Arc;

use super::collection::CollectionHandlers;
use super::error::{BridgeError, BridgeResult};
use super::record::{Field, FieldKind, MaxOccurs, ScalarType};
use super::typesys::TypeSystem;
use super::types::NativeType;

/// Scalar name used for opaque byte arrays.
pub const BYTES_SCALAR: &str = "bytes";

/// Describe one native type as a record field.
///
/// Byte arrays are opaque scalars. Arrays and types with a registered
/// collection handler become unbounded fields of their component type. The
/// minimum occurrence is 1 for primitives or when `non_null` is set, else 0.
pub fn describe(
    types: &dyn TypeSystem,
    collections: &CollectionHandlers,
    native: &NativeType,
    generic: Option<&NativeType>,
    name: &str,
    non_null: bool,
) -> BridgeResult<Field> {
    let generic = generic.unwrap_or(native);
    let handler = match native {
        NativeType::Bytes => None,
        other => collections.for_type(other),
    };
    let actual = match &handler {
        Some(handler) => handler.component_type(generic),
        None => native.clone(),
    };

    let kind = if actual == NativeType::Bytes {
        FieldKind::Scalar(ScalarType::new(BYTES_SCALAR))
    } else if let Some(scalar) = types.resolve_scalar(&actual) {
        FieldKind::Scalar(scalar)
    } else if let Some(record) = types.resolve_record(&actual)? {
        FieldKind::Record(record)
    } else {
        return Err(BridgeError::unresolved(native));
    };

    let min_occurs = if non_null || native.is_primitive() { 1 } else { 0 };
    let max_occurs = if handler.is_some() {
        MaxOccurs::Unbounded
    } else {
        MaxOccurs::Bounded(1)
    };

    Ok(Field {
        name: name.to_string(),
        native: native.clone(),
        kind,
        min_occurs,
        max_occurs,
        collection: handler,
    })
}

/// Pairing of a type system and collection handlers that describes fields.
#[derive(Clone)]
pub struct StructureBuilder {
    types: Arc<dyn TypeSystem>,
    collections: Arc<CollectionHandlers>,
}

impl StructureBuilder {
    /// Create a builder over the given collaborators.
    pub fn new(types: Arc<dyn TypeSystem>, collections: Arc<CollectionHandlers>) -> Self {
        Self { types, collections }
    }

    /// The structural type system.
    pub fn types(&self) -> &Arc<dyn TypeSystem> {
        &self.types
    }

    /// The collection handler registry.
    pub fn collections(&self) -> &Arc<CollectionHandlers> {
        &self.collections
    }

    /// See [`describe`].
    pub fn describe(
        &self,
        native: &NativeType,
        generic: Option<&NativeType>,
        name: &str,
        non_null: bool,
    ) -> BridgeResult<Field> {
        describe(
            self.types.as_ref(),
            &self.collections,
            native,
            generic,
            name,
            non_null,
        )
    }
}
