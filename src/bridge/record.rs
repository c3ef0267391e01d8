//! Structural record types and record instances

use std::fmt;
use std::sync::Arc;

use super::collection::CollectionHandler;
use super::error::{BridgeError, BridgeResult};
use super::types::{NativeType, Value};

/// Named scalar type resolved by the type system.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScalarType {
    /// Scalar name (e.g. `string`, `long`, `bytes`)
    pub name: String,
}

impl ScalarType {
    /// Create a scalar type descriptor.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Upper occurrence bound of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxOccurs {
    /// At most this many values
    Bounded(u32),
    /// Collection-shaped: any number of values
    Unbounded,
}

/// Structural type of a field's values.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Scalar leaf
    Scalar(ScalarType),
    /// Nested record
    Record(Arc<RecordType>),
}

impl FieldKind {
    /// Name of the scalar or record type.
    pub fn type_name(&self) -> &str {
        match self {
            FieldKind::Scalar(scalar) => &scalar.name,
            FieldKind::Record(record) => &record.name,
        }
    }
}

/// One field ("element") of a record type.
#[derive(Clone)]
pub struct Field {
    /// Field name
    pub name: String,
    /// Declared native type, including type arguments
    pub native: NativeType,
    /// Structural type of a single value (the element type for collections)
    pub kind: FieldKind,
    /// Minimum occurrence: 0 (optional) or 1 (required)
    pub min_occurs: u32,
    /// Maximum occurrence
    pub max_occurs: MaxOccurs,
    /// Handler used to convert collection-shaped values, if any
    pub collection: Option<Arc<dyn CollectionHandler>>,
}

impl Field {
    /// Whether the field may be absent.
    pub fn is_optional(&self) -> bool {
        self.min_occurs == 0
    }

    /// Whether the field holds a collection.
    pub fn is_collection(&self) -> bool {
        self.max_occurs == MaxOccurs::Unbounded
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.native == other.native
            && self.kind == other.kind
            && self.min_occurs == other.min_occurs
            && self.max_occurs == other.max_occurs
            && self.collection.as_ref().map(|h| h.name())
                == other.collection.as_ref().map(|h| h.name())
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("native", &self.native.to_string())
            .field("type", &self.kind.type_name())
            .field("min_occurs", &self.min_occurs)
            .field("max_occurs", &self.max_occurs)
            .field("collection", &self.collection.as_ref().map(|h| h.name()))
            .finish()
    }
}

/// Named, namespaced, ordered list of fields.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordType {
    /// Record name
    pub name: String,
    /// Record namespace
    pub namespace: String,
    /// Fields in declaration order
    pub fields: Vec<Field>,
}

impl RecordType {
    /// Create an empty record type.
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            fields: Vec::new(),
        }
    }

    /// Look a field up by name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Position of a field by name.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }

    /// Create an empty instance of this record type.
    pub fn new_instance(self: &Arc<Self>) -> Record {
        Record::new(self.clone())
    }
}

/// Instance of a [`RecordType`]: an ordered mapping from field name to value.
#[derive(Debug, Clone)]
pub struct Record {
    ty: Arc<RecordType>,
    values: Vec<Value>,
}

impl Record {
    /// Create a record with every field unset.
    pub fn new(ty: Arc<RecordType>) -> Self {
        let values = vec![Value::Null; ty.fields.len()];
        Self { ty, values }
    }

    /// The record's type.
    pub fn record_type(&self) -> &Arc<RecordType> {
        &self.ty
    }

    /// Value of a declared field, `None` if the field is not declared.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.ty.position(name).map(|idx| &self.values[idx])
    }

    /// Value of a field, [`Value::Null`] if unset or undeclared.
    pub fn value(&self, name: &str) -> &Value {
        self.get(name).unwrap_or(&Value::Null)
    }

    /// Value at a field position, [`Value::Null`] past the end.
    pub fn get_at(&self, index: usize) -> &Value {
        self.values.get(index).unwrap_or(&Value::Null)
    }

    /// Assign a declared field.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> BridgeResult<()> {
        let idx = self.ty.position(name).ok_or_else(|| BridgeError::UnknownField {
            record: self.ty.name.clone(),
            field: name.to_string(),
        })?;
        self.values[idx] = value.into();
        Ok(())
    }

    /// Builder-style [`Record::set`].
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> BridgeResult<Self> {
        self.set(name, value)?;
        Ok(self)
    }

    /// Fields paired with their values, in declaration order.
    pub fn entries(&self) -> impl Iterator<Item = (&Field, &Value)> {
        self.ty.fields.iter().zip(self.values.iter())
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        (Arc::ptr_eq(&self.ty, &other.ty) || self.ty == other.ty) && self.values == other.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar_field(name: &str) -> Field {
        Field {
            name: name.to_string(),
            native: NativeType::string(),
            kind: FieldKind::Scalar(ScalarType::new("string")),
            min_occurs: 0,
            max_occurs: MaxOccurs::Bounded(1),
            collection: None,
        }
    }

    #[test]
    fn unset_fields_read_as_null() {
        let mut ty = RecordType::new("greet", "demo");
        ty.fields.push(scalar_field("name"));
        let record = Arc::new(ty).new_instance();
        assert_eq!(record.get("name"), Some(&Value::Null));
        assert_eq!(record.get("missing"), None);
    }

    #[test]
    fn setting_an_undeclared_field_fails() {
        let record = Arc::new(RecordType::new("empty", "demo")).new_instance();
        let err = record.with("nope", "x").expect_err("undeclared field");
        assert!(matches!(err, BridgeError::UnknownField { .. }));
    }
}
