//! Native type shapes and runtime values
//!
//! Rust offers no runtime reflection, so the "native" side of the bridge is an
//! explicit model: a closed set of type shapes plus a dynamic [`Value`] that
//! method bodies consume and produce.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::record::Record;

/// Raw name of the built-in list type.
pub const LIST_TYPE: &str = "List";
/// Raw name of the built-in key/value mapping type.
pub const MAP_TYPE: &str = "Map";
/// Scalar type name for strings.
pub const STRING_TYPE: &str = "string";

/// Non-nullable scalar types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// `bool`
    Bool,
    /// 32-bit integer
    Int,
    /// 64-bit integer
    Long,
    /// 64-bit float
    Double,
    /// `char`
    Char,
}

impl Primitive {
    /// All primitive shapes.
    pub const ALL: [Primitive; 5] = [
        Primitive::Bool,
        Primitive::Int,
        Primitive::Long,
        Primitive::Double,
        Primitive::Char,
    ];

    /// Name of the nullable scalar this primitive boxes to.
    pub fn boxed_name(self) -> &'static str {
        match self {
            Primitive::Bool => "boolean",
            Primitive::Int => "integer",
            Primitive::Long => "long",
            Primitive::Double => "double",
            Primitive::Char => "character",
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            Primitive::Bool => "bool",
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Double => "double",
            Primitive::Char => "char",
        }
    }
}

/// Shape of a native parameter, field or return type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NativeType {
    /// No value
    Void,
    /// Non-nullable scalar
    Primitive(Primitive),
    /// Opaque byte array
    Bytes,
    /// Accepts any value
    Any,
    /// The structural record type itself
    Record,
    /// Fixed-shape array of the element type
    Array(Box<NativeType>),
    /// Named class without type arguments
    Class(String),
    /// Parameterized class such as `List<string>`
    Generic {
        /// Erased class name
        raw: String,
        /// Type arguments in declaration order
        arguments: Vec<NativeType>,
    },
}

impl NativeType {
    /// Named class type.
    pub fn class(name: impl Into<String>) -> Self {
        NativeType::Class(name.into())
    }

    /// The nullable string scalar.
    pub fn string() -> Self {
        NativeType::Class(STRING_TYPE.to_string())
    }

    /// `List<element>`.
    pub fn list_of(element: NativeType) -> Self {
        NativeType::Generic {
            raw: LIST_TYPE.to_string(),
            arguments: vec![element],
        }
    }

    /// `Map<string, value>`.
    pub fn map_of(value: NativeType) -> Self {
        NativeType::Generic {
            raw: MAP_TYPE.to_string(),
            arguments: vec![NativeType::string(), value],
        }
    }

    /// `element[]`.
    pub fn array_of(element: NativeType) -> Self {
        NativeType::Array(Box::new(element))
    }

    /// Whether values of this type can never be absent.
    pub fn is_primitive(&self) -> bool {
        matches!(self, NativeType::Primitive(_))
    }

    /// Class name with type arguments erased.
    pub fn raw_name(&self) -> String {
        match self {
            NativeType::Class(name) => name.clone(),
            NativeType::Generic { raw, .. } => raw.clone(),
            other => other.to_string(),
        }
    }

    /// Name used to look the type up as a scalar; primitives map to their boxed form.
    pub fn boxed_name(&self) -> String {
        match self {
            NativeType::Primitive(p) => p.boxed_name().to_string(),
            NativeType::Bytes => "bytes".to_string(),
            other => other.raw_name(),
        }
    }

    /// Type arguments, empty unless parameterized.
    pub fn arguments(&self) -> &[NativeType] {
        match self {
            NativeType::Generic { arguments, .. } => arguments,
            _ => &[],
        }
    }

    /// Whether this type is (a parameterization of) the key/value mapping type.
    pub fn is_map(&self) -> bool {
        matches!(self, NativeType::Class(_) | NativeType::Generic { .. })
            && self.raw_name() == MAP_TYPE
    }
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeType::Void => write!(f, "void"),
            NativeType::Primitive(p) => write!(f, "{}", p.keyword()),
            NativeType::Bytes => write!(f, "bytes"),
            NativeType::Any => write!(f, "any"),
            NativeType::Record => write!(f, "record"),
            NativeType::Array(element) => write!(f, "{}[]", element),
            NativeType::Class(name) => write!(f, "{}", name),
            NativeType::Generic { raw, arguments } => {
                write!(f, "{}<", raw)?;
                for (i, arg) in arguments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ">")
            }
        }
    }
}

/// Key/value mapping with reference semantics: clones share storage, so a
/// callee mutating the map is visible to the caller holding the original.
#[derive(Clone, Default)]
pub struct SharedMap(Arc<RwLock<BTreeMap<String, Value>>>);

impl SharedMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry.
    pub fn insert(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.write().insert(key.into(), value)
    }

    /// Fetch a copy of the entry.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.read().get(key).cloned()
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> Vec<String> {
        self.0.read().keys().cloned().collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    /// Whether the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    /// Whether both handles point at the same storage.
    pub fn ptr_eq(&self, other: &SharedMap) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for SharedMap {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.0.read() == *other.0.read()
    }
}

impl fmt::Debug for SharedMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.read().iter()).finish()
    }
}

impl FromIterator<(String, Value)> for SharedMap {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        SharedMap(Arc::new(RwLock::new(iter.into_iter().collect())))
    }
}

/// Instance of a registered bean class.
#[derive(Debug, Clone, PartialEq)]
pub struct Bean {
    /// Class name
    pub class: String,
    /// Property values by name
    pub properties: BTreeMap<String, Value>,
}

impl Bean {
    /// Create an empty bean of the given class.
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Builder-style property setter.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Property value, [`Value::Null`] if unset.
    pub fn get(&self, name: &str) -> &Value {
        self.properties.get(name).unwrap_or(&Value::Null)
    }
}

/// Native runtime value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent value
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// Integer (covers both integer widths)
    Int(i64),
    /// Floating point
    Float(f64),
    /// Character
    Char(char),
    /// UTF-8 string
    String(String),
    /// Opaque bytes
    Bytes(Vec<u8>),
    /// Ordered list
    List(Vec<Value>),
    /// Fixed-size array
    Array(Vec<Value>),
    /// Shared key/value mapping
    Map(SharedMap),
    /// Nested structural record
    Record(Record),
    /// Bean instance
    Object(Bean),
}

impl Value {
    /// Whether this is [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Assignability of this value to a native type.
    pub fn is_instance_of(&self, ty: &NativeType) -> bool {
        match (self, ty) {
            (Value::Null, ty) => !ty.is_primitive(),
            (_, NativeType::Any) => true,
            (Value::Bool(_), NativeType::Primitive(Primitive::Bool)) => true,
            (Value::Int(_), NativeType::Primitive(Primitive::Int | Primitive::Long)) => true,
            (Value::Float(_), NativeType::Primitive(Primitive::Double)) => true,
            (Value::Char(_), NativeType::Primitive(Primitive::Char)) => true,
            (Value::Bytes(_), NativeType::Bytes) => true,
            (Value::Array(_), NativeType::Array(_)) => true,
            (Value::Record(_), NativeType::Record) => true,
            (_, NativeType::Class(_) | NativeType::Generic { .. }) => {
                let raw = ty.raw_name();
                match self {
                    Value::Bool(_) => raw == "boolean",
                    Value::Int(_) => raw == "integer" || raw == "long",
                    Value::Float(_) => raw == "double",
                    Value::Char(_) => raw == "character",
                    Value::String(_) => raw == STRING_TYPE,
                    Value::List(_) => raw == LIST_TYPE,
                    Value::Map(_) => raw == MAP_TYPE,
                    Value::Object(bean) => bean.class == raw,
                    _ => false,
                }
            }
            _ => false,
        }
    }

    /// Short name of the value's shape, used in logs and error summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Char(_) => "char",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::List(_) => "list",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Record(_) => "record",
            Value::Object(_) => "object",
        }
    }

    /// Convenience accessor for string references.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(text) => Some(text),
            _ => None,
        }
    }

    /// Integer accessor.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(num) => Some(*num),
            _ => None,
        }
    }

    /// Boolean accessor.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(flag) => Some(*flag),
            _ => None,
        }
    }

    /// Nested record accessor.
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Bean accessor.
    pub fn as_object(&self) -> Option<&Bean> {
        match self {
            Value::Object(bean) => Some(bean),
            _ => None,
        }
    }

    /// Elements of a list or array.
    pub fn as_slice(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) | Value::Array(items) => Some(items),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::String(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::String(text)
    }
}

impl From<i64> for Value {
    fn from(num: i64) -> Self {
        Value::Int(num)
    }
}

impl From<i32> for Value {
    fn from(num: i32) -> Self {
        Value::Int(num as i64)
    }
}

impl From<f64> for Value {
    fn from(num: f64) -> Self {
        Value::Float(num)
    }
}

impl From<bool> for Value {
    fn from(flag: bool) -> Self {
        Value::Bool(flag)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Record(record)
    }
}

impl From<Bean> for Value {
    fn from(bean: Bean) -> Self {
        Value::Object(bean)
    }
}

impl From<SharedMap> for Value {
    fn from(map: SharedMap) -> Self {
        Value::Map(map)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}
