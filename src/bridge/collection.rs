//! Collection handler contract and the default handler registry
//!
//! A handler knows how to enumerate, index and construct one collection-like
//! native shape. The bridge only consumes this contract; the built-in
//! handlers cover lists, arrays and key/value maps. Arrays are always
//! collections, whatever the registry holds.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

use super::error::{BridgeError, BridgeResult};
use super::types::{LIST_TYPE, NativeType, SharedMap, Value};

/// Position of an element inside a collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CollectionIndex {
    /// Zero-based position in a sequence
    Position(usize),
    /// Key in a mapping
    Key(String),
}

impl fmt::Display for CollectionIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionIndex::Position(pos) => write!(f, "{}", pos),
            CollectionIndex::Key(key) => write!(f, "{}", key),
        }
    }
}

/// Strategy for one collection-shaped native type.
pub trait CollectionHandler: Send + Sync + fmt::Debug {
    /// Stable handler name, used for structural comparison of fields.
    fn name(&self) -> &str;

    /// Whether this handler manages values of the native type.
    fn handles_type(&self, ty: &NativeType) -> bool;

    /// Whether this handler manages the runtime value.
    fn handles_value(&self, value: &Value) -> bool;

    /// Element type, given the (possibly parameterized) collection type.
    fn component_type(&self, generic: &NativeType) -> NativeType;

    /// Indexes of the collection's elements, in iteration order.
    fn indexes(&self, collection: &Value) -> Vec<CollectionIndex>;

    /// Element at an index, [`Value::Null`] if absent.
    fn get(&self, collection: &Value, index: &CollectionIndex) -> Value;

    /// Store an element at an index.
    fn set(&self, collection: &mut Value, index: &CollectionIndex, item: Value) -> BridgeResult<()>;

    /// New, empty collection of the native type sized for `size` elements.
    fn create(&self, ty: &NativeType, size: usize) -> Value;
}

fn shape_mismatch(handler: &str, collection: &Value) -> BridgeError {
    BridgeError::CollectionShape {
        handler: handler.to_string(),
        kind: collection.kind().to_string(),
    }
}

fn store_at(items: &mut Vec<Value>, pos: usize, item: Value) {
    if pos >= items.len() {
        items.resize(pos + 1, Value::Null);
    }
    items[pos] = item;
}

/// Handler for `List<T>`.
#[derive(Debug, Default)]
pub struct ListHandler;

impl CollectionHandler for ListHandler {
    fn name(&self) -> &str {
        "list"
    }

    fn handles_type(&self, ty: &NativeType) -> bool {
        matches!(ty, NativeType::Class(_) | NativeType::Generic { .. })
            && ty.raw_name() == LIST_TYPE
    }

    fn handles_value(&self, value: &Value) -> bool {
        matches!(value, Value::List(_))
    }

    fn component_type(&self, generic: &NativeType) -> NativeType {
        generic.arguments().first().cloned().unwrap_or(NativeType::Any)
    }

    fn indexes(&self, collection: &Value) -> Vec<CollectionIndex> {
        let len = collection.as_slice().map(|items| items.len()).unwrap_or(0);
        (0..len).map(CollectionIndex::Position).collect()
    }

    fn get(&self, collection: &Value, index: &CollectionIndex) -> Value {
        match (collection, index) {
            (Value::List(items), CollectionIndex::Position(pos)) => {
                items.get(*pos).cloned().unwrap_or(Value::Null)
            }
            _ => Value::Null,
        }
    }

    fn set(
        &self,
        collection: &mut Value,
        index: &CollectionIndex,
        item: Value,
    ) -> BridgeResult<()> {
        let Value::List(items) = collection else {
            return Err(shape_mismatch(self.name(), collection));
        };
        match index {
            CollectionIndex::Position(pos) => store_at(items, *pos, item),
            CollectionIndex::Key(_) => items.push(item),
        }
        Ok(())
    }

    fn create(&self, _ty: &NativeType, size: usize) -> Value {
        Value::List(Vec::with_capacity(size))
    }
}

/// Handler for `T[]`.
#[derive(Debug, Default)]
pub struct ArrayHandler;

impl CollectionHandler for ArrayHandler {
    fn name(&self) -> &str {
        "array"
    }

    fn handles_type(&self, ty: &NativeType) -> bool {
        matches!(ty, NativeType::Array(_))
    }

    fn handles_value(&self, value: &Value) -> bool {
        matches!(value, Value::Array(_))
    }

    fn component_type(&self, generic: &NativeType) -> NativeType {
        match generic {
            NativeType::Array(element) => (**element).clone(),
            _ => NativeType::Any,
        }
    }

    fn indexes(&self, collection: &Value) -> Vec<CollectionIndex> {
        let len = collection.as_slice().map(|items| items.len()).unwrap_or(0);
        (0..len).map(CollectionIndex::Position).collect()
    }

    fn get(&self, collection: &Value, index: &CollectionIndex) -> Value {
        match (collection, index) {
            (Value::Array(items), CollectionIndex::Position(pos)) => {
                items.get(*pos).cloned().unwrap_or(Value::Null)
            }
            _ => Value::Null,
        }
    }

    fn set(
        &self,
        collection: &mut Value,
        index: &CollectionIndex,
        item: Value,
    ) -> BridgeResult<()> {
        match (collection, index) {
            (Value::Array(items), CollectionIndex::Position(pos)) => {
                store_at(items, *pos, item);
                Ok(())
            }
            (Value::Array(_), CollectionIndex::Key(key)) => Err(BridgeError::CollectionIndex {
                handler: self.name().to_string(),
                index: key.clone(),
            }),
            (other, _) => Err(shape_mismatch(self.name(), other)),
        }
    }

    fn create(&self, _ty: &NativeType, size: usize) -> Value {
        Value::Array(vec![Value::Null; size])
    }
}

/// Handler for `Map<string, V>`; indexes are the keys.
#[derive(Debug, Default)]
pub struct MapHandler;

impl CollectionHandler for MapHandler {
    fn name(&self) -> &str {
        "map"
    }

    fn handles_type(&self, ty: &NativeType) -> bool {
        ty.is_map()
    }

    fn handles_value(&self, value: &Value) -> bool {
        matches!(value, Value::Map(_))
    }

    fn component_type(&self, generic: &NativeType) -> NativeType {
        generic.arguments().get(1).cloned().unwrap_or(NativeType::Any)
    }

    fn indexes(&self, collection: &Value) -> Vec<CollectionIndex> {
        match collection {
            Value::Map(map) => map.keys().into_iter().map(CollectionIndex::Key).collect(),
            _ => Vec::new(),
        }
    }

    fn get(&self, collection: &Value, index: &CollectionIndex) -> Value {
        match collection {
            Value::Map(map) => map.get(&index.to_string()).unwrap_or(Value::Null),
            _ => Value::Null,
        }
    }

    fn set(
        &self,
        collection: &mut Value,
        index: &CollectionIndex,
        item: Value,
    ) -> BridgeResult<()> {
        let Value::Map(map) = collection else {
            return Err(shape_mismatch(self.name(), collection));
        };
        map.insert(index.to_string(), item);
        Ok(())
    }

    fn create(&self, _ty: &NativeType, _size: usize) -> Value {
        Value::Map(SharedMap::new())
    }
}

static ARRAYS: Lazy<Arc<dyn CollectionHandler>> = Lazy::new(|| Arc::new(ArrayHandler));

/// Ordered registry of collection handlers; the first matching handler wins.
///
/// Array types and values never consult the registry and always use
/// [`ArrayHandler`].
#[derive(Debug)]
pub struct CollectionHandlers {
    handlers: RwLock<Vec<Arc<dyn CollectionHandler>>>,
}

impl CollectionHandlers {
    /// Registry without any handler.
    pub fn empty() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
        }
    }

    /// Registry with the list and map handlers.
    pub fn with_builtins() -> Self {
        let registry = Self::empty();
        registry.register(Arc::new(ListHandler));
        registry.register(Arc::new(MapHandler));
        registry
    }

    /// Append a handler.
    pub fn register(&self, handler: Arc<dyn CollectionHandler>) {
        self.handlers.write().push(handler);
    }

    /// Handler for a native type.
    pub fn for_type(&self, ty: &NativeType) -> Option<Arc<dyn CollectionHandler>> {
        if ARRAYS.handles_type(ty) {
            return Some(Arc::clone(&ARRAYS));
        }
        self.handlers.read().iter().find(|h| h.handles_type(ty)).cloned()
    }

    /// Handler for a runtime value.
    pub fn for_value(&self, value: &Value) -> Option<Arc<dyn CollectionHandler>> {
        if ARRAYS.handles_value(value) {
            return Some(Arc::clone(&ARRAYS));
        }
        self.handlers.read().iter().find(|h| h.handles_value(value)).cloned()
    }
}

impl Default for CollectionHandlers {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::types::Primitive;

    #[test]
    fn list_component_comes_from_type_argument() {
        let handlers = CollectionHandlers::with_builtins();
        let ty = NativeType::list_of(NativeType::string());
        let handler = handlers.for_type(&ty).expect("list handler");
        assert_eq!(handler.name(), "list");
        assert_eq!(handler.component_type(&ty), NativeType::string());
        assert_eq!(handler.component_type(&NativeType::class("List")), NativeType::Any);
    }

    #[test]
    fn bytes_are_not_collections() {
        let handlers = CollectionHandlers::with_builtins();
        assert!(handlers.for_type(&NativeType::Bytes).is_none());
        assert!(handlers.for_value(&Value::Bytes(vec![1, 2])).is_none());
    }

    #[test]
    fn array_create_is_presized() {
        let handler = ArrayHandler;
        let ty = NativeType::array_of(NativeType::Primitive(Primitive::Int));
        let mut array = handler.create(&ty, 2);
        handler
            .set(&mut array, &CollectionIndex::Position(1), Value::Int(7))
            .unwrap();
        assert_eq!(array, Value::Array(vec![Value::Null, Value::Int(7)]));
    }

    #[test]
    fn arrays_do_not_need_a_registered_handler() {
        let handlers = CollectionHandlers::empty();
        let ty = NativeType::array_of(NativeType::Primitive(Primitive::Long));
        assert_eq!(handlers.for_type(&ty).map(|h| h.name().to_string()), Some("array".into()));
        assert!(handlers.for_value(&Value::Array(Vec::new())).is_some());
        assert!(handlers.for_type(&NativeType::list_of(NativeType::string())).is_none());
    }

    #[test]
    fn keyed_elements_do_not_fit_an_array() {
        let handler = ArrayHandler;
        let ty = NativeType::array_of(NativeType::string());
        let mut array = handler.create(&ty, 1);
        let err = handler
            .set(&mut array, &CollectionIndex::Key("name".into()), Value::from("x"))
            .expect_err("arrays are positional");
        assert!(matches!(err, BridgeError::CollectionIndex { ref index, .. } if index == "name"));
        assert_eq!(err.to_string(), "array handler cannot store an element at key 'name'");
    }

    #[test]
    fn map_indexes_are_keys() {
        let handler = MapHandler;
        let map = SharedMap::new();
        map.insert("b", Value::Int(2));
        map.insert("a", Value::Int(1));
        let value = Value::Map(map);
        assert_eq!(
            handler.indexes(&value),
            vec![CollectionIndex::Key("a".into()), CollectionIndex::Key("b".into())]
        );
        assert_eq!(handler.get(&value, &CollectionIndex::Key("b".into())), Value::Int(2));
    }
}
