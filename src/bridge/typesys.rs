//! Structural type system collaborator
//!
//! The bridge consumes the type system through [`TypeSystem`]. [`TypeRegistry`]
//! is the in-process default: built-in scalars plus registered bean classes
//! whose record types are derived with the same field rules as method
//! signatures.

use parking_lot::RwLock;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use super::collection::CollectionHandlers;
use super::convert::Converter;
use super::error::{BridgeError, BridgeResult};
use super::record::{Field, Record, RecordType, ScalarType};
use super::structure;
use super::types::{Bean, NativeType, Value};

/// Scalar name used for [`NativeType::Any`].
pub const ANY_SCALAR: &str = "object";
/// Record type name used for [`NativeType::Record`].
pub const OPEN_RECORD: &str = "record";

/// Structural type system consumed by the bridge.
pub trait TypeSystem: Send + Sync {
    /// Scalar type for a native type, if it is scalar.
    fn resolve_scalar(&self, ty: &NativeType) -> Option<ScalarType>;

    /// Record type for a native type, if it is record-shaped.
    fn resolve_record(&self, ty: &NativeType) -> BridgeResult<Option<Arc<RecordType>>>;

    /// Convert a record into an instance of the native type.
    fn as_bean(&self, record: &Record, target: &NativeType) -> BridgeResult<Value>;
}

/// Registered bean class: a name and ordered, typed properties.
#[derive(Debug, Clone, PartialEq)]
pub struct BeanDef {
    /// Fully qualified class name
    pub name: String,
    /// Properties in declaration order
    pub properties: Vec<(String, NativeType)>,
}

impl BeanDef {
    /// Bean without properties.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
        }
    }

    /// Append a property.
    pub fn property(mut self, name: impl Into<String>, ty: NativeType) -> Self {
        self.properties.push((name.into(), ty));
        self
    }
}

thread_local! {
    static BUILDING: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

/// Default type system: built-in scalars and registered beans.
pub struct TypeRegistry {
    scalars: RwLock<HashMap<String, ScalarType>>,
    beans: RwLock<HashMap<String, BeanDef>>,
    records: RwLock<HashMap<String, Arc<RecordType>>>,
    collections: Arc<CollectionHandlers>,
}

impl TypeRegistry {
    /// Registry with the built-in scalars.
    pub fn new(collections: Arc<CollectionHandlers>) -> Self {
        let registry = Self {
            scalars: RwLock::new(HashMap::new()),
            beans: RwLock::new(HashMap::new()),
            records: RwLock::new(HashMap::new()),
            collections,
        };
        for name in [
            "string",
            "boolean",
            "integer",
            "long",
            "double",
            "character",
            "bytes",
            ANY_SCALAR,
        ] {
            registry.register_scalar(name);
        }
        registry
    }

    /// Collection handlers used for bean properties.
    pub fn collections(&self) -> &Arc<CollectionHandlers> {
        &self.collections
    }

    /// Treat values of the named native class as scalars.
    pub fn register_scalar(&self, name: &str) {
        self.scalars
            .write()
            .insert(name.to_string(), ScalarType::new(name));
    }

    /// Register a bean class.
    pub fn register_bean(&self, bean: BeanDef) {
        self.records.write().remove(&bean.name);
        self.beans.write().insert(bean.name.clone(), bean);
    }

    /// Whether a bean class is registered.
    pub fn has_bean(&self, name: &str) -> bool {
        self.beans.read().contains_key(name)
    }

    fn build_bean_record(&self, bean: &BeanDef) -> BridgeResult<RecordType> {
        let cyclic = BUILDING.with(|stack| stack.borrow().contains(&bean.name));
        if cyclic {
            return Err(BridgeError::unresolved(&bean.name));
        }

        BUILDING.with(|stack| stack.borrow_mut().push(bean.name.clone()));
        let result = self.bean_fields(bean);
        BUILDING.with(|stack| {
            stack.borrow_mut().pop();
        });

        let (namespace, name) = match bean.name.rsplit_once('.') {
            Some((package, simple)) => (package.to_string(), simple.to_string()),
            None => (String::new(), bean.name.clone()),
        };
        let mut record = RecordType::new(name, namespace);
        record.fields = result?;
        Ok(record)
    }

    fn bean_fields(&self, bean: &BeanDef) -> BridgeResult<Vec<Field>> {
        bean.properties
            .iter()
            .map(|(name, ty)| structure::describe(self, &self.collections, ty, None, name, false))
            .collect()
    }
}

impl TypeSystem for TypeRegistry {
    fn resolve_scalar(&self, ty: &NativeType) -> Option<ScalarType> {
        match ty {
            NativeType::Void | NativeType::Record | NativeType::Array(_) => None,
            NativeType::Any => Some(ScalarType::new(ANY_SCALAR)),
            other => self.scalars.read().get(&other.boxed_name()).cloned(),
        }
    }

    fn resolve_record(&self, ty: &NativeType) -> BridgeResult<Option<Arc<RecordType>>> {
        if *ty == NativeType::Record {
            return Ok(Some(Arc::new(RecordType::new(OPEN_RECORD, ""))));
        }
        let name = ty.raw_name();
        if let Some(record) = self.records.read().get(&name) {
            return Ok(Some(record.clone()));
        }
        let Some(bean) = self.beans.read().get(&name).cloned() else {
            return Ok(None);
        };

        let record = Arc::new(self.build_bean_record(&bean)?);
        let mut records = self.records.write();
        Ok(Some(records.entry(name).or_insert(record).clone()))
    }

    fn as_bean(&self, record: &Record, target: &NativeType) -> BridgeResult<Value> {
        let name = target.raw_name();
        let bean = self
            .beans
            .read()
            .get(&name)
            .cloned()
            .ok_or_else(|| BridgeError::unresolved(target))?;

        let converter = Converter::new(self, &self.collections);
        let mut instance = Bean::new(bean.name.clone());
        for (property, ty) in &bean.properties {
            let value = record.value(property).clone();
            let converted = converter.to_native(property, value, ty)?;
            if !converted.is_null() {
                instance.properties.insert(property.clone(), converted);
            }
        }
        Ok(Value::Object(instance))
    }
}
