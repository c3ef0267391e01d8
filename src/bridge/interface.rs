//! Service interfaces derived from method signatures
//!
//! A [`ServiceInterface`] is the input/output record type pair of one method.
//! The [`InterfaceCache`] derives each signature once and hands out the shared
//! instance afterwards; interfaces compare equal exactly when they come from
//! the same signature.

use parking_lot::{ReentrantMutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

use super::config::BridgeConfig;
use super::error::{BridgeError, BridgeResult};
use super::native::{NativeClass, NativeMethod, SignatureId};
use super::record::{Field, RecordType};
use super::structure::StructureBuilder;

/// Input/output record types of one method signature.
pub struct ServiceInterface {
    method: Arc<NativeMethod>,
    input: Arc<RecordType>,
    output: Arc<RecordType>,
    parent: Option<Weak<ServiceInterface>>,
}

impl ServiceInterface {
    /// Signature this interface was derived from.
    pub fn signature(&self) -> SignatureId {
        self.method.signature()
    }

    /// Method this interface was derived from.
    pub fn method(&self) -> &Arc<NativeMethod> {
        &self.method
    }

    /// `<declaring-type>.<method>`.
    pub fn id(&self) -> String {
        format!("{}.{}", self.method.declaring_name(), self.method.name())
    }

    /// Input record type: one field per parameter, in parameter order.
    pub fn input(&self) -> &Arc<RecordType> {
        &self.input
    }

    /// Output record type: no field for void methods, else exactly one.
    pub fn output(&self) -> &Arc<RecordType> {
        &self.output
    }

    /// The sole output field, if the method returns a value.
    pub fn output_field(&self) -> Option<&Field> {
        self.output.fields.first()
    }

    /// Interface of the interface method this one overrides.
    pub fn parent(&self) -> Option<Arc<ServiceInterface>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// Whether `other` is this interface or one of its ancestors.
    pub fn is_implementation_of(&self, other: &ServiceInterface) -> bool {
        if self == other {
            return true;
        }
        let mut current = self.parent();
        while let Some(iface) = current {
            if *iface == *other {
                return true;
            }
            current = iface.parent();
        }
        false
    }
}

impl PartialEq for ServiceInterface {
    fn eq(&self, other: &Self) -> bool {
        self.signature() == other.signature()
    }
}

impl Eq for ServiceInterface {}

impl Hash for ServiceInterface {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.signature().hash(state);
    }
}

impl fmt::Display for ServiceInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}()", self.id())
    }
}

impl fmt::Debug for ServiceInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceInterface")
            .field("id", &self.id())
            .field("input", &self.input)
            .field("output", &self.output)
            .field("parent", &self.parent().map(|p| p.id()))
            .finish()
    }
}

/// Signature-keyed cache of derived interfaces.
pub struct InterfaceCache {
    config: BridgeConfig,
    builder: StructureBuilder,
    interfaces: RwLock<HashMap<SignatureId, Arc<ServiceInterface>>>,
    // Re-entrant: deriving an interface derives its parent inside the section.
    construction: ReentrantMutex<()>,
}

impl InterfaceCache {
    /// Create an empty cache.
    pub fn new(config: BridgeConfig, builder: StructureBuilder) -> Self {
        Self {
            config,
            builder,
            interfaces: RwLock::new(HashMap::new()),
            construction: ReentrantMutex::new(()),
        }
    }

    /// Naming configuration.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Field builder.
    pub fn builder(&self) -> &StructureBuilder {
        &self.builder
    }

    /// Number of cached interfaces.
    pub fn len(&self) -> usize {
        self.interfaces.read().len()
    }

    /// Whether nothing has been derived yet.
    pub fn is_empty(&self) -> bool {
        self.interfaces.read().is_empty()
    }

    fn cached(&self, signature: SignatureId) -> Option<Arc<ServiceInterface>> {
        self.interfaces.read().get(&signature).cloned()
    }

    /// Interface of a method, derived on first use.
    ///
    /// Failed derivations are not cached.
    pub fn derive(&self, method: &Arc<NativeMethod>) -> BridgeResult<Arc<ServiceInterface>> {
        if let Some(iface) = self.cached(method.signature()) {
            trace!(method = %method, "interface cache hit");
            return Ok(iface);
        }

        let _guard = self.construction.lock();
        if let Some(iface) = self.cached(method.signature()) {
            return Ok(iface);
        }

        let iface = Arc::new(self.build(method)?);
        debug!(
            interface = %iface,
            parent = ?iface.parent().map(|p| p.id()),
            "derived service interface"
        );
        self.interfaces
            .write()
            .insert(method.signature(), iface.clone());
        Ok(iface)
    }

    /// Interface of the first visible public instance method with the given name.
    pub fn derive_named(
        &self,
        class: &NativeClass,
        name: &str,
    ) -> BridgeResult<Arc<ServiceInterface>> {
        let method = class
            .visible_methods()
            .into_iter()
            .filter(|method| method.is_public() && !method.is_static())
            .find(|method| method.name() == name)
            .ok_or_else(|| BridgeError::MethodNotFound {
                class: class.name().to_string(),
                method: name.to_string(),
            })?;
        self.derive(&method)
    }

    fn build(&self, method: &Arc<NativeMethod>) -> BridgeResult<ServiceInterface> {
        let class = method.declaring_class();
        let parent = match &class {
            Some(class) => self.find_parent(class, method)?,
            None => None,
        };

        let namespace = class
            .as_ref()
            .and_then(|class| class.namespace().map(str::to_string))
            .unwrap_or_else(|| method.declaring_name().to_string());
        let operation = method.operation().unwrap_or(method.name()).to_string();

        let mut input = RecordType::new(operation.clone(), namespace.clone());
        for (i, param) in method.params().iter().enumerate() {
            let name = param
                .name
                .clone()
                .unwrap_or_else(|| format!("{}{}", self.config.positional_prefix, i));
            input
                .fields
                .push(self.builder.describe(&param.ty, None, &name, param.non_null)?);
        }

        let result = method.result();
        let mut output = RecordType::new(
            format!("{}{}", operation, self.config.response_suffix),
            result.namespace.clone().unwrap_or(namespace),
        );
        if !method.is_void() {
            let name = result
                .name
                .clone()
                .unwrap_or_else(|| self.config.response_field.clone());
            output
                .fields
                .push(self.builder.describe(method.returns(), None, &name, false)?);
        }

        Ok(ServiceInterface {
            method: method.clone(),
            input: Arc::new(input),
            output: Arc::new(output),
            parent: parent.as_ref().map(Arc::downgrade),
        })
    }

    fn find_parent(
        &self,
        class: &NativeClass,
        method: &NativeMethod,
    ) -> BridgeResult<Option<Arc<ServiceInterface>>> {
        for iface in class.interfaces() {
            if let Some(declared) = iface
                .visible_methods()
                .into_iter()
                .find(|candidate| candidate.overrides(method))
            {
                return self.derive(&declared).map(Some);
            }
        }
        Ok(None)
    }
}
