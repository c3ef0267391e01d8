//! Services and method-backed service descriptors

use parking_lot::RwLock;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::trace;

use super::context::{EXECUTION_CONTEXT_TYPE, ExecutionContext, SERVICE_RUNTIME_TYPE};
use super::error::BridgeResult;
use super::instance::MethodServiceInstance;
use super::interface::{InterfaceCache, ServiceInterface};
use super::native::{NativeClass, NativeMethod};
use super::record::Record;
use super::types::NativeType;

/// One execution of a service.
pub trait ServiceInstance {
    /// Execute with an input record under a context.
    fn execute(
        &self,
        context: &ExecutionContext,
        input: Option<Record>,
    ) -> BridgeResult<Option<Record>>;
}

/// Structural service: a declared interface plus a way to execute it.
pub trait Service: Send + Sync {
    /// Declared input/output interface.
    fn service_interface(&self) -> BridgeResult<Arc<ServiceInterface>>;

    /// Fresh instance for one execution.
    fn new_instance(&self) -> Box<dyn ServiceInstance + '_>;

    /// Stable identifier.
    fn id(&self) -> Option<String> {
        None
    }

    /// Human description.
    fn description(&self) -> Option<String> {
        None
    }
}

/// Owner field receiving an injected capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionSlot {
    /// Field name on the owner class
    pub field: String,
}

fn find_slot(class: &NativeClass, marker: &str) -> Option<InjectionSlot> {
    let marker = NativeType::class(marker);
    class
        .fields()
        .iter()
        .find(|field| field.ty == marker)
        .map(|field| InjectionSlot {
            field: field.name.clone(),
        })
}

/// A class method exposed as a service.
pub struct MethodService {
    class: Arc<NativeClass>,
    method: Arc<NativeMethod>,
    interfaces: Arc<InterfaceCache>,
    interface: RwLock<Option<Arc<ServiceInterface>>>,
    context_slot: Option<InjectionSlot>,
    runtime_slot: Option<InjectionSlot>,
    description: OnceLock<Option<String>>,
}

impl MethodService {
    /// Describe `method` of `class`; injection slots are discovered here.
    pub fn new(
        interfaces: Arc<InterfaceCache>,
        class: Arc<NativeClass>,
        method: Arc<NativeMethod>,
    ) -> Self {
        let context_slot = find_slot(&class, EXECUTION_CONTEXT_TYPE);
        let runtime_slot = find_slot(&class, SERVICE_RUNTIME_TYPE);
        Self {
            class,
            method,
            interfaces,
            interface: RwLock::new(None),
            context_slot,
            runtime_slot,
            description: OnceLock::new(),
        }
    }

    /// Owner class.
    pub fn class(&self) -> &Arc<NativeClass> {
        &self.class
    }

    /// Wrapped method.
    pub fn method(&self) -> &Arc<NativeMethod> {
        &self.method
    }

    /// Interface cache this descriptor derives through.
    pub fn interfaces(&self) -> &Arc<InterfaceCache> {
        &self.interfaces
    }

    /// Field receiving the execution context, if any.
    pub fn context_slot(&self) -> Option<&InjectionSlot> {
        self.context_slot.as_ref()
    }

    /// Field receiving the runtime handle, if any.
    pub fn runtime_slot(&self) -> Option<&InjectionSlot> {
        self.runtime_slot.as_ref()
    }

    /// `<owner>.<method>`.
    pub fn service_id(&self) -> String {
        format!("{}.{}", self.class.name(), self.method.name())
    }

    /// Derived interface, resolved once per descriptor.
    pub fn interface(&self) -> BridgeResult<Arc<ServiceInterface>> {
        if let Some(iface) = self.interface.read().as_ref() {
            return Ok(iface.clone());
        }
        let mut slot = self.interface.write();
        if let Some(iface) = slot.as_ref() {
            return Ok(iface.clone());
        }
        let iface = self.interfaces.derive(&self.method)?;
        trace!(service = %self, "resolved descriptor interface");
        *slot = Some(iface.clone());
        Ok(iface)
    }

    /// Description metadata, trimmed; blank descriptions count as absent.
    pub fn description_text(&self) -> Option<&str> {
        self.description
            .get_or_init(|| {
                self.method
                    .description()
                    .map(str::trim)
                    .filter(|text| !text.is_empty())
                    .map(str::to_string)
            })
            .as_deref()
    }
}

impl Service for MethodService {
    fn service_interface(&self) -> BridgeResult<Arc<ServiceInterface>> {
        self.interface()
    }

    fn new_instance(&self) -> Box<dyn ServiceInstance + '_> {
        Box::new(MethodServiceInstance::new(self))
    }

    fn id(&self) -> Option<String> {
        Some(self.service_id())
    }

    fn description(&self) -> Option<String> {
        self.description_text().map(str::to_string)
    }
}

impl fmt::Display for MethodService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MethodService:{}", self.service_id())
    }
}

impl fmt::Debug for MethodService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodService")
            .field("id", &self.service_id())
            .field("context_slot", &self.context_slot)
            .field("runtime_slot", &self.runtime_slot)
            .finish()
    }
}
