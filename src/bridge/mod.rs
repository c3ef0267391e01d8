//! Service bridge
//!
//! Adapts between self-describing native classes and structural services in
//! both directions:
//!
//! - a class method becomes a [`MethodService`] whose input/output record
//!   types are derived from its signature ([`InterfaceCache`]) and which
//!   executes by converting record fields back into arguments;
//! - a set of services becomes a [`ServiceProxy`] implementing a native
//!   interface, translating each native call into a service execution.
//!
//! [`Bridge`] wires the collaborators together.

pub mod catalog;
pub mod collection;
pub mod config;
pub mod context;
pub mod convert;
pub mod error;
pub mod instance;
pub mod interface;
pub mod native;
pub mod proxy;
pub mod record;
pub mod resolver;
pub mod runtime;
pub mod service;
pub mod structure;
pub mod types;
pub mod typesys;

use std::sync::Arc;

pub use catalog::{ClassCatalog, GlobalLoader, TypeLoader};
pub use collection::{CollectionHandler, CollectionHandlers, CollectionIndex};
pub use config::BridgeConfig;
pub use context::{ExecutionContext, ExecutionContextProvider, FixedContextProvider, Token};
pub use error::{BridgeError, BridgeResult, LoadError, ServiceError};
pub use interface::{InterfaceCache, ServiceInterface};
pub use native::{Dispatch, MethodDef, NativeClass, NativeMethod, Parameter, Receiver};
pub use proxy::{ProxyBuilder, ServiceProxy};
pub use record::{Field, FieldKind, MaxOccurs, Record, RecordType};
pub use resolver::{
    InterfaceResolver, MethodInterfaceResolver, MethodResolver, ResolverChain, ServiceResolver,
};
pub use runtime::{InlineRunner, ServiceRunner, ServiceRuntime, ThreadRunner};
pub use service::{MethodService, Service, ServiceInstance};
pub use structure::StructureBuilder;
pub use types::{Bean, NativeType, Primitive, SharedMap, Value};
pub use typesys::{BeanDef, TypeRegistry, TypeSystem};

/// Entry point owning the bridge collaborators.
pub struct Bridge {
    config: BridgeConfig,
    interfaces: Arc<InterfaceCache>,
    loader: Arc<dyn TypeLoader>,
}

impl Bridge {
    /// Bridge over a type registry, loading classes from the global catalog.
    pub fn new(config: BridgeConfig, types: Arc<TypeRegistry>) -> Self {
        let collections = types.collections().clone();
        Self::with_type_system(config, types, collections)
    }

    /// Bridge over an arbitrary type system.
    pub fn with_type_system(
        config: BridgeConfig,
        types: Arc<dyn TypeSystem>,
        collections: Arc<CollectionHandlers>,
    ) -> Self {
        let builder = StructureBuilder::new(types, collections);
        Self {
            interfaces: Arc::new(InterfaceCache::new(config.clone(), builder)),
            config,
            loader: Arc::new(GlobalLoader),
        }
    }

    /// Replace the type loader used by resolvers.
    pub fn with_loader(mut self, loader: Arc<dyn TypeLoader>) -> Self {
        self.loader = loader;
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Structural type system.
    pub fn types(&self) -> &Arc<dyn TypeSystem> {
        self.interfaces.builder().types()
    }

    /// Collection handler registry.
    pub fn collections(&self) -> &Arc<CollectionHandlers> {
        self.interfaces.builder().collections()
    }

    /// Interface cache shared by every service this bridge hands out.
    pub fn interfaces(&self) -> &Arc<InterfaceCache> {
        &self.interfaces
    }

    /// Type loader used by resolvers.
    pub fn loader(&self) -> &Arc<dyn TypeLoader> {
        &self.loader
    }

    /// Interface of a method.
    pub fn interface(&self, method: &Arc<NativeMethod>) -> BridgeResult<Arc<ServiceInterface>> {
        self.interfaces.derive(method)
    }

    /// Service wrapping the first declared method `name` of `class`.
    pub fn service(&self, class: &Arc<NativeClass>, name: &str) -> BridgeResult<MethodService> {
        let method = class.method(name).ok_or_else(|| BridgeError::MethodNotFound {
            class: class.name().to_string(),
            method: name.to_string(),
        })?;
        Ok(MethodService::new(
            self.interfaces.clone(),
            class.clone(),
            method.clone(),
        ))
    }

    /// Resolver for `<class>.<method>` identifiers.
    pub fn resolver(&self) -> MethodResolver {
        MethodResolver::new(self.loader.clone(), self.interfaces.clone())
    }

    /// Resolver for `<interface>.<method>` identifiers.
    pub fn interface_resolver(&self) -> MethodInterfaceResolver {
        MethodInterfaceResolver::new(self.loader.clone(), self.interfaces.clone())
    }

    /// Start building a proxy implementing `interface`.
    pub fn proxy(&self, interface: Arc<NativeClass>) -> ProxyBuilder {
        ProxyBuilder::new(interface, self.interfaces.clone())
    }
}

impl Default for Bridge {
    fn default() -> Self {
        let collections = Arc::new(CollectionHandlers::with_builtins());
        Self::new(
            BridgeConfig::default(),
            Arc::new(TypeRegistry::new(collections)),
        )
    }
}
