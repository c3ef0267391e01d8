//! Resolving services and interfaces by identifier
//!
//! Identifiers have the form `<owner-type>.<method>` and are split at the
//! last dot. A resolver that does not know the owner type answers `Ok(None)`
//! so the next resolver in a [`ResolverChain`] can try; only genuine loader
//! faults are errors.

use std::sync::Arc;
use tracing::{debug, warn};

use super::catalog::TypeLoader;
use super::error::{BridgeError, BridgeResult, LoadError};
use super::interface::{InterfaceCache, ServiceInterface};
use super::native::{NativeClass, NativeMethod};
use super::service::{MethodService, Service};

/// Resolves service identifiers to services.
pub trait ServiceResolver: Send + Sync {
    /// Service for `id`, `None` if this resolver does not know it.
    fn resolve(&self, id: &str) -> BridgeResult<Option<Arc<dyn Service>>>;
}

/// Resolves service identifiers to bare interfaces.
pub trait InterfaceResolver: Send + Sync {
    /// Interface for `id`, `None` if this resolver does not know it.
    fn resolve_interface(&self, id: &str) -> BridgeResult<Option<Arc<ServiceInterface>>>;
}

/// Split `<owner>.<method>` at the last dot.
pub fn split_id(id: &str) -> Option<(&str, &str)> {
    id.rsplit_once('.')
}

fn load_class(loader: &dyn TypeLoader, name: &str) -> BridgeResult<Option<Arc<NativeClass>>> {
    match loader.load(name) {
        Ok(class) => Ok(Some(class)),
        Err(LoadError::NotFound(_)) => {
            debug!(type_name = name, "type not found, resolver skips");
            Ok(None)
        }
        Err(LoadError::Failed(source)) => {
            warn!(type_name = name, error = %source, "type loader failed");
            Err(BridgeError::TypeLoad {
                type_name: name.to_string(),
                source,
            })
        }
    }
}

fn find_method(class: &NativeClass, name: &str) -> Option<Arc<NativeMethod>> {
    class
        .methods()
        .iter()
        .find(|method| method.is_public() && !method.is_static() && method.name() == name)
        .cloned()
}

/// Resolves `<class>.<method>` to a [`MethodService`].
pub struct MethodResolver {
    loader: Arc<dyn TypeLoader>,
    interfaces: Arc<InterfaceCache>,
}

impl MethodResolver {
    /// Resolver loading classes through `loader`.
    pub fn new(loader: Arc<dyn TypeLoader>, interfaces: Arc<InterfaceCache>) -> Self {
        Self { loader, interfaces }
    }

    /// Typed variant of [`ServiceResolver::resolve`].
    pub fn resolve_method(&self, id: &str) -> BridgeResult<Option<MethodService>> {
        let Some((owner, name)) = split_id(id) else {
            return Ok(None);
        };
        let Some(class) = load_class(self.loader.as_ref(), owner)? else {
            return Ok(None);
        };
        Ok(find_method(&class, name)
            .map(|method| MethodService::new(self.interfaces.clone(), class.clone(), method)))
    }
}

impl ServiceResolver for MethodResolver {
    fn resolve(&self, id: &str) -> BridgeResult<Option<Arc<dyn Service>>> {
        Ok(self
            .resolve_method(id)?
            .map(|service| Arc::new(service) as Arc<dyn Service>))
    }
}

/// Resolves `<interface>.<method>` to the method's derived interface.
pub struct MethodInterfaceResolver {
    loader: Arc<dyn TypeLoader>,
    interfaces: Arc<InterfaceCache>,
}

impl MethodInterfaceResolver {
    /// Resolver loading interfaces through `loader`.
    pub fn new(loader: Arc<dyn TypeLoader>, interfaces: Arc<InterfaceCache>) -> Self {
        Self { loader, interfaces }
    }
}

impl InterfaceResolver for MethodInterfaceResolver {
    fn resolve_interface(&self, id: &str) -> BridgeResult<Option<Arc<ServiceInterface>>> {
        let Some((owner, name)) = split_id(id) else {
            return Ok(None);
        };
        let Some(class) = load_class(self.loader.as_ref(), owner)? else {
            return Ok(None);
        };
        if !class.is_interface() {
            return Ok(None);
        }
        match find_method(&class, name) {
            Some(method) => self.interfaces.derive(&method).map(Some),
            None => Ok(None),
        }
    }
}

/// Tries resolvers in order; the first hit wins.
pub struct ResolverChain<R: ?Sized> {
    resolvers: Vec<Arc<R>>,
}

impl<R: ?Sized> ResolverChain<R> {
    /// Empty chain.
    pub fn new() -> Self {
        Self {
            resolvers: Vec::new(),
        }
    }

    /// Append a resolver.
    pub fn with(mut self, resolver: Arc<R>) -> Self {
        self.resolvers.push(resolver);
        self
    }

    /// Number of resolvers in the chain.
    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    /// Whether the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}

impl<R: ?Sized> Default for ResolverChain<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceResolver for ResolverChain<dyn ServiceResolver> {
    fn resolve(&self, id: &str) -> BridgeResult<Option<Arc<dyn Service>>> {
        for resolver in &self.resolvers {
            if let Some(service) = resolver.resolve(id)? {
                return Ok(Some(service));
            }
        }
        Ok(None)
    }
}

impl InterfaceResolver for ResolverChain<dyn InterfaceResolver> {
    fn resolve_interface(&self, id: &str) -> BridgeResult<Option<Arc<ServiceInterface>>> {
        for resolver in &self.resolvers {
            if let Some(iface) = resolver.resolve_interface(id)? {
                return Ok(Some(iface));
            }
        }
        Ok(None)
    }
}

/// Converts optional identifiers into services.
pub struct StringToService {
    resolver: Arc<dyn ServiceResolver>,
}

impl StringToService {
    /// Converter resolving through `resolver`.
    pub fn new(resolver: Arc<dyn ServiceResolver>) -> Self {
        Self { resolver }
    }

    /// Absent identifiers convert to absent services.
    pub fn convert(&self, id: Option<&str>) -> BridgeResult<Option<Arc<dyn Service>>> {
        match id {
            Some(id) => self.resolver.resolve(id),
            None => Ok(None),
        }
    }
}

/// Converts optional identifiers into interfaces.
pub struct StringToInterface {
    resolver: Arc<dyn InterfaceResolver>,
}

impl StringToInterface {
    /// Converter resolving through `resolver`.
    pub fn new(resolver: Arc<dyn InterfaceResolver>) -> Self {
        Self { resolver }
    }

    /// Absent identifiers convert to absent interfaces.
    pub fn convert(&self, id: Option<&str>) -> BridgeResult<Option<Arc<ServiceInterface>>> {
        match id {
            Some(id) => self.resolver.resolve_interface(id),
            None => Ok(None),
        }
    }
}
