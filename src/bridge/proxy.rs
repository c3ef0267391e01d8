//! Reverse adapter: native interfaces backed by services
//!
//! A [`ServiceProxy`] implements a native interface by dispatching each call
//! to the first candidate service whose interface matches the called method.
//! Matching walks the candidate's parent chain, so a service wrapping an
//! overriding method answers calls declared against the parent interface.
//! The dispatch table is computed once, when the proxy is built.

use futures::executor::block_on;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use super::context::{ExecutionContext, ExecutionContextProvider, FixedContextProvider, Token};
use super::convert::Converter;
use super::error::{BridgeError, BridgeResult};
use super::interface::{InterfaceCache, ServiceInterface};
use super::native::{Dispatch, MethodBody, NativeClass, NativeMethod};
use super::record::Record;
use super::runtime::{ServiceRunner, ServiceRuntime};
use super::service::Service;
use super::types::Value;

/// Whether a service with interface `service` can answer calls to `iface`.
pub fn is_implementation(service: &ServiceInterface, iface: &ServiceInterface) -> bool {
    service.is_implementation_of(iface)
}

struct Route {
    method: Arc<NativeMethod>,
    candidates: Vec<usize>,
}

/// Native interface implementation dispatching to services.
pub struct ServiceProxy {
    interface: Arc<NativeClass>,
    interfaces: Arc<InterfaceCache>,
    services: Vec<Arc<dyn Service>>,
    routes: Vec<Route>,
    provider: Option<Arc<dyn ExecutionContextProvider>>,
    token: Option<Token>,
    runner: Option<Arc<dyn ServiceRunner>>,
}

impl ServiceProxy {
    /// Start building a proxy for a native interface.
    pub fn builder(interface: Arc<NativeClass>, interfaces: Arc<InterfaceCache>) -> ProxyBuilder {
        ProxyBuilder::new(interface, interfaces)
    }

    /// Proxy over one service; calls need an ambient context.
    pub fn for_service(
        interface: Arc<NativeClass>,
        interfaces: Arc<InterfaceCache>,
        service: Arc<dyn Service>,
    ) -> BridgeResult<Self> {
        Self::builder(interface, interfaces).service(service).build()
    }

    /// Proxy over one service, executing under a fixed context when no
    /// ambient one exists.
    pub fn with_fixed_context(
        interface: Arc<NativeClass>,
        interfaces: Arc<InterfaceCache>,
        context: ExecutionContext,
        service: Arc<dyn Service>,
    ) -> BridgeResult<Self> {
        Self::builder(interface, interfaces)
            .fixed_context(context)
            .service(service)
            .build()
    }

    /// Proxy over services with a context provider and caller token.
    pub fn with_provider(
        interface: Arc<NativeClass>,
        interfaces: Arc<InterfaceCache>,
        provider: Arc<dyn ExecutionContextProvider>,
        token: Option<Token>,
        services: Vec<Arc<dyn Service>>,
    ) -> BridgeResult<Self> {
        let mut builder = Self::builder(interface, interfaces)
            .context_provider(provider)
            .services(services);
        if let Some(token) = token {
            builder = builder.token(token);
        }
        builder.build()
    }

    /// Like [`ServiceProxy::with_provider`], executing through `runner`.
    pub fn with_runner(
        interface: Arc<NativeClass>,
        interfaces: Arc<InterfaceCache>,
        provider: Arc<dyn ExecutionContextProvider>,
        token: Option<Token>,
        runner: Arc<dyn ServiceRunner>,
        services: Vec<Arc<dyn Service>>,
    ) -> BridgeResult<Self> {
        let mut builder = Self::builder(interface, interfaces)
            .context_provider(provider)
            .runner(runner)
            .services(services);
        if let Some(token) = token {
            builder = builder.token(token);
        }
        builder.build()
    }

    /// Token handed to the context provider.
    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    /// The implemented native interface.
    pub fn native_interface(&self) -> &Arc<NativeClass> {
        &self.interface
    }

    /// Candidate services, in dispatch order.
    pub fn services(&self) -> &[Arc<dyn Service>] {
        &self.services
    }

    /// Call the first visible interface method named `name`.
    pub fn call(&self, name: &str, args: Vec<Value>) -> BridgeResult<Value> {
        let route = self
            .routes
            .iter()
            .find(|route| route.method.name() == name)
            .ok_or_else(|| BridgeError::MethodNotFound {
                class: self.interface.name().to_string(),
                method: name.to_string(),
            })?;
        self.dispatch_route(route, args)
    }

    /// Call a specific interface method.
    pub fn invoke(&self, method: &NativeMethod, args: Vec<Value>) -> BridgeResult<Value> {
        match self
            .routes
            .iter()
            .find(|route| route.method.signature() == method.signature())
        {
            Some(route) => self.dispatch_route(route, args),
            None => Err(BridgeError::UnimplementedMethod {
                method: method.to_string(),
            }),
        }
    }

    fn context(&self) -> BridgeResult<ExecutionContext> {
        if let Some(context) = ServiceRuntime::current_context() {
            return Ok(context);
        }
        match &self.provider {
            Some(provider) => Ok(provider.new_execution_context(self.token.as_ref())),
            None => Err(BridgeError::NoContextAvailable),
        }
    }

    fn dispatch_route(&self, route: &Route, args: Vec<Value>) -> BridgeResult<Value> {
        let method = &route.method;
        let Some(&index) = route.candidates.first() else {
            if let MethodBody::Default(body) = method.body() {
                debug!(method = %method, "no matching service, running default body");
                return body(self as &dyn Dispatch, args);
            }
            return Err(BridgeError::UnimplementedMethod {
                method: method.to_string(),
            });
        };

        let service = &self.services[index];
        let iface = service.service_interface()?;
        let mut input = iface.input().new_instance();
        for (field, arg) in iface.input().fields.iter().zip(args) {
            input.set(&field.name, arg)?;
        }

        let context = self.context()?;
        debug!(
            method = %method,
            service = ?service.id(),
            context = %context,
            "dispatching proxy call"
        );
        let output = self.execute(service, context, input)?;

        if method.is_void() {
            return Ok(Value::Null);
        }
        let value = output
            .as_ref()
            .map(|record| record.get_at(0).clone())
            .unwrap_or_default();
        let field = iface
            .output_field()
            .map(|field| field.name.as_str())
            .unwrap_or_default();
        let builder = self.interfaces.builder();
        Converter::new(builder.types().as_ref(), builder.collections()).to_native(
            field,
            value,
            method.returns(),
        )
    }

    fn execute(
        &self,
        service: &Arc<dyn Service>,
        context: ExecutionContext,
        input: Record,
    ) -> BridgeResult<Option<Record>> {
        match &self.runner {
            Some(runner) => {
                let result = block_on(runner.run(service.clone(), context, Some(input)))?;
                Ok(result.output)
            }
            None => ServiceRuntime::new(service.clone(), context).run(Some(input)),
        }
    }
}

impl Dispatch for ServiceProxy {
    fn dispatch(&self, method: &str, args: Vec<Value>) -> BridgeResult<Value> {
        self.call(method, args)
    }
}

impl fmt::Debug for ServiceProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceProxy")
            .field("interface", &self.interface.name())
            .field("services", &self.services.iter().map(|s| s.id()).collect::<Vec<_>>())
            .field("token", &self.token)
            .field("runner", &self.runner.is_some())
            .finish()
    }
}

/// Builder for [`ServiceProxy`].
pub struct ProxyBuilder {
    interface: Arc<NativeClass>,
    interfaces: Arc<InterfaceCache>,
    services: Vec<Arc<dyn Service>>,
    provider: Option<Arc<dyn ExecutionContextProvider>>,
    token: Option<Token>,
    runner: Option<Arc<dyn ServiceRunner>>,
}

impl ProxyBuilder {
    /// Builder for `interface` with no services.
    pub fn new(interface: Arc<NativeClass>, interfaces: Arc<InterfaceCache>) -> Self {
        Self {
            interface,
            interfaces,
            services: Vec::new(),
            provider: None,
            token: None,
            runner: None,
        }
    }

    /// Append a candidate service.
    pub fn service(mut self, service: Arc<dyn Service>) -> Self {
        self.services.push(service);
        self
    }

    /// Append candidate services.
    pub fn services(mut self, services: impl IntoIterator<Item = Arc<dyn Service>>) -> Self {
        self.services.extend(services);
        self
    }

    /// Provider used when no ambient context exists.
    pub fn context_provider(mut self, provider: Arc<dyn ExecutionContextProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Always use `context` when no ambient context exists.
    pub fn fixed_context(self, context: ExecutionContext) -> Self {
        self.context_provider(Arc::new(FixedContextProvider::new(context)))
    }

    /// Caller token passed to the provider.
    pub fn token(mut self, token: Token) -> Self {
        self.token = Some(token);
        self
    }

    /// Execute through an alternate runner.
    pub fn runner(mut self, runner: Arc<dyn ServiceRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    /// Compute the dispatch table and finish the proxy.
    pub fn build(self) -> BridgeResult<ServiceProxy> {
        let provided = self
            .services
            .iter()
            .map(|service| service.service_interface())
            .collect::<BridgeResult<Vec<_>>>()?;

        let mut routes = Vec::new();
        for method in self.interface.visible_methods() {
            let iface = self.interfaces.derive(&method)?;
            let candidates: Vec<usize> = provided
                .iter()
                .enumerate()
                .filter(|(_, candidate)| is_implementation(candidate, &iface))
                .map(|(index, _)| index)
                .collect();
            debug!(method = %method, candidates = candidates.len(), "proxy route");
            routes.push(Route { method, candidates });
        }

        Ok(ServiceProxy {
            interface: self.interface,
            interfaces: self.interfaces,
            services: self.services,
            routes,
            provider: self.provider,
            token: self.token,
            runner: self.runner,
        })
    }
}
