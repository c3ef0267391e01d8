//! Service runtime and runners
//!
//! [`ServiceRuntime`] executes one service under a context and makes itself
//! the ambient runtime of the calling thread for the duration. Proxies that
//! are called from inside a running service pick that context up instead of
//! minting a new one.
//!
//! A [`ServiceRunner`] is an alternate execution path: it receives the
//! service, context and input and completes a future with the result.

use futures::FutureExt;
use futures::channel::oneshot;
use futures::future::{self, BoxFuture};
use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;
use std::thread;
use tracing::{debug, warn};

use super::context::ExecutionContext;
use super::error::{BridgeError, BridgeResult};
use super::record::Record;
use super::service::Service;

#[derive(Debug)]
struct HandleInner {
    service_id: Option<String>,
    context: ExecutionContext,
}

/// Cheap reference to a running service execution.
#[derive(Debug, Clone)]
pub struct RuntimeHandle(Arc<HandleInner>);

impl RuntimeHandle {
    /// Id of the executing service.
    pub fn service_id(&self) -> Option<&str> {
        self.0.service_id.as_deref()
    }

    /// Context the service executes under.
    pub fn context(&self) -> &ExecutionContext {
        &self.0.context
    }
}

thread_local! {
    static AMBIENT: RefCell<Vec<RuntimeHandle>> = const { RefCell::new(Vec::new()) };
}

// Pops the ambient runtime on drop, including on unwind.
struct AmbientScope;

impl AmbientScope {
    fn enter(handle: RuntimeHandle) -> Self {
        AMBIENT.with(|stack| stack.borrow_mut().push(handle));
        AmbientScope
    }
}

impl Drop for AmbientScope {
    fn drop(&mut self) {
        AMBIENT.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Executes a service under an execution context.
pub struct ServiceRuntime {
    service: Arc<dyn Service>,
    handle: RuntimeHandle,
}

impl ServiceRuntime {
    /// Runtime for one execution of `service`.
    pub fn new(service: Arc<dyn Service>, context: ExecutionContext) -> Self {
        let handle = RuntimeHandle(Arc::new(HandleInner {
            service_id: service.id(),
            context,
        }));
        Self { service, handle }
    }

    /// The runtime executing on this thread, if any.
    pub fn current() -> Option<RuntimeHandle> {
        AMBIENT.with(|stack| stack.borrow().last().cloned())
    }

    /// Context of the runtime executing on this thread, if any.
    pub fn current_context() -> Option<ExecutionContext> {
        Self::current().map(|handle| handle.context().clone())
    }

    /// Handle to this runtime.
    pub fn handle(&self) -> RuntimeHandle {
        self.handle.clone()
    }

    /// Context of this runtime.
    pub fn context(&self) -> &ExecutionContext {
        self.handle.context()
    }

    /// Execute the service once, as the ambient runtime of this thread.
    pub fn run(&self, input: Option<Record>) -> BridgeResult<Option<Record>> {
        let _scope = AmbientScope::enter(self.handle());
        debug!(service = ?self.handle.service_id(), context = %self.context(), "running service");
        self.service.new_instance().execute(self.context(), input)
    }
}

impl fmt::Debug for ServiceRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRuntime")
            .field("handle", &self.handle)
            .finish()
    }
}

/// Output of a runner-executed service.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ServiceResult {
    /// Output record, absent when the service produced none
    pub output: Option<Record>,
}

/// Future completed by a [`ServiceRunner`].
pub type ServiceFuture = BoxFuture<'static, BridgeResult<ServiceResult>>;

/// Alternate execution path for proxied calls.
pub trait ServiceRunner: Send + Sync {
    /// Start executing `service` with `input` under `context`.
    fn run(
        &self,
        service: Arc<dyn Service>,
        context: ExecutionContext,
        input: Option<Record>,
    ) -> ServiceFuture;
}

/// Runs the service on the calling thread before returning a ready future.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineRunner;

impl ServiceRunner for InlineRunner {
    fn run(
        &self,
        service: Arc<dyn Service>,
        context: ExecutionContext,
        input: Option<Record>,
    ) -> ServiceFuture {
        let result = ServiceRuntime::new(service, context)
            .run(input)
            .map(|output| ServiceResult { output });
        future::ready(result).boxed()
    }
}

/// Runs each service on a dedicated thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRunner;

impl ServiceRunner for ThreadRunner {
    fn run(
        &self,
        service: Arc<dyn Service>,
        context: ExecutionContext,
        input: Option<Record>,
    ) -> ServiceFuture {
        let (tx, rx) = oneshot::channel();
        let name = service.id().unwrap_or_else(|| "service".to_string());
        let spawned = thread::Builder::new()
            .name(format!("callbridge-{name}"))
            .spawn(move || {
                let result = ServiceRuntime::new(service, context)
                    .run(input)
                    .map(|output| ServiceResult { output });
                let _ = tx.send(result);
            });

        if let Err(err) = spawned {
            warn!(error = %err, "failed to spawn service thread");
            return future::ready(Err(BridgeError::Runner(err.to_string()))).boxed();
        }

        async move {
            rx.await.map_err(|_| {
                BridgeError::Runner("service thread exited without a result".to_string())
            })?
        }
        .boxed()
    }
}
