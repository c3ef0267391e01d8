//! Invocation engine
//!
//! Executes a [`MethodService`] against an input record: each record field is
//! converted back into a native argument, a fresh owner instance receives its
//! injected capabilities, the method body runs, and a non-null return value
//! becomes the single field of the output record.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

use super::context::ExecutionContext;
use super::convert::Converter;
use super::error::{BridgeError, BridgeResult, ServiceError};
use super::interface::ServiceInterface;
use super::native::{MethodBody, Receiver};
use super::record::Record;
use super::runtime::ServiceRuntime;
use super::service::{MethodService, ServiceInstance};
use super::types::Value;

/// One execution of a [`MethodService`].
pub struct MethodServiceInstance<'a> {
    service: &'a MethodService,
}

impl<'a> MethodServiceInstance<'a> {
    /// Instance executing `service`.
    pub fn new(service: &'a MethodService) -> Self {
        Self { service }
    }

    fn arguments(
        &self,
        iface: &ServiceInterface,
        input: Option<&Record>,
    ) -> BridgeResult<Vec<Value>> {
        let method = self.service.method();
        let Some(input) = input else {
            return Ok(vec![Value::Null; method.params().len()]);
        };

        let builder = self.service.interfaces().builder();
        let converter = Converter::new(builder.types().as_ref(), builder.collections());
        method
            .params()
            .iter()
            .enumerate()
            .map(|(i, param)| {
                let field = iface
                    .input()
                    .fields
                    .get(i)
                    .map(|field| field.name.as_str())
                    .unwrap_or_default();
                converter.to_native(field, input.get_at(i).clone(), &param.ty)
            })
            .collect()
    }

    fn receiver(&self, context: &ExecutionContext) -> Receiver {
        let mut receiver = Receiver::new(self.service.class().instantiate());
        if self.service.context_slot().is_some() {
            receiver.inject_context(context.clone());
        }
        if self.service.runtime_slot().is_some() {
            receiver.inject_runtime(ServiceRuntime::current());
        }
        receiver
    }

    fn classify(&self, arguments: String, err: anyhow::Error) -> BridgeError {
        let err = match err.downcast::<ServiceError>() {
            Ok(domain) => return BridgeError::Service(domain),
            Err(err) => err,
        };
        let source = match err.downcast::<BridgeError>() {
            Ok(BridgeError::Service(domain)) => return BridgeError::Service(domain),
            Ok(other) => anyhow::Error::new(other),
            Err(err) => err,
        };
        BridgeError::Invocation {
            service: self.service.service_id(),
            arguments,
            source,
        }
    }
}

fn summarize(args: &[Value], values: bool) -> String {
    let parts: Vec<String> = args
        .iter()
        .map(|arg| {
            if values {
                format!("{arg:?}")
            } else {
                arg.kind().to_string()
            }
        })
        .collect();
    format!("[{}]", parts.join(", "))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "method body panicked".to_string()
    }
}

impl ServiceInstance for MethodServiceInstance<'_> {
    fn execute(
        &self,
        context: &ExecutionContext,
        input: Option<Record>,
    ) -> BridgeResult<Option<Record>> {
        let method = self.service.method();
        let MethodBody::Instance(body) = method.body() else {
            return Err(BridgeError::UnimplementedMethod {
                method: method.to_string(),
            });
        };

        let iface = self.service.interface()?;
        let args = self.arguments(&iface, input.as_ref())?;
        let trace_values = self.service.interfaces().config().trace_arguments;
        debug!(
            service = %self.service,
            context = %context,
            arguments = %summarize(&args, trace_values),
            "invoking method"
        );

        let mut receiver = self.receiver(context);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| body(&mut receiver, &args)));
        let returned = match outcome {
            Ok(Ok(value)) => value,
            Ok(Err(err)) => {
                let err = self.classify(summarize(&args, true), err);
                debug!(service = %self.service, error = %err, "method failed");
                return Err(err);
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(service = %self.service, panic = %message, "method body panicked");
                return Err(BridgeError::Invocation {
                    service: self.service.service_id(),
                    arguments: summarize(&args, true),
                    source: anyhow::anyhow!(message),
                });
            }
        };

        let mut output = iface.output().new_instance();
        if let Some(field) = iface.output_field() {
            if !returned.is_null() {
                output.set(&field.name, returned)?;
            }
        }
        Ok(Some(output))
    }
}
