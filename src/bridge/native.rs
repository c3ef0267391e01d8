//! Native classes, methods and receivers
//!
//! The bridge cannot reflect over Rust types, so owner types describe
//! themselves: a [`NativeClass`] lists its fields (scanned for injection
//! slots), the interfaces it implements, and its methods with parameter
//! metadata and a body.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use super::context::ExecutionContext;
use super::error::BridgeResult;
use super::runtime::RuntimeHandle;
use super::types::{NativeType, Value};

static NEXT_SIGNATURE: AtomicU64 = AtomicU64::new(1);

/// Identity of one method signature; two methods never share it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignatureId(u64);

impl SignatureId {
    fn next() -> Self {
        SignatureId(NEXT_SIGNATURE.fetch_add(1, Ordering::Relaxed))
    }
}

/// Something that can dispatch a method call by name; handed to interface
/// default bodies so they can call sibling methods.
pub trait Dispatch {
    /// Call the named method with positional arguments.
    fn dispatch(&self, method: &str, args: Vec<Value>) -> BridgeResult<Value>;
}

/// Body of a class method.
pub type InstanceBody =
    Arc<dyn Fn(&mut Receiver, &[Value]) -> anyhow::Result<Value> + Send + Sync>;

/// Body of an interface default method.
pub type DefaultBody =
    Arc<dyn Fn(&dyn Dispatch, Vec<Value>) -> BridgeResult<Value> + Send + Sync>;

/// No-argument constructor producing the owner's state.
pub type Constructor = Arc<dyn Fn() -> Box<dyn Any + Send> + Send + Sync>;

/// Implementation attached to a method.
#[derive(Clone)]
pub enum MethodBody {
    /// Runs against a freshly constructed receiver
    Instance(InstanceBody),
    /// Interface default implementation
    Default(DefaultBody),
    /// Declared only
    Abstract,
}

/// One declared parameter and its naming/nullability metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Declared type
    pub ty: NativeType,
    /// Explicit field name, if any
    pub name: Option<String>,
    /// Explicitly marked as never absent
    pub non_null: bool,
}

impl Parameter {
    /// Unnamed parameter.
    pub fn new(ty: NativeType) -> Self {
        Self {
            ty,
            name: None,
            non_null: false,
        }
    }

    /// Parameter with an explicit name.
    pub fn named(name: impl Into<String>, ty: NativeType) -> Self {
        Self {
            ty,
            name: Some(name.into()),
            non_null: false,
        }
    }

    /// Mark the parameter non-null.
    pub fn non_null(mut self) -> Self {
        self.non_null = true;
        self
    }
}

/// Metadata describing the return value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultMeta {
    /// Output field name
    pub name: Option<String>,
    /// Output record namespace
    pub namespace: Option<String>,
}

/// A method declared on a [`NativeClass`].
pub struct NativeMethod {
    signature: SignatureId,
    name: String,
    declaring: Weak<NativeClass>,
    declaring_name: String,
    params: Vec<Parameter>,
    returns: NativeType,
    result: ResultMeta,
    operation: Option<String>,
    description: Option<String>,
    public: bool,
    is_static: bool,
    body: MethodBody,
}

impl NativeMethod {
    /// Signature identity.
    pub fn signature(&self) -> SignatureId {
        self.signature
    }

    /// Method name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declaring class, if it is still alive.
    pub fn declaring_class(&self) -> Option<Arc<NativeClass>> {
        self.declaring.upgrade()
    }

    /// Name of the declaring class.
    pub fn declaring_name(&self) -> &str {
        &self.declaring_name
    }

    /// Declared parameters in order.
    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    /// Declared return type.
    pub fn returns(&self) -> &NativeType {
        &self.returns
    }

    /// Return value metadata.
    pub fn result(&self) -> &ResultMeta {
        &self.result
    }

    /// Explicit operation name.
    pub fn operation(&self) -> Option<&str> {
        self.operation.as_deref()
    }

    /// Description metadata.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Whether the method is public.
    pub fn is_public(&self) -> bool {
        self.public
    }

    /// Whether the method is static.
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Whether the method returns nothing.
    pub fn is_void(&self) -> bool {
        self.returns == NativeType::Void
    }

    /// Attached body.
    pub fn body(&self) -> &MethodBody {
        &self.body
    }

    /// Whether the method carries an interface default implementation.
    pub fn has_default(&self) -> bool {
        matches!(self.body, MethodBody::Default(_))
    }

    /// Same name and identical parameter type list.
    pub fn overrides(&self, other: &NativeMethod) -> bool {
        self.name == other.name
            && self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .zip(other.params.iter())
                .all(|(a, b)| a.ty == b.ty)
    }
}

impl fmt::Display for NativeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}.{}(", self.returns, self.declaring_name, self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param.ty)?;
        }
        write!(f, ")")
    }
}

impl fmt::Debug for NativeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeMethod")
            .field("signature", &self.signature)
            .field("method", &self.to_string())
            .finish()
    }
}

/// Declaration of a method, turned into a [`NativeMethod`] when its class is built.
pub struct MethodDef {
    name: String,
    params: Vec<Parameter>,
    returns: NativeType,
    result: ResultMeta,
    operation: Option<String>,
    description: Option<String>,
    public: bool,
    is_static: bool,
    body: MethodBody,
}

impl MethodDef {
    /// Public, non-static, void, abstract method.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            returns: NativeType::Void,
            result: ResultMeta::default(),
            operation: None,
            description: None,
            public: true,
            is_static: false,
            body: MethodBody::Abstract,
        }
    }

    /// Append a parameter.
    pub fn param(mut self, param: Parameter) -> Self {
        self.params.push(param);
        self
    }

    /// Set the return type.
    pub fn returns(mut self, ty: NativeType) -> Self {
        self.returns = ty;
        self
    }

    /// Name the output field.
    pub fn result_name(mut self, name: impl Into<String>) -> Self {
        self.result.name = Some(name.into());
        self
    }

    /// Namespace of the output record.
    pub fn result_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.result.namespace = Some(namespace.into());
        self
    }

    /// Operation name used for the record types instead of the method name.
    pub fn operation(mut self, name: impl Into<String>) -> Self {
        self.operation = Some(name.into());
        self
    }

    /// Human description.
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Mark non-public.
    pub fn private(mut self) -> Self {
        self.public = false;
        self
    }

    /// Mark static.
    pub fn static_method(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Attach an instance body.
    pub fn body<F>(mut self, body: F) -> Self
    where
        F: Fn(&mut Receiver, &[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.body = MethodBody::Instance(Arc::new(body));
        self
    }

    /// Attach an interface default body.
    pub fn default_body<F>(mut self, body: F) -> Self
    where
        F: Fn(&dyn Dispatch, Vec<Value>) -> BridgeResult<Value> + Send + Sync + 'static,
    {
        self.body = MethodBody::Default(Arc::new(body));
        self
    }
}

/// Whether a class is concrete or an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    /// Instantiable class
    Class,
    /// Interface: only declares methods
    Interface,
}

/// Declared field of a class.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    /// Field name
    pub name: String,
    /// Declared type
    pub ty: NativeType,
}

/// Self-describing owner type.
pub struct NativeClass {
    name: String,
    kind: ClassKind,
    namespace: Option<String>,
    interfaces: Vec<Arc<NativeClass>>,
    fields: Vec<FieldDef>,
    methods: Vec<Arc<NativeMethod>>,
    constructor: Option<Constructor>,
}

impl NativeClass {
    /// Start declaring a concrete class.
    pub fn class(name: impl Into<String>) -> ClassBuilder {
        ClassBuilder::new(name.into(), ClassKind::Class)
    }

    /// Start declaring an interface.
    pub fn interface(name: impl Into<String>) -> ClassBuilder {
        ClassBuilder::new(name.into(), ClassKind::Interface)
    }

    /// Fully qualified name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Class or interface.
    pub fn kind(&self) -> ClassKind {
        self.kind
    }

    /// Whether this is an interface.
    pub fn is_interface(&self) -> bool {
        self.kind == ClassKind::Interface
    }

    /// Service namespace metadata.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Directly implemented interfaces.
    pub fn interfaces(&self) -> &[Arc<NativeClass>] {
        &self.interfaces
    }

    /// Declared fields in order.
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Declared methods in order.
    pub fn methods(&self) -> &[Arc<NativeMethod>] {
        &self.methods
    }

    /// First declared method with the name.
    pub fn method(&self, name: &str) -> Option<&Arc<NativeMethod>> {
        self.methods.iter().find(|method| method.name == name)
    }

    /// Declared methods followed by those inherited from interfaces, skipping
    /// inherited methods overridden by an earlier one.
    pub fn visible_methods(&self) -> Vec<Arc<NativeMethod>> {
        let mut visible: Vec<Arc<NativeMethod>> = self.methods.clone();
        for iface in &self.interfaces {
            for method in iface.visible_methods() {
                if !visible.iter().any(|seen| seen.overrides(&method)) {
                    visible.push(method);
                }
            }
        }
        visible
    }

    /// Construct a fresh instance state with the no-argument constructor.
    pub fn instantiate(&self) -> Box<dyn Any + Send> {
        match &self.constructor {
            Some(constructor) => constructor(),
            None => Box::new(()),
        }
    }
}

impl fmt::Debug for NativeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeClass")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("methods", &self.methods.len())
            .finish()
    }
}

/// Builder for [`NativeClass`].
pub struct ClassBuilder {
    name: String,
    kind: ClassKind,
    namespace: Option<String>,
    interfaces: Vec<Arc<NativeClass>>,
    fields: Vec<FieldDef>,
    methods: Vec<MethodDef>,
    constructor: Option<Constructor>,
}

impl ClassBuilder {
    fn new(name: String, kind: ClassKind) -> Self {
        Self {
            name,
            kind,
            namespace: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            constructor: None,
        }
    }

    /// Service namespace metadata.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Implemented interface.
    pub fn implements(mut self, iface: Arc<NativeClass>) -> Self {
        self.interfaces.push(iface);
        self
    }

    /// Declared field.
    pub fn field(mut self, name: impl Into<String>, ty: NativeType) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            ty,
        });
        self
    }

    /// Declared method.
    pub fn method(mut self, method: MethodDef) -> Self {
        self.methods.push(method);
        self
    }

    /// No-argument constructor for the instance state.
    pub fn constructor<T, F>(mut self, constructor: F) -> Self
    where
        T: Any + Send,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.constructor = Some(Arc::new(move || Box::new(constructor()) as Box<dyn Any + Send>));
        self
    }

    /// Finish the class; methods receive a back-reference to it.
    pub fn build(self) -> Arc<NativeClass> {
        let ClassBuilder {
            name,
            kind,
            namespace,
            interfaces,
            fields,
            methods,
            constructor,
        } = self;

        Arc::new_cyclic(|weak: &Weak<NativeClass>| {
            let methods = methods
                .into_iter()
                .map(|def| {
                    Arc::new(NativeMethod {
                        signature: SignatureId::next(),
                        name: def.name,
                        declaring: weak.clone(),
                        declaring_name: name.clone(),
                        params: def.params,
                        returns: def.returns,
                        result: def.result,
                        operation: def.operation,
                        description: def.description,
                        public: def.public,
                        is_static: def.is_static,
                        body: def.body,
                    })
                })
                .collect();

            NativeClass {
                name,
                kind,
                namespace,
                interfaces,
                fields,
                methods,
                constructor,
            }
        })
    }
}

/// Freshly constructed owner instance handed to an instance body, carrying
/// the values placed in its injection slots.
pub struct Receiver {
    state: Box<dyn Any + Send>,
    context: Option<ExecutionContext>,
    runtime: Option<RuntimeHandle>,
}

impl Receiver {
    pub(crate) fn new(state: Box<dyn Any + Send>) -> Self {
        Self {
            state,
            context: None,
            runtime: None,
        }
    }

    pub(crate) fn inject_context(&mut self, context: ExecutionContext) {
        self.context = Some(context);
    }

    pub(crate) fn inject_runtime(&mut self, runtime: Option<RuntimeHandle>) {
        self.runtime = runtime;
    }

    /// Constructor state, if it has type `T`.
    pub fn state<T: Any>(&self) -> Option<&T> {
        self.state.downcast_ref::<T>()
    }

    /// Mutable constructor state, if it has type `T`.
    pub fn state_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.state.downcast_mut::<T>()
    }

    /// Injected execution context.
    pub fn context(&self) -> Option<&ExecutionContext> {
        self.context.as_ref()
    }

    /// Injected runtime handle.
    pub fn runtime(&self) -> Option<&RuntimeHandle> {
        self.runtime.as_ref()
    }
}
