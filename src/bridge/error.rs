//! Error types for the service bridge
//!
//! Domain failures use thiserror. Failures raised by method bodies travel as
//! `anyhow::Error` until the invocation engine classifies them.

use std::fmt;
use thiserror::Error;

/// Recognized domain failure raised by a service.
///
/// A method body that fails with this shape has its error passed through every
/// layer unchanged instead of being wrapped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{code}] {message}")]
pub struct ServiceError {
    /// Stable error code (e.g. `POJO-1`).
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl ServiceError {
    /// Create a new service error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Top-level bridge error
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A parameter, return or element type has no structural counterpart
    #[error("You are referencing a type that can not be resolved: {type_name}")]
    TypeUnresolved {
        /// Offending native type
        type_name: String,
    },

    /// Source value is a collection but the target parameter is not
    #[error("[POJO-1] The source object '{field}' is a collection but the target object '{target}' is not")]
    CollectionTargetMismatch {
        /// Record field holding the collection
        field: String,
        /// Target native type
        target: String,
    },

    /// The invoked callable failed with an unrecognized error
    #[error("[JAVA-0] Method {service} threw exception (arguments: {arguments})")]
    Invocation {
        /// Identity of the callable (`<owner>.<method>`)
        service: String,
        /// Summary of the arguments the callable received
        arguments: String,
        /// Original cause
        #[source]
        source: anyhow::Error,
    },

    /// Proxy dispatch found neither an ambient context nor a provider
    #[error("There is no service context available and no context provider was passed along")]
    NoContextAvailable,

    /// No candidate service implements the called method
    #[error("No service found that implements the method: {method}")]
    UnimplementedMethod {
        /// Native method description
        method: String,
    },

    /// A collection handler was handed a value of the wrong shape
    #[error("{handler} handler cannot operate on a {kind} value")]
    CollectionShape {
        /// Handler name
        handler: String,
        /// Shape of the offending value
        kind: String,
    },

    /// A positional handler was given a keyed element
    #[error("{handler} handler cannot store an element at key '{index}'")]
    CollectionIndex {
        /// Handler name
        handler: String,
        /// Offending key
        index: String,
    },

    /// A record was addressed with a field it does not declare
    #[error("Record '{record}' has no field named '{field}'")]
    UnknownField {
        /// Record type name
        record: String,
        /// Requested field
        field: String,
    },

    /// A type does not declare the requested method
    #[error("No method found with name '{method}' in class {class}")]
    MethodNotFound {
        /// Owner type name
        class: String,
        /// Requested method name
        method: String,
    },

    /// The type loader failed for a reason other than absence
    #[error("Failed to load type '{type_name}': {source}")]
    TypeLoad {
        /// Requested type name
        type_name: String,
        /// Loader failure
        #[source]
        source: anyhow::Error,
    },

    /// The alternate service runner failed before producing a result
    #[error("Service runner failed: {0}")]
    Runner(String),

    /// Recognized domain failure, passed through unchanged
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl BridgeError {
    /// Shorthand for [`BridgeError::TypeUnresolved`].
    pub fn unresolved(type_name: impl fmt::Display) -> Self {
        BridgeError::TypeUnresolved {
            type_name: type_name.to_string(),
        }
    }
}

/// Convenience result alias for bridge operations
pub type BridgeResult<T> = std::result::Result<T, BridgeError>;

/// Failure reported by a [`TypeLoader`](super::catalog::TypeLoader).
#[derive(Debug, Error)]
pub enum LoadError {
    /// The type does not exist in this loader
    #[error("type '{0}' not found")]
    NotFound(String),

    /// The type exists but could not be loaded
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}
