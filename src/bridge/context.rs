//! Execution contexts and their providers
//!
//! Every service execution runs under an [`ExecutionContext`]. The proxy
//! takes the ambient one when a service is already running on the current
//! thread and otherwise asks its [`ExecutionContextProvider`] for a fresh one.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Field type name marking a context injection slot.
pub const EXECUTION_CONTEXT_TYPE: &str = "ExecutionContext";
/// Field type name marking a runtime injection slot.
pub const SERVICE_RUNTIME_TYPE: &str = "ServiceRuntime";

/// Security token handed to context providers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    /// Principal name
    pub name: String,
    /// Realm that issued the token
    pub realm: Option<String>,
}

impl Token {
    /// Token for a principal without a realm.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            realm: None,
        }
    }

    /// Set the issuing realm.
    pub fn with_realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = Some(realm.into());
        self
    }
}

#[derive(Debug)]
struct ContextInner {
    id: Uuid,
    token: Option<Token>,
}

/// Per-execution environment. Clones share identity.
#[derive(Debug, Clone)]
pub struct ExecutionContext(Arc<ContextInner>);

impl ExecutionContext {
    /// Anonymous context.
    pub fn new() -> Self {
        Self::with_token(None)
    }

    /// Context created on behalf of a token.
    pub fn with_token(token: Option<Token>) -> Self {
        Self(Arc::new(ContextInner {
            id: Uuid::new_v4(),
            token,
        }))
    }

    /// Unique context id.
    pub fn id(&self) -> Uuid {
        self.0.id
    }

    /// Token the context was created for.
    pub fn token(&self) -> Option<&Token> {
        self.0.token.as_ref()
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for ExecutionContext {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for ExecutionContext {}

impl fmt::Display for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.token {
            Some(token) => write!(f, "context {} ({})", self.0.id, token.name),
            None => write!(f, "context {}", self.0.id),
        }
    }
}

/// Creates execution contexts for calls made outside a running service.
pub trait ExecutionContextProvider: Send + Sync {
    /// A new context, optionally for a token.
    fn new_execution_context(&self, token: Option<&Token>) -> ExecutionContext;
}

impl<F> ExecutionContextProvider for F
where
    F: Fn(Option<&Token>) -> ExecutionContext + Send + Sync,
{
    fn new_execution_context(&self, token: Option<&Token>) -> ExecutionContext {
        self(token)
    }
}

/// Provider that always hands out the same context.
#[derive(Debug, Clone)]
pub struct FixedContextProvider {
    context: ExecutionContext,
}

impl FixedContextProvider {
    /// Provider for the given context.
    pub fn new(context: ExecutionContext) -> Self {
        Self { context }
    }
}

impl ExecutionContextProvider for FixedContextProvider {
    fn new_execution_context(&self, _token: Option<&Token>) -> ExecutionContext {
        self.context.clone()
    }
}

/// Provider minting a fresh context per call, carrying the token.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenContextProvider;

impl ExecutionContextProvider for TokenContextProvider {
    fn new_execution_context(&self, token: Option<&Token>) -> ExecutionContext {
        ExecutionContext::with_token(token.cloned())
    }
}
