//! Callbridge – structural services from native callables, and back
//!
//! This crate adapts between plain callables and structural record services:
//! - Derives input/output record types from method signatures, cached per signature
//! - Executes a method from an input record, converting fields back into arguments
//! - Resolves services by `<owner>.<method>` identifiers
//! - Implements native interfaces with dynamic proxies that dispatch to services

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Structural type derivation, invocation and proxy dispatch
pub mod bridge;

/// JSON and preserves export helpers
pub mod util;

// Re-export key types for convenience
pub use bridge::{Bridge, BridgeConfig, BridgeError, BridgeResult};

/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
