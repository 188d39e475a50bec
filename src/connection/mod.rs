//! Transport collaborator.
//!
//! A connection registers named handlers and invokes handlers by name.
//! Methods talk to their connection only through this trait; the wire
//! format, retries and networking belong to the implementation.
//!
//! # Implementations
//!
//! - [`LocalConnection`]: in-process transport for single-process
//!   applications, tests and embedded use.
//!
//! # Default connection
//!
//! Applications install one process-wide default at startup with
//! [`set_default_connection`]. Methods declared without an explicit
//! connection use it; with none installed, construction fails.

use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;

use crate::context::ExecutionContext;
use crate::error::{MethodError, MethodResult, TransportError};
use crate::invocation::Completion;
use crate::method::ApplyOptions;

mod local;

pub use local::{DeliveryMode, LocalConnection};

/// Handler registered for a method name. The transport supplies the
/// execution context and the single arguments value.
pub type MethodHandler = Arc<dyn Fn(ExecutionContext, Value) -> MethodResult + Send + Sync>;

/// Registration and invocation of named methods.
pub trait Connection: Send + Sync {
    /// Register `handler` under `name`.
    ///
    /// Implementations reject a second registration of the same name.
    fn register(&self, name: &str, handler: MethodHandler) -> Result<(), TransportError>;

    /// Invoke `name` with `args` and finish through `completion`.
    ///
    /// May complete before returning, complete later, or raise
    /// synchronously by returning `Err` (for example a failed local
    /// simulation). `Ok(Some(value))` carries a locally computed result
    /// the caller may observe before the authoritative one arrives.
    fn apply(
        &self,
        name: &str,
        args: Vec<Value>,
        options: &ApplyOptions,
        completion: Completion,
    ) -> Result<Option<Value>, MethodError>;
}

static DEFAULT_CONNECTION: RwLock<Option<Arc<dyn Connection>>> = RwLock::new(None);

/// Install the process-wide default connection, returning the previous one.
pub fn set_default_connection(connection: Arc<dyn Connection>) -> Option<Arc<dyn Connection>> {
    DEFAULT_CONNECTION
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .replace(connection)
}

/// Remove the process-wide default connection.
pub fn clear_default_connection() -> Option<Arc<dyn Connection>> {
    DEFAULT_CONNECTION
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .take()
}

pub fn default_connection() -> Option<Arc<dyn Connection>> {
    DEFAULT_CONNECTION
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}
