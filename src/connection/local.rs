//! In-process transport.
//!
//! Routes invocations straight to registered handlers without a network
//! hop. Ideal for:
//! - Single-process applications
//! - Testing
//! - Embedded use cases

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{Connection, MethodHandler};
use crate::context::ExecutionContext;
use crate::error::{MethodError, TransportError};
use crate::invocation::{deferred, CallFuture, Completion};
use crate::method::ApplyOptions;

/// How [`LocalConnection`] delivers results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryMode {
    /// Run the handler in-line and complete before `apply` returns.
    #[default]
    Immediate,
    /// Run the handler in-line as a simulation, then run it again on a
    /// tokio task as the authoritative execution and complete from there.
    Simulated,
}

/// In-process connection.
pub struct LocalConnection {
    id: String,
    mode: DeliveryMode,
    handlers: RwLock<HashMap<String, MethodHandler>>,
    user_id: RwLock<Option<String>>,
}

impl LocalConnection {
    pub fn new() -> Self {
        Self::with_mode(DeliveryMode::Immediate)
    }

    pub fn simulated() -> Self {
        Self::with_mode(DeliveryMode::Simulated)
    }

    pub fn with_mode(mode: DeliveryMode) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            mode,
            handlers: RwLock::new(HashMap::new()),
            user_id: RwLock::new(None),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn mode(&self) -> DeliveryMode {
        self.mode
    }

    /// Set the user reported in execution contexts, as after a login.
    pub fn set_user_id(&self, user_id: Option<String>) {
        *self.user_id.write().unwrap_or_else(PoisonError::into_inner) = user_id;
    }

    pub fn method_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.handler(name).is_some()
    }

    pub fn unregister(&self, name: &str) -> bool {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .is_some()
    }

    /// Invoke a method purely by its registered name.
    pub fn call_by_name(&self, name: &str, args: Vec<Value>) -> CallFuture {
        let (completion, future) = deferred();
        if let Err(error) = self.apply(name, args, &ApplyOptions::new(), completion.clone()) {
            completion.complete(Err(error));
        }
        future
    }

    fn handler(&self, name: &str) -> Option<MethodHandler> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    fn context(&self) -> ExecutionContext {
        let mut context = ExecutionContext::new().with_connection_id(self.id.clone());
        context.user_id = self
            .user_id
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        context
    }
}

impl std::fmt::Debug for LocalConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalConnection")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("methods", &self.method_names())
            .finish()
    }
}

impl Default for LocalConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl Connection for LocalConnection {
    fn register(&self, name: &str, handler: MethodHandler) -> Result<(), TransportError> {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        if handlers.contains_key(name) {
            warn!(method = %name, "Method already registered");
            return Err(TransportError::AlreadyRegistered(name.to_string()));
        }
        handlers.insert(name.to_string(), handler);
        info!(method = %name, connection = %self.id, "Registered in-process method");
        Ok(())
    }

    fn apply(
        &self,
        name: &str,
        args: Vec<Value>,
        options: &ApplyOptions,
        completion: Completion,
    ) -> Result<Option<Value>, MethodError> {
        let Some(handler) = self.handler(name) else {
            completion.complete(Err(TransportError::MethodNotFound(name.to_string()).into()));
            return Ok(None);
        };

        // Methods take a single arguments value.
        let args = args.into_iter().next().unwrap_or(Value::Null);
        let context = self.context();

        match self.mode {
            DeliveryMode::Immediate => {
                let result = handler(context, args);
                let stub = match &result {
                    Ok(value) if options.return_stub_value() => Some(value.clone()),
                    _ => None,
                };
                completion.complete(result);
                Ok(stub)
            }
            DeliveryMode::Simulated => {
                let stub = match handler(context.clone().simulated(), args.clone()) {
                    Ok(value) => options.return_stub_value().then_some(value),
                    Err(error) if options.throw_stub_exceptions() => return Err(error),
                    Err(error) => {
                        debug!(method = %name, error = %error, "Simulation failed; invoking anyway");
                        None
                    }
                };

                match tokio::runtime::Handle::try_current() {
                    Ok(runtime) => {
                        runtime.spawn(async move {
                            completion.complete(handler(context, args));
                        });
                    }
                    Err(_) => {
                        completion.complete(Err(TransportError::Disconnected(
                            "no async runtime for remote delivery".to_string(),
                        )
                        .into()));
                    }
                }
                Ok(stub)
            }
        }
    }
}
