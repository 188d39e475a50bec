//! Test utilities and mock implementations.
//!
//! Mock transport and counting method bodies for exercising methods
//! without a real connection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;

use crate::cache::MemoryCache;
use crate::connection::{Connection, LocalConnection, MethodHandler};
use crate::context::ExecutionContext;
use crate::error::{BoxError, MethodError, TransportError};
use crate::invocation::Completion;
use crate::method::{ApplyOptions, MethodConfig};

/// One `apply` seen by [`MockConnection`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedApply {
    pub name: String,
    pub args: Vec<Value>,
    pub options: ApplyOptions,
}

struct Pending {
    name: String,
    args: Value,
    completion: Completion,
}

#[derive(Default)]
struct MockState {
    handlers: HashMap<String, MethodHandler>,
    applies: Vec<RecordedApply>,
    fail_on_apply: Option<TransportError>,
    hold: bool,
    pending: Vec<Pending>,
}

/// Mock connection that records every `apply`.
///
/// By default it runs the registered handler in-line. It can instead raise
/// synchronously ([`set_fail_on_apply`](Self::set_fail_on_apply)) or hold
/// invocations until [`release_pending`](Self::release_pending).
#[derive(Default)]
pub struct MockConnection {
    state: Mutex<MockState>,
}

impl MockConnection {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make `apply` raise `error` synchronously instead of invoking.
    pub fn set_fail_on_apply(&self, error: Option<TransportError>) {
        self.state().fail_on_apply = error;
    }

    /// Hold invocations instead of completing them in-line.
    pub fn set_hold(&self, hold: bool) {
        self.state().hold = hold;
    }

    pub fn applies(&self) -> Vec<RecordedApply> {
        self.state().applies.clone()
    }

    pub fn registered(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state().handlers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn pending_count(&self) -> usize {
        self.state().pending.len()
    }

    /// Run every held invocation and complete it. Returns how many ran.
    pub fn release_pending(&self) -> usize {
        let (pending, handlers) = {
            let mut state = self.state();
            (std::mem::take(&mut state.pending), state.handlers.clone())
        };

        let count = pending.len();
        for invocation in pending {
            let result = match handlers.get(&invocation.name) {
                Some(handler) => handler(ExecutionContext::new(), invocation.args),
                None => Err(TransportError::MethodNotFound(invocation.name).into()),
            };
            invocation.completion.complete(result);
        }
        count
    }
}

impl Connection for MockConnection {
    fn register(&self, name: &str, handler: MethodHandler) -> Result<(), TransportError> {
        let mut state = self.state();
        if state.handlers.contains_key(name) {
            return Err(TransportError::AlreadyRegistered(name.to_string()));
        }
        state.handlers.insert(name.to_string(), handler);
        Ok(())
    }

    fn apply(
        &self,
        name: &str,
        args: Vec<Value>,
        options: &ApplyOptions,
        completion: Completion,
    ) -> Result<Option<Value>, MethodError> {
        let (handler, args) = {
            let mut state = self.state();
            state.applies.push(RecordedApply {
                name: name.to_string(),
                args: args.clone(),
                options: options.clone(),
            });

            if let Some(error) = state.fail_on_apply.clone() {
                return Err(error.into());
            }

            let args = args.into_iter().next().unwrap_or(Value::Null);
            if state.hold {
                state.pending.push(Pending {
                    name: name.to_string(),
                    args,
                    completion,
                });
                return Ok(None);
            }

            (state.handlers.get(name).cloned(), args)
        };

        let result = match handler {
            Some(handler) => handler(ExecutionContext::new(), args),
            None => Err(TransportError::MethodNotFound(name.to_string()).into()),
        };
        completion.complete(result);
        Ok(None)
    }
}

/// Counts executions of the method bodies it builds.
#[derive(Debug, Clone, Default)]
pub struct RunCounter {
    count: Arc<AtomicUsize>,
}

impl RunCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Body that counts and returns `value`.
    pub fn returning(
        &self,
        value: Value,
    ) -> impl Fn(&ExecutionContext, &Value) -> Result<Value, BoxError> + Send + Sync + 'static {
        let count = self.count.clone();
        move |_: &ExecutionContext, _: &Value| -> Result<Value, BoxError> {
            count.fetch_add(1, Ordering::SeqCst);
            Ok(value.clone())
        }
    }

    /// Body that counts and returns its arguments.
    pub fn echoing(
        &self,
    ) -> impl Fn(&ExecutionContext, &Value) -> Result<Value, BoxError> + Send + Sync + 'static {
        let count = self.count.clone();
        move |_: &ExecutionContext, args: &Value| -> Result<Value, BoxError> {
            count.fetch_add(1, Ordering::SeqCst);
            Ok(args.clone())
        }
    }

    /// Body that counts and fails with `message`.
    pub fn failing(
        &self,
        message: &str,
    ) -> impl Fn(&ExecutionContext, &Value) -> Result<Value, BoxError> + Send + Sync + 'static {
        let count = self.count.clone();
        let message = message.to_string();
        move |_: &ExecutionContext, _: &Value| -> Result<Value, BoxError> {
            count.fetch_add(1, Ordering::SeqCst);
            Err(message.clone().into())
        }
    }
}

/// Declaration wired to its own [`LocalConnection`] and [`MemoryCache`],
/// so tests never share process-wide state.
pub fn isolated(name: &str) -> MethodConfig {
    MethodConfig::new(name)
        .connection(Arc::new(LocalConnection::new()))
        .cache(Arc::new(MemoryCache::new()))
}
