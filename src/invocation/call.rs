//! Caller-side invocation.
//!
//! Every `call` variant goes through one primitive: hand the transport a
//! [`Completion`] and let it finish the invocation whenever it can. The
//! callback form wraps the user's callback; the future form wraps a oneshot
//! sender. A transport that raises synchronously has its error delivered
//! through the same completion, so a supplied callback always sees the
//! error instead of it escaping.

use std::sync::{Arc, Mutex, PoisonError};

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::{Map, Value};
use tokio::sync::oneshot;
use tracing::warn;

use crate::error::{MethodResult, TransportError};
use crate::method::Method;

type Callback = Box<dyn FnOnce(MethodResult) + Send>;

/// Deferred outcome of [`Method::call_async`].
pub type CallFuture = BoxFuture<'static, MethodResult>;

/// Once-only completion handle.
///
/// Clones share the same slot: the first `complete` delivers, later ones
/// are ignored.
#[derive(Clone)]
pub struct Completion {
    slot: Arc<Mutex<Option<Callback>>>,
}

impl Completion {
    pub fn new<F>(callback: F) -> Self
    where
        F: FnOnce(MethodResult) + Send + 'static,
    {
        Self {
            slot: Arc::new(Mutex::new(Some(Box::new(callback)))),
        }
    }

    /// Deliver `result`. Returns `false` if the invocation was already completed.
    pub fn complete(&self, result: MethodResult) -> bool {
        let callback = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match callback {
            Some(callback) => {
                callback(result);
                true
            }
            None => false,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("completed", &self.is_completed())
            .finish()
    }
}

/// A completion paired with the future it resolves.
///
/// If every clone of the completion is dropped without completing, the
/// future resolves to a disconnected transport error.
pub fn deferred() -> (Completion, CallFuture) {
    let (tx, rx) = oneshot::channel();
    let completion = Completion::new(move |result| {
        // Receiver gone means the caller stopped waiting.
        let _ = tx.send(result);
    });

    let future = async move {
        rx.await.unwrap_or_else(|_| {
            Err(TransportError::Disconnected(
                "invocation finished without a result".to_string(),
            )
            .into())
        })
    }
    .boxed();

    (completion, future)
}

impl Method {
    /// Invoke through the transport and deliver the outcome to `callback`.
    ///
    /// Returns the stub value when the transport produced one.
    pub fn call<F>(&self, args: Value, callback: F) -> Option<Value>
    where
        F: FnOnce(MethodResult) + Send + 'static,
    {
        self.dispatch(args, Completion::new(callback))
    }

    /// [`call`](Self::call) with empty arguments.
    pub fn call_no_args<F>(&self, callback: F) -> Option<Value>
    where
        F: FnOnce(MethodResult) + Send + 'static,
    {
        self.call(Value::Object(Map::new()), callback)
    }

    /// Invoke through the transport and resolve the returned future with
    /// the outcome.
    pub fn call_async(&self, args: Value) -> CallFuture {
        let (completion, future) = deferred();
        self.dispatch(args, completion);
        future
    }

    fn dispatch(&self, args: Value, completion: Completion) -> Option<Value> {
        match self.connection.apply(
            self.name(),
            vec![args],
            &self.apply_options,
            completion.clone(),
        ) {
            Ok(stub) => stub,
            Err(error) => {
                warn!(method = %self.name(), error = %error, "Transport raised before completing");
                completion.complete(Err(error));
                None
            }
        }
    }
}
