//! Invocation engine.
//!
//! Two ways into a method:
//! - **execute**: run it here and now. Used by the registered transport
//!   handler and directly by application or test code.
//! - **call**: ask the transport to invoke it by name and receive the
//!   outcome through a callback or a future (see [`call`]).
//!
//! For one execution the order is fixed: validate, then cache lookup, then
//! `run` (unless the cache answered).

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::cache::{cache_key, KeySerializer, ResultCache};
use crate::context::ExecutionContext;
use crate::error::{MethodError, MethodResult, ValidationError};
use crate::method::{Method, RunFn, ValidateFn, ValidateReturn};

pub mod call;

pub use call::{deferred, CallFuture, Completion};

/// The execute path of one method.
///
/// Holds no reference to the transport, so the transport can keep the
/// executor alive inside its registered handler.
pub struct Executor {
    name: String,
    validate: ValidateFn,
    run: RunFn,
    cache_ttl: Option<Duration>,
    cache: Arc<dyn ResultCache>,
    key_serializer: KeySerializer,
}

impl Executor {
    pub(crate) fn new(
        name: String,
        validate: ValidateFn,
        run: RunFn,
        cache_ttl: Option<Duration>,
        cache: Arc<dyn ResultCache>,
        key_serializer: KeySerializer,
    ) -> Self {
        Self {
            name,
            validate,
            run,
            cache_ttl,
            cache,
            key_serializer,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache_ttl
    }

    pub fn validate_fn(&self) -> &ValidateFn {
        &self.validate
    }

    pub fn run_fn(&self) -> &RunFn {
        &self.run
    }

    /// Validate `args`, then answer from the cache or run the method body.
    pub fn execute(&self, context: Option<ExecutionContext>, args: &Value) -> MethodResult {
        let mut context = context.unwrap_or_default();
        context.name = self.name.clone();

        self.check(&context, args)?;

        let Some(ttl) = self.cache_ttl else {
            return self.run(&context, args);
        };

        let key = cache_key(&self.name, args, &self.key_serializer).map_err(|source| {
            MethodError::Serialization {
                method: self.name.clone(),
                source,
            }
        })?;

        if let Some(hit) = self.cache.get(&key) {
            debug!(method = %self.name, key = %key, "Cache hit");
            return Ok(hit);
        }
        debug!(method = %self.name, key = %key, "Cache miss");

        // Errors propagate before the put, so failures are never cached.
        let result = self.run(&context, args)?;
        self.cache.put(key, result.clone(), ttl);
        Ok(result)
    }

    fn check(&self, context: &ExecutionContext, args: &Value) -> Result<(), MethodError> {
        match (self.validate)(context, args) {
            Ok(ValidateReturn::Nothing) => Ok(()),
            Ok(ValidateReturn::Returned(returned)) => {
                debug!(method = %self.name, returned = %returned, "Validator returned a value");
                Err(MethodError::Usage {
                    method: self.name.clone(),
                })
            }
            Err(error) => {
                let error = ValidationError::wrap(error);
                debug!(
                    method = %self.name,
                    field_errors = error.errors.len(),
                    "Validation failed"
                );
                Err(MethodError::Validation {
                    method: self.name.clone(),
                    error,
                })
            }
        }
    }

    fn run(&self, context: &ExecutionContext, args: &Value) -> MethodResult {
        (self.run)(context, args).map_err(MethodError::Run)
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("name", &self.name)
            .field("cache_ttl", &self.cache_ttl)
            .finish_non_exhaustive()
    }
}

impl Method {
    /// Run the method locally, without going through the transport.
    ///
    /// A missing context is replaced by an empty one; either way its `name`
    /// is set to this method's name before `validate` and `run` see it.
    pub fn execute(&self, context: Option<ExecutionContext>, args: &Value) -> MethodResult {
        self.executor.execute(context, args)
    }
}
