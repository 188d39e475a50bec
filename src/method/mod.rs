//! Method declaration and construction.
//!
//! [`Method::new`] turns a [`MethodConfig`] into a registered method:
//!
//! 1. check the declared name
//! 2. run the mixin pipeline
//! 3. fill in the default connection
//! 4. resolve `Validate::Skip` into a no-op validator
//! 5. default the transport options
//! 6. check the assembled declaration
//! 7. layer the transport options over the built-in defaults
//! 8. build the method
//! 9. register its handler with the connection
//!
//! Registration is the last step, so a failed construction never leaves a
//! handler behind.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::info;

use crate::cache::{self, ResultCache};
use crate::connection::{self, Connection, MethodHandler};
use crate::context::ExecutionContext;
use crate::error::{ConfigError, ConfigResult};
use crate::invocation::Executor;
use crate::mixin::{apply_mixins, Mixin};
use crate::validation::{validate_method_name, Schema};

mod config;
mod options;

pub use config::{run_fn, MethodConfig, RunFn, Validate, ValidateFn, ValidateReturn};
pub use options::{ApplyOptions, RETURN_STUB_VALUE, THROW_STUB_EXCEPTIONS};

/// A named, validated, remotely invocable operation.
///
/// Cheap to clone; clones share the same executor and connection.
#[derive(Clone)]
pub struct Method {
    pub(crate) executor: Arc<Executor>,
    pub(crate) connection: Arc<dyn Connection>,
    pub(crate) apply_options: ApplyOptions,
    mixins: Vec<Mixin>,
    schema: Option<Schema>,
    extensions: Map<String, Value>,
}

impl Method {
    /// Build the method and register it with its connection.
    pub fn new(config: MethodConfig) -> ConfigResult<Self> {
        validate_method_name(&config.name)?;

        let mixins = config.mixins.clone();
        let config = apply_mixins(config, &mixins)?;

        let MethodConfig {
            name,
            validate,
            run,
            mixins,
            cache_ttl,
            connection,
            apply_options,
            cache,
            key_serializer,
            schema,
            extensions,
        } = config;

        // A mixin may have renamed the method.
        validate_method_name(&name)?;

        let connection = match connection {
            Some(connection) => connection,
            None => connection::default_connection()
                .ok_or_else(|| ConfigError::NoConnection {
                    method: name.clone(),
                })?,
        };

        let validate = validate
            .ok_or_else(|| ConfigError::MissingValidate {
                method: name.clone(),
            })?
            .into_fn();

        let apply_options = apply_options.unwrap_or_default();

        let run = run.ok_or_else(|| ConfigError::MissingRun {
            method: name.clone(),
        })?;
        if cache_ttl.is_some_and(|ttl| ttl.is_zero()) {
            return Err(ConfigError::InvalidCacheTtl { method: name });
        }

        let apply_options = apply_options.merged_over(ApplyOptions::defaults());

        let cache: Arc<dyn ResultCache> = match cache {
            Some(cache) => cache,
            None => cache::global(),
        };
        let executor = Arc::new(Executor::new(
            name.clone(),
            validate,
            run,
            cache_ttl,
            cache,
            key_serializer.unwrap_or_else(cache::default_serializer),
        ));

        let handler: MethodHandler = {
            let executor = executor.clone();
            Arc::new(move |context: ExecutionContext, args: Value| {
                executor.execute(Some(context), &args)
            })
        };
        connection
            .register(&name, handler)
            .map_err(|source| ConfigError::Registration {
                method: name.clone(),
                source,
            })?;

        info!(
            method = %name,
            cached = cache_ttl.is_some(),
            mixins = mixins.len(),
            "Registered method"
        );

        Ok(Self {
            executor,
            connection,
            apply_options,
            mixins,
            schema,
            extensions,
        })
    }

    pub fn name(&self) -> &str {
        self.executor.name()
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        self.executor.cache_ttl()
    }

    /// Transport options after merging over the defaults.
    pub fn apply_options(&self) -> &ApplyOptions {
        &self.apply_options
    }

    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.connection
    }

    pub fn mixins(&self) -> &[Mixin] {
        &self.mixins
    }

    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    pub fn extensions(&self) -> &Map<String, Value> {
        &self.extensions
    }

    pub fn validate_fn(&self) -> &ValidateFn {
        self.executor.validate_fn()
    }

    pub fn run_fn(&self) -> &RunFn {
        self.executor.run_fn()
    }

    pub fn executor(&self) -> &Arc<Executor> {
        &self.executor
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("name", &self.name())
            .field("cache_ttl", &self.cache_ttl())
            .field("apply_options", &self.apply_options)
            .field("mixins", &self.mixins)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}
