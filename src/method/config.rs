//! Raw method declaration, consumed by [`Method::new`](super::Method::new).

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};

use crate::cache::{KeySerializer, ResultCache};
use crate::connection::Connection;
use crate::context::ExecutionContext;
use crate::error::BoxError;
use crate::mixin::Mixin;
use crate::validation::Schema;

use super::ApplyOptions;

/// What a validator produced when it did not raise.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidateReturn {
    Nothing,
    /// Validators report failure by raising; returning a value is a usage error.
    Returned(Value),
}

impl From<()> for ValidateReturn {
    fn from(_: ()) -> Self {
        ValidateReturn::Nothing
    }
}

impl From<bool> for ValidateReturn {
    fn from(value: bool) -> Self {
        ValidateReturn::Returned(Value::Bool(value))
    }
}

impl From<Value> for ValidateReturn {
    fn from(value: Value) -> Self {
        ValidateReturn::Returned(value)
    }
}

/// Normalized validation function.
pub type ValidateFn =
    Arc<dyn Fn(&ExecutionContext, &Value) -> Result<ValidateReturn, BoxError> + Send + Sync>;

/// Business logic of a method.
pub type RunFn = Arc<dyn Fn(&ExecutionContext, &Value) -> Result<Value, BoxError> + Send + Sync>;

/// Declared validation: a function, or the explicit "no validation" sentinel.
#[derive(Clone)]
pub enum Validate {
    /// The method takes no meaningfully validated arguments.
    Skip,
    With(ValidateFn),
}

impl Validate {
    /// Build a validator from a closure returning `()`, `bool` or `Value`.
    pub fn from_fn<F, R>(f: F) -> Self
    where
        F: Fn(&ExecutionContext, &Value) -> Result<R, BoxError> + Send + Sync + 'static,
        R: Into<ValidateReturn>,
    {
        Validate::With(Arc::new(
            move |ctx: &ExecutionContext, args: &Value| {
                f(ctx, args).map(Into::<ValidateReturn>::into)
            },
        ))
    }

    /// Resolve the sentinel into a no-op validator.
    pub(crate) fn into_fn(self) -> ValidateFn {
        match self {
            Validate::Skip => {
                Arc::new(|_: &ExecutionContext, _: &Value| {
                    Ok::<_, BoxError>(ValidateReturn::Nothing)
                })
            }
            Validate::With(f) => f,
        }
    }
}

impl fmt::Debug for Validate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validate::Skip => f.write_str("Validate::Skip"),
            Validate::With(_) => f.write_str("Validate::With(..)"),
        }
    }
}

/// Wrap a closure as a [`RunFn`].
pub fn run_fn<F>(f: F) -> RunFn
where
    F: Fn(&ExecutionContext, &Value) -> Result<Value, BoxError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Method declaration.
///
/// Mixins receive and return this struct, so every field stays public.
/// `extensions` carries free-form keys that mixins agree on between
/// themselves.
#[derive(Clone, Default)]
pub struct MethodConfig {
    pub name: String,
    pub validate: Option<Validate>,
    pub run: Option<RunFn>,
    pub mixins: Vec<Mixin>,
    pub cache_ttl: Option<Duration>,
    pub connection: Option<Arc<dyn Connection>>,
    pub apply_options: Option<ApplyOptions>,
    pub cache: Option<Arc<dyn ResultCache>>,
    pub key_serializer: Option<KeySerializer>,
    pub schema: Option<Schema>,
    pub extensions: Map<String, Value>,
}

impl MethodConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn validate(mut self, validate: Validate) -> Self {
        self.validate = Some(validate);
        self
    }

    pub fn validate_with<F, R>(self, f: F) -> Self
    where
        F: Fn(&ExecutionContext, &Value) -> Result<R, BoxError> + Send + Sync + 'static,
        R: Into<ValidateReturn>,
    {
        self.validate(Validate::from_fn(f))
    }

    /// Shorthand for `validate(Validate::Skip)`.
    pub fn no_validation(self) -> Self {
        self.validate(Validate::Skip)
    }

    pub fn run<F>(mut self, f: F) -> Self
    where
        F: Fn(&ExecutionContext, &Value) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.run = Some(run_fn(f));
        self
    }

    pub fn mixin(mut self, mixin: Mixin) -> Self {
        self.mixins.push(mixin);
        self
    }

    pub fn mixins(mut self, mixins: impl IntoIterator<Item = Mixin>) -> Self {
        self.mixins.extend(mixins);
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    pub fn connection(mut self, connection: Arc<dyn Connection>) -> Self {
        self.connection = Some(connection);
        self
    }

    pub fn apply_options(mut self, options: ApplyOptions) -> Self {
        self.apply_options = Some(options);
        self
    }

    pub fn cache(mut self, cache: Arc<dyn ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn key_serializer(mut self, serializer: KeySerializer) -> Self {
        self.key_serializer = Some(serializer);
        self
    }

    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn extension(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extensions.insert(key.into(), value);
        self
    }
}

impl fmt::Debug for MethodConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodConfig")
            .field("name", &self.name)
            .field("validate", &self.validate)
            .field("run", &self.run.as_ref().map(|_| ".."))
            .field("mixins", &self.mixins)
            .field("cache_ttl", &self.cache_ttl)
            .field("connection", &self.connection.is_some())
            .field("apply_options", &self.apply_options)
            .field("schema", &self.schema)
            .field("extensions", &self.extensions)
            .finish()
    }
}
