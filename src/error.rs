//! Error types for method construction and invocation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Boxed error returned by user-supplied `validate` and `run` functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result of executing or calling a method.
pub type MethodResult = std::result::Result<Value, MethodError>;

/// Result type for construction-time operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Default message carried by a [`ValidationError`].
pub const VALIDATION_FAILED: &str = "Validation failed";

/// Message of the usage error raised when `validate` returns a value.
pub const VALIDATE_RETURNED_VALUE: &str =
    "Returning from validate doesn't do anything; perhaps you meant to throw an error?";

/// A single field-level violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    /// Name of the offending field.
    pub name: String,
    /// Violation kind (e.g. `required`, `expectedType`).
    #[serde(rename = "type")]
    pub kind: String,
    /// Optional structured detail for the violation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl FieldError {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Structured validation failure.
///
/// Validators raise this to report which fields are malformed. Any other
/// error raised by a validator is wrapped into one with no field errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
    pub message: String,
}

impl ValidationError {
    pub fn new(errors: Vec<FieldError>) -> Self {
        Self {
            errors,
            message: VALIDATION_FAILED.to_string(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Wrap an arbitrary validator error, keeping field detail when the
    /// error already is a `ValidationError` or a validation `MethodError`
    /// raised by a delegated method.
    pub fn wrap(error: BoxError) -> Self {
        let error = match error.downcast::<ValidationError>() {
            Ok(validation) => return *validation,
            Err(other) => other,
        };
        match error.downcast::<MethodError>() {
            Ok(method_error) => match *method_error {
                MethodError::Validation { error, .. } => error,
                other => Self::plain(other.to_string()),
            },
            Err(other) => Self::plain(other.to_string()),
        }
    }

    fn plain(message: String) -> Self {
        Self {
            errors: Vec::new(),
            message,
        }
    }
}

/// Errors reported by a transport.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    #[error("A method named '{0}' is already defined")]
    AlreadyRegistered(String),

    #[error("Method '{0}' not found")]
    MethodNotFound(String),

    #[error("Connection closed: {0}")]
    Disconnected(String),

    #[error("Remote error: {0}")]
    Remote(String),
}

/// Errors surfaced by `execute` and the `call` family.
#[derive(Debug, thiserror::Error)]
pub enum MethodError {
    /// `validate` raised. Carries the field-level detail when available.
    #[error("Validation failed for method '{method}': {error}")]
    Validation {
        method: String,
        #[source]
        error: ValidationError,
    },

    /// `validate` returned a value instead of raising.
    #[error("{}", VALIDATE_RETURNED_VALUE)]
    Usage { method: String },

    /// Anything `run` raised, propagated verbatim.
    #[error(transparent)]
    Run(BoxError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The arguments could not be serialized into a cache key.
    #[error("Failed to serialize arguments of method '{method}'")]
    Serialization {
        method: String,
        #[source]
        source: serde_json::Error,
    },
}

impl MethodError {
    /// Field errors of a validation failure.
    pub fn validation_errors(&self) -> Option<&[FieldError]> {
        match self {
            MethodError::Validation { error, .. } => Some(&error.errors),
            _ => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, MethodError::Validation { .. })
    }

    pub fn is_usage(&self) -> bool {
        matches!(self, MethodError::Usage { .. })
    }

    /// Returns the transport error, if this is one.
    pub fn transport(&self) -> Option<&TransportError> {
        match self {
            MethodError::Transport(e) => Some(e),
            _ => None,
        }
    }
}

fn mixin_label(mixin: &Option<String>) -> String {
    match mixin {
        Some(name) => format!("The function '{}'", name),
        None => "One of the mixins".to_string(),
    }
}

/// Errors raised while constructing a method.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Method name must be a non-empty string")]
    EmptyName,

    /// A mixin produced no configuration. `method` is the name declared
    /// before any mixin ran.
    #[error(
        "Error in {method} method: {} didn't return the options object.",
        mixin_label(.mixin)
    )]
    MixinReturnedNothing {
        method: String,
        mixin: Option<String>,
    },

    #[error("Method '{method}' has no validate function; use Validate::Skip for methods without arguments")]
    MissingValidate { method: String },

    #[error("Method '{method}' has no run function")]
    MissingRun { method: String },

    #[error("Method '{method}' has a zero cache TTL; the TTL must be positive")]
    InvalidCacheTtl { method: String },

    #[error("Method '{method}' has no connection and no default connection is installed")]
    NoConnection { method: String },

    #[error("Failed to register method '{method}'")]
    Registration {
        method: String,
        #[source]
        source: TransportError,
    },

    #[error("Failed to load settings: {0}")]
    Load(#[from] ::config::ConfigError),
}
