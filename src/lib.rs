//! Validated Method - declarative remote methods
//!
//! A method is declared once with a name, an argument validator and a body,
//! then invoked either in-process ([`Method::execute`]) or through a
//! transport ([`Method::call`], [`Method::call_async`]). Declarations pass
//! through a mixin pipeline before they are frozen, and results may be
//! cached per argument value for a fixed TTL.
//!
//! ```ignore
//! let method = Method::new(
//!     MethodConfig::new("todos.insert")
//!         .mixin(schema_mixin())
//!         .schema(Schema::new().field("text", FieldType::String))
//!         .run(|ctx, args| Ok(json!({"id": ctx.seeded_id("todo").to_string(), "text": args["text"]}))),
//! )?;
//!
//! let todo = method.call_async(json!({"text": "write docs"})).await?;
//! ```

pub mod advice;
pub mod cache;
pub mod config;
pub mod connection;
pub mod context;
pub mod error;
pub mod invocation;
pub mod method;
pub mod mixin;
pub mod utils;
pub mod validation;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use cache::{MemoryCache, ResultCache};
pub use connection::{Connection, DeliveryMode, LocalConnection, MethodHandler};
pub use context::ExecutionContext;
pub use error::{
    BoxError, ConfigError, ConfigResult, FieldError, MethodError, MethodResult, TransportError,
    ValidationError,
};
pub use invocation::{CallFuture, Completion};
pub use method::{ApplyOptions, Method, MethodConfig, Validate, ValidateReturn};
pub use mixin::Mixin;
pub use validation::{schema_mixin, FieldType, Schema};
