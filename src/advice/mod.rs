//! Ready-made mixins for cross-cutting concerns.
//!
//! Advice is applied at declaration time through the mixin pipeline, not
//! inside method bodies:
//!
//! ```ignore
//! let method = Method::new(
//!     MethodConfig::new("todos.count")
//!         .no_validation()
//!         .run(count_todos)
//!         .mixin(traced())
//!         .mixin(with_cache_ttl(Duration::from_secs(30))),
//! )?;
//! ```
//!
//! # Available Advice
//!
//! - [`traced`] - Wraps `validate` and `run` with tracing spans and timings
//! - [`with_cache_ttl`] - Default cache TTL for methods that declare none
//! - [`with_apply_options`] - Default transport options

use std::time::Duration;

use crate::method::{ApplyOptions, MethodConfig};
use crate::mixin::Mixin;

mod traced;

pub use traced::traced;

pub const WITH_CACHE_TTL: &str = "withCacheTtl";
pub const WITH_APPLY_OPTIONS: &str = "withApplyOptions";

/// Cache results for `ttl` unless the declaration already sets a TTL.
pub fn with_cache_ttl(ttl: Duration) -> Mixin {
    Mixin::named(WITH_CACHE_TTL, move |mut config: MethodConfig| {
        config.cache_ttl.get_or_insert(ttl);
        Some(config)
    })
}

/// Add transport options. Keys the declaration already sets are kept.
pub fn with_apply_options(options: ApplyOptions) -> Mixin {
    Mixin::named(WITH_APPLY_OPTIONS, move |mut config: MethodConfig| {
        let declared = config.apply_options.take().unwrap_or_default();
        config.apply_options = Some(declared.merged_over(options.clone()));
        Some(config)
    })
}
