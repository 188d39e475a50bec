//! Declaration-time configuration transforms.
//!
//! A mixin receives the method declaration and hands back a (possibly
//! rewritten) declaration. Mixins run once, in declared order, before the
//! method is normalized and registered:
//!
//! ```ignore
//! let method = Method::new(
//!     MethodConfig::new("todos.insert")
//!         .mixin(schema_mixin())   // turns `schema` into `validate`
//!         .mixin(traced())         // wraps `run` with spans
//!         .schema(todo_schema)
//!         .run(insert_todo),
//! )?;
//! ```
//!
//! A mixin that hands back nothing aborts construction.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::method::MethodConfig;

/// Transform signature. `None` means the mixin failed to produce a declaration.
pub type MixinFn = dyn Fn(MethodConfig) -> Option<MethodConfig> + Send + Sync;

/// A named or anonymous declaration transform.
#[derive(Clone)]
pub struct Mixin {
    name: Option<String>,
    apply: Arc<MixinFn>,
}

impl Mixin {
    /// Mixin whose name appears in construction errors.
    pub fn named<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(MethodConfig) -> Option<MethodConfig> + Send + Sync + 'static,
    {
        Self {
            name: Some(name.into()),
            apply: Arc::new(f),
        }
    }

    pub fn anonymous<F>(f: F) -> Self
    where
        F: Fn(MethodConfig) -> Option<MethodConfig> + Send + Sync + 'static,
    {
        Self {
            name: None,
            apply: Arc::new(f),
        }
    }

    /// Mixin that always produces its input; useful as a placeholder.
    pub fn identity() -> Self {
        Self::anonymous(Some)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn apply(&self, config: MethodConfig) -> Option<MethodConfig> {
        (self.apply)(config)
    }
}

impl fmt::Debug for Mixin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "Mixin({})", name),
            None => f.write_str("Mixin(<anonymous>)"),
        }
    }
}

/// Thread `config` through `mixins` in order.
///
/// Stops at the first mixin that produces nothing. The error always names
/// the method as declared before any mixin ran.
pub fn apply_mixins(config: MethodConfig, mixins: &[Mixin]) -> ConfigResult<MethodConfig> {
    let declared_name = config.name.clone();
    let mut config = config;

    for (position, mixin) in mixins.iter().enumerate() {
        config = match mixin.apply(config) {
            Some(next) => next,
            None => {
                return Err(ConfigError::MixinReturnedNothing {
                    method: declared_name,
                    mixin: mixin.name.clone(),
                })
            }
        };
        debug!(
            method = %declared_name,
            mixin = mixin.name().unwrap_or("<anonymous>"),
            position,
            "Applied mixin"
        );
    }

    Ok(config)
}
