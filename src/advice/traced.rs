//! Tracing advice.
//!
//! Wraps a declaration's `validate` and `run` so each execution gets a
//! span plus a timing event, without touching the method body.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, debug_span, warn};

use crate::context::ExecutionContext;
use crate::method::{MethodConfig, Validate};
use crate::mixin::Mixin;

pub const TRACED: &str = "traced";

/// Mixin emitting a span and timing event around `validate` and `run`.
///
/// Emits:
/// - `debug` on success, with `elapsed_us`
/// - `warn` when `run` fails
/// - `debug` when `validate` rejects the arguments
pub fn traced() -> Mixin {
    Mixin::named(TRACED, |mut config: MethodConfig| {
        if let Some(Validate::With(validate)) = config.validate.clone() {
            config.validate = Some(Validate::With(Arc::new(
                move |ctx: &ExecutionContext, args: &Value| {
                    let _span = debug_span!("validate", method = %ctx.name).entered();
                    let start = Instant::now();
                    let result = validate(ctx, args);
                    let elapsed_us = start.elapsed().as_micros() as u64;
                    match &result {
                        Ok(_) => debug!(elapsed_us, "Validated arguments"),
                        Err(error) => debug!(elapsed_us, error = %error, "Rejected arguments"),
                    }
                    result
                },
            )));
        }

        if let Some(run) = config.run.take() {
            config.run = Some(Arc::new(move |ctx: &ExecutionContext, args: &Value| {
                let _span = debug_span!(
                    "run",
                    method = %ctx.name,
                    simulation = ctx.is_simulation
                )
                .entered();
                let start = Instant::now();
                let result = run(ctx, args);
                let elapsed_us = start.elapsed().as_micros() as u64;
                match &result {
                    Ok(_) => debug!(elapsed_us, "Method completed"),
                    Err(error) => warn!(elapsed_us, error = %error, "Method failed"),
                }
                result
            }));
        }

        Some(config)
    })
}
