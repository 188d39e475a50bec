//! Bootstrap utilities for applications declaring methods.
//!
//! Shared initialization code run once at startup, before any method is
//! constructed.

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Settings, LOG_ENV_VAR};
use crate::connection::{self, Connection};

fn env_filter() -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
}

/// Initialize tracing with VALIDATED_METHOD_LOG environment variable.
///
/// Defaults to "info" level if VALIDATED_METHOD_LOG is not set. Panics if
/// a global subscriber is already installed.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Like [`init_tracing`], but returns `false` instead of panicking when a
/// global subscriber is already installed.
pub fn try_init_tracing() -> bool {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}

/// Install the process-wide defaults methods fall back on: the cache sized
/// by `settings` and `connection` as the default connection.
pub fn install_defaults(settings: &Settings, connection: Arc<dyn Connection>) {
    if !settings.install_cache() {
        warn!("Process-wide cache already initialized; cache settings ignored");
    }
    if connection::set_default_connection(connection).is_some() {
        warn!("Replaced previously installed default connection");
    }
    info!(
        max_cache_entries = ?settings.cache.max_entries,
        method_overrides = settings.methods.len(),
        "Installed method defaults"
    );
}
