//! Result caching for methods declared with a cache TTL.
//!
//! Entries are addressed by `"{method}:{serialized arguments}"`, so two
//! methods never share an entry unless they share a name.
//!
//! Concurrent misses on the same key are not coalesced: each runs the
//! method body and the last write wins.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use serde_json::Value;

mod memory;

pub use memory::MemoryCache;

/// Separator between the method name and the serialized arguments.
pub const KEY_SEPARATOR: char = ':';

/// Storage for memoized method results.
pub trait ResultCache: Send + Sync {
    /// Non-expired value stored under `key`.
    fn get(&self, key: &str) -> Option<Value>;

    /// Store `value` under `key` for `ttl`, replacing any previous entry.
    fn put(&self, key: String, value: Value, ttl: Duration);
}

/// Deterministic serializer used to build cache keys.
pub type KeySerializer =
    Arc<dyn Fn(&Value) -> Result<String, serde_json::Error> + Send + Sync>;

/// Canonical JSON: object keys are emitted in sorted order, so equal
/// values always serialize identically.
pub fn canonical_json(value: &Value) -> Result<String, serde_json::Error> {
    serde_json::to_string(&sorted(value))
}

// serde_json may be built with `preserve_order`, so sort explicitly.
fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key.clone(), sorted(value)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

pub fn default_serializer() -> KeySerializer {
    Arc::new(canonical_json)
}

/// Build the cache key for one invocation.
pub fn cache_key(
    method: &str,
    args: &Value,
    serializer: &KeySerializer,
) -> Result<String, serde_json::Error> {
    let serialized = serializer(args)?;
    let mut key = String::with_capacity(method.len() + 1 + serialized.len());
    key.push_str(method);
    key.push(KEY_SEPARATOR);
    key.push_str(&serialized);
    Ok(key)
}

static GLOBAL: OnceLock<Arc<MemoryCache>> = OnceLock::new();

/// Install the process-wide cache. Only the first call has an effect;
/// returns `false` if a cache was already in place.
pub fn init_global(cache: MemoryCache) -> bool {
    GLOBAL.set(Arc::new(cache)).is_ok()
}

/// Process-wide cache shared by every method that does not bring its own.
/// Lives for the rest of the process once created.
pub fn global() -> Arc<MemoryCache> {
    GLOBAL.get_or_init(|| Arc::new(MemoryCache::new())).clone()
}
