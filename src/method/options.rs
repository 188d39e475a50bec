//! Transport-level invocation options.
//!
//! Keys are the transport's own option names, so they keep the transport's
//! spelling (`returnStubValue`, `throwStubExceptions`, ...).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Return the locally simulated result to the caller before the remote
/// result arrives.
pub const RETURN_STUB_VALUE: &str = "returnStubValue";

/// Raise a failing simulation to the caller instead of also invoking the
/// remote side.
pub const THROW_STUB_EXCEPTIONS: &str = "throwStubExceptions";

/// Options map passed to [`Connection::apply`](crate::connection::Connection::apply).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplyOptions(Map<String, Value>);

impl ApplyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in defaults every method starts from.
    pub fn defaults() -> Self {
        Self::new()
            .with(RETURN_STUB_VALUE, Value::Bool(true))
            .with(THROW_STUB_EXCEPTIONS, Value::Bool(true))
    }

    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Boolean option; missing or non-boolean values read as `false`.
    pub fn flag(&self, key: &str) -> bool {
        self.0.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn return_stub_value(&self) -> bool {
        self.flag(RETURN_STUB_VALUE)
    }

    pub fn throw_stub_exceptions(&self) -> bool {
        self.flag(THROW_STUB_EXCEPTIONS)
    }

    /// Layer `self` over `base`; keys set in `self` win.
    pub fn merged_over(self, base: ApplyOptions) -> ApplyOptions {
        let mut merged = base.0;
        merged.extend(self.0);
        ApplyOptions(merged)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl From<Map<String, Value>> for ApplyOptions {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
