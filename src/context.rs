//! Per-invocation execution context.

use serde_json::{Map, Value};
use uuid::Uuid;

/// Receiver handed to `validate` and `run` for a single invocation.
///
/// The executor always overwrites `name` with the method's own name.
/// Transports fill in the caller and connection metadata they know about.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub name: String,
    pub user_id: Option<String>,
    pub connection_id: Option<String>,
    /// True while a transport runs a local optimistic pre-execution.
    pub is_simulation: bool,
    /// Seed shared by the simulated and authoritative executions so both
    /// can generate the same identifiers.
    pub random_seed: Uuid,
    pub metadata: Map<String, Value>,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self {
            name: String::new(),
            user_id: None,
            connection_id: None,
            is_simulation: false,
            random_seed: Uuid::new_v4(),
            metadata: Map::new(),
        }
    }
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_connection_id(mut self, connection_id: impl Into<String>) -> Self {
        self.connection_id = Some(connection_id.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn simulated(mut self) -> Self {
        self.is_simulation = true;
        self
    }

    /// Deterministic identifier derived from the invocation seed.
    ///
    /// The same `scope` yields the same id in the simulated and the
    /// authoritative run of one invocation.
    pub fn seeded_id(&self, scope: &str) -> Uuid {
        Uuid::new_v5(&self.random_seed, scope.as_bytes())
    }
}
