//! Action vocabulary shared by the reducer wrapper and the orchestrator.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Dispatched once, after persisted slices have been read back from the driver.
pub const REMEMBER_REHYDRATED: &str = "@@REMEMBER_REHYDRATED";

/// Dispatched after every successful write. The payload lists the written keys.
pub const REMEMBER_PERSISTED: &str = "@@REMEMBER_PERSISTED";

/// The container's own bootstrap action.
pub const INIT: &str = "@@INIT";

const REDUX_INIT_PREFIX: &str = "@@redux/INIT";

/// A dispatched action. Serializes as `{"type": ..., "payload": ...}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl Action {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }
}

/// True for the container's initialization actions (`@@INIT`, `@@redux/INIT*`).
pub fn is_init_action(kind: &str) -> bool {
    kind == INIT || kind.starts_with(REDUX_INIT_PREFIX)
}
