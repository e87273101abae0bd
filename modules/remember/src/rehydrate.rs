//! Loading persisted slices back from the driver.

use futures::future::join_all;
use serde_json::{Map, Value};
use tracing::debug;

use crate::action::{Action, REMEMBER_REHYDRATED};
use crate::error::RememberError;
use crate::options::{InitConfig, RehydrateFailure, RememberedKeys};
use crate::traits::State;

/// Restored slices keyed by remembered key (or by top-level key in
/// whole-store mode).
pub type RehydratedPayload = Map<String, Value>;

/// Outcome of one rehydration pass: what loaded, and what failed.
#[derive(Debug, Default)]
pub struct Rehydration {
    pub payload: RehydratedPayload,
    pub errors: Vec<RememberError>,
}

impl Rehydration {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    /// Apply the failure policy. Errors are returned for reporting either way.
    pub fn into_payload(self, policy: RehydrateFailure) -> (RehydratedPayload, Vec<RememberError>) {
        match policy {
            RehydrateFailure::Abort if !self.errors.is_empty() => (Map::new(), self.errors),
            _ => (self.payload, self.errors),
        }
    }
}

/// Read every remembered key from the driver.
///
/// Absent entries are omitted. A failing read or unserialize only affects its
/// own key.
pub async fn rehydrate(keys: &RememberedKeys, config: &InitConfig) -> Rehydration {
    let options = &config.options;
    let mut result = Rehydration::default();

    if options.persist_whole_store {
        let storage_key = options.whole_store_key();
        match load(&storage_key, config).await {
            Ok(Some(Value::Object(tree))) => result.payload = tree,
            Ok(Some(other)) => result.errors.push(RememberError::Unserialize {
                key: storage_key,
                source: format!("expected an object, found {other}").into(),
            }),
            Ok(None) => {}
            Err(e) => result.errors.push(e),
        }
    } else {
        let loads = keys
            .iter()
            .map(|key| async move { (key, load(&options.storage_key(key), config).await) });

        // Reads run concurrently; results come back in key order.
        for (key, outcome) in join_all(loads).await {
            match outcome {
                Ok(Some(value)) => {
                    result.payload.insert(key.to_string(), value);
                }
                Ok(None) => {}
                Err(e) => result.errors.push(e),
            }
        }
    }

    debug!(
        loaded = result.payload.len(),
        failed = result.errors.len(),
        "rehydration read complete"
    );
    result
}

async fn load(storage_key: &str, config: &InitConfig) -> Result<Option<Value>, RememberError> {
    let stored = config
        .driver
        .get_item(storage_key)
        .await
        .map_err(|e| RememberError::Read {
            key: storage_key.to_string(),
            source: e.into(),
        })?;

    let Some(stored) = stored else {
        return Ok(None);
    };

    (config.options.unserialize)(&stored, storage_key)
        .map(Some)
        .map_err(|e| RememberError::Unserialize {
            key: storage_key.to_string(),
            source: e.into(),
        })
}

/// Build the REHYDRATED action: restored slices laid over the current tree, so
/// slices that are not remembered survive the full replacement.
pub fn rehydrated_action(current: &State, payload: RehydratedPayload) -> Action {
    let mut merged = match current {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    merged.extend(payload);
    Action::new(REMEMBER_REHYDRATED).with_payload(Value::Object(merged))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn restored_slices_override_current_ones() {
        let current = json!({"todos": ["fresh"], "ui": {"open": true}});
        let mut payload = Map::new();
        payload.insert("todos".into(), json!(["restored"]));

        let action = rehydrated_action(&current, payload);

        assert_eq!(action.kind, REMEMBER_REHYDRATED);
        assert_eq!(
            action.payload,
            Some(json!({"todos": ["restored"], "ui": {"open": true}}))
        );
    }

    #[test]
    fn non_object_state_is_dropped() {
        let mut payload = Map::new();
        payload.insert("n".into(), json!(1));

        let action = rehydrated_action(&Value::Null, payload);

        assert_eq!(action.payload, Some(json!({"n": 1})));
    }

    #[test]
    fn abort_policy_discards_partial_payload() {
        let mut payload = Map::new();
        payload.insert("ok".into(), json!(1));
        let rehydration = Rehydration {
            payload,
            errors: vec![RememberError::Read {
                key: "bad".into(),
                source: "boom".into(),
            }],
        };
        assert!(!rehydration.is_complete());

        let (payload, errors) = rehydration.into_payload(RehydrateFailure::Abort);
        assert!(payload.is_empty());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].key(), "bad");
    }
}
