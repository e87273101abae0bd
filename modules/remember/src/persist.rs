//! Writing changed slices to the driver, throttled.

use std::sync::Weak;

use serde_json::{json, Map, Value};
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::action::{Action, REMEMBER_PERSISTED};
use crate::error::RememberError;
use crate::options::{InitConfig, RememberedKeys, WHOLE_STORE_KEY};
use crate::traits::{State, StateContainer};

/// Serializes and writes remembered slices. Remembers what it last wrote so
/// unchanged slices are skipped and failed ones are retried next time.
pub struct Persister {
    keys: RememberedKeys,
    config: InitConfig,
    last: Map<String, Value>,
    last_whole: Option<Value>,
}

impl Persister {
    pub fn new(keys: RememberedKeys, config: InitConfig) -> Self {
        Self {
            keys,
            config,
            last: Map::new(),
            last_whole: None,
        }
    }

    /// Treat the slices in `state` as already stored.
    pub fn seed(&mut self, state: &State) {
        if self.config.options.persist_whole_store {
            self.last_whole = Some(state.clone());
            return;
        }
        for key in self.keys.iter() {
            if let Some(value) = state.get(key) {
                self.last.insert(key.to_string(), value.clone());
            }
        }
    }

    /// Write every slice that changed since the last successful write.
    /// Returns the keys that were written.
    pub async fn flush(&mut self, state: &State) -> Vec<String> {
        if self.config.options.persist_whole_store {
            return self.flush_whole(state).await;
        }

        let mut written = Vec::new();
        for key in self.keys.iter() {
            let Some(value) = state.get(key) else {
                continue;
            };
            if self.last.get(key) == Some(value) {
                continue;
            }

            let storage_key = self.config.options.storage_key(key);
            match self.write(&storage_key, value).await {
                Ok(()) => {
                    self.last.insert(key.to_string(), value.clone());
                    written.push(key.to_string());
                }
                Err(e) => self.config.options.report(&e),
            }
        }
        written
    }

    async fn flush_whole(&mut self, state: &State) -> Vec<String> {
        if self.last_whole.as_ref() == Some(state) {
            return Vec::new();
        }

        let storage_key = self.config.options.whole_store_key();
        match self.write(&storage_key, state).await {
            Ok(()) => {
                self.last_whole = Some(state.clone());
                vec![WHOLE_STORE_KEY.to_string()]
            }
            Err(e) => {
                self.config.options.report(&e);
                Vec::new()
            }
        }
    }

    async fn write(&self, storage_key: &str, value: &Value) -> Result<(), RememberError> {
        let stored = (self.config.options.serialize)(value, storage_key).map_err(|e| {
            RememberError::Serialize {
                key: storage_key.to_string(),
                source: e.into(),
            }
        })?;

        trace!(key = storage_key, bytes = stored.len(), "writing slice");
        self.config
            .driver
            .set_item(storage_key, stored)
            .await
            .map_err(|e| RememberError::Write {
                key: storage_key.to_string(),
                source: e.into(),
            })
    }

    /// Throttled persistence loop.
    ///
    /// Each change notification opens a window of `persist_throttle_ms`; when
    /// it closes, the latest state is flushed and `REMEMBER_PERSISTED` is
    /// dispatched with the written keys. Changes arriving while a flush is in
    /// flight open the next window once it settles. Exits when the store is
    /// dropped.
    pub async fn run<S: StateContainer>(mut self, store: Weak<S>, mut changes: watch::Receiver<()>) {
        let throttle = self.config.options.throttle();

        while changes.changed().await.is_ok() {
            tokio::time::sleep(throttle).await;

            let Some(store) = store.upgrade() else {
                break;
            };
            // Everything notified so far is covered by the state read below.
            changes.borrow_and_update();

            let state = store.get_state();
            let written = self.flush(&state).await;
            if written.is_empty() {
                continue;
            }

            debug!(keys = ?written, "persisted");
            store.dispatch(Action::new(REMEMBER_PERSISTED).with_payload(json!(written)));
        }

        debug!("store dropped, persistence stopped");
    }
}
