//! Minimal synchronous state container.
//!
//! Reduce → commit → notify. This is the `createStore` the enhancer wraps by
//! default; any other container can be used through [`StateContainer`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::{Map, Value};
use tracing::trace;

use crate::action::{Action, INIT};
use crate::traits::{Listener, Reducer, State, StateContainer, SubscriptionId};

/// A store holding one state tree, mutated only by its reducer.
pub struct Store {
    reducer: Box<dyn Reducer>,
    state: Mutex<State>,
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
    next_listener: AtomicU64,
}

impl Store {
    /// Build a store and run the reducer once with the `@@INIT` action so the
    /// preloaded state (or the reducer's defaults) becomes the initial state.
    pub fn create(reducer: impl Reducer, preloaded: Option<State>) -> Arc<Self> {
        let initial = reducer.reduce(preloaded, &Action::new(INIT));
        Arc::new(Self {
            reducer: Box::new(reducer),
            state: Mutex::new(initial),
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(1),
        })
    }

    fn notify(&self) {
        // Snapshot so listeners may subscribe, unsubscribe or dispatch.
        let listeners: Vec<Listener> = lock(&self.listeners)
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        for listener in listeners {
            listener();
        }
    }
}

impl StateContainer for Store {
    fn get_state(&self) -> State {
        lock(&self.state).clone()
    }

    fn dispatch(&self, action: Action) {
        trace!(action = %action.kind, "dispatch");
        {
            let mut state = lock(&self.state);
            let current = std::mem::replace(&mut *state, Value::Object(Map::new()));
            *state = self.reducer.reduce(Some(current), &action);
        }
        self.notify();
    }

    fn subscribe(&self, listener: Listener) -> SubscriptionId {
        let id = self.next_listener.fetch_add(1, Ordering::SeqCst);
        lock(&self.listeners).push((id, listener));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        lock(&self.listeners).retain(|(existing, _)| *existing != id);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
