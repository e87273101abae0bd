//! Seams between the persistence layer and its collaborators.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::action::Action;

/// A state tree. The root is a JSON object whose entries are the slices.
pub type State = Value;

/// Callback invoked by a container after every dispatch.
pub type Listener = Arc<dyn Fn() + Send + Sync>;

/// Handle returned by [`StateContainer::subscribe`].
pub type SubscriptionId = u64;

/// Asynchronous key-value storage backend.
///
/// Implemented by [`MemoryDriver`](crate::driver::MemoryDriver) and
/// [`FileDriver`](crate::driver::FileDriver). Also implemented for `Arc<D>` so a
/// driver can be shared with test assertions.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Read a stored value. `Ok(None)` when nothing is stored under `key`.
    async fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set_item(&self, key: &str, value: String) -> Result<()>;
}

/// Pure state transition. No I/O, no side effects.
///
/// `state` is `None` on the very first call, before any state exists.
pub trait Reducer: Send + Sync + 'static {
    fn reduce(&self, state: Option<State>, action: &Action) -> State;
}

impl<F> Reducer for F
where
    F: Fn(Option<State>, &Action) -> State + Send + Sync + 'static,
{
    fn reduce(&self, state: Option<State>, action: &Action) -> State {
        self(state, action)
    }
}

/// What the orchestrator needs from a live store.
pub trait StateContainer: Send + Sync + 'static {
    /// Snapshot of the current state tree.
    fn get_state(&self) -> State;

    /// Run the reducer synchronously, then notify listeners.
    fn dispatch(&self, action: Action);

    /// Register a change listener. It stays registered until unsubscribed.
    fn subscribe(&self, listener: Listener) -> SubscriptionId;

    fn unsubscribe(&self, id: SubscriptionId);
}

// ---------------------------------------------------------------------------
// Arc<D> blanket: lets callers keep a handle on a shared driver
// ---------------------------------------------------------------------------

#[async_trait]
impl<D: Driver + ?Sized> Driver for Arc<D> {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        (**self).get_item(key).await
    }

    async fn set_item(&self, key: &str, value: String) -> Result<()> {
        (**self).set_item(key, value).await
    }
}
