//! Reducer wrapper that lets the rehydrated payload replace the state tree.

use serde_json::{Map, Value};

use crate::action::{is_init_action, Action, REMEMBER_REHYDRATED};
use crate::traits::{Reducer, State};

/// Wraps a root reducer. See [`remember_reducer`].
#[derive(Debug, Clone)]
pub struct RememberReducer<R> {
    root: R,
}

/// Wrap `root` so that:
///
/// - container initialization actions leave the incoming state untouched,
/// - [`REMEMBER_REHYDRATED`] replaces the whole tree with its payload,
/// - every other action is delegated to `root`.
pub fn remember_reducer<R: Reducer>(root: R) -> RememberReducer<R> {
    RememberReducer { root }
}

impl<R: Reducer> RememberReducer<R> {
    /// Reduce with both state and action optional. A missing state is an
    /// empty object; a missing action behaves like an action nobody handles.
    pub fn apply(&self, state: Option<State>, action: Option<&Action>) -> State {
        let state = state.unwrap_or_else(empty);
        let Some(action) = action else {
            return self.root.reduce(Some(state), &Action::default());
        };

        if is_init_action(&action.kind) {
            return state;
        }

        if action.is(REMEMBER_REHYDRATED) {
            return action.payload.clone().unwrap_or_else(empty);
        }

        self.root.reduce(Some(state), action)
    }
}

impl<R: Reducer> Reducer for RememberReducer<R> {
    fn reduce(&self, state: Option<State>, action: &Action) -> State {
        self.apply(state, Some(action))
    }
}

fn empty() -> Value {
    Value::Object(Map::new())
}
