//! Persistence for reducer-driven state containers.
//!
//! Pick top-level slices of the state tree, write them to a pluggable
//! [`Driver`] whenever they change, and restore them when the store starts:
//! rehydrate once → dispatch `REMEMBER_REHYDRATED` → subscribe → throttled
//! persist → dispatch `REMEMBER_PERSISTED`.
//!
//! Wrap the root reducer with [`remember_reducer`] and store creation with
//! [`remember_enhancer`].

pub mod action;
pub mod driver;
pub mod enhancer;
pub mod error;
pub mod init;
pub mod options;
pub mod persist;
pub mod reducer;
pub mod rehydrate;
pub mod store;
pub mod traits;

pub use action::{Action, REMEMBER_PERSISTED, REMEMBER_REHYDRATED};
pub use driver::{FileDriver, MemoryDriver};
pub use enhancer::{remember_enhancer, RememberEnhancer};
pub use error::{ConfigError, RememberError};
pub use init::{init, Phase};
pub use options::{InitConfig, Options, PersistSettings, RehydrateFailure, RememberedKeys};
pub use persist::Persister;
pub use reducer::{remember_reducer, RememberReducer};
pub use rehydrate::{rehydrate, rehydrated_action, Rehydration, RehydratedPayload};
pub use store::Store;
pub use traits::{Driver, Listener, Reducer, State, StateContainer, SubscriptionId};
