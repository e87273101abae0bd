//! Orchestrator: rehydrate once, then persist on every change.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::options::{InitConfig, RememberedKeys};
use crate::persist::Persister;
use crate::rehydrate::{rehydrate, rehydrated_action};
use crate::traits::StateContainer;

/// Lifecycle of one orchestrator run. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Idle,
    Rehydrating,
    /// Rehydrated and listening for changes. Lasts for the store's lifetime.
    Subscribed,
}

/// Rehydrate `store`, then keep persisting it until it is dropped.
pub async fn init<S: StateContainer>(store: Arc<S>, keys: RememberedKeys, config: InitConfig) {
    run(store, keys, config, None).await
}

pub(crate) async fn run<S: StateContainer>(
    store: Arc<S>,
    keys: RememberedKeys,
    config: InitConfig,
    phase: Option<watch::Sender<Phase>>,
) {
    let advance = |next: Phase| {
        if let Some(phase) = &phase {
            phase.send_replace(next);
        }
    };

    advance(Phase::Rehydrating);
    debug!(
        keys = ?keys.as_slice(),
        whole_store = config.options.persist_whole_store,
        "rehydrating"
    );

    let (payload, errors) = rehydrate(&keys, &config)
        .await
        .into_payload(config.options.rehydrate_failure);
    for error in &errors {
        config.options.report(error);
    }

    let restored = payload.len();
    let action = rehydrated_action(&store.get_state(), payload);
    let seed = action.payload.clone().unwrap_or_default();
    store.dispatch(action);

    // The listener goes in only after REHYDRATED, so no write can observe the
    // pre-rehydration tree. Anything dispatched in between is caught below.
    let mut persister = Persister::new(keys, config);
    persister.seed(&seed);

    let (notify, changes) = watch::channel(());
    let listener = notify.clone();
    store.subscribe(Arc::new(move || {
        let _ = listener.send(());
    }));
    if store.get_state() != seed {
        let _ = notify.send(());
    }
    drop(notify);

    info!(restored, failed = errors.len(), "rehydrated");
    advance(Phase::Subscribed);

    let weak = Arc::downgrade(&store);
    drop(store);
    persister.run(weak, changes).await;
}
