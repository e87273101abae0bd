//! Public entry point: validates configuration and wraps store creation.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::init::{self, Phase};
use crate::options::{InitConfig, Options, RememberedKeys};
use crate::store::Store;
use crate::traits::{Driver, Reducer, State, StateContainer};

/// A validated enhancer, ready to wrap one `create_store` function.
pub struct RememberEnhancer {
    keys: RememberedKeys,
    config: InitConfig,
    runtime: Handle,
    phase: watch::Sender<Phase>,
}

/// Validate the configuration and build an enhancer.
///
/// Fails synchronously when `driver` is missing, when `keys` is not a list of
/// unique names, or when called outside a tokio runtime.
///
/// ```rust,no_run
/// # use std::sync::Arc;
/// # use remember::{remember_enhancer, remember_reducer, Action, MemoryDriver, Options, State};
/// # async fn example() -> Result<(), remember::ConfigError> {
/// let root = |state: Option<State>, _action: &Action| state.unwrap_or_default();
/// let store = remember_enhancer(Some(Arc::new(MemoryDriver::new())), ["todos"], Options::default())?
///     .create_store(remember_reducer(root), None);
/// # Ok(())
/// # }
/// ```
pub fn remember_enhancer<K>(
    driver: Option<Arc<dyn Driver>>,
    keys: K,
    options: Options,
) -> Result<RememberEnhancer>
where
    K: TryInto<RememberedKeys, Error = ConfigError>,
{
    let driver = driver.ok_or(ConfigError::DriverRequired)?;
    let keys = keys.try_into()?;
    let runtime = Handle::try_current().map_err(|_| ConfigError::NoRuntime)?;
    let (phase, _) = watch::channel(Phase::Idle);

    Ok(RememberEnhancer {
        keys,
        config: InitConfig { driver, options },
        runtime,
        phase,
    })
}

impl RememberEnhancer {
    pub fn keys(&self) -> &RememberedKeys {
        &self.keys
    }

    pub fn config(&self) -> &InitConfig {
        &self.config
    }

    /// Watch the orchestrator's progress.
    pub fn phase(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    /// Wrap `create_store`. The returned function forwards its arguments to
    /// `create_store` untouched, starts exactly one orchestrator run for the
    /// resulting store, and returns the store without waiting for it.
    pub fn enhance<C, R, E, S>(self, create_store: C) -> impl FnOnce(R, Option<State>, E) -> Arc<S>
    where
        C: FnOnce(R, Option<State>, E) -> Arc<S>,
        S: StateContainer,
    {
        move |reducer, initial_state, enhancer| {
            let store = create_store(reducer, initial_state, enhancer);
            self.start(store.clone());
            store
        }
    }

    /// Shortcut for enhancing [`Store::create`].
    pub fn create_store<R: Reducer>(self, reducer: R, preloaded: Option<State>) -> Arc<Store> {
        let create = |reducer: R, preloaded: Option<State>, _enhancer: ()| Store::create(reducer, preloaded);
        self.enhance(create)(reducer, preloaded, ())
    }

    fn start<S: StateContainer>(self, store: Arc<S>) {
        debug!(keys = self.keys.len(), "starting remember orchestrator");
        self.runtime
            .spawn(init::run(store, self.keys, self.config, Some(self.phase)));
    }
}
