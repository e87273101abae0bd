//! Configuration: remembered keys, options and the orchestrator's config record.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;
use typed_builder::TypedBuilder;

use crate::error::{ConfigError, RememberError, Result};
use crate::traits::Driver;

/// Driver key suffix used when the whole tree is persisted as one unit.
pub const WHOLE_STORE_KEY: &str = "rootState";

pub const DEFAULT_PERSIST_THROTTLE_MS: u64 = 100;

/// `(value, key) -> stored string`
pub type SerializeFn = Arc<dyn Fn(&Value, &str) -> anyhow::Result<String> + Send + Sync>;

/// `(stored string, key) -> value`
pub type UnserializeFn = Arc<dyn Fn(&str, &str) -> anyhow::Result<Value> + Send + Sync>;

/// Receives every runtime error after it has been logged.
pub type ErrorHook = Arc<dyn Fn(&RememberError) + Send + Sync>;

// ---------------------------------------------------------------------------
// RememberedKeys
// ---------------------------------------------------------------------------

/// Ordered list of unique top-level slice names to persist.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RememberedKeys(Vec<String>);

impl RememberedKeys {
    fn from_strings<I>(keys: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for key in keys {
            let key = key.into();
            if !seen.insert(key.clone()) {
                return Err(ConfigError::DuplicateKey(key));
            }
            out.push(key);
        }
        Ok(Self(out))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<Vec<String>> for RememberedKeys {
    type Error = ConfigError;

    fn try_from(keys: Vec<String>) -> Result<Self> {
        Self::from_strings(keys)
    }
}

impl TryFrom<Vec<&str>> for RememberedKeys {
    type Error = ConfigError;

    fn try_from(keys: Vec<&str>) -> Result<Self> {
        Self::from_strings(keys)
    }
}

impl TryFrom<&[&str]> for RememberedKeys {
    type Error = ConfigError;

    fn try_from(keys: &[&str]) -> Result<Self> {
        Self::from_strings(keys.iter().copied())
    }
}

impl TryFrom<&[String]> for RememberedKeys {
    type Error = ConfigError;

    fn try_from(keys: &[String]) -> Result<Self> {
        Self::from_strings(keys.iter().cloned())
    }
}

impl<const N: usize> TryFrom<[&str; N]> for RememberedKeys {
    type Error = ConfigError;

    fn try_from(keys: [&str; N]) -> Result<Self> {
        Self::from_strings(keys)
    }
}

/// Keys coming from untyped configuration must be a JSON array of strings.
impl TryFrom<Value> for RememberedKeys {
    type Error = ConfigError;

    fn try_from(value: Value) -> Result<Self> {
        let Value::Array(items) = value else {
            return Err(ConfigError::KeysNotArray);
        };
        let keys = items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                _ => Err(ConfigError::KeysNotArray),
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_strings(keys)
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// What to do when some keys fail to load during rehydration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RehydrateFailure {
    /// Rehydrate the keys that loaded; report the rest.
    #[default]
    Partial,
    /// Rehydrate nothing if any key failed.
    Abort,
}

/// Tuning surface of the enhancer. Every field has a default.
///
/// ```rust
/// # use remember::Options;
/// let options = Options::builder()
///     .prefix("@@remember-")
///     .persist_throttle_ms(250)
///     .build();
/// assert_eq!(options.storage_key("todos"), "@@remember-todos");
/// ```
#[derive(Clone, TypedBuilder)]
pub struct Options {
    #[builder(default, setter(into))]
    pub prefix: String,

    #[builder(default = DEFAULT_PERSIST_THROTTLE_MS)]
    pub persist_throttle_ms: u64,

    #[builder(
        default = json_serializer(),
        setter(transform = |f: impl Fn(&Value, &str) -> anyhow::Result<String> + Send + Sync + 'static| Arc::new(f) as SerializeFn)
    )]
    pub serialize: SerializeFn,

    #[builder(
        default = json_unserializer(),
        setter(transform = |f: impl Fn(&str, &str) -> anyhow::Result<Value> + Send + Sync + 'static| Arc::new(f) as UnserializeFn)
    )]
    pub unserialize: UnserializeFn,

    /// Persist the entire tree under one driver key, ignoring remembered keys.
    #[builder(default)]
    pub persist_whole_store: bool,

    #[builder(default)]
    pub rehydrate_failure: RehydrateFailure,

    #[builder(
        default,
        setter(transform = |f: impl Fn(&RememberError) + Send + Sync + 'static| Some(Arc::new(f) as ErrorHook))
    )]
    pub on_error: Option<ErrorHook>,
}

impl Default for Options {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("prefix", &self.prefix)
            .field("persist_throttle_ms", &self.persist_throttle_ms)
            .field("persist_whole_store", &self.persist_whole_store)
            .field("rehydrate_failure", &self.rehydrate_failure)
            .field("on_error", &self.on_error.is_some())
            .finish_non_exhaustive()
    }
}

impl Options {
    /// Driver key for a remembered slice.
    pub fn storage_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Driver key used in whole-store mode.
    pub fn whole_store_key(&self) -> String {
        self.storage_key(WHOLE_STORE_KEY)
    }

    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.persist_throttle_ms)
    }

    /// Log a runtime error and forward it to the `on_error` hook.
    pub(crate) fn report(&self, error: &RememberError) {
        let cause = std::error::Error::source(error)
            .map(ToString::to_string)
            .unwrap_or_default();
        warn!(key = error.key(), error = %error, cause = %cause, "remember runtime error");
        if let Some(hook) = &self.on_error {
            hook(error);
        }
    }
}

/// Plain-data subset of [`Options`], for embedding in an application's own
/// config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PersistSettings {
    pub prefix: String,
    pub persist_throttle_ms: u64,
    pub persist_whole_store: bool,
    pub rehydrate_failure: RehydrateFailure,
}

impl Default for PersistSettings {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            persist_throttle_ms: DEFAULT_PERSIST_THROTTLE_MS,
            persist_whole_store: false,
            rehydrate_failure: RehydrateFailure::default(),
        }
    }
}

impl From<PersistSettings> for Options {
    fn from(settings: PersistSettings) -> Self {
        Options::builder()
            .prefix(settings.prefix)
            .persist_throttle_ms(settings.persist_throttle_ms)
            .persist_whole_store(settings.persist_whole_store)
            .rehydrate_failure(settings.rehydrate_failure)
            .build()
    }
}

fn json_serializer() -> SerializeFn {
    Arc::new(|value, _key| Ok(serde_json::to_string(value)?))
}

fn json_unserializer() -> UnserializeFn {
    Arc::new(|stored, _key| Ok(serde_json::from_str(stored)?))
}

// ---------------------------------------------------------------------------
// InitConfig
// ---------------------------------------------------------------------------

/// Everything the orchestrator needs besides the store and the keys.
#[derive(Clone)]
pub struct InitConfig {
    pub driver: Arc<dyn Driver>,
    pub options: Options,
}

impl fmt::Debug for InitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitConfig")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
