use thiserror::Error;

/// Boxed source error. `anyhow::Error` converts into it with `.into()`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias for construction-time validation.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Programmer errors caught while building the enhancer. Always synchronous.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("remember error: driver required")]
    DriverRequired,

    #[error("remember error: rememberedKeys needs to be an array")]
    KeysNotArray,

    #[error("remember error: duplicate remembered key: {0}")]
    DuplicateKey(String),

    #[error("remember error: enhancer must be created inside a tokio runtime")]
    NoRuntime,
}

/// Runtime failures from driver I/O or serialization. Scoped to a single
/// storage key; never aborts the other keys of the same pass.
#[derive(Debug, Error)]
pub enum RememberError {
    #[error("failed to read {key} from driver")]
    Read {
        key: String,
        #[source]
        source: BoxError,
    },

    #[error("failed to write {key} to driver")]
    Write {
        key: String,
        #[source]
        source: BoxError,
    },

    #[error("failed to serialize {key}")]
    Serialize {
        key: String,
        #[source]
        source: BoxError,
    },

    #[error("failed to unserialize {key}")]
    Unserialize {
        key: String,
        #[source]
        source: BoxError,
    },
}

impl RememberError {
    /// The storage key the failure belongs to.
    pub fn key(&self) -> &str {
        match self {
            RememberError::Read { key, .. }
            | RememberError::Write { key, .. }
            | RememberError::Serialize { key, .. }
            | RememberError::Unserialize { key, .. } => key,
        }
    }
}
