//! Driver implementations.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::traits::Driver;

// ---------------------------------------------------------------------------
// MemoryDriver (tests, ephemeral stores)
// ---------------------------------------------------------------------------

/// In-process key-value driver. Records every successful write in order and
/// can be switched into failing mode for error-path tests. Thread-safe.
#[derive(Default)]
pub struct MemoryDriver {
    items: Mutex<HashMap<String, String>>,
    writes: Mutex<Vec<(String, String)>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a stored value.
    pub fn with_item(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        lock(&self.items).insert(key.into(), value.into());
        self
    }

    /// Current stored value, bypassing the async interface.
    pub fn item(&self, key: &str) -> Option<String> {
        lock(&self.items).get(key).cloned()
    }

    /// Every successful `set_item` call, oldest first (for test assertions).
    pub fn writes(&self) -> Vec<(String, String)> {
        lock(&self.writes).clone()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Driver for MemoryDriver {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            bail!("memory driver: reads disabled");
        }
        Ok(self.item(key))
    }

    async fn set_item(&self, key: &str, value: String) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("memory driver: writes disabled");
        }
        lock(&self.items).insert(key.to_string(), value.clone());
        lock(&self.writes).push((key.to_string(), value));
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ---------------------------------------------------------------------------
// FileDriver (local filesystem)
// ---------------------------------------------------------------------------

/// Stores each key as a file inside `root`. The directory is created on the
/// first write.
#[derive(Debug, Clone)]
pub struct FileDriver {
    root: PathBuf,
}

impl FileDriver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a storage key to a path. Keys must be a single plain path
    /// component.
    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let mut components = Path::new(key).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) if name == key => Ok(self.root.join(name)),
            _ => Err(anyhow!("invalid storage key for file driver: {key:?}")),
        }
    }
}

#[async_trait]
impl Driver for FileDriver {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(anyhow!(e).context(format!("reading {}", path.display()))),
        }
    }

    async fn set_item(&self, key: &str, value: String) -> Result<()> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.root).await?;

        // Readers only ever observe a complete value.
        let tmp = self.root.join(format!(".{key}.tmp"));
        tokio::fs::write(&tmp, value).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}
