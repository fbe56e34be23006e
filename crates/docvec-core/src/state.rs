//! The active-collection pointer and its persistence backends.
//!
//! `CollectionState` answers reads from memory so searches never pay for
//! I/O; writes update memory first and then flush through a `StateStore`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::traits::StateStore;

pub const DEFAULT_STATE_FILE: &str = ".docvec-state.json";

pub struct CollectionState {
    current: RwLock<String>,
    store: Arc<dyn StateStore>,
    // Held across a whole index or refresh by every writer sharing this state.
    writer: tokio::sync::Mutex<()>,
}

impl CollectionState {
    /// Resume from the persisted value, or seed the store with `fallback`.
    pub async fn load(store: Arc<dyn StateStore>, fallback: Option<&str>) -> Result<Self> {
        let persisted = store.read().await?.filter(|s| !s.trim().is_empty());
        let current = match (persisted, fallback.filter(|s| !s.trim().is_empty())) {
            (Some(name), _) => {
                debug!(collection = %name, "resuming persisted collection");
                name
            }
            (None, Some(name)) => {
                info!(collection = %name, "no persisted collection, using configured start");
                store.write(name).await?;
                name.to_string()
            }
            (None, None) => {
                return Err(Error::InvalidConfig(
                    "no starting collection configured (set `current_collection`)".into(),
                ))
            }
        };
        Ok(Self { current: RwLock::new(current), store, writer: tokio::sync::Mutex::new(()) })
    }

    pub fn current_collection(&self) -> String {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Exclusive access for a collection transition. Two pipelines over the
    /// same state wait on each other here, so they never build the same
    /// alternate collection at once.
    pub async fn writer_lock(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.writer.lock().await
    }

    /// Switch the active collection. Readers in this process observe the new
    /// name before the store is flushed.
    pub async fn update_current_collection(&self, name: &str) -> Result<()> {
        {
            let mut guard = match self.current.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            *guard = name.to_string();
        }
        self.store.write(name).await?;
        info!(collection = %name, "active collection updated");
        Ok(())
    }
}

impl std::fmt::Debug for CollectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionState")
            .field("current", &self.current_collection())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StateRecord {
    current_collection: String,
}

/// Keeps the pointer in a small JSON file, replaced atomically on write.
#[derive(Debug, Clone)]
pub struct JsonFileStateStore {
    path: PathBuf,
}

impl JsonFileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl StateStore for JsonFileStateStore {
    async fn read(&self) -> Result<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => {
                let record: StateRecord = serde_json::from_str(&raw)?;
                Ok(Some(record.current_collection))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, value: &str) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let record = StateRecord { current_collection: value.to_string() };
        let body = serde_json::to_string_pretty(&record)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

/// Non-durable store for tests and throwaway runs.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    value: Mutex<Option<String>>,
}

impl MemoryStateStore {
    pub fn new(initial: Option<&str>) -> Self {
        Self { value: Mutex::new(initial.map(str::to_string)) }
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn read(&self) -> Result<Option<String>> {
        let guard = self.value.lock().map_err(|_| Error::Backend("state lock poisoned".into()))?;
        Ok(guard.clone())
    }

    async fn write(&self, value: &str) -> Result<()> {
        let mut guard = self.value.lock().map_err(|_| Error::Backend("state lock poisoned".into()))?;
        *guard = Some(value.to_string());
        Ok(())
    }
}
