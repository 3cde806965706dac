// Application state store
//
// Holds UI-level editing state that is not part of the rendering surface,
// such as page layout settings. Slices are addressed by a dotted path and hold
// JSON values so tools can store arbitrary settings.

use futures_util::FutureExt;
use futures_util::future::{self, BoxFuture};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Result type for store dispatches
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors reported by the state store
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("State path '{0}' is read-only")]
    ReadOnly(String),

    #[error("Invalid state path: '{0}'")]
    InvalidPath(String),
}

/// Destination for state mutations recorded in history
pub trait StateStore: Send + Sync {
    /// Set (`Some`) or delete (`None`) the slice at `path`
    ///
    /// Resolves once subscribers observe the new value.
    fn dispatch(&self, path: &str, value: Option<Value>) -> BoxFuture<'_, StoreResult<()>>;

    /// Current value of a slice
    fn select(&self, path: &str) -> Option<Value>;
}

/// In-memory state store
#[derive(Default)]
pub struct MemoryStore {
    slices: Mutex<BTreeMap<String, Value>>,
    read_only: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a path as read-only; dispatches to it are rejected
    pub fn freeze(&self, path: impl Into<String>) {
        self.read_only
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.into());
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Value>> {
        self.slices.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn dispatch_now(&self, path: &str, value: Option<Value>) -> StoreResult<()> {
        if path.is_empty() || path.split('.').any(str::is_empty) {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
        let frozen = self
            .read_only
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|p| p == path);
        if frozen {
            return Err(StoreError::ReadOnly(path.to_string()));
        }

        let mut slices = self.lock();
        match value {
            Some(value) => {
                slices.insert(path.to_string(), value);
            }
            None => {
                slices.remove(path);
            }
        }
        Ok(())
    }
}

impl StateStore for MemoryStore {
    fn dispatch(&self, path: &str, value: Option<Value>) -> BoxFuture<'_, StoreResult<()>> {
        future::ready(self.dispatch_now(path, value)).boxed()
    }

    fn select(&self, path: &str) -> Option<Value> {
        self.lock().get(path).cloned()
    }
}
