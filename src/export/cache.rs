//! Load-once cache for serve-time artifacts

use crate::error::{Result, SmartPriceError};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{info, warn};

/// Observable state of an [`ArtifactCache`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// Nothing attempted yet (or torn down)
    Empty,
    Ready,
    /// The last load failed; stays so until `reload` or `clear`
    Unavailable,
}

enum Slot<T> {
    Empty,
    Ready(Arc<T>),
    Unavailable(String),
}

/// Holds one lazily loaded value shared between callers.
///
/// The first `get_or_load` runs the loader under the write lock; later calls
/// only take the read lock. A failed load is remembered and returned to every
/// caller without retrying.
pub struct ArtifactCache<T> {
    label: String,
    slot: RwLock<Slot<T>>,
}

impl<T> ArtifactCache<T> {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            slot: RwLock::new(Slot::Empty),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Return the cached value, loading it on first use
    pub fn get_or_load<F>(&self, load: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Result<T>,
    {
        {
            let slot = self.slot.read();
            match &*slot {
                Slot::Ready(value) => return Ok(Arc::clone(value)),
                Slot::Unavailable(reason) => {
                    return Err(SmartPriceError::artifact_unavailable(&self.label, reason))
                }
                Slot::Empty => {}
            }
        }

        let mut slot = self.slot.write();
        // Another caller may have loaded while we waited for the lock
        match &*slot {
            Slot::Ready(value) => return Ok(Arc::clone(value)),
            Slot::Unavailable(reason) => {
                return Err(SmartPriceError::artifact_unavailable(&self.label, reason))
            }
            Slot::Empty => {}
        }

        match load() {
            Ok(value) => {
                let value = Arc::new(value);
                *slot = Slot::Ready(Arc::clone(&value));
                info!(artifact = %self.label, "Artifacts loaded");
                Ok(value)
            }
            Err(e) => {
                let reason = e.to_string();
                warn!(artifact = %self.label, error = %reason, "Artifact load failed; marked unavailable");
                *slot = Slot::Unavailable(reason.clone());
                Err(SmartPriceError::artifact_unavailable(&self.label, reason))
            }
        }
    }

    /// Install a value directly, replacing whatever was cached
    pub fn replace(&self, value: T) -> Arc<T> {
        let value = Arc::new(value);
        *self.slot.write() = Slot::Ready(Arc::clone(&value));
        value
    }

    /// Drop the cached value or failure; the next access loads again
    pub fn clear(&self) {
        *self.slot.write() = Slot::Empty;
    }

    pub fn state(&self) -> CacheState {
        match &*self.slot.read() {
            Slot::Empty => CacheState::Empty,
            Slot::Ready(_) => CacheState::Ready,
            Slot::Unavailable(_) => CacheState::Unavailable,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state() == CacheState::Ready
    }
}

impl<T> std::fmt::Debug for ArtifactCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactCache")
            .field("label", &self.label)
            .field("state", &self.state())
            .finish()
    }
}
