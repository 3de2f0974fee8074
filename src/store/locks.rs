//! Keyed lock registries.
//!
//! Transitions on one cycle serialize on the cycle's lock; runs on one
//! (cycle, group) pair serialize on that pair's lock. Different keys never
//! contend. An entry lives only while some caller holds or waits on it.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use crate::error::{EngineError, EngineResult};

/// A registry handing out one mutex per key.
#[derive(Debug)]
pub struct LockRegistry<K> {
    name: &'static str,
    locks: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K: Eq + Hash + Clone> LockRegistry<K> {
    /// Creates an empty registry; `name` appears in poisoning errors.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn handle(&self, key: &K) -> EngineResult<Arc<Mutex<()>>> {
        let mut locks = self.locks.lock().map_err(|_| self.poisoned())?;
        Ok(locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone())
    }

    fn release(&self, key: &K, handle: Arc<Mutex<()>>) {
        let Ok(mut locks) = self.locks.lock() else {
            return;
        };
        // Handles are only cloned under the registry lock, so two references
        // (ours and the map's) mean nobody else is waiting.
        if Arc::strong_count(&handle) == 2 {
            locks.remove(key);
        }
    }

    /// Runs `f` while holding the lock for `key`.
    pub fn with<R>(&self, key: &K, f: impl FnOnce() -> EngineResult<R>) -> EngineResult<R> {
        let handle = self.handle(key)?;
        let result = {
            let _guard = handle.lock().map_err(|_| self.poisoned())?;
            f()
        };
        self.release(key, handle);
        result
    }

    /// Number of keys currently held or waited on.
    pub fn len(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or(0)
    }

    /// Returns true if no key is held or waited on.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn poisoned(&self) -> EngineError {
        EngineError::FatalTransaction {
            message: format!("{} lock poisoned", self.name),
        }
    }
}
