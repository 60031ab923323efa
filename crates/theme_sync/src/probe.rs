//! Ambient color-scheme source fed by the host shell.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::{SchemeSource, WatchId};

/// Latest reported system preference. [`feed`](Self::feed) is debounced:
/// watchers only run when the stored value actually changes.
pub struct SchemeProbe {
    inner: Mutex<ProbeState>,
}

struct ProbeState {
    prefers_dark: Option<bool>,
    watchers: HashMap<u64, Arc<dyn Fn() + Send + Sync>>,
    next_watch_id: u64,
}

impl SchemeProbe {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(ProbeState {
                prefers_dark: None,
                watchers: HashMap::new(),
                next_watch_id: 0,
            }),
        }
    }

    /// Record the host's current preference, `None` when it is unknown.
    pub fn feed(&self, prefers_dark: Option<bool>) {
        let watchers: Vec<Arc<dyn Fn() + Send + Sync>> = {
            let mut state = self.lock();
            if state.prefers_dark == prefers_dark {
                return;
            }
            state.prefers_dark = prefers_dark;
            state.watchers.values().map(Arc::clone).collect()
        };
        for watcher in watchers {
            watcher();
        }
    }

    pub fn watcher_count(&self) -> usize {
        self.lock().watchers.len()
    }

    fn lock(&self) -> MutexGuard<'_, ProbeState> {
        self.inner.lock().unwrap_or_else(|err| err.into_inner())
    }
}

impl Default for SchemeProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemeSource for SchemeProbe {
    fn prefers_dark(&self) -> Option<bool> {
        self.lock().prefers_dark
    }

    fn watch(&self, callback: Box<dyn Fn() + Send + Sync>) -> WatchId {
        let mut state = self.lock();
        let id = state.next_watch_id;
        state.next_watch_id += 1;
        state.watchers.insert(id, Arc::from(callback));
        WatchId(id)
    }

    fn unwatch(&self, id: WatchId) {
        self.lock().watchers.remove(&id.0);
    }
}
