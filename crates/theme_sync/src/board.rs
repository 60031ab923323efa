//! In-process marker surface backing the desktop shell.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::{MarkerSet, ThemeIndicator, ThemeMarker, WatchId};

/// Shared marker surface. Watchers run on the mutating thread after the
/// board lock is released, so a watcher may re-read the board freely.
pub struct MarkerBoard {
    inner: Mutex<BoardState>,
}

struct BoardState {
    markers: MarkerSet,
    watchers: HashMap<u64, Arc<dyn Fn() + Send + Sync>>,
    next_watch_id: u64,
}

impl MarkerBoard {
    pub fn new() -> Self {
        Self::with_markers(MarkerSet::default())
    }

    /// Seed the board, typically from persisted settings or a CLI override.
    pub fn with_markers(markers: MarkerSet) -> Self {
        Self {
            inner: Mutex::new(BoardState {
                markers,
                watchers: HashMap::new(),
                next_watch_id: 0,
            }),
        }
    }

    pub fn watcher_count(&self) -> usize {
        self.lock().watchers.len()
    }

    fn lock(&self) -> MutexGuard<'_, BoardState> {
        self.inner.lock().unwrap_or_else(|err| err.into_inner())
    }

    /// Replace the marker set; watchers only fire when it actually changes.
    fn set_markers(&self, markers: MarkerSet) {
        let watchers: Vec<Arc<dyn Fn() + Send + Sync>> = {
            let mut state = self.lock();
            if state.markers == markers {
                return;
            }
            state.markers = markers;
            state.watchers.values().map(Arc::clone).collect()
        };
        for watcher in watchers {
            watcher();
        }
    }
}

impl Default for MarkerBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl ThemeIndicator for MarkerBoard {
    fn markers(&self) -> MarkerSet {
        self.lock().markers
    }

    fn apply_marker(&self, marker: ThemeMarker) {
        let markers = match marker {
            ThemeMarker::Dark => MarkerSet {
                dark: true,
                light: false,
            },
            ThemeMarker::Light => MarkerSet {
                dark: false,
                light: true,
            },
        };
        self.set_markers(markers);
    }

    fn clear_markers(&self) {
        self.set_markers(MarkerSet::default());
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
