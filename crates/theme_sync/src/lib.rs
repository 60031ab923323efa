//! Theme resolution and synchronization.
//!
//! [`ThemeSynchronizer`] decides whether the surface renders dark or light.
//! Explicit markers on a [`ThemeIndicator`] always win; when neither marker is
//! present the ambient preference from a [`SchemeSource`] applies, and an
//! unknown preference falls back to light. Toggling writes the matching
//! marker back to the indicator synchronously, and redundant resolutions are
//! dropped so observers only hear about real changes.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::debug;

pub mod board;
pub mod probe;

pub use board::MarkerBoard;
pub use probe::SchemeProbe;

/// Marker written to the indicator to force a scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeMarker {
    Dark,
    Light,
}

/// Which markers are currently present on the indicator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerSet {
    pub dark: bool,
    pub light: bool,
}

/// Handle for a registered watcher, used to release the subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(u64);

/// External surface carrying explicit theme markers.
pub trait ThemeIndicator: Send + Sync {
    fn markers(&self) -> MarkerSet;
    fn apply_marker(&self, marker: ThemeMarker);
    fn clear_markers(&self);
    fn watch(&self, callback: Box<dyn Fn() + Send + Sync>) -> WatchId;
    fn unwatch(&self, id: WatchId);
}

/// Ambient system color-scheme preference.
pub trait SchemeSource: Send + Sync {
    fn prefers_dark(&self) -> Option<bool>;
    fn watch(&self, callback: Box<dyn Fn() + Send + Sync>) -> WatchId;
    fn unwatch(&self, id: WatchId);
}

/// Where the current resolution came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeOrigin {
    /// Derived from the indicator markers or the ambient scheme.
    External,
    /// Set by an explicit in-app toggle.
    Override,
}

/// Resolve the effective scheme. A dark marker outranks a light marker,
/// either marker outranks the ambient preference, and an unknown ambient
/// preference resolves to light.
pub fn resolve_is_dark(markers: MarkerSet, ambient: Option<bool>) -> bool {
    if markers.dark {
        true
    } else if markers.light {
        false
    } else {
        ambient.unwrap_or(false)
    }
}

struct SyncState {
    value: Option<bool>,
    origin: ThemeOrigin,
    revision: u64,
    indicator_watch: Option<WatchId>,
    scheme_watch: Option<WatchId>,
}

struct SyncInner {
    indicator: Arc<dyn ThemeIndicator>,
    scheme: Arc<dyn SchemeSource>,
    state: Mutex<SyncState>,
}

impl SyncInner {
    fn lock(&self) -> MutexGuard<'_, SyncState> {
        // Lock scopes stay short and never span an indicator call, so
        // poisoning is unreachable; recover instead of propagating a panic.
        self.state.lock().unwrap_or_else(|err| err.into_inner())
    }

    /// Re-read both sources and record the outcome. Resolutions that match
    /// the current value are dropped without touching origin or revision.
    fn resolve_now(&self, origin: ThemeOrigin) {
        let markers = self.indicator.markers();
        let ambient = self.scheme.prefers_dark();
        let resolved = resolve_is_dark(markers, ambient);

        let mut state = self.lock();
        if state.value == Some(resolved) {
            return;
        }
        state.value = Some(resolved);
        state.origin = origin;
        state.revision += 1;
        debug!(dark = resolved, revision = state.revision, "theme: resolved");
    }
}

/// Tracks the effective scheme for one surface.
///
/// Call [`observe`](Self::observe) once the indicator and scheme source are
/// live; afterwards the synchronizer follows both through watchers until
/// [`teardown`](Self::teardown) or drop.
pub struct ThemeSynchronizer {
    inner: Arc<SyncInner>,
}

impl ThemeSynchronizer {
    pub fn new(indicator: Arc<dyn ThemeIndicator>, scheme: Arc<dyn SchemeSource>) -> Self {
        Self {
            inner: Arc::new(SyncInner {
                indicator,
                scheme,
                state: Mutex::new(SyncState {
                    value: None,
                    origin: ThemeOrigin::External,
                    revision: 0,
                    indicator_watch: None,
                    scheme_watch: None,
                }),
            }),
        }
    }

    /// Start following the indicator and the ambient scheme, then resolve
    /// immediately. Calling again refreshes the resolution without
    /// registering a second set of watchers.
    pub fn observe(&self) {
        let already_watching = self.inner.lock().indicator_watch.is_some();
        if already_watching {
            self.inner.resolve_now(ThemeOrigin::External);
            return;
        }

        let weak = Arc::downgrade(&self.inner);
        let indicator_watch = self.inner.indicator.watch(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.resolve_now(ThemeOrigin::External);
            }
        }));
        let weak = Arc::downgrade(&self.inner);
        let scheme_watch = self.inner.scheme.watch(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.resolve_now(ThemeOrigin::External);
            }
        }));

        {
            let mut state = self.inner.lock();
            state.indicator_watch = Some(indicator_watch);
            state.scheme_watch = Some(scheme_watch);
        }

        self.inner.resolve_now(ThemeOrigin::External);
    }

    /// Flip the scheme and write the matching marker back to the indicator.
    /// Ignored until the first resolution has landed.
    pub fn toggle_theme(&self) {
        let next = {
            let mut state = self.inner.lock();
            let current = match state.value {
                Some(value) => value,
                None => return,
            };
            let next = !current;
            state.value = Some(next);
            state.origin = ThemeOrigin::Override;
            state.revision += 1;
            next
        };

        // The watcher fired by this write resolves to the value recorded
        // above, so the round trip is debounced and the revision bumps once.
        self.inner.indicator.apply_marker(if next {
            ThemeMarker::Dark
        } else {
            ThemeMarker::Light
        });
        debug!(dark = next, "theme: toggled");
    }

    /// Drop any explicit marker so the ambient preference applies again.
    pub fn clear_override(&self) {
        self.inner.indicator.clear_markers();
    }

    /// True once the first resolution has completed.
    pub fn is_ready(&self) -> bool {
        self.inner.lock().value.is_some()
    }

    /// Effective scheme; light until the first resolution lands.
    pub fn is_dark(&self) -> bool {
        self.inner.lock().value.unwrap_or(false)
    }

    pub fn origin(&self) -> ThemeOrigin {
        self.inner.lock().origin
    }

    /// Bumps once per accepted resolution; stable while updates are debounced.
    pub fn revision(&self) -> u64 {
        self.inner.lock().revision
    }

    /// Release both subscriptions. Safe to call more than once; later
    /// indicator or scheme changes no longer reach this synchronizer.
    pub fn teardown(&self) {
        let (indicator_watch, scheme_watch) = {
            let mut state = self.inner.lock();
            (state.indicator_watch.take(), state.scheme_watch.take())
        };
        if let Some(id) = indicator_watch {
            self.inner.indicator.unwatch(id);
        }
        if let Some(id) = scheme_watch {
            self.inner.scheme.unwatch(id);
        }
    }
}

impl Drop for ThemeSynchronizer {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
