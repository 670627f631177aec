//! Window-id → handle storage, plus the observed-title overlay.
//!
//! Pure storage, no matching logic. Both maps live behind a single mutex —
//! the Rust rendition of the confinement context: handles are passed around
//! freely but cache mutation is never concurrent, and `clear` empties both
//! maps under one lock acquisition so readers never observe a half-cleared
//! cache.

use std::collections::HashMap;

use axbridge_core::WindowId;
use parking_lot::Mutex;

struct Inner<H> {
    handles: HashMap<WindowId, H>,
    titles: HashMap<WindowId, String>,
}

/// Per-window handle cache with a secondary title overlay.
///
/// No operation can fail; absent entries return `None`.
pub struct HandleCache<H> {
    inner: Mutex<Inner<H>>,
}

impl<H: Clone> HandleCache<H> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                handles: HashMap::new(),
                titles: HashMap::new(),
            }),
        }
    }

    pub fn insert(&self, id: WindowId, handle: H) {
        self.inner.lock().handles.insert(id, handle);
    }

    pub fn get(&self, id: WindowId) -> Option<H> {
        self.inner.lock().handles.get(&id).cloned()
    }

    pub fn set_title(&self, id: WindowId, title: impl Into<String>) {
        self.inner.lock().titles.insert(id, title.into());
    }

    pub fn title(&self, id: WindowId) -> Option<String> {
        self.inner.lock().titles.get(&id).cloned()
    }

    /// Drop both the handle and the overlay title for one window
    /// (window-close signal from the window-list side).
    pub fn remove(&self, id: WindowId) {
        let mut inner = self.inner.lock();
        inner.handles.remove(&id);
        inner.titles.remove(&id);
    }

    /// Empty both maps. Run before a full re-discovery pass so stale handles
    /// to since-closed windows are never served.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.handles.clear();
        inner.titles.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().handles.is_empty()
    }

    pub fn title_count(&self) -> usize {
        self.inner.lock().titles.len()
    }

    /// Snapshot of all cached handles, for the background title sweep.
    pub fn handles_snapshot(&self) -> Vec<(WindowId, H)> {
        self.inner
            .lock()
            .handles
            .iter()
            .map(|(id, h)| (*id, h.clone()))
            .collect()
    }
}

impl<H: Clone> Default for HandleCache<H> {
    fn default() -> Self {
        Self::new()
    }
}
