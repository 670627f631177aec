//! Test doubles for the platform traits.
//!
//! `StubPlatform` is a fully in-memory accessibility surface: windows
//! registered per pid for the attribute walk, a sparse token space for the
//! brute-force probe, and a hit-test map for direct recovery. Probe counters
//! let tests assert that a gated entry point really touched nothing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use axbridge_core::api::{AccessibilityPlatform, ROLE_WINDOW, SUBROLE_STANDARD_WINDOW};
use axbridge_core::{Bounds, Pid, RemoteToken, WindowId};
use parking_lot::Mutex;

pub struct StubElement {
    /// Unique per element, so tests can tell handles apart.
    pub tag: u64,
    pub role: Option<String>,
    pub subrole: Option<String>,
    pub title: Option<String>,
    pub window_id: Option<WindowId>,
    pub frame: Option<Bounds>,
    pub pid: Pid,
    pub parent: Option<StubHandle>,
}

#[derive(Clone)]
pub struct StubHandle(pub Arc<StubElement>);

impl StubHandle {
    pub fn tag(&self) -> u64 {
        self.0.tag
    }

    /// A standard window element with no attributes beyond role/subrole.
    pub fn window(tag: u64, pid: Pid) -> Self {
        Self(Arc::new(StubElement {
            tag,
            role: Some(ROLE_WINDOW.to_string()),
            subrole: Some(SUBROLE_STANDARD_WINDOW.to_string()),
            title: None,
            window_id: None,
            frame: None,
            pid,
            parent: None,
        }))
    }

    pub fn with_title(self, title: &str) -> Self {
        Self(Arc::new(StubElement {
            title: Some(title.to_string()),
            ..Self::unwrap_element(self)
        }))
    }

    pub fn with_window_id(self, id: WindowId) -> Self {
        Self(Arc::new(StubElement {
            window_id: Some(id),
            ..Self::unwrap_element(self)
        }))
    }

    pub fn with_frame(self, frame: Bounds) -> Self {
        Self(Arc::new(StubElement {
            frame: Some(frame),
            ..Self::unwrap_element(self)
        }))
    }

    pub fn with_role(self, role: Option<&str>, subrole: Option<&str>) -> Self {
        Self(Arc::new(StubElement {
            role: role.map(String::from),
            subrole: subrole.map(String::from),
            ..Self::unwrap_element(self)
        }))
    }

    pub fn with_parent(self, parent: StubHandle) -> Self {
        Self(Arc::new(StubElement {
            parent: Some(parent),
            ..Self::unwrap_element(self)
        }))
    }

    fn unwrap_element(handle: Self) -> StubElement {
        Arc::try_unwrap(handle.0).unwrap_or_else(|arc| StubElement {
            tag: arc.tag,
            role: arc.role.clone(),
            subrole: arc.subrole.clone(),
            title: arc.title.clone(),
            window_id: arc.window_id,
            frame: arc.frame,
            pid: arc.pid,
            parent: arc.parent.clone(),
        })
    }
}

#[derive(Default)]
pub struct StubPlatform {
    pub permission: AtomicBool,
    /// Per-pid result of the windows attribute; absent pid = read failure.
    pub app_windows: Mutex<HashMap<Pid, Vec<StubHandle>>>,
    /// Sparse token space keyed by (pid, element id).
    pub token_space: Mutex<HashMap<(Pid, u64), StubHandle>>,
    /// Hit-test targets keyed by screen point.
    pub hit_targets: Mutex<Vec<((f64, f64), StubHandle)>>,
    /// Every remote-token probe, hit or miss.
    pub token_probes: AtomicUsize,
}

impl StubPlatform {
    pub fn granted() -> Self {
        let stub = Self::default();
        stub.permission.store(true, Ordering::SeqCst);
        stub
    }

    pub fn denied() -> Self {
        Self::default()
    }

    pub fn add_app_windows(&self, pid: Pid, handles: Vec<StubHandle>) {
        self.app_windows.lock().insert(pid, handles);
    }

    pub fn add_token_element(&self, pid: Pid, element_id: u64, handle: StubHandle) {
        self.token_space.lock().insert((pid, element_id), handle);
    }

    pub fn add_hit_target(&self, x: f64, y: f64, handle: StubHandle) {
        self.hit_targets.lock().push(((x, y), handle));
    }

    pub fn probes(&self) -> usize {
        self.token_probes.load(Ordering::SeqCst)
    }
}

impl AccessibilityPlatform for StubPlatform {
    type Handle = StubHandle;

    fn permission_granted(&self) -> bool {
        self.permission.load(Ordering::SeqCst)
    }

    fn application_windows(&self, pid: Pid) -> Option<Vec<StubHandle>> {
        self.app_windows.lock().get(&pid).cloned()
    }

    fn handle_from_token(&self, token: &RemoteToken) -> Option<StubHandle> {
        self.token_probes.fetch_add(1, Ordering::SeqCst);
        self.token_space
            .lock()
            .get(&(token.pid, token.element_id))
            .cloned()
    }

    fn role(&self, handle: &StubHandle) -> Option<String> {
        handle.0.role.clone()
    }

    fn subrole(&self, handle: &StubHandle) -> Option<String> {
        handle.0.subrole.clone()
    }

    fn title(&self, handle: &StubHandle) -> Option<String> {
        handle.0.title.clone()
    }

    fn window_id(&self, handle: &StubHandle) -> Option<WindowId> {
        handle.0.window_id
    }

    fn frame(&self, handle: &StubHandle) -> Option<Bounds> {
        handle.0.frame
    }

    fn parent(&self, handle: &StubHandle) -> Option<StubHandle> {
        handle.0.parent.clone()
    }

    fn same_element(&self, a: &StubHandle, b: &StubHandle) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    fn element_pid(&self, handle: &StubHandle) -> Option<Pid> {
        Some(handle.0.pid)
    }

    fn element_at(&self, x: f64, y: f64) -> Option<StubHandle> {
        self.hit_targets
            .lock()
            .iter()
            .find(|((tx, ty), _)| (tx - x).abs() < 0.5 && (ty - y).abs() < 0.5)
            .map(|(_, h)| h.clone())
    }
}
