//! End-to-end scheduler behavior against an in-memory platform double:
//! single-flight startup warmup, permission gating, on-demand resolution,
//! and duplicate-work avoidance in the combined sweep.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axbridge::WarmupScheduler;
use axbridge_core::api::{
    AccessibilityPlatform, ProcessDirectory, WindowOwnerResolver, ROLE_WINDOW,
    SUBROLE_STANDARD_WINDOW,
};
use axbridge_core::{Bounds, Pid, RemoteToken, WarmupConfig, WindowId};
use parking_lot::Mutex;

const LONG: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct FakeWindow(Arc<FakeWindowInner>);

struct FakeWindowInner {
    window_id: Option<WindowId>,
    title: Option<String>,
    pid: Pid,
}

impl FakeWindow {
    fn new(pid: Pid, window_id: WindowId, title: &str) -> Self {
        Self(Arc::new(FakeWindowInner {
            window_id: Some(window_id),
            title: Some(title.to_string()),
            pid,
        }))
    }
}

#[derive(Default)]
struct FakePlatform {
    permission: AtomicBool,
    token_space: Mutex<HashMap<(Pid, u64), FakeWindow>>,
    token_probes: AtomicUsize,
    probes_by_pid: Mutex<HashMap<Pid, usize>>,
}

impl FakePlatform {
    fn granted() -> Self {
        let p = Self::default();
        p.permission.store(true, Ordering::SeqCst);
        p
    }

    fn add_window(&self, pid: Pid, element_id: u64, window_id: WindowId, title: &str) {
        self.token_space
            .lock()
            .insert((pid, element_id), FakeWindow::new(pid, window_id, title));
    }

    fn probes(&self) -> usize {
        self.token_probes.load(Ordering::SeqCst)
    }

    fn probes_for(&self, pid: Pid) -> usize {
        self.probes_by_pid.lock().get(&pid).copied().unwrap_or(0)
    }
}

impl AccessibilityPlatform for FakePlatform {
    type Handle = FakeWindow;

    fn permission_granted(&self) -> bool {
        self.permission.load(Ordering::SeqCst)
    }

    fn application_windows(&self, _pid: Pid) -> Option<Vec<FakeWindow>> {
        // Every test process lives "off the active desktop".
        None
    }

    fn handle_from_token(&self, token: &RemoteToken) -> Option<FakeWindow> {
        self.token_probes.fetch_add(1, Ordering::SeqCst);
        *self.probes_by_pid.lock().entry(token.pid).or_insert(0) += 1;
        self.token_space
            .lock()
            .get(&(token.pid, token.element_id))
            .cloned()
    }

    fn role(&self, _handle: &FakeWindow) -> Option<String> {
        Some(ROLE_WINDOW.to_string())
    }

    fn subrole(&self, _handle: &FakeWindow) -> Option<String> {
        Some(SUBROLE_STANDARD_WINDOW.to_string())
    }

    fn title(&self, handle: &FakeWindow) -> Option<String> {
        handle.0.title.clone()
    }

    fn window_id(&self, handle: &FakeWindow) -> Option<WindowId> {
        handle.0.window_id
    }

    fn frame(&self, _handle: &FakeWindow) -> Option<Bounds> {
        None
    }

    fn parent(&self, _handle: &FakeWindow) -> Option<FakeWindow> {
        None
    }

    fn same_element(&self, a: &FakeWindow, b: &FakeWindow) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    fn element_pid(&self, handle: &FakeWindow) -> Option<Pid> {
        Some(handle.0.pid)
    }

    fn element_at(&self, _x: f64, _y: f64) -> Option<FakeWindow> {
        None
    }
}

#[derive(Default)]
struct FakeProcesses {
    pids: Vec<Pid>,
    calls: AtomicUsize,
}

impl FakeProcesses {
    fn new(pids: Vec<Pid>) -> Self {
        Self {
            pids,
            calls: AtomicUsize::new(0),
        }
    }
}

impl ProcessDirectory for FakeProcesses {
    fn running_pids(&self) -> Vec<Pid> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.pids.clone()
    }
}

#[derive(Default)]
struct FakeOwners {
    owners: HashMap<WindowId, Pid>,
}

impl WindowOwnerResolver for FakeOwners {
    fn owner_pid(&self, id: WindowId) -> Option<Pid> {
        self.owners.get(&id).copied()
    }
}

fn small_config(range: std::ops::Range<Pid>) -> WarmupConfig {
    WarmupConfig {
        max_element_id: 4,
        probe_budget: LONG,
        max_concurrent: 2,
        startup_pid_range: range,
    }
}

// ---------------------------------------------------------------------------
// Single-flight
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread")]
async fn startup_warmup_is_single_flight() {
    let platform = Arc::new(FakePlatform::granted());
    platform.add_window(1, 0, 100, "One");
    let processes = Arc::new(FakeProcesses::new(vec![1]));
    let scheduler = WarmupScheduler::new(
        platform,
        processes.clone(),
        Arc::new(FakeOwners::default()),
        small_config(1..3),
    );

    let (a, b) = tokio::join!(
        scheduler.run_startup_warmup_once(),
        scheduler.run_startup_warmup_once()
    );

    // Exactly one composite sweep ran; both callers observed its result.
    assert_eq!(processes.calls.load(Ordering::SeqCst), 1);
    assert_eq!(a, b);
    assert_eq!(a.handles_cached, 1);
    assert_eq!(scheduler.cache().get(100).unwrap().0.pid, 1);

    // A later caller gets the memoized result without a new sweep.
    let c = scheduler.run_startup_warmup_once().await;
    assert_eq!(processes.calls.load(Ordering::SeqCst), 1);
    assert_eq!(a, c);
}

#[tokio::test]
async fn denied_startup_is_not_memoized() {
    let platform = Arc::new(FakePlatform::default());
    platform.add_window(1, 0, 100, "One");
    let processes = Arc::new(FakeProcesses::new(vec![1]));
    let scheduler = WarmupScheduler::new(
        platform.clone(),
        processes.clone(),
        Arc::new(FakeOwners::default()),
        small_config(1..2),
    );

    // Denied: immediate no-op, nothing swept.
    let denied = scheduler.run_startup_warmup_once().await;
    assert_eq!(denied.handles_cached, 0);
    assert_eq!(processes.calls.load(Ordering::SeqCst), 0);

    // Once granted, the sweep still happens.
    platform.permission.store(true, Ordering::SeqCst);
    let granted = scheduler.run_startup_warmup_once().await;
    assert_eq!(granted.handles_cached, 1);
    assert_eq!(processes.calls.load(Ordering::SeqCst), 1);
}

// ---------------------------------------------------------------------------
// Permission gate
// ---------------------------------------------------------------------------

#[tokio::test]
async fn denied_permission_touches_nothing() {
    let platform = Arc::new(FakePlatform::default());
    platform.add_window(1, 0, 100, "One");
    let scheduler = WarmupScheduler::new(
        platform.clone(),
        Arc::new(FakeProcesses::new(vec![1])),
        Arc::new(FakeOwners::default()),
        small_config(1..2),
    );

    let stats = scheduler.warm_all_running_processes(LONG, 2).await;

    assert_eq!(stats, Default::default());
    assert_eq!(platform.probes(), 0, "no probe may run while denied");
    assert!(scheduler.cache().is_empty());

    let range_stats = scheduler.warm_pid_range(1..100, LONG, 2).await;
    assert_eq!(range_stats, Default::default());
    assert_eq!(platform.probes(), 0);
}

// ---------------------------------------------------------------------------
// Combined sweep
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread")]
async fn combined_sweep_skips_running_pids() {
    let platform = Arc::new(FakePlatform::granted());
    platform.add_window(4, 0, 40, "Four");
    platform.add_window(5, 0, 50, "Five");
    platform.add_window(6, 0, 60, "Six");
    let scheduler = WarmupScheduler::new(
        platform.clone(),
        Arc::new(FakeProcesses::new(vec![5])),
        Arc::new(FakeOwners::default()),
        small_config(4..7),
    );

    let stats = scheduler.warm_running_and_range(4..7, LONG, 2).await;

    assert_eq!(stats.handles_cached, 3);
    // Each pid scanned exactly once: running pid 5 must not be re-swept by
    // the range pass.
    assert_eq!(platform.probes_for(4), 4);
    assert_eq!(platform.probes_for(5), 4);
    assert_eq!(platform.probes_for(6), 4);
    for id in [40, 50, 60] {
        assert!(scheduler.cache().get(id).is_some());
    }
}

#[tokio::test]
async fn title_sweep_populates_overlay() {
    let platform = Arc::new(FakePlatform::granted());
    platform.add_window(1, 0, 100, "Inbox");
    let scheduler = WarmupScheduler::new(
        platform,
        Arc::new(FakeProcesses::new(vec![1])),
        Arc::new(FakeOwners::default()),
        small_config(1..2),
    );

    scheduler.run_startup_warmup_once().await;

    assert_eq!(scheduler.cache().title(100), Some("Inbox".to_string()));
}

// ---------------------------------------------------------------------------
// On-demand resolution
// ---------------------------------------------------------------------------

#[tokio::test]
async fn resolve_on_demand_populates_and_hits_cache() {
    let platform = Arc::new(FakePlatform::granted());
    platform.add_window(7, 2, 99, "Target");
    let mut owners = FakeOwners::default();
    owners.owners.insert(99, 7);
    let scheduler = WarmupScheduler::new(
        platform.clone(),
        Arc::new(FakeProcesses::new(vec![])),
        Arc::new(owners),
        small_config(1..2),
    );

    // Miss without ensure_populated: nothing resolved, nothing probed.
    assert!(scheduler.resolve_on_demand(99, false).await.is_none());
    assert_eq!(platform.probes(), 0);

    // With ensure_populated the engine runs one bounded pass.
    let handle = scheduler.resolve_on_demand(99, true).await;
    assert_eq!(handle.unwrap().0.window_id, Some(99));
    assert!(platform.probes() > 0);

    // Second lookup is a pure cache hit.
    let before = platform.probes();
    assert!(scheduler.resolve_on_demand(99, true).await.is_some());
    assert_eq!(platform.probes(), before);
}

#[tokio::test]
async fn resolve_on_demand_unknown_owner_is_none() {
    let platform = Arc::new(FakePlatform::granted());
    let scheduler = WarmupScheduler::new(
        platform,
        Arc::new(FakeProcesses::new(vec![])),
        Arc::new(FakeOwners::default()),
        small_config(1..2),
    );

    assert!(scheduler.resolve_on_demand(12345, true).await.is_none());
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn invalidate_and_clear() {
    let platform = Arc::new(FakePlatform::granted());
    platform.add_window(1, 0, 100, "A");
    platform.add_window(1, 1, 101, "B");
    let scheduler = WarmupScheduler::new(
        platform,
        Arc::new(FakeProcesses::new(vec![1])),
        Arc::new(FakeOwners::default()),
        small_config(1..2),
    );

    scheduler.warm_all_running_processes(LONG, 2).await;
    assert_eq!(scheduler.cache().len(), 2);

    scheduler.invalidate(100);
    assert!(scheduler.cache().get(100).is_none());
    assert!(scheduler.cache().get(101).is_some());

    scheduler.clear();
    assert!(scheduler.cache().is_empty());
    assert_eq!(scheduler.cache().title_count(), 0);
}
