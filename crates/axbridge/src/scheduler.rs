//! Background warmup orchestration.
//!
//! Sweeps fan out one gated blocking task per process (the AX probes are
//! synchronous IPC), merge results into the shared cache, and report counts.
//! The startup sweep is single-flight: concurrent callers share one
//! composite run and its memoized result. Every entry point no-ops without
//! the elevated introspection permission.

use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

use axbridge_core::api::{AccessibilityPlatform, ProcessDirectory, WindowOwnerResolver};
use axbridge_core::{Pid, WarmupConfig, WindowId};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::cache::HandleCache;
use crate::engine::ResolutionEngine;
use crate::gate::ConcurrencyGate;

/// Counters for one warmup sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WarmupStats {
    pub processes_scanned: usize,
    pub handles_cached: usize,
    pub titles_cached: usize,
}

impl WarmupStats {
    fn merge(&mut self, other: WarmupStats) {
        self.processes_scanned += other.processes_scanned;
        self.handles_cached += other.handles_cached;
        self.titles_cached += other.titles_cached;
    }
}

pub struct WarmupScheduler<A, P, R>
where
    A: AccessibilityPlatform,
    P: ProcessDirectory,
    R: WindowOwnerResolver,
{
    platform: Arc<A>,
    processes: Arc<P>,
    owners: Arc<R>,
    engine: Arc<ResolutionEngine<A>>,
    cache: Arc<HandleCache<A::Handle>>,
    config: WarmupConfig,
    startup: OnceCell<WarmupStats>,
}

impl<A, P, R> WarmupScheduler<A, P, R>
where
    A: AccessibilityPlatform,
    P: ProcessDirectory,
    R: WindowOwnerResolver,
{
    pub fn new(platform: Arc<A>, processes: Arc<P>, owners: Arc<R>, config: WarmupConfig) -> Self {
        let cache = Arc::new(HandleCache::new());
        let engine = Arc::new(ResolutionEngine::new(
            platform.clone(),
            cache.clone(),
            config.clone(),
        ));
        Self {
            platform,
            processes,
            owners,
            engine,
            cache,
            config,
            startup: OnceCell::new(),
        }
    }

    pub fn cache(&self) -> &Arc<HandleCache<A::Handle>> {
        &self.cache
    }

    /// On-demand single-window lookups can skip the scheduler entirely and
    /// talk to the engine for one process.
    pub fn engine(&self) -> &Arc<ResolutionEngine<A>> {
        &self.engine
    }

    /// Window-close signal from the window-list side.
    pub fn invalidate(&self, id: WindowId) {
        self.cache.remove(id);
    }

    /// Drop everything, typically right before a full re-discovery pass.
    pub fn clear(&self) {
        self.cache.clear();
    }

    /// Token-first warmup of every currently running process.
    pub async fn warm_all_running_processes(
        &self,
        budget: Duration,
        max_concurrent: usize,
    ) -> WarmupStats {
        if !self.platform.permission_granted() {
            return WarmupStats::default();
        }
        let pids = self.processes.running_pids();
        self.warm_pids(pids, budget, max_concurrent).await
    }

    /// Sweep an explicit pid range end-to-end, for processes not necessarily
    /// currently running.
    pub async fn warm_pid_range(
        &self,
        range: Range<Pid>,
        budget: Duration,
        max_concurrent: usize,
    ) -> WarmupStats {
        if !self.platform.permission_granted() {
            return WarmupStats::default();
        }
        self.warm_pids(range.collect(), budget, max_concurrent).await
    }

    /// Running-process warmup first, then sweep only the sub-ranges of
    /// `range` not already covered by a running pid — no process is probed
    /// twice.
    pub async fn warm_running_and_range(
        &self,
        range: Range<Pid>,
        budget: Duration,
        max_concurrent: usize,
    ) -> WarmupStats {
        if !self.platform.permission_granted() {
            return WarmupStats::default();
        }

        let running = self.processes.running_pids();
        let mut stats = self
            .warm_pids(running.clone(), budget, max_concurrent)
            .await;

        for sub in complement_ranges(range, &running) {
            debug!(start = sub.start, end = sub.end, "sweeping uncovered pid range");
            let sub_stats = self.warm_pids(sub.collect(), budget, max_concurrent).await;
            stats.merge(sub_stats);
        }
        stats
    }

    /// Single-flight composite startup sweep: running+range warmup followed
    /// by a title sweep over everything cached. Concurrent callers await the
    /// same in-flight run; later callers get the memoized result.
    ///
    /// A denied permission returns empty stats *without* memoizing, so the
    /// first call after a grant still performs the sweep.
    pub async fn run_startup_warmup_once(&self) -> WarmupStats {
        if !self.platform.permission_granted() {
            return WarmupStats::default();
        }

        self.startup
            .get_or_init(|| async {
                let mut stats = self
                    .warm_running_and_range(
                        self.config.startup_pid_range.clone(),
                        self.config.probe_budget,
                        self.config.max_concurrent,
                    )
                    .await;
                stats.titles_cached += self.sweep_titles().await;
                info!(
                    processes = stats.processes_scanned,
                    handles = stats.handles_cached,
                    titles = stats.titles_cached,
                    "startup warmup complete"
                );
                stats
            })
            .await
            .clone()
    }

    /// Cached handle if present; otherwise, when permitted and
    /// `ensure_populated` is set, resolve the owning pid and run one bounded
    /// engine pass for that process. May still return `None` — an unmatched
    /// window is an accepted outcome.
    pub async fn resolve_on_demand(
        &self,
        id: WindowId,
        ensure_populated: bool,
    ) -> Option<A::Handle> {
        if let Some(handle) = self.cache.get(id) {
            return Some(handle);
        }
        if !ensure_populated || !self.platform.permission_granted() {
            return None;
        }

        let pid = self.owners.owner_pid(id)?;
        let engine = self.engine.clone();
        tokio::task::spawn_blocking(move || engine.resolve_window(pid, id))
            .await
            .ok()
            .flatten()
    }

    /// Gated fan-out of one token-warmup task per pid.
    async fn warm_pids(
        &self,
        pids: Vec<Pid>,
        budget: Duration,
        max_concurrent: usize,
    ) -> WarmupStats {
        let gate = ConcurrencyGate::new(max_concurrent.max(1));
        let mut stats = WarmupStats {
            processes_scanned: pids.len(),
            ..WarmupStats::default()
        };

        let mut tasks = Vec::with_capacity(pids.len());
        for pid in pids {
            let permit = gate.acquire().await;
            let engine = self.engine.clone();
            tasks.push(tokio::task::spawn_blocking(move || {
                let counts = engine.warm_from_tokens(pid, budget);
                drop(permit);
                counts
            }));
        }

        for task in tasks {
            if let Ok((handles, titles)) = task.await {
                stats.handles_cached += handles;
                stats.titles_cached += titles;
            }
        }
        stats
    }

    /// Refresh the title overlay for every cached handle.
    async fn sweep_titles(&self) -> usize {
        let platform = self.platform.clone();
        let cache = self.cache.clone();
        tokio::task::spawn_blocking(move || {
            let mut refreshed = 0;
            for (id, handle) in cache.handles_snapshot() {
                if let Some(title) = platform.title(&handle) {
                    cache.set_title(id, title);
                    refreshed += 1;
                }
            }
            refreshed
        })
        .await
        .unwrap_or(0)
    }
}

/// Minimal set of contiguous sub-ranges of `range` not covered by `covered`.
fn complement_ranges(range: Range<Pid>, covered: &[Pid]) -> Vec<Range<Pid>> {
    let mut inside: Vec<Pid> = covered
        .iter()
        .copied()
        .filter(|p| range.contains(p))
        .collect();
    inside.sort_unstable();
    inside.dedup();

    let mut out = Vec::new();
    let mut cursor = range.start;
    for p in inside {
        if p > cursor {
            out.push(cursor..p);
        }
        cursor = p + 1;
    }
    if cursor < range.end {
        out.push(cursor..range.end);
    }
    out
}
