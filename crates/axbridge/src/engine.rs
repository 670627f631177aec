//! Tiered identity matching between window descriptors and element handles.
//!
//! The two sources never agree on a shared key, so each introspection handle
//! is tried against a ladder of strategies, first success wins:
//!
//! - Tier A: the private per-element window id. Authoritative when present.
//! - Tier B: title equality, consuming duplicate titles in descriptor
//!   encounter order.
//! - Tier C: positional singleton fallback when titles disagree but only one
//!   pairing is possible.
//! - Tier D: geometry within one coordinate unit per edge.
//!
//! When the windows attribute is unusable (off-desktop windows), recovery
//! runs the other direction: hit-test each descriptor's center, then fall
//! back to the token-space brute force. Every attribute read fails soft; a
//! window that survives all of this unmatched is logged and left out of the
//! cache, never retried synchronously.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use axbridge_core::api::{AccessibilityPlatform, ROLE_WINDOW};
use axbridge_core::{Pid, WarmupConfig, WindowDescriptor, WindowId};
use tracing::debug;

use crate::cache::HandleCache;
use crate::enumerator::TokenSpaceEnumerator;

/// Outcome counters for one per-process resolution pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResolutionStats {
    pub tier_a: usize,
    pub tier_b: usize,
    pub tier_c: usize,
    pub tier_d: usize,
    /// Matched through hit-test recovery rather than the attribute walk.
    pub recovered: usize,
    /// Handles no tier could place.
    pub unassigned_handles: usize,
    /// Descriptors left without a handle at the end of the pass.
    pub unmatched_descriptors: usize,
}

impl ResolutionStats {
    pub fn matched(&self) -> usize {
        self.tier_a + self.tier_b + self.tier_c + self.tier_d + self.recovered
    }
}

pub struct ResolutionEngine<A: AccessibilityPlatform> {
    platform: Arc<A>,
    cache: Arc<HandleCache<A::Handle>>,
    enumerator: TokenSpaceEnumerator<A>,
    config: WarmupConfig,
}

impl<A: AccessibilityPlatform> ResolutionEngine<A> {
    pub fn new(
        platform: Arc<A>,
        cache: Arc<HandleCache<A::Handle>>,
        config: WarmupConfig,
    ) -> Self {
        let enumerator = TokenSpaceEnumerator::new(platform.clone());
        Self {
            platform,
            cache,
            enumerator,
            config,
        }
    }

    pub fn cache(&self) -> &Arc<HandleCache<A::Handle>> {
        &self.cache
    }

    /// Reconcile one process's descriptor snapshot against its live
    /// accessibility handles, populating the cache with every pairing a tier
    /// could establish.
    pub fn reconcile(&self, pid: Pid, descriptors: &[WindowDescriptor]) -> ResolutionStats {
        if !self.platform.permission_granted() {
            return ResolutionStats::default();
        }

        let mut stats = ResolutionStats::default();

        match self.platform.application_windows(pid) {
            // Zero handles for a process that visibly has windows means the
            // windows are off the active desktop — the attribute walk is
            // useless there, fall through to recovery.
            Some(handles) if !(handles.is_empty() && !descriptors.is_empty()) => {
                self.match_handles(pid, &handles, descriptors, &mut stats);
            }
            _ => {
                debug!(pid, "windows attribute unusable, trying direct recovery");
                let recovered = self.recover_direct(pid, descriptors, &mut stats);

                let remaining: Vec<WindowDescriptor> = descriptors
                    .iter()
                    .filter(|d| self.cache.get(d.id).is_none())
                    .cloned()
                    .collect();
                if !remaining.is_empty() {
                    // Elements already placed by recovery must not be
                    // re-assigned to another descriptor by the tier ladder.
                    let handles: Vec<A::Handle> = self
                        .enumerator
                        .enumerate(pid, self.config.max_element_id, self.config.probe_budget)
                        .into_iter()
                        .filter(|h| {
                            !recovered.iter().any(|r| self.platform.same_element(r, h))
                        })
                        .collect();
                    if !handles.is_empty() {
                        self.match_handles(pid, &handles, &remaining, &mut stats);
                    }
                }
            }
        }

        stats.unmatched_descriptors = descriptors
            .iter()
            .filter(|d| self.cache.get(d.id).is_none())
            .count();
        for d in descriptors {
            if self.cache.get(d.id).is_none() {
                debug!(pid, window_id = d.id, "descriptor unmatched after all tiers");
            }
        }
        stats
    }

    /// Run the tier ladder for each handle. First success wins; a consumed
    /// descriptor can never be assigned twice in the same pass.
    fn match_handles(
        &self,
        pid: Pid,
        handles: &[A::Handle],
        descriptors: &[WindowDescriptor],
        stats: &mut ResolutionStats,
    ) {
        let by_id: HashMap<WindowId, &WindowDescriptor> =
            descriptors.iter().map(|d| (d.id, d)).collect();
        let mut unmatched: Vec<WindowId> = descriptors.iter().map(|d| d.id).collect();

        // Nonempty title -> descriptor ids in encounter order, so duplicate
        // titles resolve first-come-first-served rather than arbitrarily.
        let mut by_title: HashMap<&str, VecDeque<WindowId>> = HashMap::new();
        for d in descriptors {
            if !d.title.is_empty() {
                by_title.entry(d.title.as_str()).or_default().push_back(d.id);
            }
        }

        for handle in handles {
            // Tier A: private window id, trusted outright.
            if let Some(id) = self.platform.window_id(handle) {
                self.assign(id, handle);
                consume(&mut unmatched, &mut by_title, &by_id, id);
                stats.tier_a += 1;
                continue;
            }

            // Tier B: title match, first remaining candidate consumed.
            let handle_title = self.platform.title(handle);
            if let Some(title) = handle_title.as_deref().filter(|t| !t.is_empty()) {
                if let Some(id) = by_title.get_mut(title).and_then(VecDeque::pop_front) {
                    self.assign(id, handle);
                    unmatched.retain(|u| *u != id);
                    stats.tier_b += 1;
                    continue;
                }
            }

            // Tier C: sources disagree on the title, but with a single
            // returned handle and a single unmatched descriptor there is
            // only one possible pairing. No geometry sanity check — a wrong
            // match here is an accepted race outcome.
            if unmatched.len() == 1 && handles.len() == unmatched.len() {
                let id = unmatched[0];
                debug!(pid, window_id = id, "singleton positional assignment");
                self.assign(id, handle);
                consume(&mut unmatched, &mut by_title, &by_id, id);
                stats.tier_c += 1;
                continue;
            }

            // Tier D: geometry within one unit on every edge.
            if let Some(frame) = self.platform.frame(handle) {
                let hit = unmatched
                    .iter()
                    .copied()
                    .find(|u| by_id[u].bounds.matches_within(&frame, 1.0));
                if let Some(id) = hit {
                    self.assign(id, handle);
                    consume(&mut unmatched, &mut by_title, &by_id, id);
                    stats.tier_d += 1;
                    continue;
                }
            }

            debug!(pid, "handle not reconcilable by any tier");
            stats.unassigned_handles += 1;
        }
    }

    fn assign(&self, id: WindowId, handle: &A::Handle) {
        self.cache.insert(id, handle.clone());
        if let Some(title) = self.platform.title(handle) {
            self.cache.set_title(id, title);
        }
    }

    /// Recovery when the attribute walk is unusable: hit-test each uncached
    /// descriptor's center, verify the owning pid, then ascend to the
    /// nearest window-role element (the hit itself, else its parent).
    /// Returns the elements assigned here so the caller can exclude them
    /// from later phases of the same pass.
    fn recover_direct(
        &self,
        pid: Pid,
        descriptors: &[WindowDescriptor],
        stats: &mut ResolutionStats,
    ) -> Vec<A::Handle> {
        let mut assigned: Vec<A::Handle> = Vec::new();
        for d in descriptors {
            if self.cache.get(d.id).is_some() {
                continue;
            }
            let (cx, cy) = d.bounds.center();
            let Some(hit) = self.platform.element_at(cx, cy) else {
                debug!(pid, window_id = d.id, "hit-test returned nothing");
                continue;
            };
            if self.platform.element_pid(&hit) != Some(pid) {
                // Another process's window covers this one's center.
                continue;
            }

            let window = if self.platform.role(&hit).as_deref() == Some(ROLE_WINDOW) {
                Some(hit)
            } else {
                self.platform
                    .parent(&hit)
                    .filter(|p| self.platform.role(p).as_deref() == Some(ROLE_WINDOW))
            };
            let Some(window) = window else {
                debug!(pid, window_id = d.id, "no window ancestor at hit point");
                continue;
            };

            // An occluding window can cover several descriptors' centers;
            // one element never resolves more than one window id per pass.
            if assigned.iter().any(|a| self.platform.same_element(a, &window)) {
                debug!(pid, window_id = d.id, "hit-test landed on an already-recovered element");
                continue;
            }

            self.assign(d.id, &window);
            assigned.push(window);
            stats.recovered += 1;
        }
        assigned
    }

    /// Bounded on-demand pass for one window of one process: Tier-A-cache
    /// everything the attribute walk returns, then fall back to the token
    /// space, and return whatever ended up cached for the target. There is
    /// no descriptor snapshot on this path, so only the authoritative id
    /// tier applies.
    pub fn resolve_window(&self, pid: Pid, target: WindowId) -> Option<A::Handle> {
        if !self.platform.permission_granted() {
            return None;
        }

        if let Some(handles) = self.platform.application_windows(pid) {
            for handle in &handles {
                self.cache_by_window_id(handle);
            }
        }

        if self.cache.get(target).is_none() {
            let handles =
                self.enumerator
                    .enumerate(pid, self.config.max_element_id, self.config.probe_budget);
            for handle in &handles {
                self.cache_by_window_id(handle);
            }
        }

        self.cache.get(target)
    }

    /// Enumerator-first discovery used by the background sweeps: the full
    /// attribute walk is skipped for speed, every enumerated handle with an
    /// authoritative id is merged into the cache. Returns (handles, titles)
    /// cached.
    pub fn warm_from_tokens(&self, pid: Pid, budget: Duration) -> (usize, usize) {
        if !self.platform.permission_granted() {
            return (0, 0);
        }

        let handles = self
            .enumerator
            .enumerate(pid, self.config.max_element_id, budget);
        let mut cached = 0;
        let mut titles = 0;
        for handle in &handles {
            let (h, t) = self.cache_by_window_id(handle);
            cached += h;
            titles += t;
        }
        if cached > 0 {
            debug!(pid, cached, titles, "token warmup merged into cache");
        }
        (cached, titles)
    }

    fn cache_by_window_id(&self, handle: &A::Handle) -> (usize, usize) {
        let Some(id) = self.platform.window_id(handle) else {
            return (0, 0);
        };
        self.cache.insert(id, handle.clone());
        match self.platform.title(handle) {
            Some(title) => {
                self.cache.set_title(id, title);
                (1, 1)
            }
            None => (1, 0),
        }
    }
}

fn consume(
    unmatched: &mut Vec<WindowId>,
    by_title: &mut HashMap<&str, VecDeque<WindowId>>,
    by_id: &HashMap<WindowId, &WindowDescriptor>,
    id: WindowId,
) {
    unmatched.retain(|u| *u != id);
    // Drop this descriptor's title occurrence so a later handle cannot
    // Tier-B-claim an already-assigned descriptor.
    if let Some(d) = by_id.get(&id) {
        if let Some(queue) = by_title.get_mut(d.title.as_str()) {
            if let Some(pos) = queue.iter().position(|q| *q == id) {
                queue.remove(pos);
            }
        }
    }
}
