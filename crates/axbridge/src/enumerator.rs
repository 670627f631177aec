//! Brute-force scan of the opaque per-process element-id space.
//!
//! The normal windows attribute returns nothing for windows on inactive
//! virtual desktops, but the window server will still materialize an element
//! from a remote token embedding the right (pid, element id) pair. Nobody
//! hands out those element ids, so this probes them in ascending order,
//! keeping whatever looks like a real window, until a wall-clock budget runs
//! out. Coverage versus latency is the explicit tradeoff: a truncated scan
//! keeps the lower-numbered matches it already found.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axbridge_core::api::{is_window_like, AccessibilityPlatform};
use axbridge_core::{Pid, RemoteToken};
use tracing::debug;

pub struct TokenSpaceEnumerator<A: AccessibilityPlatform> {
    platform: Arc<A>,
}

impl<A: AccessibilityPlatform> TokenSpaceEnumerator<A> {
    pub fn new(platform: Arc<A>) -> Self {
        Self { platform }
    }

    /// Probe element ids `0..max_element_id` for `pid`, keeping window-level
    /// handles, until `budget` elapses. Best-effort and incomplete by
    /// design; the budget check runs between probes, so a single slow probe
    /// can overrun it slightly.
    ///
    /// Without the elevated introspection permission this returns an empty
    /// vec without probing at all.
    pub fn enumerate(&self, pid: Pid, max_element_id: u64, budget: Duration) -> Vec<A::Handle> {
        if !self.platform.permission_granted() {
            return Vec::new();
        }

        let start = Instant::now();
        let mut found = Vec::new();
        let mut probed: u64 = 0;

        for element_id in 0..max_element_id {
            let token = RemoteToken::new(pid, element_id);
            if let Some(handle) = self.platform.handle_from_token(&token) {
                let subrole = self.platform.subrole(&handle);
                let role = self.platform.role(&handle);
                if is_window_like(role.as_deref(), subrole.as_deref()) {
                    found.push(handle);
                }
            }
            probed += 1;
            if start.elapsed() >= budget {
                break;
            }
        }

        debug!(
            pid,
            probed,
            found = found.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "token space scan"
        );
        found
    }
}

// Manual impl: `A` itself need not be Clone.
impl<A: AccessibilityPlatform> Clone for TokenSpaceEnumerator<A> {
    fn clone(&self) -> Self {
        Self {
            platform: self.platform.clone(),
        }
    }
}
