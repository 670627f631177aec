//! Tunables for the warmup sweeps and the brute-force probe.

use std::ops::Range;
use std::time::Duration;

use crate::types::Pid;

/// Defaults for the background warmup machinery.
///
/// The probe budget trades coverage against latency: brute-forcing the
/// element-id space is pure overhead for the foreground, so each process
/// gets a small fixed slice and whatever was found by then is kept.
#[derive(Debug, Clone)]
pub struct WarmupConfig {
    /// Upper bound of the per-process element-id space scanned by the
    /// brute-force enumerator. Real windows sit in the low hundreds; the
    /// default leaves generous headroom without making a scan unbounded.
    pub max_element_id: u64,
    /// Wall-clock budget for one process's enumeration pass. Checked
    /// between probes, so a single slow probe can overrun slightly.
    pub probe_budget: Duration,
    /// Simultaneous in-flight per-process resolution tasks.
    pub max_concurrent: usize,
    /// Pid range covered by the startup composite sweep. Long-running apps
    /// on Darwin sit at low pids; sweeping higher is wasted budget.
    pub startup_pid_range: Range<Pid>,
}

impl Default for WarmupConfig {
    fn default() -> Self {
        Self {
            max_element_id: 2000,
            probe_budget: Duration::from_millis(50),
            max_concurrent: 4,
            startup_pid_range: 1..2048,
        }
    }
}
