//! Resolution and caching of accessibility window handles.
//!
//! The window-list source hands out stable window ids, titles and geometry,
//! but cannot see windows on inactive virtual desktops. The accessibility
//! API hands out live element handles, but its enumeration silently returns
//! nothing for exactly those windows. This crate reconciles the two so that
//! every visible-in-principle window ends up with a usable handle:
//!
//! - [`HandleCache`] — confinement-serialized window-id → handle map, plus a
//!   title overlay.
//! - [`TokenSpaceEnumerator`] — time-budgeted brute-force probe of the opaque
//!   per-process element-id space.
//! - [`ResolutionEngine`] — tiered identity matching (authoritative id,
//!   title, singleton fallback, geometry) with hit-test recovery.
//! - [`ConcurrencyGate`] — bounds simultaneous per-process work.
//! - [`WarmupScheduler`] — background sweeps and the single-flight startup
//!   warmup.
//!
//! Nothing here is fatal: permission absence no-ops, a failed attribute read
//! costs one matching tier, and an unmatched window simply stays out of the
//! cache.

pub mod cache;
pub mod engine;
pub mod enumerator;
pub mod gate;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod stubs;

pub use cache::HandleCache;
pub use engine::{ResolutionEngine, ResolutionStats};
pub use enumerator::TokenSpaceEnumerator;
pub use gate::{ConcurrencyGate, GatePermit};
pub use scheduler::{WarmupScheduler, WarmupStats};
