//! Core data model and platform seam for axbridge.
//!
//! The interesting machinery (cache, matching engine, warmup scheduler) lives
//! in the `axbridge` crate; this crate holds the vocabulary both sides of the
//! platform boundary speak: window descriptors from the window-list source,
//! remote tokens for the brute-force element probe, and the
//! [`AccessibilityPlatform`] trait that per-OS code implements.

pub mod api;
pub mod config;
pub mod platform;
pub mod token;
pub mod types;

pub use api::{AccessibilityPlatform, ProcessDirectory, WindowOwnerResolver};
pub use config::WarmupConfig;
pub use token::RemoteToken;
pub use types::{Bounds, Pid, WindowDescriptor, WindowId};
