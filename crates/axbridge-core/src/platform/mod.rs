//! Per-OS implementations of the platform traits.
//!
//! Only macOS ships today — the remote-token probe and the private window-id
//! attribute are Mac window-server facilities. Other platforms plug in by
//! implementing [`crate::api::AccessibilityPlatform`].

#[cfg(target_os = "macos")]
pub mod macos;

#[cfg(target_os = "macos")]
pub use macos::{MacPlatform, MacProcessDirectory, MacWindowOwners};
