//! Remote token encoding for the brute-force element probe.
//!
//! The accessibility API can materialize an element handle from an opaque
//! 20-byte token (`_AXUIElementCreateWithRemoteToken`). The layout is not
//! documented but well established: owning pid, a reserved zero word, a magic
//! constant, and the per-process element id. Probing ascending element ids
//! with this token is the only way to reach windows the normal enumeration
//! API cannot see (windows on inactive virtual desktops).

use crate::types::Pid;

/// Magic constant the window server expects in the third word ("coco").
pub const REMOTE_TOKEN_MAGIC: u32 = 0x636f_636f;

/// Total encoded size: i32 pid + u32 reserved + u32 magic + u64 element id.
pub const REMOTE_TOKEN_LEN: usize = 20;

/// One candidate in the opaque element-id space of a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteToken {
    pub pid: Pid,
    pub element_id: u64,
}

impl RemoteToken {
    pub fn new(pid: Pid, element_id: u64) -> Self {
        Self { pid, element_id }
    }

    /// Encode to the wire layout consumed by the remote-token constructor.
    /// All fields little-endian.
    pub fn encode(&self) -> [u8; REMOTE_TOKEN_LEN] {
        let mut buf = [0u8; REMOTE_TOKEN_LEN];
        buf[0..4].copy_from_slice(&self.pid.to_le_bytes());
        // buf[4..8] stays zero (reserved)
        buf[8..12].copy_from_slice(&REMOTE_TOKEN_MAGIC.to_le_bytes());
        buf[12..20].copy_from_slice(&self.element_id.to_le_bytes());
        buf
    }
}
