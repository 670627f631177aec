//! The platform seam: traits the resolution machinery consumes.
//!
//! Everything here fails soft. A missing attribute, a dead handle, or a
//! denied permission is `None` / `false`, never an error — a single failed
//! probe must only cost the caller one matching tier, not a whole sweep.

use crate::token::RemoteToken;
use crate::types::{Bounds, Pid, WindowId};

/// Role reported by window-level elements.
pub const ROLE_WINDOW: &str = "AXWindow";

/// Subroles accepted by the brute-force enumerator: real user-facing windows.
pub const SUBROLE_STANDARD_WINDOW: &str = "AXStandardWindow";
pub const SUBROLE_DIALOG: &str = "AXDialog";

/// True when the role/subrole pair denotes a window worth caching.
/// Subrole is the stronger signal; role alone is accepted when the element
/// reports no subrole at all.
pub fn is_window_like(role: Option<&str>, subrole: Option<&str>) -> bool {
    match subrole {
        Some(s) => s == SUBROLE_STANDARD_WINDOW || s == SUBROLE_DIALOG,
        None => role == Some(ROLE_WINDOW),
    }
}

/// Accessibility introspection primitives, one implementation per OS.
///
/// `Handle` is an opaque element reference. It must be cheap to clone and
/// safe to *pass* between tasks; implementations serialize the actual
/// attribute reads internally (on macOS every AX call goes through one
/// mutex), so dereferencing never happens concurrently.
pub trait AccessibilityPlatform: Send + Sync + 'static {
    type Handle: Clone + Send + Sync + 'static;

    /// Elevated introspection permission ("accessibility trusted" on macOS).
    /// Consulted at the start of every public entry point; when false,
    /// everything no-ops.
    fn permission_granted(&self) -> bool;

    /// The application's windows attribute. `None` means the read itself
    /// failed; `Some(vec![])` means it succeeded but the process has no
    /// windows on the active desktop.
    fn application_windows(&self, pid: Pid) -> Option<Vec<Self::Handle>>;

    /// Materialize a handle from a remote token. Fails for element ids that
    /// do not exist in the target process.
    fn handle_from_token(&self, token: &RemoteToken) -> Option<Self::Handle>;

    fn role(&self, handle: &Self::Handle) -> Option<String>;
    fn subrole(&self, handle: &Self::Handle) -> Option<String>;
    fn title(&self, handle: &Self::Handle) -> Option<String>;

    /// Private per-element window id, when the platform exposes one
    /// (`_AXUIElementGetWindow`). Authoritative when present.
    fn window_id(&self, handle: &Self::Handle) -> Option<WindowId>;

    /// Position and size combined into one rectangle.
    fn frame(&self, handle: &Self::Handle) -> Option<Bounds>;

    fn parent(&self, handle: &Self::Handle) -> Option<Self::Handle>;

    /// Pid owning the element.
    fn element_pid(&self, handle: &Self::Handle) -> Option<Pid>;

    /// Whether two handles refer to the same underlying element (`CFEqual`
    /// on macOS, which compares element identity rather than pointer
    /// identity). The matching engine uses this to keep one resolution pass
    /// from handing a single element to two window ids.
    fn same_element(&self, a: &Self::Handle, b: &Self::Handle) -> bool;

    /// Hit-test the introspection root at a global screen coordinate.
    fn element_at(&self, x: f64, y: f64) -> Option<Self::Handle>;
}

/// Supplies the pids of currently running processes.
pub trait ProcessDirectory: Send + Sync + 'static {
    fn running_pids(&self) -> Vec<Pid>;
}

/// Maps a window id back to its owning process. Only the on-demand path
/// needs this; background sweeps discover pids themselves.
pub trait WindowOwnerResolver: Send + Sync + 'static {
    fn owner_pid(&self, id: WindowId) -> Option<Pid>;
}
