//! Window metadata as supplied by the window-list source.
//!
//! Descriptors are read-only input: stable numeric id, title (possibly empty
//! or stale), screen bounds, and owning process. The accessibility side never
//! produces these — it only reconciles against them.

use serde::{Deserialize, Serialize};

/// Stable window identifier from the window-list source (CGWindowID on macOS).
pub type WindowId = u32;

/// Process identifier.
pub type Pid = i32;

/// Screen rectangle in global coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Center point, used for hit-test recovery.
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// True when every edge of `other` is within `tol` of this rectangle.
    /// The two sources round geometry differently, so exact equality is
    /// never required.
    pub fn matches_within(&self, other: &Bounds, tol: f64) -> bool {
        (self.x - other.x).abs() <= tol
            && (self.y - other.y).abs() <= tol
            && (self.width - other.width).abs() <= tol
            && (self.height - other.height).abs() <= tol
    }
}

/// One window as reported by the window-list source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowDescriptor {
    /// Stable for the window's lifetime.
    pub id: WindowId,
    /// May be empty, and may lag behind the real title.
    pub title: String,
    pub bounds: Bounds,
    /// Owning process.
    pub pid: Pid,
}

impl WindowDescriptor {
    pub fn new(id: WindowId, title: impl Into<String>, bounds: Bounds, pid: Pid) -> Self {
        Self {
            id,
            title: title.into(),
            bounds,
            pid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_of_bounds() {
        let b = Bounds::new(100.0, 200.0, 50.0, 30.0);
        assert_eq!(b.center(), (125.0, 215.0));
    }

    #[test]
    fn matches_within_tolerance() {
        let a = Bounds::new(0.0, 0.0, 800.0, 600.0);
        let off_by_one = Bounds::new(1.0, 0.0, 799.0, 601.0);
        let off_by_two = Bounds::new(2.0, 0.0, 800.0, 600.0);

        assert!(a.matches_within(&off_by_one, 1.0));
        assert!(!a.matches_within(&off_by_two, 1.0));
    }

    #[test]
    fn descriptor_serde_roundtrip() {
        let d = WindowDescriptor::new(42, "Inbox", Bounds::new(0.0, 0.0, 1024.0, 768.0), 501);
        let json = serde_json::to_string(&d).unwrap();
        let back: WindowDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, 42);
        assert_eq!(back.title, "Inbox");
        assert_eq!(back.pid, 501);
    }
}
