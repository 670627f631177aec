//! macOS accessibility platform: AXUIElement attribute reads, the private
//! remote-token constructor, and the CGWindowList owner lookup.
//!
//! Two private symbols are load-bearing here. `_AXUIElementGetWindow` reads
//! the window id straight off a window element, and
//! `_AXUIElementCreateWithRemoteToken` materializes an element from a raw
//! token — the only way to reach windows on inactive Spaces, where the
//! public `AXWindows` attribute silently returns nothing.

use std::ffi::c_void;
use std::ptr;

use accessibility_sys::{
    kAXErrorSuccess, AXError, AXIsProcessTrusted, AXUIElementCopyAttributeValue,
    AXUIElementCopyElementAtPosition, AXUIElementCreateApplication, AXUIElementCreateSystemWide,
    AXUIElementGetPid, AXUIElementRef, AXValueGetValue, AXValueRef,
};
use core_foundation::array::{CFArrayGetCount, CFArrayGetTypeID, CFArrayGetValueAtIndex, CFArrayRef};
use core_foundation::base::{CFEqual, CFGetTypeID, CFRelease, CFRetain, CFType, CFTypeRef, TCFType};
use core_foundation::data::{CFData, CFDataRef};
use core_foundation::dictionary::{CFDictionary, CFDictionaryRef};
use core_foundation::number::CFNumber;
use core_foundation::string::{CFString, CFStringRef};
use core_graphics::geometry::{CGPoint, CGSize};
use core_graphics::window::{copy_window_info, kCGWindowListOptionIncludingWindow};
use parking_lot::Mutex;
use tracing::trace;

use crate::api::{AccessibilityPlatform, ProcessDirectory, WindowOwnerResolver};
use crate::token::RemoteToken;
use crate::types::{Bounds, Pid, WindowId};

// AXValueType discriminants for AXValueGetValue.
const AX_VALUE_TYPE_CGPOINT: u32 = 1;
const AX_VALUE_TYPE_CGSIZE: u32 = 2;

#[link(name = "ApplicationServices", kind = "framework")]
extern "C" {
    /// Private: window id of a window-level element.
    fn _AXUIElementGetWindow(element: AXUIElementRef, out: *mut u32) -> AXError;
    /// Private: element from a 20-byte remote token. Returns null for
    /// element ids that do not exist in the target process.
    fn _AXUIElementCreateWithRemoteToken(token: CFDataRef) -> AXUIElementRef;
}

// ---------------------------------------------------------------------------
// AxElement
// ---------------------------------------------------------------------------

/// A retained `AXUIElementRef`.
///
/// The raw pointer is freely passed between tasks, but it is only ever
/// *dereferenced* inside [`MacPlatform`] attribute reads, which all run under
/// one mutex. That serialization is what justifies the `Send + Sync` impls
/// below — the pointer itself carries no thread affinity, the AX calls do.
pub struct AxElement {
    raw: AXUIElementRef,
}

impl AxElement {
    /// Take ownership of a reference returned under the Create rule.
    unsafe fn from_create(raw: AXUIElementRef) -> Option<Self> {
        if raw.is_null() {
            None
        } else {
            Some(Self { raw })
        }
    }
}

impl Clone for AxElement {
    fn clone(&self) -> Self {
        unsafe { CFRetain(self.raw as CFTypeRef) };
        Self { raw: self.raw }
    }
}

impl Drop for AxElement {
    fn drop(&mut self) {
        unsafe { CFRelease(self.raw as CFTypeRef) };
    }
}

// Safety: see the type-level comment — all dereferencing funnels through the
// platform's attribute lock, so cross-task access never races.
unsafe impl Send for AxElement {}
unsafe impl Sync for AxElement {}

// ---------------------------------------------------------------------------
// MacPlatform
// ---------------------------------------------------------------------------

/// Accessibility introspection backed by the AX API.
pub struct MacPlatform {
    /// Serializes every AX call — the confinement context for attribute
    /// reads on handles shared across tasks.
    ax_lock: Mutex<()>,
    system_wide: AxElement,
}

impl MacPlatform {
    /// `None` when the system-wide accessibility element cannot be created
    /// (the AX server is unavailable in this session).
    pub fn new() -> Option<Self> {
        let system_wide = unsafe { AxElement::from_create(AXUIElementCreateSystemWide()) }?;
        Some(Self {
            ax_lock: Mutex::new(()),
            system_wide,
        })
    }

    /// Copy one attribute under the lock. `None` on any AX error.
    fn copy_attribute(&self, element: &AxElement, name: &str) -> Option<CFTypeRef> {
        let _guard = self.ax_lock.lock();
        let attr = CFString::new(name);
        let mut value: CFTypeRef = ptr::null();
        let err = unsafe {
            AXUIElementCopyAttributeValue(
                element.raw,
                attr.as_concrete_TypeRef(),
                &mut value as *mut CFTypeRef,
            )
        };
        if err != kAXErrorSuccess || value.is_null() {
            return None;
        }
        Some(value)
    }

    fn copy_string_attribute(&self, element: &AxElement, name: &str) -> Option<String> {
        let value = self.copy_attribute(element, name)?;
        unsafe {
            if CFGetTypeID(value) != CFString::type_id() {
                CFRelease(value);
                return None;
            }
            let s = CFString::wrap_under_create_rule(value as CFStringRef);
            Some(s.to_string())
        }
    }

    /// Decode an AXValue attribute into `out` via `AXValueGetValue`.
    fn copy_ax_value(
        &self,
        element: &AxElement,
        name: &str,
        value_type: u32,
        out: *mut c_void,
    ) -> bool {
        let Some(value) = self.copy_attribute(element, name) else {
            return false;
        };
        let ok = unsafe { AXValueGetValue(value as AXValueRef, value_type, out) };
        unsafe { CFRelease(value) };
        ok
    }
}

impl AccessibilityPlatform for MacPlatform {
    type Handle = AxElement;

    fn permission_granted(&self) -> bool {
        unsafe { AXIsProcessTrusted() }
    }

    fn application_windows(&self, pid: Pid) -> Option<Vec<AxElement>> {
        let app = unsafe { AxElement::from_create(AXUIElementCreateApplication(pid)) }?;
        let value = self.copy_attribute(&app, "AXWindows")?;
        let _guard = self.ax_lock.lock();
        let mut out = Vec::new();
        unsafe {
            if CFGetTypeID(value) != CFArrayGetTypeID() {
                CFRelease(value);
                return None;
            }
            let array = value as CFArrayRef;
            let count = CFArrayGetCount(array);
            for i in 0..count {
                let item = CFArrayGetValueAtIndex(array, i) as AXUIElementRef;
                if !item.is_null() {
                    // Array items follow the Get rule — retain before keeping.
                    CFRetain(item as CFTypeRef);
                    out.push(AxElement { raw: item });
                }
            }
            CFRelease(value);
        }
        Some(out)
    }

    fn handle_from_token(&self, token: &RemoteToken) -> Option<AxElement> {
        let _guard = self.ax_lock.lock();
        let data = CFData::from_buffer(&token.encode());
        let raw = unsafe { _AXUIElementCreateWithRemoteToken(data.as_concrete_TypeRef()) };
        let element = unsafe { AxElement::from_create(raw) };
        if element.is_some() {
            trace!(pid = token.pid, element_id = token.element_id, "remote token resolved");
        }
        element
    }

    fn role(&self, handle: &AxElement) -> Option<String> {
        self.copy_string_attribute(handle, "AXRole")
    }

    fn subrole(&self, handle: &AxElement) -> Option<String> {
        self.copy_string_attribute(handle, "AXSubrole")
    }

    fn title(&self, handle: &AxElement) -> Option<String> {
        self.copy_string_attribute(handle, "AXTitle")
    }

    fn window_id(&self, handle: &AxElement) -> Option<WindowId> {
        let _guard = self.ax_lock.lock();
        let mut id: u32 = 0;
        let err = unsafe { _AXUIElementGetWindow(handle.raw, &mut id) };
        if err == kAXErrorSuccess && id != 0 {
            Some(id)
        } else {
            None
        }
    }

    fn frame(&self, handle: &AxElement) -> Option<Bounds> {
        let mut origin = CGPoint::new(0.0, 0.0);
        let mut size = CGSize::new(0.0, 0.0);
        if !self.copy_ax_value(
            handle,
            "AXPosition",
            AX_VALUE_TYPE_CGPOINT,
            &mut origin as *mut CGPoint as *mut c_void,
        ) {
            return None;
        }
        if !self.copy_ax_value(
            handle,
            "AXSize",
            AX_VALUE_TYPE_CGSIZE,
            &mut size as *mut CGSize as *mut c_void,
        ) {
            return None;
        }
        Some(Bounds::new(origin.x, origin.y, size.width, size.height))
    }

    fn parent(&self, handle: &AxElement) -> Option<AxElement> {
        let value = self.copy_attribute(handle, "AXParent")?;
        unsafe { AxElement::from_create(value as AXUIElementRef) }
    }

    fn same_element(&self, a: &AxElement, b: &AxElement) -> bool {
        // CFEqual compares the element token, not the pointer — two distinct
        // AXUIElementRefs for the same element still compare equal.
        unsafe { CFEqual(a.raw as CFTypeRef, b.raw as CFTypeRef) != 0 }
    }

    fn element_pid(&self, handle: &AxElement) -> Option<Pid> {
        let _guard = self.ax_lock.lock();
        let mut pid: Pid = 0;
        let err = unsafe { AXUIElementGetPid(handle.raw, &mut pid) };
        if err == kAXErrorSuccess && pid > 0 {
            Some(pid)
        } else {
            None
        }
    }

    fn element_at(&self, x: f64, y: f64) -> Option<AxElement> {
        let _guard = self.ax_lock.lock();
        let mut raw: AXUIElementRef = ptr::null_mut();
        let err = unsafe {
            AXUIElementCopyElementAtPosition(self.system_wide.raw, x as f32, y as f32, &mut raw)
        };
        if err != kAXErrorSuccess {
            return None;
        }
        unsafe { AxElement::from_create(raw) }
    }
}

// ---------------------------------------------------------------------------
// MacProcessDirectory
// ---------------------------------------------------------------------------

/// Running-process enumeration via libproc.
pub struct MacProcessDirectory;

impl ProcessDirectory for MacProcessDirectory {
    fn running_pids(&self) -> Vec<Pid> {
        let expected = unsafe { libc::proc_listallpids(ptr::null_mut(), 0) };
        if expected <= 0 {
            return Vec::new();
        }
        // Headroom for processes spawned between the two calls.
        let mut pids = vec![0 as Pid; expected as usize * 2];
        let len_bytes = (pids.len() * std::mem::size_of::<Pid>()) as i32;
        let written =
            unsafe { libc::proc_listallpids(pids.as_mut_ptr() as *mut c_void, len_bytes) };
        if written <= 0 {
            return Vec::new();
        }
        pids.truncate(written as usize);
        pids.retain(|&p| p > 0);
        pids
    }
}

// ---------------------------------------------------------------------------
// MacWindowOwners
// ---------------------------------------------------------------------------

/// Window-id → owning-pid lookup through the CG window list.
pub struct MacWindowOwners;

impl WindowOwnerResolver for MacWindowOwners {
    fn owner_pid(&self, id: WindowId) -> Option<Pid> {
        let info = copy_window_info(kCGWindowListOptionIncludingWindow, id)?;
        let key = CFString::from_static_string("kCGWindowOwnerPID");
        for item in info.iter() {
            let dict = unsafe {
                CFDictionary::<CFString, CFType>::wrap_under_get_rule(*item as CFDictionaryRef)
            };
            let Some(value) = dict.find(&key) else {
                continue;
            };
            if let Some(owner) = value.downcast::<CFNumber>().and_then(|n| n.to_i64()) {
                return Some(owner as Pid);
            }
        }
        None
    }
}
