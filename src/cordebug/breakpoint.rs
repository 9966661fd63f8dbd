//! Wrapper over a planted code breakpoint.

use std::hash::{Hash, Hasher};

use crate::cordebug::{handle::NativeHandle, raw::RawCodeBreakpoint};

/// A breakpoint the runtime has planted in code, IL or native. Held by
/// the engine's breakpoint table; dropping the last handle releases the
/// native object without deactivating it first, so the engine
/// deactivates explicitly on removal.
#[derive(Clone)]
pub struct CorCodeBreakpoint {
    pub(crate) raw: NativeHandle<dyn RawCodeBreakpoint>,
}

impl CorCodeBreakpoint {
    /// Wraps a raw code breakpoint handle.
    #[must_use]
    pub fn new(raw: NativeHandle<dyn RawCodeBreakpoint>) -> Self {
        CorCodeBreakpoint { raw }
    }

    /// Activates or deactivates the breakpoint. Returns whether the
    /// native call succeeded.
    pub fn activate(&self, active: bool) -> bool {
        self.raw.activate(active).is_ok()
    }

    /// Whether the breakpoint is currently active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.raw.is_active().unwrap_or(false)
    }
}

impl PartialEq for CorCodeBreakpoint {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for CorCodeBreakpoint {}

impl Hash for CorCodeBreakpoint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl std::fmt::Debug for CorCodeBreakpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorCodeBreakpoint")
            .field("active", &self.is_active())
            .finish()
    }
}
