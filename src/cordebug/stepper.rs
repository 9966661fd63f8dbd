//! Wrapper over a per-thread stepper.

use std::hash::{Hash, Hasher};

use crate::cordebug::{handle::NativeHandle, raw::RawStepper};

/// A stepper bound to one thread. Completion arrives as a StepComplete
/// callback; an unfinished step can be abandoned with
/// [`CorStepper::deactivate`].
#[derive(Clone)]
pub struct CorStepper {
    pub(crate) raw: NativeHandle<dyn RawStepper>,
}

impl CorStepper {
    pub(crate) fn new(raw: NativeHandle<dyn RawStepper>) -> Self {
        CorStepper { raw }
    }

    /// Steps into the next call. Returns whether the native call
    /// succeeded.
    pub fn step_into(&self) -> bool {
        self.raw.step(true).is_ok()
    }

    /// Steps over the next call.
    pub fn step_over(&self) -> bool {
        self.raw.step(false).is_ok()
    }

    /// Runs until the current frame returns.
    pub fn step_out(&self) -> bool {
        self.raw.step_out().is_ok()
    }

    /// Whether a step is in flight.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.raw.is_active().unwrap_or(false)
    }

    /// Abandons an in-flight step.
    pub fn deactivate(&self) -> bool {
        self.raw.deactivate().is_ok()
    }
}

impl PartialEq for CorStepper {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for CorStepper {}

impl Hash for CorStepper {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl std::fmt::Debug for CorStepper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorStepper")
            .field("active", &self.is_active())
            .finish()
    }
}
