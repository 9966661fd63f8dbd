//! Wrapper over a debuggee thread.

use std::hash::{Hash, Hasher};

use bitflags::bitflags;

use crate::cordebug::{
    appdomain::CorAppDomain,
    eval::CorEval,
    frame::CorFrame,
    handle::NativeHandle,
    raw::RawThread,
    stepper::CorStepper,
};

bitflags! {
    /// `CorDebugUserState` bits reported for a thread.
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct CorDebugUserState: u32 {
        /// A stop has been requested
        const STOP_REQUESTED = 0x01;
        /// A suspend has been requested
        const SUSPEND_REQUESTED = 0x02;
        /// The thread is running in the background
        const BACKGROUND = 0x04;
        /// The thread has not started executing
        const UNSTARTED = 0x08;
        /// The thread has exited
        const STOPPED = 0x10;
        /// The thread is blocked on a wait
        const WAIT_SLEEP_JOIN = 0x20;
        /// The thread is suspended
        const SUSPENDED = 0x40;
        /// The thread is at an unsafe point for funceval
        const UNSAFE_POINT = 0x80;
        /// The thread belongs to the thread pool
        const THREADPOOL = 0x100;
    }
}

/// A thread in the debuggee.
#[derive(Clone)]
pub struct CorThread {
    pub(crate) raw: NativeHandle<dyn RawThread>,
}

impl CorThread {
    /// Wraps a raw thread handle.
    #[must_use]
    pub fn new(raw: NativeHandle<dyn RawThread>) -> Self {
        CorThread { raw }
    }

    /// OS thread id.
    #[must_use]
    pub fn id(&self) -> Option<u32> {
        self.raw.id().ok()
    }

    /// Current user-state flags. Unknown bits from a newer runtime are
    /// kept.
    #[must_use]
    pub fn user_state(&self) -> CorDebugUserState {
        CorDebugUserState::from_bits_retain(self.raw.user_state().unwrap_or(0))
    }

    /// The domain the thread is currently executing in.
    #[must_use]
    pub fn app_domain(&self) -> Option<CorAppDomain> {
        self.raw.app_domain().ok().map(CorAppDomain::new)
    }

    /// Topmost managed frame, `None` when the thread is in native code.
    #[must_use]
    pub fn active_frame(&self) -> Option<CorFrame> {
        self.raw.active_frame().ok().flatten().map(CorFrame::new)
    }

    /// Creates a stepper bound to this thread.
    #[must_use]
    pub fn create_stepper(&self) -> Option<CorStepper> {
        self.raw.create_stepper().ok().map(CorStepper::new)
    }

    /// Creates an evaluation context bound to this thread.
    #[must_use]
    pub fn create_eval(&self) -> Option<CorEval> {
        self.raw.create_eval().ok().map(CorEval::new)
    }
}

impl PartialEq for CorThread {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for CorThread {}

impl Hash for CorThread {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl std::fmt::Debug for CorThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorThread").field("id", &self.id()).finish()
    }
}
