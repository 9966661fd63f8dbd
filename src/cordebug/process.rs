//! Wrapper over a debuggee process.

use std::hash::{Hash, Hasher};

use crate::cordebug::{
    appdomain::CorAppDomain,
    handle::NativeHandle,
    raw::RawProcess,
    thread::CorThread,
};

const IMAGE_FILE_MACHINE_I386: u16 = 0x014C;
const IMAGE_FILE_MACHINE_ARMNT: u16 = 0x01C4;

/// A process being debugged.
#[derive(Clone)]
pub struct CorProcess {
    pub(crate) raw: NativeHandle<dyn RawProcess>,
}

impl CorProcess {
    /// Wraps a raw process handle.
    #[must_use]
    pub fn new(raw: NativeHandle<dyn RawProcess>) -> Self {
        CorProcess { raw }
    }

    /// Process id, `None` when the process is gone.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.raw.pid().ok()
    }

    /// Pointer width of the debuggee in bytes, from the image's machine
    /// type. A failed query reads as 64-bit; the strict size checks in
    /// the value reader turn a wrong guess into invalid results, never
    /// into misread memory.
    #[must_use]
    pub fn pointer_size(&self) -> u32 {
        match self.raw.machine() {
            Ok(IMAGE_FILE_MACHINE_I386) | Ok(IMAGE_FILE_MACHINE_ARMNT) => 4,
            _ => 8,
        }
    }

    /// Synchronizes the process. Returns whether the native call
    /// succeeded.
    pub fn stop(&self) -> bool {
        self.raw.stop().is_ok()
    }

    /// Resumes the process from a synchronized state.
    pub fn continue_run(&self, outside_of_controller: bool) -> bool {
        self.raw.continue_run(outside_of_controller).is_ok()
    }

    /// Terminates the process with the given exit code.
    pub fn terminate(&self, exit_code: u32) -> bool {
        self.raw.terminate(exit_code).is_ok()
    }

    /// Detaches the debugger, leaving the process running.
    pub fn detach(&self) -> bool {
        self.raw.detach().is_ok()
    }

    /// All threads of the process.
    #[must_use]
    pub fn threads(&self) -> Vec<CorThread> {
        self.raw
            .threads()
            .map(|handles| handles.into_iter().map(CorThread::new).collect())
            .unwrap_or_default()
    }

    /// All application domains of the process.
    #[must_use]
    pub fn app_domains(&self) -> Vec<CorAppDomain> {
        self.raw
            .app_domains()
            .map(|handles| handles.into_iter().map(CorAppDomain::new).collect())
            .unwrap_or_default()
    }
}

impl PartialEq for CorProcess {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for CorProcess {}

impl Hash for CorProcess {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl std::fmt::Debug for CorProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorProcess").field("pid", &self.pid()).finish()
    }
}
