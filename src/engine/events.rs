//! The debug events the engine consumes.
//!
//! Callbacks from the native debugging services arrive already wrapped:
//! each carries the wrappers for the objects the callback reported, and
//! nothing else. The engine never reaches back into the raw callback
//! arguments.

use strum::{Display, EnumCount, EnumIter};

use crate::cordebug::{
    CorAppDomain, CorAssembly, CorClass, CorCodeBreakpoint, CorEval, CorModule, CorProcess,
    CorThread,
};

/// Kind of a debug event, without its payload. Used to register
/// breakpoints against one raw event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumCount)]
pub enum DebugEventKind {
    /// The debuggee process is up and running under the debugger
    CreateProcess,
    /// The debuggee process exited
    ExitProcess,
    /// An application domain was created
    CreateAppDomain,
    /// An application domain exited
    ExitAppDomain,
    /// An assembly was loaded
    LoadAssembly,
    /// An assembly was unloaded
    UnloadAssembly,
    /// A module was loaded
    LoadModule,
    /// A module was unloaded
    UnloadModule,
    /// A class was loaded; only raised for modules with class-load
    /// callbacks enabled
    LoadClass,
    /// A class was unloaded
    UnloadClass,
    /// A managed thread started
    CreateThread,
    /// A managed thread exited
    ExitThread,
    /// A planted code breakpoint was hit
    Breakpoint,
    /// A step operation completed
    StepComplete,
    /// The debuggee executed a break instruction
    Break,
    /// A managed exception was thrown
    Exception,
    /// A function evaluation completed
    EvalComplete,
    /// A function evaluation terminated with an exception
    EvalException,
    /// A thread or application domain changed its name
    NameChange,
    /// A module's symbols were updated
    UpdateModuleSymbols,
    /// A managed debugging assistant fired
    MdaNotification,
    /// The debuggee received a Ctrl-C
    ControlCTrap,
    /// The debuggee logged a message
    LogMessage,
    /// A breakpoint could not be planted where it was requested
    BreakpointSetError,
}

/// A debug event with its payload.
///
/// Threads and app domains are optional on the events where the native
/// callback can report them as null.
#[derive(Debug, Clone)]
pub enum DebugEvent {
    /// The debuggee process is up and running under the debugger
    CreateProcess {
        /// The new process
        process: CorProcess,
    },
    /// The debuggee process exited
    ExitProcess {
        /// The exited process
        process: CorProcess,
    },
    /// An application domain was created
    CreateAppDomain {
        /// The new application domain
        app_domain: CorAppDomain,
    },
    /// An application domain exited
    ExitAppDomain {
        /// The exited application domain
        app_domain: CorAppDomain,
    },
    /// An assembly was loaded
    LoadAssembly {
        /// The loaded assembly
        assembly: CorAssembly,
    },
    /// An assembly was unloaded
    UnloadAssembly {
        /// The unloaded assembly
        assembly: CorAssembly,
    },
    /// A module was loaded
    LoadModule {
        /// The loaded module
        module: CorModule,
    },
    /// A module was unloaded
    UnloadModule {
        /// The unloaded module
        module: CorModule,
    },
    /// A class was loaded
    LoadClass {
        /// The loaded class
        class: CorClass,
    },
    /// A class was unloaded
    UnloadClass {
        /// The unloaded class
        class: CorClass,
    },
    /// A managed thread started
    CreateThread {
        /// The new thread
        thread: CorThread,
    },
    /// A managed thread exited
    ExitThread {
        /// The exited thread
        thread: CorThread,
    },
    /// A planted code breakpoint was hit
    Breakpoint {
        /// App domain the hit occurred in
        app_domain: Option<CorAppDomain>,
        /// Thread that hit the breakpoint
        thread: Option<CorThread>,
        /// The native breakpoint that was hit
        breakpoint: CorCodeBreakpoint,
    },
    /// A step operation completed
    StepComplete {
        /// Thread the stepper was bound to
        thread: Option<CorThread>,
    },
    /// The debuggee executed a break instruction
    Break {
        /// Thread that executed the break
        thread: Option<CorThread>,
    },
    /// A managed exception was thrown
    Exception {
        /// Thread the exception was thrown on
        thread: Option<CorThread>,
        /// Whether no handler exists for the exception
        unhandled: bool,
    },
    /// A function evaluation completed
    EvalComplete {
        /// Thread the evaluation ran on
        thread: Option<CorThread>,
        /// The completed evaluation
        eval: CorEval,
    },
    /// A function evaluation terminated with an exception
    EvalException {
        /// Thread the evaluation ran on
        thread: Option<CorThread>,
        /// The faulted evaluation
        eval: CorEval,
    },
    /// A thread or application domain changed its name
    NameChange {
        /// Renamed app domain, when an app domain was renamed
        app_domain: Option<CorAppDomain>,
        /// Renamed thread, when a thread was renamed
        thread: Option<CorThread>,
    },
    /// A module's symbols were updated
    UpdateModuleSymbols {
        /// The module whose symbols changed
        module: CorModule,
    },
    /// A managed debugging assistant fired
    MdaNotification {
        /// Thread the assistant fired on
        thread: Option<CorThread>,
    },
    /// The debuggee received a Ctrl-C
    ControlCTrap,
    /// The debuggee logged a message
    LogMessage {
        /// Thread that logged the message
        thread: Option<CorThread>,
        /// The message text
        message: String,
    },
    /// A breakpoint could not be planted where it was requested
    BreakpointSetError {
        /// The breakpoint that failed to bind
        breakpoint: CorCodeBreakpoint,
    },
}

impl DebugEvent {
    /// The kind of this event.
    #[must_use]
    pub fn kind(&self) -> DebugEventKind {
        match self {
            DebugEvent::CreateProcess { .. } => DebugEventKind::CreateProcess,
            DebugEvent::ExitProcess { .. } => DebugEventKind::ExitProcess,
            DebugEvent::CreateAppDomain { .. } => DebugEventKind::CreateAppDomain,
            DebugEvent::ExitAppDomain { .. } => DebugEventKind::ExitAppDomain,
            DebugEvent::LoadAssembly { .. } => DebugEventKind::LoadAssembly,
            DebugEvent::UnloadAssembly { .. } => DebugEventKind::UnloadAssembly,
            DebugEvent::LoadModule { .. } => DebugEventKind::LoadModule,
            DebugEvent::UnloadModule { .. } => DebugEventKind::UnloadModule,
            DebugEvent::LoadClass { .. } => DebugEventKind::LoadClass,
            DebugEvent::UnloadClass { .. } => DebugEventKind::UnloadClass,
            DebugEvent::CreateThread { .. } => DebugEventKind::CreateThread,
            DebugEvent::ExitThread { .. } => DebugEventKind::ExitThread,
            DebugEvent::Breakpoint { .. } => DebugEventKind::Breakpoint,
            DebugEvent::StepComplete { .. } => DebugEventKind::StepComplete,
            DebugEvent::Break { .. } => DebugEventKind::Break,
            DebugEvent::Exception { .. } => DebugEventKind::Exception,
            DebugEvent::EvalComplete { .. } => DebugEventKind::EvalComplete,
            DebugEvent::EvalException { .. } => DebugEventKind::EvalException,
            DebugEvent::NameChange { .. } => DebugEventKind::NameChange,
            DebugEvent::UpdateModuleSymbols { .. } => DebugEventKind::UpdateModuleSymbols,
            DebugEvent::MdaNotification { .. } => DebugEventKind::MdaNotification,
            DebugEvent::ControlCTrap => DebugEventKind::ControlCTrap,
            DebugEvent::LogMessage { .. } => DebugEventKind::LogMessage,
            DebugEvent::BreakpointSetError { .. } => DebugEventKind::BreakpointSetError,
        }
    }
}
