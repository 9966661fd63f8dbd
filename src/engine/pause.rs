//! Why the debuggee is paused.
//!
//! Every logical pause pushes one [`PauseState`]; the debugger can hold
//! several at once when a single callback satisfies several reasons. The
//! set is a closed sum type so a consumer matching on it handles every
//! reason the engine can produce; user-defined reasons go through the
//! single [`PauseState::Other`] escape hatch above a reserved base.

use strum::{Display, EnumIter};

use crate::{
    cordebug::{CorAppDomain, CorThread},
    engine::breakpoints::BreakpointId,
    Error, Result,
};

/// Lowest reason value available to [`PauseState::Other`]. Values below
/// the base are reserved for the engine's own reasons.
pub const USER_REASON_BASE: u32 = 0x1000_0000;

/// The reason of a [`PauseState`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum PauseReason {
    /// An exception nothing in the debuggee will handle
    UnhandledException,
    /// A first-chance exception
    Exception,
    /// A breakpoint on one debug event kind triggered
    DebugEventBreakpoint,
    /// An any-event breakpoint triggered
    AnyDebugEventBreakpoint,
    /// The debuggee executed a break instruction
    Break,
    /// An IL code breakpoint was hit
    IlCodeBreakpoint,
    /// A native code breakpoint was hit
    NativeCodeBreakpoint,
    /// The user asked the debugger to break
    UserBreak,
    /// A function evaluation finished
    Eval,
    /// The startup sequencer reached the entry point
    EntryPointBreakpoint,
    /// A user-defined reason
    Other,
}

/// One reason the debuggee is paused, with the payload that reason
/// carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PauseState {
    /// An exception nothing in the debuggee will handle
    UnhandledException,
    /// A first-chance exception
    Exception,
    /// A breakpoint on one debug event kind triggered
    DebugEventBreakpoint {
        /// The triggered breakpoint
        id: BreakpointId,
    },
    /// An any-event breakpoint triggered
    AnyDebugEventBreakpoint {
        /// The triggered breakpoint
        id: BreakpointId,
    },
    /// The debuggee executed a break instruction
    Break,
    /// An IL code breakpoint was hit
    IlCodeBreakpoint {
        /// The hit breakpoint
        id: BreakpointId,
        /// App domain of the hit
        app_domain: Option<CorAppDomain>,
        /// Thread that hit the breakpoint
        thread: Option<CorThread>,
    },
    /// A native code breakpoint was hit
    NativeCodeBreakpoint {
        /// The hit breakpoint
        id: BreakpointId,
        /// App domain of the hit
        app_domain: Option<CorAppDomain>,
        /// Thread that hit the breakpoint
        thread: Option<CorThread>,
    },
    /// The user asked the debugger to break
    UserBreak,
    /// A function evaluation finished
    Eval,
    /// The startup sequencer reached the entry point
    EntryPointBreakpoint {
        /// App domain the entry point ran in
        app_domain: Option<CorAppDomain>,
        /// Thread the entry point ran on
        thread: Option<CorThread>,
    },
    /// A user-defined reason
    Other {
        /// Reason value, at or above [`USER_REASON_BASE`]
        reason: u32,
    },
}

impl PauseState {
    /// A user-defined pause state.
    ///
    /// # Errors
    /// `reason` below [`USER_REASON_BASE`] is a caller error; the engine
    /// reasons are not constructible this way.
    pub fn other(reason: u32) -> Result<PauseState> {
        if reason < USER_REASON_BASE {
            return Err(Error::InvalidArgument("reason below USER_REASON_BASE"));
        }
        Ok(PauseState::Other { reason })
    }

    /// The reason of this pause state.
    #[must_use]
    pub fn reason(&self) -> PauseReason {
        match self {
            PauseState::UnhandledException => PauseReason::UnhandledException,
            PauseState::Exception => PauseReason::Exception,
            PauseState::DebugEventBreakpoint { .. } => PauseReason::DebugEventBreakpoint,
            PauseState::AnyDebugEventBreakpoint { .. } => PauseReason::AnyDebugEventBreakpoint,
            PauseState::Break => PauseReason::Break,
            PauseState::IlCodeBreakpoint { .. } => PauseReason::IlCodeBreakpoint,
            PauseState::NativeCodeBreakpoint { .. } => PauseReason::NativeCodeBreakpoint,
            PauseState::UserBreak => PauseReason::UserBreak,
            PauseState::Eval => PauseReason::Eval,
            PauseState::EntryPointBreakpoint { .. } => PauseReason::EntryPointBreakpoint,
            PauseState::Other { .. } => PauseReason::Other,
        }
    }
}
