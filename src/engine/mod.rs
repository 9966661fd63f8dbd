//! The debugging engine.
//!
//! Everything stateful about a session lives here: the [`Debugger`]
//! consuming debug events and deciding pause/continue, the breakpoint
//! table with its queued-effect conditions, the pause-state model, the
//! startup sequencer and the attach scan.
//!
//! The engine is callback-driven. The embedder translates native
//! callbacks into [`DebugEvent`]s and feeds them to
//! [`Debugger::process_event`]; the engine answers every one by either
//! synchronizing the process or continuing it.

mod breakpoints;
mod cancel;
mod debugger;
mod events;
mod pause;
mod startup;

pub use breakpoints::{BreakpointCondition, BreakpointId, BreakpointKind, ConditionContext};
pub use cancel::{attachable_processes, AttachableProcess, CancellationToken};
pub use debugger::{
    AttachProcessOptions, DebugOptions, DebugProcessOptions, Debugger, DebuggerProcessState,
};
pub use events::{DebugEvent, DebugEventKind};
pub use pause::{PauseReason, PauseState, USER_REASON_BASE};
pub use startup::BreakProcessKind;
