//! # dotprobe Prelude
//!
//! A convenient prelude for the most commonly used types of the library.
//! Import this module to get quick access to the essential session,
//! breakpoint and value types.

/// The main error type for all dotprobe operations
pub use crate::Error;

/// The result type used throughout dotprobe
pub use crate::Result;

/// The debugging session and its configuration
pub use crate::engine::{
    AttachProcessOptions, DebugOptions, DebugProcessOptions, Debugger, DebuggerProcessState,
};

/// Debug events and the startup sequencer
pub use crate::engine::{BreakProcessKind, DebugEvent, DebugEventKind};

/// Breakpoints and their conditions
pub use crate::engine::{BreakpointCondition, BreakpointId, BreakpointKind, ConditionContext};

/// Why the debuggee is paused
pub use crate::engine::{PauseReason, PauseState, USER_REASON_BASE};

/// The attach scan
pub use crate::engine::{attachable_processes, AttachableProcess, CancellationToken};

/// Wrappers over the native debugging objects
pub use crate::cordebug::{
    CorAppDomain, CorAssembly, CorClass, CorCodeBreakpoint, CorEval, CorFrame, CorFunction,
    CorModule, CorProcess, CorStepper, CorThread, CorType, CorValue, DnModuleId, NativeHandle,
};

/// Typed value reading
pub use crate::values::{read_simple_type_value, DateTime, DateTimeKind, Decimal, DnValue, ValueResult};

/// Metadata tokens
pub use crate::metadata::token::{TableId, Token};

/// The live metadata seam
pub use crate::metadata::import::MetadataImport;

/// On-disk entry-point resolution
pub use crate::file::{entry_point_token, EntryPoint};
