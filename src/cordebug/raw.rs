//! The native debugging ABI seam.
//!
//! These traits mirror the observable surface of the COM debugging
//! interfaces (`ICorDebug`, `ICorDebugProcess`, `ICorDebugModule`, ...)
//! one trait per interface, one method per call the engine makes. An
//! implementation owns the actual FFI: it issues the call, checks the
//! status code and maps a failing one to `Err(Hr)`. Callers above the
//! seam never see out-params or raw pointers, only owned data and
//! [`NativeHandle`]s.
//!
//! Every trait is `Send + Sync` so handles can be stored and dropped
//! from any thread. That is a storage guarantee, not a concurrency one:
//! all calls through the seam happen serially on the session's callback
//! thread.
//!
//! String buffers come back as UTF-16 code units without the
//! terminating NUL; the wrappers convert lossily.

use std::sync::Arc;

use crate::{
    cordebug::handle::NativeHandle,
    metadata::import::MetadataImport,
    Error,
};

/// An HRESULT-style status code from a failed native call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hr(pub i32);

impl Hr {
    /// Generic failure, `E_FAIL`.
    pub const FAIL: Hr = Hr(0x8000_4005_u32 as i32);
    /// Invalid argument, `E_INVALIDARG`.
    pub const INVALID_ARG: Hr = Hr(0x8007_0057_u32 as i32);

    /// Whether the code is a failure code (high bit set).
    #[must_use]
    pub fn is_error(self) -> bool {
        self.0 < 0
    }
}

impl std::fmt::Display for Hr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#010X}", self.0 as u32)
    }
}

impl From<Hr> for Error {
    fn from(hr: Hr) -> Self {
        Error::NativeCall(hr.0)
    }
}

/// Result of a native call.
pub type RawResult<T> = std::result::Result<T, Hr>;

/// Launch parameters for a new debuggee process.
#[derive(Debug, Clone, Default)]
pub struct ProcessLaunch {
    /// Path of the executable
    pub filename: String,
    /// Command line, the executable path is prepended when absent
    pub cmdline: Option<String>,
    /// Working directory of the debuggee
    pub current_dir: Option<String>,
}

/// Top-level debugging services: process creation, attach and the
/// process scan used to offer attach targets.
pub trait RawCorDebug: Send + Sync {
    /// Launches a process under the debugger.
    fn create_process(&self, launch: &ProcessLaunch) -> RawResult<NativeHandle<dyn RawProcess>>;

    /// Attaches to a running process.
    fn attach(&self, pid: u32) -> RawResult<NativeHandle<dyn RawProcess>>;

    /// Shuts the debugging services down.
    fn terminate(&self) -> RawResult<()>;

    /// Ids of all candidate processes on the machine.
    fn process_ids(&self) -> RawResult<Vec<u32>>;

    /// Executable name of a candidate process.
    fn process_name(&self, pid: u32) -> RawResult<Vec<u16>>;

    /// Whether the process has the runtime loaded and can be attached.
    fn is_managed(&self, pid: u32) -> RawResult<bool>;
}

/// A debuggee process.
pub trait RawProcess: Send + Sync {
    /// OS process id of the debuggee.
    fn pid(&self) -> RawResult<u32>;

    /// COFF machine type of the debuggee image.
    fn machine(&self) -> RawResult<u16>;

    /// Synchronizes the process (logical pause).
    fn stop(&self) -> RawResult<()>;

    /// Resumes from a synchronized state. `outside_of_controller` is
    /// forwarded to the native continue call.
    fn continue_run(&self, outside_of_controller: bool) -> RawResult<()>;

    /// Kills the debuggee with the given exit code.
    fn terminate(&self, exit_code: u32) -> RawResult<()>;

    /// Detaches the debugger, leaving the debuggee running.
    fn detach(&self) -> RawResult<()>;

    /// All managed threads of the debuggee.
    fn threads(&self) -> RawResult<Vec<NativeHandle<dyn RawThread>>>;

    /// All application domains of the debuggee.
    fn app_domains(&self) -> RawResult<Vec<NativeHandle<dyn RawAppDomain>>>;
}

/// An application domain inside the debuggee.
pub trait RawAppDomain: Send + Sync {
    /// Runtime-assigned id of the domain.
    fn id(&self) -> RawResult<u32>;

    /// Friendly name of the domain.
    fn name(&self) -> RawResult<Vec<u16>>;

    /// Assemblies loaded into the domain.
    fn assemblies(&self) -> RawResult<Vec<NativeHandle<dyn RawAssembly>>>;
}

/// A loaded assembly.
pub trait RawAssembly: Send + Sync {
    /// Full path of the assembly, empty for in-memory assemblies.
    fn name(&self) -> RawResult<Vec<u16>>;

    /// Member modules of the assembly.
    fn modules(&self) -> RawResult<Vec<NativeHandle<dyn RawModule>>>;

    /// The domain the assembly is loaded into.
    fn app_domain(&self) -> RawResult<NativeHandle<dyn RawAppDomain>>;
}

/// A loaded module.
pub trait RawModule: Send + Sync {
    /// Full path, or the metadata name for dynamic/in-memory modules.
    fn name(&self) -> RawResult<Vec<u16>>;

    /// Base address of the mapped image, 0 for dynamic modules.
    fn base_address(&self) -> RawResult<u64>;

    /// Mapped size of the image in bytes.
    fn size(&self) -> RawResult<u32>;

    /// Module metadata token.
    fn token(&self) -> RawResult<u32>;

    /// Whether types can be added to the module at runtime.
    fn is_dynamic(&self) -> RawResult<bool>;

    /// Whether the module was loaded from memory, not from a file.
    fn is_in_memory(&self) -> RawResult<bool>;

    /// The owning assembly.
    fn assembly(&self) -> RawResult<NativeHandle<dyn RawAssembly>>;

    /// The module's metadata import interface.
    fn metadata_import(&self) -> RawResult<Arc<dyn MetadataImport>>;

    /// Resolves a `MethodDef` token into a function.
    fn function_from_token(&self, token: u32) -> RawResult<NativeHandle<dyn RawFunction>>;

    /// Resolves a `TypeDef` token into a class.
    fn class_from_token(&self, token: u32) -> RawResult<NativeHandle<dyn RawClass>>;

    /// Turns LoadClass/UnloadClass callbacks for this module on or off.
    fn enable_class_load_callbacks(&self, enable: bool) -> RawResult<()>;

    /// Sets the JIT compiler flags used for code compiled from now on.
    fn set_jit_compiler_flags(&self, flags: u32) -> RawResult<()>;
}

/// An uninstantiated class.
pub trait RawClass: Send + Sync {
    /// `TypeDef` token of the class.
    fn token(&self) -> RawResult<u32>;

    /// The declaring module.
    fn module(&self) -> RawResult<NativeHandle<dyn RawModule>>;

    /// Instantiates the class into a type. `element_type` is `CLASS` or
    /// `VALUETYPE`; `type_args` supplies the generic arguments.
    fn parameterized_type(
        &self,
        element_type: u8,
        type_args: &[NativeHandle<dyn RawType>],
    ) -> RawResult<NativeHandle<dyn RawType>>;
}

/// A managed function.
pub trait RawFunction: Send + Sync {
    /// `MethodDef` token of the function.
    fn token(&self) -> RawResult<u32>;

    /// The declaring module.
    fn module(&self) -> RawResult<NativeHandle<dyn RawModule>>;

    /// The declaring class.
    fn class(&self) -> RawResult<NativeHandle<dyn RawClass>>;

    /// Plants a breakpoint at an IL offset in this function.
    fn create_breakpoint(&self, il_offset: u32) -> RawResult<NativeHandle<dyn RawCodeBreakpoint>>;

    /// Plants a breakpoint at a native offset in this function's jitted
    /// code.
    fn create_native_breakpoint(
        &self,
        offset: u32,
    ) -> RawResult<NativeHandle<dyn RawCodeBreakpoint>>;
}

/// An instantiated type.
pub trait RawType: Send + Sync {
    /// `ELEMENT_TYPE` of the type.
    fn element_type(&self) -> RawResult<u8>;

    /// Array rank; zero for non-arrays.
    fn rank(&self) -> RawResult<u32>;

    /// First generic argument, or the element type of an array.
    fn first_type_parameter(&self) -> RawResult<NativeHandle<dyn RawType>>;

    /// All generic arguments of the type.
    fn type_parameters(&self) -> RawResult<Vec<NativeHandle<dyn RawType>>>;

    /// The class behind the type, for class and value types.
    fn class(&self) -> RawResult<NativeHandle<dyn RawClass>>;

    /// Base type. `Ok(None)` is a successful call reporting no base,
    /// the way `System.Object` and interfaces answer.
    fn base(&self) -> RawResult<Option<NativeHandle<dyn RawType>>>;
}

/// A value in the debuggee.
///
/// The `is_*` capability checks report which interfaces the value
/// object implements. That is a property of the object itself, not of
/// the debuggee's state, so they answer plainly instead of through
/// [`RawResult`].
pub trait RawValue: Send + Sync {
    /// `ELEMENT_TYPE` of the value.
    fn element_type(&self) -> RawResult<u8>;

    /// Size of the value's data in bytes.
    fn size(&self) -> RawResult<u64>;

    /// Address of the value in the debuggee.
    fn address(&self) -> RawResult<u64>;

    /// Whether the value is a reference.
    fn is_reference(&self) -> bool;

    /// Whether the value is a boxed value type.
    fn is_box(&self) -> bool;

    /// Whether the value is a string.
    fn is_string(&self) -> bool;

    /// Whether the value is an array.
    fn is_array(&self) -> bool;

    /// Whether a reference value is null.
    fn is_null(&self) -> RawResult<bool>;

    /// Target address of a reference value.
    fn reference_address(&self) -> RawResult<u64>;

    /// The value a reference points at.
    fn dereference(&self) -> RawResult<NativeHandle<dyn RawValue>>;

    /// The value type inside a box.
    fn boxed_value(&self) -> RawResult<NativeHandle<dyn RawValue>>;

    /// Content of a string value.
    fn string_value(&self) -> RawResult<Vec<u16>>;

    /// Exact runtime type of the value.
    fn exact_type(&self) -> RawResult<NativeHandle<dyn RawType>>;

    /// Raw bytes of a generic (primitive or value-type) value.
    fn read_bytes(&self) -> RawResult<Vec<u8>>;

    /// A field of an object or value-type value.
    fn field_value(
        &self,
        class: &NativeHandle<dyn RawClass>,
        field_token: u32,
    ) -> RawResult<NativeHandle<dyn RawValue>>;
}

/// A debuggee thread.
pub trait RawThread: Send + Sync {
    /// OS thread id.
    fn id(&self) -> RawResult<u32>;

    /// `CorDebugUserState` bits.
    fn user_state(&self) -> RawResult<u32>;

    /// The domain the thread is currently executing in.
    fn app_domain(&self) -> RawResult<NativeHandle<dyn RawAppDomain>>;

    /// Topmost frame, `Ok(None)` when the thread has no managed frame.
    fn active_frame(&self) -> RawResult<Option<NativeHandle<dyn RawFrame>>>;

    /// Creates a stepper bound to this thread.
    fn create_stepper(&self) -> RawResult<NativeHandle<dyn RawStepper>>;

    /// Creates a function evaluation bound to this thread.
    fn create_eval(&self) -> RawResult<NativeHandle<dyn RawEval>>;
}

/// A stack frame.
pub trait RawFrame: Send + Sync {
    /// `MethodDef` token of the frame's function.
    fn function_token(&self) -> RawResult<u32>;

    /// The frame's function.
    fn function(&self) -> RawResult<NativeHandle<dyn RawFunction>>;

    /// IL instruction pointer: offset and mapping result.
    fn ip(&self) -> RawResult<(u32, u32)>;

    /// Local variables of the frame, slot order.
    fn locals(&self) -> RawResult<Vec<NativeHandle<dyn RawValue>>>;

    /// Arguments of the frame, signature order.
    fn arguments(&self) -> RawResult<Vec<NativeHandle<dyn RawValue>>>;
}

/// A stepper bound to one thread.
pub trait RawStepper: Send + Sync {
    /// Steps into (`step_into` true) or over the current line.
    fn step(&self, step_into: bool) -> RawResult<()>;

    /// Runs until the current frame returns.
    fn step_out(&self) -> RawResult<()>;

    /// Whether a step is in flight.
    fn is_active(&self) -> RawResult<bool>;

    /// Abandons an in-flight step.
    fn deactivate(&self) -> RawResult<()>;
}

/// A function evaluation bound to one thread.
pub trait RawEval: Send + Sync {
    /// Schedules a call; completion arrives as an EvalComplete or
    /// EvalException callback.
    fn call_function(
        &self,
        function: &NativeHandle<dyn RawFunction>,
        args: &[NativeHandle<dyn RawValue>],
    ) -> RawResult<()>;

    /// Aborts an in-flight evaluation.
    fn abort(&self) -> RawResult<()>;

    /// Result of a completed evaluation.
    fn result(&self) -> RawResult<Option<NativeHandle<dyn RawValue>>>;
}

/// A planted code breakpoint.
pub trait RawCodeBreakpoint: Send + Sync {
    /// Arms or disarms the breakpoint.
    fn activate(&self, active: bool) -> RawResult<()>;

    /// Whether the breakpoint is armed.
    fn is_active(&self) -> RawResult<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hr_error_bit() {
        assert!(Hr::FAIL.is_error());
        assert!(Hr::INVALID_ARG.is_error());
        assert!(!Hr(0).is_error());
        assert!(!Hr(1).is_error());
    }

    #[test]
    fn test_hr_display_and_conversion() {
        assert_eq!(Hr::FAIL.to_string(), "0x80004005");

        let err: Error = Hr::FAIL.into();
        assert!(matches!(err, Error::NativeCall(code) if code == Hr::FAIL.0));
    }
}
