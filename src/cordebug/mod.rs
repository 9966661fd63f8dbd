//! Wrappers over the native debugging interfaces.
//!
//! The debuggee's runtime exposes itself through a family of COM-style
//! interfaces. [`raw`] models that ABI as object-safe traits returning
//! [`raw::RawResult`]; everything else in this module wraps one such
//! interface in an owning [`handle::NativeHandle`] and turns its calls
//! into plain Rust accessors.
//!
//! Two rules hold for every wrapper:
//!
//! - Identity is the underlying interface pointer. Two wrappers compare
//!   and hash equal exactly when they wrap the same native object, no
//!   matter how they were obtained.
//! - Accessors re-query the native interface on every call and map any
//!   failing status to `None`. A module can unload or a value can become
//!   unreadable between two calls while stepping; that is not an error,
//!   it is debugging.
//!
//! The few scalars cached at construction (module name and address,
//! type element-type and rank) are the ones the native objects
//! themselves guarantee stable for their lifetime.

use widestring::U16Str;

pub mod handle;
pub mod raw;

mod appdomain;
mod assembly;
mod breakpoint;
mod class;
mod eval;
mod frame;
mod function;
mod module;
mod process;
mod stepper;
mod thread;
mod types;
mod value;

pub use appdomain::CorAppDomain;
pub use assembly::CorAssembly;
pub use breakpoint::CorCodeBreakpoint;
pub use class::CorClass;
pub use eval::CorEval;
pub use frame::CorFrame;
pub use function::CorFunction;
pub use handle::NativeHandle;
pub use module::{CorModule, DnModuleId};
pub use process::CorProcess;
pub use raw::{Hr, ProcessLaunch, RawResult};
pub use stepper::CorStepper;
pub use thread::CorThread;
pub use types::CorType;
pub use value::CorValue;

/// Upper bound on base-type chain walks. Valid type hierarchies are a
/// handful of links deep; a chain longer than this is a cycle planted
/// in a hostile image and the walk gives up as if the chain had ended.
pub(crate) const MAX_BASE_WALK: usize = 1000;

/// Decodes a native UTF-16 name buffer, replacing unpaired surrogates.
pub(crate) fn decode_name(units: Vec<u16>) -> String {
    U16Str::from_slice(&units).to_string_lossy()
}
