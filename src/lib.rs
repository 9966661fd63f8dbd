// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(dead_code)]
#![allow(clippy::too_many_arguments)]
//#![deny(unsafe_code)]
// - 'file/entrypoint.rs' uses mmap to map an image into memory

//! # dotprobe
//!
//! A CorDebug-style debugging engine for live .NET processes. `dotprobe`
//! wraps the runtime's COM-style debugging interfaces behind safe Rust
//! types and builds a full session model on top: launching or attaching
//! to a debuggee, sequencing startup breakpoints down to the managed
//! entry point, registering event/IL/native breakpoints with arbitrary
//! conditions, and reading metadata and typed values while the debuggee
//! is paused.
//!
//! ## Architecture
//!
//! - [`cordebug`] - Wrappers over the native debugging interfaces. The
//!   ABI itself is modeled as object-safe traits in [`cordebug::raw`];
//!   everything above works against those traits, so the engine is
//!   testable without a runtime.
//! - [`metadata`] - ECMA-335 metadata access, both the live
//!   IMetaDataImport-style seam of a debuggee module and the physical
//!   metadata of an image on disk.
//! - [`values`] - Typed value reading: dereference/unbox ladder,
//!   primitives, strings, enums, `System.Decimal`, `System.DateTime`
//!   and `System.Nullable<T>`.
//! - [`engine`] - The session: debug-event dispatch, the breakpoint
//!   table, pause states and the startup sequencer.
//! - [`file`] - On-disk image access, including the managed entry-point
//!   resolver the sequencer uses before anything has loaded.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dotprobe::prelude::*;
//!
//! # fn native_services() -> dotprobe::cordebug::NativeHandle<dyn dotprobe::cordebug::raw::RawCorDebug> { unimplemented!() }
//! let debugger = Debugger::create_process(
//!     native_services(),
//!     DebugProcessOptions {
//!         filename: "C:\\Apps\\Main.exe".into(),
//!         break_kind: BreakProcessKind::EntryPoint,
//!         ..Default::default()
//!     },
//! )?;
//!
//! // The embedder feeds native callbacks in as debug events; the engine
//! // answers each one by pausing or continuing the debuggee.
//! # let event: DebugEvent = unimplemented!();
//! debugger.process_event(event)?;
//! if debugger.is_paused() {
//!     for state in debugger.pause_states() {
//!         println!("paused: {}", state.reason());
//!     }
//! }
//! # Ok::<(), dotprobe::Error>(())
//! ```
//!
//! ## Error Handling
//!
//! Fallible operations return [`Result<T, Error>`](Result). The engine
//! draws a sharp line between contract violations and runtime noise:
//! calling a paused-only operation on a running debuggee is an
//! [`Error::NotPaused`], while a native query failing mid-session is
//! ordinary debugging and reads as `None` or
//! [`ValueResult::Invalid`](values::ValueResult::Invalid).

#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit- and integration-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
pub mod prelude;

/// Wrappers over the native COM-style debugging interfaces
pub mod cordebug;

/// The debugging session: event dispatch, breakpoints, pause states
pub mod engine;

/// On-disk image access and managed entry-point resolution
pub mod file;

/// ECMA-335 metadata access, live and on-disk
pub mod metadata;

/// Typed value reading from a paused debuggee
pub mod values;

/// `dotprobe` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type
/// is always [`Error`]. Used consistently throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// `dotprobe` Error type
///
/// The main error type for all operations in this crate: native call
/// failures, session-state contract violations and malformed on-disk
/// metadata.
pub use error::Error;

/// Main entry point for debugging a .NET process.
///
/// See [`engine::Debugger`] for launching, attaching, breakpoints and the
/// pause/continue model.
pub use engine::Debugger;
