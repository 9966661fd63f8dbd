//! On-disk image access.
//!
//! Everything in this module works on bytes that came from disk, never from
//! the debuggee's address space. It provides the low-level reading
//! primitives shared by the metadata parsers and the entry point resolver
//! that inspects an executable before the runtime has loaded it.
//!
//! # Key Components
//!
//! - [`crate::file::io`] - Endian-aware primitive reads over byte slices
//! - [`crate::file::Parser`] - Sequential cursor with compressed-integer
//!   support for metadata and signature blobs
//! - [`crate::file::entry_point_token`] - Resolves the managed entry point
//!   of an executable on disk, following `File` table forwarding
//!
//! # Usage Examples
//!
//! ```rust,no_run
//! use dotprobe::file::entry_point_token;
//! use std::path::Path;
//!
//! let ep = entry_point_token(Path::new("app.exe"))?;
//! if let Some(other) = &ep.other_module {
//!     println!("entry point {} lives in {}", ep.token, other);
//! } else if !ep.is_none() {
//!     println!("entry point: {}", ep.token);
//! }
//! # Ok::<(), dotprobe::Error>(())
//! ```

pub mod io;
pub mod parser;

mod entrypoint;

pub use entrypoint::{entry_point_from_bytes, entry_point_token, EntryPoint};
pub use parser::Parser;
