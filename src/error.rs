use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// This enum covers all possible error conditions that can occur while driving a debug
/// session, parsing on-disk images, or walking debuggee metadata. Each variant provides
/// specific context about the failure mode to enable appropriate error handling.
///
/// Transient native failures (a module that unloaded between two calls, a value that is no
/// longer readable) are deliberately **not** errors: wrapper accessors swallow them into
/// `None`. Only malformed input data and contract violations at the public engine surface
/// are reported through this type.
///
/// # Error Categories
///
/// ## File And Metadata Parsing
/// - [`Error::InvalidOffset`] - Invalid file offset during parsing
/// - [`Error::Malformed`] - Corrupted or invalid file structure
/// - [`Error::OutOfBounds`] - Attempted to read beyond buffer boundaries
/// - [`Error::NotSupported`] - Unsupported file format or feature
/// - [`Error::Empty`] - Empty input provided
///
/// ## I/O and External Errors
/// - [`Error::FileError`] - Filesystem I/O errors
/// - [`Error::GoblinErr`] - PE parsing errors from the goblin crate
///
/// ## Debug Session Errors
/// - [`Error::NativeCall`] - A native debugging call failed where failure cannot be recovered
/// - [`Error::NotPaused`] - Operation requires a synchronized (paused) debuggee
/// - [`Error::Terminated`] - The debug session has already terminated
/// - [`Error::InvalidArgument`] - Caller contract violation at a public entry point
///
/// ## Safety Limits
/// - [`Error::RecursionLimit`] - Maximum chain-walk depth exceeded
/// - [`Error::LockError`] - Thread synchronization failure
///
/// # Examples
///
/// ```rust
/// use dotprobe::{file::entry_point_token, Error};
/// use std::path::Path;
///
/// match entry_point_token(Path::new("missing.exe")) {
///     Ok(ep) => println!("entry point: {}", ep.token),
///     Err(Error::FileError(io_err)) => eprintln!("I/O error: {}", io_err),
///     Err(Error::Malformed { message, file, line }) => {
///         eprintln!("Malformed image: {} ({}:{})", message, file, line);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    // File parsing Errors
    /// Encountered an invalid offset while parsing file structures.
    ///
    /// This error occurs when the parser encounters an offset that is invalid
    /// for the current file context, such as an RVA that no section maps or an
    /// offset that would point outside the valid file structure.
    #[error("Could not retrieve a valid offset!")]
    InvalidOffset,

    /// The input data is damaged and could not be parsed.
    ///
    /// This error indicates that a PE image, metadata stream, or signature blob
    /// doesn't conform to the expected format. The error includes the source
    /// location where the malformation was detected for debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing data.
    ///
    /// This error occurs when trying to read beyond the end of a file, stream,
    /// or signature blob. It's a safety check to prevent buffer overruns.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// This file type is not supported.
    ///
    /// Indicates that the input file is not a supported PE executable, or uses
    /// features that are not implemented in this library.
    #[error("This file type is not supported")]
    NotSupported,

    /// Provided input was empty.
    ///
    /// This error occurs when an empty file or buffer is provided where actual
    /// image data was expected.
    #[error("Provided input was empty")]
    Empty,

    /// File I/O error.
    ///
    /// Wraps standard I/O errors that can occur during file operations
    /// such as reading from disk, permission issues, or filesystem errors.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Generic error for miscellaneous failures.
    ///
    /// Used for errors that don't fit into other categories or for
    /// wrapping external failures with additional context.
    #[error("{0}")]
    Error(String),

    /// Error from the goblin crate during PE parsing.
    ///
    /// The goblin crate is used for low-level PE format parsing.
    /// This error wraps any failures from that parsing layer.
    #[error("{0}")]
    GoblinErr(#[from] goblin::error::Error),

    /// A native debugging call failed and the failure cannot be degraded.
    ///
    /// Most native failures are swallowed into `None` by the wrapper layer.
    /// This variant is reserved for calls whose failure leaves the session
    /// unusable, such as creating or attaching to the debuggee process.
    ///
    /// The associated value is the HRESULT-style status code.
    #[error("Native debugging call failed - {0:#010X}")]
    NativeCall(i32),

    /// The debuggee is not in a synchronized (paused) state.
    ///
    /// Metadata and value reads touch live native state and are only defined
    /// while the debuggee is paused. Callers must pause (or wait for a pause
    /// event) before issuing them.
    #[error("The debuggee is not paused")]
    NotPaused,

    /// The debug session has terminated.
    ///
    /// Returned when continuing, pausing, or registering breakpoints against a
    /// session whose process has already exited or been terminated.
    #[error("The debug session has terminated")]
    Terminated,

    /// A caller contract violation at a public engine entry point.
    ///
    /// These indicate programmer errors (a zero token where a method token is
    /// required, an empty debuggee path), not runtime conditions, and fail
    /// immediately.
    #[error("Invalid argument - {0}")]
    InvalidArgument(&'static str),

    /// Chain-walk limit reached.
    ///
    /// Base-type chains and nested-type chains in adversarial images can be
    /// cyclic. All chain walks are bounded; this error indicates the bound was
    /// exceeded.
    ///
    /// The associated value shows the limit that was reached.
    #[error("Reach the maximum walk depth allowed - {0}")]
    RecursionLimit(usize),

    /// Failed to lock target.
    ///
    /// This error occurs when thread synchronization fails, typically
    /// when trying to acquire a mutex or rwlock that is in an invalid state.
    #[error("Failed to lock target")]
    LockError,
}
