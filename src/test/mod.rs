pub(crate) mod debuggee;
mod metadata;

pub use metadata::*;
