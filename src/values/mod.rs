//! Typed value reading from the debuggee.
//!
//! Raw value handles only answer low-level questions: what element type,
//! how many bytes, is it a reference. [`reader::read_simple_type_value`]
//! turns that into a [`result::ValueResult`] by walking the fixed
//! dereference/unbox ladder and decoding the final byte buffer against
//! the value's exact type — including the composite layouts the runtime
//! never exposes directly ([`decimal::Decimal`], [`datetime::DateTime`],
//! `System.Nullable<T>`).
//!
//! Only safe to call while the debuggee is paused; the engine guards
//! that before handing out values.

pub mod datetime;
pub mod decimal;
pub mod reader;
pub mod result;

pub use datetime::{DateTime, DateTimeKind};
pub use decimal::Decimal;
pub use reader::read_simple_type_value;
pub use result::{DnValue, ValueResult};
