//! The result of reading a value from the debuggee.

use crate::{
    metadata::signature::ELEMENT_TYPE,
    values::{datetime::DateTime, decimal::Decimal},
};

/// A simple value read out of the debuggee.
///
/// `Char` carries the raw UTF-16 code unit: the debuggee can hold a
/// lone surrogate in a `char` field and the debugger must show it, not
/// reject it. `IntPtr`/`UIntPtr` are stored at full width regardless of
/// the debuggee's pointer size; the reader only constructs them from
/// buffers of the debuggee's exact width.
#[derive(Debug, Clone, PartialEq)]
pub enum DnValue {
    /// A null reference
    Null,
    /// `System.Boolean`
    Boolean(bool),
    /// `System.Char`, one UTF-16 code unit
    Char(u16),
    /// `System.SByte`
    I1(i8),
    /// `System.Byte`
    U1(u8),
    /// `System.Int16`
    I2(i16),
    /// `System.UInt16`
    U2(u16),
    /// `System.Int32`
    I4(i32),
    /// `System.UInt32`
    U4(u32),
    /// `System.Int64`
    I8(i64),
    /// `System.UInt64`
    U8(u64),
    /// `System.Single`
    R4(f32),
    /// `System.Double`
    R8(f64),
    /// `System.IntPtr`
    IntPtr(i64),
    /// `System.UIntPtr`
    UIntPtr(u64),
    /// `System.Decimal`
    Decimal(Decimal),
    /// `System.DateTime`
    DateTime(DateTime),
    /// `System.String`
    String(String),
}

/// Outcome of a value read. The invalid case carries nothing: an
/// unreadable value has no value to misuse.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueResult {
    /// The value could not be read or decoded
    Invalid,
    /// The value, successfully read
    Valid(DnValue),
}

impl ValueResult {
    /// Whether the read produced a value.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, ValueResult::Valid(_))
    }

    /// The value, `None` for invalid results.
    #[must_use]
    pub fn value(&self) -> Option<&DnValue> {
        match self {
            ValueResult::Valid(value) => Some(value),
            ValueResult::Invalid => None,
        }
    }
}

impl std::fmt::Display for ValueResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueResult::Invalid => write!(f, "<invalid>"),
            ValueResult::Valid(DnValue::Null) => write!(f, "null"),
            ValueResult::Valid(DnValue::Boolean(v)) => write!(f, "{v}"),
            ValueResult::Valid(DnValue::Char(v)) => {
                match char::from_u32(u32::from(*v)) {
                    Some(c) => write!(f, "'{c}'"),
                    None => write!(f, "'\\u{v:04X}'"),
                }
            }
            ValueResult::Valid(DnValue::I1(v)) => write!(f, "{v}"),
            ValueResult::Valid(DnValue::U1(v)) => write!(f, "{v}"),
            ValueResult::Valid(DnValue::I2(v)) => write!(f, "{v}"),
            ValueResult::Valid(DnValue::U2(v)) => write!(f, "{v}"),
            ValueResult::Valid(DnValue::I4(v)) => write!(f, "{v}"),
            ValueResult::Valid(DnValue::U4(v)) => write!(f, "{v}"),
            ValueResult::Valid(DnValue::I8(v)) => write!(f, "{v}"),
            ValueResult::Valid(DnValue::U8(v)) => write!(f, "{v}"),
            ValueResult::Valid(DnValue::R4(v)) => write!(f, "{v}"),
            ValueResult::Valid(DnValue::R8(v)) => write!(f, "{v}"),
            ValueResult::Valid(DnValue::IntPtr(v)) => write!(f, "{v:#X}"),
            ValueResult::Valid(DnValue::UIntPtr(v)) => write!(f, "{v:#X}"),
            ValueResult::Valid(DnValue::Decimal(v)) => write!(f, "{v}"),
            ValueResult::Valid(DnValue::DateTime(v)) => write!(f, "{v}"),
            ValueResult::Valid(DnValue::String(v)) => write!(f, "\"{v}\""),
        }
    }
}

/// Expected byte width of a primitive element type, `None` for tags
/// that are not fixed-width primitives. `I`, `U`, `Ptr` and `FnPtr` are
/// sized by the debuggee's pointer width.
#[must_use]
pub fn expected_width(element_type: u8, ptr_size: u32) -> Option<u64> {
    match element_type {
        ELEMENT_TYPE::BOOLEAN | ELEMENT_TYPE::I1 | ELEMENT_TYPE::U1 => Some(1),
        ELEMENT_TYPE::CHAR | ELEMENT_TYPE::I2 | ELEMENT_TYPE::U2 => Some(2),
        ELEMENT_TYPE::I4 | ELEMENT_TYPE::U4 | ELEMENT_TYPE::R4 => Some(4),
        ELEMENT_TYPE::I8 | ELEMENT_TYPE::U8 | ELEMENT_TYPE::R8 => Some(8),
        ELEMENT_TYPE::I | ELEMENT_TYPE::U | ELEMENT_TYPE::PTR | ELEMENT_TYPE::FNPTR => {
            Some(u64::from(ptr_size))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_has_no_value() {
        let result = ValueResult::Invalid;
        assert!(!result.is_valid());
        assert_eq!(result.value(), None);
        assert_eq!(result.to_string(), "<invalid>");
    }

    #[test]
    fn test_valid_null() {
        let result = ValueResult::Valid(DnValue::Null);
        assert!(result.is_valid());
        assert_eq!(result.value(), Some(&DnValue::Null));
        assert_eq!(result.to_string(), "null");
    }

    #[test]
    fn test_expected_widths() {
        assert_eq!(expected_width(ELEMENT_TYPE::BOOLEAN, 8), Some(1));
        assert_eq!(expected_width(ELEMENT_TYPE::CHAR, 8), Some(2));
        assert_eq!(expected_width(ELEMENT_TYPE::R8, 4), Some(8));
        assert_eq!(expected_width(ELEMENT_TYPE::I, 4), Some(4));
        assert_eq!(expected_width(ELEMENT_TYPE::PTR, 8), Some(8));
        assert_eq!(expected_width(ELEMENT_TYPE::STRING, 8), None);
        assert_eq!(expected_width(ELEMENT_TYPE::VALUETYPE, 8), None);
    }

    #[test]
    fn test_char_display_handles_surrogates() {
        assert_eq!(ValueResult::Valid(DnValue::Char(b'A'.into())).to_string(), "'A'");
        assert_eq!(ValueResult::Valid(DnValue::Char(0xD800)).to_string(), "'\\uD800'");
    }
}
