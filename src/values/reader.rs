//! The simple-value read algorithm.
//!
//! One fixed ladder turns any value handle into a [`ValueResult`]:
//! dereference a byref, dereference a reference (or read the address
//! for pointers), unbox, then decode what remains against the exact
//! type. Every rung can fail, and every failure means `Invalid` — the
//! caller renders "unavailable", never a wrong number.
//!
//! All widths are exact. A buffer whose length does not match the
//! element type's width is not reinterpreted or truncated; it is
//! invalid, because it means the debugger's idea of the type no longer
//! matches the debuggee's memory.

use crate::{
    cordebug::{CorType, CorValue},
    file::io::read_le,
    metadata::signature::ELEMENT_TYPE,
    values::{
        datetime::DateTime,
        decimal::Decimal,
        result::{expected_width, DnValue, ValueResult},
    },
};

/// Nullable values recurse into their inner value; a hostile debuggee
/// could nest them into a cycle.
const MAX_NESTING: u32 = 16;

/// Reads a simple value: a primitive, enum, string, decimal, date/time
/// or nullable, behind any combination of byref, reference and box.
///
/// `ptr_size` is the debuggee's pointer width in bytes (4 or 8), taken
/// from the debuggee's image machine type. Pointer-sized reads must
/// match the debuggee's architecture, not the debugger's.
#[must_use]
pub fn read_simple_type_value(value: Option<&CorValue>, ptr_size: u32) -> ValueResult {
    match value {
        Some(value) => read_value(value.clone(), ptr_size, MAX_NESTING),
        None => ValueResult::Invalid,
    }
}

fn read_value(mut value: CorValue, ptr_size: u32, depth: u32) -> ValueResult {
    if depth == 0 {
        return ValueResult::Invalid;
    }

    if value.is_reference() && value.element_type() == ELEMENT_TYPE::BYREF {
        if value.is_null() {
            return ValueResult::Valid(DnValue::Null);
        }
        match value.dereferenced_value() {
            Some(target) => value = target,
            None => return ValueResult::Invalid,
        }
    }
    if value.is_reference() {
        if value.is_null() {
            return ValueResult::Valid(DnValue::Null);
        }
        let element_type = value.element_type();
        if element_type == ELEMENT_TYPE::PTR || element_type == ELEMENT_TYPE::FNPTR {
            let address = value.reference_address().unwrap_or(0);
            if ptr_size == 4 {
                return ValueResult::Valid(DnValue::U4(address as u32));
            }
            return ValueResult::Valid(DnValue::U8(address));
        }
        match value.dereferenced_value() {
            Some(target) => value = target,
            None => return ValueResult::Invalid,
        }
    }
    if value.is_box() {
        match value.boxed_value() {
            Some(inner) => value = inner,
            None => return ValueResult::Invalid,
        }
    }
    if value.is_reference() || value.is_box() || value.is_array() {
        return ValueResult::Invalid;
    }
    if value.is_string() {
        return match value.string() {
            Some(text) => ValueResult::Valid(DnValue::String(text)),
            None => ValueResult::Valid(DnValue::Null),
        };
    }

    let Some(exact_type) = value.exact_type() else {
        return ValueResult::Invalid;
    };
    decode_typed(&value, &exact_type, ptr_size, depth).unwrap_or(ValueResult::Invalid)
}

fn decode_typed(
    value: &CorValue,
    exact_type: &CorType,
    ptr_size: u32,
    depth: u32,
) -> Option<ValueResult> {
    let primitive = exact_type.try_get_primitive_type();
    if let Some(result) = decode_tag(value, primitive, ptr_size, depth) {
        return Some(result);
    }
    if !exact_type.is_enum() {
        return None;
    }
    let underlying = exact_type.enum_underlying_type()?;
    decode_tag(value, underlying, ptr_size, depth)
}

fn decode_tag(value: &CorValue, etype: u8, ptr_size: u32, depth: u32) -> Option<ValueResult> {
    if etype == ELEMENT_TYPE::CLASS || etype == ELEMENT_TYPE::VALUETYPE {
        return decode_composite(value, ptr_size, depth);
    }

    let expected = expected_width(etype, ptr_size)?;
    if value.size() != Some(expected) {
        return None;
    }
    let data = value.read_generic_value()?;
    if data.len() as u64 != expected {
        return None;
    }

    let result = match etype {
        ELEMENT_TYPE::BOOLEAN => DnValue::Boolean(data[0] != 0),
        ELEMENT_TYPE::CHAR => DnValue::Char(read_le::<u16>(&data).ok()?),
        ELEMENT_TYPE::I1 => DnValue::I1(data[0] as i8),
        ELEMENT_TYPE::U1 => DnValue::U1(data[0]),
        ELEMENT_TYPE::I2 => DnValue::I2(read_le::<i16>(&data).ok()?),
        ELEMENT_TYPE::U2 => DnValue::U2(read_le::<u16>(&data).ok()?),
        ELEMENT_TYPE::I4 => DnValue::I4(read_le::<i32>(&data).ok()?),
        ELEMENT_TYPE::U4 => DnValue::U4(read_le::<u32>(&data).ok()?),
        ELEMENT_TYPE::I8 => DnValue::I8(read_le::<i64>(&data).ok()?),
        ELEMENT_TYPE::U8 => DnValue::U8(read_le::<u64>(&data).ok()?),
        ELEMENT_TYPE::R4 => DnValue::R4(read_le::<f32>(&data).ok()?),
        ELEMENT_TYPE::R8 => DnValue::R8(read_le::<f64>(&data).ok()?),
        ELEMENT_TYPE::I => {
            if ptr_size == 4 {
                DnValue::IntPtr(i64::from(read_le::<i32>(&data).ok()?))
            } else {
                DnValue::IntPtr(read_le::<i64>(&data).ok()?)
            }
        }
        ELEMENT_TYPE::U | ELEMENT_TYPE::PTR | ELEMENT_TYPE::FNPTR => {
            if ptr_size == 4 {
                DnValue::UIntPtr(u64::from(read_le::<u32>(&data).ok()?))
            } else {
                DnValue::UIntPtr(read_le::<u64>(&data).ok()?)
            }
        }
        _ => return None,
    };

    Some(ValueResult::Valid(result))
}

fn decode_composite(value: &CorValue, ptr_size: u32, depth: u32) -> Option<ValueResult> {
    if let Some(result) = decode_decimal(value) {
        return Some(result);
    }
    if let Some(result) = decode_date_time(value) {
        return Some(result);
    }
    decode_nullable(value, ptr_size, depth)
}

fn decode_decimal(value: &CorValue) -> Option<ValueResult> {
    let exact_type = value.exact_type()?;
    if !exact_type.is_system_decimal() {
        return None;
    }
    if value.size() != Some(16) {
        return None;
    }
    let data = value.read_generic_value()?;

    Decimal::from_debuggee_bytes(&data).map(|decimal| ValueResult::Valid(DnValue::Decimal(decimal)))
}

fn decode_date_time(value: &CorValue) -> Option<ValueResult> {
    let exact_type = value.exact_type()?;
    if !exact_type.is_system_date_time() {
        return None;
    }
    if value.size() != Some(8) {
        return None;
    }
    let data = value.read_generic_value()?;
    if data.len() != 8 {
        return None;
    }

    DateTime::from_date_data(read_le::<u64>(&data).ok()?)
        .map(|instant| ValueResult::Valid(DnValue::DateTime(instant)))
}

fn decode_nullable(value: &CorValue, ptr_size: u32, depth: u32) -> Option<ValueResult> {
    let exact_type = value.exact_type()?;
    let (has_value_token, value_token) = exact_type.system_nullable_fields()?;
    let class = exact_type.class()?;

    let has_value_field = value.field_value(&class, has_value_token)?;
    let has_value = match read_value(has_value_field, ptr_size, depth - 1) {
        ValueResult::Valid(DnValue::Boolean(flag)) => flag,
        _ => return None,
    };
    if !has_value {
        return Some(ValueResult::Valid(DnValue::Null));
    }

    let inner = value.field_value(&class, value_token)?;
    let result = read_value(inner, ptr_size, depth - 1);
    // An unreadable inner value poisons the whole nullable
    result.is_valid().then_some(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::debuggee::{
        boxed, byte_value, nullable_type, nullable_value, prim_value, reference_to, string_value,
        system_decimal, system_enum_type, value_of_type, MockValue,
    };

    #[test]
    fn test_missing_value_is_invalid() {
        assert_eq!(read_simple_type_value(None, 8), ValueResult::Invalid);
    }

    #[test]
    fn test_primitive_reads() {
        let value = prim_value(ELEMENT_TYPE::I4, &0x1234_5678_i32.to_le_bytes());
        assert_eq!(
            read_simple_type_value(Some(&value), 8),
            ValueResult::Valid(DnValue::I4(0x1234_5678))
        );

        let value = prim_value(ELEMENT_TYPE::BOOLEAN, &[1]);
        assert_eq!(
            read_simple_type_value(Some(&value), 8),
            ValueResult::Valid(DnValue::Boolean(true))
        );

        let value = prim_value(ELEMENT_TYPE::R8, &2.5_f64.to_le_bytes());
        assert_eq!(
            read_simple_type_value(Some(&value), 8),
            ValueResult::Valid(DnValue::R8(2.5))
        );
    }

    #[test]
    fn test_wrong_width_is_invalid_not_truncated() {
        // An i4 buffer under an I8 tag must not decode
        let value = prim_value(ELEMENT_TYPE::I8, &0x7F_i32.to_le_bytes());
        assert_eq!(read_simple_type_value(Some(&value), 8), ValueResult::Invalid);

        let value = prim_value(ELEMENT_TYPE::U2, &[0xFF]);
        assert_eq!(read_simple_type_value(Some(&value), 8), ValueResult::Invalid);
    }

    #[test]
    fn test_native_int_uses_debuggee_width() {
        let value = prim_value(ELEMENT_TYPE::I, &(-1_i32).to_le_bytes());
        // 32-bit debuggee: 4-byte native int decodes
        assert_eq!(
            read_simple_type_value(Some(&value), 4),
            ValueResult::Valid(DnValue::IntPtr(-1))
        );
        // 64-bit debuggee: the same 4-byte buffer is a size mismatch
        assert_eq!(read_simple_type_value(Some(&value), 8), ValueResult::Invalid);
    }

    #[test]
    fn test_null_reference_reads_as_null() {
        let value = CorValue::new(MockValue::null_reference().handle());
        assert_eq!(
            read_simple_type_value(Some(&value), 8),
            ValueResult::Valid(DnValue::Null)
        );
    }

    #[test]
    fn test_reference_dereferences_once() {
        let target = prim_value(ELEMENT_TYPE::U1, &[42]);
        let value = reference_to(&target);
        assert_eq!(
            read_simple_type_value(Some(&value), 8),
            ValueResult::Valid(DnValue::U1(42))
        );
    }

    #[test]
    fn test_pointer_reads_reference_address() {
        let value = CorValue::new(MockValue::pointer(ELEMENT_TYPE::PTR, 0x7FFE_0000_1000).handle());
        assert_eq!(
            read_simple_type_value(Some(&value), 8),
            ValueResult::Valid(DnValue::U8(0x7FFE_0000_1000))
        );
        // 32-bit debuggee reads the low half as a u32
        assert_eq!(
            read_simple_type_value(Some(&value), 4),
            ValueResult::Valid(DnValue::U4(0x1000))
        );
    }

    #[test]
    fn test_box_unboxes_once() {
        let inner = prim_value(ELEMENT_TYPE::I2, &300_i16.to_le_bytes());
        let value = boxed(&inner);
        assert_eq!(
            read_simple_type_value(Some(&value), 8),
            ValueResult::Valid(DnValue::I2(300))
        );
    }

    #[test]
    fn test_double_box_is_invalid() {
        let inner = prim_value(ELEMENT_TYPE::I2, &1_i16.to_le_bytes());
        let value = boxed(&boxed(&inner));
        assert_eq!(read_simple_type_value(Some(&value), 8), ValueResult::Invalid);
    }

    #[test]
    fn test_array_is_invalid() {
        let value = CorValue::new(MockValue::array().handle());
        assert_eq!(read_simple_type_value(Some(&value), 8), ValueResult::Invalid);
    }

    #[test]
    fn test_string_reads_text() {
        let value = string_value("hello");
        assert_eq!(
            read_simple_type_value(Some(&value), 8),
            ValueResult::Valid(DnValue::String("hello".into()))
        );
    }

    #[test]
    fn test_enum_reads_underlying_type() {
        let enum_type = system_enum_type("Colors", ELEMENT_TYPE::I4);
        let value = value_of_type(&enum_type, &7_i32.to_le_bytes());
        assert_eq!(
            read_simple_type_value(Some(&value), 8),
            ValueResult::Valid(DnValue::I4(7))
        );
    }

    #[test]
    fn test_decimal_roundtrip() {
        // 1.5 in memory order: flags, hi, lo, mid
        let mut data = Vec::new();
        data.extend_from_slice(&0x0001_0000_u32.to_le_bytes());
        data.extend_from_slice(&0_u32.to_le_bytes());
        data.extend_from_slice(&15_u32.to_le_bytes());
        data.extend_from_slice(&0_u32.to_le_bytes());

        let decimal_type = system_decimal();
        let value = value_of_type(&decimal_type, &data);

        match read_simple_type_value(Some(&value), 8) {
            ValueResult::Valid(DnValue::Decimal(decimal)) => {
                assert_eq!(decimal.to_string(), "1.5");
            }
            other => panic!("expected a decimal, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_decimal_is_invalid() {
        // scale nibble out of range
        let mut data = Vec::new();
        data.extend_from_slice(&0x00FF_0000_u32.to_le_bytes());
        data.extend_from_slice(&[0u8; 12]);

        let decimal_type = system_decimal();
        let value = value_of_type(&decimal_type, &data);

        assert_eq!(read_simple_type_value(Some(&value), 8), ValueResult::Invalid);
    }

    #[test]
    fn test_nullable_without_value_is_null() {
        let nullable = nullable_type();
        let value = nullable_value(&nullable, false, None);
        assert_eq!(
            read_simple_type_value(Some(&value), 8),
            ValueResult::Valid(DnValue::Null)
        );
    }

    #[test]
    fn test_nullable_with_value_propagates_inner() {
        let nullable = nullable_type();
        let inner = prim_value(ELEMENT_TYPE::I4, &99_i32.to_le_bytes());
        let value = nullable_value(&nullable, true, Some(&inner));
        assert_eq!(
            read_simple_type_value(Some(&value), 8),
            ValueResult::Valid(DnValue::I4(99))
        );
    }

    #[test]
    fn test_nullable_with_unreadable_inner_is_invalid() {
        let nullable = nullable_type();
        // inner claims I4 but carries two bytes
        let inner = prim_value(ELEMENT_TYPE::I4, &[0x01, 0x02]);
        let value = nullable_value(&nullable, true, Some(&inner));
        assert_eq!(read_simple_type_value(Some(&value), 8), ValueResult::Invalid);
    }

    #[test]
    fn test_byref_to_byte() {
        let target = byte_value(5);
        let value = CorValue::new(MockValue::byref_to(&target).handle());
        assert_eq!(
            read_simple_type_value(Some(&value), 8),
            ValueResult::Valid(DnValue::U1(5))
        );
    }
}
