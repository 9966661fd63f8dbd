//! Wrapper over a value in the debuggee.

use std::hash::{Hash, Hasher};

use crate::{
    cordebug::{
        class::CorClass,
        decode_name,
        handle::NativeHandle,
        raw::RawValue,
        types::CorType,
    },
    metadata::{signature::ELEMENT_TYPE, token::Token},
};

/// A value in the debuggee: a reference, a box, a string, an array, or
/// raw value-type bytes. Which of those it is decides which accessors
/// answer; the rest return `None`.
///
/// Nothing is cached. A value handle can go stale the moment the
/// debuggee resumes, and every accessor reports that as `None` rather
/// than a snapshot of the past.
#[derive(Clone)]
pub struct CorValue {
    pub(crate) raw: NativeHandle<dyn RawValue>,
}

impl CorValue {
    pub(crate) fn new(raw: NativeHandle<dyn RawValue>) -> Self {
        CorValue { raw }
    }

    /// `ELEMENT_TYPE` tag of the value.
    #[must_use]
    pub fn element_type(&self) -> u8 {
        self.raw.element_type().unwrap_or(ELEMENT_TYPE::END)
    }

    /// Size of the value's data in bytes.
    #[must_use]
    pub fn size(&self) -> Option<u64> {
        self.raw.size().ok()
    }

    /// Address of the value in the debuggee, 0 when unavailable.
    #[must_use]
    pub fn address(&self) -> u64 {
        self.raw.address().unwrap_or(0)
    }

    /// Whether the value is a reference.
    #[must_use]
    pub fn is_reference(&self) -> bool {
        self.raw.is_reference()
    }

    /// Whether the value is a boxed value type.
    #[must_use]
    pub fn is_box(&self) -> bool {
        self.raw.is_box()
    }

    /// Whether the value is a string.
    #[must_use]
    pub fn is_string(&self) -> bool {
        self.raw.is_string()
    }

    /// Whether the value is an array.
    #[must_use]
    pub fn is_array(&self) -> bool {
        self.raw.is_array()
    }

    /// Whether a reference value is null. Non-references read as
    /// non-null.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.raw.is_null().unwrap_or(false)
    }

    /// Target address of a reference value.
    #[must_use]
    pub fn reference_address(&self) -> Option<u64> {
        self.raw.reference_address().ok()
    }

    /// The value a reference points at.
    #[must_use]
    pub fn dereferenced_value(&self) -> Option<CorValue> {
        self.raw.dereference().ok().map(CorValue::new)
    }

    /// The value inside a box.
    #[must_use]
    pub fn boxed_value(&self) -> Option<CorValue> {
        self.raw.boxed_value().ok().map(CorValue::new)
    }

    /// Text of a string value.
    #[must_use]
    pub fn string(&self) -> Option<String> {
        self.raw.string_value().ok().map(decode_name)
    }

    /// The exact runtime type of the value.
    #[must_use]
    pub fn exact_type(&self) -> Option<CorType> {
        self.raw.exact_type().ok().map(CorType::new)
    }

    /// Raw bytes of a generic (primitive or value-type) value.
    #[must_use]
    pub fn read_generic_value(&self) -> Option<Vec<u8>> {
        self.raw.read_bytes().ok()
    }

    /// The value of a field of this object or value type.
    #[must_use]
    pub fn field_value(&self, class: &CorClass, field_token: Token) -> Option<CorValue> {
        self.raw
            .field_value(&class.raw, field_token.value())
            .ok()
            .map(CorValue::new)
    }
}

impl PartialEq for CorValue {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for CorValue {}

impl Hash for CorValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl std::fmt::Debug for CorValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorValue")
            .field("element_type", &self.element_type())
            .finish()
    }
}
