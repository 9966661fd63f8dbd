//! Wrapper over an instantiated type.
//!
//! The derived classifications (`is_enum`, `is_value_type`, the
//! `System.*` identity checks) are computed on every call by walking
//! the live base chain through metadata, never cached: a dynamic module
//! can grow new rows between pauses and the debugger must see what the
//! debuggee sees right now.

use std::{
    hash::{Hash, Hasher},
    sync::Arc,
};

use crate::{
    cordebug::{class::CorClass, handle::NativeHandle, raw::RawType},
    metadata::{
        import::MetadataImport,
        reader,
        signature::ELEMENT_TYPE,
        token::Token,
    },
};

/// An instantiated type in the debuggee: a class or value type with its
/// generic arguments bound, an array, or a primitive.
///
/// Element type and rank are read once at construction; the native type
/// object keeps them stable for its lifetime. Everything else is
/// re-queried per call.
#[derive(Clone)]
pub struct CorType {
    pub(crate) raw: NativeHandle<dyn RawType>,
    element_type: u8,
    rank: u32,
}

impl CorType {
    pub(crate) fn new(raw: NativeHandle<dyn RawType>) -> Self {
        let element_type = raw.element_type().unwrap_or(ELEMENT_TYPE::END);
        let rank = raw.rank().unwrap_or(0);
        CorType {
            raw,
            element_type,
            rank,
        }
    }

    /// `ELEMENT_TYPE` tag of the type.
    #[must_use]
    pub fn element_type(&self) -> u8 {
        self.element_type
    }

    /// Array rank, 0 for non-arrays.
    #[must_use]
    pub fn rank(&self) -> u32 {
        self.rank
    }

    /// Bound generic arguments, or the element type for arrays and
    /// pointers.
    #[must_use]
    pub fn type_parameters(&self) -> Vec<CorType> {
        self.raw
            .type_parameters()
            .map(|handles| handles.into_iter().map(CorType::new).collect())
            .unwrap_or_default()
    }

    /// First type parameter: the array element type, the pointee, or
    /// the first generic argument.
    #[must_use]
    pub fn first_type_parameter(&self) -> Option<CorType> {
        self.raw.first_type_parameter().ok().map(CorType::new)
    }

    /// Whether [`CorType::class`] is meaningful for this type.
    #[must_use]
    pub fn has_class(&self) -> bool {
        self.element_type == ELEMENT_TYPE::CLASS || self.element_type == ELEMENT_TYPE::VALUETYPE
    }

    /// The uninstantiated class behind this type.
    #[must_use]
    pub fn class(&self) -> Option<CorClass> {
        self.raw.class().ok().map(CorClass::new)
    }

    /// Base type, `None` for `System.Object`, interfaces and failed
    /// queries.
    #[must_use]
    pub fn base(&self) -> Option<CorType> {
        self.raw.base().ok().flatten().map(CorType::new)
    }

    /// Whether the type derives from `System.Enum`.
    ///
    /// The element-type check accepts `CLASS` as well as `VALUETYPE`;
    /// the runtime's debugger does not insist the tag is right.
    #[must_use]
    pub fn is_enum(&self) -> bool {
        if self.element_type != ELEMENT_TYPE::VALUETYPE && self.element_type != ELEMENT_TYPE::CLASS
        {
            return false;
        }
        self.base().is_some_and(|base| base.is_system_enum())
    }

    /// Whether the type derives from `System.ValueType` or
    /// `System.Enum`.
    #[must_use]
    pub fn is_value_type(&self) -> bool {
        self.is_enum() || self.derives_from_system_value_type()
    }

    /// Whether the element type is one of the primitive value types.
    #[must_use]
    pub fn is_primitive_value_type(&self) -> bool {
        (ELEMENT_TYPE::VOID..=ELEMENT_TYPE::R8).contains(&self.element_type)
            || self.element_type == ELEMENT_TYPE::I
            || self.element_type == ELEMENT_TYPE::U
            || self.element_type == ELEMENT_TYPE::TYPEDBYREF
    }

    /// Whether the type is primitive or derives directly from
    /// `System.ValueType`.
    #[must_use]
    pub fn derives_from_system_value_type(&self) -> bool {
        if self.is_primitive_value_type() {
            return true;
        }
        self.base().is_some_and(|base| base.is_system_value_type())
    }

    /// Whether this is `System.Enum` itself.
    #[must_use]
    pub fn is_system_enum(&self) -> bool {
        // System.Enum is not generic
        if !self.type_parameters().is_empty() {
            return false;
        }
        if !self.class().is_some_and(|cls| cls.is_system_enum()) {
            return false;
        }
        self.base().is_some_and(|base| base.is_system_value_type())
    }

    /// Whether this is `System.ValueType` itself.
    #[must_use]
    pub fn is_system_value_type(&self) -> bool {
        if !self.type_parameters().is_empty() {
            return false;
        }
        if !self.class().is_some_and(|cls| cls.is_system_value_type()) {
            return false;
        }
        self.base().is_some_and(|base| base.is_system_object())
    }

    /// Whether this is `System.Object` itself: the right class, no
    /// generics, and no base.
    #[must_use]
    pub fn is_system_object(&self) -> bool {
        if !self.type_parameters().is_empty() {
            return false;
        }
        if !self.class().is_some_and(|cls| cls.is_system_object()) {
            return false;
        }
        self.base().is_none()
    }

    /// Whether this is `System.Decimal`.
    #[must_use]
    pub fn is_system_decimal(&self) -> bool {
        if !self.type_parameters().is_empty() {
            return false;
        }
        if !self.class().is_some_and(|cls| cls.is_system_decimal()) {
            return false;
        }
        self.base().is_some_and(|base| base.is_system_value_type())
    }

    /// Whether this is `System.DateTime`.
    #[must_use]
    pub fn is_system_date_time(&self) -> bool {
        if !self.type_parameters().is_empty() {
            return false;
        }
        if !self.class().is_some_and(|cls| cls.is_system_date_time()) {
            return false;
        }
        self.base().is_some_and(|base| base.is_system_value_type())
    }

    /// Whether this is the `System.Nullable<T>` the runtime
    /// intrinsifies: exactly one bound type argument, exactly one
    /// declared generic parameter, the right top-level name, and a base
    /// of `System.ValueType`.
    #[must_use]
    pub fn is_system_nullable(&self) -> bool {
        if self.type_parameters().len() != 1 {
            return false;
        }
        let Some((import, token)) = self.metadata() else {
            return false;
        };
        if import.generic_param_count(token) != 1 {
            return false;
        }
        let parts = reader::type_def_full_name(&*import, token);
        if parts.len() != 1 || parts[0].name != "System.Nullable`1" {
            return false;
        }
        self.base().is_some_and(|base| base.is_system_value_type())
    }

    /// The `hasValue` and `value` field tokens of a well-formed
    /// `System.Nullable<T>`, in that order.
    #[must_use]
    pub fn system_nullable_fields(&self) -> Option<(Token, Token)> {
        if !self.is_system_nullable() {
            return None;
        }
        let (import, token) = self.metadata()?;
        reader::system_nullable_fields(&*import, token)
    }

    /// The element type, reduced to a primitive tag when the type turns
    /// out to be one of the `System.*` primitives despite being tagged
    /// `CLASS` or `VALUETYPE`.
    #[must_use]
    pub fn try_get_primitive_type(&self) -> u8 {
        let etype = self.element_type;
        if etype != ELEMENT_TYPE::CLASS && etype != ELEMENT_TYPE::VALUETYPE {
            return etype;
        }

        let Some((import, token)) = self.metadata() else {
            return etype;
        };
        let parts = reader::type_def_full_name(&*import, token);
        if parts.len() != 1 {
            return etype;
        }

        if self.derives_from_system_value_type() {
            match parts[0].name.as_str() {
                "System.Boolean" => ELEMENT_TYPE::BOOLEAN,
                "System.Byte" => ELEMENT_TYPE::U1,
                "System.Char" => ELEMENT_TYPE::CHAR,
                "System.Double" => ELEMENT_TYPE::R8,
                "System.Int16" => ELEMENT_TYPE::I2,
                "System.Int32" => ELEMENT_TYPE::I4,
                "System.Int64" => ELEMENT_TYPE::I8,
                "System.IntPtr" => ELEMENT_TYPE::I,
                "System.SByte" => ELEMENT_TYPE::I1,
                "System.Single" => ELEMENT_TYPE::R4,
                "System.TypedReference" => ELEMENT_TYPE::TYPEDBYREF,
                "System.UInt16" => ELEMENT_TYPE::U2,
                "System.UInt32" => ELEMENT_TYPE::U4,
                "System.UInt64" => ELEMENT_TYPE::U8,
                "System.UIntPtr" => ELEMENT_TYPE::U,
                "System.Void" => ELEMENT_TYPE::VOID,
                _ => etype,
            }
        } else {
            match parts[0].name.as_str() {
                "System.Object" if self.base().is_none() => ELEMENT_TYPE::OBJECT,
                "System.String" if self.base().is_some_and(|base| base.is_system_object()) => {
                    ELEMENT_TYPE::STRING
                }
                _ => etype,
            }
        }
    }

    /// The underlying primitive tag of an enum type, from its first
    /// non-literal, non-static field. Only meaningful when
    /// [`CorType::is_enum`] holds.
    #[must_use]
    pub fn enum_underlying_type(&self) -> Option<u8> {
        let (import, token) = self.metadata()?;
        reader::enum_underlying_type(&*import, token).map(|sig| sig.element_type())
    }

    /// The enum underlying tag when this is an enum, the element type
    /// otherwise.
    #[must_use]
    pub fn type_or_enum_underlying_type(&self) -> u8 {
        if !self.is_enum() {
            return self.element_type;
        }
        self.enum_underlying_type().unwrap_or(self.element_type)
    }

    fn metadata(&self) -> Option<(Arc<dyn MetadataImport>, Token)> {
        self.class()?.metadata()
    }
}

impl PartialEq for CorType {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for CorType {}

impl Hash for CorType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl std::fmt::Debug for CorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorType")
            .field("element_type", &self.element_type)
            .field("rank", &self.rank)
            .finish()
    }
}
