//! The metadata import seam.
//!
//! A paused debuggee exposes each module's metadata through an
//! IMetaDataImport-style COM interface. [`MetadataImport`] models that
//! interface as an object-safe trait: the live implementation forwards to
//! the native reader, tests script a mock. Every operation is a snapshot
//! query; nothing is cached here because dynamic modules can grow new
//! rows between pauses.
//!
//! Failures follow one rule: a native call that does not succeed, or a
//! token that does not resolve, yields `None` (or an empty list). The
//! algorithms in [`crate::metadata::reader`] treat that the same as "row
//! absent" and never escalate it into an error.

use bitflags::bitflags;
use sha1::{Digest, Sha1};
use uguid::Guid;

use crate::metadata::token::Token;

/// The manifest module's assembly row carries the full public key
/// instead of the 8-byte token.
pub const ASSEMBLY_HAS_PUBLIC_KEY: u32 = 0x0001;

bitflags! {
    /// Attributes on a `MethodDef` row.
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct MethodAttributes: u32 {
        /// No `this` parameter
        const STATIC = 0x0010;
        /// Cannot be overridden
        const FINAL = 0x0020;
        /// Dispatched through the vtable
        const VIRTUAL = 0x0040;
        /// Hidden by name and signature, not just name
        const HIDE_BY_SIG = 0x0080;
        /// No body in this type
        const ABSTRACT = 0x0400;
        /// Name carries meaning for tools
        const SPECIAL_NAME = 0x0800;
        /// Name carries meaning for the runtime
        const RT_SPECIAL_NAME = 0x1000;
    }
}

bitflags! {
    /// Attributes on a `Field` row.
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct FieldAttributes: u32 {
        /// Per-type storage, no `this`
        const STATIC = 0x0010;
        /// Writable only inside a constructor
        const INIT_ONLY = 0x0020;
        /// Compile-time constant, no runtime storage
        const LITERAL = 0x0040;
        /// Name carries meaning for tools
        const SPECIAL_NAME = 0x0200;
        /// Name carries meaning for the runtime
        const RT_SPECIAL_NAME = 0x0400;
    }
}

/// Module-scope properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeProps {
    /// Module name as stored in the Module row
    pub name: String,
    /// Module version id, regenerated on every compile
    pub mvid: Guid,
}

/// Properties of a `TypeDef` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDefProps {
    /// Type name, namespace-qualified but without enclosing types
    pub name: String,
    /// Raw `CorTypeAttr` attributes
    pub flags: u32,
    /// Base type token, nil for interfaces and `System.Object`
    pub extends: Token,
}

/// Properties of a `TypeRef` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRefProps {
    /// Referenced type name
    pub name: String,
    /// Resolution scope: an assembly/module ref, or another `TypeRef`
    /// when the referenced type is nested
    pub scope: Token,
}

/// A constant from the Constant table, tagged with its element type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constant {
    /// `ELEMENT_TYPE` of the stored value
    pub element_type: u8,
    /// Little-endian value bytes
    pub value: Vec<u8>,
}

/// Properties of a `Field` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldProps {
    /// Field name
    pub name: String,
    /// Field attributes
    pub flags: FieldAttributes,
    /// Raw field signature blob
    pub signature: Vec<u8>,
    /// Constant value for literal fields
    pub constant: Option<Constant>,
}

/// Properties of a `MethodDef` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodProps {
    /// Method name
    pub name: String,
    /// Method attributes
    pub flags: MethodAttributes,
    /// Raw `CorMethodImpl` implementation attributes
    pub impl_flags: u32,
    /// Raw method signature blob
    pub signature: Vec<u8>,
}

/// Properties of a `Property` row. Accessor tokens are nil when the
/// property lacks that accessor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyProps {
    /// Property name
    pub name: String,
    /// Raw `CorPropertyAttr` attributes
    pub flags: u32,
    /// Getter method token
    pub getter: Token,
    /// Setter method token
    pub setter: Token,
}

/// Properties of an `Event` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventProps {
    /// Event name
    pub name: String,
    /// Raw `CorEventAttr` attributes
    pub flags: u32,
    /// Delegate type of the event
    pub event_type: Token,
    /// `add_` accessor token
    pub add: Token,
    /// `remove_` accessor token
    pub remove: Token,
    /// Raise accessor token, usually nil
    pub fire: Token,
}

/// Properties of a `Param` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamProps {
    /// Parameter name, may be empty
    pub name: String,
    /// 1-based position; 0 names the return value
    pub sequence: u32,
    /// Raw `CorParamAttr` attributes
    pub flags: u32,
}

/// Assembly identity from the manifest module's Assembly row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyProps {
    /// Simple assembly name
    pub name: String,
    /// Major, minor, build, revision
    pub version: (u16, u16, u16, u16),
    /// Culture name, empty for the neutral culture
    pub culture: String,
    /// Public key, or the 8-byte token when
    /// [`ASSEMBLY_HAS_PUBLIC_KEY`] is clear
    pub public_key: Vec<u8>,
    /// Raw `CorAssemblyFlags`
    pub flags: u32,
}

impl AssemblyProps {
    /// The 8-byte public key token: the last 8 bytes of the SHA-1 of the
    /// full public key, reversed. When the row stores only the token it
    /// is returned as-is. `None` for unsigned assemblies.
    #[must_use]
    pub fn public_key_token(&self) -> Option<[u8; 8]> {
        if self.public_key.is_empty() {
            return None;
        }

        if self.flags & ASSEMBLY_HAS_PUBLIC_KEY != 0 {
            let digest = Sha1::digest(&self.public_key);
            let mut token = [0u8; 8];
            for (i, byte) in token.iter_mut().enumerate() {
                *byte = digest[digest.len() - 1 - i];
            }
            Some(token)
        } else {
            let bytes = self.public_key.get(..8)?;
            bytes.try_into().ok()
        }
    }

    /// Four-part display-name form of the assembly identity.
    ///
    /// ```rust
    /// use dotprobe::metadata::import::AssemblyProps;
    ///
    /// let props = AssemblyProps {
    ///     name: "mscorlib".into(),
    ///     version: (4, 0, 0, 0),
    ///     culture: String::new(),
    ///     public_key: vec![0xb7, 0x7a, 0x5c, 0x56, 0x19, 0x34, 0xe0, 0x89],
    ///     flags: 0,
    /// };
    ///
    /// assert_eq!(
    ///     props.full_name(),
    ///     "mscorlib, Version=4.0.0.0, Culture=neutral, PublicKeyToken=b77a5c561934e089"
    /// );
    /// ```
    #[must_use]
    pub fn full_name(&self) -> String {
        let culture = if self.culture.is_empty() {
            "neutral"
        } else {
            self.culture.as_str()
        };

        let token = match self.public_key_token() {
            Some(token) => token.iter().map(|byte| format!("{byte:02x}")).collect(),
            None => String::from("null"),
        };

        format!(
            "{}, Version={}.{}.{}.{}, Culture={}, PublicKeyToken={}",
            self.name,
            self.version.0,
            self.version.1,
            self.version.2,
            self.version.3,
            culture,
            token
        )
    }
}

/// Metadata of one live module, as the debuggee's runtime exposes it.
///
/// Implementations map every native failure to `None` or an empty list.
/// Enumerations return rows in table order.
pub trait MetadataImport: Send + Sync {
    /// Module name and mvid.
    fn scope_props(&self) -> Option<ScopeProps>;

    /// Whether the token refers to an existing row.
    fn is_valid_token(&self, token: Token) -> bool;

    /// Properties of a `TypeDef` token.
    fn type_def_props(&self, token: Token) -> Option<TypeDefProps>;

    /// Properties of a `TypeRef` token.
    fn type_ref_props(&self, token: Token) -> Option<TypeRefProps>;

    /// The enclosing type of a nested `TypeDef`, `None` for top-level
    /// types.
    fn enclosing_type(&self, nested: Token) -> Option<Token>;

    /// Field tokens of a `TypeDef`, in table order.
    fn field_tokens(&self, type_def: Token) -> Vec<Token>;

    /// Method tokens of a `TypeDef`, in table order.
    fn method_tokens(&self, type_def: Token) -> Vec<Token>;

    /// Property tokens of a `TypeDef`, in table order.
    fn property_tokens(&self, type_def: Token) -> Vec<Token>;

    /// Event tokens of a `TypeDef`, in table order.
    fn event_tokens(&self, type_def: Token) -> Vec<Token>;

    /// Param tokens of a `MethodDef`, in sequence order.
    fn param_tokens(&self, method: Token) -> Vec<Token>;

    /// Properties of a `Field` token.
    fn field_props(&self, token: Token) -> Option<FieldProps>;

    /// Properties of a `MethodDef` token.
    fn method_props(&self, token: Token) -> Option<MethodProps>;

    /// Properties of a `Property` token.
    fn property_props(&self, token: Token) -> Option<PropertyProps>;

    /// Properties of an `Event` token.
    fn event_props(&self, token: Token) -> Option<EventProps>;

    /// Properties of a `Param` token.
    fn param_props(&self, token: Token) -> Option<ParamProps>;

    /// Number of generic parameters declared on a `TypeDef` or
    /// `MethodDef`, 0 on failure.
    fn generic_param_count(&self, token: Token) -> u32;

    /// Value blob of the named custom attribute on `owner`, `None` when
    /// the attribute is absent.
    fn custom_attribute_blob(&self, owner: Token, attribute_name: &str) -> Option<Vec<u8>>;

    /// Assembly identity, `None` for modules that are not the manifest
    /// module.
    fn assembly_props(&self) -> Option<AssemblyProps>;
}
