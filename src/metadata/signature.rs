//! Parsing of method and field signature blobs.
//!
//! Metadata stores type information for methods and fields as compressed
//! binary signatures (ECMA-335 II.23.2). The debugger reads these blobs
//! through the live metadata import and decodes them here to answer
//! questions such as "does this getter take parameters", "is this field
//! signature a primitive" or "does this method return `System.String`".
//!
//! Signatures nest: a pointer wraps a type, a generic instantiation wraps
//! a base type and its arguments, custom modifiers wrap whatever they
//! modify. [`TypeSig`] models that nesting directly, which makes
//! stripping `pinned` and `modreq`/`modopt` wrappers a plain walk down
//! the chain.
//!
//! # Examples
//!
//! ```rust
//! use dotprobe::metadata::signature::{parse_method_sig, TypeSig};
//!
//! // HASTHIS, one parameter, returns void, takes a string
//! let sig = parse_method_sig(&[0x20, 0x01, 0x01, 0x0E])?;
//!
//! assert!(sig.has_this);
//! assert_eq!(sig.param_count, 1);
//! assert!(matches!(sig.return_type, TypeSig::Void));
//! assert!(matches!(sig.params[0], TypeSig::String));
//! # Ok::<(), dotprobe::Error>(())
//! ```

use crate::{file::parser::Parser, metadata::token::Token, Result};

/// Deepest nesting accepted in a single signature blob. Generic
/// instantiations and pointer chains recurse; a hostile blob must not
/// recurse us off the stack.
const MAX_RECURSION_DEPTH: usize = 50;

/// Element type constants for signature blobs (ECMA-335 II.23.1.16).
///
/// These are also the values the runtime reports for live types, so the
/// same constants serve signature decoding and value reading.
#[allow(non_snake_case, dead_code, missing_docs)]
pub mod ELEMENT_TYPE {
    pub const END: u8 = 0x00;
    pub const VOID: u8 = 0x01;
    pub const BOOLEAN: u8 = 0x02;
    pub const CHAR: u8 = 0x03;
    pub const I1: u8 = 0x04;
    pub const U1: u8 = 0x05;
    pub const I2: u8 = 0x06;
    pub const U2: u8 = 0x07;
    pub const I4: u8 = 0x08;
    pub const U4: u8 = 0x09;
    pub const I8: u8 = 0x0a;
    pub const U8: u8 = 0x0b;
    pub const R4: u8 = 0x0c;
    pub const R8: u8 = 0x0d;
    pub const STRING: u8 = 0x0e;
    /// Followed by a type
    pub const PTR: u8 = 0x0f;
    /// Followed by a type
    pub const BYREF: u8 = 0x10;
    /// Followed by a `TypeDef` or `TypeRef` token
    pub const VALUETYPE: u8 = 0x11;
    /// Followed by a `TypeDef` or `TypeRef` token
    pub const CLASS: u8 = 0x12;
    /// Generic parameter in a generic type definition, represented as a number
    pub const VAR: u8 = 0x13;
    /// A multi-dimensional array: type, rank, sizes, lower bounds
    pub const ARRAY: u8 = 0x14;
    /// Generic type instantiation. Followed by type `type-arg-count type-1 ... type-n`
    pub const GENERICINST: u8 = 0x15;
    pub const TYPEDBYREF: u8 = 0x16;
    /// `System.IntPtr`
    pub const I: u8 = 0x18;
    /// `System.UIntPtr`
    pub const U: u8 = 0x19;
    /// Followed by a full method signature
    pub const FNPTR: u8 = 0x1b;
    /// `System.Object`
    pub const OBJECT: u8 = 0x1c;
    /// Single-dimensional array with a zero lower bound
    pub const SZARRAY: u8 = 0x1d;
    /// Generic parameter in a generic method definition, represented as a number
    pub const MVAR: u8 = 0x1e;
    /// Required modifier: followed by a `TypeDef` or `TypeRef` token
    pub const CMOD_REQD: u8 = 0x1f;
    /// Optional modifier: followed by a `TypeDef` or `TypeRef` token
    pub const CMOD_OPT: u8 = 0x20;
    /// Implemented within the CLI
    pub const INTERNAL: u8 = 0x21;
    /// First invalid element type
    pub const MAX: u8 = 0x22;
    pub const MODIFIER: u8 = 0x40;
    /// Sentinel for vararg method signatures
    pub const SENTINEL: u8 = 0x41;
    /// Denotes a local variable that points at a pinned object
    pub const PINNED: u8 = 0x45;
}

/// A decoded signature type.
///
/// Wrapping variants (`Ptr`, `ByRef`, `SzArray`, custom modifiers,
/// `Pinned`) box the type they apply to, so a signature such as
/// `int32 modopt(IsConst)*` becomes `Ptr(CModOpt(_, I4))`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSig {
    /// `void`, only valid as a return type or behind a pointer
    Void,
    /// `System.Boolean`
    Boolean,
    /// `System.Char`, a UTF-16 code unit
    Char,
    /// `System.SByte`
    I1,
    /// `System.Byte`
    U1,
    /// `System.Int16`
    I2,
    /// `System.UInt16`
    U2,
    /// `System.Int32`
    I4,
    /// `System.UInt32`
    U4,
    /// `System.Int64`
    I8,
    /// `System.UInt64`
    U8,
    /// `System.Single`
    R4,
    /// `System.Double`
    R8,
    /// `System.String`
    String,
    /// `System.IntPtr`
    I,
    /// `System.UIntPtr`
    U,
    /// `System.Object`
    Object,
    /// `System.TypedReference`
    TypedByRef,
    /// Unmanaged pointer to the inner type
    Ptr(Box<TypeSig>),
    /// Managed reference to the inner type
    ByRef(Box<TypeSig>),
    /// Value type reference by `TypeDef` / `TypeRef` / `TypeSpec` token
    ValueType(Token),
    /// Class reference by `TypeDef` / `TypeRef` / `TypeSpec` token
    Class(Token),
    /// Generic parameter of the declaring type, by index
    Var(u32),
    /// Generic parameter of the declaring method, by index
    MVar(u32),
    /// Multi-dimensional array of the inner type
    Array {
        /// Element type
        base: Box<TypeSig>,
        /// Number of dimensions
        rank: u32,
    },
    /// Instantiated generic type with its type arguments
    GenericInst(Box<TypeSig>, Vec<TypeSig>),
    /// Single-dimensional, zero-based array of the inner type
    SzArray(Box<TypeSig>),
    /// Pointer to a function with the given signature
    FnPtr(Box<MethodSig>),
    /// Required custom modifier applied to the inner type
    CModReqd(Token, Box<TypeSig>),
    /// Optional custom modifier applied to the inner type
    CModOpt(Token, Box<TypeSig>),
    /// Pinned local, the garbage collector must not move the referent
    Pinned(Box<TypeSig>),
}

impl TypeSig {
    /// Strips `pinned` and custom modifier wrappers and returns the
    /// underlying type. Signature comparisons in the runtime ignore
    /// these wrappers, so accessor matching does too.
    #[must_use]
    pub fn strip_pinned_and_modifiers(&self) -> &TypeSig {
        let mut current = self;
        loop {
            match current {
                TypeSig::Pinned(inner)
                | TypeSig::CModReqd(_, inner)
                | TypeSig::CModOpt(_, inner) => current = inner,
                _ => return current,
            }
        }
    }

    /// The `ELEMENT_TYPE` constant of the outermost node.
    #[must_use]
    pub fn element_type(&self) -> u8 {
        match self {
            TypeSig::Void => ELEMENT_TYPE::VOID,
            TypeSig::Boolean => ELEMENT_TYPE::BOOLEAN,
            TypeSig::Char => ELEMENT_TYPE::CHAR,
            TypeSig::I1 => ELEMENT_TYPE::I1,
            TypeSig::U1 => ELEMENT_TYPE::U1,
            TypeSig::I2 => ELEMENT_TYPE::I2,
            TypeSig::U2 => ELEMENT_TYPE::U2,
            TypeSig::I4 => ELEMENT_TYPE::I4,
            TypeSig::U4 => ELEMENT_TYPE::U4,
            TypeSig::I8 => ELEMENT_TYPE::I8,
            TypeSig::U8 => ELEMENT_TYPE::U8,
            TypeSig::R4 => ELEMENT_TYPE::R4,
            TypeSig::R8 => ELEMENT_TYPE::R8,
            TypeSig::String => ELEMENT_TYPE::STRING,
            TypeSig::I => ELEMENT_TYPE::I,
            TypeSig::U => ELEMENT_TYPE::U,
            TypeSig::Object => ELEMENT_TYPE::OBJECT,
            TypeSig::TypedByRef => ELEMENT_TYPE::TYPEDBYREF,
            TypeSig::Ptr(_) => ELEMENT_TYPE::PTR,
            TypeSig::ByRef(_) => ELEMENT_TYPE::BYREF,
            TypeSig::ValueType(_) => ELEMENT_TYPE::VALUETYPE,
            TypeSig::Class(_) => ELEMENT_TYPE::CLASS,
            TypeSig::Var(_) => ELEMENT_TYPE::VAR,
            TypeSig::MVar(_) => ELEMENT_TYPE::MVAR,
            TypeSig::Array { .. } => ELEMENT_TYPE::ARRAY,
            TypeSig::GenericInst(_, _) => ELEMENT_TYPE::GENERICINST,
            TypeSig::SzArray(_) => ELEMENT_TYPE::SZARRAY,
            TypeSig::FnPtr(_) => ELEMENT_TYPE::FNPTR,
            TypeSig::CModReqd(_, _) => ELEMENT_TYPE::CMOD_REQD,
            TypeSig::CModOpt(_, _) => ELEMENT_TYPE::CMOD_OPT,
            TypeSig::Pinned(_) => ELEMENT_TYPE::PINNED,
        }
    }

    /// `true` for the primitive value types an enum may use as its
    /// underlying type: `Boolean`, `Char`, the integer types, the float
    /// types and the native int types.
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            TypeSig::Boolean
                | TypeSig::Char
                | TypeSig::I1
                | TypeSig::U1
                | TypeSig::I2
                | TypeSig::U2
                | TypeSig::I4
                | TypeSig::U4
                | TypeSig::I8
                | TypeSig::U8
                | TypeSig::R4
                | TypeSig::R8
                | TypeSig::I
                | TypeSig::U
        )
    }
}

/// A decoded method signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSig {
    /// `HASTHIS` flag, the method takes an implicit `this`
    pub has_this: bool,
    /// `EXPLICITTHIS` flag, `this` is spelled out in the parameter list
    pub explicit_this: bool,
    /// `GENERIC` flag. Distinct from [`MethodSig::generic_param_count`],
    /// a hostile blob can set the flag with a zero count.
    pub generic: bool,
    /// Low nibble of the head byte: 0 default, 1-4 unmanaged
    /// conventions, 5 vararg
    pub convention: u8,
    /// Number of generic parameters on the method definition
    pub generic_param_count: u32,
    /// Declared parameter count, including any vararg parameters
    pub param_count: u32,
    /// Return type
    pub return_type: TypeSig,
    /// Parameter types in declaration order
    pub params: Vec<TypeSig>,
    /// A vararg sentinel appeared in the parameter list. Definition-site
    /// signatures never carry one, so this marks a signature that must
    /// not be matched against a property accessor.
    pub has_sentinel: bool,
}

/// Parse a method signature blob.
///
/// # Errors
/// Returns an error if the blob is truncated, is not a method signature
/// or nests deeper than the recursion limit.
pub fn parse_method_sig(data: &[u8]) -> Result<MethodSig> {
    SignatureReader::new(data).read_method()
}

/// Parse a field signature blob and return the declared field type,
/// including any custom modifier wrappers.
///
/// # Errors
/// Returns an error if the blob is truncated, is not a field signature
/// or nests deeper than the recursion limit.
pub fn parse_field_sig(data: &[u8]) -> Result<TypeSig> {
    SignatureReader::new(data).read_field()
}

/// Cursor over a signature blob with a recursion budget.
struct SignatureReader<'a> {
    parser: Parser<'a>,
    depth: usize,
}

impl<'a> SignatureReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        SignatureReader {
            parser: Parser::new(data),
            depth: 0,
        }
    }

    fn read_method(&mut self) -> Result<MethodSig> {
        let head = self.parser.read_le::<u8>()?;
        let convention = head & 0x0F;
        if convention > 0x05 {
            return Err(malformed_error!(
                "Not a method signature head - 0x{:02x}",
                head
            ));
        }

        let has_this = head & 0x20 != 0;
        let explicit_this = head & 0x40 != 0;
        let generic = head & 0x10 != 0;
        let generic_param_count = if generic {
            self.parser.read_compressed_uint()?
        } else {
            0
        };

        let param_count = self.parser.read_compressed_uint()?;
        let return_type = self.parse_param()?;

        let mut params = Vec::with_capacity(param_count.min(64) as usize);
        let mut has_sentinel = false;
        for _ in 0..param_count {
            if self.parser.has_more_data()
                && self.parser.peek_byte()? == ELEMENT_TYPE::SENTINEL
            {
                self.parser.advance()?;
                has_sentinel = true;
            }
            params.push(self.parse_param()?);
        }

        Ok(MethodSig {
            has_this,
            explicit_this,
            generic,
            convention,
            generic_param_count,
            param_count,
            return_type,
            params,
            has_sentinel,
        })
    }

    fn read_field(&mut self) -> Result<TypeSig> {
        let head = self.parser.read_le::<u8>()?;
        if head != 0x06 {
            return Err(malformed_error!(
                "Not a field signature head - 0x{:02x}",
                head
            ));
        }

        let mods = self.parse_custom_mods()?;
        let base = self.parse_type()?;
        Ok(wrap_mods(mods, base))
    }

    /// Param and RetType production: custom modifiers, an optional
    /// `BYREF`, then the type. `VOID` and `TYPEDBYREF` fall out of the
    /// regular type parse.
    fn parse_param(&mut self) -> Result<TypeSig> {
        let mods = self.parse_custom_mods()?;
        let ty = if self.parser.has_more_data()
            && self.parser.peek_byte()? == ELEMENT_TYPE::BYREF
        {
            self.parser.advance()?;
            TypeSig::ByRef(Box::new(self.parse_type()?))
        } else {
            self.parse_type()?
        };
        Ok(wrap_mods(mods, ty))
    }

    fn parse_custom_mods(&mut self) -> Result<Vec<(bool, Token)>> {
        let mut mods = Vec::new();
        while self.parser.has_more_data() {
            match self.parser.peek_byte()? {
                ELEMENT_TYPE::CMOD_REQD => {
                    self.parser.advance()?;
                    mods.push((true, self.parser.read_compressed_token()?));
                }
                ELEMENT_TYPE::CMOD_OPT => {
                    self.parser.advance()?;
                    mods.push((false, self.parser.read_compressed_token()?));
                }
                _ => break,
            }
        }
        Ok(mods)
    }

    fn parse_type(&mut self) -> Result<TypeSig> {
        self.depth += 1;
        if self.depth >= MAX_RECURSION_DEPTH {
            return Err(crate::Error::RecursionLimit(MAX_RECURSION_DEPTH));
        }

        let result = self.parse_type_impl();
        self.depth -= 1;
        result
    }

    fn parse_type_impl(&mut self) -> Result<TypeSig> {
        match self.parser.read_le::<u8>()? {
            ELEMENT_TYPE::VOID => Ok(TypeSig::Void),
            ELEMENT_TYPE::BOOLEAN => Ok(TypeSig::Boolean),
            ELEMENT_TYPE::CHAR => Ok(TypeSig::Char),
            ELEMENT_TYPE::I1 => Ok(TypeSig::I1),
            ELEMENT_TYPE::U1 => Ok(TypeSig::U1),
            ELEMENT_TYPE::I2 => Ok(TypeSig::I2),
            ELEMENT_TYPE::U2 => Ok(TypeSig::U2),
            ELEMENT_TYPE::I4 => Ok(TypeSig::I4),
            ELEMENT_TYPE::U4 => Ok(TypeSig::U4),
            ELEMENT_TYPE::I8 => Ok(TypeSig::I8),
            ELEMENT_TYPE::U8 => Ok(TypeSig::U8),
            ELEMENT_TYPE::R4 => Ok(TypeSig::R4),
            ELEMENT_TYPE::R8 => Ok(TypeSig::R8),
            ELEMENT_TYPE::STRING => Ok(TypeSig::String),
            ELEMENT_TYPE::I => Ok(TypeSig::I),
            ELEMENT_TYPE::U => Ok(TypeSig::U),
            ELEMENT_TYPE::OBJECT => Ok(TypeSig::Object),
            ELEMENT_TYPE::TYPEDBYREF => Ok(TypeSig::TypedByRef),
            ELEMENT_TYPE::PTR => {
                let mods = self.parse_custom_mods()?;
                let base = self.parse_type()?;
                Ok(TypeSig::Ptr(Box::new(wrap_mods(mods, base))))
            }
            ELEMENT_TYPE::BYREF => Ok(TypeSig::ByRef(Box::new(self.parse_type()?))),
            ELEMENT_TYPE::VALUETYPE => {
                Ok(TypeSig::ValueType(self.parser.read_compressed_token()?))
            }
            ELEMENT_TYPE::CLASS => Ok(TypeSig::Class(self.parser.read_compressed_token()?)),
            ELEMENT_TYPE::VAR => Ok(TypeSig::Var(self.parser.read_compressed_uint()?)),
            ELEMENT_TYPE::MVAR => Ok(TypeSig::MVar(self.parser.read_compressed_uint()?)),
            ELEMENT_TYPE::ARRAY => {
                let base = self.parse_type()?;
                let rank = self.parser.read_compressed_uint()?;

                // Sizes and lower bounds are decoded to keep the cursor
                // honest, but only the rank matters to the debugger. The
                // live type reports the actual shape.
                let num_sizes = self.parser.read_compressed_uint()?;
                for _ in 0..num_sizes {
                    let _ = self.parser.read_compressed_uint()?;
                }
                let num_lo_bounds = self.parser.read_compressed_uint()?;
                for _ in 0..num_lo_bounds {
                    let _ = self.parser.read_compressed_int()?;
                }

                Ok(TypeSig::Array {
                    base: Box::new(base),
                    rank,
                })
            }
            ELEMENT_TYPE::GENERICINST => {
                let base = self.parse_type()?;
                let arg_count = self.parser.read_compressed_uint()?;

                let mut args = Vec::with_capacity(arg_count.min(64) as usize);
                for _ in 0..arg_count {
                    args.push(self.parse_type()?);
                }

                Ok(TypeSig::GenericInst(Box::new(base), args))
            }
            ELEMENT_TYPE::SZARRAY => {
                let mods = self.parse_custom_mods()?;
                let base = self.parse_type()?;
                Ok(TypeSig::SzArray(Box::new(wrap_mods(mods, base))))
            }
            ELEMENT_TYPE::FNPTR => Ok(TypeSig::FnPtr(Box::new(self.read_method()?))),
            ELEMENT_TYPE::CMOD_REQD => {
                let token = self.parser.read_compressed_token()?;
                Ok(TypeSig::CModReqd(token, Box::new(self.parse_type()?)))
            }
            ELEMENT_TYPE::CMOD_OPT => {
                let token = self.parser.read_compressed_token()?;
                Ok(TypeSig::CModOpt(token, Box::new(self.parse_type()?)))
            }
            ELEMENT_TYPE::PINNED => Ok(TypeSig::Pinned(Box::new(self.parse_type()?))),
            byte => Err(malformed_error!(
                "Unsupported element type in signature - 0x{:02x}",
                byte
            )),
        }
    }
}

/// Wraps `base` in modifier variants so the first modifier in the blob
/// becomes the outermost wrapper.
fn wrap_mods(mods: Vec<(bool, Token)>, base: TypeSig) -> TypeSig {
    mods.into_iter().rev().fold(base, |inner, (required, token)| {
        if required {
            TypeSig::CModReqd(token, Box::new(inner))
        } else {
            TypeSig::CModOpt(token, Box::new(inner))
        }
    })
}
