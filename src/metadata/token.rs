use std::fmt;
use std::hash::{Hash, Hasher};

use strum::{EnumCount, EnumIter};

/// A metadata token referencing a row in a metadata table.
///
/// Tokens are 32-bit values where:
/// - The high byte (bits 24-31) selects the table
/// - The low 24 bits (bits 0-23) are the 1-based row index
///
/// A row index of zero means the token references nothing, regardless of
/// the table byte. The debugging interfaces hand out tokens for methods,
/// types, fields and scopes, and all lookups against an in-process
/// metadata importer go through this type.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Token(pub u32);

impl Token {
    /// Creates a new token from a raw 32-bit value
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Token(value)
    }

    /// Builds a token from a table and a 1-based row index
    #[must_use]
    pub fn from_table_row(table: TableId, row: u32) -> Self {
        Token(((table as u32) << 24) | (row & 0x00FF_FFFF))
    }

    /// Returns the raw token value
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Extracts the table byte from the token (high byte)
    #[must_use]
    pub fn table(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Decodes the table byte to a [`TableId`], or `None` if the byte does
    /// not name a metadata table
    #[must_use]
    pub fn table_id(&self) -> Option<TableId> {
        TableId::from_byte(self.table())
    }

    /// Extracts the row index from the token (low 24 bits)
    #[must_use]
    pub fn row(&self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    /// Returns true if the row index is zero, i.e. the token references
    /// nothing
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.row() == 0
    }
}

impl From<u32> for Token {
    fn from(value: u32) -> Self {
        Token(value)
    }
}

impl From<Token> for u32 {
    fn from(token: Token) -> Self {
        token.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token(0x{:08x}, table: 0x{:02x}, row: {})",
            self.0,
            self.table(),
            self.row()
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

/// Identifiers for the metadata tables defined in ECMA-335 Partition II,
/// Section 22.
///
/// The numeric values are the table IDs as stored in the high byte of a
/// metadata token and as bit positions in the `Valid` bitvector of the
/// tables stream header. The set includes the pointer and edit-and-continue
/// tables that only appear in uncompressed (`#-`) streams, because a module
/// loaded into a live process may carry either stream flavor and a reader
/// that walks the physical tables has to know the row width of every table
/// that can precede the one it wants.
#[derive(Clone, Copy, PartialEq, Debug, EnumIter, EnumCount, Eq, Hash)]
pub enum TableId {
    /// `Module` (0x00) - the defining module, one row per file
    Module = 0x00,
    /// `TypeRef` (0x01) - types imported from other modules
    TypeRef = 0x01,
    /// `TypeDef` (0x02) - types defined in this module
    TypeDef = 0x02,
    /// `FieldPtr` (0x03) - field indirection, uncompressed streams only
    FieldPtr = 0x03,
    /// `Field` (0x04) - field definitions
    Field = 0x04,
    /// `MethodPtr` (0x05) - method indirection, uncompressed streams only
    MethodPtr = 0x05,
    /// `MethodDef` (0x06) - method definitions
    MethodDef = 0x06,
    /// `ParamPtr` (0x07) - parameter indirection, uncompressed streams only
    ParamPtr = 0x07,
    /// `Param` (0x08) - method parameter definitions
    Param = 0x08,
    /// `InterfaceImpl` (0x09) - interface implementations
    InterfaceImpl = 0x09,
    /// `MemberRef` (0x0A) - members imported from other modules
    MemberRef = 0x0A,
    /// `Constant` (0x0B) - compile-time constant values
    Constant = 0x0B,
    /// `CustomAttribute` (0x0C) - custom attribute applications
    CustomAttribute = 0x0C,
    /// `FieldMarshal` (0x0D) - marshalling descriptors
    FieldMarshal = 0x0D,
    /// `DeclSecurity` (0x0E) - declarative security permissions
    DeclSecurity = 0x0E,
    /// `ClassLayout` (0x0F) - explicit type layout
    ClassLayout = 0x0F,
    /// `FieldLayout` (0x10) - explicit field offsets
    FieldLayout = 0x10,
    /// `StandAloneSig` (0x11) - standalone signatures
    StandAloneSig = 0x11,
    /// `EventMap` (0x12) - type-to-event ranges
    EventMap = 0x12,
    /// `EventPtr` (0x13) - event indirection, uncompressed streams only
    EventPtr = 0x13,
    /// `Event` (0x14) - event definitions
    Event = 0x14,
    /// `PropertyMap` (0x15) - type-to-property ranges
    PropertyMap = 0x15,
    /// `PropertyPtr` (0x16) - property indirection, uncompressed streams only
    PropertyPtr = 0x16,
    /// `Property` (0x17) - property definitions
    Property = 0x17,
    /// `MethodSemantics` (0x18) - accessor-to-property/event mappings
    MethodSemantics = 0x18,
    /// `MethodImpl` (0x19) - method implementation overrides
    MethodImpl = 0x19,
    /// `ModuleRef` (0x1A) - references to external modules
    ModuleRef = 0x1A,
    /// `TypeSpec` (0x1B) - instantiated and constructed types
    TypeSpec = 0x1B,
    /// `ImplMap` (0x1C) - P/Invoke mappings
    ImplMap = 0x1C,
    /// `FieldRVA` (0x1D) - initial data addresses for mapped fields
    FieldRVA = 0x1D,
    /// `EncLog` (0x1E) - edit-and-continue log
    EncLog = 0x1E,
    /// `EncMap` (0x1F) - edit-and-continue token map
    EncMap = 0x1F,
    /// `Assembly` (0x20) - the assembly manifest, present only in the
    /// manifest module
    Assembly = 0x20,
    /// `AssemblyProcessor` (0x21) - rarely used processor info
    AssemblyProcessor = 0x21,
    /// `AssemblyOS` (0x22) - rarely used OS info
    AssemblyOS = 0x22,
    /// `AssemblyRef` (0x23) - referenced assemblies
    AssemblyRef = 0x23,
    /// `AssemblyRefProcessor` (0x24) - rarely used processor info
    AssemblyRefProcessor = 0x24,
    /// `AssemblyRefOS` (0x25) - rarely used OS info
    AssemblyRefOS = 0x25,
    /// `File` (0x26) - files belonging to this assembly, the target of
    /// entry points that live in another module
    File = 0x26,
    /// `ExportedType` (0x27) - types forwarded from this assembly
    ExportedType = 0x27,
    /// `ManifestResource` (0x28) - embedded and linked resources
    ManifestResource = 0x28,
    /// `NestedClass` (0x29) - nesting relationships between types
    NestedClass = 0x29,
    /// `GenericParam` (0x2A) - generic parameter definitions
    GenericParam = 0x2A,
    /// `MethodSpec` (0x2B) - instantiated generic methods
    MethodSpec = 0x2B,
    /// `GenericParamConstraint` (0x2C) - constraints on generic parameters
    GenericParamConstraint = 0x2C,
}

impl TableId {
    /// Decodes a raw table byte to a `TableId`, or `None` for bytes that do
    /// not name a table
    #[must_use]
    pub fn from_byte(value: u8) -> Option<TableId> {
        match value {
            0x00 => Some(TableId::Module),
            0x01 => Some(TableId::TypeRef),
            0x02 => Some(TableId::TypeDef),
            0x03 => Some(TableId::FieldPtr),
            0x04 => Some(TableId::Field),
            0x05 => Some(TableId::MethodPtr),
            0x06 => Some(TableId::MethodDef),
            0x07 => Some(TableId::ParamPtr),
            0x08 => Some(TableId::Param),
            0x09 => Some(TableId::InterfaceImpl),
            0x0A => Some(TableId::MemberRef),
            0x0B => Some(TableId::Constant),
            0x0C => Some(TableId::CustomAttribute),
            0x0D => Some(TableId::FieldMarshal),
            0x0E => Some(TableId::DeclSecurity),
            0x0F => Some(TableId::ClassLayout),
            0x10 => Some(TableId::FieldLayout),
            0x11 => Some(TableId::StandAloneSig),
            0x12 => Some(TableId::EventMap),
            0x13 => Some(TableId::EventPtr),
            0x14 => Some(TableId::Event),
            0x15 => Some(TableId::PropertyMap),
            0x16 => Some(TableId::PropertyPtr),
            0x17 => Some(TableId::Property),
            0x18 => Some(TableId::MethodSemantics),
            0x19 => Some(TableId::MethodImpl),
            0x1A => Some(TableId::ModuleRef),
            0x1B => Some(TableId::TypeSpec),
            0x1C => Some(TableId::ImplMap),
            0x1D => Some(TableId::FieldRVA),
            0x1E => Some(TableId::EncLog),
            0x1F => Some(TableId::EncMap),
            0x20 => Some(TableId::Assembly),
            0x21 => Some(TableId::AssemblyProcessor),
            0x22 => Some(TableId::AssemblyOS),
            0x23 => Some(TableId::AssemblyRef),
            0x24 => Some(TableId::AssemblyRefProcessor),
            0x25 => Some(TableId::AssemblyRefOS),
            0x26 => Some(TableId::File),
            0x27 => Some(TableId::ExportedType),
            0x28 => Some(TableId::ManifestResource),
            0x29 => Some(TableId::NestedClass),
            0x2A => Some(TableId::GenericParam),
            0x2B => Some(TableId::MethodSpec),
            0x2C => Some(TableId::GenericParamConstraint),
            _ => None,
        }
    }
}
