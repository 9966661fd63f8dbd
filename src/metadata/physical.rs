//! Physical metadata tables reader.
//!
//! This module reads just enough of the on-disk metadata of a .NET image to
//! answer the questions the engine asks about a file it has *not* loaded:
//! which member file a multi-module entry point forwards to, and what that
//! file row says about its contents. It parses the metadata root (`BSJB`),
//! locates the `#~` or `#-` tables stream and the `#Strings` heap, computes
//! the row width of every table that can precede the one it wants, and walks
//! directly to the requested row.
//!
//! Live modules are inspected through [`crate::metadata::import`] instead;
//! this reader only ever sees bytes from disk.
//!
//! # Reference
//! - [ECMA-335 II.24.2](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use std::ffi::CStr;

use strum::IntoEnumIterator;

use crate::{
    file::{io::read_le_at, parser::Parser},
    metadata::token::TableId,
    Error::OutOfBounds,
    Result,
};

/// The magic value at the start of physical metadata
pub const METADATA_SIGNATURE: u32 = 0x424A_5342;

/// `File` table flag: the file carries no metadata (pure resource files)
pub const FILE_CONTAINS_NO_METADATA: u32 = 0x0001;

/// `HeapSizes` bit: `#Strings` heap indexes are 4 bytes
const HEAP_LARGE_STRINGS: u8 = 0x01;
/// `HeapSizes` bit: `#GUID` heap indexes are 4 bytes
const HEAP_LARGE_GUID: u8 = 0x02;
/// `HeapSizes` bit: `#Blob` heap indexes are 4 bytes
const HEAP_LARGE_BLOB: u8 = 0x04;
/// `HeapSizes` bit: an extra 4-byte field follows the row counts
const HEAP_EXTRA_DATA: u8 = 0x40;

/// Coded index families used in physical row layouts, ECMA-335 II.24.2.6
#[derive(Clone, Copy, PartialEq, Debug, Eq, Hash)]
enum CodedIndexKind {
    TypeDefOrRef,
    HasConstant,
    HasCustomAttribute,
    HasFieldMarshal,
    HasDeclSecurity,
    MemberRefParent,
    HasSemantics,
    MethodDefOrRef,
    MemberForwarded,
    Implementation,
    CustomAttributeType,
    ResolutionScope,
    TypeOrMethodDef,
}

impl CodedIndexKind {
    /// The tables this family can reference, in tag order
    fn tables(self) -> &'static [TableId] {
        match self {
            CodedIndexKind::TypeDefOrRef => {
                &[TableId::TypeDef, TableId::TypeRef, TableId::TypeSpec]
            }
            CodedIndexKind::HasConstant => &[TableId::Field, TableId::Param, TableId::Property],
            CodedIndexKind::HasCustomAttribute => &[
                TableId::MethodDef,
                TableId::Field,
                TableId::TypeRef,
                TableId::TypeDef,
                TableId::Param,
                TableId::InterfaceImpl,
                TableId::MemberRef,
                TableId::Module,
                TableId::DeclSecurity,
                TableId::Property,
                TableId::Event,
                TableId::StandAloneSig,
                TableId::ModuleRef,
                TableId::TypeSpec,
                TableId::Assembly,
                TableId::AssemblyRef,
                TableId::File,
                TableId::ExportedType,
                TableId::ManifestResource,
                TableId::GenericParam,
                TableId::GenericParamConstraint,
                TableId::MethodSpec,
            ],
            CodedIndexKind::HasFieldMarshal => &[TableId::Field, TableId::Param],
            CodedIndexKind::HasDeclSecurity => {
                &[TableId::TypeDef, TableId::MethodDef, TableId::Assembly]
            }
            CodedIndexKind::MemberRefParent => &[
                TableId::TypeDef,
                TableId::TypeRef,
                TableId::ModuleRef,
                TableId::MethodDef,
                TableId::TypeSpec,
            ],
            CodedIndexKind::HasSemantics => &[TableId::Event, TableId::Property],
            CodedIndexKind::MethodDefOrRef => &[TableId::MethodDef, TableId::MemberRef],
            CodedIndexKind::MemberForwarded => &[TableId::Field, TableId::MethodDef],
            CodedIndexKind::Implementation => {
                &[TableId::File, TableId::AssemblyRef, TableId::ExportedType]
            }
            // Tags 0, 1 and 4 are reserved; padding with the neighbouring
            // table keeps the tag-width computation honest
            CodedIndexKind::CustomAttributeType => &[
                TableId::MethodDef,
                TableId::MethodDef,
                TableId::MethodDef,
                TableId::MemberRef,
                TableId::MemberRef,
            ],
            CodedIndexKind::ResolutionScope => &[
                TableId::Module,
                TableId::ModuleRef,
                TableId::AssemblyRef,
                TableId::TypeRef,
            ],
            CodedIndexKind::TypeOrMethodDef => &[TableId::TypeDef, TableId::MethodDef],
        }
    }

    /// Number of tag bits this family needs
    fn tag_bits(self) -> u32 {
        let len = self.tables().len() as u32;
        u32::BITS - (len - 1).leading_zeros()
    }
}

/// Row counts and index widths for one tables stream
struct TableLayout {
    rows: [u32; 45],
    heap_sizes: u8,
}

impl TableLayout {
    fn row_count(&self, id: TableId) -> u32 {
        self.rows[id as usize]
    }

    /// Width in bytes of an index into `id`
    fn index_bytes(&self, id: TableId) -> usize {
        if self.rows[id as usize] > 0xFFFF {
            4
        } else {
            2
        }
    }

    fn str_bytes(&self) -> usize {
        if self.heap_sizes & HEAP_LARGE_STRINGS != 0 {
            4
        } else {
            2
        }
    }

    fn guid_bytes(&self) -> usize {
        if self.heap_sizes & HEAP_LARGE_GUID != 0 {
            4
        } else {
            2
        }
    }

    fn blob_bytes(&self) -> usize {
        if self.heap_sizes & HEAP_LARGE_BLOB != 0 {
            4
        } else {
            2
        }
    }

    /// Width in bytes of a coded index of the given family
    fn coded_index_bytes(&self, kind: CodedIndexKind) -> usize {
        let tag_bits = kind.tag_bits();
        let max_rows = kind
            .tables()
            .iter()
            .map(|table| self.rows[*table as usize])
            .max()
            .unwrap_or(0);

        if max_rows >= 1 << (16 - tag_bits) {
            4
        } else {
            2
        }
    }

    /// Size in bytes of one row of `id`, ECMA-335 II.22
    fn row_size(&self, id: TableId) -> usize {
        let s = self.str_bytes();
        let g = self.guid_bytes();
        let b = self.blob_bytes();

        match id {
            TableId::Module => 2 + s + 3 * g,
            TableId::TypeRef => self.coded_index_bytes(CodedIndexKind::ResolutionScope) + 2 * s,
            TableId::TypeDef => {
                4 + 2 * s
                    + self.coded_index_bytes(CodedIndexKind::TypeDefOrRef)
                    + self.index_bytes(TableId::Field)
                    + self.index_bytes(TableId::MethodDef)
            }
            TableId::FieldPtr => self.index_bytes(TableId::Field),
            TableId::Field => 2 + s + b,
            TableId::MethodPtr => self.index_bytes(TableId::MethodDef),
            TableId::MethodDef => 4 + 2 + 2 + s + b + self.index_bytes(TableId::Param),
            TableId::ParamPtr => self.index_bytes(TableId::Param),
            TableId::Param => 2 + 2 + s,
            TableId::InterfaceImpl => {
                self.index_bytes(TableId::TypeDef)
                    + self.coded_index_bytes(CodedIndexKind::TypeDefOrRef)
            }
            TableId::MemberRef => {
                self.coded_index_bytes(CodedIndexKind::MemberRefParent) + s + b
            }
            TableId::Constant => 1 + 1 + self.coded_index_bytes(CodedIndexKind::HasConstant) + b,
            TableId::CustomAttribute => {
                self.coded_index_bytes(CodedIndexKind::HasCustomAttribute)
                    + self.coded_index_bytes(CodedIndexKind::CustomAttributeType)
                    + b
            }
            TableId::FieldMarshal => {
                self.coded_index_bytes(CodedIndexKind::HasFieldMarshal) + b
            }
            TableId::DeclSecurity => {
                2 + self.coded_index_bytes(CodedIndexKind::HasDeclSecurity) + b
            }
            TableId::ClassLayout => 2 + 4 + self.index_bytes(TableId::TypeDef),
            TableId::FieldLayout => 4 + self.index_bytes(TableId::Field),
            TableId::StandAloneSig => b,
            TableId::EventMap => {
                self.index_bytes(TableId::TypeDef) + self.index_bytes(TableId::Event)
            }
            TableId::EventPtr => self.index_bytes(TableId::Event),
            TableId::Event => 2 + s + self.coded_index_bytes(CodedIndexKind::TypeDefOrRef),
            TableId::PropertyMap => {
                self.index_bytes(TableId::TypeDef) + self.index_bytes(TableId::Property)
            }
            TableId::PropertyPtr => self.index_bytes(TableId::Property),
            TableId::Property => 2 + s + b,
            TableId::MethodSemantics => {
                2 + self.index_bytes(TableId::MethodDef)
                    + self.coded_index_bytes(CodedIndexKind::HasSemantics)
            }
            TableId::MethodImpl => {
                self.index_bytes(TableId::TypeDef)
                    + 2 * self.coded_index_bytes(CodedIndexKind::MethodDefOrRef)
            }
            TableId::ModuleRef => s,
            TableId::TypeSpec => b,
            TableId::ImplMap => {
                2 + self.coded_index_bytes(CodedIndexKind::MemberForwarded)
                    + s
                    + self.index_bytes(TableId::ModuleRef)
            }
            TableId::FieldRVA => 4 + self.index_bytes(TableId::Field),
            TableId::EncLog => 4 + 4,
            TableId::EncMap => 4,
            TableId::Assembly => 4 + 8 + 4 + b + 2 * s,
            TableId::AssemblyProcessor => 4,
            TableId::AssemblyOS => 12,
            TableId::AssemblyRef => 8 + 4 + b + 2 * s + b,
            TableId::AssemblyRefProcessor => 4 + self.index_bytes(TableId::AssemblyRef),
            TableId::AssemblyRefOS => 12 + self.index_bytes(TableId::AssemblyRef),
            TableId::File => 4 + s + b,
            TableId::ExportedType => {
                4 + 4 + 2 * s + self.coded_index_bytes(CodedIndexKind::Implementation)
            }
            TableId::ManifestResource => {
                4 + 4 + s + self.coded_index_bytes(CodedIndexKind::Implementation)
            }
            TableId::NestedClass => 2 * self.index_bytes(TableId::TypeDef),
            TableId::GenericParam => {
                2 + 2 + self.coded_index_bytes(CodedIndexKind::TypeOrMethodDef) + s
            }
            TableId::MethodSpec => self.coded_index_bytes(CodedIndexKind::MethodDefOrRef) + b,
            TableId::GenericParamConstraint => {
                self.index_bytes(TableId::GenericParam)
                    + self.coded_index_bytes(CodedIndexKind::TypeDefOrRef)
            }
        }
    }
}

/// One row of the `File` table, borrowed from the metadata
pub struct FileRow<'a> {
    /// Raw `FileAttributes` value
    pub flags: u32,
    /// File name, relative to the manifest module's directory
    pub name: &'a str,
}

impl FileRow<'_> {
    /// True if the referenced file carries metadata of its own. An entry
    /// point forwarded to a file without metadata cannot be resolved.
    #[must_use]
    pub fn contains_metadata(&self) -> bool {
        self.flags & FILE_CONTAINS_NO_METADATA == 0
    }
}

/// A borrowed view of one image's physical metadata
pub struct PhysicalMetadata<'a> {
    layout: TableLayout,
    /// Table rows, starting at the first row of the first present table
    table_data: &'a [u8],
    strings: &'a [u8],
}

impl<'a> PhysicalMetadata<'a> {
    /// Parses the metadata root and tables stream from a raw metadata blob,
    /// as located by the CLR header's `MetaData` directory entry.
    ///
    /// # Errors
    /// Returns an error if the signature does not match, a required stream
    /// is missing, or the stream directory points outside the blob.
    pub fn read(data: &'a [u8]) -> Result<PhysicalMetadata<'a>> {
        let mut parser = Parser::new(data);

        let signature = parser.read_le::<u32>()?;
        if signature != METADATA_SIGNATURE {
            return Err(malformed_error!(
                "Metadata signature does not match - 0x{:08X}",
                signature
            ));
        }

        // major, minor, reserved
        parser.advance_by(8)?;
        let version_length = parser.read_le::<u32>()? as usize;
        parser.advance_by(version_length)?;
        // flags
        parser.advance_by(2)?;
        let stream_count = parser.read_le::<u16>()?;
        if stream_count == 0 || stream_count > 16 {
            return Err(malformed_error!("Invalid stream count - {}", stream_count));
        }

        let mut tables_stream: Option<&[u8]> = None;
        let mut strings_stream: Option<&[u8]> = None;
        for _ in 0..stream_count {
            let offset = parser.read_le::<u32>()?;
            let size = parser.read_le::<u32>()?;
            let name = parser.read_string_utf8()?;
            parser.align(4)?;

            let end = match u32::checked_add(offset, size) {
                Some(end) if end as usize <= data.len() => end as usize,
                _ => {
                    return Err(malformed_error!(
                        "Stream '{}' exceeds metadata bounds - {} + {}",
                        name,
                        offset,
                        size
                    ))
                }
            };

            match name.as_str() {
                "#~" | "#-" => tables_stream = Some(&data[offset as usize..end]),
                "#Strings" => strings_stream = Some(&data[offset as usize..end]),
                _ => {}
            }
        }

        let Some(tables) = tables_stream else {
            return Err(malformed_error!("No tables stream present"));
        };
        let Some(strings) = strings_stream else {
            return Err(malformed_error!("No #Strings heap present"));
        };

        Self::read_tables(tables, strings)
    }

    fn read_tables(tables: &'a [u8], strings: &'a [u8]) -> Result<PhysicalMetadata<'a>> {
        if tables.len() < 24 {
            return Err(OutOfBounds);
        }

        let heap_sizes = tables[6];
        let valid = read_le_at::<u64>(tables, &mut 8)?;

        let mut rows = [0u32; 45];
        let mut offset = 24;
        for bit in 0..64u32 {
            if valid & (1 << bit) == 0 {
                continue;
            }

            let row_count = read_le_at::<u32>(tables, &mut offset)?;
            if let Some(id) = TableId::from_byte(bit as u8) {
                rows[id as usize] = row_count;
            }
        }

        if heap_sizes & HEAP_EXTRA_DATA != 0 {
            offset += 4;
        }
        if offset > tables.len() {
            return Err(OutOfBounds);
        }

        Ok(PhysicalMetadata {
            layout: TableLayout { rows, heap_sizes },
            table_data: &tables[offset..],
            strings,
        })
    }

    /// The number of rows in `id`, 0 when the table is absent
    #[must_use]
    pub fn row_count(&self, id: TableId) -> u32 {
        self.layout.row_count(id)
    }

    /// Byte offset of the first row of `id` within the table data
    fn table_offset(&self, id: TableId) -> usize {
        let mut offset = 0;
        for table in TableId::iter() {
            if table == id {
                break;
            }
            offset += self.layout.row_size(table) * self.layout.row_count(table) as usize;
        }
        offset
    }

    /// Reads one row of the `File` table by its 1-based row index.
    ///
    /// # Errors
    /// Returns an error if the row index is out of range or the row points
    /// at an invalid name.
    pub fn file_row(&self, rid: u32) -> Result<FileRow<'a>> {
        if rid == 0 || rid > self.layout.row_count(TableId::File) {
            return Err(OutOfBounds);
        }

        let row_size = self.layout.row_size(TableId::File);
        let mut offset = self.table_offset(TableId::File) + (rid as usize - 1) * row_size;

        let flags = read_le_at::<u32>(self.table_data, &mut offset)?;
        let name_index = if self.layout.str_bytes() == 4 {
            read_le_at::<u32>(self.table_data, &mut offset)?
        } else {
            u32::from(read_le_at::<u16>(self.table_data, &mut offset)?)
        };

        Ok(FileRow {
            flags,
            name: self.string(name_index)?,
        })
    }

    /// Looks up a `#Strings` heap entry by index
    fn string(&self, index: u32) -> Result<&'a str> {
        let index = index as usize;
        if index >= self.strings.len() {
            return Err(OutOfBounds);
        }

        match CStr::from_bytes_until_nul(&self.strings[index..]) {
            Ok(value) => value
                .to_str()
                .map_err(|_| malformed_error!("Invalid string at index - {}", index)),
            Err(_) => Err(malformed_error!("Unterminated string at index - {}", index)),
        }
    }
}
