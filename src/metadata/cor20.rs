//! CLR 2.0 (Cor20) header parsing.
//!
//! This module defines the [`Cor20Header`] struct, the main header of a .NET
//! image as found in the `IMAGE_DIRECTORY_ENTRY_COM_DESCRIPTOR` data
//! directory of PE files, together with the [`ComImageFlags`] that describe
//! how the runtime should treat the image.
//!
//! Validation is kept to the structural minimum. Images observed in live
//! processes routinely carry nonzero reserved fields and vendor flag bits,
//! and rejecting them here would turn a readable entry point into a missing
//! one.
//!
//! # Reference
//! - [ECMA-335 II.25.3.3](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use bitflags::bitflags;

use crate::{file::parser::Parser, metadata::token::Token, Error::OutOfBounds, Result};

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    /// Runtime flags from the Cor20 header, ECMA-335 II.25.3.3.1
    pub struct ComImageFlags : u32 {
        /// The image contains only IL code
        const ILONLY = 0x0000_0001;
        /// The image can only be loaded into a 32-bit process
        const REQUIRES_32BIT = 0x0000_0002;
        /// Obsolete, should not be set
        const IL_LIBRARY = 0x0000_0004;
        /// The image is signed with a strong name
        const STRONG_NAME_SIGNED = 0x0000_0008;
        /// The entry point field is a native RVA, not a metadata token
        const NATIVE_ENTRYPOINT = 0x0000_0010;
        /// The runtime should generate tracking information for debugging
        const TRACK_DEBUG_DATA = 0x0001_0000;
        /// Prefer a 32-bit process where the platform allows a choice
        const PREFER_32BIT = 0x0002_0000;
    }
}

/// The CLR header, located at the start of the `IMAGE_DIRECTORY_ENTRY_COM_DESCRIPTOR`
/// data directory of a PE file.
pub struct Cor20Header {
    /// Size of the header in bytes, always 72
    pub cb: u32,
    /// The minimum major runtime version required to run this program
    pub major_runtime_version: u16,
    /// The minor portion of the required runtime version
    pub minor_runtime_version: u16,
    /// RVA of the physical metadata
    pub meta_data_rva: u32,
    /// Size of the physical metadata
    pub meta_data_size: u32,
    /// Runtime flags for this image
    pub flags: ComImageFlags,
    /// `MethodDef` or `File` token of the managed entry point, or a native
    /// RVA when [`ComImageFlags::NATIVE_ENTRYPOINT`] is set
    pub entry_point_token_or_rva: u32,
    /// RVA of implementation specific resources
    pub resource_rva: u32,
    /// Size of implementation specific resources
    pub resource_size: u32,
    /// RVA of the strong name hash data
    pub strong_name_signature_rva: u32,
    /// Size of the strong name hash data
    pub strong_name_signature_size: u32,
    /// Reserved, 0 in well-formed images
    pub code_manager_table_rva: u32,
    /// Reserved, 0 in well-formed images
    pub code_manager_table_size: u32,
    /// RVA of the vtable fixup array for mixed-mode images
    pub vtable_fixups_rva: u32,
    /// Size of the vtable fixup array
    pub vtable_fixups_size: u32,
    /// Reserved, 0 in well-formed images
    pub export_address_table_jmp_rva: u32,
    /// Reserved, 0 in well-formed images
    pub export_address_table_jmp_size: u32,
    /// Reserved, 0 in well-formed images
    pub managed_native_header_rva: u32,
    /// Reserved, 0 in well-formed images
    pub managed_native_header_size: u32,
}

impl Cor20Header {
    /// Create a `Cor20Header` from a sequence of bytes
    ///
    /// # Arguments
    /// * `data` - The byte slice from which this object shall be created
    ///
    /// # Errors
    /// Returns an error if the data is too short to contain a CLR header,
    /// or if the declared header size is not 72.
    pub fn read(data: &[u8]) -> Result<Cor20Header> {
        if data.len() < 72 {
            return Err(OutOfBounds);
        }

        let mut parser = Parser::new(data);

        let cb = parser.read_le::<u32>()?;
        if cb != 72 {
            return Err(malformed_error!(
                "Invalid CLR header size: expected 72, got {}",
                cb
            ));
        }

        let major_runtime_version = parser.read_le::<u16>()?;
        let minor_runtime_version = parser.read_le::<u16>()?;
        let meta_data_rva = parser.read_le::<u32>()?;
        let meta_data_size = parser.read_le::<u32>()?;
        let flags = ComImageFlags::from_bits_retain(parser.read_le::<u32>()?);
        let entry_point_token_or_rva = parser.read_le::<u32>()?;
        let resource_rva = parser.read_le::<u32>()?;
        let resource_size = parser.read_le::<u32>()?;
        let strong_name_signature_rva = parser.read_le::<u32>()?;
        let strong_name_signature_size = parser.read_le::<u32>()?;
        let code_manager_table_rva = parser.read_le::<u32>()?;
        let code_manager_table_size = parser.read_le::<u32>()?;
        let vtable_fixups_rva = parser.read_le::<u32>()?;
        let vtable_fixups_size = parser.read_le::<u32>()?;
        let export_address_table_jmp_rva = parser.read_le::<u32>()?;
        let export_address_table_jmp_size = parser.read_le::<u32>()?;
        let managed_native_header_rva = parser.read_le::<u32>()?;
        let managed_native_header_size = parser.read_le::<u32>()?;

        Ok(Cor20Header {
            cb,
            major_runtime_version,
            minor_runtime_version,
            meta_data_rva,
            meta_data_size,
            flags,
            entry_point_token_or_rva,
            resource_rva,
            resource_size,
            strong_name_signature_rva,
            strong_name_signature_size,
            code_manager_table_rva,
            code_manager_table_size,
            vtable_fixups_rva,
            vtable_fixups_size,
            export_address_table_jmp_rva,
            export_address_table_jmp_size,
            managed_native_header_rva,
            managed_native_header_size,
        })
    }

    /// True if the entry point field is a native RVA instead of a token
    #[must_use]
    pub fn has_native_entry_point(&self) -> bool {
        self.flags.contains(ComImageFlags::NATIVE_ENTRYPOINT)
    }

    /// The managed entry point as a token, or `None` when the image uses a
    /// native entry point
    #[must_use]
    pub fn managed_entry_point(&self) -> Option<Token> {
        if self.has_native_entry_point() {
            None
        } else {
            Some(Token::new(self.entry_point_token_or_rva))
        }
    }
}
