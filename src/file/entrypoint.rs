//! Managed entry point resolution for on-disk images.
//!
//! Before a debugged process has loaded anything, the startup sequencer has
//! to decide where the first breakpoint goes. The answer lives in the image
//! on disk: the CLR header names a `MethodDef` token, or forwards to another
//! member file through the `File` table, or declares a native entry point.
//!
//! Resolution is deliberately forgiving. Anything unreadable - a missing
//! CLR directory, a truncated header, a `File` row without metadata - turns
//! into the null token rather than an error, and the sequencer falls back
//! to breaking on module load. Only the initial file open reports I/O
//! failures, so a mistyped path is not mistaken for a native image.

use std::{fs, path::Path};

use goblin::pe::PE;
use memmap2::Mmap;

use crate::{
    metadata::{
        cor20::Cor20Header,
        physical::PhysicalMetadata,
        token::{TableId, Token},
    },
    Error::{Error, FileError},
    Result,
};

/// The resolved managed entry point of an image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    /// Entry point token, usually a `MethodDef`. The null token when the
    /// image has no resolvable managed entry point.
    pub token: Token,
    /// Name of the member file the entry point forwards to, set when the
    /// token references the `File` table
    pub other_module: Option<String>,
}

impl EntryPoint {
    fn none() -> Self {
        EntryPoint {
            token: Token(0),
            other_module: None,
        }
    }

    /// True if no managed entry point could be resolved
    #[must_use]
    pub fn is_none(&self) -> bool {
        self.token.is_null()
    }
}

/// Resolves the managed entry point of the image at `path`.
///
/// # Errors
/// Returns an error if the file cannot be opened or mapped. Parse failures
/// inside a readable file do not error, they resolve to the null token.
pub fn entry_point_token(path: &Path) -> Result<EntryPoint> {
    let file = match fs::File::open(path) {
        Ok(file) => file,
        Err(error) => return Err(FileError(error)),
    };

    let mmap = match unsafe { Mmap::map(&file) } {
        Ok(mmap) => mmap,
        Err(error) => return Err(Error(error.to_string())),
    };

    Ok(entry_point_from_bytes(&mmap))
}

/// Resolves the managed entry point from raw image bytes.
///
/// The token is returned exactly as stored, including tables other than
/// `MethodDef`; callers decide what a non-method token means for them. A
/// `File` table token additionally carries the referenced file's name, so
/// the caller can chase the entry point into the other module.
#[must_use]
pub fn entry_point_from_bytes(data: &[u8]) -> EntryPoint {
    let Ok(pe) = PE::parse(data) else {
        return EntryPoint::none();
    };

    let Some(optional_header) = pe.header.optional_header else {
        return EntryPoint::none();
    };
    let Some(clr_dir) = optional_header.data_directories.get_clr_runtime_header() else {
        return EntryPoint::none();
    };
    if clr_dir.virtual_address == 0 || clr_dir.size < 0x48 {
        return EntryPoint::none();
    }

    let Some(clr_offset) = rva_to_offset(&pe, clr_dir.virtual_address) else {
        return EntryPoint::none();
    };
    if clr_offset + 72 > data.len() {
        return EntryPoint::none();
    }
    let Ok(cor20) = Cor20Header::read(&data[clr_offset..]) else {
        return EntryPoint::none();
    };

    let Some(token) = cor20.managed_entry_point() else {
        return EntryPoint::none();
    };
    if token.table_id() != Some(TableId::File) {
        return EntryPoint {
            token,
            other_module: None,
        };
    }

    // The entry point lives in another member file of this assembly. Keep
    // the File token and surface the file's name so the caller can resolve
    // against that image instead.
    match resolve_file_name(&pe, data, &cor20, token.row()) {
        Some(name) => EntryPoint {
            token,
            other_module: Some(name),
        },
        None => EntryPoint::none(),
    }
}

fn resolve_file_name(pe: &PE, data: &[u8], cor20: &Cor20Header, rid: u32) -> Option<String> {
    let offset = rva_to_offset(pe, cor20.meta_data_rva)?;
    let end = offset.checked_add(cor20.meta_data_size as usize)?;
    if end > data.len() {
        return None;
    }

    let metadata = PhysicalMetadata::read(&data[offset..end]).ok()?;
    let file = metadata.file_row(rid).ok()?;
    if !file.contains_metadata() {
        return None;
    }

    Some(file.name.to_string())
}

/// Maps an RVA to a file offset through the section table. An RVA on the
/// exact section start is inside the section.
fn rva_to_offset(pe: &PE, rva: u32) -> Option<usize> {
    for section in &pe.sections {
        let Some(section_max) = section.virtual_address.checked_add(section.virtual_size) else {
            continue;
        };

        if section.virtual_address <= rva && rva < section_max {
            return Some(
                (rva - section.virtual_address) as usize + section.pointer_to_raw_data as usize,
            );
        }
    }

    None
}
