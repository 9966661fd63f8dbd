//! Safe numeric reads from byte buffers.
//!
//! Everything the engine parses — PE headers, metadata streams, signature blobs, and raw
//! value buffers captured from the debuggee — arrives as `&[u8]`. This module provides the
//! [`crate::file::io::ByteIO`] trait plus bounds-checked free functions for decoding numeric
//! types from such buffers in little-endian (the CLR's on-disk and in-memory order) or
//! big-endian byte order.
//!
//! The deliberate omission: there are no `usize`/`isize` implementations. Reads sized by the
//! debuggee's pointer width must pick `u32` or `u64` explicitly from the debuggee's
//! architecture, never from the host's.

use crate::{Error::OutOfBounds, Result};

/// Trait for type-specific safe binary reads.
///
/// Implemented for the fixed-width primitive types that occur in PE images, metadata and
/// debuggee value buffers. Each implementation ties the type to its byte-array form and the
/// endian conversions for it.
pub trait ByteIO: Sized {
    /// The fixed-size byte array this type decodes from.
    type Bytes: Sized + for<'a> TryFrom<&'a [u8]>;

    /// Read `Self` from a byte buffer in little-endian
    fn from_le_bytes(bytes: Self::Bytes) -> Self;
    /// Read `Self` from a byte buffer in big-endian
    fn from_be_bytes(bytes: Self::Bytes) -> Self;
}

macro_rules! impl_byte_io {
    ($($ty:ty => $len:expr),+ $(,)?) => {
        $(
            impl ByteIO for $ty {
                type Bytes = [u8; $len];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }

                fn from_be_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_be_bytes(bytes)
                }
            }
        )+
    };
}

impl_byte_io!(
    u8 => 1, i8 => 1,
    u16 => 2, i16 => 2,
    u32 => 4, i32 => 4,
    u64 => 8, i64 => 8,
    f32 => 4, f64 => 8,
);

/// Safely reads a value of type `T` in little-endian byte order from the start of a buffer.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_le<T: ByteIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_le_at(data, &mut offset)
}

/// Safely reads a value of type `T` in little-endian byte order at `offset`, advancing it.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes at `offset`.
pub fn read_le_at<T: ByteIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    if (type_len + *offset) > data.len() {
        return Err(OutOfBounds);
    }

    let Ok(read) = data[*offset..*offset + type_len].try_into() else {
        return Err(OutOfBounds);
    };

    *offset += type_len;

    Ok(T::from_le_bytes(read))
}

/// Reads either a 2-byte or 4-byte little-endian value, promoted to `u32`.
///
/// Metadata table columns switch between 2 and 4 byte index encodings depending on heap and
/// row-count sizes; `is_large` selects which width this column uses.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes at `offset`.
pub fn read_le_at_dyn(data: &[u8], offset: &mut usize, is_large: bool) -> Result<u32> {
    let res = if is_large {
        read_le_at::<u32>(data, offset)?
    } else {
        u32::from(read_le_at::<u16>(data, offset)?)
    };

    Ok(res)
}

/// Safely reads a value of type `T` in big-endian byte order at `offset`, advancing it.
///
/// PE and metadata are little-endian throughout; this exists for the odd big-endian field
/// (metadata stream signatures are checked both ways by some tools).
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes at `offset`.
pub fn read_be_at<T: ByteIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    if (type_len + *offset) > data.len() {
        return Err(OutOfBounds);
    }

    let Ok(read) = data[*offset..*offset + type_len].try_into() else {
        return Err(OutOfBounds);
    };

    *offset += type_len;

    Ok(T::from_be_bytes(read))
}
