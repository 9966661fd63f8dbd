//! Low-level byte stream parser for metadata and signature decoding.
//!
//! This module provides the [`crate::file::parser::Parser`] type, a cursor-based binary
//! parser for the structures the engine reads from disk images and metadata blobs: COR20
//! headers, physical metadata streams, and ECMA-335 signature encodings (compressed
//! integers, coded tokens, null-terminated names).
//!
//! The parser maintains a position within a borrowed byte slice; every operation is
//! bounds-checked so that truncated or hostile input surfaces as [`crate::Error::OutOfBounds`]
//! or [`crate::Error::Malformed`], never as a panic.
//!
//! # Usage Examples
//!
//! ```rust
//! use dotprobe::file::Parser;
//!
//! let data = [0x01, 0x02, 0x03, 0x04];
//! let mut parser = Parser::new(&data);
//!
//! let value = parser.read_le::<u16>()?;
//! assert_eq!(value, 0x0201);
//!
//! parser.seek(2)?;
//! assert_eq!(parser.read_le::<u16>()?, 0x0403);
//! # Ok::<(), dotprobe::Error>(())
//! ```

use crate::{
    file::io::{read_be_at, read_le_at, ByteIO},
    metadata::token::Token,
    Error::OutOfBounds,
    Result,
};

/// A cursor-based parser for binary metadata structures.
///
/// `Parser` provides bounds-checked sequential and random access reads over a byte slice,
/// in both little-endian and big-endian order, plus the variable-length encodings defined
/// by ECMA-335 II.23.2 (compressed integers and `TypeDefOrRefOrSpec` coded tokens).
///
/// # Examples
///
/// ```rust
/// use dotprobe::file::Parser;
///
/// // Field signature: FIELD (0x06) followed by ELEMENT_TYPE_I4 (0x08)
/// let sig = [0x06, 0x08];
/// let mut parser = Parser::new(&sig);
/// assert_eq!(parser.read_le::<u8>()?, 0x06);
/// assert_eq!(parser.read_le::<u8>()?, 0x08);
/// # Ok::<(), dotprobe::Error>(())
/// ```
pub struct Parser<'a> {
    /// The binary data being parsed
    data: &'a [u8],
    /// Current position within the data buffer
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new parser over `data`, positioned at the start.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Length of the underlying data buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the underlying data buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` if there are unread bytes left.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Move the current position to the specified index.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the position is beyond the data length.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos >= self.data.len() {
            return Err(OutOfBounds);
        }

        self.position = pos;
        Ok(())
    }

    /// Move the position forward by one byte.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if advancing would exceed the data length.
    pub fn advance(&mut self) -> Result<()> {
        self.advance_by(1)
    }

    /// Move the position forward by the specified number of bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if advancing by `step` would exceed the data length.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        if self.position + step > self.data.len() {
            return Err(OutOfBounds);
        }

        self.position += step;
        Ok(())
    }

    /// Current position within the data buffer.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Number of unread bytes from the current position.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Access to the underlying data buffer.
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Peek at the next byte without advancing the position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the position is at or beyond the data length.
    pub fn peek_byte(&self) -> Result<u8> {
        if self.position >= self.data.len() {
            return Err(OutOfBounds);
        }
        Ok(self.data[self.position])
    }

    /// Align the position to the next multiple of `alignment`.
    ///
    /// Metadata stream headers pad names to 4-byte boundaries; this advances past
    /// such padding.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the padding would exceed the data length.
    pub fn align(&mut self, alignment: usize) -> Result<()> {
        let padding = (alignment - (self.position % alignment)) % alignment;
        if self.position + padding > self.data.len() {
            return Err(OutOfBounds);
        }
        self.position += padding;
        Ok(())
    }

    /// Read a type `T` from the current position in little-endian format and advance.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if reading would exceed the data length.
    pub fn read_le<T: ByteIO>(&mut self) -> Result<T> {
        read_le_at::<T>(self.data, &mut self.position)
    }

    /// Read a type `T` from the current position in big-endian format and advance.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if reading would exceed the data length.
    pub fn read_be<T: ByteIO>(&mut self) -> Result<T> {
        read_be_at::<T>(self.data, &mut self.position)
    }

    /// Read `length` raw bytes and advance.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `length` bytes remain.
    pub fn read_bytes(&mut self, length: usize) -> Result<&'a [u8]> {
        if self.position + length > self.data.len() {
            return Err(OutOfBounds);
        }

        let bytes = &self.data[self.position..self.position + length];
        self.position += length;
        Ok(bytes)
    }

    /// Read a compressed unsigned integer as defined in ECMA-335 II.23.2.
    ///
    /// Compressed integers use variable-length encoding to efficiently store small values:
    /// - Values 0-127: 1 byte (`0xxxxxxx`)
    /// - Values 128-16383: 2 bytes (`10xxxxxx xxxxxxxx`)
    /// - Values 16384-536870911: 4 bytes (`11xxxxxx xxxxxxxx xxxxxxxx xxxxxxxx`)
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if reading would exceed the data length or
    /// [`crate::Error::Malformed`] for an invalid compressed uint format.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dotprobe::file::Parser;
    ///
    /// let data = [0x7F]; // 127, single byte form
    /// let mut parser = Parser::new(&data);
    /// assert_eq!(parser.read_compressed_uint()?, 127);
    ///
    /// let data = [0x80, 0x80]; // 128, two byte form
    /// let mut parser = Parser::new(&data);
    /// assert_eq!(parser.read_compressed_uint()?, 128);
    /// # Ok::<(), dotprobe::Error>(())
    /// ```
    pub fn read_compressed_uint(&mut self) -> Result<u32> {
        let first_byte = self.read_le::<u8>()?;

        // 1-byte encoding: 0xxxxxxx
        if (first_byte & 0x80) == 0 {
            return Ok(u32::from(first_byte));
        }

        // 2-byte encoding: 10xxxxxx xxxxxxxx
        if (first_byte & 0xC0) == 0x80 {
            let second_byte = self.read_le::<u8>()?;
            let value = ((u32::from(first_byte) & 0x3F) << 8) | u32::from(second_byte);
            return Ok(value);
        }

        // 4-byte encoding: 11xxxxxx xxxxxxxx xxxxxxxx xxxxxxxx
        if (first_byte & 0xE0) == 0xC0 {
            let b1 = u32::from(self.read_le::<u8>()?);
            let b2 = u32::from(self.read_le::<u8>()?);
            let b3 = u32::from(self.read_le::<u8>()?);
            let value = ((u32::from(first_byte) & 0x1F) << 24) | (b1 << 16) | (b2 << 8) | b3;
            return Ok(value);
        }

        Err(malformed_error!("Invalid compressed uint - {}", first_byte))
    }

    /// Read a compressed signed integer as defined in ECMA-335 II.23.2.
    ///
    /// The sign lives in the least significant bit; the remaining bits hold the
    /// magnitude, rotated. Used for array lower bounds in signatures.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if reading would exceed the data length or
    /// [`crate::Error::Malformed`] for an invalid encoding.
    pub fn read_compressed_int(&mut self) -> Result<i32> {
        let unsigned = self.read_compressed_uint()?;

        let signed = if (unsigned & 1) == 0 {
            #[allow(clippy::cast_possible_wrap)]
            let result = (unsigned >> 1) as i32;
            result
        } else {
            #[allow(clippy::cast_possible_wrap)]
            let result = -((unsigned >> 1) as i32 + 1);
            result
        };

        Ok(signed)
    }

    /// Read a compressed token as defined in ECMA-335 II.23.2.8 (`TypeDefOrRefOrSpecEncoded`).
    ///
    /// The 2 lowest bits select the table, the rest is the row index:
    ///
    /// | Tag | Table | Token Prefix |
    /// |-----|-------|--------------|
    /// | 0x0 | TypeDef | `0x0200_0000` |
    /// | 0x1 | TypeRef | `0x0100_0000` |
    /// | 0x2 | TypeSpec | `0x1B00_0000` |
    /// | 0x3 | (reserved/invalid) | - |
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if reading would exceed the data length or
    /// [`crate::Error::Malformed`] if the reserved tag 0x3 is encountered.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dotprobe::file::Parser;
    ///
    /// // TypeRef row 1: (1 << 2) | 0x1 = 5
    /// let data = [5];
    /// let mut parser = Parser::new(&data);
    /// let token = parser.read_compressed_token()?;
    /// assert_eq!(token.value(), 0x0100_0001);
    /// # Ok::<(), dotprobe::Error>(())
    /// ```
    pub fn read_compressed_token(&mut self) -> Result<Token> {
        let compressed_token = self.read_compressed_uint()?;

        let table: u32 = match compressed_token & 0x3 {
            0x0 => 0x0200_0000, // TypeDef
            0x1 => 0x0100_0000, // TypeRef
            0x2 => 0x1B00_0000, // TypeSpec
            _ => {
                return Err(malformed_error!(
                    "Invalid compressed token - {}",
                    compressed_token
                ))
            }
        };

        let table_index = compressed_token >> 2;

        Ok(Token::new(table + table_index))
    }

    /// Read a UTF-8 encoded null-terminated string.
    ///
    /// Reads bytes until a null terminator (or the end of the buffer, which is a valid
    /// unterminated case for heap-resident strings), then decodes as UTF-8. The position
    /// advances past the terminator when one was found.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for invalid UTF-8 bytes.
    pub fn read_string_utf8(&mut self) -> Result<String> {
        let start = self.position;
        let mut end = start;

        while end < self.data.len() && self.data[end] != 0 {
            end += 1;
        }

        let string_data = &self.data[start..end];

        if end < self.data.len() {
            self.position = end + 1;
        } else {
            self.position = end;
        }

        String::from_utf8(string_data.to_vec()).map_err(|e| {
            malformed_error!(
                "Invalid UTF-8 string at offset {}-{}: {}",
                start,
                end,
                e.utf8_error()
            )
        })
    }
}
