//! `System.Decimal` reconstructed from debuggee memory.
//!
//! A decimal is a 96-bit unsigned mantissa, a scale of 0..=28 and a
//! sign, packed into four 32-bit words. The in-memory order is not the
//! `GetBits` order: memory holds `flags, hi, lo, mid` while `GetBits`
//! reports `[lo, mid, hi, flags]`. The reordering in
//! [`Decimal::from_debuggee_bytes`] encodes exactly that layout and is
//! load-bearing; a "simplified" order decodes real debuggee memory into
//! garbage numbers.

use crate::file::io::read_le_at;

const SIGN_MASK: u32 = 0x8000_0000;
const SCALE_MASK: u32 = 0x00FF_0000;
const SCALE_SHIFT: u32 = 16;
const MAX_SCALE: u32 = 28;

/// A `System.Decimal` value, stored in the `GetBits` word order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decimal {
    lo: u32,
    mid: u32,
    hi: u32,
    flags: u32,
}

impl Decimal {
    /// Builds a decimal from the `GetBits` order `[lo, mid, hi, flags]`,
    /// applying the same validation as the `System.Decimal(int[])`
    /// constructor: no bits outside sign and scale, scale at most 28.
    #[must_use]
    pub fn from_bits(bits: [i32; 4]) -> Option<Decimal> {
        let flags = bits[3] as u32;
        if flags & !(SIGN_MASK | SCALE_MASK) != 0 {
            return None;
        }
        if (flags & SCALE_MASK) >> SCALE_SHIFT > MAX_SCALE {
            return None;
        }

        Some(Decimal {
            lo: bits[0] as u32,
            mid: bits[1] as u32,
            hi: bits[2] as u32,
            flags,
        })
    }

    /// Decodes the 16-byte in-memory form: little-endian 32-bit words at
    /// offsets 0, 4, 8, 12 are `flags`, `hi`, `lo`, `mid` — `GetBits`
    /// indices 3, 2, 0, 1. Wrong length or invalid flag bits read as
    /// `None`, never as a different number.
    #[must_use]
    pub fn from_debuggee_bytes(data: &[u8]) -> Option<Decimal> {
        if data.len() != 16 {
            return None;
        }

        let mut offset = 0;
        let mut bits = [0_i32; 4];
        bits[3] = read_le_at::<i32>(data, &mut offset).ok()?;
        bits[2] = read_le_at::<i32>(data, &mut offset).ok()?;
        bits[0] = read_le_at::<i32>(data, &mut offset).ok()?;
        bits[1] = read_le_at::<i32>(data, &mut offset).ok()?;

        Decimal::from_bits(bits)
    }

    /// The words in `GetBits` order `[lo, mid, hi, flags]`.
    #[must_use]
    pub fn bits(&self) -> [i32; 4] {
        [
            self.lo as i32,
            self.mid as i32,
            self.hi as i32,
            self.flags as i32,
        ]
    }

    /// Number of digits after the decimal point, 0..=28.
    #[must_use]
    pub fn scale(&self) -> u32 {
        (self.flags & SCALE_MASK) >> SCALE_SHIFT
    }

    /// Whether the value is negative. `-0` exists and is negative here,
    /// matching the bit pattern rather than numeric equality.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.flags & SIGN_MASK != 0
    }

    fn mantissa(&self) -> u128 {
        (u128::from(self.hi) << 64) | (u128::from(self.mid) << 32) | u128::from(self.lo)
    }
}

impl std::fmt::Display for Decimal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let digits = self.mantissa().to_string();
        let scale = self.scale() as usize;
        let sign = if self.is_negative() { "-" } else { "" };

        if scale == 0 {
            return write!(f, "{sign}{digits}");
        }
        if digits.len() > scale {
            let (int_part, frac_part) = digits.split_at(digits.len() - scale);
            write!(f, "{sign}{int_part}.{frac_part}")
        } else {
            // All digits are fractional, pad with leading zeros
            write!(f, "{sign}0.{digits:0>scale$}")
        }
    }
}
