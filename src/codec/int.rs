//! Endian-aware fixed-width integer encode/decode.
//!
//! Values are stored from the low `width` bytes of a `u64`; decoding either
//! zero-extends or sign-extends from the declared bit width.

use crate::{
    bits::{bitmask, sign_extend},
    buffer::Buffer,
    errors::AccessError,
};

/// Byte order of a multi-byte value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Endian {
    /// Most significant byte first (network order).
    Big,
    /// Least significant byte first.
    Little,
    /// Host order.
    Native,
    /// The opposite of host order.
    Swapped,
}

impl Endian {
    /// Host byte order, fixed at compile time.
    pub const NATIVE: Endian = if cfg!(target_endian = "big") {
        Endian::Big
    } else {
        Endian::Little
    };

    /// Resolves `Native`/`Swapped` to a concrete `Big` or `Little`.
    pub const fn resolve(self) -> Endian {
        match self {
            Endian::Big | Endian::Little => self,
            Endian::Native => Self::NATIVE,
            Endian::Swapped => match Self::NATIVE {
                Endian::Big => Endian::Little,
                _ => Endian::Big,
            },
        }
    }

    /// The opposite concrete order.
    pub const fn swapped(self) -> Endian {
        match self.resolve() {
            Endian::Big => Endian::Little,
            _ => Endian::Big,
        }
    }
}

/// Supported integer widths in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth {
    W8 = 1,
    W16 = 2,
    W24 = 3,
    W32 = 4,
    W48 = 6,
    W64 = 8,
}

impl IntWidth {
    pub const fn bytesize(self) -> usize {
        self as usize
    }

    pub const fn bits(self) -> usize {
        self.bytesize() * 8
    }

    pub const fn from_bytesize(bytesize: usize) -> Option<IntWidth> {
        match bytesize {
            1 => Some(IntWidth::W8),
            2 => Some(IntWidth::W16),
            3 => Some(IntWidth::W24),
            4 => Some(IntWidth::W32),
            6 => Some(IntWidth::W48),
            8 => Some(IntWidth::W64),
            _ => None,
        }
    }
}

/// Lays out the low `width` bytes of `value` in `endian` order.
pub fn to_bytes(value: u64, width: IntWidth, endian: Endian) -> ([u8; 8], usize) {
    let n = width.bytesize();
    let mut bytes = [0u8; 8];

    match endian.resolve() {
        Endian::Big => {
            for (i, byte) in bytes[..n].iter_mut().enumerate() {
                *byte = (value >> ((n - 1 - i) * 8)) as u8;
            }
        }
        _ => {
            for (i, byte) in bytes[..n].iter_mut().enumerate() {
                *byte = (value >> (i * 8)) as u8;
            }
        }
    }

    (bytes, n)
}

/// Inverse of [`to_bytes`]; `bytes` must be exactly `width` long.
pub fn from_bytes(bytes: &[u8], endian: Endian) -> u64 {
    match endian.resolve() {
        Endian::Big => bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64),
        _ => bytes.iter().rev().fold(0u64, |acc, &b| (acc << 8) | b as u64),
    }
}

/// Stores `value` (wrapped to `width`) at `index`.
pub fn store(
    buffer: &mut dyn Buffer,
    index: usize,
    width: IntWidth,
    endian: Endian,
    value: u64,
) -> Result<(), AccessError> {
    let (bytes, n) = to_bytes(value & bitmask(width.bits()), width, endian);
    buffer.write_slice(index, &bytes[..n])
}

/// Loads a zero-extended value of `width` bytes. Never reads past `index + width`.
pub fn load_unsigned(
    buffer: &dyn Buffer,
    index: usize,
    width: IntWidth,
    endian: Endian,
) -> Result<u64, AccessError> {
    let mut bytes = [0u8; 8];
    let n = width.bytesize();
    buffer.read_slice(index, &mut bytes[..n])?;
    Ok(from_bytes(&bytes[..n], endian))
}

/// Loads a two's-complement value of `width` bytes, sign-extended to 64 bits.
pub fn load_signed(
    buffer: &dyn Buffer,
    index: usize,
    width: IntWidth,
    endian: Endian,
) -> Result<i64, AccessError> {
    load_unsigned(buffer, index, width, endian).map(|v| sign_extend(v, width.bits()))
}

macro_rules! endian_shorthands {
    ($($endian:ident => $store:ident, $load_u:ident, $load_i:ident;)+) => {
        $(
            pub fn $store(
                buffer: &mut dyn Buffer,
                index: usize,
                width: IntWidth,
                value: u64,
            ) -> Result<(), AccessError> {
                store(buffer, index, width, Endian::$endian, value)
            }

            pub fn $load_u(buffer: &dyn Buffer, index: usize, width: IntWidth) -> Result<u64, AccessError> {
                load_unsigned(buffer, index, width, Endian::$endian)
            }

            pub fn $load_i(buffer: &dyn Buffer, index: usize, width: IntWidth) -> Result<i64, AccessError> {
                load_signed(buffer, index, width, Endian::$endian)
            }
        )+
    };
}

endian_shorthands! {
    Big => store_be, load_unsigned_be, load_signed_be;
    Little => store_le, load_unsigned_le, load_signed_le;
    Native => store_native, load_unsigned_native, load_signed_native;
    Swapped => store_swapped, load_unsigned_swapped, load_signed_swapped;
}
