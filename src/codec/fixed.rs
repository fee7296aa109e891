//! Q-format fixed point: a real number scaled by `2^fraction_bits` and stored as an integer.

use crate::{
    buffer::Buffer,
    codec::int::{self, Endian, IntWidth},
    codec::float::ldexp,
    errors::AccessError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedFormat {
    pub width: IntWidth,
    pub signed: bool,
    pub fraction_bits: u32,
}

impl FixedFormat {
    pub const fn new(width: IntWidth, signed: bool, fraction_bits: u32) -> Self {
        FixedFormat {
            width,
            signed,
            fraction_bits,
        }
    }

    /// Scales and truncates toward zero. The result wraps to the integer width when stored.
    pub fn quantize(&self, value: f64) -> u64 {
        let scaled = ldexp(value, self.fraction_bits as i32);
        if self.signed || scaled < 0.0 {
            scaled as i64 as u64
        } else {
            scaled as u64
        }
    }

    pub fn dequantize(&self, raw: u64) -> f64 {
        let raw = if self.signed {
            crate::bits::sign_extend(raw, self.width.bits()) as f64
        } else {
            raw as f64
        };

        ldexp(raw, -(self.fraction_bits as i32))
    }

    pub fn encode(
        &self,
        buffer: &mut dyn Buffer,
        index: usize,
        endian: Endian,
        value: f64,
    ) -> Result<(), AccessError> {
        int::store(buffer, index, self.width, endian, self.quantize(value))
    }

    pub fn decode(&self, buffer: &dyn Buffer, index: usize, endian: Endian) -> Result<f64, AccessError> {
        int::load_unsigned(buffer, index, self.width, endian).map(|raw| self.dequantize(raw))
    }
}
