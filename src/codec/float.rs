//! Software IEEE-754 binary16/32/64 encoding.
//!
//! Values are packed bit by bit from a frexp-style decomposition, so the same
//! routine serves every format. Subnormals are not produced: a result whose
//! biased exponent would be zero or below becomes a signed zero, and one at or
//! above the all-ones exponent becomes a signed infinity.

use crate::bits::bitmask;

/// Bit layout of a binary floating point format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FloatFormat {
    pub total_bits: u32,
    pub exponent_bits: u32,
    pub fraction_bits: u32,
}

pub const BINARY16: FloatFormat = FloatFormat::new(16, 5, 10);
pub const BINARY32: FloatFormat = FloatFormat::new(32, 8, 23);
pub const BINARY64: FloatFormat = FloatFormat::new(64, 11, 52);

const TWO_POW_64: f64 = 18446744073709551616.0;

impl FloatFormat {
    pub const fn new(total_bits: u32, exponent_bits: u32, fraction_bits: u32) -> Self {
        FloatFormat {
            total_bits,
            exponent_bits,
            fraction_bits,
        }
    }

    pub const fn bytesize(&self) -> usize {
        (self.total_bits / 8) as usize
    }

    fn sign_bit(&self) -> u64 {
        1u64 << (self.exponent_bits + self.fraction_bits)
    }

    fn exponent_mask(&self) -> u64 {
        bitmask(self.exponent_bits as usize)
    }

    fn fraction_mask(&self) -> u64 {
        bitmask(self.fraction_bits as usize)
    }

    /// Bias relative to a significand in `[0.5, 1)`.
    fn exponent_bias(&self) -> i64 {
        (self.exponent_mask() >> 1) as i64 - 1
    }

    /// Canonical quiet NaN: all-ones exponent, top fraction bit set.
    pub fn quiet_nan(&self) -> u64 {
        (self.exponent_mask() << self.fraction_bits) | (1u64 << (self.fraction_bits - 1))
    }

    pub fn infinity(&self) -> u64 {
        self.exponent_mask() << self.fraction_bits
    }

    /// Encodes `num` into the low `total_bits` of the result.
    pub fn pack(&self, num: f64) -> u64 {
        if num.is_nan() {
            return self.quiet_nan();
        }

        let sign = if num.is_sign_negative() { self.sign_bit() } else { 0 };
        if num == 0.0 {
            return sign;
        }
        if num.is_infinite() {
            return sign | self.infinity();
        }

        let (significand, e) = frexp(num.abs());
        let biased = e as i64 + self.exponent_bias();
        if biased >= self.exponent_mask() as i64 {
            return sign | self.infinity();
        }
        if biased <= 0 {
            return sign;
        }

        let scale = ldexp(1.0, self.fraction_bits as i32 + 1);
        let fraction = (significand * scale) as u64 & self.fraction_mask();

        sign | ((biased as u64) << self.fraction_bits) | fraction
    }

    /// Decodes the low `total_bits` of `bits`.
    pub fn unpack(&self, bits: u64) -> f64 {
        let negative = bits & self.sign_bit() != 0;
        let exponent = (bits >> self.fraction_bits) & self.exponent_mask();
        let fraction = bits & self.fraction_mask();

        let magnitude = if exponent == 0 {
            0.0
        } else if exponent == self.exponent_mask() {
            if fraction != 0 {
                return f64::NAN;
            }
            f64::INFINITY
        } else {
            let significand = (fraction | (1u64 << self.fraction_bits)) as f64
                / ldexp(1.0, self.fraction_bits as i32 + 1);
            ldexp(significand, (exponent as i64 - self.exponent_bias()) as i32)
        };

        if negative { -magnitude } else { magnitude }
    }
}

/// Splits a finite non-zero `x` into `(m, e)` with `x == m * 2^e` and `0.5 <= |m| < 1`.
pub fn frexp(x: f64) -> (f64, i32) {
    if x == 0.0 || !x.is_finite() {
        return (x, 0);
    }

    let bits = x.to_bits();
    let exponent = ((bits >> 52) & 0x7ff) as i32;
    if exponent == 0 {
        let (m, e) = frexp(x * TWO_POW_64);
        return (m, e - 64);
    }

    let m = f64::from_bits((bits & !(0x7ffu64 << 52)) | (1022u64 << 52));
    (m, exponent - 1022)
}

/// Computes `x * 2^e` without overflowing the intermediate power.
pub fn ldexp(mut x: f64, mut e: i32) -> f64 {
    while e > 1000 {
        x *= 2f64.powi(1000);
        e -= 1000;
    }
    while e < -1000 {
        x *= 2f64.powi(-1000);
        e += 1000;
    }

    x * 2f64.powi(e)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_pack_binary16() {
        assert_eq!(BINARY16.pack(0.0), 0x0000);
        assert_eq!(BINARY16.pack(-0.0), 0x8000);
        assert_eq!(BINARY16.pack(0.5), 0x3800);
        assert_eq!(BINARY16.pack(1.0), 0x3c00);
        assert_eq!(BINARY16.pack(2.0), 0x4000);
        assert_eq!(BINARY16.pack(f64::INFINITY), 0x7c00);
        assert_eq!(BINARY16.pack(f64::NEG_INFINITY), 0xfc00);
        assert_eq!(BINARY16.pack(f64::NAN), 0x7e00);
        assert_eq!(BINARY16.pack(65536.0), 0x7c00);
    }

    #[test]
    fn test_pack_binary16_overflow_is_infinity() {
        assert_eq!(BINARY16.pack(98304.0), 0x7c00);
        assert_eq!(BINARY16.pack(-1.0e10), 0xfc00);
        assert_eq!(BINARY16.pack(65504.0), 0x7bff);
    }

    #[test]
    fn test_pack_underflow_is_signed_zero() {
        assert_eq!(BINARY16.pack(1.0e-6), 0x0000);
        assert_eq!(BINARY16.pack(-1.0e-6), 0x8000);
        assert_eq!(BINARY32.pack(1.0e-40), 0);
    }

    #[test]
    fn test_unpack_binary16() {
        assert_eq!(BINARY16.unpack(0x7c00), f64::INFINITY);
        assert_eq!(BINARY16.unpack(0xfc00), f64::NEG_INFINITY);
        assert!(BINARY16.unpack(0x7e00).is_nan());
        assert!(BINARY16.unpack(0xfe00).is_nan());
        assert!(BINARY16.unpack(0x8000).is_sign_negative());
        assert_eq!(BINARY16.unpack(0x0000), 0.0);
        assert_eq!(BINARY16.unpack(0x3800), 0.5);
        assert_eq!(BINARY16.unpack(0x3c00), 1.0);
        assert_eq!(BINARY16.unpack(0x4000), 2.0);
        assert_eq!(BINARY16.unpack(0x3fff), 0x07ff as f64 / 0x0400 as f64);
    }

    #[test]
    fn test_unpack_binary32() {
        assert_eq!(BINARY32.unpack(0x7f80_0000), f64::INFINITY);
        assert_eq!(BINARY32.unpack(0xff80_0000), f64::NEG_INFINITY);
        assert!(BINARY32.unpack(0x7fc0_0000).is_nan());
        assert!(BINARY32.unpack(0x8000_0000).is_sign_negative());
        assert_eq!(BINARY32.unpack(0x3f00_0000), 0.5);
        assert_eq!(BINARY32.unpack(0x3f80_0000), 1.0);
        assert_eq!(BINARY32.unpack(0x4000_0000), 2.0);
        assert_eq!(BINARY32.unpack(0x3fff_ffff), 0x00ff_ffff as f64 / 0x0080_0000 as f64);
    }

    #[test]
    fn test_unpack_binary64() {
        assert_eq!(BINARY64.unpack(0x7ff0_0000_0000_0000), f64::INFINITY);
        assert!(BINARY64.unpack(0xfff8_0000_0000_0000).is_nan());
        assert_eq!(BINARY64.unpack(0x3fe0_0000_0000_0000), 0.5);
        assert_eq!(BINARY64.unpack(0x3ff0_0000_0000_0000), 1.0);
        assert_eq!(BINARY64.unpack(0x4000_0000_0000_0000), 2.0);
    }

    #[test]
    fn test_matches_host_encoding() {
        for &v in &[1.5f32, -3.25, 1.0e30, 6.1e-5, 123456.78] {
            assert_eq!(BINARY32.pack(v as f64), v.to_bits() as u64);
        }
        for &v in &[1.5f64, -3.25e300, 2.2250738585072014e-308, 0.1] {
            assert_eq!(BINARY64.pack(v), v.to_bits());
        }
    }

    #[test]
    fn test_frexp_ldexp() {
        assert_eq!(frexp(8.0), (0.5, 4));
        assert_eq!(frexp(-0.75), (-0.75, 0));
        assert_eq!(frexp(5e-324), (0.5, -1073));
        assert_eq!(ldexp(0.5, 4), 8.0);
        assert_eq!(ldexp(1.0, 1023), f64::from_bits(2046u64 << 52));
        assert_eq!(ldexp(0.75, 1024), f64::from_bits(0x7fe8_0000_0000_0000));
        assert_eq!(ldexp(1.0, -1022), f64::MIN_POSITIVE);
    }

    proptest! {
        #[test]
        fn prop_binary32_round_trip(v in prop::num::f32::NORMAL) {
            prop_assert_eq!(BINARY32.unpack(BINARY32.pack(v as f64)), v as f64);
        }

        #[test]
        fn prop_binary64_round_trip(v in prop::num::f64::NORMAL) {
            prop_assert_eq!(BINARY64.unpack(BINARY64.pack(v)), v);
        }

        #[test]
        fn prop_binary16_round_trip(bits in 0u64..0x1_0000) {
            let exponent = (bits >> 10) & 0x1f;
            prop_assume!(exponent != 0 && exponent != 0x1f);
            prop_assert_eq!(BINARY16.pack(BINARY16.unpack(bits)), bits);
        }
    }
}
