//! Low-level integer and alignment helpers shared by the codecs and the layout engine.

/// Mask with the low `bits` bits set. `bits` may be 0..=64.
pub fn bitmask(bits: usize) -> u64 {
    if bits >= 64 { u64::MAX } else { (1u64 << bits) - 1 }
}

/// Sign-extends the low `bits` of `value` to a full `i64`.
pub fn sign_extend(value: u64, bits: usize) -> i64 {
    if bits == 0 {
        return 0;
    }

    let shift = 64 - bits.min(64);
    ((value << shift) as i64) >> shift
}

/// Reverses the order of the low `bytesize` bytes of `x`. Higher bytes are dropped.
pub fn swap_bytes_n(x: u64, bytesize: usize) -> u64 {
    let mut r = 0u64;
    for i in 0..bytesize {
        r = (r << 8) | ((x >> (i * 8)) & 0xff);
    }

    r
}

/// Rounds `value` up to the next multiple of `unit`. A `unit` of 0 or 1 is a no-op.
pub fn align_ceil(value: usize, unit: usize) -> usize {
    if unit <= 1 {
        value
    } else {
        value.div_ceil(unit) * unit
    }
}

/// Rounds `value` down to a multiple of `unit`.
pub fn align_floor(value: usize, unit: usize) -> usize {
    if unit <= 1 { value } else { value / unit * unit }
}

pub fn is_power_of_two(value: usize) -> bool {
    value != 0 && value & (value - 1) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitmask() {
        assert_eq!(bitmask(0), 0);
        assert_eq!(bitmask(24), 0xff_ffff);
        assert_eq!(bitmask(64), u64::MAX);
    }

    #[test]
    fn test_sign_extend() {
        assert_eq!(sign_extend(0b11111111, 8), -1);
        assert_eq!(sign_extend(0x7f, 8), 127);
        assert_eq!(sign_extend(0x80_0000, 24), -0x80_0000);
        assert_eq!(sign_extend(u64::MAX, 64), -1);
    }

    #[test]
    fn test_swap_bytes_n() {
        assert_eq!(swap_bytes_n(0x1234, 2), 0x3412);
        assert_eq!(swap_bytes_n(0x123456, 3), 0x563412);
        assert_eq!(swap_bytes_n(0x0102_0304_0506, 6), 0x0605_0403_0201);
        assert_eq!(swap_bytes_n(0x0102_0304_0506_0708, 8), 0x0807_0605_0403_0201);
    }

    #[test]
    fn test_swap_drops_high_bytes() {
        assert_eq!(swap_bytes_n(0xff_1234, 2), 0x3412);
    }

    #[test]
    fn test_align() {
        assert_eq!(align_ceil(5, 4), 8);
        assert_eq!(align_ceil(8, 4), 8);
        assert_eq!(align_ceil(0, 8), 0);
        assert_eq!(align_ceil(7, 1), 7);
        assert_eq!(align_floor(7, 4), 4);
        assert_eq!(align_floor(7, 0), 7);
    }

    #[test]
    fn test_is_power_of_two() {
        assert!(is_power_of_two(1));
        assert!(is_power_of_two(16));
        assert!(!is_power_of_two(0));
        assert!(!is_power_of_two(12));
    }
}
