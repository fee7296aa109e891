//! The type descriptor contract and the built-in descriptors.
//!
//! Anything that can sit in a field implements [`TypeDescriptor`]: primitive
//! integers, floats and fixed-point numbers, fixed-length byte and string
//! fields, user types plugged into a [crate::typemap::TypeMap], and built
//! [crate::model::Model]s themselves.

use std::fmt;

use tracing::trace;

use crate::{
    buffer::{Buffer, write_padded},
    codec::{
        FixedFormat, FloatFormat,
        int::{self, Endian, IntWidth},
    },
    errors::AccessError,
    value::Value,
};

/// Size, alignment and codec of a field type. Descriptors are immutable once built.
pub trait TypeDescriptor: fmt::Debug + Send + Sync {
    /// Name used in error messages.
    fn name(&self) -> &str;

    fn bytesize(&self) -> usize;

    fn bytealign(&self) -> usize;

    /// True when the type ends in an unbounded array.
    fn is_extensible(&self) -> bool {
        false
    }

    /// Writes `value` at `offset`. Must not touch bytes outside `offset..offset + bytesize`.
    fn encode(&self, buffer: &mut dyn Buffer, offset: usize, value: &Value) -> Result<(), AccessError>;

    /// Reads the value at `offset`. Must not read outside `offset..offset + bytesize`.
    fn decode(&self, buffer: &dyn Buffer, offset: usize) -> Result<Value, AccessError>;
}

fn mismatch(descriptor: &str, value: &Value) -> AccessError {
    AccessError::TypeMismatch {
        descriptor: descriptor.to_string(),
        found: value.kind(),
    }
}

/// How a numeric primitive maps to bits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Encoding {
    Int { signed: bool },
    Float(FloatFormat),
    Fixed(FixedFormat),
}

/// A scalar integer, floating point or fixed-point type with a fixed byte order.
#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    name: String,
    encoding: Encoding,
    width: IntWidth,
    endian: Endian,
    bytealign: usize,
}

impl Primitive {
    /// Integers are naturally aligned, except the 3 and 6 byte widths which are byte aligned.
    pub fn int(name: impl Into<String>, width: IntWidth, signed: bool, endian: Endian) -> Self {
        let bytealign = match width {
            IntWidth::W24 | IntWidth::W48 => 1,
            _ => width.bytesize(),
        };

        Primitive {
            name: name.into(),
            encoding: Encoding::Int { signed },
            width,
            endian,
            bytealign,
        }
    }

    pub fn float(name: impl Into<String>, format: FloatFormat, endian: Endian) -> Self {
        let width = match format.total_bits {
            16 => IntWidth::W16,
            32 => IntWidth::W32,
            _ => IntWidth::W64,
        };

        Primitive {
            name: name.into(),
            encoding: Encoding::Float(format),
            width,
            endian,
            bytealign: width.bytesize(),
        }
    }

    pub fn fixed(name: impl Into<String>, format: FixedFormat, endian: Endian) -> Self {
        Primitive {
            name: name.into(),
            encoding: Encoding::Fixed(format),
            width: format.width,
            endian,
            bytealign: format.width.bytesize(),
        }
    }

    /// Overrides the natural alignment.
    pub fn with_align(mut self, bytealign: usize) -> Self {
        self.bytealign = bytealign;
        self
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }
}

impl TypeDescriptor for Primitive {
    fn name(&self) -> &str {
        &self.name
    }

    fn bytesize(&self) -> usize {
        self.width.bytesize()
    }

    fn bytealign(&self) -> usize {
        self.bytealign
    }

    fn encode(&self, buffer: &mut dyn Buffer, offset: usize, value: &Value) -> Result<(), AccessError> {
        match self.encoding {
            Encoding::Int { .. } => {
                let raw = value.as_u64().ok_or_else(|| mismatch(&self.name, value))?;
                int::store(buffer, offset, self.width, self.endian, raw)
            }
            Encoding::Float(format) => {
                let num = value.as_f64().ok_or_else(|| mismatch(&self.name, value))?;
                int::store(buffer, offset, self.width, self.endian, format.pack(num))
            }
            Encoding::Fixed(format) => {
                let num = value.as_f64().ok_or_else(|| mismatch(&self.name, value))?;
                format.encode(buffer, offset, self.endian, num)
            }
        }
    }

    fn decode(&self, buffer: &dyn Buffer, offset: usize) -> Result<Value, AccessError> {
        match self.encoding {
            Encoding::Int { signed: true } => {
                int::load_signed(buffer, offset, self.width, self.endian).map(Value::I64)
            }
            Encoding::Int { signed: false } => {
                int::load_unsigned(buffer, offset, self.width, self.endian).map(Value::U64)
            }
            Encoding::Float(format) => int::load_unsigned(buffer, offset, self.width, self.endian)
                .map(|bits| Value::F64(format.unpack(bits))),
            Encoding::Fixed(format) => format.decode(buffer, offset, self.endian).map(Value::F64),
        }
    }
}

/// What to do when a byte or string value is longer than its field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StringPolicy {
    /// Keep the leading bytes that fit.
    Truncate,
    /// Fail with [AccessError::ValueTooLong].
    #[default]
    Reject,
}

fn fit<'v>(bytes: &'v [u8], capacity: usize, policy: StringPolicy) -> Result<&'v [u8], AccessError> {
    if bytes.len() <= capacity {
        return Ok(bytes);
    }

    match policy {
        StringPolicy::Truncate => {
            trace!(len = bytes.len(), capacity, "truncating value to field width");
            Ok(&bytes[..capacity])
        }
        StringPolicy::Reject => Err(AccessError::ValueTooLong {
            len: bytes.len(),
            capacity,
        }),
    }
}

/// Fixed-length raw bytes, copied verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binary {
    name: String,
    len: usize,
    policy: StringPolicy,
}

impl Binary {
    pub fn new(len: usize, policy: StringPolicy) -> Self {
        Binary {
            name: format!("binary[{len}]"),
            len,
            policy,
        }
    }
}

impl TypeDescriptor for Binary {
    fn name(&self) -> &str {
        &self.name
    }

    fn bytesize(&self) -> usize {
        self.len
    }

    fn bytealign(&self) -> usize {
        1
    }

    fn encode(&self, buffer: &mut dyn Buffer, offset: usize, value: &Value) -> Result<(), AccessError> {
        let bytes = value.as_bytes().ok_or_else(|| mismatch(&self.name, value))?;
        write_padded(buffer, offset, self.len, fit(bytes, self.len, self.policy)?)
    }

    fn decode(&self, buffer: &dyn Buffer, offset: usize) -> Result<Value, AccessError> {
        let mut bytes = vec![0u8; self.len];
        buffer.read_slice(offset, &mut bytes)?;
        Ok(Value::Bytes(bytes))
    }
}

/// NUL-terminated UTF-8 text in a fixed-width field.
///
/// A value that exactly fills the field is stored without a terminator.
/// Raw bytes are accepted only when they are valid UTF-8; a field whose
/// contents are not (written by someone else) decodes as [Value::Bytes].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UString {
    name: String,
    len: usize,
    policy: StringPolicy,
}

impl UString {
    pub fn new(len: usize, policy: StringPolicy) -> Self {
        UString {
            name: format!("ustring[{len}]"),
            len,
            policy,
        }
    }
}

impl TypeDescriptor for UString {
    fn name(&self) -> &str {
        &self.name
    }

    fn bytesize(&self) -> usize {
        self.len
    }

    fn bytealign(&self) -> usize {
        1
    }

    fn encode(&self, buffer: &mut dyn Buffer, offset: usize, value: &Value) -> Result<(), AccessError> {
        let bytes = match value {
            // never cut a character in half
            Value::String(s) if s.len() > self.len && self.policy == StringPolicy::Truncate => {
                let mut end = self.len;
                while !s.is_char_boundary(end) {
                    end -= 1;
                }
                &s.as_bytes()[..end]
            }
            Value::Bytes(bytes) if std::str::from_utf8(bytes).is_err() => {
                return Err(AccessError::TypeMismatch {
                    descriptor: self.name.clone(),
                    found: "non-UTF-8 bytes",
                });
            }
            _ => value.as_bytes().ok_or_else(|| mismatch(&self.name, value))?,
        };

        write_padded(buffer, offset, self.len, fit(bytes, self.len, self.policy)?)
    }

    fn decode(&self, buffer: &dyn Buffer, offset: usize) -> Result<Value, AccessError> {
        let mut bytes = vec![0u8; self.len];
        buffer.read_slice(offset, &mut bytes)?;

        let end = bytes.iter().position(|&b| b == 0).unwrap_or(self.len);
        bytes.truncate(end);
        match String::from_utf8(bytes) {
            Ok(text) => Ok(Value::String(text)),
            Err(err) => Ok(Value::Bytes(err.into_bytes())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{BINARY16, BINARY32};

    #[test]
    fn test_int_primitive() {
        let ty = Primitive::int("int16_be", IntWidth::W16, true, Endian::Big);
        assert_eq!(ty.bytesize(), 2);
        assert_eq!(ty.bytealign(), 2);
        assert!(!ty.is_extensible());

        let mut buf = vec![0u8; 4];
        ty.encode(&mut buf, 2, &Value::I64(-2)).unwrap();
        assert_eq!(buf, vec![0, 0, 0xff, 0xfe]);
        assert_eq!(ty.decode(&buf, 2).unwrap(), Value::I64(-2));
    }

    #[test]
    fn test_unsigned_decodes_u64() {
        let ty = Primitive::int("uint8", IntWidth::W8, false, Endian::Native);
        let mut buf = vec![0u8; 1];
        ty.encode(&mut buf, 0, &Value::I64(-1)).unwrap();
        assert_eq!(ty.decode(&buf, 0).unwrap(), Value::U64(255));
    }

    #[test]
    fn test_odd_widths_are_byte_aligned() {
        assert_eq!(Primitive::int("int24", IntWidth::W24, true, Endian::Little).bytealign(), 1);
        assert_eq!(Primitive::int("uint48", IntWidth::W48, false, Endian::Big).bytealign(), 1);
    }

    #[test]
    fn test_float_primitive() {
        let ty = Primitive::float("float32_le", BINARY32, Endian::Little);
        let mut buf = vec![0u8; 4];
        ty.encode(&mut buf, 0, &Value::F64(1.5)).unwrap();
        assert_eq!(buf, 1.5f32.to_le_bytes().to_vec());
        assert_eq!(ty.decode(&buf, 0).unwrap(), Value::F64(1.5));

        let half = Primitive::float("float16_be", BINARY16, Endian::Big);
        let mut buf = vec![0u8; 2];
        half.encode(&mut buf, 0, &Value::I64(2)).unwrap();
        assert_eq!(buf, vec![0x40, 0x00]);
    }

    #[test]
    fn test_float_nan_decodes_nan() {
        let ty = Primitive::float("float64", crate::codec::BINARY64, Endian::Native);
        let mut buf = vec![0u8; 8];
        ty.encode(&mut buf, 0, &Value::F64(f64::NAN)).unwrap();
        assert!(matches!(ty.decode(&buf, 0).unwrap(), Value::F64(v) if v.is_nan()));
    }

    #[test]
    fn test_fixed_primitive() {
        let ty = Primitive::fixed(
            "fixed16q8_be",
            FixedFormat::new(IntWidth::W16, true, 8),
            Endian::Big,
        );
        let mut buf = vec![0u8; 2];
        ty.encode(&mut buf, 0, &Value::F64(1.5)).unwrap();
        assert_eq!(buf, vec![0x01, 0x80]);
        assert_eq!(ty.decode(&buf, 0).unwrap(), Value::F64(1.5));
    }

    #[test]
    fn test_type_mismatch() {
        let ty = Primitive::int("int32", IntWidth::W32, true, Endian::Native);
        let mut buf = vec![0u8; 4];
        assert_eq!(
            ty.encode(&mut buf, 0, &Value::String("x".into())).unwrap_err(),
            AccessError::TypeMismatch {
                descriptor: "int32".to_string(),
                found: "string"
            }
        );
    }

    #[test]
    fn test_binary() {
        let ty = Binary::new(4, StringPolicy::Reject);
        let mut buf = vec![0xffu8; 4];
        ty.encode(&mut buf, 0, &Value::Bytes(vec![1, 2])).unwrap();
        assert_eq!(buf, vec![1, 2, 0, 0]);
        assert_eq!(ty.decode(&buf, 0).unwrap(), Value::Bytes(vec![1, 2, 0, 0]));
        assert_eq!(
            ty.encode(&mut buf, 0, &Value::Bytes(vec![0; 5])).unwrap_err(),
            AccessError::ValueTooLong {
                len: 5,
                capacity: 4
            }
        );
    }

    #[test]
    fn test_ustring() {
        let ty = UString::new(4, StringPolicy::Reject);
        let mut buf = vec![0xffu8; 6];
        ty.encode(&mut buf, 1, &Value::from("ab")).unwrap();
        assert_eq!(buf, vec![0xff, b'a', b'b', 0, 0, 0xff]);
        assert_eq!(ty.decode(&buf, 1).unwrap(), Value::from("ab"));

        ty.encode(&mut buf, 1, &Value::from("abcd")).unwrap();
        assert_eq!(ty.decode(&buf, 1).unwrap(), Value::from("abcd"));
        assert!(ty.encode(&mut buf, 1, &Value::from("abcde")).is_err());
    }

    #[test]
    fn test_ustring_bytes_must_be_utf8() {
        let ty = UString::new(4, StringPolicy::Reject);
        let mut buf = vec![0u8; 4];

        ty.encode(&mut buf, 0, &Value::from(&b"ok"[..])).unwrap();
        assert_eq!(ty.decode(&buf, 0).unwrap(), Value::from("ok"));

        assert_eq!(
            ty.encode(&mut buf, 0, &Value::from(&[0xffu8, 0x41][..])).unwrap_err(),
            AccessError::TypeMismatch {
                descriptor: "ustring[4]".to_string(),
                found: "non-UTF-8 bytes"
            }
        );
        assert_eq!(buf, vec![b'o', b'k', 0, 0]);
    }

    #[test]
    fn test_ustring_foreign_bytes_decode_raw() {
        let ty = UString::new(4, StringPolicy::Reject);
        let buf = vec![0xff, 0x41, 0, 0x42];
        assert_eq!(ty.decode(&buf, 0).unwrap(), Value::Bytes(vec![0xff, 0x41]));
    }

    #[test]
    fn test_ustring_truncate_keeps_characters_whole() {
        let ty = UString::new(4, StringPolicy::Truncate);
        let mut buf = vec![0u8; 4];
        ty.encode(&mut buf, 0, &Value::from("abcdef")).unwrap();
        assert_eq!(ty.decode(&buf, 0).unwrap(), Value::from("abcd"));

        ty.encode(&mut buf, 0, &Value::from("aéé")).unwrap();
        assert_eq!(ty.decode(&buf, 0).unwrap(), Value::from("aé"));
    }
}
