//! Dynamically typed values exchanged with [crate::types::TypeDescriptor]s.

/// A value decoded from, or to be encoded into, a field.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    I64(i64),
    U64(u64),
    F64(f64),
    /// Raw bytes (binary fields, whole arrays and records).
    Bytes(Vec<u8>),
    String(String),
}

impl Value {
    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::I64(_) => "i64",
            Value::U64(_) => "u64",
            Value::F64(_) => "f64",
            Value::Bytes(_) => "bytes",
            Value::String(_) => "string",
        }
    }

    /// Integer view: two's-complement bits of an integer, or a float truncated toward zero.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::I64(v) => Some(v),
            Value::U64(v) => Some(v as i64),
            Value::F64(v) => Some(v as i64),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        self.as_i64().map(|v| v as u64)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::I64(v) => Some(v as f64),
            Value::U64(v) => Some(v as f64),
            Value::F64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            Value::String(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

macro_rules! impl_from {
    ($variant:ident: $target:ty => $($ty:ty),+) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::$variant(value as $target)
                }
            }
        )+
    };
}

impl_from!(I64: i64 => i8, i16, i32, i64, isize);
impl_from!(U64: u64 => u8, u16, u32, u64, usize);
impl_from!(F64: f64 => f32, f64);

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Value::Bytes(value.to_vec())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_views() {
        assert_eq!(Value::I64(-1).as_u64(), Some(u64::MAX));
        assert_eq!(Value::U64(3).as_i64(), Some(3));
        assert_eq!(Value::F64(2.9).as_i64(), Some(2));
        assert_eq!(Value::I64(2).as_f64(), Some(2.0));
        assert_eq!(Value::String("x".into()).as_i64(), None);
    }

    #[test]
    fn test_from() {
        assert_eq!(Value::from(-3i8), Value::I64(-3));
        assert_eq!(Value::from(7u16), Value::U64(7));
        assert_eq!(Value::from(0.5f32), Value::F64(0.5));
        assert_eq!(Value::from("ab"), Value::String("ab".to_string()));
        assert_eq!(Value::from(&b"ab"[..]).as_bytes(), Some(&b"ab"[..]));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_json() {
        let json = serde_json::to_string(&Value::U64(5)).unwrap();
        assert_eq!(json, r#"{"U64":5}"#);
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Value::U64(5));
    }
}
