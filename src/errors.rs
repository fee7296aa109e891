//! Error types for layout building, buffer access and platform setup.

use thiserror::Error;

use crate::model::ModelKind;

/// Errors produced while building a [crate::model::Model] with a [crate::builder::LayoutBuilder].
///
/// A schema error aborts the build; no partial model is ever produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// `to_model` was called on a container with no fields.
    #[error("{kind} declares no fields")]
    EmptyContainer { kind: ModelKind },
    /// Two fields of one container share a name (after flattening).
    #[error("duplicate field `{name}` in {kind}")]
    DuplicateField { name: String, kind: ModelKind },
    /// Name does not match `[A-Za-z_][0-9A-Za-z_]*`.
    #[error("invalid identifier `{0}`")]
    InvalidIdentifier(String),
    /// Type name is not bound in the type map.
    #[error("unknown type `{0}`")]
    UnknownType(String),
    /// A field was declared after the unbounded trailing array.
    #[error("field `{name}` declared after extensible field `{extensible}` in {kind}")]
    FieldAfterExtensible {
        name: String,
        extensible: String,
        kind: ModelKind,
    },
    /// `packed` was opened while another `packed` block of the same container was active.
    #[error("`packed` nested directly inside another `packed` block of the same {kind}")]
    NestedPack { kind: ModelKind },
    /// A zero (unbounded) dimension appears somewhere other than last.
    #[error("invalid dimensions {dims:?} for field `{name}`")]
    InvalidDimension { name: String, dims: Vec<usize> },
    /// Pack alignment is not a power of two.
    #[error("pack alignment {0} is not a power of two")]
    InvalidPackAlign(usize),
    /// `add_field` was called without any field name.
    #[error("no field name given for a field of type `{type_name}`")]
    MissingFieldName { type_name: String },
    /// Explicit padding only makes sense in a struct.
    #[error("padding is not allowed in a union")]
    PaddingInUnion,
}

/// Errors produced when reading or writing a bound view.
///
/// A failed access leaves the buffer and the model valid for further use.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// Write to a const field, a frozen view or a frozen buffer.
    #[error("cannot write to {0}")]
    Immutable(String),
    /// Array index outside `0..len`.
    #[error("index {index} out of range for `{field}` (length {len})")]
    IndexOutOfRange {
        field: String,
        index: usize,
        len: usize,
    },
    /// Requested byte range lies beyond the end of the buffer.
    #[error("range {offset}..{end} is outside a buffer of {bytesize} bytes")]
    Bounds {
        offset: usize,
        end: usize,
        bytesize: usize,
    },
    /// The buffer cannot grow to the requested size.
    #[error("buffer of {bytesize} bytes cannot grow to {requested} bytes")]
    BufferTooSmall { requested: usize, bytesize: usize },
    /// No field of that name in the model.
    #[error("no field named `{0}`")]
    NoSuchField(String),
    /// The value variant cannot be stored by this descriptor.
    #[error("{descriptor} cannot store a {found} value")]
    TypeMismatch {
        descriptor: String,
        found: &'static str,
    },
    /// String or byte value does not fit its field.
    #[error("value of {len} bytes does not fit a field of {capacity} bytes")]
    ValueTooLong { len: usize, capacity: usize },
    /// Scalar get/set used on an array or record field.
    #[error("`{0}` is not a scalar field")]
    NotScalar(String),
    /// Array access used on a field without dimensions.
    #[error("`{0}` is not an array field")]
    NotArray(String),
    /// Record access used on a field that is not a struct or union.
    #[error("`{0}` is not a struct or union field")]
    NotRecord(String),
    /// Growth requested on a field or model without an unbounded tail.
    #[error("`{0}` is not extensible")]
    NotExtensible(String),
}

/// Fatal platform errors detected once when the primitive table is built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    /// Pointer-sized integers must be 4 or 8 bytes wide.
    #[error("unsupported native width for `{name}`: {bytes} bytes (expected 4 or 8)")]
    UnsupportedWidth { name: &'static str, bytes: usize },
}
