//! Model: the immutable, flattened layout produced by a [crate::builder::LayoutBuilder].

use std::{collections::BTreeMap, fmt, sync::Arc};

use crate::{
    accessor::Accessor,
    buffer::{Buffer, write_padded},
    errors::AccessError,
    field::Field,
    types::TypeDescriptor,
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ModelKind {
    Struct,
    Union,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Struct => f.write_str("struct"),
            ModelKind::Union => f.write_str("union"),
        }
    }
}

/// Computed layout of one struct or union: size, alignment and its fields in declaration order.
///
/// Every field is named; anonymous nested containers have already been merged
/// into the field list. A model never changes once built and is shared through
/// an [Arc].
#[derive(Debug)]
pub struct Model {
    kind: ModelKind,
    name: String,
    bytesize: usize,
    bytealign: usize,
    fields: Vec<Field>,
    extensible: bool,
    index: BTreeMap<String, usize>,
}

impl Model {
    /// Callers guarantee field names are present and unique.
    pub(crate) fn new(kind: ModelKind, fields: Vec<Field>, bytesize: usize, bytealign: usize) -> Self {
        let index = fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name().to_string(), i))
            .collect();
        let extensible = fields.iter().any(Field::is_extensible);

        Model {
            kind,
            name: kind.to_string(),
            bytesize,
            bytealign,
            fields,
            extensible,
            index,
        }
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    /// Fixed size. For an extensible model this excludes the unbounded tail.
    pub fn bytesize(&self) -> usize {
        self.bytesize
    }

    pub fn bytealign(&self) -> usize {
        self.bytealign
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.index.get(name).map(|&i| &self.fields[i])
    }

    pub fn is_extensible(&self) -> bool {
        self.extensible
    }

    /// The unbounded array ending this model, with its offset relative to the
    /// model start. Follows a trailing extensible record down to its own tail.
    pub fn extensible_tail(&self) -> Option<(usize, &Field)> {
        let last = self.fields.last().filter(|f| f.is_extensible())?;

        match (&last.vector, last.ty.as_model()) {
            (None, Some(inner)) => inner
                .extensible_tail()
                .map(|(offset, field)| (last.offset + offset, field)),
            _ => Some((last.offset, last)),
        }
    }

    pub fn create_accessor(self: &Arc<Self>) -> Accessor {
        Accessor::new(Arc::clone(self))
    }
}

/// A model used as a field type reads and writes its region as raw bytes.
impl TypeDescriptor for Model {
    fn name(&self) -> &str {
        &self.name
    }

    fn bytesize(&self) -> usize {
        self.bytesize
    }

    fn bytealign(&self) -> usize {
        self.bytealign
    }

    fn is_extensible(&self) -> bool {
        self.extensible
    }

    fn encode(&self, buffer: &mut dyn Buffer, offset: usize, value: &Value) -> Result<(), AccessError> {
        let bytes = value.as_bytes().ok_or_else(|| AccessError::TypeMismatch {
            descriptor: self.name.clone(),
            found: value.kind(),
        })?;

        write_padded(buffer, offset, self.bytesize, bytes)
    }

    fn decode(&self, buffer: &dyn Buffer, offset: usize) -> Result<Value, AccessError> {
        let mut region = vec![0u8; self.bytesize];
        buffer.read_slice(offset, &mut region)?;
        Ok(Value::Bytes(region))
    }
}
