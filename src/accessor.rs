//! Accessor: binds a [Model] to a byte buffer and reads/writes its fields in place.
//!
//! A [View] is a (buffer, offset, model) triple. Nothing is copied on bind;
//! every `get`/`set` goes straight to the buffer through the field's
//! descriptor. Several views may alias the same region.
//!
//! ```
//! use structcraft::{builder::LayoutBuilder, typemap::TypeMap, value::Value};
//!
//! let types = TypeMap::with_primitives().unwrap();
//! let mut b = LayoutBuilder::begin_struct(&types);
//! b.add_field("uint16_be", &["id"], &[]).unwrap();
//! b.add_field("uint8", &["data"], &[0]).unwrap();
//! let accessor = b.to_model().unwrap().create_accessor();
//!
//! let mut packet = vec![0x01u8, 0x02, 0xaa, 0xbb];
//! let mut view = accessor.bind(&mut packet, 0);
//! assert_eq!(view.get("id").unwrap(), Value::U64(0x0102));
//! assert_eq!(view.element_count().unwrap(), 2);
//!
//! view.append(0xccu8).unwrap();
//! assert_eq!(packet, vec![0x01, 0x02, 0xaa, 0xbb, 0xcc]);
//! ```

use std::sync::Arc;

use tracing::trace;

use crate::{
    bits::align_floor,
    buffer::{Buffer, write_padded},
    errors::AccessError,
    field::{Field, FieldType},
    model::Model,
    value::Value,
};

/// The bindable accessor produced by [Model::create_accessor].
#[derive(Debug, Clone)]
pub struct Accessor {
    model: Arc<Model>,
}

impl Accessor {
    pub(crate) fn new(model: Arc<Model>) -> Self {
        Accessor { model }
    }

    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    /// Binds to `buffer` at `offset`. Bounds are checked on each access, not here.
    pub fn bind<'a>(&self, buffer: &'a mut dyn Buffer, offset: usize) -> View<'a> {
        View {
            model: Arc::clone(&self.model),
            buffer,
            offset,
            frozen: false,
        }
    }

    /// A zero-filled buffer of exactly the model's fixed size; bind it with
    /// `accessor.bind(&mut buf, 0)` for a freshly constructed record.
    pub fn alloc(&self) -> Vec<u8> {
        vec![0u8; self.model.bytesize()]
    }
}

fn lookup<'m>(model: &'m Model, name: &str) -> Result<&'m Field, AccessError> {
    model
        .field(name)
        .ok_or_else(|| AccessError::NoSuchField(name.to_string()))
}

fn ensure_writable(frozen: bool, buffer: &dyn Buffer, target: &str) -> Result<(), AccessError> {
    if frozen {
        Err(AccessError::Immutable(format!("`{target}` through a frozen view")))
    } else if buffer.is_frozen() {
        Err(AccessError::Immutable("a frozen buffer".to_string()))
    } else {
        Ok(())
    }
}

/// `base + relative`, failing with a bounds error instead of overflowing.
fn offset_of(base: usize, relative: usize, buffer: &dyn Buffer) -> Result<usize, AccessError> {
    base.checked_add(relative).ok_or(AccessError::Bounds {
        offset: base,
        end: usize::MAX,
        bytesize: buffer.bytesize(),
    })
}

fn dynamic_count(buffer: &dyn Buffer, base: usize, stride: usize) -> usize {
    if stride == 0 {
        return 0;
    }
    buffer.bytesize().saturating_sub(base) / stride
}

/// A struct or union bound to a buffer region.
pub struct View<'a> {
    model: Arc<Model>,
    buffer: &'a mut dyn Buffer,
    offset: usize,
    frozen: bool,
}

impl<'a> View<'a> {
    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Rejects every later write through this view and the views derived from it.
    pub fn freeze(mut self) -> Self {
        self.frozen = true;
        self
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen || self.buffer.is_frozen()
    }

    /// The next record of the same model, `gap` bytes past the end of this one.
    ///
    /// An offset past `usize::MAX` saturates, so every access through the
    /// result fails with [AccessError::Bounds].
    pub fn slide(self, gap: usize) -> View<'a> {
        let offset = self.offset.saturating_add(self.model.bytesize()).saturating_add(gap);
        View { offset, ..self }
    }

    /// Reads a scalar field. A record field reads back as its raw bytes.
    pub fn get(&self, name: &str) -> Result<Value, AccessError> {
        let field = lookup(&self.model, name)?;
        if field.is_array() {
            return Err(AccessError::NotScalar(name.to_string()));
        }

        let at = offset_of(self.offset, field.offset, &*self.buffer)?;
        field.ty.descriptor().decode(&*self.buffer, at)
    }

    /// Writes a scalar field. Assigning [Value::Bytes] to an array copies the bytes
    /// verbatim into the array's region and zero-fills the remainder.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), AccessError> {
        let value = value.into();
        let field = lookup(&self.model, name)?;

        ensure_writable(self.frozen, &*self.buffer, name)?;
        if field.is_const() {
            return Err(AccessError::Immutable(format!("const field `{name}`")));
        }

        let at = offset_of(self.offset, field.offset, &*self.buffer)?;
        match (&field.vector, &value) {
            (None, _) => field.ty.descriptor().encode(self.buffer, at, &value),
            (Some(_), Value::Bytes(bytes)) => {
                let capacity = match field.element_count() {
                    Some(count) => count * field.stride(),
                    None => align_floor(self.buffer.bytesize().saturating_sub(at), field.stride()),
                };
                write_padded(self.buffer, at, capacity, bytes)
            }
            (Some(_), _) => Err(AccessError::NotScalar(name.to_string())),
        }
    }

    pub fn array(&mut self, name: &str) -> Result<ArrayView<'_>, AccessError> {
        let field = lookup(&self.model, name)?;
        let Some(dims) = &field.vector else {
            return Err(AccessError::NotArray(name.to_string()));
        };

        Ok(ArrayView {
            name: name.to_string(),
            ty: field.ty.clone(),
            dims: dims.clone(),
            offset: offset_of(self.offset, field.offset, &*self.buffer)?,
            readonly: self.frozen || field.is_const(),
            buffer: &mut *self.buffer,
        })
    }

    /// A view of a nested struct or union field. Const fields and frozen views yield frozen records.
    pub fn record(&mut self, name: &str) -> Result<View<'_>, AccessError> {
        let field = lookup(&self.model, name)?;
        let model = match (&field.vector, &field.ty) {
            (None, FieldType::Model(model)) => Arc::clone(model),
            _ => return Err(AccessError::NotRecord(name.to_string())),
        };

        Ok(View {
            model,
            offset: offset_of(self.offset, field.offset, &*self.buffer)?,
            frozen: self.frozen || field.is_const(),
            buffer: &mut *self.buffer,
        })
    }

    /// The unbounded array that ends this record.
    pub fn tail(&mut self) -> Result<ArrayView<'_>, AccessError> {
        let (relative, field) = self
            .model
            .extensible_tail()
            .ok_or_else(|| AccessError::NotExtensible(self.model.kind().to_string()))?;

        Ok(ArrayView {
            name: field.name().to_string(),
            ty: field.ty.clone(),
            dims: field.vector.clone().unwrap_or_default(),
            offset: offset_of(self.offset, relative, &*self.buffer)?,
            readonly: self.frozen || field.is_const(),
            buffer: &mut *self.buffer,
        })
    }

    /// Elements currently present in the unbounded tail.
    pub fn element_count(&self) -> Result<usize, AccessError> {
        let (relative, field) = self
            .model
            .extensible_tail()
            .ok_or_else(|| AccessError::NotExtensible(self.model.kind().to_string()))?;

        Ok(dynamic_count(&*self.buffer, self.offset.saturating_add(relative), field.stride()))
    }

    /// Grows the buffer by one tail element and stores `value` in it.
    pub fn append(&mut self, value: impl Into<Value>) -> Result<(), AccessError> {
        self.tail()?.append(value)
    }

    /// Size of this record. For an extensible model it covers the tail elements present in the buffer.
    pub fn struct_bytesize(&self) -> usize {
        match self.model.extensible_tail() {
            Some((relative, field)) => {
                let count = dynamic_count(&*self.buffer, self.offset.saturating_add(relative), field.stride());
                relative + count * field.stride()
            }
            None => self.model.bytesize(),
        }
    }

    /// Same as [View::struct_bytesize].
    pub fn bytesize(&self) -> usize {
        self.struct_bytesize()
    }

    /// True when the whole record fits inside the buffer.
    pub fn validate(&self) -> bool {
        self.offset
            .checked_add(self.struct_bytesize())
            .is_some_and(|end| end <= self.buffer.bytesize())
    }

    /// Copies the record's bytes out of the buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>, AccessError> {
        let mut bytes = vec![0u8; self.struct_bytesize()];
        self.buffer.read_slice(self.offset, &mut bytes)?;
        Ok(bytes)
    }
}

/// One array field (or a sub-array of one) bound to a buffer region.
///
/// `dims` keeps the outermost dimension last, so an index selects along the
/// last dimension and each element is itself an array over the rest.
pub struct ArrayView<'a> {
    name: String,
    ty: FieldType,
    dims: Vec<usize>,
    buffer: &'a mut dyn Buffer,
    offset: usize,
    readonly: bool,
}

impl<'a> ArrayView<'a> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn is_extensible(&self) -> bool {
        matches!(self.dims.last(), Some(0))
    }

    /// Byte distance between consecutive elements.
    pub fn stride(&self) -> usize {
        let inner: usize = match self.dims.split_last() {
            Some((_, inner)) => inner.iter().product(),
            None => 1,
        };
        inner * self.ty.bytesize()
    }

    /// Declared length, or the number of whole elements in the buffer for an unbounded tail.
    pub fn len(&self) -> usize {
        match self.dims.last() {
            Some(0) => dynamic_count(&*self.buffer, self.offset, self.stride()),
            Some(&n) => n,
            None => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn element_offset(&self, index: usize) -> Result<usize, AccessError> {
        let len = self.len();
        if index >= len {
            return Err(AccessError::IndexOutOfRange {
                field: self.name.clone(),
                index,
                len,
            });
        }
        offset_of(self.offset, index * self.stride(), &*self.buffer)
    }

    fn has_subarrays(&self) -> bool {
        self.dims.len() > 1
    }

    /// Reads element `index`. Sub-arrays must be reached through [ArrayView::at].
    pub fn get(&self, index: usize) -> Result<Value, AccessError> {
        if self.has_subarrays() {
            return Err(AccessError::NotScalar(self.name.clone()));
        }

        let at = self.element_offset(index)?;
        self.ty.descriptor().decode(&*self.buffer, at)
    }

    /// Writes element `index`. A sub-array element accepts raw bytes.
    pub fn set(&mut self, index: usize, value: impl Into<Value>) -> Result<(), AccessError> {
        let value = value.into();
        if self.readonly {
            return Err(AccessError::Immutable(format!("`{}`", self.name)));
        }
        ensure_writable(false, &*self.buffer, &self.name)?;

        let at = self.element_offset(index)?;
        let stride = self.stride();
        match (self.has_subarrays(), &value) {
            (false, _) => self.ty.descriptor().encode(self.buffer, at, &value),
            (true, Value::Bytes(bytes)) => write_padded(self.buffer, at, stride, bytes),
            (true, _) => Err(AccessError::NotScalar(self.name.clone())),
        }
    }

    /// The sub-array at `index` of a multidimensional array.
    pub fn at(&mut self, index: usize) -> Result<ArrayView<'_>, AccessError> {
        if !self.has_subarrays() {
            return Err(AccessError::NotArray(format!("{}[{index}]", self.name)));
        }

        let offset = self.element_offset(index)?;
        let inner = self.dims[..self.dims.len() - 1].to_vec();

        Ok(ArrayView {
            name: format!("{}[{index}]", self.name),
            ty: self.ty.clone(),
            dims: inner,
            offset,
            readonly: self.readonly,
            buffer: &mut *self.buffer,
        })
    }

    /// A view of the struct or union element at `index`.
    pub fn record(&mut self, index: usize) -> Result<View<'_>, AccessError> {
        let model = match (&self.ty, self.has_subarrays()) {
            (FieldType::Model(model), false) => Arc::clone(model),
            _ => return Err(AccessError::NotRecord(format!("{}[{index}]", self.name))),
        };

        let offset = self.element_offset(index)?;
        Ok(View {
            model,
            offset,
            frozen: self.readonly,
            buffer: &mut *self.buffer,
        })
    }

    /// Adds one element to an unbounded array.
    ///
    /// The new slot starts at the last whole-element boundary, so a trailing
    /// partial element is overwritten; the buffer is resized to end exactly
    /// after the new element.
    pub fn append(&mut self, value: impl Into<Value>) -> Result<(), AccessError> {
        let stride = self.stride();
        if !self.is_extensible() || stride == 0 {
            return Err(AccessError::NotExtensible(self.name.clone()));
        }
        if self.readonly {
            return Err(AccessError::Immutable(format!("`{}`", self.name)));
        }
        ensure_writable(false, &*self.buffer, &self.name)?;

        let count = self.len();
        let new_bytesize = (count + 1)
            .checked_mul(stride)
            .and_then(|grown| self.offset.checked_add(grown))
            .ok_or(AccessError::Bounds {
                offset: self.offset,
                end: usize::MAX,
                bytesize: self.buffer.bytesize(),
            })?;
        trace!(
            field = %self.name,
            from = self.buffer.bytesize(),
            to = new_bytesize,
            "growing extensible array"
        );
        self.buffer.resize(new_bytesize)?;

        self.set(count, value)
    }

    /// The raw bytes of every element.
    pub fn to_bytes(&self) -> Result<Vec<u8>, AccessError> {
        let mut bytes = vec![0u8; self.len() * self.stride()];
        self.buffer.read_slice(self.offset, &mut bytes)?;
        Ok(bytes)
    }

    /// Decodes every element of a one-dimensional array.
    pub fn to_vec(&self) -> Result<Vec<Value>, AccessError> {
        (0..self.len()).map(|i| self.get(i)).collect()
    }
}
