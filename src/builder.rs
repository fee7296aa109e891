//! LayoutBuilder: turns an ordered sequence of field declarations into a [Model].
//!
//! ```
//! use structcraft::{builder::LayoutBuilder, typemap::TypeMap};
//!
//! let types = TypeMap::with_primitives().unwrap();
//! let mut header = LayoutBuilder::begin_struct(&types);
//! header.add_field("uint8", &["tag"], &[]).unwrap();
//! header.add_field("uint32_be", &["length"], &[]).unwrap();
//! let model = header.to_model().unwrap();
//!
//! assert_eq!(model.field("length").unwrap().offset, 4);
//! assert_eq!(model.bytesize(), 8);
//! ```

use std::{collections::BTreeSet, ops::Range, sync::Arc};

use tracing::debug;

use crate::{
    bits::{align_ceil, is_power_of_two},
    errors::SchemaError,
    field::{Field, FieldFlags, FieldType},
    model::{Model, ModelKind},
    typemap::{TypeMap, TypeRef, check_identifier},
};

/// Accumulates the fields of one struct or union.
///
/// Struct members are placed one after another, each padded up to its
/// effective alignment; union members all sit at offset 0. Nested builders
/// share the same [TypeMap] and start with the pack override active at the
/// point they were opened.
#[derive(Debug)]
pub struct LayoutBuilder<'m> {
    kind: ModelKind,
    typemap: &'m TypeMap,
    /// Struct: next free byte. Union: largest member extent so far.
    offset: usize,
    maxalign: usize,
    members: Vec<Field>,
    pack: Option<usize>,
    in_packed: bool,
    last_added: Range<usize>,
    extensible: Option<String>,
}

impl<'m> LayoutBuilder<'m> {
    pub fn new(kind: ModelKind, typemap: &'m TypeMap) -> Self {
        LayoutBuilder {
            kind,
            typemap,
            offset: 0,
            maxalign: 1,
            members: Vec::new(),
            pack: None,
            in_packed: false,
            last_added: 0..0,
            extensible: None,
        }
    }

    pub fn begin_struct(typemap: &'m TypeMap) -> Self {
        Self::new(ModelKind::Struct, typemap)
    }

    pub fn begin_union(typemap: &'m TypeMap) -> Self {
        Self::new(ModelKind::Union, typemap)
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    /// Declares one field per name, all sharing `ty` and `dims`.
    ///
    /// `dims` lists array dimensions with the outermost last; a trailing `0`
    /// makes the field an unbounded tail, after which nothing else may be declared.
    pub fn add_field(
        &mut self,
        ty: impl Into<TypeRef>,
        names: &[&str],
        dims: &[usize],
    ) -> Result<&mut Self, SchemaError> {
        let ty = ty.into();
        let Some(first) = names.first() else {
            let type_name = match &ty {
                TypeRef::Name(name) => name.clone(),
                TypeRef::Descriptor(d) => d.name().to_string(),
                TypeRef::Model(m) => m.kind().to_string(),
            };
            return Err(SchemaError::MissingFieldName { type_name });
        };

        let entry = self.typemap.resolve(ty, dims, first)?;
        let vector = (!entry.dims.is_empty()).then_some(entry.dims);

        let start = self.members.len();
        for name in names {
            check_identifier(name)?;
            self.place(Some(name.to_string()), vector.clone(), entry.ty.clone())?;
        }
        self.last_added = start..self.members.len();

        Ok(self)
    }

    /// Builds a nested struct or union with `body`.
    ///
    /// Without a name the inner fields are merged into this container at the
    /// nested block's offset. With a name the inner model becomes the field's
    /// type, optionally as the element of an array.
    pub fn add_nested<F>(
        &mut self,
        kind: ModelKind,
        name: Option<&str>,
        dims: &[usize],
        body: F,
    ) -> Result<&mut Self, SchemaError>
    where
        F: FnOnce(&mut LayoutBuilder<'m>) -> Result<(), SchemaError>,
    {
        let mut inner = LayoutBuilder::new(kind, self.typemap);
        inner.pack = self.pack;
        body(&mut inner)?;
        let model = inner.to_model()?;

        let start = self.members.len();
        match name {
            None => {
                if !dims.is_empty() {
                    return Err(SchemaError::InvalidDimension {
                        name: "<anonymous>".to_string(),
                        dims: dims.to_vec(),
                    });
                }
                self.place(None, None, FieldType::Model(model))?;
            }
            Some(name) => {
                check_identifier(name)?;
                let entry = self.typemap.resolve(TypeRef::Model(model), dims, name)?;
                let vector = (!entry.dims.is_empty()).then_some(entry.dims);
                self.place(Some(name.to_string()), vector, entry.ty)?;
            }
        }
        self.last_added = start..self.members.len();

        Ok(self)
    }

    /// Marks the fields declared by the previous `add_field`/`add_nested` call read-only.
    pub fn mark_const(&mut self) -> &mut Self {
        for field in &mut self.members[self.last_added.clone()] {
            field.flags.is_const = true;
        }
        self
    }

    /// Runs `body` with the pack override set to `align`.
    ///
    /// `Some(1)` lays fields out unaligned, `Some(n)` caps alignment at `n`,
    /// and `None` restores natural alignment. A `packed` block cannot be
    /// opened directly inside another one; open a nested struct or union first.
    pub fn packed<F>(&mut self, align: Option<usize>, body: F) -> Result<&mut Self, SchemaError>
    where
        F: FnOnce(&mut Self) -> Result<(), SchemaError>,
    {
        if self.in_packed {
            return Err(SchemaError::NestedPack { kind: self.kind });
        }
        if let Some(align) = align.filter(|&a| !is_power_of_two(a)) {
            return Err(SchemaError::InvalidPackAlign(align));
        }

        let saved = self.pack;
        self.pack = align;
        self.in_packed = true;

        let result = body(&mut *self);

        self.pack = saved;
        self.in_packed = false;

        result.map(|_| self)
    }

    /// Inserts `bytes` of explicit padding.
    pub fn padding(&mut self, bytes: usize) -> Result<&mut Self, SchemaError> {
        self.ensure_struct()?;
        self.offset += bytes;
        Ok(self)
    }

    /// Pads the running offset up to a multiple of `align`.
    pub fn align_to(&mut self, align: usize) -> Result<&mut Self, SchemaError> {
        self.ensure_struct()?;
        if !is_power_of_two(align) {
            return Err(SchemaError::InvalidPackAlign(align));
        }
        self.offset = align_ceil(self.offset, align);
        Ok(self)
    }

    /// Finalizes the container.
    ///
    /// Anonymous members are flattened, names are checked for duplicates and
    /// the size is rounded up to the largest member alignment.
    pub fn to_model(self) -> Result<Arc<Model>, SchemaError> {
        if self.members.is_empty() {
            return Err(SchemaError::EmptyContainer { kind: self.kind });
        }

        let fields = flatten(self.members);

        let mut seen = BTreeSet::new();
        for field in &fields {
            if !seen.insert(field.name()) {
                return Err(SchemaError::DuplicateField {
                    name: field.name().to_string(),
                    kind: self.kind,
                });
            }
        }

        let bytesize = align_ceil(self.offset, self.maxalign);
        let model = Model::new(self.kind, fields, bytesize, self.maxalign);

        debug!(
            kind = %model.kind(),
            bytesize = model.bytesize(),
            bytealign = model.bytealign(),
            fields = model.fields().len(),
            extensible = model.is_extensible(),
            "finalized model"
        );

        Ok(Arc::new(model))
    }

    fn ensure_struct(&self) -> Result<(), SchemaError> {
        match self.kind {
            ModelKind::Struct => Ok(()),
            ModelKind::Union => Err(SchemaError::PaddingInUnion),
        }
    }

    fn place(
        &mut self,
        name: Option<String>,
        vector: Option<Vec<usize>>,
        ty: FieldType,
    ) -> Result<(), SchemaError> {
        if let Some(extensible) = &self.extensible {
            return Err(SchemaError::FieldAfterExtensible {
                name: name.unwrap_or_else(|| "<anonymous>".to_string()),
                extensible: extensible.clone(),
                kind: self.kind,
            });
        }

        let mut field = Field {
            offset: 0,
            name,
            vector,
            ty,
            flags: FieldFlags {
                is_const: false,
                packed_align: self.pack,
            },
        };

        let align = field.effective_align();
        self.maxalign = self.maxalign.max(align);

        match self.kind {
            ModelKind::Struct => {
                field.offset = align_ceil(self.offset, align);
                self.offset = field.offset + field.bytesize();
            }
            ModelKind::Union => {
                self.offset = self.offset.max(field.bytesize());
            }
        }

        if field.is_extensible() {
            self.extensible = Some(field.name().to_string());
        }

        self.members.push(field);
        Ok(())
    }
}

/// Replaces anonymous nested members with their own fields, shifted to the
/// member's offset and inheriting its const flag.
fn flatten(members: Vec<Field>) -> Vec<Field> {
    let mut fields = Vec::with_capacity(members.len());

    for member in members {
        match (&member.name, member.ty.as_model()) {
            (None, Some(inner)) => {
                for child in inner.fields() {
                    let mut child = child.clone();
                    child.offset += member.offset;
                    child.flags.is_const |= member.flags.is_const;
                    fields.push(child);
                }
            }
            _ => fields.push(member),
        }
    }

    fields
}
