use std::sync::Arc;

use crate::{model::Model, types::TypeDescriptor};

/// What a field stores: a plain descriptor, or a nested struct/union kept as a record.
#[derive(Debug, Clone)]
pub enum FieldType {
    Scalar(Arc<dyn TypeDescriptor>),
    Model(Arc<Model>),
}

impl FieldType {
    pub fn descriptor(&self) -> &dyn TypeDescriptor {
        match self {
            FieldType::Scalar(ty) => &**ty,
            FieldType::Model(model) => &**model,
        }
    }

    pub fn name(&self) -> &str {
        self.descriptor().name()
    }

    pub fn bytesize(&self) -> usize {
        self.descriptor().bytesize()
    }

    pub fn bytealign(&self) -> usize {
        self.descriptor().bytealign()
    }

    pub fn is_extensible(&self) -> bool {
        self.descriptor().is_extensible()
    }

    pub fn as_model(&self) -> Option<&Arc<Model>> {
        match self {
            FieldType::Model(model) => Some(model),
            FieldType::Scalar(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldFlags {
    pub is_const: bool,
    /// Pack override active when the field was declared.
    pub packed_align: Option<usize>,
}

/// One member of a [Model].
///
/// `vector` holds the array dimensions with the outermost dimension last; a
/// trailing `0` makes the field an unbounded tail. A field without a name is
/// an anonymous nested container that is flattened away when its parent is
/// finalized, so every field of a finished model is named.
#[derive(Debug, Clone)]
pub struct Field {
    pub offset: usize,
    pub name: Option<String>,
    pub vector: Option<Vec<usize>>,
    pub ty: FieldType,
    pub flags: FieldFlags,
}

impl Field {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("<anonymous>")
    }

    pub fn is_const(&self) -> bool {
        self.flags.is_const
    }

    pub fn is_array(&self) -> bool {
        self.vector.is_some()
    }

    /// Alignment after the pack override, if any.
    pub fn effective_align(&self) -> usize {
        let natural = self.ty.bytealign();
        self.flags.packed_align.map_or(natural, |pack| pack.min(natural))
    }

    /// Number of elements in the outermost dimension, or `None` for scalars and unbounded tails.
    pub fn element_count(&self) -> Option<usize> {
        match self.vector.as_deref() {
            Some([.., 0]) | None => None,
            Some([.., last]) => Some(*last),
            Some([]) => Some(1),
        }
    }

    /// Distance between consecutive elements of the outermost dimension.
    pub fn stride(&self) -> usize {
        let inner: usize = match self.vector.as_deref() {
            Some([inner @ .., _]) => inner.iter().product(),
            _ => 1,
        };

        inner * self.ty.bytesize()
    }

    /// Fixed bytes occupied in the parent. An unbounded tail contributes nothing.
    pub fn bytesize(&self) -> usize {
        let count: usize = self.vector.as_deref().map_or(1, |dims| dims.iter().product());
        count * self.ty.bytesize()
    }

    pub fn is_extensible(&self) -> bool {
        match self.vector.as_deref() {
            Some([.., last]) => *last == 0,
            _ => self.ty.is_extensible(),
        }
    }
}
