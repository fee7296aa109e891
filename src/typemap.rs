//! Per-build type scope: names bound to descriptors, models and typedef aliases.

use std::{
    collections::BTreeMap,
    ffi::c_long,
    sync::{Arc, OnceLock},
};

use tracing::debug;

use crate::{
    codec::{BINARY16, BINARY32, BINARY64, Endian, FixedFormat, IntWidth},
    errors::{PlatformError, SchemaError},
    field::FieldType,
    model::Model,
    types::{Primitive, TypeDescriptor},
};

/// A type named in a builder call: a map lookup, or a descriptor/model passed directly.
#[derive(Debug, Clone)]
pub enum TypeRef {
    Name(String),
    Descriptor(Arc<dyn TypeDescriptor>),
    Model(Arc<Model>),
}

impl From<&str> for TypeRef {
    fn from(name: &str) -> Self {
        TypeRef::Name(name.to_string())
    }
}

impl From<String> for TypeRef {
    fn from(name: String) -> Self {
        TypeRef::Name(name)
    }
}

impl From<Arc<dyn TypeDescriptor>> for TypeRef {
    fn from(ty: Arc<dyn TypeDescriptor>) -> Self {
        TypeRef::Descriptor(ty)
    }
}

impl From<Arc<Model>> for TypeRef {
    fn from(model: Arc<Model>) -> Self {
        TypeRef::Model(model)
    }
}

impl From<&Arc<Model>> for TypeRef {
    fn from(model: &Arc<Model>) -> Self {
        TypeRef::Model(Arc::clone(model))
    }
}

/// A resolved binding. `dims` is non-empty for typedefs of array types.
#[derive(Debug, Clone)]
pub struct TypeEntry {
    pub ty: FieldType,
    pub dims: Vec<usize>,
}

impl TypeEntry {
    fn plain(ty: FieldType) -> Self {
        TypeEntry { ty, dims: Vec::new() }
    }
}

/// Identifier → type bindings consulted by a builder and everything nested in it.
///
/// ```
/// use structcraft::typemap::TypeMap;
///
/// let types = TypeMap::with_primitives().unwrap();
/// assert!(types.contains("uint16_be"));
/// assert!(types.contains("fixed32q16_le"));
/// assert!(!TypeMap::new().contains("int"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct TypeMap {
    entries: BTreeMap<String, TypeEntry>,
}

impl TypeMap {
    /// An empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// A map seeded with the primitive table.
    pub fn with_primitives() -> Result<Self, PlatformError> {
        Ok(TypeMap {
            entries: primitive_table()?.clone(),
        })
    }

    pub fn insert(&mut self, name: impl Into<String>, ty: Arc<dyn TypeDescriptor>) -> &mut Self {
        self.entries
            .insert(name.into(), TypeEntry::plain(FieldType::Scalar(ty)));
        self
    }

    /// Binds a built struct or union so later layouts can refer to it by name.
    pub fn insert_model(&mut self, name: impl Into<String>, model: Arc<Model>) -> &mut Self {
        self.entries
            .insert(name.into(), TypeEntry::plain(FieldType::Model(model)));
        self
    }

    /// Binds `alias` to `target` with extra array dimensions. When `target` is
    /// itself an array typedef, its dimensions stay innermost.
    pub fn typedef(
        &mut self,
        alias: &str,
        target: impl Into<TypeRef>,
        dims: &[usize],
    ) -> Result<&mut Self, SchemaError> {
        check_identifier(alias)?;
        let entry = self.resolve(target.into(), dims, alias)?;
        self.entries.insert(alias.to_string(), entry);
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&TypeEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Looks up `ty` and appends `dims` as outer dimensions. `field` names the
    /// declaration in dimension errors.
    pub fn resolve(&self, ty: TypeRef, dims: &[usize], field: &str) -> Result<TypeEntry, SchemaError> {
        let base = match ty {
            TypeRef::Name(name) => self
                .entries
                .get(&name)
                .cloned()
                .ok_or(SchemaError::UnknownType(name))?,
            TypeRef::Descriptor(ty) => TypeEntry::plain(FieldType::Scalar(ty)),
            TypeRef::Model(model) => TypeEntry::plain(FieldType::Model(model)),
        };

        let mut all = base.dims;
        all.extend_from_slice(dims);

        let zero_inside = all.split_last().is_some_and(|(_, inner)| inner.contains(&0));
        let array_of_unbounded = !all.is_empty() && base.ty.is_extensible();
        if zero_inside || array_of_unbounded {
            return Err(SchemaError::InvalidDimension {
                name: field.to_string(),
                dims: all,
            });
        }

        Ok(TypeEntry { ty: base.ty, dims: all })
    }
}

/// Checks `[A-Za-z_][0-9A-Za-z_]*`.
pub fn check_identifier(name: &str) -> Result<(), SchemaError> {
    let mut chars = name.chars();
    let head_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');

    if head_ok && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(SchemaError::InvalidIdentifier(name.to_string()))
    }
}

static PRIMITIVES: OnceLock<Result<BTreeMap<String, TypeEntry>, PlatformError>> = OnceLock::new();

/// The primitive table, built on first use.
pub fn primitive_table() -> Result<&'static BTreeMap<String, TypeEntry>, PlatformError> {
    PRIMITIVES
        .get_or_init(build_primitives)
        .as_ref()
        .map_err(Clone::clone)
}

const SUFFIXES: [(&str, Endian); 4] = [
    ("", Endian::Native),
    ("_t", Endian::Native),
    ("_be", Endian::Big),
    ("_le", Endian::Little),
];

const INTS: [(&str, IntWidth, bool); 12] = [
    ("int8", IntWidth::W8, true),
    ("uint8", IntWidth::W8, false),
    ("int16", IntWidth::W16, true),
    ("uint16", IntWidth::W16, false),
    ("int24", IntWidth::W24, true),
    ("uint24", IntWidth::W24, false),
    ("int32", IntWidth::W32, true),
    ("uint32", IntWidth::W32, false),
    ("int48", IntWidth::W48, true),
    ("uint48", IntWidth::W48, false),
    ("int64", IntWidth::W64, true),
    ("uint64", IntWidth::W64, false),
];

const FIXED: [(IntWidth, u32); 6] = [
    (IntWidth::W16, 8),
    (IntWidth::W32, 6),
    (IntWidth::W32, 8),
    (IntWidth::W32, 12),
    (IntWidth::W32, 16),
    (IntWidth::W32, 24),
];

fn native_width(name: &'static str, bytes: usize) -> Result<IntWidth, PlatformError> {
    match bytes {
        4 => Ok(IntWidth::W32),
        8 => Ok(IntWidth::W64),
        _ => Err(PlatformError::UnsupportedWidth { name, bytes }),
    }
}

fn build_primitives() -> Result<BTreeMap<String, TypeEntry>, PlatformError> {
    let size = native_width("size_t", size_of::<usize>())?;
    let long = native_width("long", size_of::<c_long>())?;

    let mut table: Vec<Primitive> = Vec::new();

    for (suffix, endian) in SUFFIXES {
        for (base, width, signed) in INTS {
            table.push(Primitive::int(format!("{base}{suffix}"), width, signed, endian));
        }

        for (base, format) in [("float16", BINARY16), ("float32", BINARY32), ("float64", BINARY64)] {
            table.push(Primitive::float(format!("{base}{suffix}"), format, endian));
        }

        for (width, frac) in FIXED {
            let bits = width.bits();
            for (prefix, signed) in [("fixed", true), ("ufixed", false)] {
                table.push(Primitive::fixed(
                    format!("{prefix}{bits}q{frac}{suffix}"),
                    FixedFormat::new(width, signed, frac),
                    endian,
                ));
            }
        }
    }

    let c_ints = [
        ("char", IntWidth::W8, true),
        ("uchar", IntWidth::W8, false),
        ("short", IntWidth::W16, true),
        ("ushort", IntWidth::W16, false),
        ("int", IntWidth::W32, true),
        ("uint", IntWidth::W32, false),
        ("long", long, true),
        ("ulong", long, false),
        ("longlong", IntWidth::W64, true),
        ("ulonglong", IntWidth::W64, false),
        ("size_t", size, false),
        ("ssize_t", size, true),
        ("intptr_t", size, true),
        ("uintptr_t", size, false),
    ];
    for (name, width, signed) in c_ints {
        table.push(Primitive::int(name, width, signed, Endian::Native));
    }
    table.push(Primitive::float("float", BINARY32, Endian::Native));
    table.push(Primitive::float("double", BINARY64, Endian::Native));

    debug!(
        count = table.len(),
        size_t = size.bytesize(),
        long = long.bytesize(),
        "built primitive type table"
    );

    Ok(table
        .into_iter()
        .map(|p| {
            let name = p.name().to_string();
            (name, TypeEntry::plain(FieldType::Scalar(Arc::new(p))))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Encoding, StringPolicy, UString};

    fn primitive(types: &TypeMap, name: &str) -> Arc<dyn TypeDescriptor> {
        match &types.get(name).unwrap().ty {
            FieldType::Scalar(ty) => Arc::clone(ty),
            FieldType::Model(_) => panic!("{name} is a model"),
        }
    }

    #[test]
    fn test_primitive_sizes() {
        let types = TypeMap::with_primitives().unwrap();
        for (name, size, align) in [
            ("int8", 1, 1),
            ("uint16_be", 2, 2),
            ("int24_le", 3, 1),
            ("uint48_t", 6, 1),
            ("int64", 8, 8),
            ("float16_be", 2, 2),
            ("float32", 4, 4),
            ("float64_le", 8, 8),
            ("fixed16q8", 2, 2),
            ("ufixed32q24_be", 4, 4),
            ("char", 1, 1),
            ("short", 2, 2),
            ("int", 4, 4),
            ("longlong", 8, 8),
            ("double", 8, 8),
        ] {
            let ty = primitive(&types, name);
            assert_eq!((ty.bytesize(), ty.bytealign()), (size, align), "{name}");
        }

        assert_eq!(primitive(&types, "size_t").bytesize(), size_of::<usize>());
        assert_eq!(primitive(&types, "long").bytesize(), size_of::<c_long>());
    }

    #[test]
    fn test_table_is_shared() {
        let a = primitive_table().unwrap();
        let b = primitive_table().unwrap();
        assert!(std::ptr::eq(a, b));
        assert!(a.contains_key("fixed32q12_t"));
        assert!(!a.contains_key("fixed32q10"));
    }

    #[test]
    fn test_unknown_type() {
        let types = TypeMap::new();
        assert_eq!(
            types.resolve("int32".into(), &[], "a").unwrap_err(),
            SchemaError::UnknownType("int32".to_string())
        );
    }

    #[test]
    fn test_insert_user_type() {
        let mut types = TypeMap::new();
        types.insert("name_t", Arc::new(UString::new(16, StringPolicy::Truncate)));
        let entry = types.resolve("name_t".into(), &[2], "names").unwrap();
        assert_eq!(entry.ty.bytesize(), 16);
        assert_eq!(entry.dims, vec![2]);
    }

    #[test]
    fn test_typedef_concatenates_dimensions() {
        let mut types = TypeMap::with_primitives().unwrap();
        types.typedef("vec3", "float32", &[3]).unwrap();
        types.typedef("mat3", "vec3", &[3]).unwrap();

        let entry = types.resolve("mat3".into(), &[0], "m").unwrap();
        assert_eq!(entry.dims, vec![3, 3, 0]);
        assert!(matches!(
            &entry.ty,
            FieldType::Scalar(ty) if ty.name() == "float32"
        ));
    }

    #[test]
    fn test_typedef_rejects_bad_input() {
        let mut types = TypeMap::with_primitives().unwrap();
        assert_eq!(
            types.typedef("2bad", "int", &[]).unwrap_err(),
            SchemaError::InvalidIdentifier("2bad".to_string())
        );

        types.typedef("tail", "int", &[0]).unwrap();
        assert_eq!(
            types.resolve("tail".into(), &[2], "x").unwrap_err(),
            SchemaError::InvalidDimension {
                name: "x".to_string(),
                dims: vec![0, 2]
            }
        );
    }

    #[test]
    fn test_fixed_names_map_to_formats() {
        let types = TypeMap::with_primitives().unwrap();
        let entry = types.get("ufixed32q6_le").unwrap();
        let FieldType::Scalar(ty) = &entry.ty else {
            panic!("expected a scalar");
        };
        assert_eq!(ty.name(), "ufixed32q6_le");

        let mut buf = vec![0u8; 4];
        ty.encode(&mut buf, 0, &crate::value::Value::F64(1.0)).unwrap();
        assert_eq!(buf, vec![64, 0, 0, 0]);

        let prim = Primitive::fixed("q", FixedFormat::new(IntWidth::W32, false, 6), Endian::Little);
        assert!(matches!(prim.encoding(), Encoding::Fixed(f) if !f.signed));
    }

    #[test]
    fn test_check_identifier() {
        assert!(check_identifier("_a1").is_ok());
        assert!(check_identifier("Abc").is_ok());
        assert!(check_identifier("").is_err());
        assert!(check_identifier("a-b").is_err());
        assert!(check_identifier("1a").is_err());
    }
}
