//! # structcraft
//!
//! C-style struct, union and array layouts over raw byte buffers.
//!
//! Declare fields with a [LayoutBuilder](builder::LayoutBuilder) to get an
//! immutable [Model](model::Model) with C alignment rules applied, then bind
//! its [Accessor](accessor::Accessor) to any [Buffer](buffer::Buffer) to read
//! and write fields in place. Integers of 1, 2, 3, 4, 6 and 8 bytes in either
//! byte order, IEEE-754 half/single/double floats, Q-format fixed point and
//! fixed-width byte/string fields are built in.
//!
//! ## Example
//!
//! ```
//! use structcraft::builder::LayoutBuilder;
//! use structcraft::model::ModelKind;
//! use structcraft::typemap::TypeMap;
//! use structcraft::value::Value;
//!
//! let types = TypeMap::with_primitives().unwrap();
//! let mut b = LayoutBuilder::begin_struct(&types);
//! b.add_field("uint8", &["version"], &[]).unwrap();
//! b.add_nested(ModelKind::Union, None, &[], |u| {
//!     u.add_field("uint32_be", &["word"], &[])?;
//!     u.add_field("uint8", &["bytes"], &[4])?;
//!     Ok(())
//! })
//! .unwrap();
//! let model = b.to_model().unwrap();
//! assert_eq!(model.bytesize(), 8);
//!
//! let accessor = model.create_accessor();
//! let mut buf = accessor.alloc();
//! let mut view = accessor.bind(&mut buf, 0);
//! view.set("word", 0x0a0b0c0du32).unwrap();
//! assert_eq!(view.array("bytes").unwrap().get(0).unwrap(), Value::U64(0x0a));
//! ```

pub mod accessor;
pub mod bits;
pub mod buffer;
pub mod builder;
pub mod codec;
pub mod errors;
pub mod field;
pub mod model;
pub mod typemap;
pub mod types;
pub mod value;
