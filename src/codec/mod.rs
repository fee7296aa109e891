//! Binary codec primitives used by the primitive type descriptors.

pub mod fixed;
pub mod float;
pub mod int;

pub use fixed::FixedFormat;
pub use float::{BINARY16, BINARY32, BINARY64, FloatFormat};
pub use int::{Endian, IntWidth};
