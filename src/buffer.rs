//! The byte-region contract every view is bound to.
//!
//! Codecs never touch a concrete container type; they go through [`Buffer`]
//! with an absolute byte index. Implementations are provided for owned
//! vectors (growable), fixed arrays and mutable slices (fixed size), shared
//! slices (frozen) and the [`Frozen`] wrapper.

use std::ops::Range;

use crate::errors::AccessError;

/// A contiguous, byte-addressed region.
pub trait Buffer {
    /// Current length in bytes.
    fn bytesize(&self) -> usize;

    /// Copies `out.len()` bytes starting at `index` into `out`.
    fn read_slice(&self, index: usize, out: &mut [u8]) -> Result<(), AccessError>;

    /// Overwrites `bytes.len()` bytes starting at `index`.
    fn write_slice(&mut self, index: usize, bytes: &[u8]) -> Result<(), AccessError>;

    fn get_byte(&self, index: usize) -> Result<u8, AccessError> {
        let mut byte = [0u8];
        self.read_slice(index, &mut byte)?;
        Ok(byte[0])
    }

    fn set_byte(&mut self, index: usize, value: u8) -> Result<(), AccessError> {
        self.write_slice(index, &[value])
    }

    /// Changes the length, zero-filling any new bytes. Only growable buffers support this.
    fn resize(&mut self, new_bytesize: usize) -> Result<(), AccessError> {
        Err(AccessError::BufferTooSmall {
            requested: new_bytesize,
            bytesize: self.bytesize(),
        })
    }

    /// A frozen buffer rejects every write.
    fn is_frozen(&self) -> bool {
        false
    }
}

/// Validates that `index..index + len` lies inside a region of `bytesize` bytes.
pub fn check_range(bytesize: usize, index: usize, len: usize) -> Result<Range<usize>, AccessError> {
    match index.checked_add(len) {
        Some(end) if end <= bytesize => Ok(index..end),
        end => Err(AccessError::Bounds {
            offset: index,
            end: end.unwrap_or(usize::MAX),
            bytesize,
        }),
    }
}

/// Writes `bytes` into `index..index + capacity`, zero-filling the rest of the region.
pub fn write_padded(
    buffer: &mut dyn Buffer,
    index: usize,
    capacity: usize,
    bytes: &[u8],
) -> Result<(), AccessError> {
    if bytes.len() > capacity {
        return Err(AccessError::ValueTooLong {
            len: bytes.len(),
            capacity,
        });
    }

    let mut region = vec![0u8; capacity];
    region[..bytes.len()].copy_from_slice(bytes);
    buffer.write_slice(index, &region)
}

fn read_from(data: &[u8], index: usize, out: &mut [u8]) -> Result<(), AccessError> {
    let range = check_range(data.len(), index, out.len())?;
    out.copy_from_slice(&data[range]);
    Ok(())
}

fn write_into(data: &mut [u8], index: usize, bytes: &[u8]) -> Result<(), AccessError> {
    let range = check_range(data.len(), index, bytes.len())?;
    data[range].copy_from_slice(bytes);
    Ok(())
}

fn frozen_buffer() -> AccessError {
    AccessError::Immutable("a frozen buffer".to_string())
}

impl Buffer for Vec<u8> {
    fn bytesize(&self) -> usize {
        self.len()
    }

    fn read_slice(&self, index: usize, out: &mut [u8]) -> Result<(), AccessError> {
        read_from(self, index, out)
    }

    fn write_slice(&mut self, index: usize, bytes: &[u8]) -> Result<(), AccessError> {
        write_into(self, index, bytes)
    }

    fn resize(&mut self, new_bytesize: usize) -> Result<(), AccessError> {
        Vec::resize(self, new_bytesize, 0);
        Ok(())
    }
}

impl<const N: usize> Buffer for [u8; N] {
    fn bytesize(&self) -> usize {
        N
    }

    fn read_slice(&self, index: usize, out: &mut [u8]) -> Result<(), AccessError> {
        read_from(self, index, out)
    }

    fn write_slice(&mut self, index: usize, bytes: &[u8]) -> Result<(), AccessError> {
        write_into(self, index, bytes)
    }
}

impl Buffer for &mut [u8] {
    fn bytesize(&self) -> usize {
        self.len()
    }

    fn read_slice(&self, index: usize, out: &mut [u8]) -> Result<(), AccessError> {
        read_from(self, index, out)
    }

    fn write_slice(&mut self, index: usize, bytes: &[u8]) -> Result<(), AccessError> {
        write_into(self, index, bytes)
    }
}

/// Shared slices are read-only views of someone else's memory.
impl Buffer for &[u8] {
    fn bytesize(&self) -> usize {
        self.len()
    }

    fn read_slice(&self, index: usize, out: &mut [u8]) -> Result<(), AccessError> {
        read_from(self, index, out)
    }

    fn write_slice(&mut self, _index: usize, _bytes: &[u8]) -> Result<(), AccessError> {
        Err(frozen_buffer())
    }

    fn is_frozen(&self) -> bool {
        true
    }
}

/// Wraps any buffer and rejects writes and growth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frozen<B>(pub B);

impl<B: Buffer> Buffer for Frozen<B> {
    fn bytesize(&self) -> usize {
        self.0.bytesize()
    }

    fn read_slice(&self, index: usize, out: &mut [u8]) -> Result<(), AccessError> {
        self.0.read_slice(index, out)
    }

    fn write_slice(&mut self, _index: usize, _bytes: &[u8]) -> Result<(), AccessError> {
        Err(frozen_buffer())
    }

    fn resize(&mut self, _new_bytesize: usize) -> Result<(), AccessError> {
        Err(frozen_buffer())
    }

    fn is_frozen(&self) -> bool {
        true
    }
}
