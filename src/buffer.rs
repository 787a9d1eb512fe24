//! A growable byte buffer.

use alloc::{vec, vec::Vec};

use crate::{Error, scalar::Scalar};

/// Initial content of a [`ByteBuffer`].
#[derive(Debug)]
pub enum Init {
    /// A number of zero bytes.
    Size(usize),
    /// Existing content, adopted without copying.
    Bytes(Vec<u8>),
}

impl From<usize> for Init {
    fn from(size: usize) -> Self {
        Self::Size(size)
    }
}

impl From<Vec<u8>> for Init {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&[u8]> for Init {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl From<&str> for Init {
    fn from(text: &str) -> Self {
        Self::Bytes(text.as_bytes().to_vec())
    }
}

/// A value written to a single byte of a [`ByteBuffer`].
#[derive(Debug)]
pub enum ByteValue<'a> {
    Byte(u8),
    /// The first byte of some text.
    FirstByteOf(&'a [u8]),
}

impl From<u8> for ByteValue<'_> {
    fn from(b: u8) -> Self {
        Self::Byte(b)
    }
}

impl<'a> From<&'a [u8]> for ByteValue<'a> {
    fn from(text: &'a [u8]) -> Self {
        Self::FirstByteOf(text)
    }
}

impl<'a> From<&'a str> for ByteValue<'a> {
    fn from(text: &'a str) -> Self {
        Self::FirstByteOf(text.as_bytes())
    }
}

/// An owned, growable sequence of bytes.
///
/// Buffers grow toward the front: existing content stays aligned to the end,
/// matching buffers assembled back to front. A [`View`](crate::View) borrows
/// the content, so a buffer cannot grow while it is being read.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ByteBuffer {
    bytes: Vec<u8>,
}

impl ByteBuffer {
    /// Create a buffer of zero bytes, or one adopting existing content.
    ///
    /// ```
    /// let zeroed = ByteBuffer::new(16usize);
    /// let adopted = ByteBuffer::new(vec![1, 2, 3]);
    /// ```
    pub fn new(init: impl Into<Init>) -> Self {
        let bytes = match init.into() {
            Init::Size(size) => vec![0; size],
            Init::Bytes(bytes) => bytes,
        };

        Self { bytes }
    }

    /// Create a buffer of `size` zero bytes, failing rather than aborting if
    /// the memory cannot be reserved.
    pub fn try_zeroed(size: usize) -> Result<Self, Error> {
        Ok(Self {
            bytes: zeroed(size)?,
        })
    }

    /// Read the whole content of a reader into a new buffer.
    ///
    /// _Requires Cargo feature `std`._
    #[cfg(feature = "std")]
    pub fn read_from(r: &mut impl std::io::Read) -> std::io::Result<Self> {
        let mut bytes = Vec::new();
        r.read_to_end(&mut bytes)?;
        Ok(Self { bytes })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The full content as text.
    pub fn text(&self) -> Result<&str, Error> {
        Ok(core::str::from_utf8(&self.bytes)?)
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.bytes
    }

    /// Borrow a range of the content.
    ///
    /// Bounds are clamped to the content rather than rejected. A missing start
    /// is the beginning of the buffer, and a missing end is its length.
    pub fn slice(&self, start: Option<usize>, end: Option<usize>) -> &[u8] {
        let len = self.bytes.len();
        let end = end.unwrap_or(len).min(len);
        let start = start.unwrap_or(0).min(end);

        &self.bytes[start..end]
    }

    /// Grow the buffer to a new size, keeping its content at the end.
    ///
    /// Does nothing unless the new size exceeds the current length.
    pub fn grow(&mut self, size: usize) {
        let len = self.bytes.len();
        if size <= len {
            return;
        }

        let mut bytes = vec![0; size];
        bytes[size - len..].copy_from_slice(&self.bytes);
        self.bytes = bytes;
    }

    /// Copy the content into a new buffer of at least `size` bytes, keeping
    /// it at the end.
    ///
    /// Unlike [`grow`](Self::grow), fails with [`Error::InvalidArgument`] if
    /// the memory cannot be reserved.
    pub fn try_grown(&self, size: usize) -> Result<Self, Error> {
        let len = self.bytes.len();
        if size <= len {
            return Ok(self.clone());
        }

        let mut bytes = zeroed(size)?;
        bytes[size - len..].copy_from_slice(&self.bytes);
        Ok(Self { bytes })
    }

    /// Zero `n` bytes beginning at `start`.
    pub fn pad(&mut self, n: usize, start: usize) -> Result<(), Error> {
        self.range_mut(start, n)?.fill(0);
        Ok(())
    }

    /// Write a single byte.
    pub fn set<'a>(&mut self, value: impl Into<ByteValue<'a>>, index: usize) -> Result<(), Error> {
        let b = match value.into() {
            ByteValue::Byte(b) => b,
            ByteValue::FirstByteOf(text) => *text
                .first()
                .ok_or(Error::InvalidArgument("empty text has no first byte"))?,
        };

        self.range_mut(index, 1)?[0] = b;
        Ok(())
    }

    /// Write a primitive in its little-endian encoding.
    pub fn write<T: Scalar>(&mut self, value: T, offset: usize) -> Result<(), Error> {
        let len = self.bytes.len();
        value
            .encode(self.range_mut(offset, T::WIDTH)?)
            .ok_or_else(|| Error::out_of_bounds(offset, T::WIDTH, len))
    }

    fn range_mut(&mut self, start: usize, n: usize) -> Result<&mut [u8], Error> {
        let len = self.bytes.len();
        start
            .checked_add(n)
            .and_then(|end| self.bytes.get_mut(start..end))
            .ok_or_else(|| Error::out_of_bounds(start, n, len))
    }
}

fn zeroed(size: usize) -> Result<Vec<u8>, Error> {
    let mut bytes = Vec::new();
    bytes
        .try_reserve_exact(size)
        .map_err(|_| Error::InvalidArgument("size exceeds available memory"))?;
    bytes.resize(size, 0);
    Ok(bytes)
}

impl AsRef<[u8]> for ByteBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl From<Vec<u8>> for ByteBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}
