//! Errors shared by the buffer and the decoder.

use thiserror::Error;

/// The largest offset a buffer position may take.
pub(crate) const MAX_OFFSET: usize = u32::MAX as usize;

/// An error reading from or mutating a buffer.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// An argument of the wrong kind.
    #[error("Invalid argument: {0}.")]
    InvalidArgument(&'static str),
    /// An offset outside the range of a 32-bit offset.
    #[error("Offset {0} is not valid.")]
    InvalidOffset(i64),
    /// A byte range extending past either end of the buffer, or past the end
    /// of a vector.
    #[error("Access of {size} bytes at offset {offset} exceeds length {len}.")]
    OutOfBounds { offset: i64, size: usize, len: usize },
    /// Bytes expected to hold text are not UTF-8.
    #[error("Invalid text: {0}.")]
    Utf8(#[from] core::str::Utf8Error),
}

impl Error {
    pub(crate) fn out_of_bounds(offset: usize, size: usize, len: usize) -> Self {
        Self::OutOfBounds {
            offset: i64::try_from(offset).unwrap_or(i64::MAX),
            size,
            len,
        }
    }
}

/// Check that an offset lies within `[0, 2^32)`.
pub(crate) fn check_offset(offset: usize) -> Result<usize, Error> {
    if offset <= MAX_OFFSET {
        Ok(offset)
    } else {
        Err(Error::InvalidOffset(i64::try_from(offset).unwrap_or(i64::MAX)))
    }
}
