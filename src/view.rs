//! Random-access decoding of tables, vectors and strings.
//!
//! A [`View`] is a cursor over borrowed bytes, rooted at the position of a
//! table. Field lookups go through the table's vtable, a list of 16-bit
//! offsets indexed by slot, found through a signed 32-bit offset stored at the
//! root. The vtable location is resolved on first use and cached for the life
//! of the view.
//!
//! Views are cheap; create one for each table decoded, including each nested
//! table and vector element. All multi-byte values are little-endian, and any
//! read extending past the bytes is reported as [`Error::OutOfBounds`].

use core::cell::Cell;

use crate::{
    Error,
    error::check_offset,
    scalar::{Scalar, ScalarKind, ScalarValue},
};

/// Location of a table's vtable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VTable {
    /// Absolute offset of the vtable.
    pub position: usize,
    /// Length of the vtable in bytes, including its two header entries.
    pub len: u16,
}

/// A cursor over a table.
///
/// Resolving the vtable mutates a private cache, so a view is not [`Sync`].
/// Share the bytes between threads instead, with a view per reader.
#[derive(Debug)]
pub struct View<'a> {
    bytes: &'a [u8],
    position: usize,
    vtable: Cell<Option<VTable>>,
}

impl<'a> View<'a> {
    /// Create a view of the table at an absolute position.
    pub fn new(bytes: &'a [u8], position: usize) -> Result<Self, Error> {
        Ok(Self {
            bytes,
            position: check_offset(position)?,
            vtable: Cell::new(None),
        })
    }

    /// Recreate a view whose vtable was resolved by an earlier view of the
    /// same bytes and position.
    pub(crate) fn resume(
        bytes: &'a [u8],
        position: usize,
        vtable: Option<VTable>,
    ) -> Result<Self, Error> {
        let view = Self::new(bytes, position)?;
        view.vtable.set(vtable);
        Ok(view)
    }

    /// The vtable location, if it has been resolved.
    pub(crate) fn cached_vtable(&self) -> Option<VTable> {
        self.vtable.get()
    }

    /// The bytes underlying this view.
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// The absolute position of the table.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Locate the vtable, resolving it on first use.
    pub fn vtable(&self) -> Result<VTable, Error> {
        if let Some(vtable) = self.vtable.get() {
            return Ok(vtable);
        }

        let soffset = read::<i32>(self.bytes, self.position)?;

        // Positions are bounded by `u32::MAX`, so this cannot overflow.
        let position = self.position as i64 - i64::from(soffset);
        let position = usize::try_from(position).map_err(|_| Error::OutOfBounds {
            offset: position,
            size: size_of::<u16>(),
            len: self.bytes.len(),
        })?;

        let vtable = VTable {
            position,
            len: read(self.bytes, position)?,
        };

        self.vtable.set(Some(vtable));
        Ok(vtable)
    }

    /// Look up a field by its slot, the byte offset of its entry in the vtable.
    ///
    /// Returns the field's offset relative to the table, or `0` if the field is
    /// absent, either because the slot lies beyond the vtable or because its
    /// entry is zero.
    pub fn offset(&self, slot: u16) -> Result<u16, Error> {
        let VTable { position, len } = self.vtable()?;

        if slot >= len {
            return Ok(0);
        }

        read(self.bytes, self.add(position, usize::from(slot))?)
    }

    /// Follow the 32-bit offset stored at an absolute offset.
    pub fn indirect(&self, offset: usize) -> Result<usize, Error> {
        let offset = check_offset(offset)?;
        let relative = read::<u32>(self.bytes, offset)?;
        self.add(offset, relative as usize)
    }

    /// Read the string referenced from an absolute offset.
    pub fn string(&self, offset: usize) -> Result<&'a [u8], Error> {
        let offset = self.indirect(offset)?;
        let len = read::<u32>(self.bytes, offset)?;
        take(self.bytes, self.add(offset, 4)?, len as usize)
    }

    /// Read the string referenced from an absolute offset, as UTF-8.
    pub fn str(&self, offset: usize) -> Result<&'a str, Error> {
        Ok(core::str::from_utf8(self.string(offset)?)?)
    }

    /// Locate the elements of the vector referenced from an offset relative to
    /// the table.
    ///
    /// Returns the absolute offset of the first element, past the length.
    pub fn vector(&self, offset: usize) -> Result<usize, Error> {
        let base = self.add(self.position, check_offset(offset)?)?;
        let relative = read::<u32>(self.bytes, base)?;
        self.add(self.add(base, relative as usize)?, 4)
    }

    /// Read the number of elements of the vector referenced from an offset
    /// relative to the table.
    pub fn vector_len(&self, offset: usize) -> Result<u32, Error> {
        let base = self.add(self.position, check_offset(offset)?)?;
        let relative = read::<u32>(self.bytes, base)?;
        read(self.bytes, self.add(base, relative as usize)?)
    }

    /// Read a range of the byte vector in a slot.
    ///
    /// The range defaults to the whole vector. Returns `None` if the field is
    /// absent.
    pub fn vector_as_string(
        &self,
        slot: u16,
        start: Option<usize>,
        stop: Option<usize>,
    ) -> Result<Option<&'a [u8]>, Error> {
        let offset = match self.offset(slot)? {
            0 => return Ok(None),
            offset => usize::from(offset),
        };

        let body = self.vector(offset)?;
        let len = self.vector_len(offset)? as usize;

        let start = start.unwrap_or(0);
        let stop = stop.unwrap_or(len);

        if start > stop || stop > len {
            Err(Error::OutOfBounds {
                offset: start as i64,
                size: stop.saturating_sub(start),
                len,
            })?;
        }

        take(self.bytes, self.add(body, start)?, stop - start).map(Some)
    }

    /// Create a view of the table referenced from an offset relative to this
    /// table, such as the value of a union.
    pub fn union(&self, offset: usize) -> Result<View<'a>, Error> {
        let offset = self.add(self.position, check_offset(offset)?)?;
        let relative = read::<u32>(self.bytes, offset)?;
        View::new(self.bytes, self.add(offset, relative as usize)?)
    }

    /// Decode a primitive at an absolute offset, such as a struct field.
    pub fn get<T: Scalar>(&self, offset: usize) -> Result<T, Error> {
        read(self.bytes, check_offset(offset)?)
    }

    /// Decode a primitive of a runtime encoding at an absolute offset.
    pub fn get_kind(&self, kind: ScalarKind, offset: usize) -> Result<ScalarValue, Error> {
        let offset = check_offset(offset)?;
        let r = take(self.bytes, offset, kind.width())?;
        kind.decode(r)
            .ok_or_else(|| Error::out_of_bounds(offset, kind.width(), self.bytes.len()))
    }

    /// Decode the primitive in a slot, or return `default` if it is absent.
    pub fn get_slot<T: Scalar>(&self, slot: u16, default: T) -> Result<T, Error> {
        match self.offset(slot)? {
            0 => Ok(default),
            offset => read(self.bytes, self.add(self.position, usize::from(offset))?),
        }
    }

    /// Decode the primitive of a runtime encoding in a slot, or return
    /// `default` if it is absent.
    pub fn get_slot_kind(
        &self,
        slot: u16,
        default: ScalarValue,
        kind: ScalarKind,
    ) -> Result<ScalarValue, Error> {
        match self.offset(slot)? {
            0 => Ok(default),
            offset => self.get_kind(kind, self.add(self.position, usize::from(offset))?),
        }
    }

    /// Look up the offset of the field in a slot, or return `default` if it is
    /// absent.
    pub fn get_voffset_slot(&self, slot: u16, default: u16) -> Result<u16, Error> {
        match self.offset(slot)? {
            0 => Ok(default),
            offset => Ok(offset),
        }
    }

    fn add(&self, offset: usize, n: usize) -> Result<usize, Error> {
        offset
            .checked_add(n)
            .ok_or_else(|| Error::out_of_bounds(offset, n, self.bytes.len()))
    }
}

/// Decode a primitive at an absolute offset.
fn read<T: Scalar>(r: &[u8], offset: usize) -> Result<T, Error> {
    take(r, offset, T::WIDTH)
        .ok()
        .and_then(T::decode)
        .ok_or_else(|| Error::out_of_bounds(offset, T::WIDTH, r.len()))
}

/// Take an exact number of bytes from an offset in a slice.
fn take(r: &[u8], offset: usize, n: usize) -> Result<&[u8], Error> {
    offset
        .checked_add(n)
        .and_then(|end| r.get(offset..end))
        .ok_or_else(|| Error::out_of_bounds(offset, n, r.len()))
}
