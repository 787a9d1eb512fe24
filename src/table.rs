//! Convenience interfaces for decoding whole buffers and tables.
//!
//! The functions in this module locate the root table of a buffer, and decode
//! tables into structs through the [`FromTable`] and [`FromSlot`] traits.
//!
//! In most cases these traits can be derived. See the
//! [`FromTable`](macro@FromTable) macro for details.

use alloc::{string::String, vec::Vec};

use crate::{Error, View, scalar::Scalar};

/// Check the four-byte file identifier following the root offset.
pub fn has_identifier(bytes: &[u8], ident: &[u8; 4]) -> bool {
    bytes.get(4..8) == Some(ident.as_slice())
}

/// Create a view of the root table of a buffer.
pub fn root(bytes: &[u8]) -> Result<View<'_>, Error> {
    View::new(bytes, View::new(bytes, 0)?.indirect(0)?)
}

/// Create a view of the root table of a buffer beginning with its size.
///
/// Returns the size stored in the prefix, and the view. Offsets within the
/// buffer are relative to the end of the prefix.
pub fn size_prefixed_root(bytes: &[u8]) -> Result<(u32, View<'_>), Error> {
    let size = View::new(bytes, 0)?.get::<u32>(0)?;
    let bytes = bytes.get(4..).ok_or(Error::OutOfBounds {
        offset: 0,
        size: 4,
        len: bytes.len(),
    })?;

    Ok((size, root(bytes)?))
}

/// Decode the root table of a buffer.
pub fn decode_root<T: FromTable>(bytes: &[u8]) -> Result<T, Error> {
    T::from_table(&root(bytes)?)
}

/// Derive [`FromTable`] and [`FromSlot`] for a struct representing a table.
///
/// _Requires Cargo feature `derive`._
///
/// # Examples
///
/// Add the `slot(N)` attribute to a struct field, where `N` is the byte offset
/// of the field's vtable entry (`4 + 2 * i` for the `i`th field of the
/// schema). A field of type `Option<T>` is `None` when absent. Other fields
/// take their default, supplied as `default = EXPR` or else from [`Default`].
///
/// ```
/// #[derive(Debug, FromTable)]
/// struct Monster {
///     #[slot(4, default = 150)]
///     hp: i16,
///     #[slot(6)]
///     name: Option<String>,
///     #[slot(8)]
///     inventory: Vec<u8>,
/// }
/// ```
///
/// Derived tables implement [`FromSlot`], so they nest within one another. A
/// union value is decoded the same way; read its discriminant into a separate
/// field.
///
/// ```
/// #[derive(Debug, FromTable)]
/// struct Player {
///     #[slot(4)]
///     equipped_type: u8,
///     #[slot(6)]
///     equipped: Option<Weapon>,
/// }
/// ```
#[cfg(feature = "derive")]
pub use flatview_derive::FromTable;

/// Decode a value from a table.
///
/// See the [`FromTable`](macro@FromTable) derive macro for an automatic
/// implementation of this trait.
pub trait FromTable: Sized {
    fn from_table(view: &View<'_>) -> Result<Self, Error>;
}

/// Decode a value from a slot of a table.
///
/// Scalars are read inline. Strings, vectors and tables are read through the
/// offset stored in the slot.
pub trait FromSlot: Sized {
    /// Decode the field in a slot, or return `None` if it is absent.
    fn from_slot(view: &View<'_>, slot: u16) -> Result<Option<Self>, Error>;
}

macro_rules! from_slot_scalar {
    ($($t:ty),*) => {
        $(
            impl FromSlot for $t {
                fn from_slot(view: &View<'_>, slot: u16) -> Result<Option<Self>, Error> {
                    match view.offset(slot)? {
                        0 => Ok(None),
                        offset => view.get(view.position() + usize::from(offset)).map(Some),
                    }
                }
            }
        )*
    };
}

from_slot_scalar!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64, bool);

impl FromSlot for String {
    fn from_slot(view: &View<'_>, slot: u16) -> Result<Option<Self>, Error> {
        match view.offset(slot)? {
            0 => Ok(None),
            offset => Ok(Some(view.str(view.position() + usize::from(offset))?.into())),
        }
    }
}

impl<T: Scalar> FromSlot for Vec<T> {
    fn from_slot(view: &View<'_>, slot: u16) -> Result<Option<Self>, Error> {
        let offset = match view.offset(slot)? {
            0 => return Ok(None),
            offset => usize::from(offset),
        };

        let start = view.vector(offset)?;
        let len = view.vector_len(offset)? as usize;

        (0..len)
            .map(|i| view.get(start + i * T::WIDTH))
            .collect::<Result<_, _>>()
            .map(Some)
    }
}
