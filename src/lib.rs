#![no_std]

//! A random-access decoder for FlatBuffers-style binary tables.
//!
//! Flatview reads fields directly from the bytes of a message, without
//! unpacking it first. Tables are located through their vtables, and strings,
//! vectors and nested tables through the 32-bit offsets that reference them.
//! Every read is bounds-checked, so a malformed buffer produces an [`Error`]
//! rather than a panic. Buffers are not otherwise verified.
//!
//! Most users should begin with the functions and derive macro in the
//! [`table`] module. Decoders for individual fields, and for layouts not
//! covered there, are built on [`View`] directly. A [`ByteBuffer`] holds the
//! bytes being decoded.
//!
//! ## Cargo Features
//!
//! The following crate feature flags are available:
//!
//! - `derive`: enable derive macros (default).
//! - `std`: enable reading buffers from readers (default).
//! - `host`: enable the dynamic adapter for scripting hosts.

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod buffer;
mod error;
#[cfg(feature = "host")]
pub mod host;
pub mod scalar;
pub mod table;
pub mod view;

pub use buffer::ByteBuffer;
pub use error::Error;
pub use view::View;
