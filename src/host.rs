//! Dynamic adapter for scripting hosts.
//!
//! _Requires Cargo feature `host`._
//!
//! A [`Host`] owns buffers and views on behalf of a dynamically-typed caller,
//! and exposes them through opaque handles. Members are looked up by name with
//! [`Host::index`], which returns either the value of a property or a
//! [`Method`], invoked with [`Host::call`] on the receiver and its arguments.
//! Handles are freed with [`Host::release`]; a released handle is never valid
//! again, even once its slot is reused.
//!
//! Buffers expose the properties `size` and `str`, and the methods `Slice`,
//! `Grow`, `Pad` and `Set`. Views expose the properties `bytes` and `pos`,
//! and the methods `Offset`, `Indirect`, `String`, `VectorLen`, `Vector`,
//! `VectorAsString`, `Union`, `Get`, `GetSlot` and `GetVOffsetTSlot`.
//!
//! A view shares the storage of the buffer it was created from, so it observes
//! `Set` and `Pad` on that buffer. `Grow` moves the buffer to new storage;
//! views created before it keep reading the old bytes. A view resolves its
//! vtable once and keeps it for its lifetime, until repositioned by `Union`.
//!
//! Numbers passed as offsets must lie within `[0, 2^32)`, and fractional
//! numbers are truncated.

use alloc::{rc::Rc, string::String, vec::Vec};
use core::cell::{Ref, RefCell};

use either::Either::{self, Left, Right};
use thiserror::Error;

use crate::{
    ByteBuffer, View,
    error::MAX_OFFSET,
    scalar::{ScalarKind, ScalarValue},
    view::VTable,
};

/// Errors occurring while dispatching a member.
#[derive(Debug, Error, PartialEq)]
pub enum Error {
    /// An error from the buffer or decoder.
    #[error(transparent)]
    Decode(#[from] crate::Error),
    /// The member does not exist on the receiver.
    #[error("Unknown member `{0}`.")]
    UnknownMember(String),
    /// The property exists, but cannot be read.
    #[error("Property `{0}` is inaccessible.")]
    Inaccessible(&'static str),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct Key {
    index: usize,
    generation: u32,
}

/// Handle to a buffer owned by a [`Host`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferId(Key);

impl BufferId {
    /// The slot this handle occupies. Slots are reused after release.
    pub fn index(self) -> usize {
        self.0.index
    }
}

/// Handle to a view owned by a [`Host`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ViewId(Key);

impl ViewId {
    /// The slot this handle occupies. Slots are reused after release.
    pub fn index(self) -> usize {
        self.0.index
    }
}

/// A dynamically-typed value exchanged with the caller.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    /// Text, as raw bytes.
    Str(Vec<u8>),
    Buffer(BufferId),
    View(ViewId),
    /// A primitive encoding, passed to `Get` and `GetSlot`.
    Codec(ScalarKind),
}

impl From<ScalarValue> for Value {
    fn from(v: ScalarValue) -> Self {
        match v {
            ScalarValue::U8(v) => Self::UInt(v.into()),
            ScalarValue::U16(v) => Self::UInt(v.into()),
            ScalarValue::U32(v) => Self::UInt(v.into()),
            ScalarValue::U64(v) => Self::UInt(v),
            ScalarValue::I8(v) => Self::Int(v.into()),
            ScalarValue::I16(v) => Self::Int(v.into()),
            ScalarValue::I32(v) => Self::Int(v.into()),
            ScalarValue::I64(v) => Self::Int(v),
            ScalarValue::F32(v) => Self::Float(v.into()),
            ScalarValue::F64(v) => Self::Float(v),
            ScalarValue::Bool(v) => Self::Bool(v),
        }
    }
}

/// A method of a buffer or view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    Slice,
    Grow,
    Pad,
    Set,

    Offset,
    Indirect,
    String,
    VectorLen,
    Vector,
    VectorAsString,
    Union,
    Get,
    GetSlot,
    GetVOffsetTSlot,
}

impl Method {
    fn buffer_method(name: &str) -> Option<Self> {
        Some(match name {
            "Slice" => Self::Slice,
            "Grow" => Self::Grow,
            "Pad" => Self::Pad,
            "Set" => Self::Set,
            _ => None?,
        })
    }

    fn view_method(name: &str) -> Option<Self> {
        Some(match name {
            "Offset" => Self::Offset,
            "Indirect" => Self::Indirect,
            "String" => Self::String,
            "VectorLen" => Self::VectorLen,
            "Vector" => Self::Vector,
            "VectorAsString" => Self::VectorAsString,
            "Union" => Self::Union,
            "Get" => Self::Get,
            "GetSlot" => Self::GetSlot,
            "GetVOffsetTSlot" => Self::GetVOffsetTSlot,
            _ => None?,
        })
    }
}

/// Bytes shared between a buffer and the views created from it.
type Storage = Rc<RefCell<ByteBuffer>>;

/// A slot table handing out generational keys.
#[derive(Debug)]
struct Slots<T> {
    entries: Vec<Entry<T>>,
    free: Vec<usize>,
}

#[derive(Debug)]
struct Entry<T> {
    generation: u32,
    value: Option<T>,
}

impl<T> Default for Slots<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            free: Vec::new(),
        }
    }
}

impl<T> Slots<T> {
    fn insert(&mut self, value: T) -> Key {
        if let Some(index) = self.free.pop() {
            let entry = &mut self.entries[index];
            entry.value = Some(value);
            return Key {
                index,
                generation: entry.generation,
            };
        }

        self.entries.push(Entry {
            generation: 0,
            value: Some(value),
        });

        Key {
            index: self.entries.len() - 1,
            generation: 0,
        }
    }

    fn get(&self, key: Key) -> Option<&T> {
        self.entries
            .get(key.index)
            .filter(|entry| entry.generation == key.generation)?
            .value
            .as_ref()
    }

    fn get_mut(&mut self, key: Key) -> Option<&mut T> {
        self.entries
            .get_mut(key.index)
            .filter(|entry| entry.generation == key.generation)?
            .value
            .as_mut()
    }

    fn remove(&mut self, key: Key) -> Option<T> {
        let entry = self
            .entries
            .get_mut(key.index)
            .filter(|entry| entry.generation == key.generation)?;

        let value = entry.value.take()?;
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(key.index);

        Some(value)
    }
}

#[derive(Debug)]
struct ViewRecord {
    storage: Storage,
    position: usize,
    vtable: Option<VTable>,
    /// A buffer handle sharing `storage`, once one has been handed out.
    buffer: Option<BufferId>,
}

/// Owner of the buffers and views handed to a caller.
#[derive(Debug, Default)]
pub struct Host {
    buffers: Slots<Storage>,
    views: Slots<ViewRecord>,
}

impl Host {
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrow a buffer by its handle.
    pub fn buffer(&self, id: BufferId) -> Option<Ref<'_, ByteBuffer>> {
        self.buffers.get(id.0).map(|storage| storage.borrow())
    }

    /// Create a buffer from a size or from text.
    pub fn new_buffer(&mut self, init: &Value) -> Result<Value, Error> {
        let buffer = match init {
            Value::Str(bytes) => ByteBuffer::new(bytes.as_slice()),
            Value::Int(_) | Value::UInt(_) | Value::Float(_) => {
                ByteBuffer::try_zeroed(size(init)?)?
            }
            _ => Err(crate::Error::InvalidArgument(
                "expected an integer size or text to construct a buffer",
            ))?,
        };

        let id = BufferId(self.buffers.insert(Rc::new(RefCell::new(buffer))));
        Ok(Value::Buffer(id))
    }

    /// Create a view of a buffer, or of a copy of some text, at a position.
    pub fn new_view(&mut self, bytes: &Value, position: &Value) -> Result<Value, Error> {
        let (storage, buffer) = match bytes {
            Value::Str(bytes) => (Rc::new(RefCell::new(ByteBuffer::new(bytes.as_slice()))), None),
            Value::Buffer(id) => (self.storage(*id)?.clone(), Some(*id)),
            _ => Err(crate::Error::InvalidArgument(
                "expected a buffer or text to construct a view",
            ))?,
        };

        let record = ViewRecord {
            storage,
            position: offset(position)?,
            vtable: None,
            buffer,
        };

        Ok(Value::View(ViewId(self.views.insert(record))))
    }

    /// Release a buffer or view handle.
    ///
    /// Views of a released buffer keep its bytes alive.
    pub fn release(&mut self, target: &Value) -> Result<(), Error> {
        let released = match target {
            Value::Buffer(id) => self.buffers.remove(id.0).is_some(),
            Value::View(id) => self.views.remove(id.0).is_some(),
            _ => Err(crate::Error::InvalidArgument("expected a buffer or view"))?,
        };

        if !released {
            Err(crate::Error::InvalidArgument("unknown handle"))?;
        }

        Ok(())
    }

    /// The length of a buffer.
    pub fn length(&self, target: &Value) -> Result<Value, Error> {
        let len = self.receive_buffer(target)?.borrow().len();
        Ok(Value::UInt(len as u64))
    }

    /// Look up a member of a buffer or view by name.
    ///
    /// Returns the value of a property, or a method to invoke with
    /// [`Host::call`].
    pub fn index(&mut self, target: &Value, key: &str) -> Result<Either<Value, Method>, Error> {
        match target {
            Value::Buffer(_) => {
                let buffer = self.receive_buffer(target)?.borrow();

                Ok(match key {
                    "size" => Left(Value::UInt(buffer.len() as u64)),
                    "str" => Left(Value::Str(buffer.as_bytes().to_vec())),
                    "data" => Err(Error::Inaccessible("data"))?,
                    _ => Right(Method::buffer_method(key).ok_or_else(|| unknown(key))?),
                })
            }
            Value::View(id) => {
                let id = *id;

                Ok(match key {
                    "bytes" => Left(Value::Buffer(self.view_buffer(id)?)),
                    "pos" => Left(Value::UInt(self.record(id)?.position as u64)),
                    _ => Right(Method::view_method(key).ok_or_else(|| unknown(key))?),
                })
            }
            _ => Err(crate::Error::InvalidArgument("expected a buffer or view"))?,
        }
    }

    /// Invoke a method, passing the receiver as the first argument.
    ///
    /// Missing trailing arguments are treated as [`Value::Nil`].
    pub fn call(&mut self, method: Method, args: &[Value]) -> Result<Value, Error> {
        let arg = |i: usize| args.get(i).unwrap_or(&Value::Nil);
        let receiver = arg(0);

        Ok(match method {
            Method::Slice => {
                let buffer = self.receive_buffer(receiver)?.borrow();
                let slice = buffer.slice(clamped(arg(1)), clamped(arg(2)));
                Value::Str(slice.to_vec())
            }
            Method::Grow => {
                let size = size(arg(1))?;
                let storage = self.receive_buffer_mut(receiver)?;

                if size > storage.borrow().len() {
                    let grown = storage.borrow().try_grown(size)?;
                    *storage = Rc::new(RefCell::new(grown));
                }

                Value::Nil
            }
            Method::Pad => {
                let (n, start) = (size(arg(1))?, size(arg(2))?);
                self.receive_buffer(receiver)?.borrow_mut().pad(n, start)?;
                Value::Nil
            }
            Method::Set => {
                let index = size(arg(2))?;
                let mut buffer = self.receive_buffer(receiver)?.borrow_mut();

                match arg(1) {
                    Value::Str(text) => buffer.set(text.as_slice(), index)?,
                    Value::Int(v) => buffer.set(*v as u8, index)?,
                    Value::UInt(v) => buffer.set(*v as u8, index)?,
                    Value::Float(v) => buffer.set(*v as i64 as u8, index)?,
                    _ => Err(crate::Error::InvalidArgument(
                        "expected a number or text to set a byte",
                    ))?,
                }

                Value::Nil
            }

            Method::Union => {
                let this = self.receive_view(receiver)?;
                let Value::View(target) = arg(1) else {
                    Err(crate::Error::InvalidArgument("expected a view to reposition"))?
                };
                self.record(*target)?;

                let relative = offset(arg(2))?;
                let position = self.with_view(this, |view| Ok(view.union(relative)?.position()))?;

                let this = self.record(this)?;
                let (storage, buffer) = (this.storage.clone(), this.buffer);

                *self.record_mut(*target)? = ViewRecord {
                    storage,
                    position,
                    vtable: None,
                    buffer,
                };

                Value::Nil
            }
            _ => {
                let id = self.receive_view(receiver)?;
                self.with_view(id, |view| view_call(view, method, &arg))?
            }
        })
    }

    fn storage(&self, id: BufferId) -> Result<&Storage, Error> {
        Ok(self
            .buffers
            .get(id.0)
            .ok_or(crate::Error::InvalidArgument("unknown buffer"))?)
    }

    fn receive_buffer(&self, target: &Value) -> Result<&Storage, Error> {
        let Value::Buffer(id) = target else {
            Err(crate::Error::InvalidArgument("expected a buffer"))?
        };

        self.storage(*id)
    }

    fn receive_buffer_mut(&mut self, target: &Value) -> Result<&mut Storage, Error> {
        let Value::Buffer(id) = target else {
            Err(crate::Error::InvalidArgument("expected a buffer"))?
        };

        Ok(self
            .buffers
            .get_mut(id.0)
            .ok_or(crate::Error::InvalidArgument("unknown buffer"))?)
    }

    fn receive_view(&self, target: &Value) -> Result<ViewId, Error> {
        let Value::View(id) = target else {
            Err(crate::Error::InvalidArgument("expected a view"))?
        };

        self.record(*id)?;
        Ok(*id)
    }

    fn record(&self, id: ViewId) -> Result<&ViewRecord, Error> {
        Ok(self
            .views
            .get(id.0)
            .ok_or(crate::Error::InvalidArgument("unknown view"))?)
    }

    fn record_mut(&mut self, id: ViewId) -> Result<&mut ViewRecord, Error> {
        Ok(self
            .views
            .get_mut(id.0)
            .ok_or(crate::Error::InvalidArgument("unknown view"))?)
    }

    /// Run a decoding step on a view, keeping any vtable it resolves.
    fn with_view<R>(
        &mut self,
        id: ViewId,
        f: impl FnOnce(&View<'_>) -> Result<R, Error>,
    ) -> Result<R, Error> {
        let record = self.record_mut(id)?;
        let storage = record.storage.borrow();

        let view = View::resume(storage.as_bytes(), record.position, record.vtable)?;
        let result = f(&view);
        record.vtable = view.cached_vtable();

        result
    }

    /// A buffer handle sharing the storage of a view.
    ///
    /// Reuses the handle the view was created from, unless that buffer has
    /// since grown or been released.
    fn view_buffer(&mut self, id: ViewId) -> Result<BufferId, Error> {
        let record = self.record(id)?;

        if let Some(buffer) = record.buffer {
            let shared = self
                .buffers
                .get(buffer.0)
                .is_some_and(|storage| Rc::ptr_eq(storage, &record.storage));

            if shared {
                return Ok(buffer);
            }
        }

        let storage = record.storage.clone();
        let buffer = BufferId(self.buffers.insert(storage));
        self.record_mut(id)?.buffer = Some(buffer);

        Ok(buffer)
    }
}

fn view_call<'v>(
    view: &View<'_>,
    method: Method,
    arg: &impl Fn(usize) -> &'v Value,
) -> Result<Value, Error> {
    Ok(match method {
        Method::Offset => Value::UInt(view.offset(slot(arg(1))?)?.into()),
        Method::Indirect => Value::UInt(view.indirect(offset(arg(1))?)? as u64),
        Method::String => Value::Str(view.string(offset(arg(1))?)?.to_vec()),
        Method::VectorLen => Value::UInt(view.vector_len(offset(arg(1))?)?.into()),
        Method::Vector => Value::UInt(view.vector(offset(arg(1))?)? as u64),
        Method::VectorAsString => {
            let (start, stop) = (optional(arg(2))?, optional(arg(3))?);

            match view.vector_as_string(slot(arg(1))?, start, stop)? {
                Some(bytes) => Value::Str(bytes.to_vec()),
                None => Value::Nil,
            }
        }
        Method::Get => view.get_kind(codec(arg(1))?, offset(arg(2))?)?.into(),
        Method::GetSlot => match view.offset(slot(arg(1))?)? {
            0 => arg(2).clone(),
            relative => {
                let offset = view.position() + usize::from(relative);
                view.get_kind(codec(arg(3))?, offset)?.into()
            }
        },
        Method::GetVOffsetTSlot => match view.offset(slot(arg(1))?)? {
            0 => arg(2).clone(),
            relative => Value::UInt(relative.into()),
        },
        Method::Slice | Method::Grow | Method::Pad | Method::Set | Method::Union => {
            Err(crate::Error::InvalidArgument("expected a buffer"))?
        }
    })
}

fn unknown(key: &str) -> Error {
    Error::UnknownMember(key.into())
}

/// Convert a number to an integer, truncating any fraction.
fn integer(v: &Value) -> Option<i128> {
    match v {
        Value::Int(v) => Some((*v).into()),
        Value::UInt(v) => Some((*v).into()),
        Value::Float(v) if v.is_finite() => Some(*v as i128),
        _ => None,
    }
}

fn offset(v: &Value) -> Result<usize, crate::Error> {
    let n = integer(v).ok_or(crate::Error::InvalidArgument("expected an offset"))?;

    if !(0..=MAX_OFFSET as i128).contains(&n) {
        Err(crate::Error::InvalidOffset(n.clamp(i64::MIN.into(), i64::MAX.into()) as i64))?;
    }

    Ok(n as usize)
}

/// Slots are 16-bit; larger offsets are rejected rather than truncated.
fn slot(v: &Value) -> Result<u16, crate::Error> {
    let n = offset(v)?;
    u16::try_from(n).map_err(|_| crate::Error::InvalidOffset(n as i64))
}

fn size(v: &Value) -> Result<usize, crate::Error> {
    let n = integer(v).ok_or(crate::Error::InvalidArgument("expected a size"))?;
    usize::try_from(n).map_err(|_| crate::Error::InvalidArgument("expected a non-negative size"))
}

fn optional(v: &Value) -> Result<Option<usize>, crate::Error> {
    match v {
        Value::Nil => Ok(None),
        v => size(v).map(Some),
    }
}

/// Clamp a bound to zero, ignoring anything but a number.
fn clamped(v: &Value) -> Option<usize> {
    integer(v).map(|n| usize::try_from(n.max(0)).unwrap_or(usize::MAX))
}

fn codec(v: &Value) -> Result<ScalarKind, crate::Error> {
    match v {
        Value::Codec(kind) => Ok(*kind),
        _ => Err(crate::Error::InvalidArgument("expected a codec")),
    }
}
