//! Little-endian encodings of the primitive field types.
//!
//! Each primitive is available statically through the [`Scalar`] trait, and
//! at runtime through a [`ScalarKind`] descriptor, for callers that only learn
//! a field's type while decoding.

use zerocopy::{FromBytes, Immutable, IntoBytes, byteorder::little_endian};

/// A primitive stored inline in a table, struct or vector.
pub trait Scalar: Copy {
    /// The little-endian representation of this primitive.
    type Le: FromBytes + IntoBytes + Immutable;

    /// The number of bytes occupied by this primitive.
    const WIDTH: usize = size_of::<Self::Le>();

    /// The runtime descriptor of this primitive.
    const KIND: ScalarKind;

    fn from_le(le: Self::Le) -> Self;

    fn to_le(self) -> Self::Le;

    /// Decode a value from exactly [`Self::WIDTH`] bytes.
    fn decode(r: &[u8]) -> Option<Self> {
        Self::Le::read_from_bytes(r).ok().map(Self::from_le)
    }

    /// Encode a value into exactly [`Self::WIDTH`] bytes.
    fn encode(self, w: &mut [u8]) -> Option<()> {
        let le = self.to_le();
        le.write_to(w).ok()
    }
}

macro_rules! scalar {
    ($t:ty, $kind:ident, $le:ty) => {
        impl Scalar for $t {
            type Le = $le;
            const KIND: ScalarKind = ScalarKind::$kind;

            fn from_le(le: Self::Le) -> Self {
                le.get()
            }

            fn to_le(self) -> Self::Le {
                <$le>::new(self)
            }
        }
    };
    ($t:ty, $kind:ident) => {
        impl Scalar for $t {
            type Le = $t;
            const KIND: ScalarKind = ScalarKind::$kind;

            fn from_le(le: Self::Le) -> Self {
                le
            }

            fn to_le(self) -> Self::Le {
                self
            }
        }
    };
}

scalar!(u8, U8);
scalar!(i8, I8);
scalar!(u16, U16, little_endian::U16);
scalar!(i16, I16, little_endian::I16);
scalar!(u32, U32, little_endian::U32);
scalar!(i32, I32, little_endian::I32);
scalar!(u64, U64, little_endian::U64);
scalar!(i64, I64, little_endian::I64);
scalar!(f32, F32, little_endian::F32);
scalar!(f64, F64, little_endian::F64);

/// Stored as a single byte; any non-zero byte reads as `true`.
impl Scalar for bool {
    type Le = u8;
    const KIND: ScalarKind = ScalarKind::Bool;

    fn from_le(le: Self::Le) -> Self {
        le != 0
    }

    fn to_le(self) -> Self::Le {
        u8::from(self)
    }
}

macro_rules! catalog {
    ($($kind:ident => $t:ty, $(#[$attr:meta])*;)*) => {
        /// Runtime descriptor of a primitive encoding.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum ScalarKind {
            $($(#[$attr])* $kind,)*
        }

        /// A decoded primitive, tagged with its encoding.
        #[derive(Clone, Copy, Debug, PartialEq)]
        pub enum ScalarValue {
            $($(#[$attr])* $kind($t),)*
        }

        impl ScalarKind {
            /// The number of bytes occupied by this encoding.
            pub const fn width(self) -> usize {
                match self {
                    $(Self::$kind => <$t as Scalar>::WIDTH,)*
                }
            }

            /// Decode a value from exactly [`Self::width`] bytes.
            pub fn decode(self, r: &[u8]) -> Option<ScalarValue> {
                match self {
                    $(Self::$kind => <$t>::decode(r).map(ScalarValue::$kind),)*
                }
            }
        }

        impl ScalarValue {
            pub const fn kind(&self) -> ScalarKind {
                match self {
                    $(Self::$kind(_) => ScalarKind::$kind,)*
                }
            }

            /// Encode this value into exactly `self.kind().width()` bytes.
            pub fn encode(self, w: &mut [u8]) -> Option<()> {
                match self {
                    $(Self::$kind(v) => v.encode(w),)*
                }
            }
        }

        $(
            impl From<$t> for ScalarValue {
                fn from(v: $t) -> Self {
                    Self::$kind(v)
                }
            }
        )*
    };
}

catalog! {
    U8 => u8, /** `uint8`, `ubyte` */;
    I8 => i8, /** `int8`, `byte` */;
    U16 => u16, /** `uint16`, `ushort` */;
    I16 => i16, /** `int16`, `short` */;
    U32 => u32, /** `uint32`, `uint` */;
    I32 => i32, /** `int32`, `int` */;
    U64 => u64, /** `uint64`, `ulong` */;
    I64 => i64, /** `int64`, `long` */;
    F32 => f32, /** `float32`, `float` */;
    F64 => f64, /** `float64`, `double` */;
    Bool => bool, /** `bool` */;
}
