#![cfg(feature = "std")]

use csv::ReaderBuilder;
use flatview::{
    ByteBuffer, Error, View,
    scalar::{Scalar, ScalarKind, ScalarValue},
    table,
};

const PATH: &str = "fixtures/monster.bin";

/// Root position of the monster table in the fixture.
const MONSTER: usize = 20;
/// Position of the weapon table in the fixture.
const WEAPON: usize = 64;

fn monster() -> Vec<u8> {
    std::fs::read(PATH).unwrap()
}

#[test]
fn validate_fixture() {
    let data = monster();

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .from_path("fixtures/monster.csv")
        .unwrap();

    for record in reader.records() {
        let record = record.unwrap();
        let position: usize = record[0].parse().unwrap();
        let slot: u16 = record[1].parse().unwrap();
        let expected = &record[3];

        let view = View::new(&data, position).unwrap();

        let found = match &record[2] {
            "voffset" => match view.get_voffset_slot(slot, 0).unwrap() {
                0 => "absent".to_string(),
                offset => offset.to_string(),
            },
            kind => {
                let kind = parse_kind(kind);
                let absent = ScalarValue::Bool(false);
                match view.get_slot_kind(slot, absent, kind).unwrap() {
                    v if view.offset(slot).unwrap() == 0 => {
                        assert_eq!(v, absent);
                        "absent".to_string()
                    }
                    v => {
                        assert_eq!(v.kind(), kind);
                        render(v)
                    }
                }
            }
        };

        assert_eq!(found, expected, "slot {slot} of table at {position}");
    }
}

fn parse_kind(kind: &str) -> ScalarKind {
    match kind {
        "u8" => ScalarKind::U8,
        "i8" => ScalarKind::I8,
        "u16" => ScalarKind::U16,
        "i16" => ScalarKind::I16,
        "u32" => ScalarKind::U32,
        "i32" => ScalarKind::I32,
        "u64" => ScalarKind::U64,
        "i64" => ScalarKind::I64,
        "f32" => ScalarKind::F32,
        "f64" => ScalarKind::F64,
        "bool" => ScalarKind::Bool,
        _ => panic!("unknown kind {kind}"),
    }
}

fn render(v: ScalarValue) -> String {
    match v {
        ScalarValue::U8(v) => v.to_string(),
        ScalarValue::I8(v) => v.to_string(),
        ScalarValue::U16(v) => v.to_string(),
        ScalarValue::I16(v) => v.to_string(),
        ScalarValue::U32(v) => v.to_string(),
        ScalarValue::I32(v) => v.to_string(),
        ScalarValue::U64(v) => v.to_string(),
        ScalarValue::I64(v) => v.to_string(),
        ScalarValue::F32(v) => v.to_string(),
        ScalarValue::F64(v) => v.to_string(),
        ScalarValue::Bool(v) => v.to_string(),
    }
}

#[test]
fn read_buffer_from_file() {
    let mut file = std::fs::File::open(PATH).unwrap();
    let buffer = ByteBuffer::read_from(&mut file).unwrap();
    assert_eq!(buffer.as_bytes(), monster().as_slice());
}

#[test]
fn locate_root() {
    let data = monster();
    let view = table::root(&data).unwrap();
    assert_eq!(view.position(), MONSTER);
    assert_eq!(view.get_slot::<i16>(4, 0).unwrap(), 300);
}

#[test]
fn locate_size_prefixed_root() {
    let data = monster();
    let mut prefixed = (data.len() as u32).to_le_bytes().to_vec();
    prefixed.extend_from_slice(&data);

    let (size, view) = table::size_prefixed_root(&prefixed).unwrap();
    assert_eq!(size as usize, data.len());
    assert_eq!(view.position(), MONSTER);
    assert_eq!(view.get_slot::<i16>(4, 0).unwrap(), 300);
}

#[test]
fn check_identifier() {
    let mut data = vec![8, 0, 0, 0];
    data.extend_from_slice(b"MONS");
    assert!(table::has_identifier(&data, b"MONS"));
    assert!(!table::has_identifier(&data, b"WEAP"));
    assert!(!table::has_identifier(&data[..6], b"MONS"));
}

#[test]
fn resolve_field_offsets() {
    let data = monster();
    let view = View::new(&data, MONSTER).unwrap();

    assert_eq!(view.offset(4), Ok(4));
    assert_eq!(view.offset(6), Ok(8));
    assert_eq!(view.offset(10), Ok(6));
    // Beyond the end of the vtable.
    assert_eq!(view.offset(14), Ok(0));
    assert_eq!(view.offset(u16::MAX), Ok(0));

    let vtable = view.vtable().unwrap();
    assert_eq!(vtable.position, 4);
    assert_eq!(vtable.len, 14);
}

#[test]
fn offset_is_cache_transparent() {
    let data = monster();

    for slot in (0..20).step_by(2) {
        let warm = View::new(&data, MONSTER).unwrap();
        let first = warm.offset(slot).unwrap();
        let second = warm.offset(slot).unwrap();

        let cold = View::new(&data, MONSTER).unwrap();
        assert_eq!(first, second);
        assert_eq!(cold.offset(slot).unwrap(), first);
    }
}

#[test]
fn resolve_vtable_after_table() {
    // The table at 0 stores a negative offset to its vtable at 8.
    let data = [0xF8, 0xFF, 0xFF, 0xFF, 5, 0, 0, 0, 6, 0, 8, 0, 4, 0];
    let view = View::new(&data, 0).unwrap();

    assert_eq!(view.vtable().unwrap().position, 8);
    assert_eq!(view.offset(4), Ok(4));
    assert_eq!(view.get_slot::<u8>(4, 0), Ok(5));
    assert_eq!(view.get_slot::<u8>(6, 0), Ok(0));
}

#[test]
fn get_slot_returns_default_when_absent() {
    let data = monster();
    let view = View::new(&data, MONSTER).unwrap();

    assert_eq!(view.offset(14), Ok(0));
    assert_eq!(view.get_slot::<u8>(14, 99), Ok(99));
    assert_eq!(view.get_slot::<u8>(200, 99), Ok(99));
    assert_eq!(view.get_slot::<i16>(4, 99), Ok(300));
    assert_eq!(view.get_slot::<u8>(10, 99), Ok(1));
}

#[test]
fn get_voffset_slot() {
    let data = monster();
    let view = View::new(&data, MONSTER).unwrap();

    assert_eq!(view.get_voffset_slot(12, 7), Ok(16));
    assert_eq!(view.get_voffset_slot(14, 7), Ok(7));
}

#[test]
fn zero_vtable_entry_is_absent() {
    // A vtable of three entries whose field entry is zero.
    let data = [6, 0, 8, 0, 0, 0, 0, 0, 8, 0, 0, 0, 9, 0, 0, 0];
    let view = View::new(&data, 8).unwrap();

    assert_eq!(view.offset(4), Ok(0));
    assert_eq!(view.get_slot::<u32>(4, 11), Ok(11));
}

#[test]
fn get_absolute() {
    let data = monster();
    let view = View::new(&data, MONSTER).unwrap();

    assert_eq!(view.get::<i16>(24), Ok(300));
    assert_eq!(view.get::<u8>(26), Ok(1));
    assert_eq!(view.get::<i32>(MONSTER), Ok(16));
    assert_eq!(
        view.get_kind(ScalarKind::U16, 24),
        Ok(ScalarValue::U16(300))
    );
}

#[test]
fn read_string() {
    // An offset at 0 to the string at 4.
    let data = [4, 0, 0, 0, 4, 0, 0, 0, b'a', b'b', b'c', b'd'];
    let view = View::new(&data, 0).unwrap();

    assert_eq!(view.indirect(0), Ok(4));
    assert_eq!(view.string(0), Ok(&b"abcd"[..]));
    assert_eq!(view.str(0), Ok("abcd"));
}

#[test]
fn read_string_field() {
    let data = monster();
    let view = View::new(&data, MONSTER).unwrap();

    let offset = view.position() + usize::from(view.offset(6).unwrap());
    assert_eq!(view.string(offset), Ok(&b"orc"[..]));
}

#[test]
fn reject_invalid_text() {
    let data = [4, 0, 0, 0, 2, 0, 0, 0, 0xC3, 0x28];
    let view = View::new(&data, 0).unwrap();

    assert_eq!(view.string(0), Ok(&[0xC3, 0x28][..]));
    assert!(matches!(view.str(0), Err(Error::Utf8(_))));
}

#[test]
fn read_vector() {
    let data = monster();
    let view = View::new(&data, MONSTER).unwrap();

    let offset = usize::from(view.offset(8).unwrap());
    assert_eq!(view.vector(offset), Ok(52));
    assert_eq!(view.vector_len(offset), Ok(3));

    // The length is the `u32` stored at `base + u32 at base`.
    let base = MONSTER + offset;
    let relative = view.get::<u32>(base).unwrap() as usize;
    assert_eq!(view.vector_len(offset), view.get::<u32>(base + relative));

    let start = view.vector(offset).unwrap();
    let elements: Vec<u8> = (0..3).map(|i| view.get(start + i).unwrap()).collect();
    assert_eq!(elements, [7, 8, 9]);
}

#[test]
fn read_vector_as_string() {
    let data = monster();
    let view = View::new(&data, MONSTER).unwrap();

    assert_eq!(view.vector_as_string(8, None, None), Ok(Some(&[7, 8, 9][..])));
    assert_eq!(view.vector_as_string(8, Some(1), None), Ok(Some(&[8, 9][..])));
    assert_eq!(view.vector_as_string(8, None, Some(2)), Ok(Some(&[7, 8][..])));
    assert_eq!(view.vector_as_string(8, Some(2), Some(2)), Ok(Some(&[][..])));
    // Strings are byte vectors with a terminator past their length.
    assert_eq!(view.vector_as_string(6, None, None), Ok(Some(&b"orc"[..])));
    assert_eq!(view.vector_as_string(14, None, None), Ok(None));
}

#[test]
fn reject_vector_range_past_end() {
    let data = monster();
    let view = View::new(&data, MONSTER).unwrap();

    assert_eq!(
        view.vector_as_string(8, None, Some(4)),
        Err(Error::OutOfBounds {
            offset: 0,
            size: 4,
            len: 3
        })
    );
    assert!(matches!(
        view.vector_as_string(8, Some(2), Some(1)),
        Err(Error::OutOfBounds { .. })
    ));
}

#[test]
fn follow_union() {
    let data = monster();
    let view = View::new(&data, MONSTER).unwrap();

    assert_eq!(view.get_slot::<u8>(10, 0), Ok(1));

    let weapon = view.union(usize::from(view.offset(12).unwrap())).unwrap();
    assert_eq!(weapon.position(), WEAPON);
    assert_eq!(weapon.get_slot::<i16>(4, 0), Ok(42));
    assert_eq!(weapon.vtable().unwrap().position, 56);

    // The parent view keeps its own position and vtable.
    assert_eq!(view.position(), MONSTER);
    assert_eq!(view.vtable().unwrap().position, 4);
}

#[test]
fn reject_reads_past_end() {
    let data = monster();

    let view = View::new(&data, data.len()).unwrap();
    assert!(matches!(view.offset(4), Err(Error::OutOfBounds { .. })));

    let view = View::new(&data, MONSTER).unwrap();
    assert_eq!(
        view.get::<u64>(68),
        Err(Error::OutOfBounds {
            offset: 68,
            size: 8,
            len: 72
        })
    );
    assert!(matches!(view.string(68), Err(Error::OutOfBounds { .. })));
    assert!(matches!(view.vector(60), Err(Error::OutOfBounds { .. })));
    assert!(matches!(view.union(60), Err(Error::OutOfBounds { .. })));
}

#[test]
fn reject_vtable_before_start() {
    let data = [4, 0, 0, 0];
    let view = View::new(&data, 0).unwrap();

    assert_eq!(
        view.offset(4),
        Err(Error::OutOfBounds {
            offset: -4,
            size: 2,
            len: 4
        })
    );
}

#[test]
fn reject_string_longer_than_buffer() {
    let data = [4, 0, 0, 0, 0xFF, 0, 0, 0, b'a'];
    let view = View::new(&data, 0).unwrap();

    assert_eq!(
        view.string(0),
        Err(Error::OutOfBounds {
            offset: 8,
            size: 255,
            len: 9
        })
    );
}

#[test]
#[cfg(target_pointer_width = "64")]
fn reject_offsets_beyond_32_bits() {
    let data = monster();
    let limit = u32::MAX as usize;

    assert!(View::new(&data, limit).is_ok());
    assert_eq!(
        View::new(&data, limit + 1).err(),
        Some(Error::InvalidOffset(limit as i64 + 1))
    );

    let view = View::new(&data, MONSTER).unwrap();
    assert_eq!(
        view.indirect(limit + 1),
        Err(Error::InvalidOffset(limit as i64 + 1))
    );
    assert_eq!(
        view.get::<u8>(limit + 1),
        Err(Error::InvalidOffset(limit as i64 + 1))
    );
}

#[test]
fn create_buffer() {
    let zeroed = ByteBuffer::new(5usize);
    assert_eq!(zeroed.as_bytes(), [0; 5]);
    assert_eq!(zeroed.len(), 5);

    let adopted = ByteBuffer::new(vec![1u8, 2, 3]);
    assert_eq!(adopted.as_bytes(), [1, 2, 3]);
    assert_eq!(adopted.into_inner(), [1, 2, 3]);

    let text = ByteBuffer::new("abc");
    assert_eq!(text.text(), Ok("abc"));

    assert!(ByteBuffer::new(0usize).is_empty());
}

#[test]
fn set_byte() {
    let mut buffer = ByteBuffer::new(5usize);

    buffer.set(65u8, 3).unwrap();
    assert_eq!(buffer.as_bytes()[3], 0x41);

    buffer.set("Z", 0).unwrap();
    assert_eq!(buffer.as_bytes()[0], 0x5A);

    assert_eq!(buffer.as_bytes(), [0x5A, 0, 0, 0x41, 0]);
}

#[test]
fn reject_invalid_set() {
    let mut buffer = ByteBuffer::new(2usize);

    assert!(matches!(
        buffer.set("", 0),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        buffer.set(1u8, 2),
        Err(Error::OutOfBounds { .. })
    ));
    assert_eq!(buffer.as_bytes(), [0, 0]);
}

#[test]
fn grow_right_aligned() {
    let mut buffer = ByteBuffer::new(vec![1u8, 2, 3]);

    buffer.grow(2);
    assert_eq!(buffer.as_bytes(), [1, 2, 3]);
    buffer.grow(3);
    assert_eq!(buffer.as_bytes(), [1, 2, 3]);

    buffer.grow(7);
    assert_eq!(buffer.len(), 7);
    assert_eq!(buffer.as_bytes(), [0, 0, 0, 0, 1, 2, 3]);
}

#[test]
#[cfg(target_pointer_width = "64")]
fn grow_fallibly() {
    let buffer = ByteBuffer::new(vec![1u8, 2, 3]);

    let grown = buffer.try_grown(5).unwrap();
    assert_eq!(grown.as_bytes(), [0, 0, 1, 2, 3]);
    assert_eq!(buffer.as_bytes(), [1, 2, 3]);
    assert_eq!(buffer.try_grown(2), Ok(buffer.clone()));

    assert_eq!(ByteBuffer::try_zeroed(4), Ok(ByteBuffer::new(4usize)));
    assert!(matches!(
        ByteBuffer::try_zeroed(1 << 62),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        buffer.try_grown(1 << 62),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn pad_exact_range() {
    let mut buffer = ByteBuffer::new(vec![1u8, 2, 3, 4, 5, 6]);

    buffer.pad(3, 2).unwrap();
    assert_eq!(buffer.as_bytes(), [1, 2, 0, 0, 0, 6]);

    buffer.pad(0, 6).unwrap();
    assert_eq!(buffer.as_bytes(), [1, 2, 0, 0, 0, 6]);

    assert_eq!(
        buffer.pad(2, 5),
        Err(Error::OutOfBounds {
            offset: 5,
            size: 2,
            len: 6
        })
    );
    assert_eq!(buffer.as_bytes(), [1, 2, 0, 0, 0, 6]);
}

#[test]
fn slice_clamped() {
    let buffer = ByteBuffer::new(vec![1u8, 2, 3, 4]);

    assert_eq!(buffer.slice(None, None), [1, 2, 3, 4]);
    assert_eq!(buffer.slice(Some(1), Some(3)), [2, 3]);
    assert_eq!(buffer.slice(Some(2), Some(100)), [3, 4]);
    assert_eq!(buffer.slice(Some(100), None), [0u8; 0]);
    assert_eq!(buffer.slice(Some(3), Some(1)), [0u8; 0]);
    assert_eq!(buffer.as_bytes(), [1, 2, 3, 4]);
}

#[test]
fn write_and_read_scalars() {
    let mut buffer = ByteBuffer::new(32usize);

    buffer.write(-2i16, 0).unwrap();
    buffer.write(0xDEAD_BEEFu32, 2).unwrap();
    buffer.write(1.5f32, 6).unwrap();
    buffer.write(-0.25f64, 10).unwrap();
    buffer.write(true, 18).unwrap();
    buffer.write(u64::MAX - 1, 19).unwrap();
    buffer.write(-7i8, 27).unwrap();

    assert_eq!(&buffer.as_bytes()[..2], [0xFE, 0xFF]);
    assert_eq!(&buffer.as_bytes()[2..6], [0xEF, 0xBE, 0xAD, 0xDE]);

    let view = View::new(buffer.as_bytes(), 0).unwrap();
    assert_eq!(view.get::<i16>(0), Ok(-2));
    assert_eq!(view.get::<u32>(2), Ok(0xDEAD_BEEF));
    assert_eq!(view.get::<f32>(6), Ok(1.5));
    assert_eq!(view.get::<f64>(10), Ok(-0.25));
    assert_eq!(view.get::<bool>(18), Ok(true));
    assert_eq!(view.get::<u64>(19), Ok(u64::MAX - 1));
    assert_eq!(view.get::<i8>(27), Ok(-7));
    assert_eq!(view.get::<bool>(28), Ok(false));

    assert!(matches!(
        buffer.write(0u32, 30),
        Err(Error::OutOfBounds { .. })
    ));
}

#[test]
fn scalar_widths() {
    assert_eq!(u8::WIDTH, 1);
    assert_eq!(bool::WIDTH, 1);
    assert_eq!(i16::WIDTH, 2);
    assert_eq!(f32::WIDTH, 4);
    assert_eq!(u64::WIDTH, 8);

    assert_eq!(ScalarKind::I16.width(), i16::WIDTH);
    assert_eq!(ScalarKind::F64.width(), 8);
    assert_eq!(i32::KIND, ScalarKind::I32);

    assert_eq!(ScalarKind::U16.decode(&[1, 2]), Some(ScalarValue::U16(0x0201)));
    assert_eq!(ScalarKind::U16.decode(&[1, 2, 3]), None);
    assert_eq!(bool::decode(&[2]), Some(true));

    let mut bytes = [0; 4];
    ScalarValue::from(-1i32).encode(&mut bytes).unwrap();
    assert_eq!(bytes, [0xFF; 4]);
    assert_eq!(ScalarValue::I8(1).encode(&mut bytes), None);
}
