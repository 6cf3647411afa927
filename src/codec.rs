use crate::boxes::FourCC;
use crate::layout::FieldMap;
use byteorder::{BigEndian, ByteOrder};
use serde::{Serialize, Serializer};

/// Primitive field encodings understood by the layout decoder.
///
/// Every variant except [`Primitive::Bytes`] has a width fixed at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    U8,
    U16,
    /// 24-bit big-endian integer; the flags word of a full box.
    U24,
    U32,
    U64,
    /// Unsigned 16.16 fixed point.
    Fixed16,
    FourCC,
    /// Two binary-coded-decimal version components, `major.minor`.
    Bcd,
    /// 3x3 transformation matrix stored as nine big-endian 32-bit words.
    Matrix,
    Bytes(usize),
}

impl Primitive {
    pub const fn width(self) -> usize {
        match self {
            Primitive::U8 => 1,
            Primitive::U16 => 2,
            Primitive::U24 => 3,
            Primitive::U32 | Primitive::Fixed16 | Primitive::FourCC | Primitive::Bcd => 4,
            Primitive::U64 => 8,
            Primitive::Matrix => 36,
            Primitive::Bytes(n) => n,
        }
    }

    /// Decode a slice that is exactly `self.width()` bytes long.
    pub fn decode(self, b: &[u8]) -> Value {
        debug_assert_eq!(b.len(), self.width(), "slice width mismatch for {self:?}");
        match self {
            Primitive::U8 => Value::U8(b[0]),
            Primitive::U16 => Value::U16(BigEndian::read_u16(b)),
            Primitive::U24 => Value::U32(BigEndian::read_u24(b)),
            Primitive::U32 => Value::U32(BigEndian::read_u32(b)),
            Primitive::U64 => Value::U64(BigEndian::read_u64(b)),
            Primitive::Fixed16 => Value::Fixed(BigEndian::read_u32(b) as f64 / 65536.0),
            Primitive::FourCC => Value::FourCC(FourCC([b[0], b[1], b[2], b[3]]).as_str_lossy()),
            Primitive::Bcd => Value::Version(bcd_version(b)),
            Primitive::Matrix => {
                let mut m = [0u32; 9];
                BigEndian::read_u32_into(b, &mut m);
                Value::Matrix(m)
            }
            Primitive::Bytes(_) => Value::Bytes(b.to_vec()),
        }
    }
}

// Each half is a BCD number; non-decimal nibbles fall through as hex digits.
fn bcd_version(b: &[u8]) -> String {
    let major = BigEndian::read_u16(&b[0..2]);
    let minor = BigEndian::read_u16(&b[2..4]);
    format!("{:x}.{:x}", major, minor)
}

/// A decoded field value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Fixed(f64),
    FourCC(String),
    Version(String),
    Matrix([u32; 9]),
    #[serde(serialize_with = "serialize_hex")]
    Bytes(Vec<u8>),
    Text(String),
    Brands(Vec<String>),
    Records(Vec<FieldMap>),
}

impl Value {
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::U8(v) => Some(v as u64),
            Value::U16(v) => Some(v as u64),
            Value::U32(v) => Some(v as u64),
            Value::U64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::FourCC(s) | Value::Version(s) | Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

fn serialize_hex<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&hex::encode(bytes))
}
