//! The closed scalar type set and its byte-level encode/decode rules.
//!
//! Every field on the wire is one of seven fixed-width scalars. Widths,
//! C spellings and byte order handling live here so the generator and the
//! runtime decoder cannot disagree on layout.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Byte order of a packet's multi-byte fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endian {
    #[default]
    Little,
    Big,
}

impl Endian {
    pub fn as_str(self) -> &'static str {
        match self {
            Endian::Little => "little",
            Endian::Big => "big",
        }
    }
}

impl fmt::Display for Endian {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Endian {
    type Err = UnknownName;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "little" => Ok(Endian::Little),
            "big" => Ok(Endian::Big),
            _ => Err(UnknownName(value.to_string())),
        }
    }
}

/// A name that matched no known scalar type or endianness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownName(pub String);

impl fmt::Display for UnknownName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown name {:?}", self.0)
    }
}

impl std::error::Error for UnknownName {}

/// Fixed-width scalar field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Uint8,
    Int8,
    Uint16,
    Int16,
    Uint32,
    Int32,
    Float32,
}

impl ScalarType {
    pub const ALL: [ScalarType; 7] = [
        ScalarType::Uint8,
        ScalarType::Int8,
        ScalarType::Uint16,
        ScalarType::Int16,
        ScalarType::Uint32,
        ScalarType::Int32,
        ScalarType::Float32,
    ];

    /// Bytes occupied on the wire.
    pub const fn width(self) -> usize {
        match self {
            ScalarType::Uint8 | ScalarType::Int8 => 1,
            ScalarType::Uint16 | ScalarType::Int16 => 2,
            ScalarType::Uint32 | ScalarType::Int32 | ScalarType::Float32 => 4,
        }
    }

    /// Canonical catalog name.
    pub const fn name(self) -> &'static str {
        match self {
            ScalarType::Uint8 => "uint8",
            ScalarType::Int8 => "int8",
            ScalarType::Uint16 => "uint16",
            ScalarType::Int16 => "int16",
            ScalarType::Uint32 => "uint32",
            ScalarType::Int32 => "int32",
            ScalarType::Float32 => "float32",
        }
    }

    /// Spelling used in generated C.
    pub const fn c_type(self) -> &'static str {
        match self {
            ScalarType::Uint8 => "uint8_t",
            ScalarType::Int8 => "int8_t",
            ScalarType::Uint16 => "uint16_t",
            ScalarType::Int16 => "int16_t",
            ScalarType::Uint32 => "uint32_t",
            ScalarType::Int32 => "int32_t",
            ScalarType::Float32 => "float",
        }
    }

    pub const fn is_float(self) -> bool {
        matches!(self, ScalarType::Float32)
    }

    /// Decode one value from the front of `bytes`.
    ///
    /// Returns `None` when fewer than [`width`](Self::width) bytes remain.
    pub fn decode(self, bytes: &[u8], endian: Endian) -> Option<FieldValue> {
        let raw = bytes.get(..self.width())?;
        let mut word = [0u8; 4];
        word[..raw.len()].copy_from_slice(raw);

        let value = match (self, endian) {
            (ScalarType::Uint8, _) => FieldValue::Unsigned(u32::from(raw[0])),
            (ScalarType::Int8, _) => FieldValue::Signed(i32::from(raw[0] as i8)),
            (ScalarType::Uint16, Endian::Little) => {
                FieldValue::Unsigned(u32::from(u16::from_le_bytes([raw[0], raw[1]])))
            }
            (ScalarType::Uint16, Endian::Big) => {
                FieldValue::Unsigned(u32::from(u16::from_be_bytes([raw[0], raw[1]])))
            }
            (ScalarType::Int16, Endian::Little) => {
                FieldValue::Signed(i32::from(i16::from_le_bytes([raw[0], raw[1]])))
            }
            (ScalarType::Int16, Endian::Big) => {
                FieldValue::Signed(i32::from(i16::from_be_bytes([raw[0], raw[1]])))
            }
            (ScalarType::Uint32, Endian::Little) => FieldValue::Unsigned(u32::from_le_bytes(word)),
            (ScalarType::Uint32, Endian::Big) => FieldValue::Unsigned(u32::from_be_bytes(word)),
            (ScalarType::Int32, Endian::Little) => FieldValue::Signed(i32::from_le_bytes(word)),
            (ScalarType::Int32, Endian::Big) => FieldValue::Signed(i32::from_be_bytes(word)),
            (ScalarType::Float32, Endian::Little) => FieldValue::Float(f32::from_le_bytes(word)),
            (ScalarType::Float32, Endian::Big) => FieldValue::Float(f32::from_be_bytes(word)),
        };
        Some(value)
    }

    /// Append the wire bytes of `value` to `dst`.
    ///
    /// Returns `None` (leaving `dst` untouched) when the value does not fit
    /// this type; floats are never narrowed into integer types.
    pub fn encode(self, value: FieldValue, endian: Endian, dst: &mut Vec<u8>) -> Option<()> {
        fn put<const N: usize>(dst: &mut Vec<u8>, le: [u8; N], be: [u8; N], endian: Endian) {
            match endian {
                Endian::Little => dst.extend_from_slice(&le),
                Endian::Big => dst.extend_from_slice(&be),
            }
        }

        match self {
            ScalarType::Float32 => {
                let v = value.as_f64() as f32;
                put(dst, v.to_le_bytes(), v.to_be_bytes(), endian);
            }
            ScalarType::Uint8 => dst.push(u8::try_from(value.as_i64()?).ok()?),
            ScalarType::Int8 => dst.push(i8::try_from(value.as_i64()?).ok()? as u8),
            ScalarType::Uint16 => {
                let v = u16::try_from(value.as_i64()?).ok()?;
                put(dst, v.to_le_bytes(), v.to_be_bytes(), endian);
            }
            ScalarType::Int16 => {
                let v = i16::try_from(value.as_i64()?).ok()?;
                put(dst, v.to_le_bytes(), v.to_be_bytes(), endian);
            }
            ScalarType::Uint32 => {
                let v = u32::try_from(value.as_i64()?).ok()?;
                put(dst, v.to_le_bytes(), v.to_be_bytes(), endian);
            }
            ScalarType::Int32 => {
                let v = i32::try_from(value.as_i64()?).ok()?;
                put(dst, v.to_le_bytes(), v.to_be_bytes(), endian);
            }
        }
        Some(())
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScalarType {
    type Err = UnknownName;

    /// Accepts canonical names and the C spellings firmware sources use.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let ty = match value.trim() {
            "uint8" | "uint8_t" => ScalarType::Uint8,
            "int8" | "int8_t" => ScalarType::Int8,
            "uint16" | "uint16_t" => ScalarType::Uint16,
            "int16" | "int16_t" => ScalarType::Int16,
            "uint32" | "uint32_t" => ScalarType::Uint32,
            "int32" | "int32_t" => ScalarType::Int32,
            "float32" | "float" => ScalarType::Float32,
            _ => return Err(UnknownName(value.to_string())),
        };
        Ok(ty)
    }
}

impl Serialize for ScalarType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for ScalarType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse()
            .map_err(|_| serde::de::Error::custom(format!("unknown data type: {name}")))
    }
}

/// A decoded scalar, kept in the widest lossless representation of its
/// type family.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Unsigned(u32),
    Signed(i32),
    Float(f32),
}

impl FieldValue {
    pub fn as_f64(self) -> f64 {
        match self {
            FieldValue::Unsigned(v) => f64::from(v),
            FieldValue::Signed(v) => f64::from(v),
            FieldValue::Float(v) => f64::from(v),
        }
    }

    /// Integer view; `None` for floats.
    pub fn as_i64(self) -> Option<i64> {
        match self {
            FieldValue::Unsigned(v) => Some(i64::from(v)),
            FieldValue::Signed(v) => Some(i64::from(v)),
            FieldValue::Float(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Unsigned(v) => write!(f, "{v}"),
            FieldValue::Signed(v) => write!(f, "{v}"),
            FieldValue::Float(v) => write!(f, "{v:?}"),
        }
    }
}
