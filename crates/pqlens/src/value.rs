use std::fmt;

use bytes::Bytes;

use crate::basic::Type;

/// A single decoded physical value.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    /// Legacy 96-bit timestamp, three little-endian words.
    Int96([u32; 3]),
    Float(f32),
    Double(f64),
    ByteArray(Bytes),
    FixedLenByteArray(Bytes),
}

impl ScalarValue {
    pub fn physical_type(&self) -> Type {
        match self {
            Self::Boolean(_) => Type::BOOLEAN,
            Self::Int32(_) => Type::INT32,
            Self::Int64(_) => Type::INT64,
            Self::Int96(_) => Type::INT96,
            Self::Float(_) => Type::FLOAT,
            Self::Double(_) => Type::DOUBLE,
            Self::ByteArray(_) => Type::BYTE_ARRAY,
            Self::FixedLenByteArray(_) => Type::FIXED_LEN_BYTE_ARRAY,
        }
    }

    /// Plain encoded bytes of the value, without a length prefix for byte
    /// arrays.
    ///
    /// This is the representation used for statistics and bloom filter
    /// hashing.
    pub fn plain_bytes(&self) -> Vec<u8> {
        match self {
            Self::Boolean(v) => vec![*v as u8],
            Self::Int32(v) => v.to_le_bytes().to_vec(),
            Self::Int64(v) => v.to_le_bytes().to_vec(),
            Self::Int96(words) => words.iter().flat_map(|w| w.to_le_bytes()).collect(),
            Self::Float(v) => v.to_le_bytes().to_vec(),
            Self::Double(v) => v.to_le_bytes().to_vec(),
            Self::ByteArray(b) | Self::FixedLenByteArray(b) => b.to_vec(),
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::ByteArray(b) | Self::FixedLenByteArray(b) => Some(b.as_ref()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int32(v) => Some(*v as i64),
            Self::Int64(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Int32(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Int96(words) => write!(f, "int96({}, {}, {})", words[0], words[1], words[2]),
            Self::Float(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::ByteArray(b) | Self::FixedLenByteArray(b) => match std::str::from_utf8(b) {
                Ok(s) => write!(f, "{s}"),
                Err(_) => {
                    f.write_str("0x")?;
                    for byte in b.iter() {
                        write!(f, "{byte:02x}")?;
                    }
                    Ok(())
                }
            },
        }
    }
}

/// A value read from a data page along with its levels.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    /// Decoded value. `None` when the definition level says the value isn't
    /// present.
    pub value: Option<ScalarValue>,
    /// Number of enclosing repeated ancestors restarted at this value.
    pub repetition_level: i16,
    /// Number of optional/repeated ancestors that are actually present.
    pub definition_level: i16,
}

impl Value {
    pub fn is_null(&self) -> bool {
        self.value.is_none()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(v) => write!(f, "{v}")?,
            None => f.write_str("NULL")?,
        }
        write!(
            f,
            " (R:{} D:{})",
            self.repetition_level, self.definition_level
        )
    }
}
