use pqlens_error::{ErrorKind, PqError, Result};

use crate::basic::Type;
use crate::column::bitutil::{BitUnpackState, ByteCursor, bit_unpack};
use crate::value::ScalarValue;

/// Decoder for PLAIN encoded values.
#[derive(Debug)]
pub struct PlainDecoder {
    physical_type: Type,
    type_length: i32,
}

impl PlainDecoder {
    pub fn new(physical_type: Type, type_length: i32) -> Self {
        PlainDecoder {
            physical_type,
            type_length,
        }
    }

    /// Decode exactly `count` values from the cursor.
    pub fn read(&self, cursor: &mut ByteCursor, count: usize) -> Result<Vec<ScalarValue>> {
        // Every value takes at least one bit, so this is an upper bound on what
        // the buffer can hold.
        let mut out = Vec::with_capacity(count.min(cursor.remaining().saturating_mul(8)));

        match self.physical_type {
            Type::BOOLEAN => {
                if count.div_ceil(8) > cursor.remaining() {
                    return Err(PqError::new(ErrorKind::CorruptPage, "Not enough bytes for booleans")
                        .with_field("count", count)
                        .with_field("remaining", cursor.remaining()));
                }
                let mut state = BitUnpackState::new(1);
                let mut bits = vec![0u8; count];
                bit_unpack(&mut state, cursor, &mut bits)?;
                out.extend(bits.into_iter().map(|b| ScalarValue::Boolean(b == 1)));
            }
            Type::INT32 => {
                for _ in 0..count {
                    out.push(ScalarValue::Int32(i32::from_le_bytes(cursor.read_array()?)));
                }
            }
            Type::INT64 => {
                for _ in 0..count {
                    out.push(ScalarValue::Int64(i64::from_le_bytes(cursor.read_array()?)));
                }
            }
            Type::INT96 => {
                for _ in 0..count {
                    let raw: [u8; 12] = cursor.read_array()?;
                    out.push(int96_from_le(&raw));
                }
            }
            Type::FLOAT => {
                for _ in 0..count {
                    out.push(ScalarValue::Float(f32::from_le_bytes(cursor.read_array()?)));
                }
            }
            Type::DOUBLE => {
                for _ in 0..count {
                    out.push(ScalarValue::Double(f64::from_le_bytes(cursor.read_array()?)));
                }
            }
            Type::BYTE_ARRAY => {
                for _ in 0..count {
                    let len = cursor.read_u32_le()? as usize;
                    out.push(ScalarValue::ByteArray(cursor.read_bytes(len)?));
                }
            }
            Type::FIXED_LEN_BYTE_ARRAY => {
                let len = fixed_len(self.type_length)?;
                for _ in 0..count {
                    out.push(ScalarValue::FixedLenByteArray(cursor.read_bytes(len)?));
                }
            }
        }

        Ok(out)
    }
}

pub(crate) fn fixed_len(type_length: i32) -> Result<usize> {
    if type_length <= 0 {
        return Err(PqError::new(
            ErrorKind::CorruptPage,
            "Fixed length byte array column has no positive type length",
        )
        .with_field("type_length", type_length));
    }
    Ok(type_length as usize)
}

pub(crate) fn int96_from_le(raw: &[u8; 12]) -> ScalarValue {
    let word = |i: usize| u32::from_le_bytes([raw[i], raw[i + 1], raw[i + 2], raw[i + 3]]);
    ScalarValue::Int96([word(0), word(4), word(8)])
}

/// Decode a single value stored as PLAIN bytes without a length prefix.
///
/// This is how statistics, column index bounds, and bloom filter inputs
/// represent values.
pub fn decode_plain_scalar(physical_type: Type, type_length: i32, raw: &[u8]) -> Result<ScalarValue> {
    let want = match physical_type {
        // Stored as a full byte here, not a single bit.
        Type::BOOLEAN => Some(1),
        Type::BYTE_ARRAY => None,
        Type::FIXED_LEN_BYTE_ARRAY => Some(fixed_len(type_length)?),
        other => other.fixed_width(type_length),
    };

    if let Some(want) = want {
        if raw.len() != want {
            return Err(PqError::new(
                ErrorKind::CorruptPage,
                "Encoded value has the wrong width for its type",
            )
            .with_field("type", physical_type)
            .with_field("expected", want)
            .with_field("got", raw.len()));
        }
    }

    let fixed = |raw: &[u8]| -> [u8; 8] {
        let mut buf = [0; 8];
        buf[..raw.len()].copy_from_slice(raw);
        buf
    };

    Ok(match physical_type {
        Type::BOOLEAN => ScalarValue::Boolean(raw[0] != 0),
        Type::INT32 => ScalarValue::Int32(i64::from_le_bytes(fixed(raw)) as i32),
        Type::INT64 => ScalarValue::Int64(i64::from_le_bytes(fixed(raw))),
        Type::INT96 => {
            let mut buf = [0; 12];
            buf.copy_from_slice(raw);
            int96_from_le(&buf)
        }
        Type::FLOAT => ScalarValue::Float(f32::from_bits(u64::from_le_bytes(fixed(raw)) as u32)),
        Type::DOUBLE => ScalarValue::Double(f64::from_le_bytes(fixed(raw))),
        Type::BYTE_ARRAY => ScalarValue::ByteArray(bytes::Bytes::copy_from_slice(raw)),
        Type::FIXED_LEN_BYTE_ARRAY => {
            ScalarValue::FixedLenByteArray(bytes::Bytes::copy_from_slice(raw))
        }
    })
}
