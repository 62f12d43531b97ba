use bytes::Bytes;
use pqlens_error::{ErrorKind, PqError, Result};

use super::plain::{fixed_len, int96_from_le};
use crate::basic::Type;
use crate::value::ScalarValue;

/// Decode BYTE_STREAM_SPLIT values.
///
/// The K-th byte of every value is stored in the K-th stream, streams are
/// laid out back to back. The number of encoded values is implied by the
/// buffer length.
pub fn decode_byte_stream_split(
    physical_type: Type,
    type_length: i32,
    data: &[u8],
    count: usize,
) -> Result<Vec<ScalarValue>> {
    let width = match physical_type {
        Type::FIXED_LEN_BYTE_ARRAY => fixed_len(type_length)?,
        Type::BOOLEAN | Type::BYTE_ARRAY => {
            return Err(PqError::new(
                ErrorKind::UnsupportedEncoding,
                "BYTE_STREAM_SPLIT requires a fixed width type",
            )
            .with_field("type", physical_type));
        }
        other => other.fixed_width(type_length).unwrap_or(0),
    };

    if width == 0 || data.len() % width != 0 {
        return Err(PqError::new(
            ErrorKind::CorruptPage,
            "BYTE_STREAM_SPLIT data isn't a multiple of the value width",
        )
        .with_field("len", data.len())
        .with_field("width", width));
    }

    let num_encoded = data.len() / width;
    if count > num_encoded {
        return Err(PqError::new(
            ErrorKind::CorruptPage,
            "BYTE_STREAM_SPLIT data holds fewer values than requested",
        )
        .with_field("requested", count)
        .with_field("available", num_encoded));
    }

    let mut out = Vec::with_capacity(count);
    let mut buf = vec![0u8; width];
    for idx in 0..count {
        for (k, b) in buf.iter_mut().enumerate() {
            *b = data[k * num_encoded + idx];
        }
        out.push(from_le_value(physical_type, &buf));
    }

    Ok(out)
}

fn from_le_value(physical_type: Type, buf: &[u8]) -> ScalarValue {
    let mut word = [0u8; 8];
    let n = buf.len().min(8);
    word[..n].copy_from_slice(&buf[..n]);

    match physical_type {
        Type::INT32 => ScalarValue::Int32(u64::from_le_bytes(word) as u32 as i32),
        Type::INT64 => ScalarValue::Int64(i64::from_le_bytes(word)),
        Type::FLOAT => ScalarValue::Float(f32::from_bits(u64::from_le_bytes(word) as u32)),
        Type::DOUBLE => ScalarValue::Double(f64::from_le_bytes(word)),
        Type::INT96 => {
            let mut raw = [0u8; 12];
            raw.copy_from_slice(buf);
            int96_from_le(&raw)
        }
        _ => ScalarValue::FixedLenByteArray(Bytes::copy_from_slice(buf)),
    }
}
