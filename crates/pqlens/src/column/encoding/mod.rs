//! Value encodings.
//!
//! The page reader doesn't decode values itself, it hands the value section
//! of a data page to a [`ValueDecoder`] chosen through the reader options.

pub mod byte_stream_split;
pub mod delta_binary_packed;
pub mod delta_byte_array;
pub mod delta_length_byte_array;
pub mod plain;
pub mod rle_bp;

use std::fmt::Debug;

use bytes::Bytes;
use pqlens_error::{ErrorKind, PqError, Result};

use self::byte_stream_split::decode_byte_stream_split;
use self::delta_binary_packed::DeltaBinaryPackedDecoder;
use self::delta_byte_array::DeltaByteArrayDecoder;
use self::delta_length_byte_array::DeltaLengthByteArrayDecoder;
use self::plain::PlainDecoder;
use self::rle_bp::RleBpDecoder;
use crate::basic::{Encoding, Type};
use crate::column::bitutil::ByteCursor;
use crate::column::page::Dictionary;
use crate::schema::ColumnDescriptor;
use crate::value::ScalarValue;

/// Number of dictionary indices decoded per batch.
const INDEX_BATCH_SIZE: usize = 1024;

pub trait ValueDecoder: Debug + Send + Sync {
    /// Decode `count` non-null values from the value section of a page.
    ///
    /// `dictionary` is the chunk's dictionary if one was read, dictionary
    /// encodings must fail without it.
    fn decode(
        &self,
        encoding: Encoding,
        column: &ColumnDescriptor,
        data: Bytes,
        count: usize,
        dictionary: Option<&Dictionary>,
    ) -> Result<Vec<ScalarValue>>;
}

/// Value decoder for the encodings implemented in this crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinValueDecoder;

impl ValueDecoder for BuiltinValueDecoder {
    fn decode(
        &self,
        encoding: Encoding,
        column: &ColumnDescriptor,
        data: Bytes,
        count: usize,
        dictionary: Option<&Dictionary>,
    ) -> Result<Vec<ScalarValue>> {
        let physical_type = column.physical_type;
        let mut cursor = ByteCursor::new(data);

        match (encoding, physical_type) {
            (Encoding::PLAIN, _) => {
                PlainDecoder::new(physical_type, column.type_length).read(&mut cursor, count)
            }
            (Encoding::PLAIN_DICTIONARY | Encoding::RLE_DICTIONARY, _) => {
                let dictionary = dictionary.ok_or_else(|| {
                    PqError::new(
                        ErrorKind::CorruptPage,
                        "Dictionary encoded page without a dictionary page",
                    )
                })?;
                decode_dictionary_indices(cursor, count, dictionary)
            }
            (Encoding::RLE, Type::BOOLEAN) => decode_rle_booleans(cursor, count),
            (Encoding::DELTA_BINARY_PACKED, Type::INT32) => {
                let ints = decode_delta_ints(cursor, count)?;
                Ok(ints.into_iter().map(|v| ScalarValue::Int32(v as i32)).collect())
            }
            (Encoding::DELTA_BINARY_PACKED, Type::INT64) => {
                let ints = decode_delta_ints(cursor, count)?;
                Ok(ints.into_iter().map(ScalarValue::Int64).collect())
            }
            (Encoding::DELTA_LENGTH_BYTE_ARRAY, Type::BYTE_ARRAY) => {
                let values = DeltaLengthByteArrayDecoder::try_new(cursor, count)?.read_all()?;
                Ok(values.into_iter().map(ScalarValue::ByteArray).collect())
            }
            (Encoding::DELTA_BYTE_ARRAY, Type::BYTE_ARRAY) => {
                let values = DeltaByteArrayDecoder::try_new(cursor, count)?.read_all()?;
                Ok(values.into_iter().map(ScalarValue::ByteArray).collect())
            }
            (Encoding::DELTA_BYTE_ARRAY, Type::FIXED_LEN_BYTE_ARRAY) => {
                let width = plain::fixed_len(column.type_length)?;
                let values = DeltaByteArrayDecoder::try_new(cursor, count)?.read_all()?;
                values
                    .into_iter()
                    .map(|v| {
                        if v.len() != width {
                            return Err(PqError::new(
                                ErrorKind::CorruptPage,
                                "DELTA_BYTE_ARRAY value has the wrong width",
                            )
                            .with_field("expected", width)
                            .with_field("got", v.len()));
                        }
                        Ok(ScalarValue::FixedLenByteArray(v))
                    })
                    .collect()
            }
            (Encoding::BYTE_STREAM_SPLIT, _) => {
                let data = cursor.take_remaining();
                decode_byte_stream_split(physical_type, column.type_length, &data, count)
            }
            (encoding, physical_type) => Err(PqError::new(
                ErrorKind::UnsupportedEncoding,
                "Unsupported value encoding",
            )
            .with_field("encoding", encoding)
            .with_field("type", physical_type)
            .with_field("column", &column.path)),
        }
    }
}

/// Decode RLE/bit-packed dictionary indices and look them up.
///
/// The first byte holds the bit width of the indices.
fn decode_dictionary_indices(
    mut cursor: ByteCursor,
    count: usize,
    dictionary: &Dictionary,
) -> Result<Vec<ScalarValue>> {
    if count == 0 {
        return Ok(Vec::new());
    }

    let bit_width = cursor.read_u8()?;
    if bit_width > 32 {
        return Err(
            PqError::new(ErrorKind::CorruptPage, "Dictionary index bit width too large")
                .with_field("bit_width", bit_width),
        );
    }

    let mut decoder = RleBpDecoder::new(cursor, bit_width);
    let mut out = Vec::with_capacity(count.min(INDEX_BATCH_SIZE * 64));
    let mut indices = vec![0u32; INDEX_BATCH_SIZE.min(count)];

    let mut remaining = count;
    while remaining > 0 {
        let batch = &mut indices[..remaining.min(INDEX_BATCH_SIZE)];
        decoder.get_batch(batch)?;
        for &idx in batch.iter() {
            let value = dictionary.get(idx as usize).ok_or_else(|| {
                PqError::new(ErrorKind::CorruptPage, "Dictionary index out of range")
                    .with_field("index", idx)
                    .with_field("dictionary_len", dictionary.len())
            })?;
            out.push(value.clone());
        }
        remaining -= batch.len();
    }

    Ok(out)
}

/// Booleans stored as a length prefixed RLE/bit-packed run with a bit width
/// of one.
fn decode_rle_booleans(mut cursor: ByteCursor, count: usize) -> Result<Vec<ScalarValue>> {
    let len = cursor.read_u32_le()? as usize;
    let runs = cursor.read_bytes(len)?;

    let mut decoder = RleBpDecoder::new(ByteCursor::new(runs), 1);
    let mut bits = vec![0u8; count];
    decoder.get_batch(&mut bits)?;

    Ok(bits.into_iter().map(|b| ScalarValue::Boolean(b == 1)).collect())
}

fn decode_delta_ints(cursor: ByteCursor, count: usize) -> Result<Vec<i64>> {
    let mut decoder = DeltaBinaryPackedDecoder::try_new(cursor)?;
    let mut out = Vec::new();
    decoder.read(&mut out, count)?;
    Ok(out)
}
