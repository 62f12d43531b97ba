use bytes::Bytes;
use pqlens_error::{ErrorKind, PqError, Result};

use super::delta_binary_packed::DeltaBinaryPackedDecoder;
use crate::column::bitutil::ByteCursor;

/// Decoder for DELTA_LENGTH_BYTE_ARRAY.
///
/// All lengths come first as a DELTA_BINARY_PACKED stream, followed by the
/// concatenated value bytes.
#[derive(Debug)]
pub struct DeltaLengthByteArrayDecoder {
    lengths: Vec<i64>,
    curr_len_idx: usize,
    cursor: ByteCursor,
}

impl DeltaLengthByteArrayDecoder {
    pub fn try_new(cursor: ByteCursor, num_values: usize) -> Result<Self> {
        let mut dec = DeltaBinaryPackedDecoder::try_new(cursor)?;
        let mut lengths = Vec::new();
        dec.read(&mut lengths, num_values)?;
        let cursor = dec.into_cursor();

        let mut total: u64 = 0;
        for &len in &lengths {
            if len < 0 {
                return Err(PqError::new(
                    ErrorKind::CorruptPage,
                    "DELTA_LENGTH_BYTE_ARRAY: Negative value length",
                )
                .with_field("len", len));
            }
            total = total.saturating_add(len as u64);
        }

        if total > cursor.remaining() as u64 {
            return Err(PqError::new(
                ErrorKind::CorruptPage,
                "DELTA_LENGTH_BYTE_ARRAY: Total length exceeds remaining bytes",
            )
            .with_field("total", total)
            .with_field("remaining", cursor.remaining()));
        }

        Ok(DeltaLengthByteArrayDecoder {
            lengths,
            curr_len_idx: 0,
            cursor,
        })
    }

    /// Read the next value. Lengths were validated up front.
    pub fn next_value(&mut self) -> Result<Bytes> {
        let len = self.lengths.get(self.curr_len_idx).copied().ok_or_else(|| {
            PqError::new(
                ErrorKind::CorruptPage,
                "DELTA_LENGTH_BYTE_ARRAY: Read past the last value",
            )
        })?;
        self.curr_len_idx += 1;
        self.cursor.read_bytes(len as usize)
    }

    pub fn read_all(mut self) -> Result<Vec<Bytes>> {
        let mut out = Vec::with_capacity(self.lengths.len());
        for _ in 0..self.lengths.len() {
            out.push(self.next_value()?);
        }
        Ok(out)
    }
}
