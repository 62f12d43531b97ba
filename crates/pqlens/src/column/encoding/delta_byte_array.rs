use bytes::{Bytes, BytesMut};
use pqlens_error::{ErrorKind, PqError, Result};

use super::delta_binary_packed::DeltaBinaryPackedDecoder;
use super::delta_length_byte_array::DeltaLengthByteArrayDecoder;
use crate::column::bitutil::ByteCursor;

/// Decoder for DELTA_BYTE_ARRAY (incremental/front coding).
///
/// Prefix lengths are a DELTA_BINARY_PACKED stream, suffixes are a
/// DELTA_LENGTH_BYTE_ARRAY stream. Each value is the first `prefix` bytes of
/// the previous value followed by its suffix.
#[derive(Debug)]
pub struct DeltaByteArrayDecoder {
    prefix_lengths: Vec<i64>,
    suffixes: DeltaLengthByteArrayDecoder,
    previous: Bytes,
    idx: usize,
}

impl DeltaByteArrayDecoder {
    pub fn try_new(cursor: ByteCursor, num_values: usize) -> Result<Self> {
        let mut dec = DeltaBinaryPackedDecoder::try_new(cursor)?;
        let mut prefix_lengths = Vec::new();
        dec.read(&mut prefix_lengths, num_values)?;

        let suffixes = DeltaLengthByteArrayDecoder::try_new(dec.into_cursor(), num_values)?;

        Ok(DeltaByteArrayDecoder {
            prefix_lengths,
            suffixes,
            previous: Bytes::new(),
            idx: 0,
        })
    }

    pub fn next_value(&mut self) -> Result<Bytes> {
        let prefix_len = self.prefix_lengths.get(self.idx).copied().ok_or_else(|| {
            PqError::new(ErrorKind::CorruptPage, "DELTA_BYTE_ARRAY: Read past the last value")
        })?;
        self.idx += 1;

        if prefix_len < 0 || prefix_len as usize > self.previous.len() {
            return Err(PqError::new(
                ErrorKind::CorruptPage,
                "DELTA_BYTE_ARRAY: Prefix longer than previous value",
            )
            .with_field("prefix_len", prefix_len)
            .with_field("previous_len", self.previous.len()));
        }

        let suffix = self.suffixes.next_value()?;
        let value = if prefix_len == 0 {
            suffix
        } else {
            let mut buf = BytesMut::with_capacity(prefix_len as usize + suffix.len());
            buf.extend_from_slice(&self.previous[..prefix_len as usize]);
            buf.extend_from_slice(&suffix);
            buf.freeze()
        };

        self.previous = value.clone();
        Ok(value)
    }

    pub fn read_all(mut self) -> Result<Vec<Bytes>> {
        let mut out = Vec::with_capacity(self.prefix_lengths.len());
        for _ in 0..self.prefix_lengths.len() {
            out.push(self.next_value()?);
        }
        Ok(out)
    }
}
