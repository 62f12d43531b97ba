use pqlens_error::{ErrorKind, PqError, Result};

use crate::column::bitutil::{
    BITPACK_MASKS,
    BitPackEncodeable,
    BitUnpackState,
    ByteCursor,
    bit_unpack,
    read_unsigned_vlq,
};

/// Decoder for the RLE / bit-packing hybrid encoding.
///
/// Used for repetition and definition levels, dictionary indices, and RLE
/// encoded booleans.
#[derive(Debug)]
pub struct RleBpDecoder {
    cursor: ByteCursor,
    bit_width: u8,
    /// Values left in the current RLE run.
    rle_left: usize,
    /// Value repeated by the current RLE run.
    rle_value: u64,
    /// Values left in the current bit-packed run.
    bp_left: usize,
    bp_state: BitUnpackState,
}

impl RleBpDecoder {
    pub fn new(cursor: ByteCursor, bit_width: u8) -> Self {
        RleBpDecoder {
            cursor,
            bit_width,
            rle_left: 0,
            rle_value: 0,
            bp_left: 0,
            bp_state: BitUnpackState::new(bit_width),
        }
    }

    /// Fill `out` completely, erroring if the encoded data runs out first.
    pub fn get_batch<T>(&mut self, out: &mut [T]) -> Result<()>
    where
        T: BitPackEncodeable,
    {
        let mut idx = 0;
        while idx < out.len() {
            if self.rle_left == 0 && self.bp_left == 0 {
                self.read_run_header()?;
            }

            if self.rle_left > 0 {
                let n = self.rle_left.min(out.len() - idx);
                out[idx..idx + n].fill(T::from_u64(self.rle_value));
                self.rle_left -= n;
                idx += n;
            } else {
                let n = self.bp_left.min(out.len() - idx);
                bit_unpack(&mut self.bp_state, &mut self.cursor, &mut out[idx..idx + n])?;
                self.bp_left -= n;
                idx += n;
            }
        }

        Ok(())
    }

    fn read_run_header(&mut self) -> Result<()> {
        if self.cursor.is_empty() {
            return Err(PqError::new(
                ErrorKind::CorruptPage,
                "RLE/bit-packed data exhausted before all values were read",
            ));
        }

        let header = read_unsigned_vlq(&mut self.cursor)?;
        if header & 1 == 1 {
            // Bit-packed run of (header >> 1) groups of 8 values.
            let groups = (header >> 1) as usize;
            self.bp_left = groups.checked_mul(8).ok_or_else(|| {
                PqError::new(ErrorKind::CorruptPage, "Bit-packed run length overflows")
            })?;
            self.bp_state = BitUnpackState::new(self.bit_width);
        } else {
            // RLE run, value stored in ceil(bit_width / 8) little endian bytes.
            self.rle_left = (header >> 1) as usize;
            let num_bytes = (self.bit_width as usize).div_ceil(8);
            let mut value = 0u64;
            for i in 0..num_bytes {
                value |= (self.cursor.read_u8()? as u64) << (i * 8);
            }
            if self.bit_width < 64 && value > BITPACK_MASKS[self.bit_width as usize] {
                return Err(PqError::new(
                    ErrorKind::CorruptPage,
                    "RLE run value exceeds bit width",
                )
                .with_field("value", value)
                .with_field("bit_width", self.bit_width));
            }
            self.rle_value = value;
        }

        Ok(())
    }
}
