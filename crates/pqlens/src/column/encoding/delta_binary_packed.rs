use pqlens_error::{ErrorKind, PqError, Result};

use crate::column::bitutil::{
    BitUnpackState,
    ByteCursor,
    bit_unpack,
    read_unsigned_vlq,
    zigzag_decode,
};

/// Decoder for DELTA_BINARY_PACKED integers.
///
/// Layout is a header (block size, miniblocks per block, total value count,
/// first value) followed by blocks. Each block holds a zigzag min delta, one
/// bit width byte per miniblock, then the bit packed miniblocks.
#[derive(Debug)]
pub struct DeltaBinaryPackedDecoder {
    cursor: ByteCursor,
    miniblocks_per_block: usize,
    values_per_miniblock: usize,
    /// Total values declared by the header.
    total_values: usize,
    /// Values returned so far.
    values_read: usize,
    last_value: i64,
    min_delta: i64,
    bit_widths: Vec<u8>,
    /// Index of the next miniblock to start in the current block.
    next_miniblock: usize,
    miniblock: ByteCursor,
    miniblock_state: BitUnpackState,
    miniblock_left: usize,
}

impl DeltaBinaryPackedDecoder {
    pub fn try_new(mut cursor: ByteCursor) -> Result<Self> {
        let block_size = read_unsigned_vlq(&mut cursor)? as usize;
        let miniblocks_per_block = read_unsigned_vlq(&mut cursor)? as usize;
        let total_values = read_unsigned_vlq(&mut cursor)? as usize;
        let first_value = zigzag_decode(read_unsigned_vlq(&mut cursor)?);

        if block_size == 0
            || block_size % 128 != 0
            || miniblocks_per_block == 0
            || block_size % miniblocks_per_block != 0
            || (block_size / miniblocks_per_block) % 32 != 0
        {
            return Err(PqError::new(
                ErrorKind::CorruptPage,
                "Invalid DELTA_BINARY_PACKED block layout",
            )
            .with_field("block_size", block_size)
            .with_field("miniblocks_per_block", miniblocks_per_block));
        }

        Ok(DeltaBinaryPackedDecoder {
            cursor,
            miniblocks_per_block,
            values_per_miniblock: block_size / miniblocks_per_block,
            total_values,
            values_read: 0,
            last_value: first_value,
            min_delta: 0,
            bit_widths: Vec::new(),
            next_miniblock: 0,
            miniblock: ByteCursor::new(bytes::Bytes::new()),
            miniblock_state: BitUnpackState::new(0),
            miniblock_left: 0,
        })
    }

    /// Total number of values in the stream according to its header.
    pub fn total_values(&self) -> usize {
        self.total_values
    }

    /// Read `count` values, appending them to `out`.
    pub fn read(&mut self, out: &mut Vec<i64>, count: usize) -> Result<()> {
        if count > self.total_values - self.values_read {
            return Err(PqError::new(
                ErrorKind::CorruptPage,
                "DELTA_BINARY_PACKED stream holds fewer values than requested",
            )
            .with_field("requested", count)
            .with_field("available", self.total_values - self.values_read));
        }

        out.reserve(count.min(4096));
        for _ in 0..count {
            let v = self.next_value()?;
            out.push(v);
        }

        Ok(())
    }

    /// Return the cursor positioned after the last miniblock touched.
    ///
    /// Only meaningful once all values have been read, which is how the
    /// length prefixed byte array encodings use it.
    pub fn into_cursor(self) -> ByteCursor {
        self.cursor
    }

    fn next_value(&mut self) -> Result<i64> {
        if self.values_read == 0 {
            self.values_read = 1;
            return Ok(self.last_value);
        }

        if self.miniblock_left == 0 {
            self.start_miniblock()?;
        }

        let mut delta = [0u64; 1];
        bit_unpack(&mut self.miniblock_state, &mut self.miniblock, &mut delta)?;
        self.miniblock_left -= 1;
        self.values_read += 1;

        self.last_value = self
            .last_value
            .wrapping_add(self.min_delta)
            .wrapping_add(delta[0] as i64);

        Ok(self.last_value)
    }

    fn start_miniblock(&mut self) -> Result<()> {
        if self.bit_widths.is_empty() || self.next_miniblock == self.miniblocks_per_block {
            self.min_delta = zigzag_decode(read_unsigned_vlq(&mut self.cursor)?);
            self.bit_widths = self.cursor.read_bytes(self.miniblocks_per_block)?.to_vec();
            self.next_miniblock = 0;
        }

        let width = self.bit_widths[self.next_miniblock];
        self.next_miniblock += 1;

        // The final miniblock should be padded to full size, but tolerate
        // writers that stop after the last value.
        let len = (self.values_per_miniblock * width as usize / 8).min(self.cursor.remaining());
        self.miniblock = ByteCursor::new(self.cursor.read_bytes(len)?);
        self.miniblock_state = BitUnpackState::new(width);
        self.miniblock_left = self.values_per_miniblock;

        Ok(())
    }
}
