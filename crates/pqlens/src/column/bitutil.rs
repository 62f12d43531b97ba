use std::fmt::Debug;

use bytes::Bytes;
use pqlens_error::{ErrorKind, PqError, Result};

/// All possible masks for an 8-byte wide value.
/// BITPACK_MASKS[n] = (1 << n) - 1
pub const BITPACK_MASKS: [u64; 65] = {
    let mut masks = [0; 65];
    let mut i = 0;
    while i < 64 {
        masks[i] = (1u64 << i) - 1;
        i += 1;
    }
    masks[64] = u64::MAX;
    masks
};

/// Used for bit extraction; byte = 8 bits
pub const BYTE_WIDTH: u8 = 8;

fn truncated(what: &'static str, wanted: usize, remaining: usize) -> PqError {
    PqError::new(ErrorKind::CorruptPage, "Unexpected end of page data")
        .with_field("reading", what)
        .with_field("wanted", wanted)
        .with_field("remaining", remaining)
}

/// Bounds checked forward cursor over a page buffer.
///
/// Slices taken from the cursor share the underlying allocation.
#[derive(Debug, Clone)]
pub struct ByteCursor {
    buf: Bytes,
    pos: usize,
}

impl ByteCursor {
    pub fn new(buf: Bytes) -> Self {
        ByteCursor { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn peek_u8(&self) -> Result<u8> {
        self.buf
            .get(self.pos)
            .copied()
            .ok_or_else(|| truncated("u8", 1, 0))
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let b = self.peek_u8()?;
        self.pos += 1;
        Ok(b)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let remaining = self.remaining();
        let src = self
            .buf
            .get(self.pos..self.pos + N)
            .ok_or_else(|| truncated("fixed width value", N, remaining))?;
        let mut out = [0; N];
        out.copy_from_slice(src);
        self.pos += N;
        Ok(out)
    }

    pub fn read_u32_le(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    /// Take the next `len` bytes as a shared slice.
    pub fn read_bytes(&mut self, len: usize) -> Result<Bytes> {
        if len > self.remaining() {
            return Err(truncated("byte slice", len, self.remaining()));
        }
        let out = self.buf.slice(self.pos..self.pos + len);
        self.pos += len;
        Ok(out)
    }

    pub fn skip(&mut self, len: usize) -> Result<()> {
        if len > self.remaining() {
            return Err(truncated("skipped bytes", len, self.remaining()));
        }
        self.pos += len;
        Ok(())
    }

    /// Consume and return everything left in the cursor.
    pub fn take_remaining(&mut self) -> Bytes {
        let out = self.buf.slice(self.pos..);
        self.pos = self.buf.len();
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitUnpackState {
    pub bit_pos: u8,
    pub bit_width: u8,
}

impl BitUnpackState {
    pub const fn new(bit_width: u8) -> Self {
        BitUnpackState {
            bit_pos: 0,
            bit_width,
        }
    }
}

/// Unpacks values from the underlying bit‑packed cursor, writing them to `out`.
///
/// This will read `out.len()` values. This will update the bit position in the
/// state to allow resuming partial byte reads.
pub fn bit_unpack<T>(state: &mut BitUnpackState, cursor: &mut ByteCursor, out: &mut [T]) -> Result<()>
where
    T: BitPackEncodeable,
{
    let w = state.bit_width;
    if w > 64 {
        return Err(PqError::new(
            ErrorKind::CorruptPage,
            "Bit width greater than 64 not supported",
        )
        .with_field("bit_width", w));
    }

    if w == 0 {
        out.fill(T::default());
        return Ok(());
    }

    for dst in out {
        let mut bits_needed = w;
        let mut value: u64 = 0;
        // Assemble the w bits into `value` from LSB->MSB.
        let mut bit_offset_in_value = 0;
        let mut cur_bit_pos = state.bit_pos;

        while bits_needed > 0 {
            let byte = cursor.peek_u8()? as u64;
            let bits_available = BYTE_WIDTH - cur_bit_pos;
            let take = bits_needed.min(bits_available);

            let chunk = (byte >> cur_bit_pos) & BITPACK_MASKS[take as usize];
            value |= chunk << bit_offset_in_value;

            bits_needed -= take;
            bit_offset_in_value += take;
            cur_bit_pos += take;

            if cur_bit_pos == BYTE_WIDTH {
                cursor.skip(1)?;
                cur_bit_pos = 0;
            }
        }

        state.bit_pos = cur_bit_pos;
        *dst = T::from_u64(value);
    }

    Ok(())
}

/// Reads an unsigned vlq from the cursor.
///
/// The most-significant bit acts as a continuation flag; the lower 7 bits are
/// accumulated into the result in little-endian order.
pub fn read_unsigned_vlq(cursor: &mut ByteCursor) -> Result<u64> {
    let mut result = 0u64;
    let mut shift = 0u8;
    loop {
        let byte = cursor.read_u8()?;
        result |= ((byte & 0x7F) as u64) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
        if shift >= 64 {
            return Err(PqError::new(ErrorKind::CorruptPage, "VLQ integer too large"));
        }
    }
    Ok(result)
}

/// Decodes a ZigZag-encoded unsigned integer into a signed value.
pub fn zigzag_decode(n: u64) -> i64 {
    ((n >> 1) as i64) ^ (-((n & 1) as i64))
}

/// Number of bits needed to represent `max`.
pub fn num_required_bits(max: u64) -> u8 {
    (64 - max.leading_zeros()) as u8
}

/// Converting from a u64 to the target type. Only the least-significant bytes
/// that fit in the type are used.
pub trait BitPackEncodeable: Default + Copy + Debug {
    fn from_u64(v: u64) -> Self;
}

macro_rules! impl_bitpack_encodeable {
    ($native:ty) => {
        impl BitPackEncodeable for $native {
            fn from_u64(v: u64) -> Self {
                v as $native
            }
        }
    };
}

impl_bitpack_encodeable!(u8);
impl_bitpack_encodeable!(u16);
impl_bitpack_encodeable!(u32);
impl_bitpack_encodeable!(u64);
impl_bitpack_encodeable!(i16);
impl_bitpack_encodeable!(i32);
impl_bitpack_encodeable!(i64);
