//! Split block bloom filters.
//!
//! A filter is a header followed by a bitset of 256 bit blocks. Each block is
//! eight u32 words, a hash sets one bit in every word of one block.

use std::hash::Hasher;

use pqlens_error::{ErrorKind, PqError, Result, ResultExt};
use tracing::debug;
use twox_hash::XxHash64;

use crate::format::{self, decode_from_slice};
use crate::source::ByteSource;
use crate::value::ScalarValue;

/// Salts used to derive the bit set in each word of a block.
const SALT: [u32; 8] = [
    0x47b6137b, 0x44974d91, 0x8824ad5b, 0xa2b7289d, 0x705495c7, 0x2df1424b, 0x9efc4947, 0x5c6bfb31,
];

const BLOCK_SIZE: usize = 32;

/// Bytes read to decode the header when the filter length isn't recorded.
///
/// The header is four small fields, this is comfortably larger.
const HEADER_SIZE_ESTIMATE: usize = 20;

/// Upper bound on a filter's bitset.
const MAX_BITSET_SIZE: usize = 128 * 1024 * 1024;

type Block = [u32; 8];

fn block_mask(key: u32) -> Block {
    let mut mask = [0; 8];
    for (word, salt) in mask.iter_mut().zip(SALT) {
        *word = 1 << (key.wrapping_mul(salt) >> 27);
    }
    mask
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BloomFilter {
    blocks: Vec<Block>,
}

impl BloomFilter {
    /// Build a filter from a raw bitset.
    pub fn try_from_bitset(bitset: &[u8]) -> Result<Self> {
        if bitset.is_empty() || bitset.len() % BLOCK_SIZE != 0 {
            return Err(PqError::new(
                ErrorKind::CorruptFooter,
                "Bloom filter bitset must be a non-empty multiple of the block size",
            )
            .with_field("len", bitset.len()));
        }

        let blocks = bitset
            .chunks_exact(BLOCK_SIZE)
            .map(|chunk| {
                let mut block = [0u32; 8];
                for (word, raw) in block.iter_mut().zip(chunk.chunks_exact(4)) {
                    *word = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
                }
                block
            })
            .collect();

        Ok(BloomFilter { blocks })
    }

    /// Read a filter starting at `offset`.
    ///
    /// With a known length the header and bitset are fetched in one read,
    /// otherwise the header is read first.
    pub(crate) fn read_from<S>(source: &S, offset: u64, length: Option<usize>) -> Result<Self>
    where
        S: ByteSource + ?Sized,
    {
        let file_len = source.len()?;
        if offset >= file_len {
            return Err(PqError::new(
                ErrorKind::CorruptFooter,
                "Bloom filter offset is past the end of the file",
            )
            .with_field("offset", offset)
            .with_field("file_len", file_len));
        }
        let available = (file_len - offset) as usize;

        let (buf, read_len) = match length {
            Some(len) if len > available => {
                return Err(PqError::new(
                    ErrorKind::CorruptFooter,
                    "Bloom filter extends past the end of the file",
                )
                .with_field("offset", offset)
                .with_field("length", len));
            }
            Some(len) => (source.read_range(offset, len)?, len),
            None => {
                let len = HEADER_SIZE_ESTIMATE.min(available);
                (source.read_range(offset, len)?, len)
            }
        };

        let (header, header_len) = decode_from_slice::<format::BloomFilterHeader>(&buf)
            .context(ErrorKind::CorruptFooter, "Failed to decode bloom filter header")?;
        check_header(&header)?;

        let num_bytes = header.num_bytes as usize;
        let bitset = if header_len + num_bytes <= read_len {
            buf.slice(header_len..header_len + num_bytes)
        } else if length.is_some() || header_len + num_bytes > available {
            return Err(PqError::new(
                ErrorKind::CorruptFooter,
                "Bloom filter bitset extends past its recorded length",
            )
            .with_field("num_bytes", num_bytes));
        } else {
            source.read_range(offset + header_len as u64, num_bytes)?
        };

        debug!(offset, num_bytes, "read bloom filter");

        Self::try_from_bitset(&bitset)
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Size of the bitset in bytes.
    pub fn num_bytes(&self) -> usize {
        self.blocks.len() * BLOCK_SIZE
    }

    /// Test a precomputed xxHash64 hash.
    ///
    /// `false` means the value is definitely absent from the column chunk.
    pub fn check_hash(&self, hash: u64) -> bool {
        let block = &self.blocks[self.block_index(hash)];
        let mask = block_mask(hash as u32);
        block.iter().zip(mask).all(|(word, bit)| word & bit != 0)
    }

    /// Test whether a value might be in the column chunk.
    pub fn check(&self, value: &ScalarValue) -> bool {
        self.check_hash(hash_value(value))
    }

    fn block_index(&self, hash: u64) -> usize {
        (((hash >> 32) * self.blocks.len() as u64) >> 32) as usize
    }

    #[cfg(test)]
    pub(crate) fn with_num_blocks(num_blocks: usize) -> Self {
        BloomFilter {
            blocks: vec![[0; 8]; num_blocks],
        }
    }

    #[cfg(test)]
    pub(crate) fn insert_hash(&mut self, hash: u64) {
        let idx = self.block_index(hash);
        let mask = block_mask(hash as u32);
        for (word, bit) in self.blocks[idx].iter_mut().zip(mask) {
            *word |= bit;
        }
    }

    #[cfg(test)]
    pub(crate) fn to_bitset(&self) -> Vec<u8> {
        self.blocks
            .iter()
            .flat_map(|b| b.iter().flat_map(|w| w.to_le_bytes()))
            .collect()
    }
}

/// xxHash64 (seed 0) of the value's plain encoding.
pub fn hash_value(value: &ScalarValue) -> u64 {
    hash_bytes(&value.plain_bytes())
}

pub fn hash_bytes(bytes: &[u8]) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(bytes);
    hasher.finish()
}

/// Only the split block algorithm with xxHash and no compression exists.
/// Absent variants are taken to mean those.
fn check_header(header: &format::BloomFilterHeader) -> Result<()> {
    if header.num_bytes <= 0 || header.num_bytes as usize > MAX_BITSET_SIZE {
        return Err(PqError::new(
            ErrorKind::CorruptFooter,
            "Invalid bloom filter size",
        )
        .with_field("num_bytes", header.num_bytes));
    }

    for (field, variant) in [
        ("algorithm", header.algorithm),
        ("hash", header.hash),
        ("compression", header.compression),
    ] {
        if let Some(v) = variant {
            if v != 1 {
                return Err(PqError::new(
                    ErrorKind::UnsupportedEncoding,
                    "Unsupported bloom filter variant",
                )
                .with_field("field", field)
                .with_field("variant", v));
            }
        }
    }

    Ok(())
}
