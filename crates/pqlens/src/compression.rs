//! Page decompression.
//!
//! Page bodies are handed to a [`Decompressor`] along with the codec from the
//! column chunk metadata. [`BuiltinDecompressor`] covers the codecs enabled
//! through crate features, custom implementations can be plugged in through
//! the reader options.

use std::fmt::Debug;
#[cfg(feature = "lz4")]
use std::io::Read;

use bytes::Bytes;
use pqlens_error::{ErrorKind, PqError, Result};

use crate::basic::Compression;

pub trait Decompressor: Debug + Send + Sync {
    /// Decompress a page body.
    ///
    /// `uncompressed_size` is the size recorded in the page header. The output
    /// must be exactly that long.
    fn decompress(&self, codec: Compression, input: &[u8], uncompressed_size: usize)
    -> Result<Bytes>;
}

/// Upper bound on up-front allocation for streaming decoders. Sizes come from
/// page headers and aren't trusted.
const MAX_PREALLOC: usize = 16 * 1024 * 1024;

/// Decompressor using the codec crates compiled into this build.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinDecompressor;

fn codec_error(
    codec: Compression,
    err: impl std::error::Error + Send + Sync + 'static,
) -> PqError {
    PqError::with_source(ErrorKind::CorruptPage, "Failed to decompress page", Box::new(err))
        .with_field("codec", codec)
}

fn unsupported(codec: Compression) -> PqError {
    PqError::new(ErrorKind::UnsupportedCodec, "Compression codec not supported")
        .with_field("codec", codec)
}

impl Decompressor for BuiltinDecompressor {
    fn decompress(
        &self,
        codec: Compression,
        input: &[u8],
        uncompressed_size: usize,
    ) -> Result<Bytes> {
        let out = match codec {
            Compression::UNCOMPRESSED => input.to_vec(),
            #[cfg(feature = "snap")]
            Compression::SNAPPY => {
                let len = snap::raw::decompress_len(input).map_err(|e| codec_error(codec, e))?;
                if len != uncompressed_size {
                    return Err(size_mismatch(codec, uncompressed_size, len));
                }
                snap::raw::Decoder::new()
                    .decompress_vec(input)
                    .map_err(|e| codec_error(codec, e))?
            }
            Compression::GZIP => {
                let decoder = flate2::read::MultiGzDecoder::new(input);
                read_bounded(codec, decoder, uncompressed_size)?
            }
            #[cfg(feature = "brotli")]
            Compression::BROTLI => {
                let decoder = brotli::Decompressor::new(input, 4096);
                read_bounded(codec, decoder, uncompressed_size)?
            }
            #[cfg(feature = "lz4")]
            Compression::LZ4 => decompress_lz4_legacy(input, uncompressed_size)?,
            #[cfg(feature = "lz4")]
            Compression::LZ4_RAW => lz4_flex::block::decompress(input, uncompressed_size)
                .map_err(|e| codec_error(codec, e))?,
            #[cfg(feature = "zstd")]
            Compression::ZSTD => zstd::bulk::decompress(input, uncompressed_size)
                .map_err(|e| codec_error(codec, e))?,
            other => return Err(unsupported(other)),
        };

        if out.len() != uncompressed_size {
            return Err(size_mismatch(codec, uncompressed_size, out.len()));
        }

        Ok(Bytes::from(out))
    }
}

fn size_mismatch(codec: Compression, expected: usize, got: usize) -> PqError {
    PqError::new(
        ErrorKind::CorruptPage,
        "Decompressed size doesn't match the page header",
    )
    .with_field("codec", codec)
    .with_field("expected", expected)
    .with_field("got", got)
}

/// Read a streaming decoder to the end, failing if it produces more than
/// `limit` bytes.
fn read_bounded(codec: Compression, reader: impl std::io::Read, limit: usize) -> Result<Vec<u8>> {
    use std::io::Read as _;

    let mut out = Vec::with_capacity(limit.min(MAX_PREALLOC));
    reader
        .take(limit as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|e| codec_error(codec, e))?;
    Ok(out)
}

/// The deprecated LZ4 codec.
///
/// Hadoop writers framed raw blocks with big endian lengths, other writers
/// used the LZ4 frame format or plain blocks. Try them in that order.
#[cfg(feature = "lz4")]
fn decompress_lz4_legacy(input: &[u8], uncompressed_size: usize) -> Result<Vec<u8>> {
    if let Some(out) = decompress_lz4_hadoop(input, uncompressed_size) {
        return Ok(out);
    }

    let mut frame = lz4_flex::frame::FrameDecoder::new(input);
    let mut out = Vec::with_capacity(uncompressed_size.min(MAX_PREALLOC));
    if frame.read_to_end(&mut out).is_ok() && out.len() == uncompressed_size {
        return Ok(out);
    }

    lz4_flex::block::decompress(input, uncompressed_size)
        .map_err(|e| codec_error(Compression::LZ4, e))
}

#[cfg(feature = "lz4")]
fn decompress_lz4_hadoop(mut input: &[u8], uncompressed_size: usize) -> Option<Vec<u8>> {
    const PREFIX_LEN: usize = 8;

    let mut out = Vec::with_capacity(uncompressed_size.min(MAX_PREALLOC));
    while input.len() >= PREFIX_LEN {
        let expected = u32::from_be_bytes(input[0..4].try_into().ok()?) as usize;
        let compressed = u32::from_be_bytes(input[4..8].try_into().ok()?) as usize;
        input = &input[PREFIX_LEN..];

        if compressed > input.len() || out.len() + expected > uncompressed_size {
            return None;
        }

        let block = lz4_flex::block::decompress(&input[..compressed], expected).ok()?;
        if block.len() != expected {
            return None;
        }
        out.extend_from_slice(&block);
        input = &input[compressed..];
    }

    if input.is_empty() && out.len() == uncompressed_size {
        Some(out)
    } else {
        None
    }
}
