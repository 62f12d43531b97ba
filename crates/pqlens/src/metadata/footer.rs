//! Locating and decoding the footer at the end of a file.
//!
//! ```text
//! +------+---------+----------------+-----------------+------+
//! | PAR1 | ...data | FileMetaData   | metadata length | PAR1 |
//! +------+---------+----------------+-----------------+------+
//!                                     4 bytes LE        4 bytes
//! ```

use pqlens_error::{ErrorKind, PqError, Result, ResultExt};
use tracing::debug;

use super::FileMetaData;
use crate::format::{self, decode_from_slice};
use crate::source::ByteSource;

/// Size of the trailer: metadata length plus magic.
pub const FOOTER_SIZE: usize = 8;

pub const PARQUET_MAGIC: [u8; 4] = [b'P', b'A', b'R', b'1'];

/// Magic for files with an encrypted footer.
pub const PARQUET_MAGIC_ENC: [u8; 4] = [b'P', b'A', b'R', b'E'];

/// Format versions this reader understands.
pub const SUPPORTED_VERSIONS: [i32; 2] = [1, 2];

/// Decode the trailer, returning the length of the metadata block.
pub fn decode_footer(trailer: &[u8; FOOTER_SIZE]) -> Result<usize> {
    let magic = &trailer[4..];
    if magic == PARQUET_MAGIC_ENC {
        return Err(PqError::new(
            ErrorKind::UnsupportedVersion,
            "Files with encrypted footers are not supported",
        ));
    }
    if magic != PARQUET_MAGIC {
        return Err(
            PqError::new(ErrorKind::CorruptFooter, "Invalid magic at end of file")
                .with_field("magic", format!("{magic:?}")),
        );
    }

    let len = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    Ok(len as usize)
}

/// Decode the serialized metadata block.
pub fn decode_metadata(buf: &[u8]) -> Result<FileMetaData> {
    let (meta, consumed) = decode_from_slice::<format::FileMetaData>(buf)
        .context(ErrorKind::CorruptFooter, "Failed to decode file metadata")?;

    if consumed != buf.len() {
        return Err(PqError::new(
            ErrorKind::CorruptFooter,
            "Metadata size doesn't match the length in the trailer",
        )
        .with_field("declared", buf.len())
        .with_field("decoded", consumed));
    }

    if !SUPPORTED_VERSIONS.contains(&meta.version) {
        return Err(
            PqError::new(ErrorKind::UnsupportedVersion, "Unsupported file format version")
                .with_field("version", meta.version),
        );
    }

    FileMetaData::try_from_thrift(meta)
}

/// Read and decode the footer from a source.
///
/// Issues exactly two range reads, one for the trailer and one for the
/// metadata block.
pub fn read_metadata<S>(source: &S, max_footer_len: Option<usize>) -> Result<FileMetaData>
where
    S: ByteSource + ?Sized,
{
    let size = source.len()?;
    if size < FOOTER_SIZE as u64 {
        return Err(
            PqError::new(ErrorKind::CorruptFooter, "File is too small to hold a footer")
                .with_field("size", size),
        );
    }

    let raw = source.read_range(size - FOOTER_SIZE as u64, FOOTER_SIZE)?;
    let mut trailer = [0; FOOTER_SIZE];
    trailer.copy_from_slice(&raw);
    let metadata_len = decode_footer(&trailer)?;

    if let Some(max) = max_footer_len {
        if metadata_len > max {
            return Err(PqError::new(
                ErrorKind::CorruptFooter,
                "Footer length exceeds the configured maximum",
            )
            .with_field("metadata_len", metadata_len)
            .with_field("max", max));
        }
    }

    // Leading magic plus metadata plus trailer.
    let needed = metadata_len as u64 + FOOTER_SIZE as u64 + PARQUET_MAGIC.len() as u64;
    if needed > size {
        return Err(PqError::new(
            ErrorKind::CorruptFooter,
            "Footer length exceeds file size",
        )
        .with_field("metadata_len", metadata_len)
        .with_field("size", size));
    }

    let metadata_start = size - FOOTER_SIZE as u64 - metadata_len as u64;
    let buf = source.read_range(metadata_start, metadata_len)?;
    let meta = decode_metadata(&buf)?;

    debug!(
        metadata_len,
        version = meta.version,
        num_rows = meta.num_rows,
        row_groups = meta.row_groups.len(),
        columns = meta.schema.num_columns(),
        "decoded file footer"
    );

    Ok(meta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{CountingSource, MemorySource};
    use crate::testutil::{ColumnSpec, TestFileBuilder};

    #[test]
    fn decode_trailer() {
        let mut trailer = [0u8; 8];
        trailer[..4].copy_from_slice(&300u32.to_le_bytes());
        trailer[4..].copy_from_slice(b"PAR1");
        assert_eq!(300, decode_footer(&trailer).unwrap());

        trailer[4..].copy_from_slice(b"PARE");
        let err = decode_footer(&trailer).unwrap_err();
        assert_eq!(ErrorKind::UnsupportedVersion, err.kind());

        trailer[4..].copy_from_slice(b"NOPE");
        let err = decode_footer(&trailer).unwrap_err();
        assert_eq!(ErrorKind::CorruptFooter, err.kind());
    }

    #[test]
    fn two_reads_for_footer() {
        logutil::init_test();

        let data = TestFileBuilder::new()
            .column(ColumnSpec::required_int64("id"))
            .row_group(vec![vec![1i64, 2, 3].into()])
            .build();
        let source = CountingSource::new(MemorySource::new(data));

        let meta = read_metadata(&source, None).unwrap();
        assert_eq!(3, meta.num_rows);
        assert_eq!(2, source.reads());
    }

    #[test]
    fn file_too_small() {
        let source = MemorySource::new(b"PAR1".to_vec());
        let err = read_metadata(&source, None).unwrap_err();
        assert_eq!(ErrorKind::CorruptFooter, err.kind());
    }

    #[test]
    fn footer_length_exceeds_file() {
        let mut data = b"PAR1".to_vec();
        data.extend_from_slice(&1000u32.to_le_bytes());
        data.extend_from_slice(b"PAR1");
        let err = read_metadata(&MemorySource::new(data), None).unwrap_err();
        assert_eq!(ErrorKind::CorruptFooter, err.kind());
    }

    #[test]
    fn footer_length_exceeds_max() {
        let data = TestFileBuilder::new()
            .column(ColumnSpec::required_int64("id"))
            .row_group(vec![vec![1i64].into()])
            .build();
        let err = read_metadata(&MemorySource::new(data), Some(4)).unwrap_err();
        assert_eq!(ErrorKind::CorruptFooter, err.kind());
    }

    #[test]
    fn garbage_metadata() {
        let mut data = b"PAR1".to_vec();
        data.extend_from_slice(&[0xFF; 16]);
        data.extend_from_slice(&16u32.to_le_bytes());
        data.extend_from_slice(b"PAR1");
        let err = read_metadata(&MemorySource::new(data), None).unwrap_err();
        assert_eq!(ErrorKind::CorruptFooter, err.kind());
    }

    #[test]
    fn unsupported_version() {
        let data = TestFileBuilder::new()
            .version(7)
            .column(ColumnSpec::required_int64("id"))
            .row_group(vec![vec![1i64].into()])
            .build();
        let err = read_metadata(&MemorySource::new(data), None).unwrap_err();
        assert_eq!(ErrorKind::UnsupportedVersion, err.kind());
    }
}
