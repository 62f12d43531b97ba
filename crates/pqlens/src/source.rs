//! Random-access byte providers the reader pulls from.

use std::fmt::Debug;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use parking_lot::Mutex;
use pqlens_error::{ErrorKind, PqError, Result, ResultExt};

/// A seekable, sliceable source of bytes.
///
/// Implementations must tolerate `read_range` being called from multiple
/// threads. Sources that can't serve independent range reads concurrently
/// serialize them internally.
#[allow(clippy::len_without_is_empty)]
pub trait ByteSource: Debug + Send + Sync {
    /// Total length of the source in bytes.
    fn len(&self) -> Result<u64>;

    /// Read exactly `len` bytes starting at `offset`.
    ///
    /// Reading past the end of the source is an IO error, never a short read.
    fn read_range(&self, offset: u64, len: usize) -> Result<Bytes>;
}

impl<S> ByteSource for Arc<S>
where
    S: ByteSource + ?Sized,
{
    fn len(&self) -> Result<u64> {
        self.as_ref().len()
    }

    fn read_range(&self, offset: u64, len: usize) -> Result<Bytes> {
        self.as_ref().read_range(offset, len)
    }
}

fn out_of_bounds(offset: u64, len: usize, total: u64) -> PqError {
    PqError::with_source(
        ErrorKind::Io,
        "Read range extends past end of source",
        Box::new(std::io::Error::from(std::io::ErrorKind::UnexpectedEof)),
    )
    .with_field("offset", offset)
    .with_field("len", len)
    .with_field("source_len", total)
}

/// In-memory source. Range reads are zero-copy slices.
#[derive(Debug, Clone)]
pub struct MemorySource {
    data: Bytes,
}

impl MemorySource {
    pub fn new(data: impl Into<Bytes>) -> Self {
        MemorySource { data: data.into() }
    }
}

impl ByteSource for MemorySource {
    fn len(&self) -> Result<u64> {
        Ok(self.data.len() as u64)
    }

    fn read_range(&self, offset: u64, len: usize) -> Result<Bytes> {
        let total = self.data.len() as u64;
        let end = offset.checked_add(len as u64);
        match end {
            Some(end) if end <= total => Ok(self.data.slice(offset as usize..end as usize)),
            _ => Err(out_of_bounds(offset, len, total)),
        }
    }
}

/// Source backed by a local file.
///
/// Seek and read share the file cursor, so reads are serialized through a
/// lock. Open multiple handles for parallel reads.
#[derive(Debug)]
pub struct FileSource {
    file: Mutex<File>,
    len: u64,
}

impl FileSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).context_fn(ErrorKind::Io, || {
            format!("Failed to open file '{}'", path.display())
        })?;
        Self::try_new(file)
    }

    pub fn try_new(file: File) -> Result<Self> {
        let len = file.metadata()?.len();
        Ok(FileSource {
            file: Mutex::new(file),
            len,
        })
    }
}

impl ByteSource for FileSource {
    fn len(&self) -> Result<u64> {
        Ok(self.len)
    }

    fn read_range(&self, offset: u64, len: usize) -> Result<Bytes> {
        match offset.checked_add(len as u64) {
            Some(end) if end <= self.len => (),
            _ => return Err(out_of_bounds(offset, len, self.len)),
        }

        let mut buf = vec![0; len];
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut buf)?;

        Ok(Bytes::from(buf))
    }
}

/// Wraps a source and counts range reads issued against it.
#[derive(Debug)]
pub struct CountingSource<S> {
    inner: S,
    reads: AtomicUsize,
    bytes: AtomicUsize,
}

impl<S> CountingSource<S> {
    pub fn new(inner: S) -> Self {
        CountingSource {
            inner,
            reads: AtomicUsize::new(0),
            bytes: AtomicUsize::new(0),
        }
    }

    /// Number of `read_range` calls so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    /// Total bytes requested so far.
    pub fn bytes_read(&self) -> usize {
        self.bytes.load(Ordering::Relaxed)
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S> ByteSource for CountingSource<S>
where
    S: ByteSource,
{
    fn len(&self) -> Result<u64> {
        self.inner.len()
    }

    fn read_range(&self, offset: u64, len: usize) -> Result<Bytes> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(len, Ordering::Relaxed);
        self.inner.read_range(offset, len)
    }
}
