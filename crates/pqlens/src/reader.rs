use std::sync::Arc;

use bytes::Bytes;
use pqlens_error::{ErrorKind, PqError, Result};
use tracing::debug;

use crate::bloom_filter::BloomFilter;
use crate::column::page_reader::PageCursor;
use crate::metadata::footer::read_metadata;
use crate::metadata::page_index::{
    ColumnIndex,
    OffsetIndex,
    decode_column_index,
    decode_offset_index,
};
use crate::metadata::{ByteRange, ColumnChunkMetaData, FileMetaData, RowGroupMetaData};
use crate::options::ReaderOptions;
use crate::schema::{ColumnPath, NodeRef, SchemaDescriptor};
use crate::source::ByteSource;

/// An opened file.
///
/// Holds the decoded footer and the source to read pages from. Views handed
/// out borrow from it.
#[derive(Debug)]
pub struct ParquetFile {
    /// Source we're reading from.
    source: Arc<dyn ByteSource>,
    /// Length of the source at open time.
    len: u64,
    /// Metadata for the file.
    metadata: Arc<FileMetaData>,
    options: ReaderOptions,
}

impl ParquetFile {
    pub fn open(source: impl ByteSource + 'static) -> Result<Self> {
        Self::open_with_options(source, ReaderOptions::default())
    }

    pub fn open_with_options(
        source: impl ByteSource + 'static,
        options: ReaderOptions,
    ) -> Result<Self> {
        Self::open_shared(Arc::new(source), options)
    }

    /// Open a file from a source shared with other readers.
    pub fn open_shared(source: Arc<dyn ByteSource>, options: ReaderOptions) -> Result<Self> {
        let len = source.len()?;
        let metadata = read_metadata(source.as_ref(), options.max_footer_len)?;

        Ok(ParquetFile {
            source,
            len,
            metadata: Arc::new(metadata),
            options,
        })
    }

    pub fn metadata(&self) -> &Arc<FileMetaData> {
        &self.metadata
    }

    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }

    pub fn schema_descr(&self) -> &Arc<SchemaDescriptor> {
        &self.metadata.schema
    }

    /// Root node of the schema tree.
    pub fn schema(&self) -> NodeRef<'_> {
        self.metadata.schema.root()
    }

    pub fn num_rows(&self) -> u64 {
        self.metadata.num_rows
    }

    pub fn num_row_groups(&self) -> usize {
        self.metadata.row_groups.len()
    }

    pub fn row_groups(&self) -> impl ExactSizeIterator<Item = RowGroupView<'_>> + '_ {
        self.metadata
            .row_groups
            .iter()
            .map(move |metadata| RowGroupView {
                file: self,
                metadata,
            })
    }

    pub fn row_group(&self, idx: usize) -> Result<RowGroupView<'_>> {
        let metadata = self.metadata.row_groups.get(idx).ok_or_else(|| {
            PqError::new(ErrorKind::IndexOutOfRange, "Row group index out of range")
                .with_field("index", idx)
                .with_field("num_row_groups", self.metadata.row_groups.len())
        })?;
        Ok(RowGroupView {
            file: self,
            metadata,
        })
    }

    /// Read a byte range referenced by the footer, checking it lies within the
    /// source.
    fn read_range(&self, range: ByteRange, kind: ErrorKind, what: &'static str) -> Result<Bytes> {
        if range.end() > self.len {
            return Err(PqError::new(kind, "Byte range extends past the end of the file")
                .with_field("reading", what)
                .with_field("offset", range.offset)
                .with_field("len", range.len)
                .with_field("file_len", self.len));
        }
        self.source.read_range(range.offset, range.len)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RowGroupView<'a> {
    file: &'a ParquetFile,
    metadata: &'a RowGroupMetaData,
}

impl<'a> RowGroupView<'a> {
    pub fn metadata(&self) -> &'a RowGroupMetaData {
        self.metadata
    }

    pub fn ordinal(&self) -> usize {
        self.metadata.ordinal
    }

    pub fn num_rows(&self) -> u64 {
        self.metadata.num_rows
    }

    pub fn total_byte_size(&self) -> u64 {
        self.metadata.total_byte_size
    }

    pub fn num_columns(&self) -> usize {
        self.metadata.columns.len()
    }

    /// All column chunks in schema leaf order.
    pub fn column_chunks(&self) -> Vec<ColumnChunkView<'a>> {
        let file = self.file;
        let row_group = self.metadata.ordinal;
        self.metadata
            .columns
            .iter()
            .map(|metadata| ColumnChunkView {
                file,
                row_group,
                metadata,
            })
            .collect()
    }

    pub fn column_chunk(&self, idx: usize) -> Result<ColumnChunkView<'a>> {
        let metadata = self.metadata.columns.get(idx).ok_or_else(|| {
            PqError::new(ErrorKind::IndexOutOfRange, "Column chunk index out of range")
                .with_field("index", idx)
                .with_field("num_columns", self.metadata.columns.len())
                .with_field("row_group", self.metadata.ordinal)
        })?;
        Ok(ColumnChunkView {
            file: self.file,
            row_group: self.metadata.ordinal,
            metadata,
        })
    }

    pub fn column_chunk_by_path(&self, path: &ColumnPath) -> Result<ColumnChunkView<'a>> {
        let idx = self.file.metadata.schema.column_index_of(path)?;
        self.column_chunk(idx)
    }

    /// Look up a chunk by its dotted path, e.g. `"a.b.c"`.
    pub fn column_chunk_by_name(&self, name: &str) -> Result<ColumnChunkView<'a>> {
        self.column_chunk_by_path(&ColumnPath::from_dotted(name))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ColumnChunkView<'a> {
    file: &'a ParquetFile,
    row_group: usize,
    metadata: &'a ColumnChunkMetaData,
}

impl<'a> ColumnChunkView<'a> {
    pub fn metadata(&self) -> &'a ColumnChunkMetaData {
        self.metadata
    }

    pub fn path(&self) -> &'a ColumnPath {
        &self.metadata.column.path
    }

    pub fn row_group(&self) -> usize {
        self.row_group
    }

    pub fn num_values(&self) -> u64 {
        self.metadata.num_values
    }

    /// Fetch the chunk and return a cursor at its first page.
    ///
    /// Every call reads the chunk again and starts from the beginning.
    pub fn open_pages(&self) -> Result<PageCursor> {
        if let Some(path) = &self.metadata.file_path {
            return Err(PqError::new(
                ErrorKind::UnsupportedVersion,
                "Column chunks stored in other files are not supported",
            )
            .with_field("file_path", path)
            .with_field("column", self.path()));
        }

        let range = self.metadata.byte_range();
        let chunk = self
            .file
            .read_range(range, ErrorKind::CorruptPage, "column chunk")
            .map_err(|e| e.with_field("column", self.path()))?;

        debug!(
            column = %self.path(),
            row_group = self.row_group,
            offset = range.offset,
            len = range.len,
            "opened column chunk"
        );

        Ok(PageCursor::new(
            self.metadata,
            range.offset,
            chunk,
            &self.file.options,
        ))
    }

    /// Load the column index for this chunk.
    ///
    /// `Ok(None)` when the writer didn't write one.
    pub fn column_index(&self) -> Result<Option<ColumnIndex>> {
        let Some(range) = self.metadata.column_index else {
            return Ok(None);
        };
        let buf = self
            .file
            .read_range(range, ErrorKind::CorruptFooter, "column index")?;
        let index = decode_column_index(&buf, &self.metadata.column)
            .map_err(|e| e.with_field("column", self.path()))?;
        debug!(column = %self.path(), pages = index.num_pages(), "loaded column index");
        Ok(Some(index))
    }

    /// Load the offset index for this chunk.
    ///
    /// `Ok(None)` when the writer didn't write one.
    pub fn offset_index(&self) -> Result<Option<OffsetIndex>> {
        let Some(range) = self.metadata.offset_index else {
            return Ok(None);
        };
        let buf = self
            .file
            .read_range(range, ErrorKind::CorruptFooter, "offset index")?;
        let index = decode_offset_index(&buf).map_err(|e| e.with_field("column", self.path()))?;
        debug!(column = %self.path(), pages = index.num_pages(), "loaded offset index");
        Ok(Some(index))
    }

    pub fn has_bloom_filter(&self) -> bool {
        self.metadata.bloom_filter_offset.is_some()
    }

    /// Load the bloom filter for this chunk.
    ///
    /// `Ok(None)` when the writer didn't write one.
    pub fn bloom_filter(&self) -> Result<Option<BloomFilter>> {
        let Some(offset) = self.metadata.bloom_filter_offset else {
            return Ok(None);
        };
        BloomFilter::read_from(
            self.file.source.as_ref(),
            offset,
            self.metadata.bloom_filter_length,
        )
        .map(Some)
        .map_err(|e| e.with_field("column", self.path()))
    }
}
