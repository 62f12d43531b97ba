//! File, row group, and column chunk metadata decoded from the footer.

pub mod footer;
pub mod page_index;
pub mod statistics;

use std::sync::Arc;

use pqlens_error::{ErrorKind, PqError, Result};

use crate::basic::{Compression, Encoding, PageType, Type};
use crate::format;
use crate::schema::{ColumnDescriptor, SchemaDescriptor};
use statistics::Statistics;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: Option<String>,
}

impl From<format::KeyValue> for KeyValue {
    fn from(kv: format::KeyValue) -> Self {
        KeyValue {
            key: kv.key,
            value: kv.value,
        }
    }
}

/// Number of pages of a given type and encoding in a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageEncodingStats {
    pub page_type: PageType,
    pub encoding: Encoding,
    pub count: i32,
}

/// Decoded footer of a file.
///
/// Immutable once built and freely shareable across threads.
#[derive(Debug, Clone)]
pub struct FileMetaData {
    pub version: i32,
    pub num_rows: u64,
    pub created_by: Option<String>,
    /// `None` when the writer wrote no properties at all.
    pub key_value_metadata: Option<Vec<KeyValue>>,
    pub schema: Arc<SchemaDescriptor>,
    pub row_groups: Vec<RowGroupMetaData>,
}

impl FileMetaData {
    pub fn num_row_groups(&self) -> usize {
        self.row_groups.len()
    }

    /// Look up a footer property by key.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.key_value_metadata
            .as_ref()?
            .iter()
            .find(|kv| kv.key == key)
            .and_then(|kv| kv.value.as_deref())
    }

    /// Build validated metadata from the raw thrift structure.
    pub(crate) fn try_from_thrift(meta: format::FileMetaData) -> Result<Self> {
        let schema = Arc::new(SchemaDescriptor::try_from_elements(&meta.schema)?);

        let num_rows = non_negative(meta.num_rows, "num_rows")?;

        let row_groups = meta
            .row_groups
            .into_iter()
            .enumerate()
            .map(|(ordinal, rg)| RowGroupMetaData::try_from_thrift(ordinal, rg, &schema))
            .collect::<Result<Vec<_>>>()?;

        let row_sum = row_groups
            .iter()
            .try_fold(0u64, |acc, rg| acc.checked_add(rg.num_rows));
        if row_sum != Some(num_rows) {
            return Err(PqError::new(
                ErrorKind::CorruptFooter,
                "Row group row counts don't add up to the file row count",
            )
            .with_field("file_rows", num_rows)
            .with_field("row_group_rows", format!("{row_sum:?}")));
        }

        Ok(FileMetaData {
            version: meta.version,
            num_rows,
            created_by: meta.created_by,
            key_value_metadata: meta
                .key_value_metadata
                .map(|kvs| kvs.into_iter().map(KeyValue::from).collect()),
            schema,
            row_groups,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RowGroupMetaData {
    /// Position of this row group in the file.
    pub ordinal: usize,
    pub num_rows: u64,
    pub total_byte_size: u64,
    pub total_compressed_size: Option<u64>,
    pub file_offset: Option<u64>,
    /// One chunk per schema leaf, in leaf order.
    pub columns: Vec<ColumnChunkMetaData>,
}

impl RowGroupMetaData {
    fn try_from_thrift(
        ordinal: usize,
        rg: format::RowGroup,
        schema: &SchemaDescriptor,
    ) -> Result<Self> {
        if rg.columns.len() != schema.num_columns() {
            return Err(PqError::new(
                ErrorKind::CorruptFooter,
                "Row group column count doesn't match the schema",
            )
            .with_field("row_group", ordinal)
            .with_field("columns", rg.columns.len())
            .with_field("schema_columns", schema.num_columns()));
        }

        let columns = rg
            .columns
            .into_iter()
            .zip(schema.columns())
            .map(|(chunk, descr)| ColumnChunkMetaData::try_from_thrift(chunk, descr.clone()))
            .collect::<Result<Vec<_>>>()
            .map_err(|e| e.with_field("row_group", ordinal))?;

        Ok(RowGroupMetaData {
            ordinal,
            num_rows: non_negative(rg.num_rows, "num_rows")?,
            total_byte_size: non_negative(rg.total_byte_size, "total_byte_size")?,
            total_compressed_size: rg
                .total_compressed_size
                .map(|v| non_negative(v, "total_compressed_size"))
                .transpose()?,
            file_offset: rg
                .file_offset
                .map(|v| non_negative(v, "file_offset"))
                .transpose()?,
            columns,
        })
    }
}

/// Byte range within the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub offset: u64,
    pub len: usize,
}

impl ByteRange {
    pub fn end(&self) -> u64 {
        self.offset + self.len as u64
    }
}

#[derive(Debug, Clone)]
pub struct ColumnChunkMetaData {
    pub column: Arc<ColumnDescriptor>,
    /// Set when the chunk lives in a different file.
    pub file_path: Option<String>,
    pub file_offset: i64,
    pub physical_type: Type,
    pub encodings: Vec<Encoding>,
    pub codec: Compression,
    /// Number of values including nulls and repeated entries.
    pub num_values: u64,
    pub total_compressed_size: u64,
    pub total_uncompressed_size: u64,
    pub data_page_offset: u64,
    pub index_page_offset: Option<u64>,
    pub dictionary_page_offset: Option<u64>,
    pub statistics: Option<Statistics>,
    pub encoding_stats: Option<Vec<PageEncodingStats>>,
    pub key_value_metadata: Option<Vec<KeyValue>>,
    pub bloom_filter_offset: Option<u64>,
    pub bloom_filter_length: Option<usize>,
    pub offset_index: Option<ByteRange>,
    pub column_index: Option<ByteRange>,
}

impl ColumnChunkMetaData {
    /// Whether a dictionary page precedes the data pages.
    pub fn has_dictionary_page(&self) -> bool {
        self.dictionary_page_offset.is_some()
    }

    /// Byte range covering every page of the chunk.
    ///
    /// Starts at the dictionary page when there is one. Some writers record a
    /// zero dictionary offset for chunks without one, that case is ignored.
    pub fn byte_range(&self) -> ByteRange {
        let offset = match self.dictionary_page_offset {
            Some(dict) if dict > 0 && dict < self.data_page_offset => dict,
            _ => self.data_page_offset,
        };
        ByteRange {
            offset,
            len: self.total_compressed_size as usize,
        }
    }

    fn try_from_thrift(chunk: format::ColumnChunk, column: Arc<ColumnDescriptor>) -> Result<Self> {
        let meta = match chunk.meta_data {
            Some(meta) => meta,
            None if chunk.has_crypto_metadata => {
                return Err(PqError::new(
                    ErrorKind::UnsupportedVersion,
                    "Encrypted column chunks are not supported",
                )
                .with_field("column", &column.path));
            }
            None => {
                return Err(PqError::new(
                    ErrorKind::CorruptFooter,
                    "Column chunk is missing its metadata",
                )
                .with_field("column", &column.path));
            }
        };

        if meta.path_in_schema.as_slice() != column.path.parts() {
            return Err(PqError::new(
                ErrorKind::CorruptFooter,
                "Column chunk path doesn't match schema leaf",
            )
            .with_field("chunk_path", meta.path_in_schema.join("."))
            .with_field("schema_path", &column.path));
        }

        let physical_type =
            Type::try_from_thrift(meta.type_).map_err(|e| e.with_kind(ErrorKind::CorruptFooter))?;
        if physical_type != column.physical_type {
            return Err(PqError::new(
                ErrorKind::CorruptFooter,
                "Column chunk type doesn't match schema leaf",
            )
            .with_field("column", &column.path)
            .with_field("chunk_type", physical_type)
            .with_field("schema_type", column.physical_type));
        }

        let statistics = meta
            .statistics
            .as_ref()
            .map(|s| statistics::from_thrift(physical_type, column.type_length, s))
            .transpose()
            .map_err(|e| e.with_kind(ErrorKind::CorruptFooter))?;

        let range = |offset: Option<i64>, len: Option<i32>, name: &'static str| -> Result<Option<ByteRange>> {
            match (offset, len) {
                (Some(offset), Some(len)) => Ok(Some(ByteRange {
                    offset: non_negative(offset, name)?,
                    len: non_negative(len as i64, name)? as usize,
                })),
                _ => Ok(None),
            }
        };

        Ok(ColumnChunkMetaData {
            file_path: chunk.file_path,
            file_offset: chunk.file_offset,
            physical_type,
            encodings: meta.encodings.into_iter().map(Encoding::from_thrift).collect(),
            codec: Compression::from_thrift(meta.codec),
            num_values: non_negative(meta.num_values, "num_values")?,
            total_compressed_size: non_negative(meta.total_compressed_size, "total_compressed_size")?,
            total_uncompressed_size: non_negative(
                meta.total_uncompressed_size,
                "total_uncompressed_size",
            )?,
            data_page_offset: non_negative(meta.data_page_offset, "data_page_offset")?,
            index_page_offset: meta
                .index_page_offset
                .map(|v| non_negative(v, "index_page_offset"))
                .transpose()?,
            dictionary_page_offset: meta
                .dictionary_page_offset
                .map(|v| non_negative(v, "dictionary_page_offset"))
                .transpose()?,
            statistics,
            encoding_stats: meta.encoding_stats.map(|stats| {
                stats
                    .into_iter()
                    .map(|s| PageEncodingStats {
                        page_type: PageType::from_thrift(s.page_type),
                        encoding: Encoding::from_thrift(s.encoding),
                        count: s.count,
                    })
                    .collect()
            }),
            key_value_metadata: meta
                .key_value_metadata
                .map(|kvs| kvs.into_iter().map(KeyValue::from).collect()),
            bloom_filter_offset: meta
                .bloom_filter_offset
                .map(|v| non_negative(v, "bloom_filter_offset"))
                .transpose()?,
            bloom_filter_length: meta
                .bloom_filter_length
                .map(|v| non_negative(v as i64, "bloom_filter_length").map(|v| v as usize))
                .transpose()?,
            offset_index: range(
                chunk.offset_index_offset,
                chunk.offset_index_length,
                "offset_index",
            )?,
            column_index: range(
                chunk.column_index_offset,
                chunk.column_index_length,
                "column_index",
            )?,
            column,
        })
    }
}

fn non_negative(v: i64, field: &'static str) -> Result<u64> {
    if v < 0 {
        return Err(
            PqError::new(ErrorKind::CorruptFooter, "Negative value in file metadata")
                .with_field("field", field)
                .with_field("value", v),
        );
    }
    Ok(v as u64)
}
