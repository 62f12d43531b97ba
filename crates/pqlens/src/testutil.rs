//! In-memory file builder for tests.
//!
//! Writes just enough of the format to exercise the reader: plain and
//! dictionary encoded values, RLE levels, v1 and v2 data pages, optional
//! compression, page checksums, page indexes and bloom filters.

use std::cmp::Ordering;

use bytes::Bytes;
use thrift::protocol::{
    TCompactOutputProtocol,
    TFieldIdentifier,
    TListIdentifier,
    TOutputProtocol,
    TStructIdentifier,
    TType,
};

use crate::basic::{Compression, Repetition, Type};
use crate::bloom_filter::{BloomFilter, hash_value};
use crate::column::bitutil::num_required_bits;
use crate::format::{
    BloomFilterHeader,
    ColumnChunk,
    ColumnIndex,
    ColumnMetaData,
    DataPageHeader,
    DataPageHeaderV2,
    DictionaryPageHeader,
    FileMetaData,
    KeyValue,
    OffsetIndex,
    PageHeader,
    PageLocation,
    RowGroup,
    SchemaElement,
    Statistics,
};
use crate::value::ScalarValue;

const ENCODING_PLAIN: i32 = 0;
const ENCODING_RLE: i32 = 3;
const ENCODING_RLE_DICTIONARY: i32 = 8;

const PAGE_DATA: i32 = 0;
const PAGE_DICTIONARY: i32 = 2;
const PAGE_DATA_V2: i32 = 3;

fn type_code(t: Type) -> i32 {
    match t {
        Type::BOOLEAN => 0,
        Type::INT32 => 1,
        Type::INT64 => 2,
        Type::INT96 => 3,
        Type::FLOAT => 4,
        Type::DOUBLE => 5,
        Type::BYTE_ARRAY => 6,
        Type::FIXED_LEN_BYTE_ARRAY => 7,
    }
}

fn repetition_code(r: Repetition) -> i32 {
    match r {
        Repetition::REQUIRED => 0,
        Repetition::OPTIONAL => 1,
        Repetition::REPEATED => 2,
    }
}

fn codec_code(c: Compression) -> i32 {
    match c {
        Compression::UNCOMPRESSED => 0,
        Compression::SNAPPY => 1,
        Compression::GZIP => 2,
        other => panic!("test writer doesn't support {other}"),
    }
}

/// A leaf column to write.
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub path: Vec<String>,
    pub physical_type: Type,
    pub type_length: Option<i32>,
    pub repetition: Repetition,
    pub converted_type: Option<i32>,
    pub max_def_level: i16,
    pub max_rep_level: i16,
}

impl ColumnSpec {
    pub fn new(name: &str, physical_type: Type, repetition: Repetition) -> Self {
        let (max_def_level, max_rep_level) = match repetition {
            Repetition::REQUIRED => (0, 0),
            Repetition::OPTIONAL => (1, 0),
            Repetition::REPEATED => (1, 1),
        };
        ColumnSpec {
            path: vec![name.to_string()],
            physical_type,
            type_length: None,
            repetition,
            converted_type: None,
            max_def_level,
            max_rep_level,
        }
    }

    /// Leaf somewhere below the root. The schema has to be provided
    /// separately with [`TestFileBuilder::schema`].
    pub fn nested(path: &[&str], physical_type: Type, max_def_level: i16, max_rep_level: i16) -> Self {
        ColumnSpec {
            path: path.iter().map(|s| s.to_string()).collect(),
            physical_type,
            type_length: None,
            repetition: Repetition::OPTIONAL,
            converted_type: None,
            max_def_level,
            max_rep_level,
        }
    }

    pub fn required_int64(name: &str) -> Self {
        Self::new(name, Type::INT64, Repetition::REQUIRED)
    }

    pub fn optional_int64(name: &str) -> Self {
        Self::new(name, Type::INT64, Repetition::OPTIONAL)
    }

    pub fn required_int32(name: &str) -> Self {
        Self::new(name, Type::INT32, Repetition::REQUIRED)
    }

    pub fn required_bool(name: &str) -> Self {
        Self::new(name, Type::BOOLEAN, Repetition::REQUIRED)
    }

    pub fn required_double(name: &str) -> Self {
        Self::new(name, Type::DOUBLE, Repetition::REQUIRED)
    }

    pub fn optional_string(name: &str) -> Self {
        let mut spec = Self::new(name, Type::BYTE_ARRAY, Repetition::OPTIONAL);
        spec.converted_type = Some(0);
        spec
    }

    fn schema_element(&self) -> SchemaElement {
        SchemaElement {
            name: self.path.last().cloned().unwrap_or_default(),
            type_: Some(type_code(self.physical_type)),
            type_length: self.type_length,
            repetition_type: Some(repetition_code(self.repetition)),
            converted_type: self.converted_type,
            ..Default::default()
        }
    }
}

/// Values and levels for one column chunk.
#[derive(Debug, Clone, Default)]
pub struct ChunkData {
    /// Non-null values in order.
    pub values: Vec<ScalarValue>,
    pub def_levels: Option<Vec<i16>>,
    pub rep_levels: Option<Vec<i16>>,
}

impl ChunkData {
    pub fn with_levels(
        values: Vec<ScalarValue>,
        def_levels: Option<Vec<i16>>,
        rep_levels: Option<Vec<i16>>,
    ) -> Self {
        ChunkData {
            values,
            def_levels,
            rep_levels,
        }
    }

    fn optional(values: Vec<Option<ScalarValue>>) -> Self {
        let def_levels = values.iter().map(|v| v.is_some() as i16).collect();
        ChunkData {
            values: values.into_iter().flatten().collect(),
            def_levels: Some(def_levels),
            rep_levels: None,
        }
    }

    pub fn num_levels(&self) -> usize {
        self.def_levels
            .as_ref()
            .or(self.rep_levels.as_ref())
            .map(|l| l.len())
            .unwrap_or(self.values.len())
    }

    pub fn num_rows(&self) -> usize {
        match &self.rep_levels {
            Some(levels) => levels.iter().filter(|&&l| l == 0).count(),
            None => self.num_levels(),
        }
    }
}

impl From<Vec<i64>> for ChunkData {
    fn from(values: Vec<i64>) -> Self {
        ChunkData {
            values: values.into_iter().map(ScalarValue::Int64).collect(),
            ..Default::default()
        }
    }
}

impl From<Vec<Option<i64>>> for ChunkData {
    fn from(values: Vec<Option<i64>>) -> Self {
        Self::optional(values.into_iter().map(|v| v.map(ScalarValue::Int64)).collect())
    }
}

impl From<Vec<i32>> for ChunkData {
    fn from(values: Vec<i32>) -> Self {
        ChunkData {
            values: values.into_iter().map(ScalarValue::Int32).collect(),
            ..Default::default()
        }
    }
}

impl From<Vec<bool>> for ChunkData {
    fn from(values: Vec<bool>) -> Self {
        ChunkData {
            values: values.into_iter().map(ScalarValue::Boolean).collect(),
            ..Default::default()
        }
    }
}

impl From<Vec<f64>> for ChunkData {
    fn from(values: Vec<f64>) -> Self {
        ChunkData {
            values: values.into_iter().map(ScalarValue::Double).collect(),
            ..Default::default()
        }
    }
}

impl From<Vec<Option<&str>>> for ChunkData {
    fn from(values: Vec<Option<&str>>) -> Self {
        Self::optional(
            values
                .into_iter()
                .map(|v| v.map(|s| ScalarValue::ByteArray(Bytes::copy_from_slice(s.as_bytes()))))
                .collect(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct WriteOptions {
    pub dictionary: bool,
    pub data_page_v2: bool,
    pub compression: Compression,
    pub values_per_page: Option<usize>,
    pub crc: bool,
    pub page_index: bool,
    pub bloom_filter: bool,
    pub page_statistics: bool,
    pub file_path: Option<String>,
    /// Encoding written into data page headers in place of the real one.
    /// The value bytes are still PLAIN or dictionary indices.
    pub header_encoding: Option<i32>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            dictionary: false,
            data_page_v2: false,
            compression: Compression::UNCOMPRESSED,
            values_per_page: None,
            crc: false,
            page_index: false,
            bloom_filter: false,
            page_statistics: true,
            file_path: None,
            header_encoding: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TestFileBuilder {
    version: i32,
    columns: Vec<ColumnSpec>,
    schema: Option<Vec<SchemaElement>>,
    row_groups: Vec<Vec<ChunkData>>,
    options: WriteOptions,
    key_value_metadata: Option<Vec<KeyValue>>,
    created_by: Option<String>,
    num_rows: Option<i64>,
}

impl Default for TestFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestFileBuilder {
    pub fn new() -> Self {
        TestFileBuilder {
            version: 1,
            columns: Vec::new(),
            schema: None,
            row_groups: Vec::new(),
            options: WriteOptions::default(),
            key_value_metadata: None,
            created_by: Some("pqlens testutil".to_string()),
            num_rows: None,
        }
    }

    pub fn version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }

    pub fn column(mut self, spec: ColumnSpec) -> Self {
        self.columns.push(spec);
        self
    }

    /// Use an explicit schema instead of one derived from the column specs.
    pub fn schema(mut self, elements: Vec<SchemaElement>) -> Self {
        self.schema = Some(elements);
        self
    }

    /// Add a row group with one chunk per column.
    pub fn row_group(mut self, chunks: Vec<ChunkData>) -> Self {
        self.row_groups.push(chunks);
        self
    }

    pub fn options(mut self, options: WriteOptions) -> Self {
        self.options = options;
        self
    }

    pub fn dictionary(mut self) -> Self {
        self.options.dictionary = true;
        self
    }

    pub fn data_page_v2(mut self) -> Self {
        self.options.data_page_v2 = true;
        self
    }

    pub fn compression(mut self, compression: Compression) -> Self {
        self.options.compression = compression;
        self
    }

    pub fn values_per_page(mut self, n: usize) -> Self {
        self.options.values_per_page = Some(n);
        self
    }

    pub fn with_crc(mut self) -> Self {
        self.options.crc = true;
        self
    }

    pub fn page_index(mut self) -> Self {
        self.options.page_index = true;
        self
    }

    pub fn header_encoding(mut self, encoding: i32) -> Self {
        self.options.header_encoding = Some(encoding);
        self
    }

    pub fn bloom_filter(mut self) -> Self {
        self.options.bloom_filter = true;
        self
    }

    pub fn key_value(mut self, key: &str, value: &str) -> Self {
        self.key_value_metadata
            .get_or_insert_with(Vec::new)
            .push(KeyValue {
                key: key.to_string(),
                value: Some(value.to_string()),
            });
        self
    }

    /// Override the file row count written to the footer.
    pub fn num_rows(mut self, n: i64) -> Self {
        self.num_rows = Some(n);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = b"PAR1".to_vec();

        let mut row_groups = Vec::with_capacity(self.row_groups.len());
        let mut extras = Vec::new();
        for (ordinal, chunks) in self.row_groups.iter().enumerate() {
            assert_eq!(self.columns.len(), chunks.len(), "one chunk per column");

            let rg_start = out.len() as i64;
            let mut columns = Vec::with_capacity(chunks.len());
            let mut total_byte_size = 0;
            for (spec, data) in self.columns.iter().zip(chunks) {
                let written = write_chunk(&mut out, spec, data, &self.options);
                total_byte_size += written.uncompressed_size;
                columns.push(written.chunk);
                extras.push((ordinal, columns.len() - 1, written.page_index, written.bloom));
            }

            row_groups.push(RowGroup {
                columns,
                total_byte_size,
                num_rows: chunks.first().map(|c| c.num_rows()).unwrap_or(0) as i64,
                file_offset: Some(rg_start),
                total_compressed_size: Some(out.len() as i64 - rg_start),
                ordinal: Some(ordinal as i16),
            });
        }

        // Bloom filters, then column indexes, then offset indexes.
        for (rg, col, _, bloom) in &extras {
            if let Some(filter) = bloom {
                let offset = out.len();
                let header = BloomFilterHeader {
                    num_bytes: filter.num_bytes() as i32,
                    algorithm: Some(1),
                    hash: Some(1),
                    compression: Some(1),
                };
                out.extend_from_slice(&to_thrift(&header));
                out.extend_from_slice(&filter.to_bitset());

                let meta = row_groups[*rg].columns[*col].meta_data.as_mut().unwrap();
                meta.bloom_filter_offset = Some(offset as i64);
                meta.bloom_filter_length = Some((out.len() - offset) as i32);
            }
        }
        for (rg, col, index, _) in &extras {
            if let Some((column_index, _)) = index {
                let offset = out.len();
                out.extend_from_slice(&to_thrift(column_index));
                let chunk = &mut row_groups[*rg].columns[*col];
                chunk.column_index_offset = Some(offset as i64);
                chunk.column_index_length = Some((out.len() - offset) as i32);
            }
        }
        for (rg, col, index, _) in &extras {
            if let Some((_, offset_index)) = index {
                let offset = out.len();
                out.extend_from_slice(&to_thrift(offset_index));
                let chunk = &mut row_groups[*rg].columns[*col];
                chunk.offset_index_offset = Some(offset as i64);
                chunk.offset_index_length = Some((out.len() - offset) as i32);
            }
        }

        let schema = match &self.schema {
            Some(schema) => schema.clone(),
            None => {
                let mut elements = vec![SchemaElement {
                    name: "schema".to_string(),
                    num_children: Some(self.columns.len() as i32),
                    ..Default::default()
                }];
                elements.extend(self.columns.iter().map(|c| c.schema_element()));
                elements
            }
        };

        let num_rows = self
            .num_rows
            .unwrap_or_else(|| row_groups.iter().map(|rg| rg.num_rows).sum());
        let metadata = FileMetaData {
            version: self.version,
            schema,
            num_rows,
            row_groups,
            key_value_metadata: self.key_value_metadata.clone(),
            created_by: self.created_by.clone(),
            has_encryption_algorithm: false,
        };

        let footer = to_thrift(&metadata);
        out.extend_from_slice(&footer);
        out.extend_from_slice(&(footer.len() as u32).to_le_bytes());
        out.extend_from_slice(b"PAR1");
        out
    }
}

struct WrittenChunk {
    chunk: ColumnChunk,
    uncompressed_size: i64,
    page_index: Option<(ColumnIndex, OffsetIndex)>,
    bloom: Option<BloomFilter>,
}

fn write_chunk(out: &mut Vec<u8>, spec: &ColumnSpec, data: &ChunkData, opts: &WriteOptions) -> WrittenChunk {
    let start = out.len();
    let mut uncompressed_size = 0i64;
    let mut encodings = vec![ENCODING_PLAIN, ENCODING_RLE];

    let dictionary = if opts.dictionary {
        let mut dict: Vec<ScalarValue> = Vec::new();
        for v in &data.values {
            if !dict.contains(v) {
                dict.push(v.clone());
            }
        }

        let body = encode_plain(&dict);
        let compressed = compress(opts.compression, &body);
        let header = PageHeader {
            type_: PAGE_DICTIONARY,
            uncompressed_page_size: body.len() as i32,
            compressed_page_size: compressed.len() as i32,
            crc: opts.crc.then(|| crc32(&compressed)),
            dictionary_page_header: Some(DictionaryPageHeader {
                num_values: dict.len() as i32,
                encoding: ENCODING_PLAIN,
                is_sorted: Some(false),
            }),
            ..Default::default()
        };
        let header = to_thrift(&header);
        uncompressed_size += (header.len() + body.len()) as i64;
        out.extend_from_slice(&header);
        out.extend_from_slice(&compressed);
        encodings.push(ENCODING_RLE_DICTIONARY);
        Some(dict)
    } else {
        None
    };

    let data_page_offset = out.len();
    let num_levels = data.num_levels();
    let per_page = opts.values_per_page.unwrap_or(num_levels).max(1);

    let mut column_index = ColumnIndex {
        boundary_order: 0,
        null_counts: Some(Vec::new()),
        ..Default::default()
    };
    let mut offset_index = OffsetIndex::default();

    let mut value_idx = 0;
    let mut rows_before = 0i64;
    let mut level_start = 0;
    while level_start < num_levels {
        let level_end = (level_start + per_page).min(num_levels);
        let count = level_end - level_start;

        let defs = data.def_levels.as_ref().map(|l| &l[level_start..level_end]);
        let reps = data.rep_levels.as_ref().map(|l| &l[level_start..level_end]);
        let non_null = match defs {
            Some(defs) => defs.iter().filter(|&&d| d == spec.max_def_level).count(),
            None => count,
        };
        let null_count = count - non_null;
        let values = &data.values[value_idx..value_idx + non_null];
        value_idx += non_null;
        let num_rows = match reps {
            Some(reps) => reps.iter().filter(|&&r| r == 0).count(),
            None => count,
        };

        let rep_bytes = match reps {
            Some(reps) if spec.max_rep_level > 0 => encode_levels(reps, spec.max_rep_level),
            _ => Vec::new(),
        };
        let def_bytes = match defs {
            Some(defs) if spec.max_def_level > 0 => encode_levels(defs, spec.max_def_level),
            _ => Vec::new(),
        };

        let (encoding, value_bytes) = match &dictionary {
            Some(dict) => (ENCODING_RLE_DICTIONARY, encode_dictionary_indices(dict, values)),
            None => (ENCODING_PLAIN, encode_plain(values)),
        };
        let encoding = opts.header_encoding.unwrap_or(encoding);

        let statistics = opts.page_statistics.then(|| Statistics {
            null_count: Some(null_count as i64),
            ..Default::default()
        });

        let (header, body, page_uncompressed) = if opts.data_page_v2 {
            let compressed_values = compress(opts.compression, &value_bytes);
            let mut body = rep_bytes.clone();
            body.extend_from_slice(&def_bytes);
            body.extend_from_slice(&compressed_values);
            let uncompressed = rep_bytes.len() + def_bytes.len() + value_bytes.len();
            let header = PageHeader {
                type_: PAGE_DATA_V2,
                uncompressed_page_size: uncompressed as i32,
                compressed_page_size: body.len() as i32,
                crc: opts.crc.then(|| crc32(&body)),
                data_page_header_v2: Some(DataPageHeaderV2 {
                    num_values: count as i32,
                    num_nulls: null_count as i32,
                    num_rows: num_rows as i32,
                    encoding,
                    definition_levels_byte_length: def_bytes.len() as i32,
                    repetition_levels_byte_length: rep_bytes.len() as i32,
                    is_compressed: Some(opts.compression != Compression::UNCOMPRESSED),
                    statistics,
                }),
                ..Default::default()
            };
            (header, body, uncompressed)
        } else {
            let mut raw = Vec::new();
            if spec.max_rep_level > 0 {
                raw.extend_from_slice(&(rep_bytes.len() as u32).to_le_bytes());
                raw.extend_from_slice(&rep_bytes);
            }
            if spec.max_def_level > 0 {
                raw.extend_from_slice(&(def_bytes.len() as u32).to_le_bytes());
                raw.extend_from_slice(&def_bytes);
            }
            raw.extend_from_slice(&value_bytes);
            let body = compress(opts.compression, &raw);
            let header = PageHeader {
                type_: PAGE_DATA,
                uncompressed_page_size: raw.len() as i32,
                compressed_page_size: body.len() as i32,
                crc: opts.crc.then(|| crc32(&body)),
                data_page_header: Some(DataPageHeader {
                    num_values: count as i32,
                    encoding,
                    definition_level_encoding: ENCODING_RLE,
                    repetition_level_encoding: ENCODING_RLE,
                    statistics,
                }),
                ..Default::default()
            };
            (header, body, raw.len())
        };

        let page_offset = out.len();
        let header = to_thrift(&header);
        out.extend_from_slice(&header);
        out.extend_from_slice(&body);
        uncompressed_size += (header.len() + page_uncompressed) as i64;

        offset_index.page_locations.push(PageLocation {
            offset: page_offset as i64,
            compressed_page_size: (header.len() + body.len()) as i32,
            first_row_index: rows_before,
        });
        let bounds = min_max(values);
        column_index.null_pages.push(bounds.is_none());
        let (min, max) = bounds
            .map(|(min, max)| (min.plain_bytes(), max.plain_bytes()))
            .unwrap_or_default();
        column_index.min_values.push(min);
        column_index.max_values.push(max);
        if let Some(counts) = column_index.null_counts.as_mut() {
            counts.push(null_count as i64);
        }

        rows_before += num_rows as i64;
        level_start = level_end;
    }

    let chunk_stats = min_max(&data.values).map(|(min, max)| Statistics {
        min_value: Some(min.plain_bytes()),
        max_value: Some(max.plain_bytes()),
        null_count: Some((num_levels - data.values.len()) as i64),
        ..Default::default()
    });

    let bloom = opts.bloom_filter.then(|| {
        let mut filter = BloomFilter::with_num_blocks(4);
        for v in &data.values {
            filter.insert_hash(hash_value(v));
        }
        filter
    });

    let meta = ColumnMetaData {
        type_: type_code(spec.physical_type),
        encodings,
        path_in_schema: spec.path.clone(),
        codec: codec_code(opts.compression),
        num_values: num_levels as i64,
        total_uncompressed_size: uncompressed_size,
        total_compressed_size: (out.len() - start) as i64,
        data_page_offset: data_page_offset as i64,
        dictionary_page_offset: dictionary.as_ref().map(|_| start as i64),
        statistics: chunk_stats,
        ..Default::default()
    };

    WrittenChunk {
        chunk: ColumnChunk {
            file_path: opts.file_path.clone(),
            file_offset: out.len() as i64,
            meta_data: Some(meta),
            ..Default::default()
        },
        uncompressed_size,
        page_index: opts.page_index.then_some((column_index, offset_index)),
        bloom,
    }
}

fn compare(a: &ScalarValue, b: &ScalarValue) -> Option<Ordering> {
    match (a, b) {
        (ScalarValue::Boolean(a), ScalarValue::Boolean(b)) => Some(a.cmp(b)),
        (ScalarValue::Int32(a), ScalarValue::Int32(b)) => Some(a.cmp(b)),
        (ScalarValue::Int64(a), ScalarValue::Int64(b)) => Some(a.cmp(b)),
        (ScalarValue::Float(a), ScalarValue::Float(b)) => a.partial_cmp(b),
        (ScalarValue::Double(a), ScalarValue::Double(b)) => a.partial_cmp(b),
        (ScalarValue::ByteArray(a), ScalarValue::ByteArray(b))
        | (ScalarValue::FixedLenByteArray(a), ScalarValue::FixedLenByteArray(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn min_max(values: &[ScalarValue]) -> Option<(ScalarValue, ScalarValue)> {
    let mut iter = values.iter();
    let first = iter.next()?;
    let mut min = first;
    let mut max = first;
    for v in iter {
        if compare(v, min) == Some(Ordering::Less) {
            min = v;
        }
        if compare(v, max) == Some(Ordering::Greater) {
            max = v;
        }
    }
    Some((min.clone(), max.clone()))
}

pub fn encode_plain(values: &[ScalarValue]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut bits = Vec::new();
    for v in values {
        match v {
            ScalarValue::Boolean(b) => bits.push(*b),
            ScalarValue::ByteArray(b) => {
                out.extend_from_slice(&(b.len() as u32).to_le_bytes());
                out.extend_from_slice(b);
            }
            other => out.extend_from_slice(&other.plain_bytes()),
        }
    }
    if !bits.is_empty() {
        let mut packed = vec![0u8; bits.len().div_ceil(8)];
        for (i, bit) in bits.into_iter().enumerate() {
            if bit {
                packed[i / 8] |= 1 << (i % 8);
            }
        }
        out.extend_from_slice(&packed);
    }
    out
}

fn write_vlq(out: &mut Vec<u8>, mut v: u64) {
    while v >= 0x80 {
        out.push((v as u8 & 0x7F) | 0x80);
        v >>= 7;
    }
    out.push(v as u8);
}

/// Encode values as a sequence of RLE runs.
pub fn encode_rle(values: &[u64], bit_width: u8) -> Vec<u8> {
    let byte_width = (bit_width as usize).div_ceil(8);
    let mut out = Vec::new();
    let mut i = 0;
    while i < values.len() {
        let v = values[i];
        let mut run = 1;
        while i + run < values.len() && values[i + run] == v {
            run += 1;
        }
        write_vlq(&mut out, (run as u64) << 1);
        out.extend_from_slice(&v.to_le_bytes()[..byte_width]);
        i += run;
    }
    out
}

pub fn encode_levels(levels: &[i16], max: i16) -> Vec<u8> {
    let levels: Vec<u64> = levels.iter().map(|&l| l as u64).collect();
    encode_rle(&levels, num_required_bits(max as u64))
}

fn encode_dictionary_indices(dict: &[ScalarValue], values: &[ScalarValue]) -> Vec<u8> {
    let bit_width = num_required_bits(dict.len().saturating_sub(1) as u64).max(1);
    let indices: Vec<u64> = values
        .iter()
        .map(|v| dict.iter().position(|d| d == v).unwrap() as u64)
        .collect();
    let mut out = vec![bit_width];
    out.extend_from_slice(&encode_rle(&indices, bit_width));
    out
}

fn compress(codec: Compression, data: &[u8]) -> Vec<u8> {
    match codec {
        Compression::UNCOMPRESSED => data.to_vec(),
        Compression::SNAPPY => snap::raw::Encoder::new().compress_vec(data).unwrap(),
        Compression::GZIP => {
            use std::io::Write;
            let mut enc =
                flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
            enc.write_all(data).unwrap();
            enc.finish().unwrap()
        }
        other => panic!("test writer doesn't support {other}"),
    }
}

fn crc32(data: &[u8]) -> i32 {
    let mut crc = flate2::Crc::new();
    crc.update(data);
    crc.sum() as i32
}

/// Serialize with the compact protocol.
pub fn to_thrift<T: WriteThrift>(v: &T) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut prot = TCompactOutputProtocol::new(&mut buf);
        v.write(&mut prot).unwrap();
        prot.flush().unwrap();
    }
    buf
}

pub trait WriteThrift {
    fn write(&self, o: &mut dyn TOutputProtocol) -> thrift::Result<()>;
}

fn begin_struct(o: &mut dyn TOutputProtocol) -> thrift::Result<()> {
    o.write_struct_begin(&TStructIdentifier::new("s"))
}

fn end_struct(o: &mut dyn TOutputProtocol) -> thrift::Result<()> {
    o.write_field_stop()?;
    o.write_struct_end()
}

fn field(o: &mut dyn TOutputProtocol, id: i16, ty: TType) -> thrift::Result<()> {
    o.write_field_begin(&TFieldIdentifier::new("f", ty, id))
}

fn i32_field(o: &mut dyn TOutputProtocol, id: i16, v: i32) -> thrift::Result<()> {
    field(o, id, TType::I32)?;
    o.write_i32(v)?;
    o.write_field_end()
}

fn i64_field(o: &mut dyn TOutputProtocol, id: i16, v: i64) -> thrift::Result<()> {
    field(o, id, TType::I64)?;
    o.write_i64(v)?;
    o.write_field_end()
}

fn bool_field(o: &mut dyn TOutputProtocol, id: i16, v: bool) -> thrift::Result<()> {
    field(o, id, TType::Bool)?;
    o.write_bool(v)?;
    o.write_field_end()
}

fn string_field(o: &mut dyn TOutputProtocol, id: i16, v: &str) -> thrift::Result<()> {
    field(o, id, TType::String)?;
    o.write_string(v)?;
    o.write_field_end()
}

fn bytes_field(o: &mut dyn TOutputProtocol, id: i16, v: &[u8]) -> thrift::Result<()> {
    field(o, id, TType::String)?;
    o.write_bytes(v)?;
    o.write_field_end()
}

fn struct_field<T: WriteThrift>(o: &mut dyn TOutputProtocol, id: i16, v: &T) -> thrift::Result<()> {
    field(o, id, TType::Struct)?;
    v.write(o)?;
    o.write_field_end()
}

fn list_field<T>(
    o: &mut dyn TOutputProtocol,
    id: i16,
    elem: TType,
    items: &[T],
    mut f: impl FnMut(&mut dyn TOutputProtocol, &T) -> thrift::Result<()>,
) -> thrift::Result<()> {
    field(o, id, TType::List)?;
    o.write_list_begin(&TListIdentifier::new(elem, items.len() as i32))?;
    for item in items {
        f(o, item)?;
    }
    o.write_list_end()?;
    o.write_field_end()
}

/// Union with a single empty struct variant.
struct EmptyVariant;

impl WriteThrift for EmptyVariant {
    fn write(&self, o: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        begin_struct(o)?;
        end_struct(o)
    }
}

fn union_field(o: &mut dyn TOutputProtocol, id: i16, variant: Option<i16>) -> thrift::Result<()> {
    if let Some(variant) = variant {
        field(o, id, TType::Struct)?;
        begin_struct(o)?;
        struct_field(o, variant, &EmptyVariant)?;
        end_struct(o)?;
        o.write_field_end()?;
    }
    Ok(())
}

impl WriteThrift for KeyValue {
    fn write(&self, o: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        begin_struct(o)?;
        string_field(o, 1, &self.key)?;
        if let Some(v) = &self.value {
            string_field(o, 2, v)?;
        }
        end_struct(o)
    }
}

impl WriteThrift for Statistics {
    fn write(&self, o: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        begin_struct(o)?;
        if let Some(v) = &self.max {
            bytes_field(o, 1, v)?;
        }
        if let Some(v) = &self.min {
            bytes_field(o, 2, v)?;
        }
        if let Some(v) = self.null_count {
            i64_field(o, 3, v)?;
        }
        if let Some(v) = self.distinct_count {
            i64_field(o, 4, v)?;
        }
        if let Some(v) = &self.max_value {
            bytes_field(o, 5, v)?;
        }
        if let Some(v) = &self.min_value {
            bytes_field(o, 6, v)?;
        }
        if let Some(v) = self.is_max_value_exact {
            bool_field(o, 7, v)?;
        }
        if let Some(v) = self.is_min_value_exact {
            bool_field(o, 8, v)?;
        }
        end_struct(o)
    }
}

impl WriteThrift for SchemaElement {
    fn write(&self, o: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        begin_struct(o)?;
        let ints = [
            (1, self.type_),
            (2, self.type_length),
            (3, self.repetition_type),
        ];
        for (id, v) in ints {
            if let Some(v) = v {
                i32_field(o, id, v)?;
            }
        }
        string_field(o, 4, &self.name)?;
        let ints = [
            (5, self.num_children),
            (6, self.converted_type),
            (7, self.scale),
            (8, self.precision),
            (9, self.field_id),
        ];
        for (id, v) in ints {
            if let Some(v) = v {
                i32_field(o, id, v)?;
            }
        }
        end_struct(o)
    }
}

impl WriteThrift for ColumnMetaData {
    fn write(&self, o: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        begin_struct(o)?;
        i32_field(o, 1, self.type_)?;
        list_field(o, 2, TType::I32, &self.encodings, |o, v| o.write_i32(*v))?;
        list_field(o, 3, TType::String, &self.path_in_schema, |o, v| o.write_string(v))?;
        i32_field(o, 4, self.codec)?;
        i64_field(o, 5, self.num_values)?;
        i64_field(o, 6, self.total_uncompressed_size)?;
        i64_field(o, 7, self.total_compressed_size)?;
        if let Some(kvs) = &self.key_value_metadata {
            list_field(o, 8, TType::Struct, kvs, |o, v| v.write(o))?;
        }
        i64_field(o, 9, self.data_page_offset)?;
        if let Some(v) = self.index_page_offset {
            i64_field(o, 10, v)?;
        }
        if let Some(v) = self.dictionary_page_offset {
            i64_field(o, 11, v)?;
        }
        if let Some(stats) = &self.statistics {
            struct_field(o, 12, stats)?;
        }
        if let Some(v) = self.bloom_filter_offset {
            i64_field(o, 14, v)?;
        }
        if let Some(v) = self.bloom_filter_length {
            i32_field(o, 15, v)?;
        }
        end_struct(o)
    }
}

impl WriteThrift for ColumnChunk {
    fn write(&self, o: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        begin_struct(o)?;
        if let Some(path) = &self.file_path {
            string_field(o, 1, path)?;
        }
        i64_field(o, 2, self.file_offset)?;
        if let Some(meta) = &self.meta_data {
            struct_field(o, 3, meta)?;
        }
        if let Some(v) = self.offset_index_offset {
            i64_field(o, 4, v)?;
        }
        if let Some(v) = self.offset_index_length {
            i32_field(o, 5, v)?;
        }
        if let Some(v) = self.column_index_offset {
            i64_field(o, 6, v)?;
        }
        if let Some(v) = self.column_index_length {
            i32_field(o, 7, v)?;
        }
        end_struct(o)
    }
}

impl WriteThrift for RowGroup {
    fn write(&self, o: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        begin_struct(o)?;
        list_field(o, 1, TType::Struct, &self.columns, |o, v| v.write(o))?;
        i64_field(o, 2, self.total_byte_size)?;
        i64_field(o, 3, self.num_rows)?;
        if let Some(v) = self.file_offset {
            i64_field(o, 5, v)?;
        }
        if let Some(v) = self.total_compressed_size {
            i64_field(o, 6, v)?;
        }
        if let Some(v) = self.ordinal {
            field(o, 7, TType::I16)?;
            o.write_i16(v)?;
            o.write_field_end()?;
        }
        end_struct(o)
    }
}

impl WriteThrift for FileMetaData {
    fn write(&self, o: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        begin_struct(o)?;
        i32_field(o, 1, self.version)?;
        list_field(o, 2, TType::Struct, &self.schema, |o, v| v.write(o))?;
        i64_field(o, 3, self.num_rows)?;
        list_field(o, 4, TType::Struct, &self.row_groups, |o, v| v.write(o))?;
        if let Some(kvs) = &self.key_value_metadata {
            list_field(o, 5, TType::Struct, kvs, |o, v| v.write(o))?;
        }
        if let Some(v) = &self.created_by {
            string_field(o, 6, v)?;
        }
        end_struct(o)
    }
}

impl WriteThrift for DataPageHeader {
    fn write(&self, o: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        begin_struct(o)?;
        i32_field(o, 1, self.num_values)?;
        i32_field(o, 2, self.encoding)?;
        i32_field(o, 3, self.definition_level_encoding)?;
        i32_field(o, 4, self.repetition_level_encoding)?;
        if let Some(stats) = &self.statistics {
            struct_field(o, 5, stats)?;
        }
        end_struct(o)
    }
}

impl WriteThrift for DataPageHeaderV2 {
    fn write(&self, o: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        begin_struct(o)?;
        i32_field(o, 1, self.num_values)?;
        i32_field(o, 2, self.num_nulls)?;
        i32_field(o, 3, self.num_rows)?;
        i32_field(o, 4, self.encoding)?;
        i32_field(o, 5, self.definition_levels_byte_length)?;
        i32_field(o, 6, self.repetition_levels_byte_length)?;
        if let Some(v) = self.is_compressed {
            bool_field(o, 7, v)?;
        }
        if let Some(stats) = &self.statistics {
            struct_field(o, 8, stats)?;
        }
        end_struct(o)
    }
}

impl WriteThrift for DictionaryPageHeader {
    fn write(&self, o: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        begin_struct(o)?;
        i32_field(o, 1, self.num_values)?;
        i32_field(o, 2, self.encoding)?;
        if let Some(v) = self.is_sorted {
            bool_field(o, 3, v)?;
        }
        end_struct(o)
    }
}

impl WriteThrift for PageHeader {
    fn write(&self, o: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        begin_struct(o)?;
        i32_field(o, 1, self.type_)?;
        i32_field(o, 2, self.uncompressed_page_size)?;
        i32_field(o, 3, self.compressed_page_size)?;
        if let Some(v) = self.crc {
            i32_field(o, 4, v)?;
        }
        if let Some(h) = &self.data_page_header {
            struct_field(o, 5, h)?;
        }
        if let Some(h) = &self.dictionary_page_header {
            struct_field(o, 7, h)?;
        }
        if let Some(h) = &self.data_page_header_v2 {
            struct_field(o, 8, h)?;
        }
        end_struct(o)
    }
}

impl WriteThrift for ColumnIndex {
    fn write(&self, o: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        begin_struct(o)?;
        list_field(o, 1, TType::Bool, &self.null_pages, |o, v| o.write_bool(*v))?;
        list_field(o, 2, TType::String, &self.min_values, |o, v| o.write_bytes(v))?;
        list_field(o, 3, TType::String, &self.max_values, |o, v| o.write_bytes(v))?;
        i32_field(o, 4, self.boundary_order)?;
        if let Some(counts) = &self.null_counts {
            list_field(o, 5, TType::I64, counts, |o, v| o.write_i64(*v))?;
        }
        end_struct(o)
    }
}

impl WriteThrift for PageLocation {
    fn write(&self, o: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        begin_struct(o)?;
        i64_field(o, 1, self.offset)?;
        i32_field(o, 2, self.compressed_page_size)?;
        i64_field(o, 3, self.first_row_index)?;
        end_struct(o)
    }
}

impl WriteThrift for OffsetIndex {
    fn write(&self, o: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        begin_struct(o)?;
        list_field(o, 1, TType::Struct, &self.page_locations, |o, v| v.write(o))?;
        end_struct(o)
    }
}

impl WriteThrift for BloomFilterHeader {
    fn write(&self, o: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        begin_struct(o)?;
        i32_field(o, 1, self.num_bytes)?;
        union_field(o, 2, self.algorithm)?;
        union_field(o, 3, self.hash)?;
        union_field(o, 4, self.compression)?;
        end_struct(o)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::decode_from_slice;

    #[test]
    fn page_header_round_trip() {
        let header = PageHeader {
            type_: PAGE_DATA,
            uncompressed_page_size: 10,
            compressed_page_size: 8,
            crc: Some(-5),
            data_page_header: Some(DataPageHeader {
                num_values: 3,
                encoding: ENCODING_PLAIN,
                definition_level_encoding: ENCODING_RLE,
                repetition_level_encoding: ENCODING_RLE,
                statistics: Some(Statistics {
                    null_count: Some(1),
                    ..Default::default()
                }),
            }),
            ..Default::default()
        };
        let buf = to_thrift(&header);
        let (decoded, consumed) = decode_from_slice::<PageHeader>(&buf).unwrap();
        assert_eq!(buf.len(), consumed);
        assert_eq!(header, decoded);
    }

    #[test]
    fn bloom_header_round_trip() {
        let header = BloomFilterHeader {
            num_bytes: 64,
            algorithm: Some(1),
            hash: Some(1),
            compression: Some(1),
        };
        let buf = to_thrift(&header);
        let (decoded, _) = decode_from_slice::<BloomFilterHeader>(&buf).unwrap();
        assert_eq!(header, decoded);
    }
}
