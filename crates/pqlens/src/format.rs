// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Thrift structures from `parquet.thrift` needed for reading file structure.
//!
//! Only the read side is implemented. Fields this crate doesn't use are
//! skipped, as are fields whose wire type doesn't match the definition.

use thrift::protocol::{TCompactInputProtocol, TInputProtocol, TType};
use thrift::{ProtocolError, ProtocolErrorKind};

use crate::basic::{LogicalType, TimeUnit};

pub trait TSerializable: Sized {
    fn read_from_in_protocol(i: &mut dyn TInputProtocol) -> thrift::Result<Self>;
}

/// Decode a struct from the front of `buf`.
///
/// Returns the decoded value along with the number of bytes consumed.
pub fn decode_from_slice<T: TSerializable>(buf: &[u8]) -> thrift::Result<(T, usize)> {
    let mut remaining = buf;
    let mut prot = TCompactInputProtocol::new(&mut remaining);
    let value = T::read_from_in_protocol(&mut prot)?;
    drop(prot);
    Ok((value, buf.len() - remaining.len()))
}

fn invalid(msg: impl Into<String>) -> thrift::Error {
    thrift::Error::Protocol(ProtocolError::new(ProtocolErrorKind::InvalidData, msg))
}

fn required<T>(v: Option<T>, name: &'static str) -> thrift::Result<T> {
    v.ok_or_else(|| invalid(format!("missing required field '{name}'")))
}

/// Read a struct, handing every field to `f`.
///
/// `f` returns false for fields it doesn't handle, those get skipped.
fn read_struct(
    i: &mut dyn TInputProtocol,
    mut f: impl FnMut(&mut dyn TInputProtocol, i16, TType) -> thrift::Result<bool>,
) -> thrift::Result<()> {
    i.read_struct_begin()?;
    loop {
        let field = i.read_field_begin()?;
        if field.field_type == TType::Stop {
            break;
        }
        let handled = match field.id {
            Some(id) => f(i, id, field.field_type)?,
            None => false,
        };
        if !handled {
            i.skip(field.field_type)?;
        }
        i.read_field_end()?;
    }
    i.read_struct_end()
}

fn read_empty_struct(i: &mut dyn TInputProtocol) -> thrift::Result<()> {
    read_struct(i, |_, _, _| Ok(false))
}

fn read_list<T>(
    i: &mut dyn TInputProtocol,
    mut f: impl FnMut(&mut dyn TInputProtocol) -> thrift::Result<T>,
) -> thrift::Result<Vec<T>> {
    let ident = i.read_list_begin()?;
    if ident.size < 0 {
        return Err(invalid("negative list size"));
    }
    // Declared size comes from untrusted bytes.
    let mut out = Vec::with_capacity((ident.size as usize).min(1024));
    for _ in 0..ident.size {
        out.push(f(i)?);
    }
    i.read_list_end()?;
    Ok(out)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyValue {
    pub key: String,
    pub value: Option<String>,
}

impl TSerializable for KeyValue {
    fn read_from_in_protocol(i: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut key = None;
        let mut value = None;
        read_struct(i, |i, id, ty| {
            match (id, ty) {
                (1, TType::String) => key = Some(i.read_string()?),
                (2, TType::String) => value = Some(i.read_string()?),
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(KeyValue {
            key: required(key, "KeyValue.key")?,
            value,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statistics {
    pub max: Option<Vec<u8>>,
    pub min: Option<Vec<u8>>,
    pub null_count: Option<i64>,
    pub distinct_count: Option<i64>,
    pub max_value: Option<Vec<u8>>,
    pub min_value: Option<Vec<u8>>,
    pub is_max_value_exact: Option<bool>,
    pub is_min_value_exact: Option<bool>,
}

impl TSerializable for Statistics {
    fn read_from_in_protocol(i: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut stats = Statistics::default();
        read_struct(i, |i, id, ty| {
            match (id, ty) {
                (1, TType::String) => stats.max = Some(i.read_bytes()?),
                (2, TType::String) => stats.min = Some(i.read_bytes()?),
                (3, TType::I64) => stats.null_count = Some(i.read_i64()?),
                (4, TType::I64) => stats.distinct_count = Some(i.read_i64()?),
                (5, TType::String) => stats.max_value = Some(i.read_bytes()?),
                (6, TType::String) => stats.min_value = Some(i.read_bytes()?),
                (7, TType::Bool) => stats.is_max_value_exact = Some(i.read_bool()?),
                (8, TType::Bool) => stats.is_min_value_exact = Some(i.read_bool()?),
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(stats)
    }
}

fn read_time_unit(i: &mut dyn TInputProtocol) -> thrift::Result<Option<TimeUnit>> {
    let mut unit = None;
    read_struct(i, |i, id, ty| {
        if ty != TType::Struct {
            return Ok(false);
        }
        unit = match id {
            1 => Some(TimeUnit::Millis),
            2 => Some(TimeUnit::Micros),
            3 => Some(TimeUnit::Nanos),
            _ => return Ok(false),
        };
        read_empty_struct(i)?;
        Ok(true)
    })?;
    Ok(unit)
}

/// Reads a TimeType or TimestampType, they share the same layout.
fn read_time_like(i: &mut dyn TInputProtocol) -> thrift::Result<(bool, TimeUnit)> {
    let mut adjusted = None;
    let mut unit = None;
    read_struct(i, |i, id, ty| {
        match (id, ty) {
            (1, TType::Bool) => adjusted = Some(i.read_bool()?),
            (2, TType::Struct) => unit = read_time_unit(i)?,
            _ => return Ok(false),
        }
        Ok(true)
    })?;
    Ok((
        required(adjusted, "isAdjustedToUTC")?,
        required(unit, "TimeType.unit")?,
    ))
}

/// Reads the LogicalType union.
///
/// Variants this reader doesn't know about produce `None`.
fn read_logical_type(i: &mut dyn TInputProtocol) -> thrift::Result<Option<LogicalType>> {
    let mut logical = None;
    read_struct(i, |i, id, ty| {
        if ty != TType::Struct {
            return Ok(false);
        }
        logical = Some(match id {
            1 => simple(i, LogicalType::String)?,
            2 => simple(i, LogicalType::Map)?,
            3 => simple(i, LogicalType::List)?,
            4 => simple(i, LogicalType::Enum)?,
            5 => {
                let mut scale = None;
                let mut precision = None;
                read_struct(i, |i, id, ty| {
                    match (id, ty) {
                        (1, TType::I32) => scale = Some(i.read_i32()?),
                        (2, TType::I32) => precision = Some(i.read_i32()?),
                        _ => return Ok(false),
                    }
                    Ok(true)
                })?;
                LogicalType::Decimal {
                    scale: required(scale, "DecimalType.scale")?,
                    precision: required(precision, "DecimalType.precision")?,
                }
            }
            6 => simple(i, LogicalType::Date)?,
            7 => {
                let (is_adjusted_to_utc, unit) = read_time_like(i)?;
                LogicalType::Time {
                    is_adjusted_to_utc,
                    unit,
                }
            }
            8 => {
                let (is_adjusted_to_utc, unit) = read_time_like(i)?;
                LogicalType::Timestamp {
                    is_adjusted_to_utc,
                    unit,
                }
            }
            10 => {
                let mut bit_width = None;
                let mut is_signed = None;
                read_struct(i, |i, id, ty| {
                    match (id, ty) {
                        (1, TType::I08) => bit_width = Some(i.read_i8()?),
                        (2, TType::Bool) => is_signed = Some(i.read_bool()?),
                        _ => return Ok(false),
                    }
                    Ok(true)
                })?;
                LogicalType::Integer {
                    bit_width: required(bit_width, "IntType.bitWidth")?,
                    is_signed: required(is_signed, "IntType.isSigned")?,
                }
            }
            11 => simple(i, LogicalType::Unknown)?,
            12 => simple(i, LogicalType::Json)?,
            13 => simple(i, LogicalType::Bson)?,
            14 => simple(i, LogicalType::Uuid)?,
            15 => simple(i, LogicalType::Float16)?,
            _ => return Ok(false),
        });
        Ok(true)
    })?;
    Ok(logical)
}

fn simple(i: &mut dyn TInputProtocol, logical: LogicalType) -> thrift::Result<LogicalType> {
    read_empty_struct(i)?;
    Ok(logical)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaElement {
    pub type_: Option<i32>,
    pub type_length: Option<i32>,
    pub repetition_type: Option<i32>,
    pub name: String,
    pub num_children: Option<i32>,
    pub converted_type: Option<i32>,
    pub scale: Option<i32>,
    pub precision: Option<i32>,
    pub field_id: Option<i32>,
    pub logical_type: Option<LogicalType>,
}

impl TSerializable for SchemaElement {
    fn read_from_in_protocol(i: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut el = SchemaElement::default();
        let mut name = None;
        read_struct(i, |i, id, ty| {
            match (id, ty) {
                (1, TType::I32) => el.type_ = Some(i.read_i32()?),
                (2, TType::I32) => el.type_length = Some(i.read_i32()?),
                (3, TType::I32) => el.repetition_type = Some(i.read_i32()?),
                (4, TType::String) => name = Some(i.read_string()?),
                (5, TType::I32) => el.num_children = Some(i.read_i32()?),
                (6, TType::I32) => el.converted_type = Some(i.read_i32()?),
                (7, TType::I32) => el.scale = Some(i.read_i32()?),
                (8, TType::I32) => el.precision = Some(i.read_i32()?),
                (9, TType::I32) => el.field_id = Some(i.read_i32()?),
                (10, TType::Struct) => el.logical_type = read_logical_type(i)?,
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        el.name = required(name, "SchemaElement.name")?;
        Ok(el)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageEncodingStats {
    pub page_type: i32,
    pub encoding: i32,
    pub count: i32,
}

impl TSerializable for PageEncodingStats {
    fn read_from_in_protocol(i: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut page_type = None;
        let mut encoding = None;
        let mut count = None;
        read_struct(i, |i, id, ty| {
            match (id, ty) {
                (1, TType::I32) => page_type = Some(i.read_i32()?),
                (2, TType::I32) => encoding = Some(i.read_i32()?),
                (3, TType::I32) => count = Some(i.read_i32()?),
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(PageEncodingStats {
            page_type: required(page_type, "PageEncodingStats.page_type")?,
            encoding: required(encoding, "PageEncodingStats.encoding")?,
            count: required(count, "PageEncodingStats.count")?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMetaData {
    pub type_: i32,
    pub encodings: Vec<i32>,
    pub path_in_schema: Vec<String>,
    pub codec: i32,
    pub num_values: i64,
    pub total_uncompressed_size: i64,
    pub total_compressed_size: i64,
    pub key_value_metadata: Option<Vec<KeyValue>>,
    pub data_page_offset: i64,
    pub index_page_offset: Option<i64>,
    pub dictionary_page_offset: Option<i64>,
    pub statistics: Option<Statistics>,
    pub encoding_stats: Option<Vec<PageEncodingStats>>,
    pub bloom_filter_offset: Option<i64>,
    pub bloom_filter_length: Option<i32>,
}

impl TSerializable for ColumnMetaData {
    fn read_from_in_protocol(i: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut meta = ColumnMetaData::default();
        let mut type_ = None;
        let mut encodings = None;
        let mut path = None;
        let mut codec = None;
        let mut num_values = None;
        let mut uncompressed = None;
        let mut compressed = None;
        let mut data_page_offset = None;
        read_struct(i, |i, id, ty| {
            match (id, ty) {
                (1, TType::I32) => type_ = Some(i.read_i32()?),
                (2, TType::List) => encodings = Some(read_list(i, |i| i.read_i32())?),
                (3, TType::List) => path = Some(read_list(i, |i| i.read_string())?),
                (4, TType::I32) => codec = Some(i.read_i32()?),
                (5, TType::I64) => num_values = Some(i.read_i64()?),
                (6, TType::I64) => uncompressed = Some(i.read_i64()?),
                (7, TType::I64) => compressed = Some(i.read_i64()?),
                (8, TType::List) => {
                    meta.key_value_metadata =
                        Some(read_list(i, KeyValue::read_from_in_protocol)?)
                }
                (9, TType::I64) => data_page_offset = Some(i.read_i64()?),
                (10, TType::I64) => meta.index_page_offset = Some(i.read_i64()?),
                (11, TType::I64) => meta.dictionary_page_offset = Some(i.read_i64()?),
                (12, TType::Struct) => {
                    meta.statistics = Some(Statistics::read_from_in_protocol(i)?)
                }
                (13, TType::List) => {
                    meta.encoding_stats =
                        Some(read_list(i, PageEncodingStats::read_from_in_protocol)?)
                }
                (14, TType::I64) => meta.bloom_filter_offset = Some(i.read_i64()?),
                (15, TType::I32) => meta.bloom_filter_length = Some(i.read_i32()?),
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        meta.type_ = required(type_, "ColumnMetaData.type")?;
        meta.encodings = required(encodings, "ColumnMetaData.encodings")?;
        meta.path_in_schema = required(path, "ColumnMetaData.path_in_schema")?;
        meta.codec = required(codec, "ColumnMetaData.codec")?;
        meta.num_values = required(num_values, "ColumnMetaData.num_values")?;
        meta.total_uncompressed_size =
            required(uncompressed, "ColumnMetaData.total_uncompressed_size")?;
        meta.total_compressed_size = required(compressed, "ColumnMetaData.total_compressed_size")?;
        meta.data_page_offset = required(data_page_offset, "ColumnMetaData.data_page_offset")?;
        Ok(meta)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnChunk {
    pub file_path: Option<String>,
    pub file_offset: i64,
    pub meta_data: Option<ColumnMetaData>,
    pub offset_index_offset: Option<i64>,
    pub offset_index_length: Option<i32>,
    pub column_index_offset: Option<i64>,
    pub column_index_length: Option<i32>,
    /// Set when the column metadata is encrypted. Only presence is tracked.
    pub has_crypto_metadata: bool,
}

impl TSerializable for ColumnChunk {
    fn read_from_in_protocol(i: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut chunk = ColumnChunk::default();
        let mut file_offset = None;
        read_struct(i, |i, id, ty| {
            match (id, ty) {
                (1, TType::String) => chunk.file_path = Some(i.read_string()?),
                (2, TType::I64) => file_offset = Some(i.read_i64()?),
                (3, TType::Struct) => {
                    chunk.meta_data = Some(ColumnMetaData::read_from_in_protocol(i)?)
                }
                (4, TType::I64) => chunk.offset_index_offset = Some(i.read_i64()?),
                (5, TType::I32) => chunk.offset_index_length = Some(i.read_i32()?),
                (6, TType::I64) => chunk.column_index_offset = Some(i.read_i64()?),
                (7, TType::I32) => chunk.column_index_length = Some(i.read_i32()?),
                (8, _) | (9, _) => {
                    chunk.has_crypto_metadata = true;
                    return Ok(false);
                }
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        // Older writers omit this, it's unused for reading.
        chunk.file_offset = file_offset.unwrap_or(0);
        Ok(chunk)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowGroup {
    pub columns: Vec<ColumnChunk>,
    pub total_byte_size: i64,
    pub num_rows: i64,
    pub file_offset: Option<i64>,
    pub total_compressed_size: Option<i64>,
    pub ordinal: Option<i16>,
}

impl TSerializable for RowGroup {
    fn read_from_in_protocol(i: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut group = RowGroup::default();
        let mut columns = None;
        let mut total_byte_size = None;
        let mut num_rows = None;
        read_struct(i, |i, id, ty| {
            match (id, ty) {
                (1, TType::List) => {
                    columns = Some(read_list(i, ColumnChunk::read_from_in_protocol)?)
                }
                (2, TType::I64) => total_byte_size = Some(i.read_i64()?),
                (3, TType::I64) => num_rows = Some(i.read_i64()?),
                (5, TType::I64) => group.file_offset = Some(i.read_i64()?),
                (6, TType::I64) => group.total_compressed_size = Some(i.read_i64()?),
                (7, TType::I16) => group.ordinal = Some(i.read_i16()?),
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        group.columns = required(columns, "RowGroup.columns")?;
        group.total_byte_size = required(total_byte_size, "RowGroup.total_byte_size")?;
        group.num_rows = required(num_rows, "RowGroup.num_rows")?;
        Ok(group)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileMetaData {
    pub version: i32,
    pub schema: Vec<SchemaElement>,
    pub num_rows: i64,
    pub row_groups: Vec<RowGroup>,
    pub key_value_metadata: Option<Vec<KeyValue>>,
    pub created_by: Option<String>,
    /// Set when the file declares an encryption algorithm (plaintext footer
    /// mode). Only presence is tracked.
    pub has_encryption_algorithm: bool,
}

impl TSerializable for FileMetaData {
    fn read_from_in_protocol(i: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut meta = FileMetaData::default();
        let mut version = None;
        let mut schema = None;
        let mut num_rows = None;
        let mut row_groups = None;
        read_struct(i, |i, id, ty| {
            match (id, ty) {
                (1, TType::I32) => version = Some(i.read_i32()?),
                (2, TType::List) => {
                    schema = Some(read_list(i, SchemaElement::read_from_in_protocol)?)
                }
                (3, TType::I64) => num_rows = Some(i.read_i64()?),
                (4, TType::List) => {
                    row_groups = Some(read_list(i, RowGroup::read_from_in_protocol)?)
                }
                (5, TType::List) => {
                    meta.key_value_metadata =
                        Some(read_list(i, KeyValue::read_from_in_protocol)?)
                }
                (6, TType::String) => meta.created_by = Some(i.read_string()?),
                (8, _) => {
                    meta.has_encryption_algorithm = true;
                    return Ok(false);
                }
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        meta.version = required(version, "FileMetaData.version")?;
        meta.schema = required(schema, "FileMetaData.schema")?;
        meta.num_rows = required(num_rows, "FileMetaData.num_rows")?;
        meta.row_groups = required(row_groups, "FileMetaData.row_groups")?;
        Ok(meta)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataPageHeader {
    pub num_values: i32,
    pub encoding: i32,
    pub definition_level_encoding: i32,
    pub repetition_level_encoding: i32,
    pub statistics: Option<Statistics>,
}

impl TSerializable for DataPageHeader {
    fn read_from_in_protocol(i: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut num_values = None;
        let mut encoding = None;
        let mut def_encoding = None;
        let mut rep_encoding = None;
        let mut statistics = None;
        read_struct(i, |i, id, ty| {
            match (id, ty) {
                (1, TType::I32) => num_values = Some(i.read_i32()?),
                (2, TType::I32) => encoding = Some(i.read_i32()?),
                (3, TType::I32) => def_encoding = Some(i.read_i32()?),
                (4, TType::I32) => rep_encoding = Some(i.read_i32()?),
                (5, TType::Struct) => statistics = Some(Statistics::read_from_in_protocol(i)?),
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(DataPageHeader {
            num_values: required(num_values, "DataPageHeader.num_values")?,
            encoding: required(encoding, "DataPageHeader.encoding")?,
            definition_level_encoding: required(
                def_encoding,
                "DataPageHeader.definition_level_encoding",
            )?,
            repetition_level_encoding: required(
                rep_encoding,
                "DataPageHeader.repetition_level_encoding",
            )?,
            statistics,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataPageHeaderV2 {
    pub num_values: i32,
    pub num_nulls: i32,
    pub num_rows: i32,
    pub encoding: i32,
    pub definition_levels_byte_length: i32,
    pub repetition_levels_byte_length: i32,
    pub is_compressed: Option<bool>,
    pub statistics: Option<Statistics>,
}

impl TSerializable for DataPageHeaderV2 {
    fn read_from_in_protocol(i: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut num_values = None;
        let mut num_nulls = None;
        let mut num_rows = None;
        let mut encoding = None;
        let mut def_len = None;
        let mut rep_len = None;
        let mut is_compressed = None;
        let mut statistics = None;
        read_struct(i, |i, id, ty| {
            match (id, ty) {
                (1, TType::I32) => num_values = Some(i.read_i32()?),
                (2, TType::I32) => num_nulls = Some(i.read_i32()?),
                (3, TType::I32) => num_rows = Some(i.read_i32()?),
                (4, TType::I32) => encoding = Some(i.read_i32()?),
                (5, TType::I32) => def_len = Some(i.read_i32()?),
                (6, TType::I32) => rep_len = Some(i.read_i32()?),
                (7, TType::Bool) => is_compressed = Some(i.read_bool()?),
                (8, TType::Struct) => statistics = Some(Statistics::read_from_in_protocol(i)?),
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(DataPageHeaderV2 {
            num_values: required(num_values, "DataPageHeaderV2.num_values")?,
            num_nulls: required(num_nulls, "DataPageHeaderV2.num_nulls")?,
            num_rows: required(num_rows, "DataPageHeaderV2.num_rows")?,
            encoding: required(encoding, "DataPageHeaderV2.encoding")?,
            definition_levels_byte_length: required(
                def_len,
                "DataPageHeaderV2.definition_levels_byte_length",
            )?,
            repetition_levels_byte_length: required(
                rep_len,
                "DataPageHeaderV2.repetition_levels_byte_length",
            )?,
            is_compressed,
            statistics,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DictionaryPageHeader {
    pub num_values: i32,
    pub encoding: i32,
    pub is_sorted: Option<bool>,
}

impl TSerializable for DictionaryPageHeader {
    fn read_from_in_protocol(i: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut num_values = None;
        let mut encoding = None;
        let mut is_sorted = None;
        read_struct(i, |i, id, ty| {
            match (id, ty) {
                (1, TType::I32) => num_values = Some(i.read_i32()?),
                (2, TType::I32) => encoding = Some(i.read_i32()?),
                (3, TType::Bool) => is_sorted = Some(i.read_bool()?),
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(DictionaryPageHeader {
            num_values: required(num_values, "DictionaryPageHeader.num_values")?,
            encoding: required(encoding, "DictionaryPageHeader.encoding")?,
            is_sorted,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageHeader {
    pub type_: i32,
    pub uncompressed_page_size: i32,
    pub compressed_page_size: i32,
    pub crc: Option<i32>,
    pub data_page_header: Option<DataPageHeader>,
    pub dictionary_page_header: Option<DictionaryPageHeader>,
    pub data_page_header_v2: Option<DataPageHeaderV2>,
}

impl TSerializable for PageHeader {
    fn read_from_in_protocol(i: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut header = PageHeader::default();
        let mut type_ = None;
        let mut uncompressed = None;
        let mut compressed = None;
        read_struct(i, |i, id, ty| {
            match (id, ty) {
                (1, TType::I32) => type_ = Some(i.read_i32()?),
                (2, TType::I32) => uncompressed = Some(i.read_i32()?),
                (3, TType::I32) => compressed = Some(i.read_i32()?),
                (4, TType::I32) => header.crc = Some(i.read_i32()?),
                (5, TType::Struct) => {
                    header.data_page_header = Some(DataPageHeader::read_from_in_protocol(i)?)
                }
                (7, TType::Struct) => {
                    header.dictionary_page_header =
                        Some(DictionaryPageHeader::read_from_in_protocol(i)?)
                }
                (8, TType::Struct) => {
                    header.data_page_header_v2 =
                        Some(DataPageHeaderV2::read_from_in_protocol(i)?)
                }
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        header.type_ = required(type_, "PageHeader.type")?;
        header.uncompressed_page_size =
            required(uncompressed, "PageHeader.uncompressed_page_size")?;
        header.compressed_page_size = required(compressed, "PageHeader.compressed_page_size")?;
        Ok(header)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnIndex {
    pub null_pages: Vec<bool>,
    pub min_values: Vec<Vec<u8>>,
    pub max_values: Vec<Vec<u8>>,
    pub boundary_order: i32,
    pub null_counts: Option<Vec<i64>>,
}

impl TSerializable for ColumnIndex {
    fn read_from_in_protocol(i: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut null_pages = None;
        let mut min_values = None;
        let mut max_values = None;
        let mut boundary_order = None;
        let mut null_counts = None;
        read_struct(i, |i, id, ty| {
            match (id, ty) {
                (1, TType::List) => null_pages = Some(read_list(i, |i| i.read_bool())?),
                (2, TType::List) => min_values = Some(read_list(i, |i| i.read_bytes())?),
                (3, TType::List) => max_values = Some(read_list(i, |i| i.read_bytes())?),
                (4, TType::I32) => boundary_order = Some(i.read_i32()?),
                (5, TType::List) => null_counts = Some(read_list(i, |i| i.read_i64())?),
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(ColumnIndex {
            null_pages: required(null_pages, "ColumnIndex.null_pages")?,
            min_values: required(min_values, "ColumnIndex.min_values")?,
            max_values: required(max_values, "ColumnIndex.max_values")?,
            boundary_order: required(boundary_order, "ColumnIndex.boundary_order")?,
            null_counts,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLocation {
    pub offset: i64,
    pub compressed_page_size: i32,
    pub first_row_index: i64,
}

impl TSerializable for PageLocation {
    fn read_from_in_protocol(i: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut offset = None;
        let mut size = None;
        let mut first_row = None;
        read_struct(i, |i, id, ty| {
            match (id, ty) {
                (1, TType::I64) => offset = Some(i.read_i64()?),
                (2, TType::I32) => size = Some(i.read_i32()?),
                (3, TType::I64) => first_row = Some(i.read_i64()?),
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(PageLocation {
            offset: required(offset, "PageLocation.offset")?,
            compressed_page_size: required(size, "PageLocation.compressed_page_size")?,
            first_row_index: required(first_row, "PageLocation.first_row_index")?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OffsetIndex {
    pub page_locations: Vec<PageLocation>,
}

impl TSerializable for OffsetIndex {
    fn read_from_in_protocol(i: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut locations = None;
        read_struct(i, |i, id, ty| {
            match (id, ty) {
                (1, TType::List) => {
                    locations = Some(read_list(i, PageLocation::read_from_in_protocol)?)
                }
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(OffsetIndex {
            page_locations: required(locations, "OffsetIndex.page_locations")?,
        })
    }
}

/// Header preceding a split-block bloom filter bitset.
///
/// The algorithm, hash and compression unions each only have a single defined
/// variant. We record which variant id was present so unknown ones can be
/// rejected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BloomFilterHeader {
    pub num_bytes: i32,
    pub algorithm: Option<i16>,
    pub hash: Option<i16>,
    pub compression: Option<i16>,
}

fn read_union_variant(i: &mut dyn TInputProtocol) -> thrift::Result<Option<i16>> {
    let mut variant = None;
    read_struct(i, |i, id, ty| {
        if ty != TType::Struct {
            return Ok(false);
        }
        read_empty_struct(i)?;
        variant = Some(id);
        Ok(true)
    })?;
    Ok(variant)
}

impl TSerializable for BloomFilterHeader {
    fn read_from_in_protocol(i: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut header = BloomFilterHeader::default();
        let mut num_bytes = None;
        read_struct(i, |i, id, ty| {
            match (id, ty) {
                (1, TType::I32) => num_bytes = Some(i.read_i32()?),
                (2, TType::Struct) => header.algorithm = read_union_variant(i)?,
                (3, TType::Struct) => header.hash = read_union_variant(i)?,
                (4, TType::Struct) => header.compression = read_union_variant(i)?,
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        header.num_bytes = required(num_bytes, "BloomFilterHeader.numBytes")?;
        Ok(header)
    }
}
