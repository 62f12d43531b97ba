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

//! Contains Rust mappings for the Thrift enum codes used in parquet metadata.
//!
//! Codes for compression and encoding are allowed to be unknown at metadata
//! decode time. They're only rejected once a page actually needs them.

use std::fmt;

use pqlens_error::{ErrorKind, PqError, Result};

/// Physical storage type of a leaf column.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    BOOLEAN,
    INT32,
    INT64,
    INT96,
    FLOAT,
    DOUBLE,
    BYTE_ARRAY,
    FIXED_LEN_BYTE_ARRAY,
}

impl Type {
    pub fn try_from_thrift(code: i32) -> Result<Self> {
        Ok(match code {
            0 => Type::BOOLEAN,
            1 => Type::INT32,
            2 => Type::INT64,
            3 => Type::INT96,
            4 => Type::FLOAT,
            5 => Type::DOUBLE,
            6 => Type::BYTE_ARRAY,
            7 => Type::FIXED_LEN_BYTE_ARRAY,
            other => {
                return Err(PqError::new(ErrorKind::CorruptSchema, "Unknown physical type")
                    .with_field("code", other));
            }
        })
    }

    /// Width in bytes of a single plain-encoded value, if fixed.
    ///
    /// `type_length` is only consulted for FIXED_LEN_BYTE_ARRAY.
    pub fn fixed_width(&self, type_length: i32) -> Option<usize> {
        match self {
            Type::BOOLEAN | Type::BYTE_ARRAY => None,
            Type::INT32 | Type::FLOAT => Some(4),
            Type::INT64 | Type::DOUBLE => Some(8),
            Type::INT96 => Some(12),
            Type::FIXED_LEN_BYTE_ARRAY => Some(type_length.max(0) as usize),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Repetition {
    REQUIRED,
    OPTIONAL,
    REPEATED,
}

impl Repetition {
    pub fn try_from_thrift(code: i32) -> Result<Self> {
        Ok(match code {
            0 => Repetition::REQUIRED,
            1 => Repetition::OPTIONAL,
            2 => Repetition::REPEATED,
            other => {
                return Err(PqError::new(ErrorKind::CorruptSchema, "Unknown repetition")
                    .with_field("code", other));
            }
        })
    }
}

impl fmt::Display for Repetition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Legacy logical annotation.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConvertedType {
    NONE,
    UTF8,
    MAP,
    MAP_KEY_VALUE,
    LIST,
    ENUM,
    DECIMAL,
    DATE,
    TIME_MILLIS,
    TIME_MICROS,
    TIMESTAMP_MILLIS,
    TIMESTAMP_MICROS,
    UINT_8,
    UINT_16,
    UINT_32,
    UINT_64,
    INT_8,
    INT_16,
    INT_32,
    INT_64,
    JSON,
    BSON,
    INTERVAL,
}

impl ConvertedType {
    /// Unknown codes are treated as unannotated.
    pub fn from_thrift(code: Option<i32>) -> Self {
        match code {
            Some(0) => ConvertedType::UTF8,
            Some(1) => ConvertedType::MAP,
            Some(2) => ConvertedType::MAP_KEY_VALUE,
            Some(3) => ConvertedType::LIST,
            Some(4) => ConvertedType::ENUM,
            Some(5) => ConvertedType::DECIMAL,
            Some(6) => ConvertedType::DATE,
            Some(7) => ConvertedType::TIME_MILLIS,
            Some(8) => ConvertedType::TIME_MICROS,
            Some(9) => ConvertedType::TIMESTAMP_MILLIS,
            Some(10) => ConvertedType::TIMESTAMP_MICROS,
            Some(11) => ConvertedType::UINT_8,
            Some(12) => ConvertedType::UINT_16,
            Some(13) => ConvertedType::UINT_32,
            Some(14) => ConvertedType::UINT_64,
            Some(15) => ConvertedType::INT_8,
            Some(16) => ConvertedType::INT_16,
            Some(17) => ConvertedType::INT_32,
            Some(18) => ConvertedType::INT_64,
            Some(19) => ConvertedType::JSON,
            Some(20) => ConvertedType::BSON,
            Some(21) => ConvertedType::INTERVAL,
            _ => ConvertedType::NONE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Millis,
    Micros,
    Nanos,
}

/// Logical type annotation of a schema node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalType {
    String,
    Map,
    List,
    Enum,
    Decimal { scale: i32, precision: i32 },
    Date,
    Time { is_adjusted_to_utc: bool, unit: TimeUnit },
    Timestamp { is_adjusted_to_utc: bool, unit: TimeUnit },
    Integer { bit_width: i8, is_signed: bool },
    Unknown,
    Json,
    Bson,
    Uuid,
    Float16,
}

impl LogicalType {
    /// Derive a logical type from a legacy converted type.
    pub fn from_converted(converted: ConvertedType, scale: i32, precision: i32) -> Option<Self> {
        Some(match converted {
            ConvertedType::NONE | ConvertedType::MAP_KEY_VALUE | ConvertedType::INTERVAL => {
                return None;
            }
            ConvertedType::UTF8 => LogicalType::String,
            ConvertedType::MAP => LogicalType::Map,
            ConvertedType::LIST => LogicalType::List,
            ConvertedType::ENUM => LogicalType::Enum,
            ConvertedType::DECIMAL => LogicalType::Decimal { scale, precision },
            ConvertedType::DATE => LogicalType::Date,
            ConvertedType::TIME_MILLIS => LogicalType::Time {
                is_adjusted_to_utc: true,
                unit: TimeUnit::Millis,
            },
            ConvertedType::TIME_MICROS => LogicalType::Time {
                is_adjusted_to_utc: true,
                unit: TimeUnit::Micros,
            },
            ConvertedType::TIMESTAMP_MILLIS => LogicalType::Timestamp {
                is_adjusted_to_utc: true,
                unit: TimeUnit::Millis,
            },
            ConvertedType::TIMESTAMP_MICROS => LogicalType::Timestamp {
                is_adjusted_to_utc: true,
                unit: TimeUnit::Micros,
            },
            ConvertedType::UINT_8 => integer(8, false),
            ConvertedType::UINT_16 => integer(16, false),
            ConvertedType::UINT_32 => integer(32, false),
            ConvertedType::UINT_64 => integer(64, false),
            ConvertedType::INT_8 => integer(8, true),
            ConvertedType::INT_16 => integer(16, true),
            ConvertedType::INT_32 => integer(32, true),
            ConvertedType::INT_64 => integer(64, true),
            ConvertedType::JSON => LogicalType::Json,
            ConvertedType::BSON => LogicalType::Bson,
        })
    }
}

const fn integer(bit_width: i8, is_signed: bool) -> LogicalType {
    LogicalType::Integer {
        bit_width,
        is_signed,
    }
}

/// Encoding of page values or levels.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    PLAIN,
    PLAIN_DICTIONARY,
    RLE,
    BIT_PACKED,
    DELTA_BINARY_PACKED,
    DELTA_LENGTH_BYTE_ARRAY,
    DELTA_BYTE_ARRAY,
    RLE_DICTIONARY,
    BYTE_STREAM_SPLIT,
    Unknown(i32),
}

impl Encoding {
    pub fn from_thrift(code: i32) -> Self {
        match code {
            0 => Encoding::PLAIN,
            2 => Encoding::PLAIN_DICTIONARY,
            3 => Encoding::RLE,
            4 => Encoding::BIT_PACKED,
            5 => Encoding::DELTA_BINARY_PACKED,
            6 => Encoding::DELTA_LENGTH_BYTE_ARRAY,
            7 => Encoding::DELTA_BYTE_ARRAY,
            8 => Encoding::RLE_DICTIONARY,
            9 => Encoding::BYTE_STREAM_SPLIT,
            other => Encoding::Unknown(other),
        }
    }

    pub fn is_dictionary(&self) -> bool {
        matches!(self, Encoding::PLAIN_DICTIONARY | Encoding::RLE_DICTIONARY)
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::Unknown(code) => write!(f, "UNKNOWN({code})"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Compression codec of a column chunk.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compression {
    UNCOMPRESSED,
    SNAPPY,
    GZIP,
    LZO,
    BROTLI,
    LZ4,
    ZSTD,
    LZ4_RAW,
    Unknown(i32),
}

impl Compression {
    pub fn from_thrift(code: i32) -> Self {
        match code {
            0 => Compression::UNCOMPRESSED,
            1 => Compression::SNAPPY,
            2 => Compression::GZIP,
            3 => Compression::LZO,
            4 => Compression::BROTLI,
            5 => Compression::LZ4,
            6 => Compression::ZSTD,
            7 => Compression::LZ4_RAW,
            other => Compression::Unknown(other),
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compression::Unknown(code) => write!(f, "UNKNOWN({code})"),
            other => write!(f, "{other:?}"),
        }
    }
}

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageType {
    DATA_PAGE,
    INDEX_PAGE,
    DICTIONARY_PAGE,
    DATA_PAGE_V2,
    Unknown(i32),
}

impl PageType {
    pub fn from_thrift(code: i32) -> Self {
        match code {
            0 => PageType::DATA_PAGE,
            1 => PageType::INDEX_PAGE,
            2 => PageType::DICTIONARY_PAGE,
            3 => PageType::DATA_PAGE_V2,
            other => PageType::Unknown(other),
        }
    }
}

/// Ordering of page min/max values in a column index.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundaryOrder {
    UNORDERED,
    ASCENDING,
    DESCENDING,
}

impl BoundaryOrder {
    pub fn from_thrift(code: i32) -> Self {
        match code {
            1 => BoundaryOrder::ASCENDING,
            2 => BoundaryOrder::DESCENDING,
            _ => BoundaryOrder::UNORDERED,
        }
    }
}
