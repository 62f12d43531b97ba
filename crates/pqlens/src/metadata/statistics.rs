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

//! Contains definitions for working with Parquet statistics.
//!
//! Statistics are attached to column chunks and to individual data pages.
//! Min and max are decoded into scalars of the column's physical type.

use std::fmt;

use pqlens_error::{ErrorKind, PqError, Result};

use crate::basic::Type;
use crate::column::encoding::plain::decode_plain_scalar;
use crate::format::Statistics as TStatistics;
use crate::value::ScalarValue;

/// Decoded statistics.
///
/// A missing null count is `None`, never zero. Writers that skip the count
/// are saying nothing about nulls.
#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    pub min: Option<ScalarValue>,
    pub max: Option<ScalarValue>,
    pub null_count: Option<u64>,
    pub distinct_count: Option<u64>,
    pub is_min_exact: bool,
    pub is_max_exact: bool,
    /// Min/max came from the deprecated fields, which for byte arrays were
    /// computed with signed byte comparison.
    pub is_min_max_deprecated: bool,
}

impl Statistics {
    pub fn has_min_max(&self) -> bool {
        self.min.is_some() && self.max.is_some()
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let opt = |v: &Option<ScalarValue>| match v {
            Some(v) => v.to_string(),
            None => "none".to_string(),
        };
        write!(f, "min: {}, max: {}", opt(&self.min), opt(&self.max))?;
        match self.null_count {
            Some(n) => write!(f, ", nulls: {n}")?,
            None => write!(f, ", nulls: unknown")?,
        }
        if let Some(d) = self.distinct_count {
            write!(f, ", distinct: {d}")?;
        }
        Ok(())
    }
}

/// Converts Thrift definition into `Statistics`.
///
/// Errors are reported as page corruption. Callers decoding chunk level
/// statistics from the footer reclassify them.
pub fn from_thrift(
    physical_type: Type,
    type_length: i32,
    stats: &TStatistics,
) -> Result<Statistics> {
    let count = |v: Option<i64>, name: &'static str| -> Result<Option<u64>> {
        match v {
            Some(n) if n < 0 => Err(PqError::new(
                ErrorKind::CorruptPage,
                "Statistics count is negative",
            )
            .with_field("field", name)
            .with_field("value", n)),
            Some(n) => Ok(Some(n as u64)),
            None => Ok(None),
        }
    };

    let null_count = count(stats.null_count, "null_count")?;
    let distinct_count = count(stats.distinct_count, "distinct_count")?;

    // Whether or not statistics use deprecated min/max fields.
    let old_format = stats.min_value.is_none() && stats.max_value.is_none();
    let (min, max) = if old_format {
        (stats.min.as_deref(), stats.max.as_deref())
    } else {
        (stats.min_value.as_deref(), stats.max_value.as_deref())
    };

    let decode = |raw: Option<&[u8]>| -> Result<Option<ScalarValue>> {
        raw.map(|raw| decode_plain_scalar(physical_type, type_length, raw))
            .transpose()
    };

    Ok(Statistics {
        min: decode(min)?,
        max: decode(max)?,
        null_count,
        distinct_count,
        is_min_exact: stats.is_min_value_exact.unwrap_or(false),
        is_max_exact: stats.is_max_value_exact.unwrap_or(false),
        is_min_max_deprecated: old_format && (min.is_some() || max.is_some()),
    })
}
