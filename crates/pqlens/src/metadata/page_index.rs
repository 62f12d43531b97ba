//! Column index and offset index, the per-page synopsis written after the
//! row groups.

use pqlens_error::{ErrorKind, PqError, Result, ResultExt};

use crate::basic::BoundaryOrder;
use crate::column::encoding::plain::decode_plain_scalar;
use crate::format::{self, decode_from_slice};
use crate::schema::ColumnDescriptor;
use crate::value::ScalarValue;

/// Statistics for a single page from the column index.
#[derive(Debug, Clone, PartialEq)]
pub struct PageIndexEntry {
    /// Page contains only nulls, min and max are meaningless.
    pub null_page: bool,
    pub min: Option<ScalarValue>,
    pub max: Option<ScalarValue>,
    /// `None` when the writer didn't record null counts.
    pub null_count: Option<u64>,
}

/// Per-page min/max and null counts for one column chunk, ordered by page
/// ordinal (data pages only).
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnIndex {
    pub boundary_order: BoundaryOrder,
    pub pages: Vec<PageIndexEntry>,
}

impl ColumnIndex {
    pub fn num_pages(&self) -> usize {
        self.pages.len()
    }

    pub fn page(&self, idx: usize) -> Option<&PageIndexEntry> {
        self.pages.get(idx)
    }

    pub(crate) fn try_from_thrift(index: format::ColumnIndex, descr: &ColumnDescriptor) -> Result<Self> {
        let num_pages = index.null_pages.len();
        let counts_len = index.null_counts.as_ref().map(|c| c.len()).unwrap_or(num_pages);
        if index.min_values.len() != num_pages
            || index.max_values.len() != num_pages
            || counts_len != num_pages
        {
            return Err(PqError::new(
                ErrorKind::CorruptFooter,
                "Column index lists have mismatched lengths",
            )
            .with_field("null_pages", num_pages)
            .with_field("min_values", index.min_values.len())
            .with_field("max_values", index.max_values.len())
            .with_field("null_counts", counts_len));
        }

        let decode = |null_page: bool, raw: &[u8]| -> Result<Option<ScalarValue>> {
            if null_page {
                return Ok(None);
            }
            decode_plain_scalar(descr.physical_type, descr.type_length, raw)
                .map(Some)
                .map_err(|e| e.with_kind(ErrorKind::CorruptFooter))
        };

        let mut pages = Vec::with_capacity(num_pages);
        for (idx, &null_page) in index.null_pages.iter().enumerate() {
            let null_count = match index.null_counts.as_ref().map(|c| c[idx]) {
                Some(n) if n < 0 => {
                    return Err(PqError::new(
                        ErrorKind::CorruptFooter,
                        "Column index null count is negative",
                    )
                    .with_field("page", idx));
                }
                other => other.map(|n| n as u64),
            };

            pages.push(PageIndexEntry {
                null_page,
                min: decode(null_page, &index.min_values[idx])?,
                max: decode(null_page, &index.max_values[idx])?,
                null_count,
            });
        }

        Ok(ColumnIndex {
            boundary_order: BoundaryOrder::from_thrift(index.boundary_order),
            pages,
        })
    }
}

/// Location of a data page within the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLocation {
    pub offset: u64,
    pub compressed_page_size: usize,
    /// Index of the first row of this page within the row group.
    pub first_row_index: u64,
}

/// Page locations for one column chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetIndex {
    pub page_locations: Vec<PageLocation>,
}

impl OffsetIndex {
    pub fn num_pages(&self) -> usize {
        self.page_locations.len()
    }

    /// Number of rows in each page, given the row group's total row count.
    pub fn page_row_counts(&self, row_group_rows: u64) -> Vec<u64> {
        let mut counts = Vec::with_capacity(self.page_locations.len());
        for (idx, loc) in self.page_locations.iter().enumerate() {
            let end = self
                .page_locations
                .get(idx + 1)
                .map(|next| next.first_row_index)
                .unwrap_or(row_group_rows);
            counts.push(end.saturating_sub(loc.first_row_index));
        }
        counts
    }

    pub(crate) fn try_from_thrift(index: format::OffsetIndex) -> Result<Self> {
        let mut page_locations = Vec::with_capacity(index.page_locations.len());
        let mut prev_first_row = 0;
        for (idx, loc) in index.page_locations.into_iter().enumerate() {
            if loc.offset < 0 || loc.compressed_page_size < 0 || loc.first_row_index < 0 {
                return Err(PqError::new(ErrorKind::CorruptFooter, "Negative page location")
                    .with_field("page", idx));
            }
            let first_row_index = loc.first_row_index as u64;
            if first_row_index < prev_first_row {
                return Err(PqError::new(
                    ErrorKind::CorruptFooter,
                    "Page locations are not ordered by first row",
                )
                .with_field("page", idx));
            }
            prev_first_row = first_row_index;

            page_locations.push(PageLocation {
                offset: loc.offset as u64,
                compressed_page_size: loc.compressed_page_size as usize,
                first_row_index,
            });
        }
        Ok(OffsetIndex { page_locations })
    }
}

/// Decode a serialized column index.
pub(crate) fn decode_column_index(buf: &[u8], descr: &ColumnDescriptor) -> Result<ColumnIndex> {
    let (index, _) = decode_from_slice::<format::ColumnIndex>(buf)
        .context(ErrorKind::CorruptFooter, "Failed to decode column index")?;
    ColumnIndex::try_from_thrift(index, descr)
}

/// Decode a serialized offset index.
pub(crate) fn decode_offset_index(buf: &[u8]) -> Result<OffsetIndex> {
    let (index, _) = decode_from_slice::<format::OffsetIndex>(buf)
        .context(ErrorKind::CorruptFooter, "Failed to decode offset index")?;
    OffsetIndex::try_from_thrift(index)
}
