//! Pages produced by the page cursor.

use std::sync::Arc;

use bytes::Bytes;
use pqlens_error::{ErrorKind, PqError, Result};

use super::encoding::ValueDecoder;
use super::value_cursor::ValueCursor;
use crate::basic::{Encoding, PageType};
use crate::metadata::statistics::Statistics;
use crate::schema::ColumnDescriptor;
use crate::value::ScalarValue;

/// Decoded dictionary of a column chunk.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dictionary {
    values: Vec<ScalarValue>,
}

impl Dictionary {
    pub fn new(values: Vec<ScalarValue>) -> Self {
        Dictionary { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&ScalarValue> {
        self.values.get(idx)
    }

    pub fn values(&self) -> &[ScalarValue] {
        &self.values
    }
}

/// Where a page sits in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLayout {
    /// Position of the page within its chunk, counting every page the cursor
    /// returned including a dictionary page. Use
    /// [`DataPage::data_page_index`] to index into a page index.
    pub ordinal: usize,
    /// File offset of the page header.
    pub offset: u64,
    /// Size of the serialized page header.
    pub header_len: usize,
    pub compressed_size: usize,
    pub uncompressed_size: usize,
}

impl PageLayout {
    /// Total bytes taken by the page including its header.
    pub fn total_len(&self) -> usize {
        self.header_len + self.compressed_size
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DictionaryPage {
    pub layout: PageLayout,
    pub encoding: Encoding,
    pub num_values: usize,
    pub is_sorted: bool,
    pub dictionary: Arc<Dictionary>,
}

/// A data page with its levels decoded.
///
/// Values stay encoded until [`DataPage::values`] is called.
#[derive(Debug, Clone)]
pub struct DataPage {
    pub layout: PageLayout,
    /// Position among the data pages of the chunk. Matches the entries of
    /// the column index and offset index.
    pub data_page_index: usize,
    /// Either DATA_PAGE or DATA_PAGE_V2.
    pub page_type: PageType,
    pub encoding: Encoding,
    /// Number of values including nulls.
    pub num_values: usize,
    /// Number of rows starting in this page.
    pub num_rows: usize,
    pub statistics: Option<Statistics>,
    pub(crate) declared_null_count: Option<u64>,
    pub(crate) repetition_levels: Option<Arc<[i16]>>,
    pub(crate) definition_levels: Option<Arc<[i16]>>,
    pub(crate) data: Bytes,
    pub(crate) column: Arc<ColumnDescriptor>,
    pub(crate) dictionary: Option<Arc<Dictionary>>,
    pub(crate) decoder: Arc<dyn ValueDecoder>,
}

impl DataPage {
    pub fn column(&self) -> &Arc<ColumnDescriptor> {
        &self.column
    }

    /// Repetition levels, one per value. `None` when the column has no
    /// repeated ancestors.
    pub fn repetition_levels(&self) -> Option<&[i16]> {
        self.repetition_levels.as_deref()
    }

    /// Definition levels, one per value. `None` for required columns.
    pub fn definition_levels(&self) -> Option<&[i16]> {
        self.definition_levels.as_deref()
    }

    /// Number of nulls according to the definition levels.
    pub fn null_count(&self) -> usize {
        let max = self.column.max_def_level;
        match &self.definition_levels {
            Some(levels) => levels.iter().filter(|&&l| l < max).count(),
            None => 0,
        }
    }

    /// Null count written by the page writer, from the v2 header or the page
    /// statistics.
    pub fn declared_null_count(&self) -> Option<u64> {
        self.declared_null_count
    }

    /// Encoded value section of the page, after levels.
    pub fn value_bytes(&self) -> &Bytes {
        &self.data
    }

    pub fn dictionary(&self) -> Option<&Arc<Dictionary>> {
        self.dictionary.as_ref()
    }

    /// Decode the values and return a cursor over them paired with their
    /// levels.
    pub fn values(&self) -> Result<ValueCursor> {
        let non_null = self.num_values.saturating_sub(self.null_count());
        let values = self.decoder.decode(
            self.encoding,
            &self.column,
            self.data.clone(),
            non_null,
            self.dictionary.as_deref(),
        )?;

        if values.len() != non_null {
            return Err(PqError::new(
                ErrorKind::CorruptPage,
                "Value decoder returned the wrong number of values",
            )
            .with_field("expected", non_null)
            .with_field("got", values.len())
            .with_field("page", self.layout.ordinal));
        }

        Ok(ValueCursor::new(
            values,
            self.repetition_levels.clone(),
            self.definition_levels.clone(),
            self.column.max_def_level,
            self.num_values,
        ))
    }
}

#[derive(Debug, Clone)]
pub enum Page {
    Dictionary(DictionaryPage),
    Data(DataPage),
}

impl Page {
    pub fn layout(&self) -> &PageLayout {
        match self {
            Page::Dictionary(page) => &page.layout,
            Page::Data(page) => &page.layout,
        }
    }

    pub fn page_type(&self) -> PageType {
        match self {
            Page::Dictionary(_) => PageType::DICTIONARY_PAGE,
            Page::Data(page) => page.page_type,
        }
    }

    pub fn is_dictionary(&self) -> bool {
        matches!(self, Page::Dictionary(_))
    }

    /// Number of column values held by the page.
    ///
    /// Zero for dictionary pages, their entry count is on
    /// [`DictionaryPage::num_values`].
    pub fn num_values(&self) -> usize {
        match self {
            Page::Dictionary(_) => 0,
            Page::Data(page) => page.num_values,
        }
    }

    pub fn as_data(&self) -> Option<&DataPage> {
        match self {
            Page::Data(page) => Some(page),
            Page::Dictionary(_) => None,
        }
    }

    pub fn as_dictionary(&self) -> Option<&DictionaryPage> {
        match self {
            Page::Dictionary(page) => Some(page),
            Page::Data(_) => None,
        }
    }
}
