use std::sync::Arc;

use bytes::Bytes;
use pqlens_error::{ErrorKind, OptionExt, PqError, Result, ResultExt};
use tracing::{debug, trace};

use super::bitutil::{ByteCursor, num_required_bits};
use super::encoding::ValueDecoder;
use super::encoding::rle_bp::RleBpDecoder;
use super::page::{DataPage, Dictionary, DictionaryPage, Page, PageLayout};
use crate::basic::{Compression, Encoding, PageType};
use crate::compression::Decompressor;
use crate::format::{self, decode_from_slice};
use crate::metadata::ColumnChunkMetaData;
use crate::metadata::statistics::{self, Statistics};
use crate::options::{CancelSignal, ReaderOptions};
use crate::schema::ColumnDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorState {
    Active,
    Done,
    /// A page failed to decode. The rest of the chunk can't be trusted.
    Failed,
    /// The cancel signal was seen.
    Cancelled,
}

/// Forward only cursor over the pages of one column chunk.
///
/// The whole chunk is fetched when the cursor is opened, pages are then
/// decoded one at a time from that buffer. Reopening the chunk gives a fresh
/// cursor starting at the first page.
#[derive(Debug)]
pub struct PageCursor {
    /// Column description.
    descr: Arc<ColumnDescriptor>,
    codec: Compression,
    /// Column chunk buffer.
    chunk: Bytes,
    /// File offset of the start of the chunk buffer.
    chunk_file_offset: u64,
    /// Current offset into the chunk buffer.
    offset: usize,
    /// Value count from the chunk metadata.
    declared_values: u64,
    /// Values in data pages returned so far.
    values_seen: u64,
    data_pages_seen: usize,
    ordinal: usize,
    /// Dictionary for the chunk, if one was read.
    dictionary: Option<Arc<Dictionary>>,
    decompressor: Arc<dyn Decompressor>,
    value_decoder: Arc<dyn ValueDecoder>,
    verify_checksums: bool,
    cancel: Option<CancelSignal>,
    state: CursorState,
}

impl PageCursor {
    pub(crate) fn new(
        meta: &ColumnChunkMetaData,
        chunk_file_offset: u64,
        chunk: Bytes,
        options: &ReaderOptions,
    ) -> Self {
        PageCursor {
            descr: meta.column.clone(),
            codec: meta.codec,
            chunk,
            chunk_file_offset,
            offset: 0,
            declared_values: meta.num_values,
            values_seen: 0,
            data_pages_seen: 0,
            ordinal: 0,
            dictionary: None,
            decompressor: options.decompressor.clone(),
            value_decoder: options.value_decoder.clone(),
            verify_checksums: options.verify_page_checksums,
            cancel: options.cancel.clone(),
            state: CursorState::Active,
        }
    }

    pub fn column(&self) -> &Arc<ColumnDescriptor> {
        &self.descr
    }

    /// Number of data page values returned so far.
    pub fn values_read(&self) -> u64 {
        self.values_seen
    }

    /// Dictionary read from the chunk's first page, dropped once the chunk is
    /// exhausted.
    pub fn dictionary(&self) -> Option<&Arc<Dictionary>> {
        self.dictionary.as_ref()
    }

    /// Read the next page.
    ///
    /// Returns `Ok(None)` at the end of the chunk. Once a page fails to decode
    /// every later call errors without touching the chunk again.
    pub fn next_page(&mut self) -> Result<Option<Page>> {
        match self.state {
            CursorState::Active => (),
            CursorState::Done => return Ok(None),
            CursorState::Failed => {
                return Err(PqError::new(
                    ErrorKind::CorruptPage,
                    "Page cursor stopped after an earlier error",
                )
                .with_field("column", &self.descr.path));
            }
            CursorState::Cancelled => return Err(self.cancelled_error()),
        }

        if self.cancel.as_ref().is_some_and(|c| c.is_cancelled()) {
            self.state = CursorState::Cancelled;
            return Err(self.cancelled_error());
        }

        match self.read_page() {
            Ok(Some(page)) => Ok(Some(page)),
            Ok(None) => {
                self.finish();
                Ok(None)
            }
            Err(e) => {
                self.state = CursorState::Failed;
                Err(e
                    .with_field("column", &self.descr.path)
                    .with_field("page", self.ordinal))
            }
        }
    }

    fn cancelled_error(&self) -> PqError {
        PqError::new(ErrorKind::Cancelled, "Page scan cancelled")
            .with_field("column", &self.descr.path)
            .with_field("page", self.ordinal)
    }

    fn finish(&mut self) {
        if self.dictionary.take().is_some() {
            debug!(column = %self.descr.path, "discarding dictionary at end of chunk");
        }
        self.state = CursorState::Done;
    }

    fn read_page(&mut self) -> Result<Option<Page>> {
        loop {
            if self.offset >= self.chunk.len() || self.values_seen >= self.declared_values {
                if self.values_seen != self.declared_values {
                    return Err(PqError::new(
                        ErrorKind::CorruptPage,
                        "Column chunk ended before its declared value count",
                    )
                    .with_field("declared", self.declared_values)
                    .with_field("read", self.values_seen));
                }
                return Ok(None);
            }

            let (header, header_len) = self.read_header()?;
            let compressed_size = page_size(header.compressed_page_size, "compressed_page_size")?;
            let uncompressed_size =
                page_size(header.uncompressed_page_size, "uncompressed_page_size")?;

            let body_start = self.offset + header_len;
            let body_end = body_start + compressed_size;
            if body_end > self.chunk.len() {
                return Err(PqError::new(
                    ErrorKind::CorruptPage,
                    "Page overruns the column chunk",
                )
                .with_field("page_end", body_end)
                .with_field("chunk_len", self.chunk.len()));
            }

            let layout = PageLayout {
                ordinal: self.ordinal,
                offset: self.chunk_file_offset + self.offset as u64,
                header_len,
                compressed_size,
                uncompressed_size,
            };
            let body = self.chunk.slice(body_start..body_end);
            let page_type = PageType::from_thrift(header.type_);

            trace!(
                ordinal = layout.ordinal,
                offset = layout.offset,
                ?page_type,
                compressed_size,
                uncompressed_size,
                "read page header"
            );

            if self.verify_checksums {
                if let Some(expected) = header.crc {
                    verify_crc(&body, expected)?;
                }
            }

            let page = match page_type {
                PageType::DICTIONARY_PAGE => {
                    Page::Dictionary(self.read_dictionary_page(&header, layout, body)?)
                }
                PageType::DATA_PAGE => Page::Data(self.read_data_page(&header, layout, body)?),
                PageType::DATA_PAGE_V2 => {
                    Page::Data(self.read_data_page_v2(&header, layout, body)?)
                }
                other => {
                    debug!(page_type = ?other, offset = layout.offset, "skipping page");
                    self.offset = body_end;
                    continue;
                }
            };

            self.offset = body_end;
            self.ordinal += 1;
            if let Page::Data(data) = &page {
                self.data_pages_seen += 1;
                self.values_seen += data.num_values as u64;
            }

            return Ok(Some(page));
        }
    }

    /// Decode the page header at the current offset, returning it with its
    /// serialized length.
    fn read_header(&self) -> Result<(format::PageHeader, usize)> {
        decode_from_slice::<format::PageHeader>(&self.chunk[self.offset..])
            .context(ErrorKind::CorruptPage, "Failed to decode page header")
    }

    fn decompress(&self, input: Bytes, uncompressed_size: usize) -> Result<Bytes> {
        if self.codec == Compression::UNCOMPRESSED {
            if input.len() != uncompressed_size {
                return Err(PqError::new(
                    ErrorKind::CorruptPage,
                    "Uncompressed page size doesn't match the page header",
                )
                .with_field("expected", uncompressed_size)
                .with_field("got", input.len()));
            }
            return Ok(input);
        }
        self.decompressor
            .decompress(self.codec, &input, uncompressed_size)
    }

    fn read_dictionary_page(
        &mut self,
        header: &format::PageHeader,
        layout: PageLayout,
        body: Bytes,
    ) -> Result<DictionaryPage> {
        let dict_header = header
            .dictionary_page_header
            .as_ref()
            .required(ErrorKind::CorruptPage, "Dictionary page header missing")?;

        if self.data_pages_seen > 0 || self.dictionary.is_some() {
            return Err(PqError::new(
                ErrorKind::CorruptPage,
                "Dictionary page must be the first page of a column chunk",
            ));
        }

        let encoding = Encoding::from_thrift(dict_header.encoding);
        if !matches!(encoding, Encoding::PLAIN | Encoding::PLAIN_DICTIONARY) {
            return Err(PqError::new(
                ErrorKind::UnsupportedEncoding,
                "Unsupported dictionary page encoding",
            )
            .with_field("encoding", encoding));
        }

        let num_values = page_size(dict_header.num_values, "num_values")?;
        let data = self.decompress(body, layout.uncompressed_size)?;
        let values = self
            .value_decoder
            .decode(Encoding::PLAIN, &self.descr, data, num_values, None)?;
        if values.len() != num_values {
            return Err(PqError::new(
                ErrorKind::CorruptPage,
                "Dictionary page holds the wrong number of values",
            )
            .with_field("expected", num_values)
            .with_field("got", values.len()));
        }

        let dictionary = Arc::new(Dictionary::new(values));
        self.dictionary = Some(dictionary.clone());

        Ok(DictionaryPage {
            layout,
            encoding,
            num_values,
            is_sorted: dict_header.is_sorted.unwrap_or(false),
            dictionary,
        })
    }

    /// Data page v1.
    ///
    /// Order: repetitions, definitions, values. Level lengths are encoded
    /// inline as u32 and the whole body is compressed.
    fn read_data_page(
        &self,
        header: &format::PageHeader,
        layout: PageLayout,
        body: Bytes,
    ) -> Result<DataPage> {
        let page_header = header
            .data_page_header
            .as_ref()
            .required(ErrorKind::CorruptPage, "Data page header missing")?;
        let num_values = self.check_num_values(page_header.num_values)?;

        let data = self.decompress(body, layout.uncompressed_size)?;
        let mut cursor = ByteCursor::new(data);

        let mut read_levels = |max: i16, encoding: i32| -> Result<Option<Arc<[i16]>>> {
            if max == 0 {
                return Ok(None);
            }
            check_level_encoding(encoding)?;
            let len = cursor.read_u32_le()? as usize;
            let raw = cursor.read_bytes(len)?;
            decode_levels(raw, max, num_values).map(Some)
        };

        let repetition_levels = read_levels(
            self.descr.max_rep_level,
            page_header.repetition_level_encoding,
        )?;
        let definition_levels = read_levels(
            self.descr.max_def_level,
            page_header.definition_level_encoding,
        )?;

        let num_rows = match &repetition_levels {
            Some(levels) => levels.iter().filter(|&&l| l == 0).count(),
            None => num_values,
        };

        let statistics = self.page_statistics(page_header.statistics.as_ref())?;
        let declared_null_count = statistics.as_ref().and_then(|s| s.null_count);

        Ok(DataPage {
            layout,
            data_page_index: self.data_pages_seen,
            page_type: PageType::DATA_PAGE,
            encoding: Encoding::from_thrift(page_header.encoding),
            num_values,
            num_rows,
            statistics,
            declared_null_count,
            repetition_levels,
            definition_levels,
            data: cursor.take_remaining(),
            column: self.descr.clone(),
            dictionary: self.dictionary.clone(),
            decoder: self.value_decoder.clone(),
        })
    }

    /// Data page v2.
    ///
    /// Levels are stored uncompressed ahead of the values with their lengths
    /// in the header. Only the value section may be compressed.
    fn read_data_page_v2(
        &self,
        header: &format::PageHeader,
        layout: PageLayout,
        body: Bytes,
    ) -> Result<DataPage> {
        let page_header = header
            .data_page_header_v2
            .as_ref()
            .required(ErrorKind::CorruptPage, "Data page v2 header missing")?;
        let num_values = self.check_num_values(page_header.num_values)?;

        let rep_len = page_size(
            page_header.repetition_levels_byte_length,
            "repetition_levels_byte_length",
        )?;
        let def_len = page_size(
            page_header.definition_levels_byte_length,
            "definition_levels_byte_length",
        )?;
        let levels_len = rep_len + def_len;
        if levels_len > body.len() {
            return Err(PqError::new(
                ErrorKind::CorruptPage,
                "Level lengths exceed the page size",
            )
            .with_field("levels_len", levels_len)
            .with_field("page_len", body.len()));
        }

        let levels = |max: i16, raw: Bytes| -> Result<Option<Arc<[i16]>>> {
            if max == 0 {
                return Ok(None);
            }
            decode_levels(raw, max, num_values).map(Some)
        };
        let repetition_levels = levels(self.descr.max_rep_level, body.slice(..rep_len))?;
        let definition_levels =
            levels(self.descr.max_def_level, body.slice(rep_len..levels_len))?;

        let values = body.slice(levels_len..);
        let data = if page_header.is_compressed.unwrap_or(true) {
            let size = layout.uncompressed_size.checked_sub(levels_len).ok_or_else(|| {
                PqError::new(
                    ErrorKind::CorruptPage,
                    "Level lengths exceed the uncompressed page size",
                )
                .with_field("levels_len", levels_len)
                .with_field("uncompressed_size", layout.uncompressed_size)
            })?;
            self.decompress(values, size)?
        } else {
            values
        };

        let statistics = self.page_statistics(page_header.statistics.as_ref())?;

        Ok(DataPage {
            layout,
            data_page_index: self.data_pages_seen,
            page_type: PageType::DATA_PAGE_V2,
            encoding: Encoding::from_thrift(page_header.encoding),
            num_values,
            num_rows: page_size(page_header.num_rows, "num_rows")?,
            statistics,
            declared_null_count: Some(page_size(page_header.num_nulls, "num_nulls")? as u64),
            repetition_levels,
            definition_levels,
            data,
            column: self.descr.clone(),
            dictionary: self.dictionary.clone(),
            decoder: self.value_decoder.clone(),
        })
    }

    /// Validate a data page's value count against what the chunk has left.
    fn check_num_values(&self, num_values: i32) -> Result<usize> {
        let num_values = page_size(num_values, "num_values")?;
        let remaining = self.declared_values - self.values_seen;
        if num_values as u64 > remaining {
            return Err(PqError::new(
                ErrorKind::CorruptPage,
                "Page holds more values than the column chunk declares",
            )
            .with_field("num_values", num_values)
            .with_field("remaining", remaining));
        }
        Ok(num_values)
    }

    fn page_statistics(&self, stats: Option<&format::Statistics>) -> Result<Option<Statistics>> {
        stats
            .map(|s| statistics::from_thrift(self.descr.physical_type, self.descr.type_length, s))
            .transpose()
    }
}

impl Iterator for PageCursor {
    type Item = Result<Page>;

    /// Yields a failure or cancellation once, then ends.
    fn next(&mut self) -> Option<Self::Item> {
        if matches!(self.state, CursorState::Failed | CursorState::Cancelled) {
            return None;
        }
        self.next_page().transpose()
    }
}

fn page_size(v: i32, field: &'static str) -> Result<usize> {
    if v < 0 {
        return Err(PqError::new(ErrorKind::CorruptPage, "Negative size in page header")
            .with_field("field", field)
            .with_field("value", v));
    }
    Ok(v as usize)
}

fn check_level_encoding(code: i32) -> Result<()> {
    match Encoding::from_thrift(code) {
        Encoding::RLE => Ok(()),
        other => Err(PqError::new(
            ErrorKind::UnsupportedEncoding,
            "Unsupported level encoding",
        )
        .with_field("encoding", other)),
    }
}

fn decode_levels(raw: Bytes, max: i16, count: usize) -> Result<Arc<[i16]>> {
    let mut levels = vec![0i16; count];
    let mut decoder = RleBpDecoder::new(ByteCursor::new(raw), num_required_bits(max as u64));
    decoder.get_batch(&mut levels)?;

    if let Some(bad) = levels.iter().find(|&&l| l < 0 || l > max) {
        return Err(PqError::new(ErrorKind::CorruptPage, "Level exceeds column maximum")
            .with_field("level", bad)
            .with_field("max", max));
    }

    Ok(Arc::from(levels))
}

fn verify_crc(body: &[u8], expected: i32) -> Result<()> {
    let mut crc = flate2::Crc::new();
    crc.update(body);
    if crc.sum() != expected as u32 {
        return Err(PqError::new(ErrorKind::CorruptPage, "Page checksum mismatch")
            .with_field("expected", expected as u32)
            .with_field("actual", crc.sum()));
    }
    Ok(())
}
