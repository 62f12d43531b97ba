//! Read-only structural reader for Apache Parquet files.
//!
//! Opening a file decodes its footer into a schema tree and row group
//! metadata. From there column chunks can be opened into a page cursor, and
//! data pages into a value cursor yielding values with their repetition and
//! definition levels.
//!
//! ```no_run
//! use pqlens::{FileSource, ParquetFile, Page};
//!
//! # fn main() -> pqlens_error::Result<()> {
//! let file = ParquetFile::open(FileSource::open("data.parquet")?)?;
//! for row_group in file.row_groups() {
//!     for chunk in row_group.column_chunks() {
//!         for page in chunk.open_pages()? {
//!             if let Page::Data(page) = page? {
//!                 for value in page.values()? {
//!                     println!("{}: {value}", chunk.path());
//!                 }
//!             }
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod basic;
pub mod bloom_filter;
pub mod column;
pub mod compression;
pub mod format;
pub mod metadata;
pub mod options;
pub mod reader;
pub mod schema;
pub mod source;
pub mod value;

#[cfg(test)]
pub(crate) mod testutil;

pub use column::page::{DataPage, Dictionary, DictionaryPage, Page, PageLayout};
pub use column::page_reader::PageCursor;
pub use column::value_cursor::{ValueCursor, ValueNext};
pub use metadata::FileMetaData;
pub use options::{CancelSignal, ReaderOptions};
pub use reader::{ColumnChunkView, ParquetFile, RowGroupView};
pub use source::{ByteSource, CountingSource, FileSource, MemorySource};
pub use value::{ScalarValue, Value};
