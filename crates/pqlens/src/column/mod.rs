//! Page iteration and value decoding for a single column chunk.

pub mod bitutil;
pub mod encoding;
pub mod page;
pub mod page_reader;
pub mod value_cursor;
