//! Error type shared by all pqlens crates.
//!
//! Every failure carries an [`ErrorKind`] so callers can branch on the class
//! of failure (corruption vs unsupported feature vs caller misuse) without
//! matching on message text.

use std::error::Error;
use std::fmt;

pub type Result<T, E = PqError> = std::result::Result<T, E>;

/// Class of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Byte source failure. Possibly transient.
    Io,
    /// Trailer, footer length, or file-level metadata is invalid.
    CorruptFooter,
    /// Flattened schema does not describe a valid tree.
    CorruptSchema,
    /// Page header or page body violates a structural invariant.
    CorruptPage,
    /// Format version (or footer mode) this reader does not handle.
    UnsupportedVersion,
    /// Compression codec this reader does not handle.
    UnsupportedCodec,
    /// Value or level encoding this reader does not handle.
    UnsupportedEncoding,
    /// Column path does not resolve to a leaf.
    ColumnNotFound,
    /// Positional index out of bounds.
    IndexOutOfRange,
    /// Scan stopped by a cancellation signal.
    Cancelled,
}

impl ErrorKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Io => "IO error",
            Self::CorruptFooter => "Corrupt footer",
            Self::CorruptSchema => "Corrupt schema",
            Self::CorruptPage => "Corrupt page",
            Self::UnsupportedVersion => "Unsupported version",
            Self::UnsupportedCodec => "Unsupported codec",
            Self::UnsupportedEncoding => "Unsupported encoding",
            Self::ColumnNotFound => "Column not found",
            Self::IndexOutOfRange => "Index out of range",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct PqError {
    inner: Box<PqErrorInner>,
}

#[derive(Debug)]
struct PqErrorInner {
    kind: ErrorKind,
    msg: String,
    source: Option<Box<dyn Error + Send + Sync>>,
    /// Extra structured context, printed after the message.
    fields: Vec<(&'static str, String)>,
}

impl PqError {
    pub fn new(kind: ErrorKind, msg: impl Into<String>) -> Self {
        PqError {
            inner: Box::new(PqErrorInner {
                kind,
                msg: msg.into(),
                source: None,
                fields: Vec::new(),
            }),
        }
    }

    pub fn with_source(
        kind: ErrorKind,
        msg: impl Into<String>,
        source: Box<dyn Error + Send + Sync>,
    ) -> Self {
        PqError {
            inner: Box::new(PqErrorInner {
                kind,
                msg: msg.into(),
                source: Some(source),
                fields: Vec::new(),
            }),
        }
    }

    /// Attach a key/value pair to the error.
    pub fn with_field(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        self.inner.fields.push((key, value.to_string()));
        self
    }

    /// Reclassify the error, keeping message, fields and source.
    ///
    /// Used when a shared decoding routine fails and the caller knows which
    /// layer (footer, page, ...) the bytes came from.
    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.inner.kind = kind;
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.inner.kind
    }

    pub fn message(&self) -> &str {
        &self.inner.msg
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.inner
            .fields
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Only byte source failures may succeed when retried. Corruption and
    /// unsupported features are deterministic.
    pub fn is_retryable(&self) -> bool {
        self.inner.kind == ErrorKind::Io
    }
}

impl fmt::Display for PqError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.inner.kind, self.inner.msg)?;

        if !self.inner.fields.is_empty() {
            f.write_str(" (")?;
            for (idx, (key, value)) in self.inner.fields.iter().enumerate() {
                if idx > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{key}: {value}")?;
            }
            f.write_str(")")?;
        }

        if let Some(source) = &self.inner.source {
            write!(f, "\nError source: {source}")?;
        }

        Ok(())
    }
}

impl Error for PqError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.inner.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl From<std::io::Error> for PqError {
    fn from(e: std::io::Error) -> Self {
        PqError::with_source(ErrorKind::Io, "Byte source failure", Box::new(e))
    }
}

/// Wrap foreign errors with a classified message.
pub trait ResultExt<T> {
    fn context(self, kind: ErrorKind, msg: &'static str) -> Result<T>;

    fn context_fn<F>(self, kind: ErrorKind, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Error + Send + Sync + 'static,
{
    fn context(self, kind: ErrorKind, msg: &'static str) -> Result<T> {
        self.map_err(|e| PqError::with_source(kind, msg, Box::new(e)))
    }

    fn context_fn<F>(self, kind: ErrorKind, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| PqError::with_source(kind, f(), Box::new(e)))
    }
}

pub trait OptionExt<T> {
    fn required(self, kind: ErrorKind, msg: &'static str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn required(self, kind: ErrorKind, msg: &'static str) -> Result<T> {
        match self {
            Some(v) => Ok(v),
            None => Err(PqError::new(kind, msg)),
        }
    }
}
