use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::column::encoding::{BuiltinValueDecoder, ValueDecoder};
use crate::compression::{BuiltinDecompressor, Decompressor};

/// Cooperative cancellation flag shared between a caller and page cursors.
///
/// Cursors check it before decoding each page.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    cancelled: Arc<AtomicBool>,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone)]
pub struct ReaderOptions {
    pub decompressor: Arc<dyn Decompressor>,
    pub value_decoder: Arc<dyn ValueDecoder>,
    /// Reject footers with a metadata block larger than this.
    pub max_footer_len: Option<usize>,
    /// Check page CRCs when the writer recorded them.
    pub verify_page_checksums: bool,
    pub cancel: Option<CancelSignal>,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        ReaderOptions {
            decompressor: Arc::new(BuiltinDecompressor),
            value_decoder: Arc::new(BuiltinValueDecoder),
            max_footer_len: None,
            verify_page_checksums: true,
            cancel: None,
        }
    }
}

impl ReaderOptions {
    pub fn with_decompressor(mut self, decompressor: Arc<dyn Decompressor>) -> Self {
        self.decompressor = decompressor;
        self
    }

    pub fn with_value_decoder(mut self, decoder: Arc<dyn ValueDecoder>) -> Self {
        self.value_decoder = decoder;
        self
    }

    pub fn with_max_footer_len(mut self, len: usize) -> Self {
        self.max_footer_len = Some(len);
        self
    }

    pub fn with_page_checksums(mut self, verify: bool) -> Self {
        self.verify_page_checksums = verify;
        self
    }

    pub fn with_cancel_signal(mut self, signal: CancelSignal) -> Self {
        self.cancel = Some(signal);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_is_shared_between_clones() {
        let signal = CancelSignal::new();
        let opts = ReaderOptions::default().with_cancel_signal(signal.clone());
        let cloned = opts.clone();
        assert!(!opts.cancel.as_ref().unwrap().is_cancelled());

        signal.cancel();
        assert!(opts.cancel.as_ref().unwrap().is_cancelled());
        assert!(cloned.cancel.as_ref().unwrap().is_cancelled());
    }

    #[test]
    fn defaults() {
        let opts = ReaderOptions::default();
        assert!(opts.verify_page_checksums);
        assert_eq!(None, opts.max_footer_len);
        assert!(opts.cancel.is_none());
    }
}
