//! Core traits for container formats.
//!
//! A container format is a strategy object injected into the reader's entry
//! cursor. It supplies the envelopes worth sniffing for, a signature check
//! over decoded bytes, and a metadata decoder that turns the shared decode
//! stream into a lazy sequence of entries.

use crate::cancel::CancelToken;
use crate::compression::{CompressionType, SNIFF_ORDER};
use crate::entry::Entry;
use crate::error::Result;
use std::io::Read;

/// A container format readable in streaming (forward-only) mode.
pub trait ContainerFormat {
    /// Short lowercase name, used in errors and logs.
    fn name(&self) -> &'static str;

    /// Envelope candidates to try, highest priority first.
    fn envelopes(&self) -> &[CompressionType] {
        &SNIFF_ORDER
    }

    /// Check whether `source` starts with this container's signature.
    ///
    /// Consumes only as many bytes as needed and never seeks. Short input
    /// yields `Ok(false)`; decoder failures inside `source` surface as `Err`.
    fn is_signature(&self, source: &mut dyn Read) -> Result<bool>;

    /// Decode the next entry header from `stream`.
    ///
    /// Called with the stream positioned right after the previous entry's
    /// declared payload; any format-specific padding after that payload is
    /// the decoder's to consume. Returns `Ok(None)` at the end of the archive.
    fn next_entry(&mut self, stream: &mut dyn Read, cancel: &CancelToken) -> Result<Option<Entry>>;
}

/// Boxed formats forward to the inner strategy.
impl<F: ContainerFormat + ?Sized> ContainerFormat for Box<F> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn envelopes(&self) -> &[CompressionType] {
        (**self).envelopes()
    }

    fn is_signature(&self, source: &mut dyn Read) -> Result<bool> {
        (**self).is_signature(source)
    }

    fn next_entry(&mut self, stream: &mut dyn Read, cancel: &CancelToken) -> Result<Option<Entry>> {
        (**self).next_entry(stream, cancel)
    }
}
