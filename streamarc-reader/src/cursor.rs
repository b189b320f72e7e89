//! Forward-only entry cursor.
//!
//! The cursor owns the committed decode stream and the container's metadata
//! decoder. Entries come out one at a time; payload bytes of the current
//! entry are handed out through at most one [`EntryReader`], and whatever
//! the caller leaves unread is skipped before the next header is decoded.
//!
//! ```text
//!          next_entry            open_payload
//!  Idle ──────────────► EntryReady ──────────► EntryOpen
//!                        │  ▲                      │
//!                        │  └──── payload drained ─┘
//!                        │
//!                        └── next_entry ──► EntryReady / Exhausted
//!
//!  any state ── cancel / premature end / I/O error ──► Closed
//! ```

use crate::payload::EntryReader;
use crate::reader::ReaderOptions;
use std::io::{self, Read};
use streamarc_core::error::{Result, StreamArcError};
use streamarc_core::{CancelToken, ContainerFormat, Entry};
use tracing::{debug, trace};

/// Cursor lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// No entry requested yet.
    Idle,
    /// An entry was produced and its payload is not being read.
    EntryReady,
    /// The payload of the current entry was handed out and has bytes left.
    EntryOpen,
    /// The container reported its end.
    Exhausted,
    /// Terminal: cancelled or failed.
    Closed,
}

/// Single-pass cursor over the entries of one archive session.
pub struct EntryCursor<'a> {
    stream: Box<dyn Read + 'a>,
    format: Box<dyn ContainerFormat + 'a>,
    cancel: CancelToken,
    state: CursorState,
    current: Option<Entry>,
    /// Payload bytes of the current entry not yet consumed.
    remaining: u64,
    payload_opened: bool,
    skip_buffer: Vec<u8>,
    reject_unsafe_paths: bool,
}

impl<'a> EntryCursor<'a> {
    pub(crate) fn new(
        stream: Box<dyn Read + 'a>,
        format: Box<dyn ContainerFormat + 'a>,
        options: &ReaderOptions,
    ) -> Self {
        Self {
            stream,
            format,
            cancel: options.cancel_token.clone(),
            state: CursorState::Idle,
            current: None,
            remaining: 0,
            payload_opened: false,
            skip_buffer: vec![0u8; options.skip_buffer_size.max(1)],
            reject_unsafe_paths: options.reject_unsafe_paths,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CursorState {
        self.state
    }

    /// The entry most recently produced, if it is still current.
    pub fn current(&self) -> Option<&Entry> {
        self.current.as_ref()
    }

    /// Payload bytes of the current entry not yet consumed.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// The session's cancellation token.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Advance to the next entry.
    ///
    /// Unread payload of the current entry is skipped first. Returns
    /// `Ok(None)` once the container is exhausted, and keeps doing so.
    pub fn next_entry(&mut self) -> Result<Option<Entry>> {
        match self.state {
            CursorState::Closed => return Err(self.closed_error()),
            CursorState::Exhausted => return Ok(None),
            CursorState::EntryOpen if self.remaining > 0 => {
                // Only reachable when a reader was leaked without teardown.
                let name = self.current.as_ref().map(|e| e.name.as_str()).unwrap_or_default();
                return Err(StreamArcError::entry_in_progress(name));
            }
            CursorState::EntryReady if self.remaining > 0 => {
                let skipped = self.skip_remaining()?;
                debug!(skipped, "skipped unopened payload");
            }
            _ => {}
        }

        self.check_cancelled()?;

        let decoded = self.format.next_entry(&mut *self.stream, &self.cancel);
        let entry = match decoded {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                debug!(container = self.format.name(), "archive exhausted");
                self.state = CursorState::Exhausted;
                self.current = None;
                self.remaining = 0;
                return Ok(None);
            }
            Err(err) => {
                self.close("metadata decode failed");
                return Err(err);
            }
        };

        debug!(name = %entry.name, size = entry.size, offset = entry.offset, "entry ready");
        self.state = CursorState::EntryReady;
        self.remaining = entry.size;
        self.payload_opened = false;
        self.current = Some(entry.clone());

        if self.reject_unsafe_paths {
            // The entry stays current so the next call skips its payload.
            entry.validate_path()?;
        }
        Ok(Some(entry))
    }

    /// Hand out the payload reader of the current entry.
    pub fn open_payload(&mut self, entry: &Entry) -> Result<EntryReader<'_, 'a>> {
        if self.state == CursorState::Closed {
            return Err(self.closed_error());
        }
        let is_current = matches!(self.state, CursorState::EntryReady | CursorState::EntryOpen)
            && self.current.as_ref().is_some_and(|c| c.offset == entry.offset);
        if !is_current {
            return Err(StreamArcError::entry_not_current(&entry.name));
        }
        if self.payload_opened {
            return Err(StreamArcError::payload_consumed(&entry.name));
        }

        self.payload_opened = true;
        self.state = CursorState::EntryOpen;
        Ok(EntryReader::new(self, entry.clone()))
    }

    /// Skip the payload of the current entry. Returns the bytes skipped.
    pub fn skip_entry(&mut self, entry: &Entry) -> Result<u64> {
        let mut reader = self.open_payload(entry)?;
        let skipped = reader.skip_to_end()?;
        reader.release()?;
        Ok(skipped)
    }

    /// Close the session. Further calls fail and no more bytes are read.
    pub fn close(&mut self, reason: &str) {
        if self.state != CursorState::Closed {
            debug!(reason, "archive session closed");
            self.state = CursorState::Closed;
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state == CursorState::Closed
    }

    /// Read payload bytes of the current entry, never past its declared size.
    pub(crate) fn read_payload(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.state == CursorState::Closed {
            return Err(self.closed_error());
        }
        self.check_cancelled()?;

        let want = (buf.len() as u64).min(self.remaining) as usize;
        if want == 0 {
            self.finish_payload();
            return Ok(0);
        }

        loop {
            match self.stream.read(&mut buf[..want]) {
                Ok(0) => {
                    let expected = self.remaining;
                    self.close("premature end of payload");
                    return Err(StreamArcError::premature_end(expected));
                }
                Ok(n) => {
                    self.remaining -= n as u64;
                    self.finish_payload();
                    return Ok(n);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.close("read failed");
                    return Err(StreamArcError::from_io(e));
                }
            }
        }
    }

    /// Read and discard the rest of the current payload in fixed chunks.
    pub(crate) fn skip_remaining(&mut self) -> Result<u64> {
        let mut scratch = std::mem::take(&mut self.skip_buffer);
        let mut skipped = 0u64;
        let result = loop {
            if self.remaining == 0 {
                self.finish_payload();
                break Ok(skipped);
            }
            match self.read_payload(&mut scratch) {
                Ok(n) => {
                    skipped += n as u64;
                    trace!(chunk = n, remaining = self.remaining, "skipped payload chunk");
                }
                Err(err) => break Err(err),
            }
        };
        self.skip_buffer = scratch;
        result
    }

    /// An open payload with nothing left hands the cursor back.
    fn finish_payload(&mut self) {
        if self.state == CursorState::EntryOpen && self.remaining == 0 {
            self.state = CursorState::EntryReady;
        }
    }

    fn check_cancelled(&mut self) -> Result<()> {
        if let Err(err) = self.cancel.check() {
            self.close("cancelled");
            return Err(err);
        }
        Ok(())
    }

    fn closed_error(&self) -> StreamArcError {
        if self.cancel.is_cancelled() {
            StreamArcError::Cancelled
        } else {
            StreamArcError::ArchiveClosed
        }
    }
}

impl std::fmt::Debug for EntryCursor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryCursor")
            .field("format", &self.format.name())
            .field("state", &self.state)
            .field("current", &self.current.as_ref().map(|e| &e.name))
            .field("remaining", &self.remaining)
            .finish_non_exhaustive()
    }
}
