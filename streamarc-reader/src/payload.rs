//! Payload reader for the current entry.
//!
//! [`EntryReader`] borrows the cursor mutably, so the compiler rules out a
//! second live reader or advancing the cursor while payload bytes are being
//! read. Dropping or releasing the reader skips what was left unread, unless
//! the session has been cancelled or closed.

use crate::cursor::EntryCursor;
use std::io::{self, Read};
use streamarc_core::Entry;
use streamarc_core::error::Result;
use tracing::warn;

/// Read-only view of one entry's payload bytes.
pub struct EntryReader<'c, 'a> {
    cursor: &'c mut EntryCursor<'a>,
    entry: Entry,
    completed: bool,
    released: bool,
}

impl<'c, 'a> EntryReader<'c, 'a> {
    pub(crate) fn new(cursor: &'c mut EntryCursor<'a>, entry: Entry) -> Self {
        Self {
            cursor,
            entry,
            completed: false,
            released: false,
        }
    }

    /// The entry this payload belongs to.
    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    /// Declared payload size.
    pub fn len(&self) -> u64 {
        self.entry.size
    }

    /// Whether the declared payload size is zero.
    pub fn is_empty(&self) -> bool {
        self.entry.size == 0
    }

    /// Payload bytes not yet read.
    pub fn remaining(&self) -> u64 {
        self.cursor.remaining()
    }

    /// Whether every declared byte has been consumed.
    ///
    /// Once set this stays set, even if the session closes later.
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Read the next chunk of payload. `Ok(0)` means the entry is complete.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = self.cursor.read_payload(buf)?;
        self.observe_end();
        Ok(n)
    }

    /// Discard the rest of the payload. Returns the bytes skipped.
    pub fn skip_to_end(&mut self) -> Result<u64> {
        let skipped = self.cursor.skip_remaining()?;
        self.observe_end();
        Ok(skipped)
    }

    /// Finish with this payload, skipping any unread bytes.
    pub fn release(mut self) -> Result<()> {
        self.teardown()
    }

    fn observe_end(&mut self) {
        if self.cursor.remaining() == 0 {
            self.completed = true;
        }
    }

    fn teardown(&mut self) -> Result<()> {
        if std::mem::replace(&mut self.released, true) {
            return Ok(());
        }
        if self.cursor.is_closed() {
            return Ok(());
        }
        if self.cursor.cancel_token().is_cancelled() {
            self.cursor.close("cancelled");
            return Ok(());
        }
        self.cursor.skip_remaining()?;
        self.completed = true;
        Ok(())
    }
}

impl Read for EntryReader<'_, '_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        EntryReader::read(self, buf).map_err(io::Error::from)
    }
}

impl Drop for EntryReader<'_, '_> {
    fn drop(&mut self) {
        if let Err(err) = self.teardown() {
            warn!(entry = %self.entry.name, error = %err, "payload teardown failed");
        }
    }
}

impl std::fmt::Debug for EntryReader<'_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryReader")
            .field("entry", &self.entry.name)
            .field("len", &self.entry.size)
            .field("remaining", &self.cursor.remaining())
            .finish()
    }
}
