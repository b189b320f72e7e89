//! Archive session entry point.

use crate::cursor::{CursorState, EntryCursor};
use crate::payload::EntryReader;
use crate::sniff::FormatSniffer;
use crate::tar::TarFormat;
use std::io::{self, Read, Write};
use streamarc_core::error::{Result, StreamArcError};
use streamarc_core::{CancelToken, CompressionType, ContainerFormat, Entry};
use tracing::debug;

/// Default chunk size used when skipping unread payload bytes.
pub const DEFAULT_SKIP_BUFFER_SIZE: usize = 32 * 1024;

/// Options for opening an archive session.
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    /// Token checked before every read; fire it to stop the session.
    pub cancel_token: CancelToken,
    /// Chunk size for skipping unread payload bytes.
    pub skip_buffer_size: usize,
    /// Fail `next_entry` for absolute or `..` entry names.
    pub reject_unsafe_paths: bool,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            cancel_token: CancelToken::new(),
            skip_buffer_size: DEFAULT_SKIP_BUFFER_SIZE,
            reject_unsafe_paths: false,
        }
    }
}

impl ReaderOptions {
    /// Create default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an existing cancellation token.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel_token = token;
        self
    }

    /// Set the skip chunk size.
    pub fn with_skip_buffer_size(mut self, size: usize) -> Self {
        self.skip_buffer_size = size;
        self
    }

    /// Reject entries whose names would escape the extraction root.
    pub fn with_reject_unsafe_paths(mut self, reject: bool) -> Self {
        self.reject_unsafe_paths = reject;
        self
    }
}

/// A forward-only read session over one archive.
///
/// # Example
///
/// ```no_run
/// use std::fs::File;
/// use streamarc_reader::{ArchiveReader, ReaderOptions};
///
/// let file = File::open("backup.tar.gz")?;
/// let mut archive = ArchiveReader::open(file, ReaderOptions::default())?;
/// while let Some(entry) = archive.next_entry()? {
///     println!("{}", entry);
/// }
/// # Ok::<(), streamarc_core::StreamArcError>(())
/// ```
pub struct ArchiveReader<'a> {
    cursor: EntryCursor<'a>,
    compression: CompressionType,
}

impl<'a> ArchiveReader<'a> {
    /// Open a TAR archive, detecting its compression envelope.
    pub fn open<R: Read + 'a>(source: R, options: ReaderOptions) -> Result<Self> {
        Self::open_with(source, TarFormat::new(), options)
    }

    /// Open an archive of the given container format.
    pub fn open_with<R, F>(source: R, format: F, options: ReaderOptions) -> Result<Self>
    where
        R: Read + 'a,
        F: ContainerFormat + 'a,
    {
        options.cancel_token.check()?;
        let outcome = FormatSniffer::new(&format).sniff(source)?;
        debug!(
            container = format.name(),
            compression = outcome.compression.name(),
            "opened archive session"
        );
        Ok(Self {
            cursor: EntryCursor::new(outcome.stream, Box::new(format), &options),
            compression: outcome.compression,
        })
    }

    /// Detected compression envelope.
    pub fn compression(&self) -> CompressionType {
        self.compression
    }

    /// Cursor lifecycle state.
    pub fn state(&self) -> CursorState {
        self.cursor.state()
    }

    /// The session's cancellation token. Clones may be fired from any thread.
    pub fn cancel_token(&self) -> &CancelToken {
        self.cursor.cancel_token()
    }

    /// Cancel and close the session.
    pub fn cancel(&mut self) {
        self.cursor.cancel_token().cancel();
        self.cursor.close("cancelled by caller");
    }

    /// Advance to the next entry, skipping any unread payload.
    pub fn next_entry(&mut self) -> Result<Option<Entry>> {
        self.cursor.next_entry()
    }

    /// Open the payload of the current entry.
    pub fn open_payload(&mut self, entry: &Entry) -> Result<EntryReader<'_, 'a>> {
        self.cursor.open_payload(entry)
    }

    /// Skip the payload of the current entry.
    pub fn skip_entry(&mut self, entry: &Entry) -> Result<u64> {
        self.cursor.skip_entry(entry)
    }

    /// Copy the payload of the current entry into `writer`.
    pub fn extract_to<W: Write + ?Sized>(&mut self, entry: &Entry, writer: &mut W) -> Result<u64> {
        let mut reader = self.open_payload(entry)?;
        let copied = io::copy(&mut reader, writer).map_err(StreamArcError::from_io)?;
        reader.release()?;
        Ok(copied)
    }
}

impl std::fmt::Debug for ArchiveReader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveReader")
            .field("compression", &self.compression)
            .field("cursor", &self.cursor)
            .finish()
    }
}
