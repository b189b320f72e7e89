//! Error types for streamarc operations.
//!
//! One error type covers the whole session lifecycle: envelope detection
//! failures reported by `open`, mid-stream failures reported at the
//! offending read, and cursor discipline violations that are local to the
//! call that triggered them.

use std::io;
use thiserror::Error;

/// The main error type for streamarc operations.
#[derive(Debug, Error)]
pub enum StreamArcError {
    /// I/O error from the underlying source or decoder.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// No envelope matched and the raw stream is not a recognized container.
    #[error("Format mismatch: input is not a {container} archive")]
    FormatMismatch {
        /// Name of the container format that was expected.
        container: &'static str,
    },

    /// An envelope signature matched but its decoded content is not a valid container.
    #[error("Corrupt {envelope} envelope: decoded content is not a valid {container} archive")]
    CorruptEnvelope {
        /// Name of the envelope whose signature matched.
        envelope: &'static str,
        /// Name of the container format that was expected inside it.
        container: &'static str,
    },

    /// The decode stream ended before an entry's declared size was satisfied.
    #[error("Premature end of stream: expected {expected} more bytes")]
    PrematureEnd {
        /// Number of payload bytes still outstanding.
        expected: u64,
    },

    /// Cooperative cancellation was observed.
    #[error("Operation cancelled")]
    Cancelled,

    /// The next entry was requested while the current payload is still open.
    #[error("Entry {name} is still being read")]
    EntryInProgress {
        /// Name of the entry whose payload is incomplete.
        name: String,
    },

    /// A payload was requested for an entry that is not the cursor's current entry.
    #[error("Entry {name} is not the current entry")]
    EntryNotCurrent {
        /// Name of the stale entry.
        name: String,
    },

    /// The payload of the current entry was already handed out.
    #[error("Payload of entry {name} was already opened")]
    PayloadConsumed {
        /// Name of the entry.
        name: String,
    },

    /// The session is closed and produces no further entries.
    #[error("Archive session is closed")]
    ArchiveClosed,

    /// Invalid header format.
    #[error("Invalid header: {message}")]
    InvalidHeader {
        /// Description of the header error.
        message: String,
    },

    /// Corrupted data in the decode stream.
    #[error("Corrupted data at offset {offset}: {message}")]
    CorruptedData {
        /// Byte offset where corruption was detected.
        offset: u64,
        /// Description of the corruption.
        message: String,
    },

    /// Path traversal attack detected (e.g., "../" in filename).
    #[error("Path traversal detected in entry: {path}")]
    PathTraversal {
        /// The suspicious path.
        path: String,
    },
}

/// Result type alias for streamarc operations.
pub type Result<T> = std::result::Result<T, StreamArcError>;

impl StreamArcError {
    /// Create a format mismatch error.
    pub fn format_mismatch(container: &'static str) -> Self {
        Self::FormatMismatch { container }
    }

    /// Create a corrupt envelope error.
    pub fn corrupt_envelope(envelope: &'static str, container: &'static str) -> Self {
        Self::CorruptEnvelope {
            envelope,
            container,
        }
    }

    /// Create a premature end error.
    pub fn premature_end(expected: u64) -> Self {
        Self::PrematureEnd { expected }
    }

    /// Create an entry-in-progress error.
    pub fn entry_in_progress(name: impl Into<String>) -> Self {
        Self::EntryInProgress { name: name.into() }
    }

    /// Create an entry-not-current error.
    pub fn entry_not_current(name: impl Into<String>) -> Self {
        Self::EntryNotCurrent { name: name.into() }
    }

    /// Create a payload-consumed error.
    pub fn payload_consumed(name: impl Into<String>) -> Self {
        Self::PayloadConsumed { name: name.into() }
    }

    /// Create an invalid header error.
    pub fn invalid_header(message: impl Into<String>) -> Self {
        Self::InvalidHeader {
            message: message.into(),
        }
    }

    /// Create a corrupted data error.
    pub fn corrupted(offset: u64, message: impl Into<String>) -> Self {
        Self::CorruptedData {
            offset,
            message: message.into(),
        }
    }

    /// Create a path traversal error.
    pub fn path_traversal(path: impl Into<String>) -> Self {
        Self::PathTraversal { path: path.into() }
    }

    /// Recover an error that travelled through an `io::Error`.
    ///
    /// Payload readers implement `std::io::Read`, so their failures reach
    /// callers of `io::copy` wrapped in an `io::Error`.
    pub fn from_io(err: io::Error) -> Self {
        if !err.get_ref().is_some_and(|inner| inner.is::<Self>()) {
            return Self::Io(err);
        }
        let kind = err.kind();
        match err.into_inner().map(|inner| inner.downcast::<Self>()) {
            Some(Ok(inner)) => *inner,
            Some(Err(other)) => Self::Io(io::Error::new(kind, other)),
            None => Self::Io(io::Error::from(kind)),
        }
    }

    /// Whether this error leaves the session usable.
    ///
    /// Cursor discipline violations are rejected before any byte is read;
    /// everything else means the stream position can no longer be trusted.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::EntryInProgress { .. }
                | Self::EntryNotCurrent { .. }
                | Self::PayloadConsumed { .. }
        )
    }
}

impl From<StreamArcError> for io::Error {
    fn from(err: StreamArcError) -> Self {
        match err {
            StreamArcError::Io(e) => e,
            StreamArcError::PrematureEnd { .. } => {
                io::Error::new(io::ErrorKind::UnexpectedEof, err)
            }
            StreamArcError::CorruptedData { .. } => {
                io::Error::new(io::ErrorKind::InvalidData, err)
            }
            other => io::Error::other(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StreamArcError::corrupt_envelope("bzip2", "tar");
        assert!(err.to_string().contains("bzip2"));
        assert!(err.to_string().contains("tar"));

        let err = StreamArcError::premature_end(42);
        assert!(err.to_string().contains("42"));

        let err = StreamArcError::format_mismatch("tar");
        assert!(err.to_string().contains("not a tar archive"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: StreamArcError = io_err.into();
        assert!(matches!(err, StreamArcError::Io(_)));
    }

    #[test]
    fn test_into_io_error_kinds() {
        let err: io::Error = StreamArcError::premature_end(3).into();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);

        // Interrupted would make std's read loops retry forever.
        let err: io::Error = StreamArcError::Cancelled.into();
        assert_eq!(err.kind(), io::ErrorKind::Other);
        assert!(matches!(StreamArcError::from_io(err), StreamArcError::Cancelled));

        let inner = io::Error::new(io::ErrorKind::BrokenPipe, "pipe");
        let err: io::Error = StreamArcError::Io(inner).into();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert!(matches!(StreamArcError::from_io(err), StreamArcError::Io(_)));

        let err: io::Error = StreamArcError::corrupted(7, "bad crc").into();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(matches!(
            StreamArcError::from_io(err),
            StreamArcError::CorruptedData { offset: 7, .. }
        ));

        let err: io::Error = StreamArcError::premature_end(9).into();
        assert!(matches!(
            StreamArcError::from_io(err),
            StreamArcError::PrematureEnd { expected: 9 }
        ));
    }

    #[test]
    fn test_local_errors() {
        assert!(StreamArcError::entry_in_progress("a").is_local());
        assert!(StreamArcError::payload_consumed("a").is_local());
        assert!(!StreamArcError::Cancelled.is_local());
        assert!(!StreamArcError::premature_end(1).is_local());
    }
}
