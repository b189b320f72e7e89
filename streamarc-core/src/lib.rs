//! # streamarc core
//!
//! Core components for the streamarc archive reader.
//!
//! This crate provides the building blocks shared by every container format:
//!
//! - [`lookahead`]: Recording/replaying wrapper for forward-only sources
//! - [`cancel`]: Cooperative cancellation token
//! - [`compression`]: Compression envelope identification
//! - [`traits`]: The container format strategy trait
//! - [`entry`]: Archive entry metadata
//! - [`error`]: Error types
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Session (streamarc-reader)                              │
//! │     ArchiveReader, EntryCursor, EntryReader             │
//! ├─────────────────────────────────────────────────────────┤
//! │ Detection (streamarc-reader)                            │
//! │     FormatSniffer, envelope decoders                    │
//! ├─────────────────────────────────────────────────────────┤
//! │ Source (this crate)                                     │
//! │     LookaheadStream, CancelToken, ContainerFormat       │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use streamarc_core::lookahead::{LookaheadStream, RewindMode};
//! use std::io::{Cursor, Read};
//!
//! let mut stream = LookaheadStream::new(Cursor::new(b"BZh9 not really".to_vec()));
//! stream.start_recording();
//! let mut magic = [0u8; 4];
//! stream.read_exact(&mut magic).unwrap();
//! stream.rewind(RewindMode::Replay);
//!
//! let mut all = Vec::new();
//! stream.read_to_end(&mut all).unwrap();
//! assert_eq!(all, b"BZh9 not really");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod cancel;
pub mod compression;
pub mod entry;
pub mod error;
pub mod lookahead;
pub mod traits;

// Re-exports for convenience
pub use cancel::CancelToken;
pub use compression::CompressionType;
pub use entry::{Entry, EntryType, FileAttributes};
pub use error::{Result, StreamArcError};
pub use lookahead::{LookaheadStream, RewindMode};
pub use traits::ContainerFormat;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::cancel::CancelToken;
    pub use crate::compression::CompressionType;
    pub use crate::entry::{Entry, EntryType};
    pub use crate::error::{Result, StreamArcError};
    pub use crate::lookahead::{LookaheadStream, RewindMode};
    pub use crate::traits::ContainerFormat;
}
