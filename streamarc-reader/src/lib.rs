//! # streamarc reader
//!
//! Forward-only archive reading over non-seekable sources.
//!
//! An [`ArchiveReader`] session wraps any [`std::io::Read`] source, detects
//! the compression envelope without seeking, and walks the container's
//! entries one at a time:
//!
//! - **Envelopes**: gzip, bzip2, lzip and xz, tried in that order
//! - **Containers**: TAR (UStar, PAX, GNU long names); other formats plug in
//!   through [`streamarc_core::ContainerFormat`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::io::{self, Read};
//! use streamarc_reader::{ArchiveReader, ReaderOptions};
//!
//! let stdin = io::stdin().lock();
//! let mut archive = ArchiveReader::open(stdin, ReaderOptions::default())?;
//! println!("compression: {}", archive.compression());
//!
//! while let Some(entry) = archive.next_entry()? {
//!     if entry.name.ends_with(".txt") {
//!         let mut text = String::new();
//!         archive.open_payload(&entry)?.read_to_string(&mut text)?;
//!         println!("{}: {} chars", entry.name, text.len());
//!     }
//!     // Unread payloads are skipped automatically.
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Envelope detection
//!
//! Use [`detect_compression`] for a magic-only check that does not check
//! the decoded content.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod cursor;
pub mod envelope;
pub mod lzip;
pub mod payload;
pub mod reader;
pub mod sniff;
pub mod tar;

// Re-exports
pub use cursor::{CursorState, EntryCursor};
pub use envelope::detect_compression;
pub use lzip::LzipDecoder;
pub use payload::EntryReader;
pub use reader::{ArchiveReader, DEFAULT_SKIP_BUFFER_SIZE, ReaderOptions};
pub use sniff::{FormatSniffer, SniffOutcome};
pub use tar::{TarFormat, TarHeader};
