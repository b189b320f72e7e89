//! Envelope decoders.
//!
//! Maps each [`CompressionType`] to a streaming decoder over any byte
//! source. Decoders are built lazily: construction never reads, so the
//! sniffer can wrap the same lookahead stream in one trial decoder after
//! another.

use crate::lzip::LzipDecoder;
use std::io::Read;
use streamarc_core::compression::{CompressionType, MAX_MAGIC_LEN};
use streamarc_core::error::Result;

/// Wrap `source` in the decoder for `kind`.
///
/// `CompressionType::None` returns the source itself.
pub fn decoder<'a, R: Read + 'a>(kind: CompressionType, source: R) -> Box<dyn Read + 'a> {
    match kind {
        CompressionType::None => Box::new(source),
        CompressionType::Gzip => Box::new(flate2::read::MultiGzDecoder::new(source)),
        CompressionType::Bzip2 => Box::new(bzip2::read::MultiBzDecoder::new(source)),
        CompressionType::Lzip => Box::new(LzipDecoder::new(source)),
        CompressionType::Xz => Box::new(xz2::read::XzDecoder::new_multi_decoder(source)),
    }
}

/// Read up to `MAX_MAGIC_LEN` leading bytes and identify the envelope.
///
/// This is a magic-only check: it does not check that the decoded content is
/// a valid container, and it consumes the bytes it reads. Returns the
/// detected type and the bytes that were read.
pub fn detect_compression<R: Read>(reader: &mut R) -> Result<(CompressionType, Vec<u8>)> {
    let mut magic = Vec::with_capacity(MAX_MAGIC_LEN);
    reader
        .take(MAX_MAGIC_LEN as u64)
        .read_to_end(&mut magic)?;
    Ok((CompressionType::from_magic(&magic), magic))
}

/// Test whether `source` starts with `kind`'s magic number.
///
/// Reads exactly `kind.magic_len()` bytes, or fewer if the source ends.
pub fn matches_magic(kind: CompressionType, source: &mut dyn Read) -> Result<bool> {
    let mut magic = Vec::with_capacity(kind.magic_len());
    source
        .take(kind.magic_len() as u64)
        .read_to_end(&mut magic)?;
    Ok(kind.matches_magic(&magic))
}
