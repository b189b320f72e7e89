//! Lzip member framing.
//!
//! An lzip file is one or more members, each a 6-byte header, a raw LZMA
//! stream terminated by an end-of-payload marker, and a 20-byte trailer:
//!
//! ```text
//! +------+----+----+=============+--------+-----------+-------------+
//! | LZIP | VN | DS | LZMA stream | CRC-32 | data size | member size |
//! +------+----+----+=============+--------+-----------+-------------+
//!    4     1    1                    4         8            8
//! ```
//!
//! The LZMA stream itself is decoded by liblzma (through `xz2`). Each member
//! gets a fresh `.lzma` decoder primed with a synthetic 13-byte header that
//! declares lzip's fixed properties and an unknown unpacked size, so the
//! decoder stops at the end-of-payload marker. This module parses the
//! framing and checks the trailer.

use std::io::{self, BufRead, BufReader, Read};
use streamarc_core::StreamArcError;
use xz2::stream::{Action, Status, Stream};

/// Lzip magic bytes.
pub const LZIP_MAGIC: [u8; 4] = *b"LZIP";

/// Header size (magic + version + coded dictionary size).
const HEADER_SIZE: usize = 6;

/// Trailer size (CRC-32 + data size + member size).
const TRAILER_SIZE: usize = 20;

/// Size of the `.lzma` header fed to the decoder before each member.
pub const LZMA_HEADER_SIZE: usize = 13;

/// LZMA properties byte for lc=3, lp=0, pb=2, the only values lzip uses.
const LZMA_PROPERTIES: u8 = 0x5D;

/// Smallest and largest dictionary sizes lzip allows.
const MIN_DICT_SIZE: u32 = 1 << 12;
const MAX_DICT_SIZE: u32 = 1 << 29;

/// Decode the coded dictionary size byte of an lzip header.
///
/// Bits 4-0 hold the base-2 logarithm of the base size, bits 7-5 the number
/// of sixteenths of the base size to subtract.
pub fn decode_dict_size(coded: u8) -> Option<u32> {
    let log = u32::from(coded & 0x1F);
    if !(12..=29).contains(&log) {
        return None;
    }
    let base = 1u32 << log;
    let size = base - (base / 16) * u32::from(coded >> 5);
    (MIN_DICT_SIZE..=MAX_DICT_SIZE)
        .contains(&size)
        .then_some(size)
}

/// The `.lzma` header describing an lzip member's LZMA stream.
fn lzma_header(dict_size: u32) -> [u8; LZMA_HEADER_SIZE] {
    let mut header = [0xFFu8; LZMA_HEADER_SIZE];
    header[0] = LZMA_PROPERTIES;
    header[1..5].copy_from_slice(&dict_size.to_le_bytes());
    header
}

/// Create a member decoder that has already consumed its `.lzma` header.
fn member_decoder(dict_size: u32) -> io::Result<Stream> {
    let mut stream = Stream::new_lzma_decoder(u64::MAX).map_err(invalid_data)?;
    let header = lzma_header(dict_size);
    while (stream.total_in() as usize) < LZMA_HEADER_SIZE {
        let fed = stream.total_in() as usize;
        stream
            .process(&header[fed..], &mut [], Action::Run)
            .map_err(invalid_data)?;
        if stream.total_in() as usize == fed {
            return Err(invalid_data("lzma decoder rejected the member header"));
        }
    }
    Ok(stream)
}

fn invalid_data<E>(err: E) -> io::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    io::Error::new(io::ErrorKind::InvalidData, err)
}

enum State {
    /// Expecting a member header; `first` is true before the first member.
    Header { first: bool },
    /// Inside a member's LZMA stream.
    Body(Box<Stream>),
    /// All members decoded.
    Done,
}

/// A trailer field disagreeing with the decoded member.
fn corrupted(offset: u64, message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, StreamArcError::corrupted(offset, message))
}

/// Streaming lzip decoder.
///
/// The header is parsed lazily on the first read, so constructing the
/// decoder never touches the source.
pub struct LzipDecoder<R> {
    inner: BufReader<R>,
    state: State,
    crc: crc32fast::Hasher,
    /// Bytes decoded from the current member.
    data_size: u64,
    /// Bytes decoded from all members.
    total_out: u64,
}

impl<R: Read> LzipDecoder<R> {
    /// Create a decoder over an lzip source.
    pub fn new(reader: R) -> Self {
        Self {
            inner: BufReader::new(reader),
            state: State::Header { first: true },
            crc: crc32fast::Hasher::new(),
            data_size: 0,
            total_out: 0,
        }
    }

    /// Get a reference to the underlying reader.
    pub fn get_ref(&self) -> &R {
        self.inner.get_ref()
    }

    /// Parse a member header. `Ok(None)` means there are no more members.
    fn read_header(&mut self, first: bool) -> io::Result<Option<Stream>> {
        let mut header = [0u8; HEADER_SIZE];
        let got = read_full(&mut self.inner, &mut header)?;

        if !first && (got == 0 || !header.starts_with(&LZIP_MAGIC)) {
            // Anything after the last member is trailing data, not ours.
            return Ok(None);
        }
        if got < HEADER_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "truncated lzip header",
            ));
        }
        if !header.starts_with(&LZIP_MAGIC) {
            return Err(invalid_data("missing lzip magic"));
        }
        if header[4] != 1 {
            return Err(invalid_data(format!("unsupported lzip version {}", header[4])));
        }
        let dict_size = decode_dict_size(header[5]).ok_or_else(|| {
            invalid_data(format!("invalid lzip dictionary size byte {:#04x}", header[5]))
        })?;

        member_decoder(dict_size).map(Some)
    }

    /// Check the trailer of the member whose LZMA stream just ended.
    fn finish_member(&mut self, packed_size: u64) -> io::Result<()> {
        let mut trailer = [0u8; TRAILER_SIZE];
        self.inner.read_exact(&mut trailer)?;

        let crc = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
        let data_size = u64::from_le_bytes(trailer[4..12].try_into().map_err(invalid_data)?);
        let member_size = u64::from_le_bytes(trailer[12..20].try_into().map_err(invalid_data)?);

        let computed = std::mem::take(&mut self.crc).finalize();
        if crc != computed {
            return Err(corrupted(
                self.total_out,
                format!("lzip CRC mismatch: expected {crc:#010x}, computed {computed:#010x}"),
            ));
        }
        if data_size != self.data_size {
            return Err(corrupted(
                self.total_out,
                format!(
                    "lzip data size mismatch: trailer says {data_size}, decoded {}",
                    self.data_size
                ),
            ));
        }
        let expected_member = (HEADER_SIZE + TRAILER_SIZE) as u64 + packed_size;
        if member_size != expected_member {
            return Err(corrupted(
                self.total_out,
                format!(
                    "lzip member size mismatch: trailer says {member_size}, read {expected_member}"
                ),
            ));
        }

        self.data_size = 0;
        Ok(())
    }
}

impl<R: Read> Read for LzipDecoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        loop {
            let stream = match &mut self.state {
                State::Done => return Ok(0),
                State::Header { first } => {
                    let first = *first;
                    self.state = match self.read_header(first)? {
                        Some(stream) => State::Body(Box::new(stream)),
                        None => State::Done,
                    };
                    continue;
                }
                State::Body(stream) => stream,
            };

            let input = self.inner.fill_buf()?;
            let eof = input.is_empty();
            let before_in = stream.total_in();
            let before_out = stream.total_out();
            let status = stream
                .process(input, buf, Action::Run)
                .map_err(invalid_data)?;
            let consumed = (stream.total_in() - before_in) as usize;
            let produced = (stream.total_out() - before_out) as usize;
            let packed_size = stream.total_in() - LZMA_HEADER_SIZE as u64;
            self.inner.consume(consumed);

            self.crc.update(&buf[..produced]);
            self.data_size += produced as u64;
            self.total_out += produced as u64;

            if status == Status::StreamEnd {
                self.finish_member(packed_size)?;
                self.state = State::Header { first: false };
                if produced > 0 {
                    return Ok(produced);
                }
                continue;
            }
            if produced > 0 {
                return Ok(produced);
            }
            if eof {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "lzip stream ended before end-of-payload marker",
                ));
            }
            if consumed == 0 {
                return Err(invalid_data("lzip stream made no progress"));
            }
        }
    }
}

/// Read until `buf` is full or the source ends; returns bytes read.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
