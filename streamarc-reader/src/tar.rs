//! TAR container format.
//!
//! Streaming metadata decoder for TAR archives with support for:
//! - UStar format (POSIX.1-1988), including the name prefix field
//! - PAX extended headers (POSIX.1-2001), local and global
//! - GNU LongName / LongLink headers
//! - GNU base-256 numeric fields for sizes beyond the octal range
//!
//! Payload bytes are never read here; the entry cursor consumes exactly the
//! declared size and this decoder skips the block padding that follows.

use std::collections::HashMap;
use std::io::{self, Read};
use std::time::{Duration, UNIX_EPOCH};
use streamarc_core::error::{Result, StreamArcError};
use streamarc_core::{CancelToken, ContainerFormat, Entry, EntryType, FileAttributes};
use tracing::{debug, trace};

/// TAR block size.
pub const BLOCK_SIZE: usize = 512;

/// PAX typeflag for extended header (applies to next file only).
const PAX_HEADER: u8 = b'x';

/// PAX typeflag for global extended header (applies to all subsequent files).
const PAX_GLOBAL_HEADER: u8 = b'g';

/// GNU LongName typeflag.
const GNU_LONGNAME: u8 = b'L';

/// GNU LongLink typeflag.
const GNU_LONGLINK: u8 = b'K';

/// Upper bound for PAX and GNU long-name payloads kept in memory.
const MAX_EXTENSION_SIZE: u64 = 1024 * 1024;

/// Byte range of the checksum field.
const CHECKSUM_RANGE: std::ops::Range<usize> = 148..156;

/// Padding needed after `size` payload bytes to reach a block boundary.
pub fn block_padding(size: u64) -> u64 {
    let rem = size % BLOCK_SIZE as u64;
    if rem == 0 { 0 } else { BLOCK_SIZE as u64 - rem }
}

/// TAR header.
#[derive(Debug, Clone)]
pub struct TarHeader {
    /// File name (prefix already joined for UStar).
    pub name: String,
    /// File mode.
    pub mode: u32,
    /// Owner UID.
    pub uid: u32,
    /// Owner GID.
    pub gid: u32,
    /// File size.
    pub size: u64,
    /// Modification time.
    pub mtime: u64,
    /// Type flag.
    pub typeflag: u8,
    /// Link name.
    pub linkname: String,
    /// UStar indicator.
    pub ustar: bool,
    /// Owner name.
    pub uname: String,
    /// Group name.
    pub gname: String,
}

impl TarHeader {
    /// Parse a header block. Returns `Ok(None)` for an all-zero block.
    ///
    /// Fails if the checksum does not match the block contents.
    pub fn from_block(block: &[u8; BLOCK_SIZE]) -> Result<Option<Self>> {
        if is_zero_block(block) {
            return Ok(None);
        }

        let stored = Self::parse_numeric(&block[CHECKSUM_RANGE])?;
        if !checksum_matches(block, stored) {
            return Err(StreamArcError::invalid_header(format!(
                "checksum mismatch: stored {:o}, computed {:o}",
                stored,
                unsigned_checksum(block)
            )));
        }

        let name = Self::parse_string(&block[0..100]);
        let mode = Self::parse_id(&block[100..108], "mode")?;
        let uid = Self::parse_id(&block[108..116], "uid")?;
        let gid = Self::parse_id(&block[116..124], "gid")?;
        let size = Self::parse_numeric(&block[124..136])?;
        let mtime = Self::parse_numeric(&block[136..148])?;
        let typeflag = block[156];
        let linkname = Self::parse_string(&block[157..257]);

        let ustar = &block[257..262] == b"ustar";

        let (uname, gname, prefix) = if ustar {
            (
                Self::parse_string(&block[265..297]),
                Self::parse_string(&block[297..329]),
                Self::parse_string(&block[345..500]),
            )
        } else {
            (String::new(), String::new(), String::new())
        };

        let full_name = if prefix.is_empty() {
            name
        } else {
            format!("{}/{}", prefix, name)
        };

        Ok(Some(Self {
            name: full_name,
            mode,
            uid,
            gid,
            size,
            mtime,
            typeflag,
            linkname,
            ustar,
            uname,
            gname,
        }))
    }

    /// Parse a null-terminated string.
    fn parse_string(data: &[u8]) -> String {
        let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
        String::from_utf8_lossy(&data[..end]).into_owned()
    }

    /// Parse a numeric field: octal text, or GNU base-256 when the high bit is set.
    fn parse_numeric(data: &[u8]) -> Result<u64> {
        if let Some((&first, rest)) = data.split_first() {
            if first & 0x80 != 0 {
                if first & 0x40 != 0 {
                    return Err(StreamArcError::invalid_header("negative base-256 field"));
                }
                let mut value = u64::from(first & 0x3F);
                for &b in rest {
                    value = value
                        .checked_mul(256)
                        .and_then(|v| v.checked_add(u64::from(b)))
                        .ok_or_else(|| StreamArcError::invalid_header("base-256 field overflows"))?;
                }
                return Ok(value);
            }
        }

        let s = Self::parse_string(data);
        let s = s.trim_matches(|c: char| c == ' ' || c == '\0');
        if s.is_empty() {
            return Ok(0);
        }
        u64::from_str_radix(s, 8)
            .map_err(|_| StreamArcError::invalid_header(format!("Invalid octal: {}", s)))
    }

    /// Parse a numeric field that must fit in 32 bits.
    fn parse_id(data: &[u8], field: &str) -> Result<u32> {
        let value = Self::parse_numeric(data)?;
        u32::try_from(value).map_err(|_| {
            StreamArcError::invalid_header(format!(
                "{} field {} does not fit in 32 bits",
                field, value
            ))
        })
    }

    /// Get entry type.
    pub fn entry_type(&self) -> EntryType {
        match self.typeflag {
            b'0' | b'7' | 0 => EntryType::File,
            b'1' => EntryType::Hardlink,
            b'2' => EntryType::Symlink,
            b'3' => EntryType::CharDevice,
            b'4' => EntryType::BlockDevice,
            b'5' => EntryType::Directory,
            b'6' => EntryType::Fifo,
            _ => EntryType::Unknown,
        }
    }

    /// Number of payload bytes stored after this header.
    ///
    /// Link headers carry no data regardless of their size field.
    pub fn payload_size(&self) -> u64 {
        match self.entry_type() {
            EntryType::Hardlink | EntryType::Symlink => 0,
            _ => self.size,
        }
    }

    /// Check if this is a PAX extended header.
    pub fn is_pax_header(&self) -> bool {
        self.typeflag == PAX_HEADER
    }

    /// Check if this is a PAX global extended header.
    pub fn is_pax_global_header(&self) -> bool {
        self.typeflag == PAX_GLOBAL_HEADER
    }

    /// Check if this is a GNU LongName header.
    pub fn is_gnu_longname(&self) -> bool {
        self.typeflag == GNU_LONGNAME
    }

    /// Check if this is a GNU LongLink header.
    pub fn is_gnu_longlink(&self) -> bool {
        self.typeflag == GNU_LONGLINK
    }

    /// Apply PAX extended attributes to this header.
    pub fn apply_pax_attrs(&mut self, attrs: &HashMap<String, String>) {
        if let Some(path) = attrs.get("path") {
            self.name = path.clone();
        }
        if let Some(linkpath) = attrs.get("linkpath") {
            self.linkname = linkpath.clone();
        }
        if let Some(size) = attrs.get("size").and_then(|s| s.parse::<u64>().ok()) {
            self.size = size;
        }
        if let Some(mtime) = attrs.get("mtime") {
            // PAX mtime can be fractional; keep the integer part
            let whole = mtime.split('.').next().unwrap_or_default();
            if let Ok(t) = whole.parse::<u64>() {
                self.mtime = t;
            }
        }
        if let Some(uid) = attrs.get("uid").and_then(|s| s.parse::<u32>().ok()) {
            self.uid = uid;
        }
        if let Some(gid) = attrs.get("gid").and_then(|s| s.parse::<u32>().ok()) {
            self.gid = gid;
        }
        if let Some(uname) = attrs.get("uname") {
            self.uname = uname.clone();
        }
        if let Some(gname) = attrs.get("gname") {
            self.gname = gname.clone();
        }
    }

    /// Parse PAX extended header data.
    /// Format: "length key=value\n" repeated
    pub fn parse_pax_data(data: &[u8]) -> HashMap<String, String> {
        let mut attrs = HashMap::new();
        let mut pos = 0;

        while pos < data.len() {
            let space_pos = match data[pos..].iter().position(|&b| b == b' ') {
                Some(p) => pos + p,
                None => break,
            };

            let len_str = String::from_utf8_lossy(&data[pos..space_pos]);
            let record_len: usize = match len_str.trim().parse() {
                Ok(l) => l,
                Err(_) => break,
            };

            let Some(record_end) = pos.checked_add(record_len) else {
                break;
            };
            if record_len == 0 || record_end > data.len() || record_end <= space_pos {
                break;
            }

            let mut value_end = record_end;
            if data.get(value_end - 1) == Some(&b'\n') {
                value_end -= 1;
            }
            let record = &data[space_pos + 1..value_end];

            if let Some(eq_pos) = record.iter().position(|&b| b == b'=') {
                let key = String::from_utf8_lossy(&record[..eq_pos]).into_owned();
                let value = String::from_utf8_lossy(&record[eq_pos + 1..]).into_owned();
                attrs.insert(key, value);
            }

            pos = record_end;
        }

        attrs
    }

    /// Convert to Entry.
    pub fn to_entry(&self, offset: u64) -> Entry {
        let mut entry = Entry::file(&self.name, self.payload_size());
        entry.entry_type = self.entry_type();
        entry.modified = UNIX_EPOCH.checked_add(Duration::from_secs(self.mtime));
        entry.attributes = FileAttributes::new()
            .with_mode(self.mode)
            .with_owner(self.uid, self.gid);
        entry.offset = offset;

        if !self.linkname.is_empty() {
            entry.link_target = Some(self.linkname.clone().into());
        }
        if !self.uname.is_empty() {
            entry.user_name = Some(self.uname.clone());
        }
        if !self.gname.is_empty() {
            entry.group_name = Some(self.gname.clone());
        }

        entry
    }
}

fn is_zero_block(block: &[u8; BLOCK_SIZE]) -> bool {
    block.iter().all(|&b| b == 0)
}

/// Header checksum with the checksum field counted as spaces.
fn unsigned_checksum(block: &[u8; BLOCK_SIZE]) -> u64 {
    block
        .iter()
        .enumerate()
        .map(|(i, &b)| {
            if CHECKSUM_RANGE.contains(&i) {
                u64::from(b' ')
            } else {
                u64::from(b)
            }
        })
        .sum()
}

/// Some historic writers summed signed bytes.
fn signed_checksum(block: &[u8; BLOCK_SIZE]) -> i64 {
    block
        .iter()
        .enumerate()
        .map(|(i, &b)| {
            if CHECKSUM_RANGE.contains(&i) {
                i64::from(b' ')
            } else {
                i64::from(b as i8)
            }
        })
        .sum()
}

fn checksum_matches(block: &[u8; BLOCK_SIZE], stored: u64) -> bool {
    unsigned_checksum(block) == stored
        || i64::try_from(stored).is_ok_and(|s| signed_checksum(block) == s)
}

/// Read until `buf` is full or the stream ends; returns bytes read.
fn read_full(stream: &mut dyn Read, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match stream.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(StreamArcError::from_io(e)),
        }
    }
    Ok(filled)
}

/// Streaming TAR metadata decoder and signature checker.
#[derive(Debug, Default)]
pub struct TarFormat {
    /// Decoded-stream offset of the next header block.
    offset: u64,
    /// Padding still to skip after the previous entry's payload.
    pending_padding: u64,
    /// Attributes from PAX global headers.
    global_pax_attrs: HashMap<String, String>,
    /// Set once the end-of-archive block has been read.
    finished: bool,
}

impl TarFormat {
    /// Create a decoder positioned at the start of an archive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the payload of a PAX or GNU extension header, including padding.
    fn read_extension_data(&mut self, stream: &mut dyn Read, size: u64) -> Result<Vec<u8>> {
        if size > MAX_EXTENSION_SIZE {
            return Err(StreamArcError::invalid_header(format!(
                "extension header of {} bytes exceeds limit",
                size
            )));
        }
        let total = size + block_padding(size);
        let mut data = vec![0u8; total as usize];
        let got = read_full(stream, &mut data)?;
        if got < data.len() {
            return Err(StreamArcError::premature_end((data.len() - got) as u64));
        }
        self.advance(total)?;
        data.truncate(size as usize);
        Ok(data)
    }

    fn skip_padding(&mut self, stream: &mut dyn Read) -> Result<()> {
        let padding = std::mem::take(&mut self.pending_padding);
        if padding == 0 {
            return Ok(());
        }
        let skipped =
            io::copy(&mut stream.take(padding), &mut io::sink()).map_err(StreamArcError::from_io)?;
        trace!(padding, skipped, "skipped tar block padding");
        if skipped < padding {
            return Err(StreamArcError::premature_end(padding - skipped));
        }
        self.advance(padding)
    }

    /// Move the header offset forward by `len` decoded bytes.
    fn advance(&mut self, len: u64) -> Result<()> {
        self.offset = self.offset.checked_add(len).ok_or_else(|| {
            StreamArcError::invalid_header(format!(
                "entry at offset {} overflows the stream position",
                self.offset
            ))
        })?;
        Ok(())
    }
}

impl ContainerFormat for TarFormat {
    fn name(&self) -> &'static str {
        "tar"
    }

    fn is_signature(&self, source: &mut dyn Read) -> Result<bool> {
        let mut block = [0u8; BLOCK_SIZE];
        let got = read_full(source, &mut block)?;
        if got < BLOCK_SIZE {
            return Ok(false);
        }
        if is_zero_block(&block) {
            // An empty archive is just its end-of-archive marker.
            return Ok(true);
        }
        Ok(TarHeader::parse_numeric(&block[CHECKSUM_RANGE])
            .is_ok_and(|stored| checksum_matches(&block, stored)))
    }

    fn next_entry(&mut self, stream: &mut dyn Read, cancel: &CancelToken) -> Result<Option<Entry>> {
        if self.finished {
            return Ok(None);
        }

        let mut pax_attrs: HashMap<String, String> = HashMap::new();
        let mut gnu_longname: Option<String> = None;
        let mut gnu_longlink: Option<String> = None;

        loop {
            cancel.check()?;
            self.skip_padding(stream)?;

            let header_offset = self.offset;
            let mut block = [0u8; BLOCK_SIZE];
            let got = read_full(stream, &mut block)?;
            if got == 0 {
                debug!(offset = header_offset, "tar stream ended without end-of-archive block");
                self.finished = true;
                return Ok(None);
            }
            if got < BLOCK_SIZE {
                return Err(StreamArcError::premature_end((BLOCK_SIZE - got) as u64));
            }
            self.advance(BLOCK_SIZE as u64)?;

            let Some(mut header) = TarHeader::from_block(&block)? else {
                debug!(offset = header_offset, "reached tar end-of-archive block");
                self.finished = true;
                return Ok(None);
            };

            if header.is_pax_header() || header.is_pax_global_header() {
                let data = self.read_extension_data(stream, header.size)?;
                let attrs = TarHeader::parse_pax_data(&data);
                debug!(
                    global = header.is_pax_global_header(),
                    keys = attrs.len(),
                    "read pax header"
                );
                if header.is_pax_global_header() {
                    self.global_pax_attrs.extend(attrs);
                } else {
                    pax_attrs = attrs;
                }
                continue;
            }

            if header.is_gnu_longname() || header.is_gnu_longlink() {
                let data = self.read_extension_data(stream, header.size)?;
                let value = String::from_utf8_lossy(&data)
                    .trim_end_matches('\0')
                    .to_string();
                if header.is_gnu_longname() {
                    gnu_longname = Some(value);
                } else {
                    gnu_longlink = Some(value);
                }
                continue;
            }

            // Global first, then local PAX (local overrides global)
            if !self.global_pax_attrs.is_empty() {
                header.apply_pax_attrs(&self.global_pax_attrs);
            }
            if !pax_attrs.is_empty() {
                header.apply_pax_attrs(&pax_attrs);
            }
            if let Some(name) = gnu_longname.take() {
                header.name = name;
            }
            if let Some(link) = gnu_longlink.take() {
                header.linkname = link;
            }

            let entry = header.to_entry(header_offset);
            self.advance(entry.size)?;
            self.pending_padding = block_padding(entry.size);
            return Ok(Some(entry));
        }
    }
}
