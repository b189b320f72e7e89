//! Fixture builders shared by the integration tests.

#![allow(dead_code)]

use std::io::{self, Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use streamarc_core::CancelToken;
use streamarc_reader::lzip::{LZIP_MAGIC, LZMA_HEADER_SIZE, decode_dict_size};

const BLOCK: usize = 512;

/// Minimal UStar writer for fixtures.
#[derive(Default)]
pub struct TarBuilder {
    out: Vec<u8>,
}

impl TarBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, name: &str, data: &[u8]) -> Self {
        self.header(name, data.len() as u64, b'0', "");
        self.out.extend_from_slice(data);
        self.pad();
        self
    }

    pub fn dir(mut self, name: &str) -> Self {
        self.header(name, 0, b'5', "");
        self
    }

    pub fn symlink(mut self, name: &str, target: &str) -> Self {
        self.header(name, 0, b'2', target);
        self
    }

    /// Terminate with two zero blocks.
    pub fn finish(mut self) -> Vec<u8> {
        self.out.resize(self.out.len() + 2 * BLOCK, 0);
        self.out
    }

    fn header(&mut self, name: &str, size: u64, typeflag: u8, link: &str) {
        let mut block = [0u8; BLOCK];
        block[..name.len()].copy_from_slice(name.as_bytes());
        block[100..107].copy_from_slice(b"0000644");
        block[108..115].copy_from_slice(b"0000000");
        block[116..123].copy_from_slice(b"0000000");
        block[124..135].copy_from_slice(format!("{:011o}", size).as_bytes());
        block[136..147].copy_from_slice(b"14532452330");
        block[156] = typeflag;
        block[157..157 + link.len()].copy_from_slice(link.as_bytes());
        block[257..263].copy_from_slice(b"ustar\0");
        block[263..265].copy_from_slice(b"00");
        block[148..156].fill(b' ');
        let sum: u32 = block.iter().map(|&b| u32::from(b)).sum();
        block[148..155].copy_from_slice(format!("{:06o}\0", sum).as_bytes());
        self.out.extend_from_slice(&block);
    }

    fn pad(&mut self) {
        let rem = self.out.len() % BLOCK;
        if rem != 0 {
            self.out.resize(self.out.len() + BLOCK - rem, 0);
        }
    }
}

/// Archive of regular files.
pub fn tar_of(files: &[(&str, &[u8])]) -> Vec<u8> {
    files
        .iter()
        .fold(TarBuilder::new(), |b, (name, data)| b.file(name, data))
        .finish()
}

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn bzip2(data: &[u8]) -> Vec<u8> {
    let mut encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn xz(data: &[u8]) -> Vec<u8> {
    let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 6);
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn lzip(data: &[u8]) -> Vec<u8> {
    let mut options = xz2::stream::LzmaOptions::new_preset(6).unwrap();
    options
        .dict_size(decode_dict_size(0x14).unwrap())
        .literal_context_bits(3)
        .literal_position_bits(0)
        .position_bits(2);
    let stream = xz2::stream::Stream::new_lzma_encoder(&options).unwrap();
    let mut encoder = xz2::write::XzEncoder::new_stream(Vec::new(), stream);
    encoder.write_all(data).unwrap();
    // Drop the .lzma header; lzip carries its own.
    let packed = encoder.finish().unwrap().split_off(LZMA_HEADER_SIZE);

    let mut out = Vec::new();
    out.extend_from_slice(&LZIP_MAGIC);
    out.extend_from_slice(&[1, 0x14]);
    out.extend_from_slice(&packed);
    out.extend_from_slice(&crc32fast::hash(data).to_le_bytes());
    out.extend_from_slice(&(data.len() as u64).to_le_bytes());
    out.extend_from_slice(&(26 + packed.len() as u64).to_le_bytes());
    out
}

/// Source that counts calls to `read`.
pub struct CountingSource<R> {
    inner: R,
    reads: Arc<AtomicUsize>,
}

impl<R> CountingSource<R> {
    pub fn new(inner: R) -> (Self, Arc<AtomicUsize>) {
        let reads = Arc::new(AtomicUsize::new(0));
        (
            Self {
                inner,
                reads: Arc::clone(&reads),
            },
            reads,
        )
    }
}

impl<R: Read> Read for CountingSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read(buf)
    }
}

/// Source that hands out at most `chunk` bytes per read.
pub struct Trickle<R> {
    pub inner: R,
    pub chunk: usize,
}

impl<R: Read> Read for Trickle<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.chunk);
        self.inner.read(&mut buf[..n])
    }
}

/// Source that fires a cancel token once an armed read count is reached.
pub struct CancelOnRead<R> {
    inner: R,
    token: CancelToken,
    reads: Arc<AtomicUsize>,
    fire_at: Arc<AtomicUsize>,
}

/// Handle for arming a [`CancelOnRead`] after it was moved into a reader.
pub struct CancelTrigger {
    reads: Arc<AtomicUsize>,
    fire_at: Arc<AtomicUsize>,
}

impl<R> CancelOnRead<R> {
    pub fn new(inner: R, token: CancelToken) -> (Self, CancelTrigger) {
        let reads = Arc::new(AtomicUsize::new(0));
        let fire_at = Arc::new(AtomicUsize::new(usize::MAX));
        let trigger = CancelTrigger {
            reads: Arc::clone(&reads),
            fire_at: Arc::clone(&fire_at),
        };
        (
            Self {
                inner,
                token,
                reads,
                fire_at,
            },
            trigger,
        )
    }
}

impl CancelTrigger {
    /// Fire on the `n`-th read from now.
    pub fn arm(&self, n: usize) {
        self.fire_at.store(self.reads() + n, Ordering::SeqCst);
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl<R: Read> Read for CancelOnRead<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.reads.fetch_add(1, Ordering::SeqCst) + 1;
        if n >= self.fire_at.load(Ordering::SeqCst) {
            self.token.cancel();
        }
        self.inner.read(buf)
    }
}
