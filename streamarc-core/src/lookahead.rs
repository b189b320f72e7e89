//! Recording/replaying wrapper over a forward-only byte source.
//!
//! Envelope detection has to try several decoders over the same leading
//! bytes of a source that cannot seek. [`LookaheadStream`] makes those
//! trials undoable: while recording, every byte served from the raw source
//! is also appended to an internal buffer, and [`LookaheadStream::rewind`]
//! with [`RewindMode::Replay`] serves that buffer again before falling
//! through to the source.
//!
//! ```text
//!            start_recording()        rewind(Replay)
//!  source ──► [ buffer ....... ] ──► read() replays buffer, then source
//! ```

use std::io::{self, Read};

/// What [`LookaheadStream::rewind`] does with the recorded bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewindMode {
    /// Serve the recorded bytes again, in order, before the raw source.
    Replay,
    /// Drop the recorded bytes and continue straight from the raw source.
    Discard,
}

/// A forward-only reader that can record a prefix and replay it.
#[derive(Debug)]
pub struct LookaheadStream<R> {
    /// The raw source.
    inner: R,
    /// Recorded bytes; `buffer[position..]` is still pending replay.
    buffer: Vec<u8>,
    /// Replay position within `buffer`.
    position: usize,
    /// Whether bytes pulled from `inner` are appended to `buffer`.
    recording: bool,
}

impl<R: Read> LookaheadStream<R> {
    /// Wrap a raw source. Nothing is recorded until [`start_recording`](Self::start_recording).
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
            position: 0,
            recording: false,
        }
    }

    /// Begin recording.
    ///
    /// Bytes still pending replay become the start of the new recording, so
    /// a trial started right after a [`RewindMode::Replay`] rewind sees the
    /// same prefix as the previous one.
    pub fn start_recording(&mut self) {
        if self.position > 0 {
            self.buffer.drain(..self.position);
            self.position = 0;
        }
        self.recording = true;
    }

    /// Rewind to the start of the recording and stop recording.
    pub fn rewind(&mut self, mode: RewindMode) {
        self.recording = false;
        match mode {
            RewindMode::Replay => self.position = 0,
            RewindMode::Discard => {
                self.buffer.clear();
                self.position = 0;
            }
        }
    }

    /// Whether bytes are currently being recorded.
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Number of recorded bytes still pending replay.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len() - self.position
    }

    /// Get a reference to the raw source.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Get a mutable reference to the raw source.
    ///
    /// Reading from it directly bypasses any pending replay bytes.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Consume the wrapper and return the raw source.
    ///
    /// Pending replay bytes are lost; check [`buffered_len`](Self::buffered_len) first.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for LookaheadStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        if self.position < self.buffer.len() {
            let pending = &self.buffer[self.position..];
            let n = pending.len().min(buf.len());
            buf[..n].copy_from_slice(&pending[..n]);
            self.position += n;

            // Replay finished and nobody is recording: release the memory.
            if !self.recording && self.position == self.buffer.len() {
                self.buffer.clear();
                self.position = 0;
            }
            return Ok(n);
        }

        let n = self.inner.read(buf)?;
        if self.recording && n > 0 {
            self.buffer.extend_from_slice(&buf[..n]);
            self.position = self.buffer.len();
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Source that hands out at most `chunk` bytes per read.
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        chunk: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.chunk.min(buf.len()).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    fn read_n<R: Read>(reader: &mut R, n: usize) -> Vec<u8> {
        let mut out = vec![0u8; n];
        reader.read_exact(&mut out).unwrap();
        out
    }

    #[test]
    fn test_passthrough_without_recording() {
        let mut stream = LookaheadStream::new(Cursor::new(b"hello world".to_vec()));
        let mut out = Vec::new();
        stream.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"hello world");
        assert_eq!(stream.buffered_len(), 0);
    }

    #[test]
    fn test_replay_then_fall_through() {
        let mut stream = LookaheadStream::new(Cursor::new(b"0123456789".to_vec()));
        stream.start_recording();
        assert_eq!(read_n(&mut stream, 4), b"0123");
        stream.rewind(RewindMode::Replay);
        assert!(!stream.is_recording());
        assert_eq!(stream.buffered_len(), 4);

        let mut out = Vec::new();
        stream.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"0123456789");
        assert_eq!(stream.buffered_len(), 0);
    }

    #[test]
    fn test_discard_drops_recorded_bytes() {
        let mut stream = LookaheadStream::new(Cursor::new(b"abcdef".to_vec()));
        stream.start_recording();
        assert_eq!(read_n(&mut stream, 3), b"abc");
        stream.rewind(RewindMode::Discard);
        assert_eq!(stream.buffered_len(), 0);

        let mut out = Vec::new();
        stream.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"def");
    }

    #[test]
    fn test_consecutive_trials_see_same_prefix() {
        let data: Vec<u8> = (0..=255).collect();
        let mut stream = LookaheadStream::new(Trickle {
            data: data.clone(),
            pos: 0,
            chunk: 7,
        });

        // Each trial reads further than the last; none may lose or repeat bytes.
        for len in [3usize, 10, 40, 100] {
            stream.start_recording();
            assert_eq!(read_n(&mut stream, len), &data[..len]);
            stream.rewind(RewindMode::Replay);
        }

        let mut out = Vec::new();
        stream.read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_shorter_trial_after_longer_keeps_tail() {
        let mut stream = LookaheadStream::new(Cursor::new(b"abcdefghij".to_vec()));
        stream.start_recording();
        assert_eq!(read_n(&mut stream, 8), b"abcdefgh");
        stream.rewind(RewindMode::Replay);

        stream.start_recording();
        assert_eq!(read_n(&mut stream, 2), b"ab");
        stream.rewind(RewindMode::Replay);

        let mut out = Vec::new();
        stream.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"abcdefghij");
    }

    #[test]
    fn test_read_past_end_yields_zero() {
        let mut stream = LookaheadStream::new(Cursor::new(b"xy".to_vec()));
        stream.start_recording();
        let mut buf = [0u8; 8];
        assert_eq!(stream.read(&mut buf).unwrap(), 2);
        assert_eq!(stream.read(&mut buf).unwrap(), 0);
        stream.rewind(RewindMode::Replay);
        assert_eq!(stream.read(&mut buf).unwrap(), 2);
        assert_eq!(stream.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_empty_buffer_read() {
        let mut stream = LookaheadStream::new(Cursor::new(b"abc".to_vec()));
        assert_eq!(stream.read(&mut []).unwrap(), 0);
        assert_eq!(read_n(&mut stream, 3), b"abc");
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn replay_reproduces_source(
                data in proptest::collection::vec(any::<u8>(), 0..2048),
                trials in proptest::collection::vec(0usize..2048, 0..6),
                chunk in 1usize..64,
            ) {
                let mut stream = LookaheadStream::new(Trickle {
                    data: data.clone(),
                    pos: 0,
                    chunk,
                });
                for len in trials {
                    stream.start_recording();
                    let mut sink = vec![0u8; len];
                    let mut got = 0;
                    while got < len {
                        let n = stream.read(&mut sink[got..]).unwrap();
                        if n == 0 {
                            break;
                        }
                        got += n;
                    }
                    prop_assert_eq!(&sink[..got], &data[..got]);
                    stream.rewind(RewindMode::Replay);
                }
                let mut out = Vec::new();
                stream.read_to_end(&mut out).unwrap();
                prop_assert_eq!(out, data);
            }
        }
    }
}
