//! Envelope sniffing over a forward-only source.
//!
//! Each candidate envelope gets two undoable trials on a shared
//! [`LookaheadStream`]: a magic-byte check on the raw bytes, then, if the
//! magic matched, a container signature check on the first decoded bytes.
//! A matched magic commits: either the decoded content is a valid container
//! or the archive is corrupt. Only when no magic matches is the raw stream
//! itself checked.
//!
//! A trial decode that fails because the raw source failed is reported as
//! that I/O error, not as a corrupt envelope.

use crate::envelope;
use std::io::{self, Read};
use streamarc_core::compression::CompressionType;
use streamarc_core::error::{Result, StreamArcError};
use streamarc_core::lookahead::{LookaheadStream, RewindMode};
use streamarc_core::traits::ContainerFormat;
use tracing::debug;

/// Result of a successful sniff.
pub struct SniffOutcome<'a> {
    /// Detected envelope, `CompressionType::None` for a bare container.
    pub compression: CompressionType,
    /// Decoded container bytes, starting at offset 0.
    pub stream: Box<dyn Read + 'a>,
}

impl std::fmt::Debug for SniffOutcome<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SniffOutcome")
            .field("compression", &self.compression)
            .finish_non_exhaustive()
    }
}

/// Raw source that remembers whether it ever failed.
struct Source<R> {
    inner: R,
    failed: bool,
}

impl<R: Read> Read for Source<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf).inspect_err(|e| {
            if e.kind() != io::ErrorKind::Interrupted {
                self.failed = true;
            }
        })
    }
}

/// Detects which envelope wraps a container.
pub struct FormatSniffer<'f> {
    format: &'f dyn ContainerFormat,
    candidates: &'f [CompressionType],
}

impl<'f> FormatSniffer<'f> {
    /// Sniff for `format`, trying the envelopes it declares in its order.
    pub fn new(format: &'f dyn ContainerFormat) -> Self {
        Self {
            format,
            candidates: format.envelopes(),
        }
    }

    /// Replace the candidate list. Order is priority.
    pub fn with_candidates(mut self, candidates: &'f [CompressionType]) -> Self {
        self.candidates = candidates;
        self
    }

    /// Candidate envelopes in the order they are tried.
    pub fn candidates(&self) -> &[CompressionType] {
        self.candidates
    }

    /// Identify the envelope of `source` and commit to a decode stream.
    pub fn sniff<'a, R: Read + 'a>(&self, source: R) -> Result<SniffOutcome<'a>> {
        let container = self.format.name();
        let mut stream = LookaheadStream::new(Source {
            inner: source,
            failed: false,
        });

        for &candidate in self.candidates {
            stream.start_recording();
            let matched = envelope::matches_magic(candidate, &mut stream);
            stream.rewind(RewindMode::Replay);
            if !matched? {
                debug!(envelope = candidate.name(), "magic did not match");
                continue;
            }
            debug!(envelope = candidate.name(), "magic matched, checking decoded content");

            stream.start_recording();
            let valid = {
                let mut trial = envelope::decoder(candidate, &mut stream);
                self.format.is_signature(&mut trial)
            };
            stream.rewind(RewindMode::Replay);

            return match valid {
                Ok(true) => {
                    debug!(envelope = candidate.name(), container, "committed envelope");
                    Ok(SniffOutcome {
                        compression: candidate,
                        stream: envelope::decoder(candidate, stream),
                    })
                }
                Ok(false) => {
                    debug!(
                        envelope = candidate.name(),
                        container,
                        "decoded content is not a valid container"
                    );
                    Err(StreamArcError::corrupt_envelope(candidate.name(), container))
                }
                Err(err) if stream.get_ref().failed => {
                    debug!(
                        envelope = candidate.name(),
                        error = %err,
                        "source failed during trial decode"
                    );
                    Err(err)
                }
                Err(err) => {
                    debug!(envelope = candidate.name(), error = %err, "trial decode failed");
                    Err(StreamArcError::corrupt_envelope(candidate.name(), container))
                }
            };
        }

        stream.start_recording();
        let valid = self.format.is_signature(&mut stream);
        stream.rewind(RewindMode::Replay);

        if valid? {
            debug!(container, "no envelope, passing raw stream through");
            Ok(SniffOutcome {
                compression: CompressionType::None,
                stream: Box::new(stream),
            })
        } else {
            debug!(container, "raw stream is not a valid container");
            Err(StreamArcError::format_mismatch(container))
        }
    }
}

impl std::fmt::Debug for FormatSniffer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatSniffer")
            .field("format", &self.format.name())
            .field("candidates", &self.candidates)
            .finish()
    }
}
