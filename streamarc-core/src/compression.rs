//! Compression envelope identification.
//!
//! An envelope is a general-purpose compression wrapper around a raw
//! container stream. This module only knows the envelopes' names and magic
//! numbers; constructing decoders is the reader crate's job.

/// Compression envelope around a container stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompressionType {
    /// No envelope; the container bytes are stored as-is.
    #[default]
    None,
    /// GZIP (.gz).
    Gzip,
    /// Bzip2 (.bz2).
    Bzip2,
    /// Lzip (.lz).
    Lzip,
    /// XZ (.xz).
    Xz,
}

/// Envelope candidates in the order they are tried. Order is significant.
pub const SNIFF_ORDER: [CompressionType; 4] = [
    CompressionType::Gzip,
    CompressionType::Bzip2,
    CompressionType::Lzip,
    CompressionType::Xz,
];

/// Longest magic number of any envelope.
pub const MAX_MAGIC_LEN: usize = 6;

impl CompressionType {
    /// Short lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Gzip => "gzip",
            Self::Bzip2 => "bzip2",
            Self::Lzip => "lzip",
            Self::Xz => "xz",
        }
    }

    /// Typical file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::Gzip => "gz",
            Self::Bzip2 => "bz2",
            Self::Lzip => "lz",
            Self::Xz => "xz",
        }
    }

    /// Number of leading bytes needed to test the magic number.
    pub fn magic_len(&self) -> usize {
        match self {
            Self::None => 0,
            // 0x1F 0x8B plus the deflate method byte
            Self::Gzip => 3,
            // "BZh" plus the block size digit
            Self::Bzip2 => 4,
            Self::Lzip => 4,
            Self::Xz => 6,
        }
    }

    /// Test leading bytes against this envelope's magic number.
    ///
    /// `None` never matches; it is the fallback, not a signature.
    pub fn matches_magic(&self, magic: &[u8]) -> bool {
        if magic.len() < self.magic_len() {
            return false;
        }
        match self {
            Self::None => false,
            Self::Gzip => magic.starts_with(&[0x1F, 0x8B, 0x08]),
            Self::Bzip2 => magic.starts_with(b"BZh") && (b'1'..=b'9').contains(&magic[3]),
            Self::Lzip => magic.starts_with(b"LZIP"),
            Self::Xz => magic.starts_with(&[0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00]),
        }
    }

    /// Identify an envelope from leading bytes, in sniffing order.
    pub fn from_magic(magic: &[u8]) -> Self {
        SNIFF_ORDER
            .into_iter()
            .find(|kind| kind.matches_magic(magic))
            .unwrap_or(Self::None)
    }

    /// Guess an envelope from a file extension (`tgz`, `tar.xz`, ...).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "tar" => Some(Self::None),
            "gz" | "tgz" => Some(Self::Gzip),
            "bz2" | "tbz" | "tbz2" => Some(Self::Bzip2),
            "lz" | "tlz" => Some(Self::Lzip),
            "xz" | "txz" => Some(Self::Xz),
            _ => None,
        }
    }

    /// Check if this is an actual compression envelope.
    pub fn is_compressed(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl std::fmt::Display for CompressionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Gzip => write!(f, "GZIP"),
            Self::Bzip2 => write!(f, "Bzip2"),
            Self::Lzip => write!(f, "Lzip"),
            Self::Xz => write!(f, "XZ"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_gzip() {
        let magic = [0x1F, 0x8B, 0x08, 0x00];
        assert_eq!(CompressionType::from_magic(&magic), CompressionType::Gzip);
    }

    #[test]
    fn test_detect_bzip2() {
        assert_eq!(CompressionType::from_magic(b"BZh91AY"), CompressionType::Bzip2);
        assert_eq!(CompressionType::from_magic(b"BZh0"), CompressionType::None);
    }

    #[test]
    fn test_detect_lzip() {
        assert_eq!(CompressionType::from_magic(b"LZIP\x01\x0c"), CompressionType::Lzip);
    }

    #[test]
    fn test_detect_xz() {
        let magic = [0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00];
        assert_eq!(CompressionType::from_magic(&magic), CompressionType::Xz);
        assert_eq!(CompressionType::from_magic(&magic[..5]), CompressionType::None);
    }

    #[test]
    fn test_detect_unknown() {
        let magic = [0x00, 0x00, 0x00, 0x00];
        assert_eq!(CompressionType::from_magic(&magic), CompressionType::None);
        assert_eq!(CompressionType::from_magic(&[]), CompressionType::None);
    }

    #[test]
    fn test_magics_are_disjoint() {
        let samples: [&[u8]; 4] = [
            &[0x1F, 0x8B, 0x08, 0x00, 0x00, 0x00],
            b"BZh9\0\0",
            b"LZIP\x01\x0c",
            &[0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00],
        ];
        for (sample, expected) in samples.iter().zip(SNIFF_ORDER) {
            let hits: Vec<_> = SNIFF_ORDER
                .into_iter()
                .filter(|kind| kind.matches_magic(sample))
                .collect();
            assert_eq!(hits, vec![expected]);
        }
    }

    #[test]
    fn test_from_extension() {
        assert_eq!(CompressionType::from_extension("TGZ"), Some(CompressionType::Gzip));
        assert_eq!(CompressionType::from_extension("tar"), Some(CompressionType::None));
        assert_eq!(CompressionType::from_extension("zip"), None);
    }

    #[test]
    fn test_properties() {
        assert!(CompressionType::Xz.is_compressed());
        assert!(!CompressionType::None.is_compressed());
        assert_eq!(CompressionType::Lzip.extension(), "lz");
        assert_eq!(CompressionType::Gzip.to_string(), "GZIP");
        assert!(SNIFF_ORDER.iter().all(|k| k.magic_len() <= MAX_MAGIC_LEN));
    }
}
