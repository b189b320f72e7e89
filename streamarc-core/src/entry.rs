//! Archive entry metadata.
//!
//! This module defines the `Entry` struct produced by a container's metadata
//! decoder. An entry is handed to the caller as an owned value and never
//! changes afterwards; its payload is read separately through the session.

use std::path::PathBuf;
use std::time::SystemTime;

/// Entry type (file, directory, symlink, etc.).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntryType {
    /// Regular file.
    #[default]
    File,
    /// Directory.
    Directory,
    /// Symbolic link.
    Symlink,
    /// Hard link.
    Hardlink,
    /// Character device.
    CharDevice,
    /// Block device.
    BlockDevice,
    /// Named pipe.
    Fifo,
    /// Unknown type.
    Unknown,
}

impl EntryType {
    /// Check if this is a file.
    pub fn is_file(&self) -> bool {
        matches!(self, Self::File)
    }

    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Directory)
    }

    /// Check if this is a symlink.
    pub fn is_symlink(&self) -> bool {
        matches!(self, Self::Symlink)
    }

    /// Single-character tag used in listings.
    pub fn type_char(&self) -> char {
        match self {
            Self::Directory => 'd',
            Self::Symlink => 'l',
            Self::Hardlink => 'h',
            Self::CharDevice => 'c',
            Self::BlockDevice => 'b',
            Self::Fifo => 'p',
            Self::File | Self::Unknown => '-',
        }
    }
}

/// Unix ownership and permission bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileAttributes {
    /// Unix mode bits (rwxrwxrwx).
    pub unix_mode: Option<u32>,
    /// User ID.
    pub uid: Option<u32>,
    /// Group ID.
    pub gid: Option<u32>,
}

impl FileAttributes {
    /// Create new empty attributes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set Unix mode.
    pub fn with_mode(mut self, mode: u32) -> Self {
        self.unix_mode = Some(mode);
        self
    }

    /// Set owner IDs.
    pub fn with_owner(mut self, uid: u32, gid: u32) -> Self {
        self.uid = Some(uid);
        self.gid = Some(gid);
        self
    }

    /// Check if the entry is read-only.
    pub fn is_readonly(&self) -> bool {
        self.unix_mode.is_some_and(|mode| mode & 0o222 == 0)
    }
}

/// An entry in an archive.
///
/// `size` is the declared payload size; the session never hands out more
/// than this many bytes for the entry, and reports a premature end if the
/// stream delivers fewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// The name/path of the entry within the archive.
    pub name: String,
    /// The type of entry.
    pub entry_type: EntryType,
    /// Declared payload size in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified: Option<SystemTime>,
    /// Ownership and permissions.
    pub attributes: FileAttributes,
    /// Link target (for symlinks and hard links).
    pub link_target: Option<PathBuf>,
    /// Owner user name, if recorded.
    pub user_name: Option<String>,
    /// Owner group name, if recorded.
    pub group_name: Option<String>,
    /// Offset of the entry's header in the decoded stream.
    pub offset: u64,
}

impl Entry {
    /// Create a new file entry.
    pub fn file(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            entry_type: EntryType::File,
            size,
            modified: None,
            attributes: FileAttributes::default(),
            link_target: None,
            user_name: None,
            group_name: None,
            offset: 0,
        }
    }

    /// Create a new directory entry.
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            entry_type: EntryType::Directory,
            ..Self::file(name, 0)
        }
    }

    /// Check if this is a file.
    pub fn is_file(&self) -> bool {
        self.entry_type.is_file()
    }

    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.entry_type.is_dir()
    }

    /// Builder method to set the header offset.
    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Builder method to set modification time.
    pub fn with_modified(mut self, time: SystemTime) -> Self {
        self.modified = Some(time);
        self
    }

    /// Builder method to set attributes.
    pub fn with_attributes(mut self, attrs: FileAttributes) -> Self {
        self.attributes = attrs;
        self
    }

    /// Validate the entry path for security.
    ///
    /// Returns an error if the path contains potentially dangerous components
    /// like ".." (parent directory traversal) or absolute paths.
    pub fn validate_path(&self) -> crate::error::Result<()> {
        use crate::error::StreamArcError;

        let path = std::path::Path::new(&self.name);

        if path.is_absolute() || self.name.starts_with('/') {
            return Err(StreamArcError::path_traversal(&self.name));
        }

        for component in path.components() {
            match component {
                std::path::Component::ParentDir => {
                    return Err(StreamArcError::path_traversal(&self.name));
                }
                std::path::Component::Normal(s) => {
                    if s.to_string_lossy().contains('\0') {
                        return Err(StreamArcError::path_traversal(&self.name));
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Get a sanitized path that's safe for extraction.
    ///
    /// This removes dangerous components like ".." and converts absolute
    /// paths to relative ones.
    pub fn sanitized_name(&self) -> String {
        let mut result = String::new();

        for component in std::path::Path::new(&self.name).components() {
            if let std::path::Component::Normal(s) = component {
                if !result.is_empty() {
                    result.push('/');
                }
                result.push_str(&s.to_string_lossy().replace('\0', "_"));
            }
        }

        result
    }
}

impl Default for Entry {
    fn default() -> Self {
        Self::file("", 0)
    }
}

impl std::fmt::Display for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{:>12} {}",
            self.entry_type.type_char(),
            self.size,
            self.name
        )?;
        if let Some(target) = &self.link_target {
            write!(f, " -> {}", target.display())?;
        }
        Ok(())
    }
}
