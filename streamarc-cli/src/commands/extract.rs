//! Extract command implementation.

use crate::utils::{create_spinner, matches_filters, open_source, source_name};
use filetime::FileTime;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Component, Path};
use streamarc_core::{Entry, EntryType};
use streamarc_reader::{ArchiveReader, ReaderOptions};
use tracing::warn;

/// Options for extracting archive contents.
pub struct ExtractOptions<'a> {
    pub output: &'a Path,
    pub files: &'a [String],
    pub include: &'a [String],
    pub exclude: &'a [String],
    pub verbose: bool,
    pub progress: bool,
}

impl ExtractOptions<'_> {
    fn should_extract(&self, name: &str) -> bool {
        // If specific entries are requested, check those first
        if !self.files.is_empty()
            && !self
                .files
                .iter()
                .any(|f| name == f || name.starts_with(&format!("{}/", f.trim_end_matches('/'))))
        {
            return false;
        }
        matches_filters(name, self.include, self.exclude)
    }
}

/// Totals of one extraction run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub extracted: usize,
    pub skipped: usize,
    pub bytes: u64,
}

/// Link targets must stay inside the output directory.
fn is_safe_link_target(target: &Path) -> bool {
    !target.is_absolute() && !target.components().any(|c| matches!(c, Component::ParentDir))
}

fn set_mtime(path: &Path, entry: &Entry) {
    if let Some(modified) = entry.modified {
        if let Err(e) = filetime::set_file_mtime(path, FileTime::from_system_time(modified)) {
            warn!(path = %path.display(), error = %e, "could not restore modification time");
        }
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, entry: &Entry) {
    use std::os::unix::fs::PermissionsExt;

    if let Some(mode) = entry.attributes.unix_mode {
        if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o7777)) {
            warn!(path = %path.display(), error = %e, "could not restore permissions");
        }
    }
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _entry: &Entry) {}

/// Extract every selected entry of `source` below `options.output`.
pub fn extract_archive<R: Read>(
    source: R,
    options: &ExtractOptions,
) -> Result<ExtractSummary, Box<dyn std::error::Error>> {
    let mut archive = ArchiveReader::open(source, ReaderOptions::default())?;
    let mut summary = ExtractSummary::default();

    let pb = create_spinner(options.progress);
    pb.set_message(format!("({})", archive.compression()));

    while let Some(entry) = archive.next_entry()? {
        pb.inc(1);
        let relative = entry.sanitized_name();
        if relative.is_empty() || !options.should_extract(&entry.name) {
            summary.skipped += 1;
            continue;
        }
        let path = options.output.join(&relative);

        match entry.entry_type {
            EntryType::Directory => {
                fs::create_dir_all(&path)?;
                if options.verbose {
                    pb.println(format!("  Created: {}", entry.name));
                }
            }
            EntryType::File => {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                let mut writer = BufWriter::new(File::create(&path)?);
                let written = archive.extract_to(&entry, &mut writer)?;
                writer.flush()?;
                drop(writer);
                set_mode(&path, &entry);
                set_mtime(&path, &entry);

                summary.bytes += written;
                if options.verbose {
                    pb.println(format!("  Extracted: {} ({} bytes)", entry.name, written));
                }
            }
            EntryType::Symlink | EntryType::Hardlink => {
                let Some(target) = entry.link_target.as_deref() else {
                    summary.skipped += 1;
                    continue;
                };
                if !is_safe_link_target(target) {
                    warn!(
                        name = %entry.name,
                        target = %target.display(),
                        "skipping link that leaves the output directory"
                    );
                    summary.skipped += 1;
                    continue;
                }
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                if entry.entry_type == EntryType::Hardlink {
                    fs::hard_link(options.output.join(target), &path)?;
                } else {
                    create_symlink(target, &path)?;
                }
                if options.verbose {
                    pb.println(format!("  Linked: {} -> {}", entry.name, target.display()));
                }
            }
            other => {
                warn!(name = %entry.name, kind = ?other, "skipping special file");
                summary.skipped += 1;
                continue;
            }
        }
        summary.extracted += 1;
    }

    pb.finish_with_message("Done");
    Ok(summary)
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(not(unix))]
fn create_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    warn!(
        link = %link.display(),
        target = %target.display(),
        "symlinks are not supported on this platform"
    );
    Ok(())
}

pub fn cmd_extract(
    archive: &Path,
    options: &ExtractOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = open_source(archive)?;
    println!("Extracting {} to {}", source_name(archive), options.output.display());

    let summary = extract_archive(source, options)?;
    println!(
        "Extracted {} entries ({} bytes), skipped {}",
        summary.extracted, summary.bytes, summary.skipped
    );
    Ok(())
}
