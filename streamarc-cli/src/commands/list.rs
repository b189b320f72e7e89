//! List command implementation.

use crate::utils::{
    matches_filters, mtime_secs, open_source, print_entry, print_totals, source_name,
};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use streamarc_core::{Entry, EntryType};
use streamarc_reader::{ArchiveReader, ReaderOptions};

/// JSON serializable entry data for archive listings.
#[derive(Debug, Serialize, Deserialize)]
struct EntryJson {
    name: String,
    #[serde(rename = "type")]
    entry_type: String,
    size: u64,
    offset: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    mode: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mtime: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    link_target: Option<String>,
}

impl EntryJson {
    fn from_entry(entry: &Entry) -> Self {
        let entry_type = match entry.entry_type {
            EntryType::File => "file",
            EntryType::Directory => "directory",
            EntryType::Symlink => "symlink",
            EntryType::Hardlink => "hardlink",
            EntryType::CharDevice => "char_device",
            EntryType::BlockDevice => "block_device",
            EntryType::Fifo => "fifo",
            EntryType::Unknown => "unknown",
        };

        Self {
            name: entry.name.clone(),
            entry_type: entry_type.to_string(),
            size: entry.size,
            offset: entry.offset,
            mode: entry.attributes.unix_mode,
            mtime: mtime_secs(entry),
            link_target: entry
                .link_target
                .as_ref()
                .map(|t| t.to_string_lossy().into_owned()),
        }
    }
}

/// JSON output for archive listing.
#[derive(Debug, Serialize, Deserialize)]
struct ArchiveListJson {
    archive: String,
    compression: String,
    entries: Vec<EntryJson>,
}

/// Options for listing archive contents.
pub struct ListOptions<'a> {
    pub long: bool,
    pub json: bool,
    pub include: &'a [String],
    pub exclude: &'a [String],
}

/// Collect the metadata of every entry that passes the filters.
///
/// Payloads are never opened; the session skips them.
fn collect_entries<R: Read>(
    source: R,
    options: &ListOptions,
) -> Result<(String, Vec<Entry>), Box<dyn std::error::Error>> {
    let mut archive = ArchiveReader::open(source, ReaderOptions::default())?;
    let compression = archive.compression().name().to_string();

    let mut entries = Vec::new();
    while let Some(entry) = archive.next_entry()? {
        if matches_filters(&entry.name, options.include, options.exclude) {
            entries.push(entry);
        }
    }
    Ok((compression, entries))
}

pub fn cmd_list(archive: &Path, options: &ListOptions) -> Result<(), Box<dyn std::error::Error>> {
    let source = open_source(archive)?;
    let name = source_name(archive);

    if options.json {
        let (compression, entries) = collect_entries(source, options)?;
        let output = ArchiveListJson {
            archive: name,
            compression,
            entries: entries.iter().map(EntryJson::from_entry).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    // Print as entries arrive so a long pipe shows progress.
    let mut archive = ArchiveReader::open(source, ReaderOptions::default())?;
    println!("Archive: {} ({})", name, archive.compression());
    println!();

    let mut count = 0usize;
    let mut total_size = 0u64;
    while let Some(entry) = archive.next_entry()? {
        if !matches_filters(&entry.name, options.include, options.exclude) {
            continue;
        }
        print_entry(&entry, options.long);
        count += 1;
        total_size += entry.size;
    }

    if options.long {
        print_totals(count, total_size);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{gzip, tar_of};
    use std::io::Cursor;

    #[test]
    fn test_collect_entries_with_filters() {
        let tar = tar_of(&[
            ("src/main.rs", b"fn main() {}"),
            ("README.md", b"# readme"),
            ("src/lib.rs", b""),
        ]);
        let include = vec!["src/*".to_string()];
        let exclude = vec!["*lib*".to_string()];
        let options = ListOptions {
            long: false,
            json: true,
            include: &include,
            exclude: &exclude,
        };

        let (compression, entries) = collect_entries(Cursor::new(gzip(&tar)), &options).unwrap();
        assert_eq!(compression, "gzip");
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["src/main.rs"]);
    }

    #[test]
    fn test_entry_json_shape() {
        let entry = Entry::file("a.txt", 3).with_offset(1024);
        let json = serde_json::to_value(EntryJson::from_entry(&entry)).unwrap();
        assert_eq!(json["name"], "a.txt");
        assert_eq!(json["type"], "file");
        assert_eq!(json["size"], 3);
        assert_eq!(json["offset"], 1024);
        assert!(json.get("mtime").is_none());
    }
}
