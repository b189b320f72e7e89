//! Utility functions for the CLI.

use glob::Pattern;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use std::time::{Duration, UNIX_EPOCH};
use streamarc_core::Entry;

/// Open an archive source; `-` means standard input.
pub fn open_source(path: &Path) -> io::Result<Box<dyn Read>> {
    if path == Path::new("-") {
        return Ok(Box::new(io::stdin().lock()));
    }
    Ok(Box::new(BufReader::new(File::open(path)?)))
}

/// Display name for an archive path.
pub fn source_name(path: &Path) -> String {
    if path == Path::new("-") {
        "<stdin>".to_string()
    } else {
        path.display().to_string()
    }
}

/// Create a spinner; streamed archives have no known entry count.
pub fn create_spinner(enable: bool) -> ProgressBar {
    if !enable {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .template("{spinner} [{elapsed_precise}] {pos} entries {msg}")
    {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Check if a name matches the filter patterns.
/// - If include patterns are specified, the name must match at least one
/// - If exclude patterns are specified, the name must not match any
pub fn matches_filters(name: &str, include: &[String], exclude: &[String]) -> bool {
    let matches = |pattern_str: &String| Pattern::new(pattern_str).is_ok_and(|p| p.matches(name));

    if exclude.iter().any(matches) {
        return false;
    }
    include.is_empty() || include.iter().any(matches)
}

/// Modification time as seconds since the Unix epoch.
pub fn mtime_secs(entry: &Entry) -> Option<u64> {
    entry
        .modified
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
}

/// Render Unix permission bits as `rwxr-xr-x`.
pub fn mode_string(mode: u32) -> String {
    const FLAGS: [(u32, char); 9] = [
        (0o400, 'r'),
        (0o200, 'w'),
        (0o100, 'x'),
        (0o040, 'r'),
        (0o020, 'w'),
        (0o010, 'x'),
        (0o004, 'r'),
        (0o002, 'w'),
        (0o001, 'x'),
    ];
    FLAGS
        .iter()
        .map(|&(bit, c)| if mode & bit != 0 { c } else { '-' })
        .collect()
}

/// Print one entry of a listing.
pub fn print_entry(entry: &Entry, long: bool) {
    if !long {
        println!("{}", entry.name);
        return;
    }

    let mode = entry
        .attributes
        .unix_mode
        .map_or_else(|| "?????????".to_string(), mode_string);
    let owner = match (&entry.user_name, entry.attributes.uid) {
        (Some(name), _) => name.clone(),
        (None, Some(uid)) => uid.to_string(),
        (None, None) => "-".to_string(),
    };
    let mtime = mtime_secs(entry).map_or_else(|| "-".to_string(), |t| t.to_string());

    print!(
        "{}{} {:<8} {:>12} {:>11} {}",
        entry.entry_type.type_char(),
        mode,
        owner,
        entry.size,
        mtime,
        entry.name
    );
    if let Some(target) = &entry.link_target {
        print!(" -> {}", target.display());
    }
    println!();
}

/// Print the footer of a long listing.
pub fn print_totals(count: usize, total_size: u64) {
    println!("{}", "-".repeat(60));
    println!("{:>12} bytes in {} entries", total_size, count);
}
