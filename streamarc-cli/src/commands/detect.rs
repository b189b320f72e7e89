//! Detect command implementation.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use streamarc_core::CompressionType;
use streamarc_reader::{ArchiveReader, ReaderOptions, detect_compression};

pub fn cmd_detect(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut reader = BufReader::new(File::open(file)?);
    let (compression, magic) = detect_compression(&mut reader)?;

    println!("File: {}", file.display());
    println!("Compression: {}", compression);
    if compression.is_compressed() {
        println!("Extension: .{}", compression.extension());
    }
    println!("Magic bytes: {:02X?}", &magic[..magic.len().min(16)]);

    let hint = file
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(CompressionType::from_extension);
    if let Some(hint) = hint.filter(|&h| h != compression) {
        println!("Note: extension suggests {}, content says {}", hint, compression);
    }

    // The magic check consumed bytes; reopen for the full check.
    let reader = BufReader::new(File::open(file)?);
    match ArchiveReader::open(reader, ReaderOptions::default()) {
        Ok(archive) => println!("Container: tar ({} envelope verified)", archive.compression()),
        Err(e) => println!("Container: not readable ({})", e),
    }

    Ok(())
}
