mod common;

use common::{Trickle, bzip2, gzip, lzip, tar_of, xz};
use proptest::prelude::*;
use std::io::{Cursor, Read};
use streamarc_core::CompressionType;
use streamarc_reader::{ArchiveReader, FormatSniffer, ReaderOptions, TarFormat};

fn encode(kind: CompressionType, data: &[u8]) -> Vec<u8> {
    match kind {
        CompressionType::None => data.to_vec(),
        CompressionType::Gzip => gzip(data),
        CompressionType::Bzip2 => bzip2(data),
        CompressionType::Lzip => lzip(data),
        CompressionType::Xz => xz(data),
    }
}

fn any_envelope() -> impl Strategy<Value = CompressionType> {
    prop_oneof![
        Just(CompressionType::None),
        Just(CompressionType::Gzip),
        Just(CompressionType::Bzip2),
        Just(CompressionType::Lzip),
        Just(CompressionType::Xz),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// The committed stream equals one fresh decode of the whole source.
    #[test]
    fn committed_stream_matches_fresh_decode(
        body in proptest::collection::vec(any::<u8>(), 0..4096),
        kind in any_envelope(),
        chunk in 1usize..64,
    ) {
        let tar = tar_of(&[("body.bin", &body)]);
        let source = Trickle { inner: Cursor::new(encode(kind, &tar)), chunk };

        let format = TarFormat::new();
        let mut outcome = FormatSniffer::new(&format).sniff(source).unwrap();
        prop_assert_eq!(outcome.compression, kind);

        let mut decoded = Vec::new();
        outcome.stream.read_to_end(&mut decoded).unwrap();
        prop_assert_eq!(decoded, tar);
    }

    /// Reading k of n bytes and releasing leaves the stream where a full read would.
    #[test]
    fn release_after_partial_read_lands_on_next_header(
        (n, k) in (0usize..5000).prop_flat_map(|n| (Just(n), 0..=n)),
        skip_buffer in 1usize..2048,
    ) {
        let body: Vec<u8> = (0..n).map(|i| (i % 251) as u8).collect();
        let tar = tar_of(&[("partial", &body), ("marker", b"MARK")]);
        let options = ReaderOptions::default().with_skip_buffer_size(skip_buffer);
        let mut archive = ArchiveReader::open(Cursor::new(tar), options).unwrap();

        let entry = archive.next_entry().unwrap().unwrap();
        let mut reader = archive.open_payload(&entry).unwrap();
        let mut head = vec![0u8; k];
        reader.read_exact(&mut head).unwrap();
        prop_assert_eq!(&head[..], &body[..k]);
        prop_assert_eq!(reader.remaining(), (n - k) as u64);
        reader.release().unwrap();

        let marker = archive.next_entry().unwrap().unwrap();
        prop_assert_eq!(marker.name.as_str(), "marker");
        let mut out = Vec::new();
        archive.extract_to(&marker, &mut out).unwrap();
        prop_assert_eq!(out, b"MARK".to_vec());
        prop_assert!(archive.next_entry().unwrap().is_none());
    }
}
