use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::io::Cursor;
use streamarc_core::CompressionType;
use streamarc_reader::{ArchiveReader, FormatSniffer, ReaderOptions, TarFormat};

#[path = "../tests/common/mod.rs"]
mod common;

fn sample_tar(files: usize, size: usize) -> Vec<u8> {
    let body: Vec<u8> = (0..size).map(|i| (i % 61) as u8 + b'A').collect();
    let names: Vec<String> = (0..files).map(|i| format!("dir/file_{i:04}.txt")).collect();
    let entries: Vec<(&str, &[u8])> = names.iter().map(|n| (n.as_str(), body.as_slice())).collect();
    common::tar_of(&entries)
}

fn encode(kind: CompressionType, data: &[u8]) -> Vec<u8> {
    match kind {
        CompressionType::None => data.to_vec(),
        CompressionType::Gzip => common::gzip(data),
        CompressionType::Bzip2 => common::bzip2(data),
        CompressionType::Lzip => common::lzip(data),
        CompressionType::Xz => common::xz(data),
    }
}

fn bench_sniff(c: &mut Criterion) {
    let mut group = c.benchmark_group("sniff");
    let tar = sample_tar(4, 4096);

    for kind in [
        CompressionType::None,
        CompressionType::Gzip,
        CompressionType::Bzip2,
        CompressionType::Lzip,
        CompressionType::Xz,
    ] {
        let packed = encode(kind, &tar);
        group.bench_with_input(BenchmarkId::new("detect", kind.name()), &packed, |b, packed| {
            let format = TarFormat::new();
            b.iter(|| {
                let outcome = FormatSniffer::new(&format)
                    .sniff(Cursor::new(packed.as_slice()))
                    .expect("sniff failed");
                black_box(outcome.compression);
            });
        });
    }

    group.finish();
}

fn bench_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("drain");

    for (files, size) in [(1000, 100), (100, 10_000), (10, 1_000_000)] {
        let tar = sample_tar(files, size);
        group.throughput(Throughput::Bytes(tar.len() as u64));

        for kind in [CompressionType::None, CompressionType::Gzip] {
            let packed = encode(kind, &tar);
            let id = BenchmarkId::new(kind.name(), format!("{files}x{size}"));
            group.bench_with_input(id, &packed, |b, packed| {
                b.iter(|| {
                    let source = Cursor::new(packed.as_slice());
                    let mut archive = ArchiveReader::open(source, ReaderOptions::default())
                        .expect("open failed");
                    let mut count = 0usize;
                    while let Some(entry) = archive.next_entry().expect("next entry failed") {
                        archive.skip_entry(&entry).expect("skip failed");
                        count += 1;
                    }
                    black_box(count);
                });
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_sniff, bench_drain);
criterion_main!(benches);
