//! Package archive and install target benchmarks

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use plinth_benchmarks::{criterion_config, package};
use plinth_cache::cas::hash::compute_hash;
use plinth_cache::{extract_package, package_archive_bytes, InstallTarget};
use tempfile::TempDir;

/// `count` payload files of `size` bytes each
fn payload(count: usize, size: usize) -> Vec<(String, Vec<u8>)> {
    (0..count)
        .map(|index| (format!("lib/module{}.bin", index), vec![(index % 251) as u8; size]))
        .collect()
}

fn archive(count: usize, size: usize) -> Vec<u8> {
    let files = payload(count, size);
    let borrowed: Vec<(&str, &[u8])> = files.iter().map(|(path, bytes)| (path.as_str(), bytes.as_slice())).collect();
    package_archive_bytes(&package(0, "1.0.0"), &borrowed)
        .unwrap_or_else(|e| panic!("cannot build bench archive: {}", e))
}

fn bench_archive_creation(c: &mut Criterion) {
    let mut group = c.benchmark_group("archive_create");

    for count in [10usize, 100, 500] {
        let files = payload(count, 4096);
        let borrowed: Vec<(&str, &[u8])> =
            files.iter().map(|(path, bytes)| (path.as_str(), bytes.as_slice())).collect();
        let definition = package(0, "1.0.0");

        group.throughput(Throughput::Bytes((count * 4096) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &borrowed, |b, borrowed| {
            b.iter(|| black_box(package_archive_bytes(&definition, borrowed)))
        });
    }

    group.finish();
}

fn bench_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("archive_extract");
    group.sample_size(20);

    for count in [10usize, 100] {
        let bytes = archive(count, 4096);
        group.throughput(Throughput::Bytes((count * 4096) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &bytes, |b, bytes| {
            b.iter_with_setup(
                || TempDir::new().unwrap_or_else(|e| panic!("tempdir: {}", e)),
                |dir| black_box(extract_package(bytes.as_slice(), dir.path())),
            )
        });
    }

    group.finish();
}

fn bench_install_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("install_target");
    group.sample_size(20);

    let source = TempDir::new().unwrap_or_else(|e| panic!("tempdir: {}", e));
    let archive_path = source.path().join("bench.tar.gz");
    std::fs::write(&archive_path, archive(50, 1024)).unwrap_or_else(|e| panic!("write: {}", e));
    let definition = package(0, "1.0.0");

    group.bench_function("install_uninstall", |b| {
        b.iter_with_setup(
            || TempDir::new().unwrap_or_else(|e| panic!("tempdir: {}", e)),
            |dir| {
                let target = InstallTarget::new(dir.path());
                if let Ok(record) = target.install(&definition, &archive_path) {
                    black_box(target.uninstall(&record)).ok();
                }
            },
        )
    });

    group.finish();
}

fn bench_hashing(c: &mut Criterion) {
    let mut group = c.benchmark_group("artifact_hash");

    for size in [1024usize, 64 * 1024, 1024 * 1024] {
        let bytes = vec![0x5au8; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &bytes, |b, bytes| {
            b.iter(|| black_box(compute_hash(bytes)))
        });
    }

    group.finish();
}

criterion_group! {
    name = benches;
    config = criterion_config();
    targets = bench_archive_creation, bench_extraction, bench_install_cycle, bench_hashing
}
criterion_main!(benches);
