//! Performance benchmarks for vaultdrop-crypto.
//!
//! Run with: `cargo bench -p vaultdrop-crypto`

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use vaultdrop_crypto::aead::{AeadKey, Nonce, chunk_nonce};
use vaultdrop_crypto::hash::ContentHash;

fn bench_chunk_seal(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk_seal");

    let key = AeadKey::new([0x42u8; 32]);
    let base = Nonce::from_bytes([0u8; 24]);

    for size in [1024, 16384, 65536] {
        let plaintext = vec![0xAA; size];

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| key.encrypt(black_box(&chunk_nonce(&base, 7)), black_box(&plaintext), b""))
        });
    }

    group.finish();
}

fn bench_chunk_open(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk_open");

    let key = AeadKey::new([0x42u8; 32]);
    let nonce = chunk_nonce(&Nonce::from_bytes([0u8; 24]), 7);

    for size in [1024, 16384, 65536] {
        let ciphertext = key.encrypt(&nonce, &vec![0xAA; size], b"").unwrap();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| key.decrypt(black_box(&nonce), black_box(&ciphertext), b""))
        });
    }

    group.finish();
}

fn bench_content_hash(c: &mut Criterion) {
    let mut group = c.benchmark_group("content_hash");
    let data = vec![0x5A; 1024 * 1024];

    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_function("1MiB", |b| b.iter(|| ContentHash::of(black_box(&data))));

    group.finish();
}

criterion_group!(benches, bench_chunk_seal, bench_chunk_open, bench_content_hash);
criterion_main!(benches);
