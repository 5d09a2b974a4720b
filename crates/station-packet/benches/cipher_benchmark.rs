//! Benchmarks for the advertisement block cipher and service data decoding.
//!
//! ```bash
//! cargo bench -p station-packet
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use station_packet::{decode_advertisement, expand_key, BlockCipher, DecodeContext};

const KEY: [u8; 16] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f,
];

fn bench_key_schedule(c: &mut Criterion) {
    c.bench_function("expand_key", |b| b.iter(|| expand_key(black_box(&KEY))));
}

fn bench_blocks(c: &mut Criterion) {
    let cipher = BlockCipher::new(&KEY);
    let mut group = c.benchmark_group("block_cipher");

    for count in [1u32, 64, 1024].iter() {
        group.throughput(Throughput::Elements(u64::from(*count)));
        group.bench_with_input(BenchmarkId::new("encrypt", count), count, |b, &count| {
            b.iter(|| {
                let mut acc = 0u32;
                for block in 0..count {
                    acc ^= cipher.encrypt_block(black_box(block));
                }
                acc
            });
        });
        group.bench_with_input(BenchmarkId::new("decrypt", count), count, |b, &count| {
            b.iter(|| {
                let mut acc = 0u32;
                for block in 0..count {
                    acc ^= cipher.decrypt_block(black_box(block));
                }
                acc
            });
        });
    }

    group.finish();
}

fn bench_background_decode(c: &mut Criterion) {
    let now = 1_700_000_000u64;
    let cipher = BlockCipher::new(&KEY);
    let lsb = (now % 65536) as u16;
    let block = cipher.encrypt_bytes([lsb as u8, (lsb >> 8) as u8, 0x01, 0x2a]);
    let mut payload = vec![7u8];
    payload.extend_from_slice(&block);
    let ctx = DecodeContext::new(now).with_key(cipher);

    c.bench_function("decode_background", |b| {
        b.iter(|| decode_advertisement(8, 0, black_box(&payload), &ctx))
    });
}

criterion_group!(benches, bench_key_schedule, bench_blocks, bench_background_decode);
criterion_main!(benches);
