//! Codec performance benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use framewright_codec::checksum::{crc_step, frame_syndrome};
use framewright_codec::{BitstreamDecoder, BitstreamGenerator, FrameChain, FrameStore};

/// `rows` rows of 64 frames, every 7th bit set outside the ECC words
fn build_frames(rows: u32) -> (FrameStore, FrameChain) {
    let addresses: Vec<u32> = (0..rows)
        .flat_map(|row| (0..64).map(move |minor| (row << 18) | minor))
        .collect();
    let mut store = FrameStore::with_addresses(addresses.iter().copied());
    for &addr in &addresses {
        for bit in (0..45 * 32).step_by(7) {
            store.set_bit(addr, bit).unwrap();
        }
    }
    (store, FrameChain::from_addresses(addresses))
}

fn benchmark_crc(c: &mut Criterion) {
    let words: Vec<u32> = (0..4096u32).map(|i| i.wrapping_mul(0x9E37_79B9)).collect();
    let mut group = c.benchmark_group("crc");
    group.throughput(Throughput::Bytes((words.len() * 4) as u64));
    group.bench_function("fdri_words", |b| {
        b.iter(|| {
            let crc = words
                .iter()
                .fold(0u32, |crc, &word| crc_step(0x02, word, crc));
            black_box(crc)
        });
    });
    group.finish();
}

fn benchmark_ecc(c: &mut Criterion) {
    let dense = [0xA5A5_A5A5u32; 93];
    let sparse = {
        let mut words = [0u32; 93];
        words[3] = 1 << 9;
        words[80] = 1 << 30;
        words
    };

    let mut group = c.benchmark_group("ecc");
    for (name, words) in [("dense", dense), ("sparse", sparse)] {
        group.bench_with_input(BenchmarkId::from_parameter(name), &words, |b, words| {
            b.iter(|| black_box(frame_syndrome(words)));
        });
    }
    group.finish();
}

fn benchmark_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("bitstream");
    group.sample_size(20);

    for rows in [1u32, 8] {
        let (store, chain) = build_frames(rows);
        let generator = BitstreamGenerator::default();
        let data = generator.generate(&store, &chain).unwrap().data;

        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::new("encode", rows), &rows, |b, _| {
            b.iter(|| black_box(generator.generate(&store, &chain).unwrap().data.len()));
        });
        group.bench_with_input(BenchmarkId::new("decode", rows), &data, |b, data| {
            let decoder = BitstreamDecoder::new(&chain);
            b.iter(|| black_box(decoder.decode(data).unwrap().events.len()));
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_crc, benchmark_ecc, benchmark_round_trip);
criterion_main!(benches);
