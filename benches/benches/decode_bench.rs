use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use num_complex::Complex;
use vna_core::{assemble, decode, RawRecordExt};
use vna_types::{RawRecord, RECORD_SIZE};

/// Буфер FIFO из `n` записей с медленно вращающимся опорным каналом.
fn fifo_buffer(n: usize) -> Vec<u8> {
    let mut buf = Vec::with_capacity(n * RECORD_SIZE);

    for i in 0..n {
        let phase = i as f64 * 0.05;
        let re = (phase.cos() * 1e6) as i32;
        let im = (phase.sin() * 1e6) as i32;

        let rec = RawRecord::new(
            Complex::new(re, im),
            Complex::new(re / 3, -im / 2),
            Complex::new(re / 2, im / 4),
            i as u16,
        );
        buf.extend_from_slice(&rec.serialize());
    }

    buf
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    for points in [101usize, 1_024, 10_000] {
        let buf = fifo_buffer(points);
        group.throughput(Throughput::Bytes(buf.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(points), &buf, |b, buf| {
            b.iter(|| black_box(decode(black_box(buf))))
        });
    }

    group.finish();
}

fn bench_decode_and_assemble(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_assemble");

    for points in [101usize, 1_024, 10_000] {
        let buf = fifo_buffer(points);
        group.bench_with_input(BenchmarkId::from_parameter(points), &buf, |b, buf| {
            b.iter(|| {
                let out = decode(buf);
                black_box(assemble(&out.samples, 1_000_000, 3_000_000_000))
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_decode, bench_decode_and_assemble);
criterion_main!(benches);
