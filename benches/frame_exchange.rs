//! Criterion benchmarks for the frame hand-off hot paths.
//!
//! Key metrics:
//! - Chunk append throughput into a warmed-up assembly buffer
//! - Publish + retrieve round trip for a VGA frame
//! - Retrieval latency with a producer running concurrently
//!
//! Run with: cargo bench --bench frame_exchange

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rust_vidcap::assembler::FrameAssembler;
use rust_vidcap::exchange::{FrameExchange, FrameStatus};
use rust_vidcap::hardware::{BackendError, ChunkFlag, ChunkPort, ChunkSlot};
use rust_vidcap::stats::CaptureStats;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use vidcap_pool::{FrameBuffer, GrowthPolicy};

const VGA_RGB: usize = 640 * 480 * 3;

struct NullPort;

impl ChunkPort for NullPort {
    fn is_enabled(&self) -> bool {
        true
    }
    fn try_get_free_chunk(&self) -> Option<ChunkSlot> {
        None
    }
    fn send_chunk(&self, _slot: ChunkSlot) -> Result<(), BackendError> {
        Ok(())
    }
}

/// Appending chunks of various sizes once the buffer has reached its
/// steady-state capacity (no allocation on the hot path).
fn buffer_append_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_buffer_append");

    for (name, chunk) in [("4KB", 4096), ("64KB", 64 * 1024), ("300KB", 300_000)] {
        let data = vec![0xabu8; chunk];
        let mut buf = FrameBuffer::with_capacity(VGA_RGB).unwrap();

        group.throughput(Throughput::Bytes(chunk as u64));
        group.bench_with_input(BenchmarkId::new("append", name), &chunk, |b, _| {
            b.iter(|| {
                if buf.size() + data.len() > VGA_RGB {
                    buf.reset();
                }
                buf.try_append(black_box(&data)).unwrap();
            });
        });
    }

    group.finish();
}

/// Full frame through the assembler, then copied out by a consumer.
fn publish_retrieve_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_exchange");
    let stats = Arc::new(CaptureStats::new());
    let (writing, completed) = vidcap_pool::split(VGA_RGB, GrowthPolicy::Exact, None).unwrap();
    let exchange = Arc::new(FrameExchange::new(completed, Arc::clone(&stats)));
    let mut asm = FrameAssembler::new(writing, Arc::clone(&exchange), stats);

    let frame = vec![7u8; VGA_RGB];
    let mut dst = vec![0u8; VGA_RGB];

    group.throughput(Throughput::Bytes(VGA_RGB as u64));
    group.bench_function("vga_round_trip", |b| {
        b.iter(|| {
            for chunk in frame.chunks(VGA_RGB / 3) {
                asm.on_chunk(chunk, ChunkFlag::None, &NullPort);
            }
            asm.on_chunk(&[], ChunkFlag::FrameEnd, &NullPort);

            let mut guard = exchange.lock();
            let result = guard.retrieve_frame(black_box(&mut dst)).unwrap();
            black_box(result);
        });
    });

    group.finish();
}

/// Consumer retrieval while a producer thread publishes as fast as it can.
fn contended_retrieve(c: &mut Criterion) {
    let stats = Arc::new(CaptureStats::new());
    let (mut writing, completed) = vidcap_pool::split(4096, GrowthPolicy::Exact, None).unwrap();
    let exchange = Arc::new(FrameExchange::new(completed, Arc::clone(&stats)));
    let stop = Arc::new(AtomicBool::new(false));

    let producer = {
        let exchange = Arc::clone(&exchange);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let payload = [1u8; 4096];
            while !stop.load(Ordering::Relaxed) {
                writing.try_append(&payload).unwrap();
                exchange.publish(&mut writing, FrameStatus::Complete);
            }
        })
    };

    let mut dst = Vec::with_capacity(4096);
    c.bench_function("contended_retrieve_4KB", |b| {
        b.iter(|| {
            let mut guard = exchange.lock();
            black_box(guard.retrieve_into(&mut dst));
        });
    });

    stop.store(true, Ordering::Relaxed);
    producer.join().unwrap();
    exchange.request_shutdown();
}

criterion_group!(
    benches,
    buffer_append_throughput,
    publish_retrieve_round_trip,
    contended_retrieve
);
criterion_main!(benches);
