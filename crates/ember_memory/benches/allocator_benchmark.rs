//! # Allocator Hot-Path Benchmark
//!
//! The paths that run every frame: block reserve/free cycles, stack bumps,
//! pool pops.
//!
//! Run with: `cargo bench --package ember_memory`

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ember_memory::{BlockAllocator, PoolAllocator, StackAllocator, BLOCK_SIZE};

/// Benchmark: the amortized O(1) reserve/free cycle the cursor exists for.
fn bench_block_cycle(c: &mut Criterion) {
    let mut blocks = BlockAllocator::new(BLOCK_SIZE * 4096).unwrap();

    c.bench_function("block_reserve_free_cycle", |b| {
        b.iter(|| {
            let mut handle = blocks.reserve_blocks(black_box(BLOCK_SIZE * 4)).unwrap();
            blocks.free_blocks(&mut handle);
        });
    });
}

/// Benchmark: a frame's worth of stack bumps followed by a clear.
fn bench_stack_frame(c: &mut Criterion) {
    let mut blocks = BlockAllocator::new(BLOCK_SIZE * 4096).unwrap();
    let mut stack = StackAllocator::new(&mut blocks, 64 * 1024).unwrap();

    c.bench_function("stack_frame_256_allocs", |b| {
        b.iter(|| {
            for _ in 0..256 {
                black_box(stack.alloc(64, 1).unwrap());
            }
            stack.clear();
        });
    });
}

/// Benchmark: pool pop/push pairs.
fn bench_pool_churn(c: &mut Criterion) {
    let mut blocks = BlockAllocator::new(BLOCK_SIZE * 4096).unwrap();
    let mut pool = PoolAllocator::new(&mut blocks, 64, 256).unwrap();

    c.bench_function("pool_alloc_free_pair", |b| {
        b.iter(|| {
            let offset = pool.alloc(&blocks).unwrap();
            pool.free(&mut blocks, black_box(offset)).unwrap();
        });
    });
}

criterion_group!(
    benches,
    bench_block_cycle,
    bench_stack_frame,
    bench_pool_churn
);
criterion_main!(benches);
