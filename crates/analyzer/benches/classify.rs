use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use vantage_analyzer::{aggregate_windows, classify_block, classify_blocks};
use vantage_core::programs::{SYSTEM_PROGRAM, VOTE_PROGRAM};
use vantage_core::{CategoryRatio, PerformanceSample, RawBlock, RawTransaction};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const DEX: &str = "JUP6LkbZbjS1jKKwapdHNy74zcZ3tLUZoi5QNyVTaV4";
const COMPUTE_BUDGET: &str = "ComputeBudget111111111111111111111111111111";

fn make_tx(i: u64) -> RawTransaction {
    // Roughly mainnet shape: mostly votes, compute-budget prefixes on the rest.
    let program_ids = match i % 20 {
        0..=13 => vec![VOTE_PROGRAM],
        14..=16 => vec![COMPUTE_BUDGET, SYSTEM_PROGRAM],
        17..=18 => vec![COMPUTE_BUDGET, COMPUTE_BUDGET, DEX],
        _ => vec![],
    };
    RawTransaction {
        signature: None,
        program_ids: program_ids.into_iter().map(str::to_string).collect(),
    }
}

fn make_block(slot: u64, tx_count: u64) -> RawBlock {
    RawBlock {
        slot,
        blockhash: format!("hash{slot}"),
        parent_slot: slot - 1,
        block_time: None,
        tx_count,
        transactions: (0..tx_count).map(make_tx).collect(),
    }
}

// ---------------------------------------------------------------------------
// Benchmark: single block
// ---------------------------------------------------------------------------

fn bench_classify_block(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify_block");
    for tx_count in [100, 1_000, 4_000] {
        let block = make_block(1, tx_count);
        group.bench_with_input(BenchmarkId::from_parameter(tx_count), &block, |b, block| {
            b.iter(|| black_box(classify_block(block)));
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark: batch (rayon) vs sequential
// ---------------------------------------------------------------------------

fn bench_classify_batch(c: &mut Criterion) {
    let blocks: Vec<RawBlock> = (1..=64).map(|slot| make_block(slot, 1_500)).collect();

    let mut group = c.benchmark_group("classify_batch");
    group.bench_function("parallel", |b| {
        b.iter(|| black_box(classify_blocks(&blocks)));
    });
    group.bench_function("sequential", |b| {
        b.iter(|| black_box(blocks.iter().map(classify_block).collect::<Vec<_>>()));
    });
    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark: window aggregation
// ---------------------------------------------------------------------------

fn bench_windows(c: &mut Criterion) {
    let samples: Vec<PerformanceSample> = (0..720u64)
        .map(|i| PerformanceSample {
            slot: 300_000_000 - i * 150,
            num_transactions: 240_000 + i % 17 * 1_000,
            num_non_vote_transactions: None,
            num_slots: 150,
            sample_period_secs: 60,
        })
        .collect();

    let mut group = c.benchmark_group("aggregate_windows");
    for window in [1, 10, 60] {
        group.bench_with_input(BenchmarkId::from_parameter(window), &window, |b, &window| {
            b.iter(|| black_box(aggregate_windows(&samples, window, &CategoryRatio::DEFAULT)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_classify_block, bench_classify_batch, bench_windows);
criterion_main!(benches);
