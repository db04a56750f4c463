//! Per-block breakdowns and coarse throughput windows.
//!
//! Blocks are classified transaction by transaction. Windows never see
//! transactions: they sum performance samples and split the total by a
//! ratio learned from recent blocks, so both views stay consistent without
//! fetching full detail for every sample.

use crate::classifier::classify;
use rayon::prelude::*;
use vantage_core::{CategoryCounts, CategoryRatio, ClassifiedBlock, PerformanceSample, RawBlock, WindowBucket};

/// Classifies every transaction of `block`.
///
/// A block that reports transactions but yields no counters (fetched
/// without detail, or nothing decoded) is split by
/// [`CategoryRatio::DEFAULT`] instead.
pub fn classify_block(block: &RawBlock) -> ClassifiedBlock {
    let mut counts = CategoryCounts::default();
    for tx in &block.transactions {
        counts.add(classify(tx));
    }

    let tx_count = if counts.is_zero() {
        block.tx_count
    } else {
        counts.total()
    };
    if counts.is_zero() && tx_count > 0 {
        tracing::debug!(slot = block.slot, tx_count, "no breakdown, using fallback ratio");
        counts = CategoryRatio::DEFAULT.split(tx_count);
    }

    ClassifiedBlock {
        slot: block.slot,
        blockhash: block.blockhash.clone(),
        parent_slot: block.parent_slot,
        block_time: block.block_time,
        tx_count,
        vote_count: counts.vote,
        transfer_count: counts.transfer,
        program_count: counts.program,
        other_count: counts.other,
    }
}

/// Classifies a batch in parallel. Output order matches input order.
pub fn classify_blocks(blocks: &[RawBlock]) -> Vec<ClassifiedBlock> {
    blocks.par_iter().map(classify_block).collect()
}

/// Sums the first `window` samples (newest first, as the node returns them)
/// and splits the total by `ratio`. The four parts always add up to
/// `tx_total`.
pub fn aggregate_window(samples: &[PerformanceSample], window: usize, ratio: &CategoryRatio) -> WindowBucket {
    bucket(&samples[..window.min(samples.len())], ratio)
}

/// Consecutive non-overlapping windows over all of `samples`, oldest first.
/// A short trailing chunk (the oldest samples) still forms a bucket.
pub fn aggregate_windows(
    samples: &[PerformanceSample],
    window: usize,
    ratio: &CategoryRatio,
) -> Vec<WindowBucket> {
    if window == 0 {
        return Vec::new();
    }
    let mut buckets: Vec<WindowBucket> = samples.chunks(window).map(|chunk| bucket(chunk, ratio)).collect();
    buckets.reverse();
    buckets
}

fn bucket(samples: &[PerformanceSample], ratio: &CategoryRatio) -> WindowBucket {
    let tx_total: u64 = samples.iter().map(|s| s.num_transactions).sum();
    let split = ratio.split(tx_total);
    WindowBucket {
        start_slot: samples.iter().map(|s| s.slot).min().unwrap_or(0),
        end_slot: samples.iter().map(|s| s.slot).max().unwrap_or(0),
        samples: samples.len(),
        period_secs: samples.iter().map(|s| s.sample_period_secs).sum(),
        tx_total,
        vote: split.vote,
        transfer: split.transfer,
        program: split.program,
        other: split.other,
    }
}
