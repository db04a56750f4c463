//! Recent-block feed: fetch the newest produced blocks and classify them.
//!
//! Restartable: every call re-reads the chain tip and re-fetches; there is
//! no cursor.

use crate::aggregate::classify_blocks;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use vantage_core::config::FeedConfig;
use vantage_core::error::{VantageError, VantageResult};
use vantage_core::{CategoryRatio, ClassifiedBlock, RawBlock};
use vantage_provider::BlockSource;

/// Produced slots are searched within this many slots of the tip per block
/// requested. Skipped leader slots make the range wider than `count`.
const LOOKBACK_FACTOR: u64 = 4;
const MIN_LOOKBACK: u64 = 32;

pub struct BlockFeed {
    source: Arc<dyn BlockSource>,
    max_concurrent: usize,
}

impl BlockFeed {
    pub fn new(source: Arc<dyn BlockSource>, config: &FeedConfig) -> Self {
        Self {
            source,
            max_concurrent: config.max_concurrent_blocks.max(1),
        }
    }

    /// The newest `count` blocks, classified, newest first.
    ///
    /// At most `max_concurrent_blocks` fetches are in flight at once. Blocks
    /// that fail to fetch are skipped. Fails only when the tip or the slot
    /// list cannot be read, or when every block fetch failed.
    pub async fn recent_blocks(&self, count: usize) -> VantageResult<Vec<ClassifiedBlock>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let tip = self.source.latest_slot().await?;
        let lookback = (count as u64 * LOOKBACK_FACTOR).max(MIN_LOOKBACK);
        let produced = self
            .source
            .produced_slots(tip.saturating_sub(lookback), tip)
            .await?;

        let wanted: Vec<u64> = produced.iter().rev().take(count).copied().collect();
        if wanted.is_empty() {
            return Ok(Vec::new());
        }

        let results: Vec<(u64, VantageResult<RawBlock>)> = stream::iter(wanted.iter().copied())
            .map(|slot| {
                let source = Arc::clone(&self.source);
                async move { (slot, source.block(slot).await) }
            })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        let mut blocks: Vec<RawBlock> = Vec::with_capacity(wanted.len());
        let mut last_error = None;
        for (slot, result) in results {
            match result {
                Ok(block) => blocks.push(block),
                Err(e) => {
                    tracing::warn!(slot, error = %e, "skipping block");
                    last_error = Some(e);
                }
            }
        }

        if blocks.is_empty() {
            return Err(last_error
                .unwrap_or_else(|| VantageError::Internal("no block fetched".into())));
        }

        let mut classified = classify_blocks(&blocks);
        classified.sort_by(|a, b| b.slot.cmp(&a.slot));
        tracing::debug!(requested = count, fetched = classified.len(), tip, "recent blocks");
        Ok(classified)
    }

    /// Category ratio of the newest `count` blocks. Any feed failure falls
    /// back to [`CategoryRatio::DEFAULT`].
    pub async fn window_ratio(&self, count: usize) -> CategoryRatio {
        match self.recent_blocks(count).await {
            Ok(blocks) => CategoryRatio::from_blocks(&blocks),
            Err(e) => {
                tracing::warn!(error = %e, "block feed unavailable, using default ratio");
                CategoryRatio::DEFAULT
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use vantage_core::programs::{SYSTEM_PROGRAM, VOTE_PROGRAM};
    use vantage_core::RawTransaction;

    /// In-memory chain: a tip, produced slots and per-slot blocks.
    struct MemoryChain {
        tip: u64,
        blocks: HashMap<u64, RawBlock>,
        broken: HashSet<u64>,
        requested: Mutex<Vec<u64>>,
    }

    impl MemoryChain {
        fn new(tip: u64, produced: &[u64]) -> Self {
            let blocks = produced
                .iter()
                .map(|&slot| {
                    let transactions = vec![
                        tx(VOTE_PROGRAM),
                        tx(VOTE_PROGRAM),
                        tx(VOTE_PROGRAM),
                        tx(SYSTEM_PROGRAM),
                    ];
                    let block = RawBlock {
                        slot,
                        blockhash: format!("h{slot}"),
                        parent_slot: slot - 1,
                        block_time: None,
                        tx_count: transactions.len() as u64,
                        transactions,
                    };
                    (slot, block)
                })
                .collect();
            Self {
                tip,
                blocks,
                broken: HashSet::new(),
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    fn tx(program: &str) -> RawTransaction {
        RawTransaction {
            signature: None,
            program_ids: std::iter::once(program.to_string()).collect(),
        }
    }

    #[async_trait]
    impl BlockSource for MemoryChain {
        async fn latest_slot(&self) -> VantageResult<u64> {
            Ok(self.tip)
        }

        async fn produced_slots(&self, start: u64, end: u64) -> VantageResult<Vec<u64>> {
            let mut slots: Vec<u64> = self
                .blocks
                .keys()
                .copied()
                .filter(|s| (start..=end).contains(s))
                .collect();
            slots.sort_unstable();
            Ok(slots)
        }

        async fn block(&self, slot: u64) -> VantageResult<RawBlock> {
            self.requested.lock().unwrap().push(slot);
            if self.broken.contains(&slot) {
                return Err(VantageError::Decode(format!("block {slot}: truncated")));
            }
            self.blocks
                .get(&slot)
                .cloned()
                .ok_or_else(|| VantageError::Rpc { code: -32007, message: "slot skipped".into() })
        }
    }

    #[tokio::test]
    async fn newest_first_and_bounded() {
        let chain = Arc::new(MemoryChain::new(110, &[100, 101, 103, 104, 107, 110]));
        let feed = BlockFeed::new(chain.clone(), &FeedConfig::default());

        let blocks = feed.recent_blocks(4).await.unwrap();
        let slots: Vec<u64> = blocks.iter().map(|b| b.slot).collect();
        assert_eq!(slots, vec![110, 107, 104, 103]);
        assert!(blocks.iter().all(|b| b.vote_count == 3 && b.transfer_count == 1));

        let mut requested = chain.requested.lock().unwrap().clone();
        requested.sort_unstable();
        assert_eq!(requested, vec![103, 104, 107, 110]);
    }

    #[tokio::test]
    async fn failed_fetches_are_skipped() {
        let mut chain = MemoryChain::new(50, &[47, 48, 49, 50]);
        chain.broken.insert(49);
        let feed = BlockFeed::new(Arc::new(chain), &FeedConfig::default());

        let slots: Vec<u64> = feed.recent_blocks(3).await.unwrap().iter().map(|b| b.slot).collect();
        assert_eq!(slots, vec![50, 48]);
    }

    #[tokio::test]
    async fn all_fetches_failing_is_an_error() {
        let mut chain = MemoryChain::new(50, &[49, 50]);
        chain.broken.extend([49, 50]);
        let feed = BlockFeed::new(Arc::new(chain), &FeedConfig::default());

        assert!(matches!(feed.recent_blocks(2).await, Err(VantageError::Decode(_))));
        assert_eq!(feed.window_ratio(2).await, CategoryRatio::DEFAULT);
    }

    #[tokio::test]
    async fn ratio_from_recent_blocks() {
        let feed = BlockFeed::new(Arc::new(MemoryChain::new(10, &[8, 9, 10])), &FeedConfig::default());
        let ratio = feed.window_ratio(3).await;
        assert_eq!(ratio.vote, 0.75);
        assert_eq!(ratio.transfer, 0.25);
        assert!(feed.recent_blocks(0).await.unwrap().is_empty());
    }

    /// Counts `getBlock` calls in flight; each takes a while to answer.
    struct SlowChain {
        tip: u64,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl BlockSource for SlowChain {
        async fn latest_slot(&self) -> VantageResult<u64> {
            Ok(self.tip)
        }

        async fn produced_slots(&self, start: u64, end: u64) -> VantageResult<Vec<u64>> {
            Ok((start..=end).collect())
        }

        async fn block(&self, slot: u64) -> VantageResult<RawBlock> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(RawBlock {
                slot,
                blockhash: format!("h{slot}"),
                parent_slot: slot.saturating_sub(1),
                block_time: None,
                tx_count: 1,
                transactions: vec![tx(VOTE_PROGRAM)],
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn block_fetches_are_bounded() {
        let chain = Arc::new(SlowChain {
            tip: 10_000,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let feed = BlockFeed::new(chain.clone(), &FeedConfig { max_concurrent_blocks: 4 });

        let blocks = feed.recent_blocks(500).await.unwrap();
        assert_eq!(blocks.len(), 500);
        assert_eq!(blocks.first().map(|b| b.slot), Some(10_000));
        assert!(blocks.windows(2).all(|w| w[0].slot > w[1].slot));
        assert_eq!(chain.peak.load(Ordering::SeqCst), 4);
        assert_eq!(chain.in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_concurrency_still_makes_progress() {
        let chain = Arc::new(SlowChain {
            tip: 100,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let feed = BlockFeed::new(chain.clone(), &FeedConfig { max_concurrent_blocks: 0 });

        assert_eq!(feed.recent_blocks(3).await.unwrap().len(), 3);
        assert_eq!(chain.peak.load(Ordering::SeqCst), 1);
    }
}
