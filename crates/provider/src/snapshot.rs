//! Dashboard snapshot: concurrent fan-out over independent RPC calls, folded
//! into one consistent view.
//!
//! All eight calls must succeed. A failure in any of them fails the whole
//! snapshot so fresh and stale fields are never mixed.

use crate::cache::ResponseCache;
use crate::dedup::Deduplicator;
use crate::methods::SolanaRpc;
use crate::wire::{EpochInfo, NodeVersion, Supply, VoteAccounts};
use std::sync::Arc;
use vantage_core::config::{ClientConfig, ASSUMED_SLOT_TIME_SECS};
use vantage_core::error::VantageResult;
use vantage_core::{CacheTier, PerformanceSample, Snapshot, TpsPoint};

/// Samples requested for the throughput history (one per minute).
pub const TPS_SAMPLE_COUNT: usize = 30;

const SNAPSHOT_KEY: &str = "snapshot";

/// Raw results of the fan-out, before derivation.
#[derive(Debug, Clone)]
pub struct SnapshotParts {
    pub slot: u64,
    pub block_height: u64,
    pub epoch: EpochInfo,
    /// Newest first.
    pub samples: Vec<PerformanceSample>,
    pub supply: Supply,
    pub tx_count: u64,
    pub votes: VoteAccounts,
    pub version: NodeVersion,
}

impl SnapshotParts {
    /// Derives the dashboard view. Pure; no I/O.
    pub fn into_snapshot(self) -> Snapshot {
        let epoch = &self.epoch;
        let slots_remaining = epoch.slots_in_epoch.saturating_sub(epoch.slot_index);
        let epoch_progress_pct = if epoch.slots_in_epoch == 0 {
            0.0
        } else {
            let pct = epoch.slot_index as f64 / epoch.slots_in_epoch as f64 * 100.0;
            (pct * 10.0).round() / 10.0
        };
        let eta_seconds = (slots_remaining as f64 * ASSUMED_SLOT_TIME_SECS).round() as u64;

        Snapshot {
            slot: self.slot,
            block_height: self.block_height,
            epoch: epoch.epoch,
            epoch_progress_pct,
            slots_remaining,
            eta_seconds,
            tx_count_total: self.tx_count,
            tps_current: current_tps(&self.samples),
            tps_history: tps_history(&self.samples),
            supply_total: self.supply.total,
            supply_circulating: self.supply.circulating,
            supply_non_circulating: self.supply.non_circulating,
            validators_active: self.votes.current.len(),
            validators_delinquent: self.votes.delinquent.len(),
            stake_total: self.votes.total_stake(),
            node_version: self.version.solana_core,
        }
    }
}

/// Mean per-sample TPS, rounded; 0 with no samples.
pub fn current_tps(samples: &[PerformanceSample]) -> u64 {
    if samples.is_empty() {
        return 0;
    }
    let sum: f64 = samples.iter().map(PerformanceSample::tps).sum();
    (sum / samples.len() as f64).round() as u64
}

/// Oldest-first history. The newest sample sits at time 0 and each older one
/// is offset by the periods of the samples after it.
pub fn tps_history(samples: &[PerformanceSample]) -> Vec<TpsPoint> {
    let mut offset = 0i64;
    let mut points: Vec<TpsPoint> = samples
        .iter()
        .map(|s| {
            let point = TpsPoint {
                time: -offset,
                tps: (s.tps() * 10.0).round() / 10.0,
            };
            offset += s.sample_period_secs as i64;
            point
        })
        .collect();
    points.reverse();
    points
}

struct Inner {
    rpc: SolanaRpc,
    cache: ResponseCache<Snapshot>,
    inflight: Deduplicator<Snapshot>,
}

/// Produces [`Snapshot`]s, cached in the short tier and coalesced across
/// concurrent callers. Clones share state.
#[derive(Clone)]
pub struct SnapshotAggregator {
    inner: Arc<Inner>,
}

impl SnapshotAggregator {
    pub fn new(rpc: SolanaRpc, config: &ClientConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                rpc,
                cache: ResponseCache::new(config.cache.clone()),
                inflight: Deduplicator::new(&config.dedup),
            }),
        }
    }

    pub async fn get_snapshot(&self) -> VantageResult<Snapshot> {
        if let Some(hit) = self.inner.cache.get(SNAPSHOT_KEY) {
            return Ok(hit);
        }
        let inner = Arc::clone(&self.inner);
        self.inner
            .inflight
            .dedupe(SNAPSHOT_KEY, move || async move {
                let snapshot = inner.fetch_parts().await?.into_snapshot();
                inner.cache.set(SNAPSHOT_KEY, snapshot.clone(), CacheTier::Short);
                Ok(snapshot)
            })
            .await
    }

    /// Drops the cached snapshot so the next call recomputes.
    pub fn invalidate(&self) {
        self.inner.cache.clear();
    }
}

impl Inner {
    async fn fetch_parts(&self) -> VantageResult<SnapshotParts> {
        let rpc = &self.rpc;
        let (slot, block_height, epoch, samples, supply, tx_count, votes, version) = tokio::try_join!(
            rpc.get_slot(),
            rpc.get_block_height(),
            rpc.get_epoch_info(),
            rpc.get_recent_performance_samples(TPS_SAMPLE_COUNT),
            rpc.get_supply(),
            rpc.get_transaction_count(),
            rpc.get_vote_accounts(),
            rpc.get_version(),
        )?;

        tracing::debug!(slot, samples = samples.len(), "snapshot fan-out complete");

        Ok(SnapshotParts {
            slot,
            block_height,
            epoch,
            samples,
            supply,
            tx_count,
            votes,
            version,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::rpc::tests::{dispatcher, Behavior, ScriptedTransport};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::time::Duration;
    use vantage_core::VantageError;

    fn sample(slot: u64, txs: u64, secs: u64) -> PerformanceSample {
        PerformanceSample {
            slot,
            num_transactions: txs,
            num_non_vote_transactions: None,
            num_slots: 150,
            sample_period_secs: secs,
        }
    }

    /// Scripted answers for every method the snapshot fans out to.
    pub(crate) fn node_methods() -> HashMap<&'static str, Value> {
        HashMap::from([
            ("getSlot", json!(250_000_100u64)),
            ("getBlockHeight", json!(230_000_000u64)),
            (
                "getEpochInfo",
                json!({"absoluteSlot": 250_000_100u64, "blockHeight": 230_000_000u64, "epoch": 578,
                       "slotIndex": 108_000, "slotsInEpoch": 432_000, "transactionCount": 9}),
            ),
            (
                "getRecentPerformanceSamples",
                json!([
                    {"slot": 300, "numTransactions": 240_000, "numSlots": 150, "samplePeriodSecs": 60},
                    {"slot": 150, "numTransactions": 180_000, "numSlots": 150, "samplePeriodSecs": 60}
                ]),
            ),
            (
                "getSupply",
                json!({"context": {"slot": 1}, "value": {"total": 600, "circulating": 500,
                        "nonCirculating": 100, "nonCirculatingAccounts": []}}),
            ),
            ("getTransactionCount", json!(400_000_000_000u64)),
            (
                "getVoteAccounts",
                json!({
                    "current": [
                        {"votePubkey": "v1", "nodePubkey": "n1", "activatedStake": 70, "commission": 5, "lastVote": 10, "rootSlot": 1},
                        {"votePubkey": "v2", "nodePubkey": "n2", "activatedStake": 20, "commission": 0, "lastVote": 10, "rootSlot": 1}
                    ],
                    "delinquent": [
                        {"votePubkey": "v3", "nodePubkey": "n3", "activatedStake": 10, "commission": 10, "lastVote": 1, "rootSlot": 0}
                    ]
                }),
            ),
            ("getVersion", json!({"solana-core": "2.1.7", "feature-set": 42})),
        ])
    }

    fn aggregator(methods: HashMap<&'static str, Value>) -> (SnapshotAggregator, Arc<ScriptedTransport>) {
        let transport = ScriptedTransport::new(&[("http://node", Behavior::Methods(methods))]);
        let rpc = SolanaRpc::new(Arc::new(dispatcher(&["http://node"], transport.clone())));
        (SnapshotAggregator::new(rpc, &ClientConfig::default()), transport)
    }

    #[test]
    fn tps_is_mean_of_sample_rates() {
        let samples = [sample(3, 6_000, 60), sample(2, 3_000, 60), sample(1, 0, 0)];
        // (100 + 50 + 0) / 3 = 50
        assert_eq!(current_tps(&samples), 50);
        assert_eq!(current_tps(&[]), 0);
        assert_eq!(current_tps(&[sample(1, 61, 2)]), 31);
    }

    #[test]
    fn history_is_oldest_first_with_relative_times() {
        let history = tps_history(&[sample(3, 600, 60), sample(2, 1_200, 60), sample(1, 300, 30)]);
        let times: Vec<i64> = history.iter().map(|p| p.time).collect();
        assert_eq!(times, vec![-120, -60, 0]);
        assert_eq!(history[2].tps, 10.0);
        assert_eq!(history[0].tps, 10.0);
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_derivations() {
        let (agg, _) = aggregator(node_methods());
        let snap = agg.get_snapshot().await.unwrap();

        assert_eq!(snap.slot, 250_000_100);
        assert_eq!(snap.epoch, 578);
        assert_eq!(snap.epoch_progress_pct, 25.0);
        assert_eq!(snap.slots_remaining, 324_000);
        assert_eq!(snap.eta_seconds, 129_600);
        assert_eq!(snap.tps_current, 3_500);
        assert_eq!(snap.tps_history.len(), 2);
        assert_eq!(snap.supply_circulating, 500);
        assert_eq!(snap.validators_active, 2);
        assert_eq!(snap.validators_delinquent, 1);
        assert_eq!(snap.stake_total, 100);
        assert_eq!(snap.node_version, "2.1.7");
    }

    #[tokio::test(start_paused = true)]
    async fn one_failed_call_fails_the_snapshot() {
        let mut methods = node_methods();
        methods.remove("getSupply");
        let (agg, _) = aggregator(methods);
        let err = agg.get_snapshot().await.unwrap_err();
        assert!(matches!(err, VantageError::AllEndpointsFailed { .. }), "{err}");
    }

    #[tokio::test(start_paused = true)]
    async fn bursts_share_one_computation() {
        let (agg, transport) = aggregator(node_methods());
        let (a, b, c) = tokio::join!(agg.get_snapshot(), agg.get_snapshot(), agg.get_snapshot());
        assert_eq!(a.unwrap(), b.unwrap());
        assert!(c.is_ok());
        assert_eq!(transport.calls_to("getSlot"), 1);

        // Served from the snapshot cache inside the short window.
        tokio::time::advance(Duration::from_secs(2)).await;
        agg.get_snapshot().await.unwrap();
        assert_eq!(transport.calls_to("getSlot"), 1);

        tokio::time::advance(Duration::from_secs(2)).await;
        agg.get_snapshot().await.unwrap();
        assert_eq!(transport.calls_to("getSlot"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn invalidate_forces_a_recompute() {
        let (agg, transport) = aggregator(node_methods());
        agg.get_snapshot().await.unwrap();
        agg.get_snapshot().await.unwrap();
        let requests = agg.inner.rpc.dispatcher().stats().requests;
        assert_eq!(requests, 8);

        // Recomputed from the dispatcher's cached responses, not the network.
        agg.invalidate();
        agg.get_snapshot().await.unwrap();
        let stats = agg.inner.rpc.dispatcher().stats();
        assert_eq!(stats.requests, 16);
        assert_eq!(stats.cache_hits, 8);
        assert_eq!(transport.calls_to("getEpochInfo"), 1);
    }
}
