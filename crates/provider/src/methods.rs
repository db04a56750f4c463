//! Typed facade over the dispatcher: one function per consumed RPC method,
//! each with its own cache key, cache tier and result decoder.

use crate::rpc::{CachePolicy, RpcDispatcher};
use crate::wire::{
    decode_block, decode_transaction_detail, AccountEncoding, AccountInfo, BlockDetail,
    BlockProduction, ClusterNode, EpochInfo, KeyedAccount, NodeVersion, ProgramAccountFilter,
    Supply, TransactionDetail, VoteAccounts, WithContext,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use vantage_core::error::VantageResult;
use vantage_core::{CacheTier, PerformanceSample, RawBlock, SignatureInfo};

/// Cheap to clone; all clones share one dispatcher.
#[derive(Clone)]
pub struct SolanaRpc {
    dispatcher: Arc<RpcDispatcher>,
}

fn cached(key: impl Into<String>, tier: CacheTier) -> Option<CachePolicy> {
    Some(CachePolicy::new(key, tier))
}

impl SolanaRpc {
    pub fn new(dispatcher: Arc<RpcDispatcher>) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Arc<RpcDispatcher> {
        &self.dispatcher
    }

    pub async fn get_slot(&self) -> VantageResult<u64> {
        self.dispatcher
            .call_as("getSlot", json!([]), cached("getSlot", CacheTier::Short))
            .await
    }

    pub async fn get_block_height(&self) -> VantageResult<u64> {
        self.dispatcher
            .call_as("getBlockHeight", json!([]), cached("getBlockHeight", CacheTier::Short))
            .await
    }

    pub async fn get_epoch_info(&self) -> VantageResult<EpochInfo> {
        self.dispatcher
            .call_as("getEpochInfo", json!([]), cached("getEpochInfo", CacheTier::Short))
            .await
    }

    /// Newest sample first, as the node returns them.
    pub async fn get_recent_performance_samples(
        &self,
        limit: usize,
    ) -> VantageResult<Vec<PerformanceSample>> {
        self.dispatcher
            .call_as(
                "getRecentPerformanceSamples",
                json!([limit]),
                cached(format!("getRecentPerformanceSamples:{limit}"), CacheTier::Short),
            )
            .await
    }

    /// Confirmed blocks are immutable, so they sit in the long tier.
    pub async fn get_block(&self, slot: u64, detail: BlockDetail) -> VantageResult<RawBlock> {
        let value = self
            .dispatcher
            .call(
                "getBlock",
                json!([slot, {
                    "encoding": "json",
                    "transactionDetails": detail.as_str(),
                    "maxSupportedTransactionVersion": 0,
                    "rewards": false,
                }]),
                cached(format!("getBlock:{slot}:{}", detail.as_str()), CacheTier::Long),
            )
            .await?;
        decode_block(slot, value)
    }

    /// Slots in `[start, end]` that produced a block.
    pub async fn get_blocks(&self, start: u64, end: u64) -> VantageResult<Vec<u64>> {
        self.dispatcher
            .call_as(
                "getBlocks",
                json!([start, end]),
                cached(format!("getBlocks:{start}:{end}"), CacheTier::Short),
            )
            .await
    }

    pub async fn get_balance(&self, address: &str) -> VantageResult<u64> {
        let balance: WithContext<u64> = self
            .dispatcher
            .call_as(
                "getBalance",
                json!([address]),
                cached(format!("getBalance:{address}"), CacheTier::Short),
            )
            .await?;
        Ok(balance.value)
    }

    /// `None` when the account does not exist.
    pub async fn get_account_info(
        &self,
        address: &str,
        encoding: AccountEncoding,
    ) -> VantageResult<Option<AccountInfo>> {
        let info: WithContext<Option<AccountInfo>> = self
            .dispatcher
            .call_as(
                "getAccountInfo",
                json!([address, { "encoding": encoding.as_str() }]),
                cached(
                    format!("getAccountInfo:{address}:{}", encoding.as_str()),
                    CacheTier::Short,
                ),
            )
            .await?;
        Ok(info.value)
    }

    /// Filtered program-account scan, cached in the medium tier.
    pub async fn get_program_accounts(
        &self,
        program: &str,
        filters: &[ProgramAccountFilter],
        encoding: AccountEncoding,
    ) -> VantageResult<Vec<KeyedAccount>> {
        let key = filters.iter().fold(
            format!("getProgramAccounts:{program}:{}", encoding.as_str()),
            |mut key, f| {
                key.push(':');
                key.push_str(&f.cache_fragment());
                key
            },
        );
        self.program_accounts(program, filters, encoding, cached(key, CacheTier::Medium))
            .await
    }

    /// Same scan, always from the network. For callers that rate-limit
    /// themselves and need a fresh view when they do run.
    pub async fn scan_program_accounts(
        &self,
        program: &str,
        filters: &[ProgramAccountFilter],
        encoding: AccountEncoding,
    ) -> VantageResult<Vec<KeyedAccount>> {
        self.program_accounts(program, filters, encoding, None).await
    }

    async fn program_accounts(
        &self,
        program: &str,
        filters: &[ProgramAccountFilter],
        encoding: AccountEncoding,
        cache: Option<CachePolicy>,
    ) -> VantageResult<Vec<KeyedAccount>> {
        let mut config = json!({ "encoding": encoding.as_str() });
        if !filters.is_empty() {
            config["filters"] = Value::Array(filters.iter().map(|f| f.to_json()).collect());
        }
        self.dispatcher
            .call_as("getProgramAccounts", json!([program, config]), cache)
            .await
    }

    pub async fn get_vote_accounts(&self) -> VantageResult<VoteAccounts> {
        self.dispatcher
            .call_as("getVoteAccounts", json!([]), cached("getVoteAccounts", CacheTier::Medium))
            .await
    }

    pub async fn get_cluster_nodes(&self) -> VantageResult<Vec<ClusterNode>> {
        self.dispatcher
            .call_as("getClusterNodes", json!([]), cached("getClusterNodes", CacheTier::Medium))
            .await
    }

    pub async fn get_supply(&self) -> VantageResult<Supply> {
        let supply: WithContext<Supply> = self
            .dispatcher
            .call_as(
                "getSupply",
                json!([{ "excludeNonCirculatingAccountsList": true }]),
                cached("getSupply", CacheTier::Medium),
            )
            .await?;
        Ok(supply.value)
    }

    pub async fn get_transaction_count(&self) -> VantageResult<u64> {
        self.dispatcher
            .call_as(
                "getTransactionCount",
                json!([]),
                cached("getTransactionCount", CacheTier::Short),
            )
            .await
    }

    /// Newest first.
    pub async fn get_signatures_for_address(
        &self,
        address: &str,
        limit: usize,
    ) -> VantageResult<Vec<SignatureInfo>> {
        self.dispatcher
            .call_as(
                "getSignaturesForAddress",
                json!([address, { "limit": limit }]),
                cached(
                    format!("getSignaturesForAddress:{address}:{limit}"),
                    CacheTier::Short,
                ),
            )
            .await
    }

    pub async fn get_transaction(&self, signature: &str) -> VantageResult<Option<TransactionDetail>> {
        let value = self
            .dispatcher
            .call(
                "getTransaction",
                json!([signature, {
                    "encoding": "json",
                    "maxSupportedTransactionVersion": 0,
                }]),
                cached(format!("getTransaction:{signature}"), CacheTier::Long),
            )
            .await?;
        decode_transaction_detail(value)
    }

    /// Identity → leader slot offsets for the current epoch.
    pub async fn get_leader_schedule(&self) -> VantageResult<Option<HashMap<String, Vec<u64>>>> {
        self.dispatcher
            .call_as(
                "getLeaderSchedule",
                json!([]),
                cached("getLeaderSchedule", CacheTier::Long),
            )
            .await
    }

    /// Block production over `range`, or the node's default (current epoch).
    pub async fn get_block_production(
        &self,
        range: Option<(u64, u64)>,
    ) -> VantageResult<BlockProduction> {
        let (params, key) = match range {
            Some((first, last)) => (
                json!([{ "range": { "firstSlot": first, "lastSlot": last } }]),
                format!("getBlockProduction:{first}:{last}"),
            ),
            None => (json!([]), "getBlockProduction".to_string()),
        };
        let production: WithContext<BlockProduction> = self
            .dispatcher
            .call_as("getBlockProduction", params, cached(key, CacheTier::Medium))
            .await?;
        Ok(production.value)
    }

    pub async fn get_version(&self) -> VantageResult<NodeVersion> {
        self.dispatcher
            .call_as("getVersion", json!([]), cached("getVersion", CacheTier::Long))
            .await
    }
}
