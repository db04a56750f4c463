//! RPC access for Vantage: failover dispatch, caching, call coalescing and
//! the services built on them.

pub mod accounts;
pub mod cache;
pub mod client;
pub mod dedup;
pub mod identity;
pub mod methods;
pub mod rpc;
pub mod snapshot;
pub mod transport;
pub mod validators;
pub mod wire;

use async_trait::async_trait;
use vantage_core::error::VantageResult;
use vantage_core::RawBlock;

pub use accounts::AccountService;
pub use client::ExplorerClient;
pub use identity::IdentityResolver;
pub use methods::SolanaRpc;
pub use rpc::{CachePolicy, RpcDispatcher};
pub use snapshot::SnapshotAggregator;
pub use transport::{HttpTransport, RpcTransport};
pub use validators::ValidatorDirectory;
pub use wire::BlockDetail;

/// Abstraction for fetching recent blocks from any source.
#[async_trait]
pub trait BlockSource: Send + Sync {
    /// Most recent slot the source knows about.
    async fn latest_slot(&self) -> VantageResult<u64>;
    /// Slots in `[start, end]` that produced a block, ascending.
    async fn produced_slots(&self, start: u64, end: u64) -> VantageResult<Vec<u64>>;
    /// One block with full transaction detail.
    async fn block(&self, slot: u64) -> VantageResult<RawBlock>;
}

#[async_trait]
impl BlockSource for SolanaRpc {
    async fn latest_slot(&self) -> VantageResult<u64> {
        self.get_slot().await
    }

    async fn produced_slots(&self, start: u64, end: u64) -> VantageResult<Vec<u64>> {
        self.get_blocks(start, end).await
    }

    async fn block(&self, slot: u64) -> VantageResult<RawBlock> {
        self.get_block(slot, BlockDetail::Full).await
    }
}
