//! One-shot construction of the whole provider stack over a shared
//! dispatcher.

use crate::accounts::AccountService;
use crate::identity::IdentityResolver;
use crate::methods::SolanaRpc;
use crate::rpc::RpcDispatcher;
use crate::snapshot::SnapshotAggregator;
use crate::transport::RpcTransport;
use crate::validators::ValidatorDirectory;
use std::sync::Arc;
use vantage_core::config::ClientConfig;
use vantage_core::error::VantageResult;
use vantage_core::EndpointRegistry;

/// Every service shares one dispatcher, so failover position and the
/// response cache are common to all of them.
#[derive(Clone)]
pub struct ExplorerClient {
    pub rpc: SolanaRpc,
    pub identities: IdentityResolver,
    pub snapshots: SnapshotAggregator,
    pub validators: ValidatorDirectory,
    pub accounts: AccountService,
}

impl ExplorerClient {
    /// HTTP client over `registry`.
    pub fn connect(registry: EndpointRegistry, config: &ClientConfig) -> VantageResult<Self> {
        let dispatcher = RpcDispatcher::http(registry, config)?;
        Ok(Self::from_dispatcher(Arc::new(dispatcher), config))
    }

    /// Same stack over a caller-supplied transport.
    pub fn with_transport(
        registry: EndpointRegistry,
        transport: Arc<dyn RpcTransport>,
        config: &ClientConfig,
    ) -> Self {
        let dispatcher = RpcDispatcher::new(registry, transport, config);
        Self::from_dispatcher(Arc::new(dispatcher), config)
    }

    fn from_dispatcher(dispatcher: Arc<RpcDispatcher>, config: &ClientConfig) -> Self {
        let rpc = SolanaRpc::new(dispatcher);
        let identities = IdentityResolver::new(rpc.clone(), config.identity.clone(), &config.dedup);
        Self {
            snapshots: SnapshotAggregator::new(rpc.clone(), config),
            validators: ValidatorDirectory::new(rpc.clone(), identities.clone()),
            accounts: AccountService::new(rpc.clone()),
            identities,
            rpc,
        }
    }
}
