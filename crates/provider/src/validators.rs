//! Validator table: vote accounts joined with gossip data, block production
//! and resolved identities.

use crate::identity::IdentityResolver;
use crate::methods::SolanaRpc;
use crate::wire::{BlockProduction, ClusterNode, VoteAccount};
use std::collections::HashMap;
use vantage_core::error::VantageResult;
use vantage_core::EnrichedValidator;

#[derive(Clone)]
pub struct ValidatorDirectory {
    rpc: SolanaRpc,
    identities: IdentityResolver,
}

impl ValidatorDirectory {
    pub fn new(rpc: SolanaRpc, identities: IdentityResolver) -> Self {
        Self { rpc, identities }
    }

    /// Every current and delinquent validator, highest stake first.
    ///
    /// Vote accounts and cluster nodes are required. Block production is
    /// optional: if it fails, every row carries `skip_rate: None`.
    pub async fn list(&self) -> VantageResult<Vec<EnrichedValidator>> {
        let (accounts, production) = tokio::join!(
            async { tokio::try_join!(self.rpc.get_vote_accounts(), self.rpc.get_cluster_nodes()) },
            self.rpc.get_block_production(None),
        );
        let (votes, nodes) = accounts?;
        let production = production
            .map_err(|e| tracing::warn!(error = %e, "block production unavailable, skip rates omitted"))
            .ok();

        let nodes: HashMap<&str, &ClusterNode> =
            nodes.iter().map(|n| (n.pubkey.as_str(), n)).collect();

        let mut rows: Vec<EnrichedValidator> = votes
            .current
            .iter()
            .map(|v| (v, false))
            .chain(votes.delinquent.iter().map(|v| (v, true)))
            .map(|(v, delinquent)| self.enrich(v, delinquent, &nodes, production.as_ref()))
            .collect();

        rows.sort_by(|a, b| {
            b.activated_stake
                .cmp(&a.activated_stake)
                .then_with(|| a.vote_pubkey.cmp(&b.vote_pubkey))
        });
        tracing::debug!(validators = rows.len(), "validator table built");
        Ok(rows)
    }

    fn enrich(
        &self,
        vote: &VoteAccount,
        delinquent: bool,
        nodes: &HashMap<&str, &ClusterNode>,
        production: Option<&BlockProduction>,
    ) -> EnrichedValidator {
        let node = nodes.get(vote.node_pubkey.as_str());
        EnrichedValidator {
            vote_pubkey: vote.vote_pubkey.clone(),
            node_pubkey: vote.node_pubkey.clone(),
            identity: self
                .identities
                .resolve(&vote.node_pubkey, Some(&vote.vote_pubkey)),
            activated_stake: vote.activated_stake,
            commission: vote.commission,
            last_vote: vote.last_vote,
            root_slot: vote.root_slot,
            delinquent,
            version: node.and_then(|n| n.version.clone()),
            gossip: node.and_then(|n| n.gossip.clone()),
            skip_rate: production.and_then(|p| p.skip_rate(&vote.node_pubkey)),
        }
    }
}
