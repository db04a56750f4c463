//! Typed result shapes for the JSON-RPC methods the core consumes.
//!
//! Defensive parsing lives here, one decoder per method, so call sites deal
//! in concrete structs rather than optional field lookups.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use smallvec::SmallVec;
use std::collections::HashMap;
use vantage_core::error::{VantageError, VantageResult};
use vantage_core::{RawBlock, RawTransaction};

/// `{ context, value }` wrapper used by many methods.
#[derive(Debug, Clone, Deserialize)]
pub struct WithContext<T> {
    pub context: Context,
    pub value: T,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Context {
    pub slot: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpochInfo {
    pub absolute_slot: u64,
    pub block_height: u64,
    pub epoch: u64,
    pub slot_index: u64,
    pub slots_in_epoch: u64,
    #[serde(default)]
    pub transaction_count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Supply {
    pub total: u64,
    pub circulating: u64,
    pub non_circulating: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteAccount {
    pub vote_pubkey: String,
    pub node_pubkey: String,
    pub activated_stake: u64,
    pub commission: u8,
    #[serde(default)]
    pub epoch_vote_account: bool,
    pub last_vote: u64,
    #[serde(default)]
    pub root_slot: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteAccounts {
    pub current: Vec<VoteAccount>,
    pub delinquent: Vec<VoteAccount>,
}

impl VoteAccounts {
    /// Active stake of healthy and delinquent validators together.
    pub fn total_stake(&self) -> u64 {
        self.current
            .iter()
            .chain(&self.delinquent)
            .map(|v| v.activated_stake)
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterNode {
    pub pubkey: String,
    #[serde(default)]
    pub gossip: Option<String>,
    #[serde(default)]
    pub rpc: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeVersion {
    #[serde(rename = "solana-core")]
    pub solana_core: String,
    #[serde(rename = "feature-set", default)]
    pub feature_set: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotRange {
    pub first_slot: u64,
    pub last_slot: u64,
}

/// `getBlockProduction` value. `by_identity` maps a node identity to
/// `(leader_slots, blocks_produced)`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockProduction {
    pub by_identity: HashMap<String, (u64, u64)>,
    pub range: SlotRange,
}

impl BlockProduction {
    /// Fraction of leader slots without a produced block; `None` when the
    /// node had no leader slots in range.
    pub fn skip_rate(&self, identity: &str) -> Option<f64> {
        let (leader_slots, produced) = *self.by_identity.get(identity)?;
        if leader_slots == 0 {
            return None;
        }
        let skipped = leader_slots.saturating_sub(produced);
        Some(skipped as f64 / leader_slots as f64)
    }
}

/// Account data as returned by `getAccountInfo` / `getProgramAccounts`.
/// `data` stays untyped: its shape depends on the requested encoding.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub lamports: u64,
    pub owner: String,
    #[serde(default)]
    pub executable: bool,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub space: Option<u64>,
}

impl AccountInfo {
    /// Byte length of the account data, from `space` when the node sends it,
    /// else from a `[base64, "base64"]` payload.
    pub fn data_len(&self) -> usize {
        if let Some(space) = self.space {
            return space as usize;
        }
        match self.data.get(0).and_then(Value::as_str) {
            Some(b64) => base64_decoded_len(b64),
            None => 0,
        }
    }

    /// The `data.parsed` object of a `jsonParsed` account.
    pub fn parsed(&self) -> Option<&Value> {
        self.data.get("parsed")
    }
}

fn base64_decoded_len(encoded: &str) -> usize {
    let padding = encoded.bytes().rev().take_while(|&b| b == b'=').count();
    (encoded.len() / 4 * 3).saturating_sub(padding)
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct KeyedAccount {
    pub pubkey: String,
    pub account: AccountInfo,
}

/// Account data encodings accepted by the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountEncoding {
    Base64,
    JsonParsed,
}

impl AccountEncoding {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Base64 => "base64",
            Self::JsonParsed => "jsonParsed",
        }
    }
}

/// Server-side filters for `getProgramAccounts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgramAccountFilter {
    DataSize(u64),
    /// Base58 `bytes` compared at `offset`.
    Memcmp { offset: usize, bytes: String },
}

impl ProgramAccountFilter {
    pub fn to_json(&self) -> Value {
        match self {
            Self::DataSize(size) => json!({ "dataSize": size }),
            Self::Memcmp { offset, bytes } => json!({ "memcmp": { "offset": offset, "bytes": bytes } }),
        }
    }

    pub fn cache_fragment(&self) -> String {
        match self {
            Self::DataSize(size) => format!("size={size}"),
            Self::Memcmp { offset, bytes } => format!("cmp@{offset}={bytes}"),
        }
    }
}

/// How much transaction detail `getBlock` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockDetail {
    /// Full transactions; each one can be classified.
    Full,
    /// Signatures only; transaction count without breakdown.
    Signatures,
}

impl BlockDetail {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Signatures => "signatures",
        }
    }
}

/// Single transaction as returned by `getTransaction`.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionDetail {
    pub slot: u64,
    pub block_time: Option<i64>,
    pub fee: Option<u64>,
    pub err: Option<Value>,
    pub transaction: RawTransaction,
}

// ---------------------------------------------------------------------------
// Block decoding
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UiBlock {
    blockhash: String,
    parent_slot: u64,
    #[serde(default)]
    block_time: Option<i64>,
    #[serde(default)]
    transactions: Option<Vec<Value>>,
    #[serde(default)]
    signatures: Option<Vec<Value>>,
}

/// Decodes a `getBlock` result fetched with `encoding: "json"`.
///
/// The block header must be well formed. Individual transactions are decoded
/// best-effort: one that cannot be read still counts, with no instructions.
pub fn decode_block(slot: u64, value: Value) -> VantageResult<RawBlock> {
    let block: UiBlock = serde_json::from_value(value)
        .map_err(|e| VantageError::Decode(format!("block {slot}: {e}")))?;

    let transactions: Vec<RawTransaction> = block
        .transactions
        .unwrap_or_default()
        .iter()
        .map(decode_transaction)
        .collect();

    let tx_count = if transactions.is_empty() {
        block.signatures.as_ref().map_or(0, |s| s.len() as u64)
    } else {
        transactions.len() as u64
    };

    Ok(RawBlock {
        slot,
        blockhash: block.blockhash,
        parent_slot: block.parent_slot,
        block_time: block.block_time,
        tx_count,
        transactions,
    })
}

/// Decodes one `{ transaction, meta }` entry into its instruction targets.
///
/// Program ids resolve through the static account keys followed by the
/// lookup-table loaded addresses (writable, then readonly). Out-of-range
/// indexes are dropped. Already-parsed instructions carrying `programId`
/// are taken as-is.
pub fn decode_transaction(entry: &Value) -> RawTransaction {
    let tx = &entry["transaction"];
    let message = &tx["message"];

    let signature = tx["signatures"]
        .get(0)
        .and_then(Value::as_str)
        .map(str::to_string);

    let mut keys: Vec<&str> = message["accountKeys"]
        .as_array()
        .map(|keys| {
            keys.iter()
                .filter_map(|k| k.as_str().or_else(|| k["pubkey"].as_str()))
                .collect()
        })
        .unwrap_or_default();
    for bucket in ["writable", "readonly"] {
        if let Some(loaded) = entry["meta"]["loadedAddresses"][bucket].as_array() {
            keys.extend(loaded.iter().filter_map(Value::as_str));
        }
    }

    let program_ids: SmallVec<[String; 4]> = message["instructions"]
        .as_array()
        .map(|ixs| {
            ixs.iter()
                .filter_map(|ix| {
                    if let Some(program) = ix["programId"].as_str() {
                        return Some(program.to_string());
                    }
                    let index = ix["programIdIndex"].as_u64()? as usize;
                    keys.get(index).map(|k| k.to_string())
                })
                .collect()
        })
        .unwrap_or_default();

    RawTransaction {
        signature,
        program_ids,
    }
}

/// Decodes a `getTransaction` result; `None` when the node does not know it.
pub fn decode_transaction_detail(value: Value) -> VantageResult<Option<TransactionDetail>> {
    if value.is_null() {
        return Ok(None);
    }
    let slot = value["slot"]
        .as_u64()
        .ok_or_else(|| VantageError::Decode("transaction without slot".into()))?;
    let meta = &value["meta"];
    Ok(Some(TransactionDetail {
        slot,
        block_time: value["blockTime"].as_i64(),
        fee: meta["fee"].as_u64(),
        err: meta.get("err").filter(|e| !e.is_null()).cloned(),
        transaction: decode_transaction(&value),
    }))
}
