//! Domain types for the Vantage explorer core.

use crate::error::{VantageError, VantageResult};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Endpoints
// ---------------------------------------------------------------------------

/// A node address plus any headers that must accompany every request to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub url: String,
    #[serde(default)]
    pub auth_headers: BTreeMap<String, String>,
}

impl Endpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth_headers: BTreeMap::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.auth_headers.insert(name.into(), value.into());
        self
    }
}

/// Parses `URL[|Header:Value]*`, e.g. `https://rpc.example|x-api-key:abc`.
impl FromStr for Endpoint {
    type Err = VantageError;

    fn from_str(s: &str) -> VantageResult<Self> {
        let mut parts = s.split('|');
        let raw_url = parts.next().unwrap_or_default().trim();

        let parsed = url::Url::parse(raw_url)
            .map_err(|e| VantageError::InvalidInput(format!("bad endpoint url {raw_url:?}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(VantageError::InvalidInput(format!(
                "endpoint {raw_url:?} must use http or https"
            )));
        }

        let mut endpoint = Endpoint::new(raw_url);
        for header in parts {
            let (name, value) = header.split_once(':').ok_or_else(|| {
                VantageError::InvalidInput(format!("header {header:?} is not NAME:VALUE"))
            })?;
            let name = name.trim();
            if name.is_empty() {
                return Err(VantageError::InvalidInput(format!(
                    "header {header:?} has an empty name"
                )));
            }
            endpoint = endpoint.with_header(name, value.trim());
        }
        Ok(endpoint)
    }
}

impl fmt::Display for Endpoint {
    // Header values are credentials; only the URL is ever printed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// Static ordered list of candidate nodes. Never empty.
#[derive(Debug, Clone)]
pub struct EndpointRegistry {
    endpoints: Vec<Endpoint>,
}

impl EndpointRegistry {
    pub fn new(endpoints: Vec<Endpoint>) -> VantageResult<Self> {
        if endpoints.is_empty() {
            return Err(VantageError::InvalidInput(
                "endpoint registry needs at least one endpoint".into(),
            ));
        }
        Ok(Self { endpoints })
    }

    /// Builds a registry from `URL[|Header:Value]*` strings.
    pub fn parse<S: AsRef<str>>(specs: &[S]) -> VantageResult<Self> {
        let endpoints = specs
            .iter()
            .map(|s| s.as_ref().parse())
            .collect::<VantageResult<Vec<Endpoint>>>()?;
        Self::new(endpoints)
    }

    pub fn get(&self, index: usize) -> &Endpoint {
        &self.endpoints[index % self.endpoints.len()]
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Endpoint> {
        self.endpoints.iter()
    }
}

// ---------------------------------------------------------------------------
// Caching
// ---------------------------------------------------------------------------

/// Expiry class chosen by a call site. The cache maps it to a TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheTier {
    Short,
    Medium,
    Long,
}

impl CacheTier {
    pub const fn default_ttl(self) -> Duration {
        match self {
            Self::Short => Duration::from_millis(3_000),
            Self::Medium => Duration::from_millis(45_000),
            Self::Long => Duration::from_millis(600_000),
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// One throughput point. `time` is seconds relative to the newest sample
/// (0 for the newest, negative for older ones).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TpsPoint {
    pub time: i64,
    pub tps: f64,
}

/// Aggregated dashboard view, recomputed wholesale on every cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub slot: u64,
    pub block_height: u64,
    pub epoch: u64,
    pub epoch_progress_pct: f64,
    pub slots_remaining: u64,
    pub eta_seconds: u64,
    pub tx_count_total: u64,
    pub tps_current: u64,
    /// Oldest first.
    pub tps_history: Vec<TpsPoint>,
    pub supply_total: u64,
    pub supply_circulating: u64,
    pub supply_non_circulating: u64,
    pub validators_active: usize,
    pub validators_delinquent: usize,
    pub stake_total: u64,
    pub node_version: String,
}

/// One entry of `getRecentPerformanceSamples`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSample {
    pub slot: u64,
    pub num_transactions: u64,
    #[serde(default)]
    pub num_non_vote_transactions: Option<u64>,
    pub num_slots: u64,
    pub sample_period_secs: u64,
}

impl PerformanceSample {
    /// Transactions per second over the sample period; 0 for an empty period.
    pub fn tps(&self) -> f64 {
        if self.sample_period_secs == 0 {
            return 0.0;
        }
        self.num_transactions as f64 / self.sample_period_secs as f64
    }
}

// ---------------------------------------------------------------------------
// Blocks and classification
// ---------------------------------------------------------------------------

/// A transaction reduced to what classification needs: the target program
/// of each decoded instruction, in order.
///
/// `SmallVec<[String; 4]>` keeps typical transactions off the heap list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTransaction {
    pub signature: Option<String>,
    pub program_ids: SmallVec<[String; 4]>,
}

/// A decoded block as fetched from a node.
///
/// `tx_count` is what the node reported. It equals `transactions.len()` when
/// full transaction detail was requested.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawBlock {
    pub slot: u64,
    pub blockhash: String,
    pub parent_slot: u64,
    pub block_time: Option<i64>,
    pub tx_count: u64,
    pub transactions: Vec<RawTransaction>,
}

/// Category assigned to a transaction by the program it invokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxCategory {
    Vote,
    Transfer,
    Program,
    Other,
}

/// Four-way transaction split.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    pub vote: u64,
    pub transfer: u64,
    pub program: u64,
    pub other: u64,
}

impl CategoryCounts {
    pub fn add(&mut self, category: TxCategory) {
        match category {
            TxCategory::Vote => self.vote += 1,
            TxCategory::Transfer => self.transfer += 1,
            TxCategory::Program => self.program += 1,
            TxCategory::Other => self.other += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.vote + self.transfer + self.program + self.other
    }

    pub fn is_zero(&self) -> bool {
        self.total() == 0
    }
}

/// Per-block breakdown. Immutable once derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedBlock {
    pub slot: u64,
    pub blockhash: String,
    pub parent_slot: u64,
    pub block_time: Option<i64>,
    pub tx_count: u64,
    pub vote_count: u64,
    pub transfer_count: u64,
    pub program_count: u64,
    pub other_count: u64,
}

impl ClassifiedBlock {
    pub fn counts(&self) -> CategoryCounts {
        CategoryCounts {
            vote: self.vote_count,
            transfer: self.transfer_count,
            program: self.program_count,
            other: self.other_count,
        }
    }
}

/// Fractions of traffic per category. Always sums to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryRatio {
    pub vote: f64,
    pub transfer: f64,
    pub program: f64,
    pub other: f64,
}

impl CategoryRatio {
    /// 70 / 15 / 10 / 5, used when nothing better is known.
    pub const DEFAULT: Self = Self {
        vote: 0.70,
        transfer: 0.15,
        program: 0.10,
        other: 0.05,
    };

    /// Ratio observed in `counts`, or [`Self::DEFAULT`] for an empty set.
    pub fn from_counts(counts: &CategoryCounts) -> Self {
        let total = counts.total();
        if total == 0 {
            return Self::DEFAULT;
        }
        let t = total as f64;
        Self {
            vote: counts.vote as f64 / t,
            transfer: counts.transfer as f64 / t,
            program: counts.program as f64 / t,
            other: counts.other as f64 / t,
        }
    }

    /// Ratio over the summed counters of `blocks`.
    pub fn from_blocks(blocks: &[ClassifiedBlock]) -> Self {
        let mut sum = CategoryCounts::default();
        for block in blocks {
            sum.vote += block.vote_count;
            sum.transfer += block.transfer_count;
            sum.program += block.program_count;
            sum.other += block.other_count;
        }
        Self::from_counts(&sum)
    }

    /// Distributes `total` by this ratio. Each named bucket is floored and the
    /// remainder lands in `other`, so the parts always sum to `total`.
    pub fn split(&self, total: u64) -> CategoryCounts {
        let t = total as f64;
        let vote = ((t * self.vote).floor() as u64).min(total);
        let transfer = ((t * self.transfer).floor() as u64).min(total - vote);
        let program = ((t * self.program).floor() as u64).min(total - vote - transfer);
        CategoryCounts {
            vote,
            transfer,
            program,
            other: total - vote - transfer - program,
        }
    }
}

impl Default for CategoryRatio {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Throughput summed over consecutive samples and split by category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowBucket {
    pub start_slot: u64,
    pub end_slot: u64,
    pub samples: usize,
    pub period_secs: u64,
    pub tx_total: u64,
    pub vote: u64,
    pub transfer: u64,
    pub program: u64,
    pub other: u64,
}

// ---------------------------------------------------------------------------
// Identities and validators
// ---------------------------------------------------------------------------

/// Human-facing label for a network participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub icon: Option<String>,
    pub website: Option<String>,
}

/// Directory row: subject key plus its identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub subject_key: String,
    pub identity: Identity,
}

/// Vote-account data joined with cluster-node data and the resolved identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedValidator {
    pub vote_pubkey: String,
    pub node_pubkey: String,
    pub identity: Identity,
    pub activated_stake: u64,
    pub commission: u8,
    pub last_vote: u64,
    pub root_slot: u64,
    pub delinquent: bool,
    pub version: Option<String>,
    pub gossip: Option<String>,
    /// `None` when the node has no leader slots in the observed range.
    pub skip_rate: Option<f64>,
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

/// One row of `getSignaturesForAddress`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureInfo {
    pub signature: String,
    pub slot: u64,
    #[serde(default)]
    pub block_time: Option<i64>,
    #[serde(default)]
    pub err: Option<serde_json::Value>,
    #[serde(default)]
    pub memo: Option<String>,
}

/// Balance, owner and recent history of one address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountOverview {
    pub address: String,
    pub lamports: u64,
    pub owner: Option<String>,
    pub executable: bool,
    pub data_len: usize,
    pub recent_signatures: Vec<SignatureInfo>,
}

/// One holder of an SPL token mint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenHolder {
    pub token_account: String,
    pub owner: String,
    /// Raw integer amount as the node reports it.
    pub amount: String,
    pub ui_amount: Option<f64>,
}
