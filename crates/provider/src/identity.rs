//! Maps public keys to human-facing identities.
//!
//! Resolution order: live on-chain validator-info directory, then the static
//! table below, then a label synthesized from the key itself. The last tier
//! needs no network, so resolution always terminates.

use crate::dedup::Deduplicator;
use crate::methods::SolanaRpc;
use crate::wire::{AccountEncoding, KeyedAccount};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use vantage_core::config::{DedupConfig, IdentityConfig};
use vantage_core::error::VantageResult;
use vantage_core::programs::{CONFIG_PROGRAM, VALIDATOR_INFO_KEY};
use vantage_core::{Identity, IdentityRecord};

// ---------------------------------------------------------------------------
// Static fallback table
// ---------------------------------------------------------------------------

/// Returns the static label for a well-known key, if any.
pub fn lookup_static(key: &str) -> Option<&'static Identity> {
    STATIC_IDENTITIES.get(key)
}

static STATIC_IDENTITIES: LazyLock<HashMap<&'static str, Identity>> = LazyLock::new(|| {
    let entries: &[(&str, &str, Option<&str>)] = &[
        // ── Native programs ──────────────────────────────────────
        ("11111111111111111111111111111111", "System Program", None),
        ("Vote111111111111111111111111111111111111111", "Vote Program", None),
        ("Stake11111111111111111111111111111111111111", "Stake Program", None),
        ("Config1111111111111111111111111111111111111", "Config Program", None),
        ("ComputeBudget111111111111111111111111111111", "Compute Budget", None),
        ("AddressLookupTab1e1111111111111111111111111", "Address Lookup Table", None),
        ("BPFLoaderUpgradeab1e11111111111111111111111", "BPF Upgradeable Loader", None),
        ("BPFLoader2111111111111111111111111111111111", "BPF Loader 2", None),
        ("Va1idator1nfo111111111111111111111111111111", "Validator Info", None),

        // ── SPL ──────────────────────────────────────────────────
        (
            "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA",
            "SPL Token",
            Some("https://spl.solana.com/token"),
        ),
        (
            "TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb",
            "SPL Token-2022",
            Some("https://spl.solana.com/token-2022"),
        ),
        (
            "ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL",
            "Associated Token Account",
            Some("https://spl.solana.com/associated-token-account"),
        ),
        (
            "MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr",
            "SPL Memo",
            Some("https://spl.solana.com/memo"),
        ),

        // ── Sysvars ──────────────────────────────────────────────
        ("SysvarC1ock11111111111111111111111111111111", "Clock Sysvar", None),
        ("SysvarRent111111111111111111111111111111111", "Rent Sysvar", None),
    ];

    entries
        .iter()
        .map(|&(key, name, website)| {
            (
                key,
                Identity {
                    name: name.to_string(),
                    icon: None,
                    website: website.map(str::to_string),
                },
            )
        })
        .collect()
});

/// Deterministic short label: first and last four characters.
pub fn synthesize_label(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return key.to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}…{tail}")
}

// ---------------------------------------------------------------------------
// Directory parsing
// ---------------------------------------------------------------------------

/// Reads one `jsonParsed` config account as a validator-info record.
///
/// Returns `None` for anything that is not a well-formed validator-info
/// entry; the caller skips those.
pub fn parse_validator_info(account: &KeyedAccount) -> Option<IdentityRecord> {
    let parsed = account.account.parsed()?;
    if parsed["type"].as_str()? != "validatorInfo" {
        return None;
    }
    let info = &parsed["info"];

    let subject_key = info["keys"]
        .as_array()?
        .iter()
        .filter(|k| k["signer"].as_bool() == Some(true))
        .filter_map(|k| k["pubkey"].as_str())
        .find(|k| *k != VALIDATOR_INFO_KEY)?
        .to_string();

    let data = &info["configData"];
    let text = |field: &str| -> Option<String> {
        data[field]
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    Some(IdentityRecord {
        subject_key,
        identity: Identity {
            name: text("name")?,
            icon: text("iconUrl"),
            website: text("website"),
        },
    })
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

type Directory = Arc<HashMap<String, Identity>>;

struct Inner {
    rpc: SolanaRpc,
    directory: RwLock<Directory>,
    loaded_at: Mutex<Option<Instant>>,
    refreshes: Deduplicator<usize>,
    config: IdentityConfig,
}

/// Identity lookups over a periodically refreshed on-chain directory.
///
/// Construction does no I/O; the host calls [`initialize`](Self::initialize)
/// and optionally [`spawn_refresher`](Self::spawn_refresher). Clones share
/// state.
#[derive(Clone)]
pub struct IdentityResolver {
    inner: Arc<Inner>,
}

impl IdentityResolver {
    pub fn new(rpc: SolanaRpc, config: IdentityConfig, dedup: &DedupConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                rpc,
                directory: RwLock::new(Arc::new(HashMap::new())),
                loaded_at: Mutex::new(None),
                refreshes: Deduplicator::new(dedup),
                config,
            }),
        }
    }

    /// Loads the directory for the first time. Returns the entry count.
    pub async fn initialize(&self) -> VantageResult<usize> {
        self.refresh_directory().await
    }

    /// Refreshes when the directory is older than the refresh interval or was
    /// never loaded; otherwise returns the current size without I/O.
    ///
    /// Concurrent refreshes share one scan. On failure the previous directory
    /// stays in place.
    pub async fn refresh_directory(&self) -> VantageResult<usize> {
        if self.is_fresh() {
            return Ok(self.len());
        }
        self.rescan().await
    }

    /// Clears the directory and rebuilds it from scratch.
    pub async fn force_refresh(&self) -> VantageResult<usize> {
        *self.inner.directory.write() = Arc::new(HashMap::new());
        *self.inner.loaded_at.lock() = None;
        self.refresh_directory().await
    }

    /// Rescans on a fixed period from a detached task, the first time
    /// immediately. Ticks skip the freshness check so each period costs one
    /// scan.
    ///
    /// Failures are logged and dropped: the directory is best-effort and the
    /// resolver keeps serving the previous one. Abort the handle to stop.
    pub fn spawn_refresher(&self, period: Duration) -> JoinHandle<()> {
        let resolver = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = resolver.rescan().await {
                    tracing::warn!(error = %e, "identity directory refresh failed");
                }
            }
        })
    }

    /// Never fails. Tries `subject` then `alt` against the live directory,
    /// then the static table, then synthesizes a label from `subject`.
    pub fn resolve(&self, subject: &str, alt: Option<&str>) -> Identity {
        let candidates = || std::iter::once(subject).chain(alt);

        let directory = Arc::clone(&self.inner.directory.read());
        if let Some(found) = candidates().find_map(|k| directory.get(k)) {
            return found.clone();
        }
        if let Some(found) = candidates().find_map(lookup_static) {
            return found.clone();
        }
        Identity {
            name: synthesize_label(subject),
            icon: None,
            website: None,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.directory.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn rescan(&self) -> VantageResult<usize> {
        let inner = Arc::clone(&self.inner);
        self.inner
            .refreshes
            .dedupe("identity-directory", move || async move { inner.scan().await })
            .await
    }

    fn is_fresh(&self) -> bool {
        self.inner
            .loaded_at
            .lock()
            .is_some_and(|at| at.elapsed() < self.inner.config.refresh_interval)
    }
}

impl Inner {
    async fn scan(&self) -> VantageResult<usize> {
        let accounts = self
            .rpc
            .scan_program_accounts(CONFIG_PROGRAM, &[], AccountEncoding::JsonParsed)
            .await?;

        let mut directory = HashMap::with_capacity(accounts.len());
        let mut skipped = 0usize;
        for account in &accounts {
            match parse_validator_info(account) {
                Some(record) => {
                    directory.insert(record.subject_key, record.identity);
                }
                None => skipped += 1,
            }
        }

        let loaded = directory.len();
        *self.directory.write() = Arc::new(directory);
        *self.loaded_at.lock() = Some(Instant::now());
        tracing::info!(loaded, skipped, "identity directory refreshed");
        Ok(loaded)
    }
}
