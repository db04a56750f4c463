//! Row export for classified blocks and throughput windows.
//!
//! Two row schemas:
//! - [`BlockRow`]: one per classified block
//! - [`WindowRow`]: one per throughput window
//!
//! Rows are written as NDJSON to stdout or a file, see [`json_stream`].

pub mod json_stream;

use serde::Serialize;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use vantage_core::error::{VantageError, VantageResult};
use vantage_core::{ClassifiedBlock, WindowBucket};

/// One row per classified block, append-only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockRow {
    pub kind: &'static str,
    pub slot: u64,
    pub parent_slot: u64,
    pub blockhash: String,
    pub block_time: Option<i64>,
    pub tx_count: u64,
    pub vote_count: u64,
    pub transfer_count: u64,
    pub program_count: u64,
    pub other_count: u64,
    /// Share of non-vote traffic, 0..=1.
    pub non_vote_share: f64,
    pub observed_at: u64,
}

impl BlockRow {
    pub fn new(block: &ClassifiedBlock, observed_at: u64) -> Self {
        let non_vote = block.tx_count.saturating_sub(block.vote_count);
        Self {
            kind: "block",
            slot: block.slot,
            parent_slot: block.parent_slot,
            blockhash: block.blockhash.clone(),
            block_time: block.block_time,
            tx_count: block.tx_count,
            vote_count: block.vote_count,
            transfer_count: block.transfer_count,
            program_count: block.program_count,
            other_count: block.other_count,
            non_vote_share: if block.tx_count == 0 {
                0.0
            } else {
                non_vote as f64 / block.tx_count as f64
            },
            observed_at,
        }
    }
}

/// One row per throughput window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowRow {
    pub kind: &'static str,
    pub start_slot: u64,
    pub end_slot: u64,
    pub samples: usize,
    pub period_secs: u64,
    pub tx_total: u64,
    pub vote: u64,
    pub transfer: u64,
    pub program: u64,
    pub other: u64,
    /// Mean transactions per second over the window.
    pub tps: f64,
    pub observed_at: u64,
}

impl WindowRow {
    pub fn new(bucket: &WindowBucket, observed_at: u64) -> Self {
        Self {
            kind: "window",
            start_slot: bucket.start_slot,
            end_slot: bucket.end_slot,
            samples: bucket.samples,
            period_secs: bucket.period_secs,
            tx_total: bucket.tx_total,
            vote: bucket.vote,
            transfer: bucket.transfer,
            program: bucket.program,
            other: bucket.other,
            tps: if bucket.period_secs == 0 {
                0.0
            } else {
                bucket.tx_total as f64 / bucket.period_secs as f64
            },
            observed_at,
        }
    }
}

/// Where rows go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkTarget {
    Stdout,
    File(PathBuf),
}

impl std::str::FromStr for SinkTarget {
    type Err = VantageError;

    /// `ndjson` for stdout, `ndjson:/path/to/file` for a file.
    fn from_str(spec: &str) -> VantageResult<Self> {
        match spec.strip_prefix("ndjson") {
            Some("") => Ok(Self::Stdout),
            Some(rest) => match rest.strip_prefix(':') {
                Some(path) if !path.is_empty() => Ok(Self::File(PathBuf::from(path))),
                _ => Err(invalid_sink(spec)),
            },
            None => Err(invalid_sink(spec)),
        }
    }
}

fn invalid_sink(spec: &str) -> VantageError {
    VantageError::InvalidInput(format!("unknown sink '{spec}', use 'ndjson' or 'ndjson:/path'"))
}

/// Seconds since the Unix epoch, for `observed_at`.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_targets() {
        assert_eq!("ndjson".parse::<SinkTarget>().unwrap(), SinkTarget::Stdout);
        assert_eq!(
            "ndjson:/tmp/blocks.ndjson".parse::<SinkTarget>().unwrap(),
            SinkTarget::File(PathBuf::from("/tmp/blocks.ndjson"))
        );
        assert!("ndjson:".parse::<SinkTarget>().is_err());
        assert!("ndjsonx".parse::<SinkTarget>().is_err());
        assert!("starrocks".parse::<SinkTarget>().is_err());
    }

    #[test]
    fn block_row_shares() {
        let block = ClassifiedBlock {
            slot: 5,
            blockhash: "h".into(),
            parent_slot: 4,
            block_time: None,
            tx_count: 8,
            vote_count: 6,
            transfer_count: 1,
            program_count: 1,
            other_count: 0,
        };
        let row = BlockRow::new(&block, 1_700_000_000);
        assert_eq!(row.non_vote_share, 0.25);
        assert_eq!(row.kind, "block");
    }
}
