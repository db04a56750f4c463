//! Centralized error types for the Vantage workspace.

use thiserror::Error;

/// Top-level error enum. Variants map to the failure classes of the RPC core.
///
/// `Clone` so a single failure can be handed to every caller coalesced onto
/// one in-flight request.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum VantageError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request to {url} timed out after {after_ms}ms")]
    Timeout { url: String, after_ms: u64 },

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("All {attempts} endpoints failed; last error: {last}")]
    AllEndpointsFailed { attempts: usize, last: Box<VantageError> },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl VantageError {
    /// Per-endpoint failures that the dispatcher recovers from by moving on
    /// to the next endpoint.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Timeout { .. } | Self::Rpc { .. }
        )
    }
}

pub type VantageResult<T> = Result<T, VantageError>;
