//! Domain models, shared types, configuration and error definitions.
//!
//! Foundation crate -- no async or I/O dependencies.

pub mod config;
pub mod error;
pub mod programs;
pub mod types;

pub use error::{VantageError, VantageResult};
pub use types::{
    AccountOverview, CacheTier, CategoryCounts, CategoryRatio, ClassifiedBlock, EnrichedValidator,
    Endpoint, EndpointRegistry, Identity, IdentityRecord, PerformanceSample, RawBlock,
    RawTransaction, SignatureInfo, Snapshot, TokenHolder, TpsPoint, TxCategory, WindowBucket,
};
