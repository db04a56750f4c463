//! Transaction classification, block and window aggregation, reports and
//! data sinks.

pub mod aggregate;
pub mod classifier;
pub mod feed;
pub mod reporter;
pub mod sink;

pub use aggregate::{aggregate_window, aggregate_windows, classify_block, classify_blocks};
pub use classifier::classify;
pub use feed::BlockFeed;
