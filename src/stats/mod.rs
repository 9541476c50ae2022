//! Distributor statistics

pub mod metrics;

pub use metrics::{DistributorStats, StatsSnapshot};
