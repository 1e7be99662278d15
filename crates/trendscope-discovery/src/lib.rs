//! Scenario keyword-snapshot aggregation and caching.
//!
//! [`SnapshotAggregator`] fans out per-seed trend fetches for one scenario,
//! merges the partial results into a single ranked keyword list, and collects
//! related-keyword candidates with provenance. [`SnapshotCache`] decides per
//! request whether to serve a stored snapshot or trigger a fresh aggregation,
//! with single-flight coalescing per (scenario, geo) key.

mod aggregator;
mod cache;

pub use aggregator::{AggregatorSettings, SnapshotAggregator};
pub use cache::{CachedSnapshot, SnapshotCache};

#[cfg(test)]
mod testutil;
