//! The snapshot-store capability boundary.

use async_trait::async_trait;

use crate::errors::StoreError;
use crate::types::KeywordSnapshot;

/// Append-only persistence for [`KeywordSnapshot`]s.
///
/// Implemented by the Postgres adapter in production and by an in-memory
/// store in tests. `append` never mutates existing rows; retention and
/// cleanup are external concerns.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Persist one snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the snapshot could not be written.
    async fn append(&self, snapshot: &KeywordSnapshot) -> Result<(), StoreError>;

    /// The most recent snapshots for a (scenario, geo) key, ordered by
    /// `created_at` descending.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the lookup failed.
    async fn latest(
        &self,
        scenario: &str,
        geo: &str,
        limit: i64,
    ) -> Result<Vec<KeywordSnapshot>, StoreError>;
}
