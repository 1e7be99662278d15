//! Postgres-backed [`SnapshotStore`] adapter.

use async_trait::async_trait;
use sqlx::PgPool;

use trendscope_core::{KeywordSnapshot, SnapshotStore, StoreError};

use crate::snapshots::{insert_keyword_snapshot, latest_keyword_snapshots, snapshot_from_row};
use crate::DbError;

/// Wraps a [`PgPool`] behind the store capability consumed by the cache.
#[derive(Clone)]
pub struct PgSnapshotStore {
    pool: PgPool,
}

impl PgSnapshotStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SnapshotStore for PgSnapshotStore {
    async fn append(&self, snapshot: &KeywordSnapshot) -> Result<(), StoreError> {
        insert_keyword_snapshot(&self.pool, snapshot)
            .await
            .map(|_| ())
            .map_err(into_store_error)
    }

    async fn latest(
        &self,
        scenario: &str,
        geo: &str,
        limit: i64,
    ) -> Result<Vec<KeywordSnapshot>, StoreError> {
        let rows = latest_keyword_snapshots(&self.pool, scenario, geo, limit)
            .await
            .map_err(into_store_error)?;

        rows.into_iter()
            .map(|row| snapshot_from_row(row).map_err(into_store_error))
            .collect()
    }
}

/// Map the concrete database error into the capability-level taxonomy:
/// connection/pool problems are `Unavailable`, everything else `Query`.
fn into_store_error(err: DbError) -> StoreError {
    match err {
        DbError::Sqlx(
            source @ (sqlx::Error::Io(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Tls(_)),
        ) => StoreError::Unavailable(source.to_string()),
        other => StoreError::Query(other.to_string()),
    }
}
