//! Database operations for the `keyword_snapshots` table.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use trendscope_core::KeywordSnapshot;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `keyword_snapshots` table.
///
/// `public_id` is the aggregator-generated snapshot identifier; `id` is the
/// monotonic row id assigned by the store. The keyword lists live in JSONB.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct KeywordSnapshotRow {
    pub id: i64,
    pub public_id: Uuid,
    pub scenario: String,
    pub geo: String,
    pub top_keywords: Value,
    pub related_kws: Value,
    pub created_at: DateTime<Utc>,
}

/// Decode a row's JSONB payloads back into the domain snapshot.
///
/// # Errors
///
/// Returns [`DbError::Json`] if a stored payload does not match the expected
/// shape.
pub fn snapshot_from_row(row: KeywordSnapshotRow) -> Result<KeywordSnapshot, DbError> {
    Ok(KeywordSnapshot {
        id: row.public_id,
        scenario: row.scenario,
        geo: row.geo,
        top_keywords: serde_json::from_value(row.top_keywords)?,
        related_kws: serde_json::from_value(row.related_kws)?,
        created_at: row.created_at,
    })
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Insert a snapshot and return its generated row id.
///
/// `created_at` is bound from the snapshot rather than defaulted by the
/// database, so the stored timestamp matches the one the aggregator stamped.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails, or [`DbError::Json`] if the
/// keyword lists cannot be serialized.
pub async fn insert_keyword_snapshot(
    pool: &PgPool,
    snapshot: &KeywordSnapshot,
) -> Result<i64, DbError> {
    let top_keywords = serde_json::to_value(&snapshot.top_keywords)?;
    let related_kws = serde_json::to_value(&snapshot.related_kws)?;

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO keyword_snapshots \
             (public_id, scenario, geo, top_keywords, related_kws, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING id",
    )
    .bind(snapshot.id)
    .bind(&snapshot.scenario)
    .bind(&snapshot.geo)
    .bind(top_keywords)
    .bind(related_kws)
    .bind(snapshot.created_at)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// The most recent snapshots for a (scenario, geo) key.
///
/// Ordered by `created_at DESC` then `id DESC`, matching the lookup index.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn latest_keyword_snapshots(
    pool: &PgPool,
    scenario: &str,
    geo: &str,
    limit: i64,
) -> Result<Vec<KeywordSnapshotRow>, DbError> {
    let rows = sqlx::query_as::<_, KeywordSnapshotRow>(
        "SELECT id, public_id, scenario, geo, top_keywords, related_kws, created_at \
         FROM keyword_snapshots \
         WHERE scenario = $1 AND geo = $2 \
         ORDER BY created_at DESC, id DESC \
         LIMIT $3",
    )
    .bind(scenario)
    .bind(geo)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
