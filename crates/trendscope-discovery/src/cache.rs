//! Snapshot cache orchestration: staleness policy, single-flight refresh,
//! stale fallback.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;

use trendscope_core::{
    AggregationError, KeywordSnapshot, ScenarioConfig, ScenarioSet, SnapshotStore,
};

use crate::aggregator::SnapshotAggregator;

/// A snapshot plus how it was served.
#[derive(Debug, Clone)]
pub struct CachedSnapshot {
    pub snapshot: KeywordSnapshot,
    /// `true` when served from the store without a fresh aggregation.
    pub from_cache: bool,
    /// `true` when the snapshot is older than the requested `max_age` and was
    /// served only because the refresh failed.
    pub stale: bool,
}

/// Decides per request whether to serve a stored snapshot or trigger a fresh
/// aggregation.
///
/// Cloning is cheap; clones share the same single-flight registry.
#[derive(Clone)]
pub struct SnapshotCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    scenarios: ScenarioSet,
    aggregator: SnapshotAggregator,
    store: Arc<dyn SnapshotStore>,
    /// One gate per (scenario, geo) so refreshes for unrelated keys never
    /// serialize against each other. The keyspace is bounded by the
    /// configured scenarios, so entries are never evicted.
    inflight: Mutex<HashMap<(String, String), Arc<Mutex<()>>>>,
}

impl SnapshotCache {
    #[must_use]
    pub fn new(
        scenarios: ScenarioSet,
        aggregator: SnapshotAggregator,
        store: Arc<dyn SnapshotStore>,
    ) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                scenarios,
                aggregator,
                store,
                inflight: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Serve the most recent snapshot for (scenario, geo) if it is younger
    /// than `max_age`, otherwise aggregate a fresh one.
    ///
    /// Concurrent callers for the same key coalesce onto one in-flight
    /// aggregation. If the refresh fails while an older snapshot exists, that
    /// snapshot is returned marked stale instead of surfacing the error.
    ///
    /// # Errors
    ///
    /// - [`AggregationError::InvalidConfig`] for an unknown scenario id.
    /// - [`AggregationError::NoData`] when the refresh failed and no prior
    ///   snapshot exists to fall back to.
    pub async fn get_or_refresh(
        &self,
        scenario_id: &str,
        geo: Option<&str>,
        max_age: Duration,
    ) -> Result<CachedSnapshot, AggregationError> {
        self.lookup(scenario_id, geo, Some(max_age)).await
    }

    /// Aggregate a fresh snapshot regardless of what the store holds.
    ///
    /// Still participates in single-flight, so concurrent forced refreshes of
    /// the same key run one at a time.
    ///
    /// # Errors
    ///
    /// Same error behavior as [`SnapshotCache::get_or_refresh`], including
    /// the stale fallback.
    pub async fn force_refresh(
        &self,
        scenario_id: &str,
        geo: Option<&str>,
    ) -> Result<CachedSnapshot, AggregationError> {
        self.lookup(scenario_id, geo, None).await
    }

    /// Read-only passthrough to the store's most-recent-N query.
    ///
    /// # Errors
    ///
    /// - [`AggregationError::InvalidConfig`] for an unknown scenario id.
    /// - [`AggregationError::Store`] if the lookup failed.
    pub async fn history(
        &self,
        scenario_id: &str,
        geo: Option<&str>,
        limit: i64,
    ) -> Result<Vec<KeywordSnapshot>, AggregationError> {
        let scenario = self.scenario(scenario_id)?;
        let geo = geo.unwrap_or(&scenario.geo);
        Ok(self.inner.store.latest(scenario_id, geo, limit).await?)
    }

    /// Scenarios this cache can serve.
    #[must_use]
    pub fn scenarios(&self) -> &ScenarioSet {
        &self.inner.scenarios
    }

    async fn lookup(
        &self,
        scenario_id: &str,
        geo: Option<&str>,
        max_age: Option<Duration>,
    ) -> Result<CachedSnapshot, AggregationError> {
        let scenario = self.scenario(scenario_id)?.clone();
        let geo = geo.unwrap_or(&scenario.geo).to_string();

        if let Some(max_age) = max_age {
            if let Some(snapshot) = self.stored_snapshot(&scenario.id, &geo, Some(max_age)).await {
                tracing::debug!(scenario = %scenario.id, geo, "serving fresh snapshot from store");
                return Ok(CachedSnapshot {
                    snapshot,
                    from_cache: true,
                    stale: false,
                });
            }
        }

        let gate = self.gate(&scenario.id, &geo).await;
        let _guard = gate.lock().await;

        // Re-check after acquiring the gate: a coalesced waiter finds the
        // refresher's snapshot here instead of fetching again.
        if let Some(max_age) = max_age {
            if let Some(snapshot) = self.stored_snapshot(&scenario.id, &geo, Some(max_age)).await {
                tracing::debug!(scenario = %scenario.id, geo, "coalesced onto a completed refresh");
                return Ok(CachedSnapshot {
                    snapshot,
                    from_cache: true,
                    stale: false,
                });
            }
        }

        match self.refresh(scenario.clone(), geo.clone()).await {
            Ok(snapshot) => Ok(CachedSnapshot {
                snapshot,
                from_cache: false,
                stale: false,
            }),
            Err(err) => {
                if let Some(snapshot) = self.stored_snapshot(&scenario.id, &geo, None).await {
                    tracing::warn!(
                        scenario = %scenario.id,
                        geo,
                        error = %err,
                        "aggregation failed; serving stale snapshot"
                    );
                    return Ok(CachedSnapshot {
                        snapshot,
                        from_cache: true,
                        stale: true,
                    });
                }
                Err(err)
            }
        }
    }

    /// Run aggregate-then-append in a spawned task.
    ///
    /// Spawning means a caller that disconnects mid-refresh does not cancel
    /// work whose cost is already paid; the result still lands in the store
    /// for future callers.
    async fn refresh(
        &self,
        scenario: ScenarioConfig,
        geo: String,
    ) -> Result<KeywordSnapshot, AggregationError> {
        let aggregator = self.inner.aggregator.clone();
        let store = Arc::clone(&self.inner.store);

        let handle = tokio::spawn(async move {
            let snapshot = aggregator.build(&scenario, &geo).await?;
            if let Err(err) = store.append(&snapshot).await {
                tracing::error!(
                    scenario = %snapshot.scenario,
                    geo = %snapshot.geo,
                    error = %err,
                    "failed to persist snapshot; serving unpersisted result"
                );
            }
            Ok::<KeywordSnapshot, AggregationError>(snapshot)
        });

        match handle.await {
            Ok(result) => result,
            Err(err) => Err(AggregationError::Internal(err.to_string())),
        }
    }

    /// Most recent stored snapshot for the key, optionally bounded by age.
    ///
    /// Store read failures degrade to a cache miss rather than failing the
    /// request.
    async fn stored_snapshot(
        &self,
        scenario_id: &str,
        geo: &str,
        max_age: Option<Duration>,
    ) -> Option<KeywordSnapshot> {
        let rows = match self.inner.store.latest(scenario_id, geo, 1).await {
            Ok(rows) => rows,
            Err(err) => {
                tracing::warn!(
                    scenario_id,
                    geo,
                    error = %err,
                    "snapshot lookup failed; treating as cache miss"
                );
                return None;
            }
        };

        let snapshot = rows.into_iter().next()?;
        if let Some(max_age) = max_age {
            let cutoff = chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::MAX);
            if Utc::now() - snapshot.created_at > cutoff {
                return None;
            }
        }
        Some(snapshot)
    }

    async fn gate(&self, scenario_id: &str, geo: &str) -> Arc<Mutex<()>> {
        let mut inflight = self.inner.inflight.lock().await;
        Arc::clone(
            inflight
                .entry((scenario_id.to_string(), geo.to_string()))
                .or_default(),
        )
    }

    fn scenario(&self, scenario_id: &str) -> Result<&ScenarioConfig, AggregationError> {
        self.inner.scenarios.get(scenario_id).ok_or_else(|| {
            AggregationError::InvalidConfig(format!("unknown scenario '{scenario_id}'"))
        })
    }
}
