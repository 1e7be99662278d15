//! The core aggregation algorithm.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use trendscope_core::{
    AggregationError, AppConfig, KeywordScore, KeywordSnapshot, RelatedKeyword, RelatedKind,
    ScenarioConfig, TrendsError, TrendsSource,
};

/// Tunables for one aggregation run.
#[derive(Debug, Clone)]
pub struct AggregatorSettings {
    /// Analysis window passed to the trends source.
    pub timeframe: String,
    /// Deadline for each individual seed fetch. A fetch that exceeds it is
    /// counted as a failed seed, not a fatal error.
    pub seed_fetch_timeout: Duration,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            timeframe: "today 1-m".to_string(),
            seed_fetch_timeout: Duration::from_secs(20),
        }
    }
}

impl AggregatorSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            timeframe: config.trends_timeframe.clone(),
            seed_fetch_timeout: Duration::from_secs(config.seed_fetch_timeout_secs),
        }
    }
}

/// Running tally of every observation contributing to one keyword.
#[derive(Debug, Default)]
struct Observations {
    sum: f64,
    count: u64,
}

impl Observations {
    fn average(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let denom = self.count as f64;
        self.sum / denom
    }
}

/// Builds one immutable [`KeywordSnapshot`] for a scenario.
///
/// The aggregator never persists; handing the snapshot to a store is the
/// caller's responsibility, which keeps the algorithm testable without one.
#[derive(Clone)]
pub struct SnapshotAggregator {
    trends: Arc<dyn TrendsSource>,
    settings: AggregatorSettings,
}

impl SnapshotAggregator {
    #[must_use]
    pub fn new(trends: Arc<dyn TrendsSource>, settings: AggregatorSettings) -> Self {
        Self { trends, settings }
    }

    /// Runs the full aggregation for `scenario` in `geo`.
    ///
    /// Seed fetches run concurrently, each bounded by the per-seed deadline,
    /// so total latency tracks the slowest single seed. Individual seed
    /// failures are absorbed; only total failure aborts.
    ///
    /// # Errors
    ///
    /// - [`AggregationError::InvalidConfig`] if the scenario has no seeds —
    ///   checked before any external call.
    /// - [`AggregationError::NoData`] if every seed fetch failed.
    pub async fn build(
        &self,
        scenario: &ScenarioConfig,
        geo: &str,
    ) -> Result<KeywordSnapshot, AggregationError> {
        if scenario.seeds.is_empty() {
            return Err(AggregationError::InvalidConfig(format!(
                "scenario '{}' has no seed keywords",
                scenario.id
            )));
        }

        let (merged, failed_seeds) = self.fetch_seed_scores(scenario, geo).await;

        if failed_seeds == scenario.seeds.len() {
            tracing::warn!(
                scenario = %scenario.id,
                geo,
                seeds = scenario.seeds.len(),
                "every seed fetch failed"
            );
            return Err(AggregationError::NoData);
        }

        let top_keywords = rank_keywords(merged, scenario.top_n, scenario.min_score);
        let related_kws = self.collect_related(scenario, geo).await;

        let snapshot = KeywordSnapshot {
            id: Uuid::new_v4(),
            scenario: scenario.id.clone(),
            geo: geo.to_string(),
            top_keywords,
            related_kws,
            created_at: Utc::now(),
        };

        tracing::info!(
            scenario = %scenario.id,
            geo,
            failed_seeds,
            top = snapshot.top_keywords.len(),
            related = snapshot.related_kws.len(),
            "built keyword snapshot"
        );

        Ok(snapshot)
    }

    /// Fan out one series fetch per seed and merge the observations.
    ///
    /// Returns the per-keyword tallies and the number of failed seeds. A seed
    /// with no measurable signal contributes a zero-count tally — it still
    /// occupies a ranking slot unless filtered by `min_score`.
    async fn fetch_seed_scores(
        &self,
        scenario: &ScenarioConfig,
        geo: &str,
    ) -> (BTreeMap<String, Observations>, usize) {
        let fetches = scenario.seeds.iter().map(|seed| {
            let timeframe = self.settings.timeframe.as_str();
            async move {
                let outcome = tokio::time::timeout(
                    self.settings.seed_fetch_timeout,
                    self.trends.series(seed, geo, timeframe),
                )
                .await;
                (seed.as_str(), outcome)
            }
        });

        let results = futures::future::join_all(fetches).await;

        let mut merged: BTreeMap<String, Observations> = BTreeMap::new();
        let mut failed = 0usize;

        for (seed, outcome) in results {
            match outcome {
                Err(_) => {
                    tracing::warn!(
                        seed,
                        geo,
                        timeout_secs = self.settings.seed_fetch_timeout.as_secs(),
                        "seed fetch exceeded deadline"
                    );
                    failed += 1;
                }
                Ok(Err(TrendsError::NoData)) => {
                    merged.entry(seed.to_string()).or_default();
                }
                Ok(Err(err)) => {
                    tracing::warn!(seed, geo, error = %err, "seed fetch failed");
                    failed += 1;
                }
                Ok(Ok(series)) => {
                    // Merge under the keyword the source resolved to, so the
                    // same keyword surfacing from several seeds accumulates
                    // into one tally, weighted per observation.
                    let entry = merged.entry(series.keyword.clone()).or_default();
                    for point in &series.points {
                        entry.sum += point.score;
                        entry.count += 1;
                    }
                }
            }
        }

        (merged, failed)
    }

    /// Fan out one related-queries fetch per seed.
    ///
    /// Failures are logged and skipped — related candidates are enrichment,
    /// not a precondition for the snapshot. Candidates are concatenated
    /// without deduplication; a duplicate from a different seed carries
    /// distinct provenance.
    async fn collect_related(&self, scenario: &ScenarioConfig, geo: &str) -> Vec<RelatedKeyword> {
        let fetches = scenario.seeds.iter().map(|seed| async move {
            let outcome = tokio::time::timeout(
                self.settings.seed_fetch_timeout,
                self.trends.related(seed, geo),
            )
            .await;
            (seed.as_str(), outcome)
        });

        let results = futures::future::join_all(fetches).await;

        let mut related_kws = Vec::new();
        for (seed, outcome) in results {
            match outcome {
                Err(_) => {
                    tracing::warn!(seed, geo, "related-query fetch exceeded deadline");
                }
                Ok(Err(err)) => {
                    tracing::warn!(seed, geo, error = %err, "related-query fetch failed");
                }
                Ok(Ok(queries)) => {
                    related_kws.extend(queries.related.into_iter().map(|entry| RelatedKeyword {
                        keyword: entry.query,
                        source: seed.to_string(),
                        kind: RelatedKind::Related,
                        value: entry.value,
                    }));
                    related_kws.extend(queries.rising.into_iter().map(|entry| RelatedKeyword {
                        keyword: entry.query,
                        source: seed.to_string(),
                        kind: RelatedKind::Rising,
                        value: entry.value,
                    }));
                }
            }
        }

        related_kws
    }
}

/// Turn per-keyword tallies into the ranked top list.
///
/// Descending by average score; ties broken by ascending keyword so the
/// ordering is deterministic. Truncated to `top_n` after the optional
/// `min_score` filter.
fn rank_keywords(
    merged: BTreeMap<String, Observations>,
    top_n: usize,
    min_score: Option<f64>,
) -> Vec<KeywordScore> {
    let mut ranked: Vec<KeywordScore> = merged
        .into_iter()
        .map(|(keyword, obs)| KeywordScore {
            keyword,
            avg_score: obs.average(),
        })
        .filter(|ks| min_score.is_none_or(|min| ks.avg_score >= min))
        .collect();

    ranked.sort_by(|a, b| {
        b.avg_score
            .total_cmp(&a.avg_score)
            .then_with(|| a.keyword.cmp(&b.keyword))
    });
    ranked.truncate(top_n);
    ranked
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::testutil::{scenario, ScriptedTrends, SeriesScript};

    fn aggregator(trends: ScriptedTrends) -> SnapshotAggregator {
        SnapshotAggregator::new(Arc::new(trends), AggregatorSettings::default())
    }

    #[tokio::test]
    async fn ranks_descending_with_lexical_tiebreak() {
        let trends = ScriptedTrends::new()
            .with_points("beta", "beta", &[30.0])
            .with_points("alpha", "alpha", &[30.0])
            .with_points("sleep", "sleep", &[80.0]);
        let snapshot = aggregator(trends)
            .build(&scenario("health", &["beta", "alpha", "sleep"]), "TW")
            .await
            .expect("build");

        let keywords: Vec<&str> = snapshot
            .top_keywords
            .iter()
            .map(|k| k.keyword.as_str())
            .collect();
        assert_eq!(keywords, vec!["sleep", "alpha", "beta"]);

        for pair in snapshot.top_keywords.windows(2) {
            assert!(pair[0].avg_score >= pair[1].avg_score);
            if (pair[0].avg_score - pair[1].avg_score).abs() < f64::EPSILON {
                assert!(pair[0].keyword <= pair[1].keyword);
            }
        }
    }

    #[tokio::test]
    async fn merges_overlapping_keywords_per_observation() {
        // Two seeds resolve to the same keyword with equal-length series:
        // the merged score is the plain observation-weighted mean.
        let trends = ScriptedTrends::new()
            .with_points("植牙", "dental implant", &[40.0, 40.0, 40.0, 40.0])
            .with_points("implant", "dental implant", &[60.0, 60.0, 60.0, 60.0]);
        let snapshot = aggregator(trends)
            .build(&scenario("dental", &["植牙", "implant"]), "TW")
            .await
            .expect("build");

        assert_eq!(snapshot.top_keywords.len(), 1);
        assert_eq!(snapshot.top_keywords[0].keyword, "dental implant");
        assert!((snapshot.top_keywords[0].avg_score - 50.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn merge_weights_observations_not_seeds() {
        // One observation at 100 against three at 0: a per-seed average would
        // say 50, a per-observation average says 25.
        let trends = ScriptedTrends::new()
            .with_points("a", "kw", &[100.0])
            .with_points("b", "kw", &[0.0, 0.0, 0.0]);
        let snapshot = aggregator(trends)
            .build(&scenario("s", &["a", "b"]), "TW")
            .await
            .expect("build");

        assert!((snapshot.top_keywords[0].avg_score - 25.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn partial_seed_failure_is_tolerated() {
        let trends = ScriptedTrends::new()
            .with_points("旅遊", "旅遊", &[70.0])
            .with_points("機票", "機票", &[50.0])
            .with_outcome("訂房", SeriesScript::Transient);
        let snapshot = aggregator(trends)
            .build(&scenario("travel", &["旅遊", "機票", "訂房"]), "TW")
            .await
            .expect("two healthy seeds should carry the aggregation");

        let keywords: Vec<&str> = snapshot
            .top_keywords
            .iter()
            .map(|k| k.keyword.as_str())
            .collect();
        assert_eq!(keywords, vec!["旅遊", "機票"]);
    }

    #[tokio::test]
    async fn total_seed_failure_is_no_data() {
        let trends = ScriptedTrends::new()
            .with_outcome("旅遊", SeriesScript::Transient)
            .with_outcome("機票", SeriesScript::RateLimited);
        let result = aggregator(trends)
            .build(&scenario("travel", &["旅遊", "機票"]), "TW")
            .await;

        assert!(matches!(result, Err(AggregationError::NoData)));
    }

    #[tokio::test]
    async fn empty_seed_set_is_invalid_config() {
        let calls = Arc::new(ScriptedTrends::new());
        let agg = SnapshotAggregator::new(calls.clone() as Arc<dyn TrendsSource>, AggregatorSettings::default());
        let result = agg.build(&scenario("hollow", &[]), "TW").await;

        assert!(matches!(result, Err(AggregationError::InvalidConfig(_))));
        assert_eq!(
            calls.series_calls.load(Ordering::SeqCst),
            0,
            "invalid config must be rejected before any fetch"
        );
    }

    #[tokio::test]
    async fn no_data_seed_contributes_zero_score() {
        let trends = ScriptedTrends::new()
            .with_points("健康", "健康", &[60.0])
            .with_outcome("健檢", SeriesScript::NoData);
        let snapshot = aggregator(trends)
            .build(&scenario("health", &["健康", "健檢"]), "TW")
            .await
            .expect("build");

        let zero = snapshot
            .top_keywords
            .iter()
            .find(|k| k.keyword == "健檢")
            .expect("zero-interest seed still occupies a slot");
        assert!(zero.avg_score.abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn min_score_filters_zero_interest_seeds() {
        let trends = ScriptedTrends::new()
            .with_points("健康", "健康", &[60.0])
            .with_outcome("健檢", SeriesScript::NoData);
        let mut config = scenario("health", &["健康", "健檢"]);
        config.min_score = Some(1.0);
        let snapshot = aggregator(trends)
            .build(&config, "TW")
            .await
            .expect("build");

        assert_eq!(snapshot.top_keywords.len(), 1);
        assert_eq!(snapshot.top_keywords[0].keyword, "健康");
    }

    #[tokio::test]
    async fn truncates_to_top_n() {
        let trends = ScriptedTrends::new()
            .with_points("a", "a", &[10.0])
            .with_points("b", "b", &[20.0])
            .with_points("c", "c", &[30.0]);
        let mut config = scenario("s", &["a", "b", "c"]);
        config.top_n = 2;
        let snapshot = aggregator(trends)
            .build(&config, "TW")
            .await
            .expect("build");

        let keywords: Vec<&str> = snapshot
            .top_keywords
            .iter()
            .map(|k| k.keyword.as_str())
            .collect();
        assert_eq!(keywords, vec!["c", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn seed_exceeding_deadline_counts_as_failed() {
        let trends = ScriptedTrends::new()
            .with_points("機票", "機票", &[50.0])
            .with_outcome("旅遊", SeriesScript::Hang);
        let agg = SnapshotAggregator::new(
            Arc::new(trends),
            AggregatorSettings {
                timeframe: "today 1-m".to_string(),
                seed_fetch_timeout: Duration::from_secs(5),
            },
        );
        let snapshot = agg
            .build(&scenario("travel", &["機票", "旅遊"]), "TW")
            .await
            .expect("one timed-out seed must not abort the aggregation");

        let keywords: Vec<&str> = snapshot
            .top_keywords
            .iter()
            .map(|k| k.keyword.as_str())
            .collect();
        assert_eq!(keywords, vec!["機票"]);
    }

    #[tokio::test]
    async fn related_duplicates_keep_provenance() {
        let trends = ScriptedTrends::new()
            .with_points("牙科", "牙科", &[40.0])
            .with_points("矯正", "矯正", &[35.0])
            .with_related("牙科", &[("隱適美", 90.0)], &[])
            .with_related("矯正", &[("隱適美", 100.0)], &[("牙套 價格", 180.0)]);
        let snapshot = aggregator(trends)
            .build(&scenario("dental", &["牙科", "矯正"]), "TW")
            .await
            .expect("build");

        let dupes: Vec<&RelatedKeyword> = snapshot
            .related_kws
            .iter()
            .filter(|r| r.keyword == "隱適美")
            .collect();
        assert_eq!(dupes.len(), 2, "duplicates from different seeds are kept");
        let sources: Vec<&str> = dupes.iter().map(|r| r.source.as_str()).collect();
        assert!(sources.contains(&"牙科"));
        assert!(sources.contains(&"矯正"));

        let rising = snapshot
            .related_kws
            .iter()
            .find(|r| r.kind == RelatedKind::Rising)
            .expect("rising entry");
        assert_eq!(rising.keyword, "牙套 價格");
        assert_eq!(rising.source, "矯正");
    }

    #[tokio::test]
    async fn related_failure_does_not_abort_snapshot() {
        let trends = ScriptedTrends::new()
            .with_points("牙科", "牙科", &[40.0])
            .with_points("植牙", "植牙", &[45.0])
            .with_related("植牙", &[("植牙 費用", 100.0)], &[])
            .with_related_failure("牙科");
        let snapshot = aggregator(trends)
            .build(&scenario("dental", &["牙科", "植牙"]), "TW")
            .await
            .expect("related failures are enrichment-only");

        assert_eq!(snapshot.related_kws.len(), 1);
        assert_eq!(snapshot.related_kws[0].keyword, "植牙 費用");
    }
}
