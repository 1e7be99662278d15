//! Scripted trends source and in-memory snapshot store for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use trendscope_core::{
    scenario_set, InterestPoint, KeywordSnapshot, RelatedEntry, RelatedQueries, ScenarioConfig,
    ScenarioSet, SnapshotStore, StoreError, TrendSeries, TrendsError, TrendsSource,
};

/// Canned outcome for one seed's series fetch.
pub(crate) enum SeriesScript {
    Points { keyword: String, scores: Vec<f64> },
    NoData,
    Transient,
    RateLimited,
    /// Sleeps far past any test deadline; only useful with a paused clock.
    Hang,
}

/// Scripted [`TrendsSource`]: maps seed keywords to canned outcomes and
/// counts every call. Unknown seeds behave as `NoData`.
pub(crate) struct ScriptedTrends {
    series: HashMap<String, SeriesScript>,
    related: HashMap<String, RelatedQueries>,
    related_failures: HashSet<String>,
    delay: Duration,
    pub series_calls: AtomicUsize,
    pub related_calls: AtomicUsize,
}

impl ScriptedTrends {
    pub fn new() -> Self {
        Self {
            series: HashMap::new(),
            related: HashMap::new(),
            related_failures: HashSet::new(),
            delay: Duration::ZERO,
            series_calls: AtomicUsize::new(0),
            related_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_points(mut self, seed: &str, keyword: &str, scores: &[f64]) -> Self {
        self.series.insert(
            seed.to_string(),
            SeriesScript::Points {
                keyword: keyword.to_string(),
                scores: scores.to_vec(),
            },
        );
        self
    }

    pub fn with_outcome(mut self, seed: &str, script: SeriesScript) -> Self {
        self.series.insert(seed.to_string(), script);
        self
    }

    pub fn with_related(
        mut self,
        seed: &str,
        related: &[(&str, f64)],
        rising: &[(&str, f64)],
    ) -> Self {
        let entries = |list: &[(&str, f64)]| {
            list.iter()
                .map(|(query, value)| RelatedEntry {
                    query: (*query).to_string(),
                    value: *value,
                })
                .collect()
        };
        self.related.insert(
            seed.to_string(),
            RelatedQueries {
                related: entries(related),
                rising: entries(rising),
            },
        );
        self
    }

    pub fn with_related_failure(mut self, seed: &str) -> Self {
        self.related_failures.insert(seed.to_string());
        self
    }

    /// Adds a sleep to every series fetch so tests can overlap callers.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl TrendsSource for ScriptedTrends {
    async fn series(
        &self,
        keyword: &str,
        _geo: &str,
        _timeframe: &str,
    ) -> Result<TrendSeries, TrendsError> {
        self.series_calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.series.get(keyword) {
            None | Some(SeriesScript::NoData) => Err(TrendsError::NoData),
            Some(SeriesScript::Transient) => {
                Err(TrendsError::Transient("scripted failure".to_string()))
            }
            Some(SeriesScript::RateLimited) => Err(TrendsError::RateLimited),
            Some(SeriesScript::Hang) => {
                tokio::time::sleep(Duration::from_secs(86_400)).await;
                Err(TrendsError::NoData)
            }
            Some(SeriesScript::Points { keyword, scores }) => Ok(TrendSeries {
                keyword: keyword.clone(),
                points: scores
                    .iter()
                    .enumerate()
                    .map(|(i, score)| InterestPoint {
                        date: base_date() + chrono::Duration::days(i64::try_from(i).unwrap_or(0)),
                        score: *score,
                    })
                    .collect(),
            }),
        }
    }

    async fn related(&self, keyword: &str, _geo: &str) -> Result<RelatedQueries, TrendsError> {
        self.related_calls.fetch_add(1, Ordering::SeqCst);
        if self.related_failures.contains(keyword) {
            return Err(TrendsError::Transient("scripted failure".to_string()));
        }
        Ok(self.related.get(keyword).cloned().unwrap_or_default())
    }
}

/// In-memory [`SnapshotStore`] with optional scripted failures.
pub(crate) struct MemoryStore {
    rows: Mutex<Vec<KeywordSnapshot>>,
    fail_appends: bool,
    fail_reads: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            fail_appends: false,
            fail_reads: false,
        }
    }

    pub fn failing_appends() -> Self {
        Self {
            fail_appends: true,
            ..Self::new()
        }
    }

    pub fn failing_reads() -> Self {
        Self {
            fail_reads: true,
            ..Self::new()
        }
    }

    /// Insert directly, bypassing the scripted append failure.
    pub async fn seed(&self, snapshot: KeywordSnapshot) {
        self.rows.lock().await.push(snapshot);
    }

    pub async fn appended(&self) -> usize {
        self.rows.lock().await.len()
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn append(&self, snapshot: &KeywordSnapshot) -> Result<(), StoreError> {
        if self.fail_appends {
            return Err(StoreError::Unavailable(
                "scripted append failure".to_string(),
            ));
        }
        self.rows.lock().await.push(snapshot.clone());
        Ok(())
    }

    async fn latest(
        &self,
        scenario: &str,
        geo: &str,
        limit: i64,
    ) -> Result<Vec<KeywordSnapshot>, StoreError> {
        if self.fail_reads {
            return Err(StoreError::Unavailable("scripted read failure".to_string()));
        }
        let rows = self.rows.lock().await;
        let mut matching: Vec<KeywordSnapshot> = rows
            .iter()
            .filter(|s| s.scenario == scenario && s.geo == geo)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matching.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(matching)
    }
}

pub(crate) fn scenario(id: &str, seeds: &[&str]) -> ScenarioConfig {
    ScenarioConfig {
        id: id.to_string(),
        name: id.to_string(),
        geo: "TW".to_string(),
        top_n: 5,
        min_score: None,
        seeds: seeds.iter().map(|s| (*s).to_string()).collect(),
    }
}

pub(crate) fn scenario_set_of(scenarios: Vec<ScenarioConfig>) -> ScenarioSet {
    scenario_set(scenarios).expect("test scenarios must validate")
}

pub(crate) fn snapshot_at(scenario: &str, geo: &str, created_at: DateTime<Utc>) -> KeywordSnapshot {
    KeywordSnapshot {
        id: Uuid::new_v4(),
        scenario: scenario.to_string(),
        geo: geo.to_string(),
        top_keywords: vec![],
        related_kws: vec![],
        created_at,
    }
}

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 7, 1).expect("valid date")
}
