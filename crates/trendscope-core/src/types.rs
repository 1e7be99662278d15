//! Domain types shared across the workspace.
//!
//! A [`KeywordSnapshot`] is the unit of persistence: one immutable aggregated
//! result for a (scenario, geo) pair. Snapshots are produced whole by the
//! aggregator and appended to the store; they are never updated in place, only
//! superseded by a newer row for the same key.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One keyword with its mean interest score over the observed window.
///
/// `avg_score` is in `[0.0, 100.0]` — the scale reported by the trends
/// source. When the same keyword surfaces from more than one seed query, the
/// score is averaged across all contributing observations, weighted equally
/// per observation rather than per seed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordScore {
    pub keyword: String,
    pub avg_score: f64,
}

/// Whether a related-keyword candidate came from the steady "related" list or
/// the "rising" list of the trends source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelatedKind {
    Related,
    Rising,
}

impl std::fmt::Display for RelatedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelatedKind::Related => write!(f, "related"),
            RelatedKind::Rising => write!(f, "rising"),
        }
    }
}

/// A related-keyword candidate with its provenance.
///
/// `source` is the seed keyword whose related-query expansion produced this
/// candidate. The same candidate keyword may appear more than once in a
/// snapshot when several seeds surface it; duplicates are kept because the
/// provenance is signal, not noise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedKeyword {
    pub keyword: String,
    pub source: String,
    #[serde(rename = "type")]
    pub kind: RelatedKind,
    /// Relevance or rising magnitude as reported by the source, unscaled.
    pub value: f64,
}

/// One immutable aggregated result for a (scenario, geo) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordSnapshot {
    pub id: Uuid,
    pub scenario: String,
    pub geo: String,
    /// Sorted descending by `avg_score`; ties broken by ascending keyword.
    pub top_keywords: Vec<KeywordScore>,
    pub related_kws: Vec<RelatedKeyword>,
    pub created_at: DateTime<Utc>,
}

/// One observation in an interest-over-time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestPoint {
    pub date: NaiveDate,
    pub score: f64,
}

/// An interest-over-time series for a single keyword.
///
/// `keyword` is the keyword the source actually resolved the query to, which
/// may differ from the queried seed (sources normalise spelling variants).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSeries {
    pub keyword: String,
    pub points: Vec<InterestPoint>,
}

impl TrendSeries {
    /// Mean score over all points; `0.0` for an empty series.
    #[must_use]
    pub fn average(&self) -> f64 {
        if self.points.is_empty() {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let denom = self.points.len() as f64;
        self.points.iter().map(|p| p.score).sum::<f64>() / denom
    }
}

/// One candidate from a related-queries expansion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedEntry {
    pub query: String,
    pub value: f64,
}

/// Related-query expansion for a seed keyword: the steady top list and the
/// rising list, as two separate sequences.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelatedQueries {
    pub related: Vec<RelatedEntry>,
    pub rising: Vec<RelatedEntry>,
}
