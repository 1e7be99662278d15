use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use trendscope_core::{KeywordScore, RelatedKeyword};
use trendscope_discovery::CachedSnapshot;

use crate::middleware::RequestId;

use super::{map_aggregation_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct DiscoveryData {
    pub snapshot_id: Uuid,
    pub scenario: String,
    pub geo: String,
    pub top_keywords: Vec<KeywordScore>,
    pub related_kws: Vec<RelatedKeyword>,
    pub created_at: DateTime<Utc>,
    pub from_cache: bool,
    pub stale: bool,
}

impl From<CachedSnapshot> for DiscoveryData {
    fn from(served: CachedSnapshot) -> Self {
        Self {
            snapshot_id: served.snapshot.id,
            scenario: served.snapshot.scenario,
            geo: served.snapshot.geo,
            top_keywords: served.snapshot.top_keywords,
            related_kws: served.snapshot.related_kws,
            created_at: served.snapshot.created_at,
            from_cache: served.from_cache,
            stale: served.stale,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct DiscoveryQuery {
    pub geo: Option<String>,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct HistoryItem {
    pub snapshot_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub top_keywords: Vec<KeywordScore>,
    pub related_kws: Vec<RelatedKeyword>,
}

#[derive(Debug, Deserialize)]
pub(super) struct HistoryQuery {
    pub geo: Option<String>,
    pub limit: Option<i64>,
}

pub(super) async fn get_discovery(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(scenario): Path<String>,
    Query(query): Query<DiscoveryQuery>,
) -> Result<Json<ApiResponse<DiscoveryData>>, ApiError> {
    require_scenario(&state, &req_id, &scenario)?;

    let geo = query.geo.as_deref();
    let served = if query.force {
        state.cache.force_refresh(&scenario, geo).await
    } else {
        state
            .cache
            .get_or_refresh(&scenario, geo, state.max_age)
            .await
    }
    .map_err(|e| map_aggregation_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: DiscoveryData::from(served),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn get_history(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(scenario): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<Vec<HistoryItem>>>, ApiError> {
    require_scenario(&state, &req_id, &scenario)?;

    let snapshots = state
        .cache
        .history(&scenario, query.geo.as_deref(), normalize_limit(query.limit))
        .await
        .map_err(|e| map_aggregation_error(req_id.0.clone(), &e))?;

    let data = snapshots
        .into_iter()
        .map(|snapshot| HistoryItem {
            snapshot_id: snapshot.id,
            created_at: snapshot.created_at,
            top_keywords: snapshot.top_keywords,
            related_kws: snapshot.related_kws,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

fn require_scenario(state: &AppState, req_id: &RequestId, scenario: &str) -> Result<(), ApiError> {
    if state.cache.scenarios().get(scenario).is_none() {
        return Err(ApiError::new(
            req_id.0.clone(),
            "not_found",
            format!("unknown scenario '{scenario}'"),
        ));
    }
    Ok(())
}
