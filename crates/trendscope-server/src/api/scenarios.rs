use axum::{extract::State, Extension, Json};
use serde::Serialize;

use crate::middleware::RequestId;

use super::{ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct ScenarioItem {
    pub id: String,
    pub name: String,
    pub geo: String,
    pub top_n: usize,
    pub seeds: Vec<String>,
}

pub(super) async fn list_scenarios(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<Vec<ScenarioItem>>> {
    let data = state
        .cache
        .scenarios()
        .iter()
        .map(|scenario| ScenarioItem {
            id: scenario.id.clone(),
            name: scenario.name.clone(),
            geo: scenario.geo.clone(),
            top_n: scenario.top_n,
            seeds: scenario.seeds.clone(),
        })
        .collect();

    Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    })
}
