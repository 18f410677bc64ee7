//! CRS catalog endpoint

use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;

use crate::error::Result;
use crate::state::AppState;
use crate::types::ApiResponse;

#[derive(Debug, Deserialize)]
pub struct ProjectionParams {
    /// Restrict to one region
    pub region: Option<String>,
    /// Case-insensitive substring over code and name
    pub search: Option<String>,
}

/// GET /api/projections - list the reference system catalog
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ProjectionParams>,
) -> Result<Json<ApiResponse<Vec<roam_proj::CrsDescriptor>>>> {
    let descriptors = state
        .catalog
        .filter(params.region.as_deref(), params.search.as_deref())
        .into_iter()
        .cloned()
        .collect();
    Ok(Json(ApiResponse::new(descriptors)))
}
