use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use founderhub_types::api::{Claims, FounderFilter, FounderSort, UpsertFounderRequest};

use crate::AppState;
use crate::error::ApiError;
use crate::middleware::Viewer;

#[derive(Debug, Deserialize)]
pub struct FounderQuery {
    pub niche_id: Option<Uuid>,
    pub region: Option<String>,
    pub sort: Option<FounderSort>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

pub async fn list_founders(
    State(state): State<AppState>,
    Query(q): Query<FounderQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let feed = &state.engine.feed;
    let paging = feed.paginate(q.page, q.limit);
    let filter = FounderFilter {
        niche_id: q.niche_id,
        region: q.region.filter(|r| !r.is_empty()),
        sort: q.sort.unwrap_or_default(),
    };
    Ok(Json(feed.list_founders(filter, paging).await?))
}

/// Founder profile detail. Counts as a profile view unless the owner looks.
pub async fn get_founder(
    State(state): State<AppState>,
    Path(founder_id): Path<Uuid>,
    Extension(Viewer(viewer)): Extension<Viewer>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.engine.feed.view_founder(founder_id, viewer).await?))
}

pub async fn upsert_founder(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpsertFounderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.engine.content.upsert_founder(claims.sub, req).await?))
}
