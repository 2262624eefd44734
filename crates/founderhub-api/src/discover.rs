use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;

use founderhub_types::models::{CountableKind, TrendingKind};

use crate::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct TrendingQuery {
    pub kind: Option<String>,
    pub window_days: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct PopularQuery {
    pub kind: Option<String>,
    pub limit: Option<u32>,
}

pub async fn discover(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.engine.trending.discover().await?))
}

/// `GET /trending?kind=stories_by_niche&window_days=7&limit=5`
pub async fn trending(
    State(state): State<AppState>,
    Query(q): Query<TrendingQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = match q.kind.as_deref() {
        None => TrendingKind::StoriesByNiche,
        Some(raw) => raw
            .parse::<TrendingKind>()
            .map_err(|k| ApiError::bad_request(format!("unknown trending kind '{}'", k)))?,
    };
    let config = &state.engine.config;
    let groups = state
        .engine
        .trending
        .trending_by_recent_activity(
            kind,
            q.window_days.unwrap_or(config.trending_window_days),
            q.limit.unwrap_or(config.trending_limit),
        )
        .await?;
    Ok(Json(groups))
}

/// `GET /popular?kind=founders&limit=5`
pub async fn popular(
    State(state): State<AppState>,
    Query(q): Query<PopularQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = match q.kind.as_deref() {
        None => CountableKind::FounderProfile,
        Some(raw) => raw
            .parse::<CountableKind>()
            .map_err(|k| ApiError::bad_request(format!("unknown entity kind '{}'", k)))?,
    };
    let limit = q.limit.unwrap_or(state.engine.config.trending_limit);
    Ok(Json(state.engine.trending.top_by_popularity(kind, limit).await?))
}
