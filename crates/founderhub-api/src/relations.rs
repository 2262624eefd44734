use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use founderhub_types::api::Claims;

use crate::AppState;
use crate::error::ApiError;

pub async fn follow(
    State(state): State<AppState>,
    Path(founder_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let relation = state.engine.toggles.follow(claims.sub, founder_id).await?;
    Ok(Json(relation))
}

pub async fn unfollow(
    State(state): State<AppState>,
    Path(founder_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let relation = state.engine.toggles.unfollow(claims.sub, founder_id).await?;
    Ok(Json(relation))
}

pub async fn like(
    State(state): State<AppState>,
    Path(story_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let relation = state.engine.toggles.like(claims.sub, story_id).await?;
    Ok(Json(relation))
}

pub async fn unlike(
    State(state): State<AppState>,
    Path(story_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let relation = state.engine.toggles.unlike(claims.sub, story_id).await?;
    Ok(Json(relation))
}
