use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use founderhub_types::api::{Claims, CreateCommentRequest, CreateStoryRequest, StoryFilter};

use crate::AppState;
use crate::error::ApiError;
use crate::middleware::Viewer;

#[derive(Debug, Deserialize)]
pub struct StoryQuery {
    pub niche_id: Option<Uuid>,
    pub founder_profile_id: Option<Uuid>,
    pub region: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

pub async fn list_stories(
    State(state): State<AppState>,
    Query(q): Query<StoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let feed = &state.engine.feed;
    let paging = feed.paginate(q.page, q.limit);
    let filter = StoryFilter {
        niche_id: q.niche_id,
        founder_profile_id: q.founder_profile_id,
        region: q.region.filter(|r| !r.is_empty()),
    };
    Ok(Json(feed.list_stories(filter, paging).await?))
}

pub async fn create_story(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateStoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let story = state.engine.content.create_story(claims.sub, req).await?;
    Ok((StatusCode::CREATED, Json(story)))
}

/// Story detail. Counts as a view.
pub async fn get_story(
    State(state): State<AppState>,
    Path(story_id): Path<Uuid>,
    Extension(Viewer(viewer)): Extension<Viewer>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.engine.feed.view_story(story_id, viewer).await?))
}

pub async fn list_comments(
    State(state): State<AppState>,
    Path(story_id): Path<Uuid>,
    Query(q): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let feed = &state.engine.feed;
    let paging = feed.paginate(q.page, q.limit);
    Ok(Json(feed.list_comments(story_id, paging).await?))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Path(story_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = state
        .engine
        .content
        .add_comment(claims.sub, story_id, &req.text)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}
