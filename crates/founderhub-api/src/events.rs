use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};

use founderhub_types::api::RecordEventRequest;

use crate::AppState;
use crate::error::ApiError;
use crate::middleware::Viewer;

pub async fn record_event(
    State(state): State<AppState>,
    Extension(Viewer(viewer)): Extension<Viewer>,
    Json(req): Json<RecordEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let event = state.engine.events.record(viewer, req).await?;
    Ok((StatusCode::CREATED, Json(event)))
}
