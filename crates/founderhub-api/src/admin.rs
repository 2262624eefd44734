use axum::{Extension, Json, extract::State, response::IntoResponse};
use serde::Serialize;
use tracing::info;

use founderhub_types::api::{Claims, ReconcileReport};
use founderhub_types::models::UserRole;

use crate::AppState;
use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
    pub ledger_entries: usize,
    pub report: ReconcileReport,
}

/// Run a reconciliation pass now instead of waiting for the background loop.
pub async fn reconcile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.engine.content.get_user(claims.sub).await?;
    if user.role != UserRole::Admin {
        return Err(ApiError::forbidden("admin only"));
    }

    let reconciler = &state.engine.reconciler;
    let ledger_entries = reconciler.drain_ledger().await;
    let report = reconciler.reconcile_all().await?;
    info!(
        "Manual reconcile by {}: {} ledger entries, {} rows healed",
        claims.sub,
        ledger_entries,
        report.total()
    );

    Ok(Json(ReconcileResponse {
        ledger_entries,
        report,
    }))
}
