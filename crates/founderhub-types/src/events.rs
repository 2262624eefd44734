use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event kinds the engine records on its own. Clients may log any other
/// non-empty kind through the events endpoint.
pub mod kinds {
    pub const STORY_VIEW: &str = "story_view";
    pub const PROFILE_VIEW: &str = "profile_view";
}

/// Append-only activity record. Only ever counted, never aggregated further.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub kind: String,
    pub target_id: Option<Uuid>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}
