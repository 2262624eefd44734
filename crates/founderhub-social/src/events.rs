use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use founderhub_db::Database;
use founderhub_types::api::RecordEventRequest;
use founderhub_types::events::ActivityEvent;

use crate::error::{SocialError, SocialResult};
use crate::store::blocking;

const MAX_KIND_LEN: usize = 64;

/// Append-only activity log. Events are counted, nothing more.
#[derive(Clone)]
pub struct EventLog {
    db: Arc<Database>,
}

impl EventLog {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn record(
        &self,
        user_id: Option<Uuid>,
        req: RecordEventRequest,
    ) -> SocialResult<ActivityEvent> {
        let kind = req.kind.trim().to_string();
        if kind.is_empty() || kind.len() > MAX_KIND_LEN {
            return Err(SocialError::InvalidInput("event type must be 1-64 characters".into()));
        }

        let event = ActivityEvent {
            id: Uuid::new_v4(),
            user_id,
            kind,
            target_id: req.target_id,
            metadata: req.metadata,
            created_at: Utc::now(),
        };
        let stored = event.clone();
        blocking(&self.db, move |db| db.insert_event(&stored)).await?;
        Ok(event)
    }

    pub async fn count(&self, kind: &str, target_id: Option<Uuid>) -> SocialResult<u64> {
        let kind = kind.to_string();
        blocking(&self.db, move |db| db.count_events(&kind, target_id)).await
    }

    pub async fn recent(&self, kind: &str, limit: u32) -> SocialResult<Vec<ActivityEvent>> {
        let kind = kind.to_string();
        blocking(&self.db, move |db| db.recent_events(&kind, limit.clamp(1, 100))).await
    }
}
