use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::error;
use uuid::Uuid;

use founderhub_db::Database;
use founderhub_types::models::{CountableKind, CounterField, RelationKind};

use crate::error::{SocialError, SocialResult};

/// Store capabilities the write path depends on. Every method must be a
/// single atomic operation at the store; none may be emulated with a
/// read followed by a write.
pub trait SocialStore: Send + Sync + 'static {
    fn actor_exists(&self, actor_id: Uuid) -> Result<bool>;

    fn target_exists(&self, kind: CountableKind, target_id: Uuid) -> Result<bool>;

    /// True when this call created the record.
    fn insert_relation_if_absent(
        &self,
        actor_id: Uuid,
        target_id: Uuid,
        kind: RelationKind,
        created_at: DateTime<Utc>,
    ) -> Result<bool>;

    /// True when this call removed the record.
    fn delete_relation_if_present(
        &self,
        actor_id: Uuid,
        target_id: Uuid,
        kind: RelationKind,
    ) -> Result<bool>;

    fn relation_exists(&self, actor_id: Uuid, target_id: Uuid, kind: RelationKind) -> Result<bool>;

    /// Increment-with-floor. None when the entity is gone.
    fn adjust_counter(
        &self,
        entity_id: Uuid,
        field: CounterField,
        delta: i64,
    ) -> Result<Option<u64>>;

    fn recompute_counter(&self, field: CounterField) -> Result<usize>;

    fn recompute_counter_for(&self, entity_id: Uuid, field: CounterField) -> Result<Option<u64>>;
}

impl SocialStore for Database {
    fn actor_exists(&self, actor_id: Uuid) -> Result<bool> {
        Database::user_exists(self, actor_id)
    }

    fn target_exists(&self, kind: CountableKind, target_id: Uuid) -> Result<bool> {
        Database::entity_exists(self, kind, target_id)
    }

    fn insert_relation_if_absent(
        &self,
        actor_id: Uuid,
        target_id: Uuid,
        kind: RelationKind,
        created_at: DateTime<Utc>,
    ) -> Result<bool> {
        Database::insert_relation_if_absent(self, actor_id, target_id, kind, created_at)
    }

    fn delete_relation_if_present(
        &self,
        actor_id: Uuid,
        target_id: Uuid,
        kind: RelationKind,
    ) -> Result<bool> {
        Database::delete_relation_if_present(self, actor_id, target_id, kind)
    }

    fn relation_exists(&self, actor_id: Uuid, target_id: Uuid, kind: RelationKind) -> Result<bool> {
        Database::relation_exists(self, actor_id, target_id, kind)
    }

    fn adjust_counter(
        &self,
        entity_id: Uuid,
        field: CounterField,
        delta: i64,
    ) -> Result<Option<u64>> {
        Database::adjust_counter(self, entity_id, field, delta)
    }

    fn recompute_counter(&self, field: CounterField) -> Result<usize> {
        Database::recompute_counter(self, field)
    }

    fn recompute_counter_for(&self, entity_id: Uuid, field: CounterField) -> Result<Option<u64>> {
        Database::recompute_counter_for(self, entity_id, field)
    }
}

/// Run a blocking store call off the async runtime and classify its error.
pub(crate) async fn blocking<S, F, T>(store: &Arc<S>, f: F) -> SocialResult<T>
where
    S: Send + Sync + 'static,
    F: FnOnce(&S) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(store);
    tokio::task::spawn_blocking(move || f(&store))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            SocialError::Store(anyhow::anyhow!("blocking task failed: {}", e))
        })?
        .map_err(SocialError::from_store)
}
