//! Shared fixtures for the engine's unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use founderhub_db::queries::NewStory;
use founderhub_db::{Database, StoreUnavailable};
use founderhub_types::api::UpsertFounderRequest;
use founderhub_types::models::{CountableKind, CounterField, RelationKind, UserRole};

use crate::config::{EngineConfig, RetryPolicy};
use crate::store::SocialStore;

/// In-memory database with one founder (profile + story) and two fans.
pub struct Seed {
    pub db: Arc<Database>,
    pub owner: Uuid,
    pub fan: Uuid,
    pub other_fan: Uuid,
    pub niche: Uuid,
    pub founder_profile: Uuid,
    pub story: Uuid,
}

impl Seed {
    pub fn new() -> Self {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let now = Utc::now();
        let owner = Uuid::new_v4();
        let fan = Uuid::new_v4();
        let other_fan = Uuid::new_v4();
        let niche = Uuid::new_v4();

        db.create_user(owner, "Grace", UserRole::Founder, now).unwrap();
        db.create_user(fan, "Fan", UserRole::Supporter, now).unwrap();
        db.create_user(other_fan, "Other Fan", UserRole::Supporter, now).unwrap();
        db.create_niche(niche, "Developer Tools", "devtools", now).unwrap();

        let profile = db
            .upsert_founder_profile(
                Uuid::new_v4(),
                owner,
                &UpsertFounderRequest {
                    brand_name: Some("Compilers Inc".into()),
                    about_founder: "Builds compilers".into(),
                    story_highlights: vec![],
                    niche_id: niche,
                    region: Some("us".into()),
                },
                now,
            )
            .unwrap();

        let seed = Self {
            db,
            owner,
            fan,
            other_fan,
            niche,
            founder_profile: profile.id,
            story: Uuid::nil(),
        };
        let story = seed.post_story(niche, now);
        Self { story, ..seed }
    }

    /// Insert a story directly, bypassing counters.
    pub fn post_story(&self, niche: Uuid, created_at: DateTime<Utc>) -> Uuid {
        let id = Uuid::new_v4();
        self.db
            .insert_story(&NewStory {
                id,
                author_id: self.owner,
                founder_profile_id: self.founder_profile,
                text: "We shipped".into(),
                media_urls: vec![],
                niche_id: niche,
                region: None,
                created_at,
            })
            .unwrap();
        id
    }

    pub fn counter(&self, id: Uuid, field: CounterField) -> u64 {
        self.db.get_counter(id, field).unwrap().unwrap()
    }
}

/// Retry policy with millisecond delays.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 5,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
    }
}

pub fn test_config() -> EngineConfig {
    EngineConfig {
        retry: fast_retry(),
        ..EngineConfig::default()
    }
}

/// Poll `cond` until it holds, failing the test after two seconds.
pub async fn wait_for<F: Fn() -> bool>(cond: F) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Database wrapper with injectable faults: transient or hard counter
/// failures, and relation inserts that lose a primary-key race.
pub struct FlakyStore {
    inner: Arc<Database>,
    failures: AtomicU32,
    hard_failures: AtomicU32,
    conflicts: AtomicU32,
}

fn take(slot: &AtomicU32) -> bool {
    slot.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

impl FlakyStore {
    pub fn new(inner: Arc<Database>) -> Self {
        Self {
            inner,
            failures: AtomicU32::new(0),
            hard_failures: AtomicU32::new(0),
            conflicts: AtomicU32::new(0),
        }
    }

    pub fn fail_next_adjustments(&self, n: u32) {
        self.failures.store(n, Ordering::SeqCst);
    }

    /// Non-transient adjustment failures.
    pub fn break_next_adjustments(&self, n: u32) {
        self.hard_failures.store(n, Ordering::SeqCst);
    }

    pub fn conflict_next_inserts(&self, n: u32) {
        self.conflicts.store(n, Ordering::SeqCst);
    }
}

impl SocialStore for FlakyStore {
    fn actor_exists(&self, actor_id: Uuid) -> Result<bool> {
        SocialStore::actor_exists(self.inner.as_ref(), actor_id)
    }

    fn target_exists(&self, kind: CountableKind, target_id: Uuid) -> Result<bool> {
        SocialStore::target_exists(self.inner.as_ref(), kind, target_id)
    }

    fn insert_relation_if_absent(
        &self,
        actor_id: Uuid,
        target_id: Uuid,
        kind: RelationKind,
        created_at: DateTime<Utc>,
    ) -> Result<bool> {
        if take(&self.conflicts) {
            let err = rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY),
                Some("UNIQUE constraint failed: relations.actor_id".into()),
            );
            return Err(err.into());
        }
        SocialStore::insert_relation_if_absent(
            self.inner.as_ref(),
            actor_id,
            target_id,
            kind,
            created_at,
        )
    }

    fn delete_relation_if_present(
        &self,
        actor_id: Uuid,
        target_id: Uuid,
        kind: RelationKind,
    ) -> Result<bool> {
        SocialStore::delete_relation_if_present(self.inner.as_ref(), actor_id, target_id, kind)
    }

    fn relation_exists(&self, actor_id: Uuid, target_id: Uuid, kind: RelationKind) -> Result<bool> {
        SocialStore::relation_exists(self.inner.as_ref(), actor_id, target_id, kind)
    }

    fn adjust_counter(
        &self,
        entity_id: Uuid,
        field: CounterField,
        delta: i64,
    ) -> Result<Option<u64>> {
        if take(&self.failures) {
            return Err(StoreUnavailable("injected timeout".into()).into());
        }
        if take(&self.hard_failures) {
            anyhow::bail!("injected corruption");
        }
        SocialStore::adjust_counter(self.inner.as_ref(), entity_id, field, delta)
    }

    fn recompute_counter(&self, field: CounterField) -> Result<usize> {
        SocialStore::recompute_counter(self.inner.as_ref(), field)
    }

    fn recompute_counter_for(&self, entity_id: Uuid, field: CounterField) -> Result<Option<u64>> {
        SocialStore::recompute_counter_for(self.inner.as_ref(), entity_id, field)
    }
}
