use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use founderhub_types::models::{CountableKind, RelationKind, RelationState, Toggle};

use crate::counters::CounterSynchronizer;
use crate::error::{SocialError, SocialResult};
use crate::store::{SocialStore, blocking};

/// Follow/like toggles. The conditional relation write decides whether the
/// counter moves; no in-process lock is taken.
pub struct ToggleService<S> {
    store: Arc<S>,
    counters: CounterSynchronizer<S>,
}

impl<S> Clone for ToggleService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            counters: self.counters.clone(),
        }
    }
}

fn target_entity(kind: CountableKind) -> &'static str {
    match kind {
        CountableKind::FounderProfile => "founder profile",
        CountableKind::Story => "story",
    }
}

impl<S: SocialStore> ToggleService<S> {
    pub fn new(store: Arc<S>, counters: CounterSynchronizer<S>) -> Self {
        Self { store, counters }
    }

    /// Drive the (actor, target, kind) relation to `desired`.
    ///
    /// Repeating a call is a no-op that reports the same state. The counter
    /// on the target moves only when this call actually created or removed
    /// the relation. A failed counter adjustment does not fail the call; it
    /// is deferred and eventually reconciled.
    pub async fn set_relation(
        &self,
        actor_id: Uuid,
        target_id: Uuid,
        kind: RelationKind,
        desired: Toggle,
    ) -> SocialResult<RelationState> {
        let target = kind.target();
        let (actor_ok, target_ok) = blocking(&self.store, move |s| {
            Ok((s.actor_exists(actor_id)?, s.target_exists(target, target_id)?))
        })
        .await?;

        if !actor_ok {
            return Err(SocialError::not_found("user", actor_id));
        }
        if !target_ok {
            return Err(SocialError::not_found(target_entity(target), target_id));
        }

        let changed = match desired {
            Toggle::On => {
                let inserted = blocking(&self.store, move |s| {
                    s.insert_relation_if_absent(actor_id, target_id, kind, Utc::now())
                })
                .await;
                match inserted {
                    Ok(created) => created,
                    // Someone else's insert won the race; same end state.
                    Err(SocialError::Conflict(msg)) => {
                        debug!(
                            "{} {} -> {} absorbed conflict: {}",
                            kind, actor_id, target_id, msg
                        );
                        false
                    }
                    Err(e) => return Err(e),
                }
            }
            Toggle::Off => {
                blocking(&self.store, move |s| {
                    s.delete_relation_if_present(actor_id, target_id, kind)
                })
                .await?
            }
        };

        if changed {
            let delta = if desired.is_on() { 1 } else { -1 };
            info!("{} {} -> {} set {:?}", kind, actor_id, target_id, desired);
            self.counters.adjust_or_defer(target_id, kind.counter(), delta).await;
        } else {
            debug!("{} {} -> {} already {:?}", kind, actor_id, target_id, desired);
        }

        Ok(RelationState {
            active: desired.is_on(),
        })
    }

    /// Same as `set_relation`, with the kind given by name.
    pub async fn set_relation_named(
        &self,
        actor_id: Uuid,
        target_id: Uuid,
        kind: &str,
        desired: Toggle,
    ) -> SocialResult<RelationState> {
        let kind: RelationKind =
            kind.parse().map_err(|_| SocialError::InvalidKind(kind.to_string()))?;
        self.set_relation(actor_id, target_id, kind, desired).await
    }

    pub async fn follow(
        &self,
        actor_id: Uuid,
        founder_profile_id: Uuid,
    ) -> SocialResult<RelationState> {
        self.set_relation(actor_id, founder_profile_id, RelationKind::Follow, Toggle::On).await
    }

    pub async fn unfollow(
        &self,
        actor_id: Uuid,
        founder_profile_id: Uuid,
    ) -> SocialResult<RelationState> {
        self.set_relation(actor_id, founder_profile_id, RelationKind::Follow, Toggle::Off).await
    }

    pub async fn like(&self, actor_id: Uuid, story_id: Uuid) -> SocialResult<RelationState> {
        self.set_relation(actor_id, story_id, RelationKind::Like, Toggle::On).await
    }

    pub async fn unlike(&self, actor_id: Uuid, story_id: Uuid) -> SocialResult<RelationState> {
        self.set_relation(actor_id, story_id, RelationKind::Like, Toggle::Off).await
    }

    pub async fn is_active(
        &self,
        actor_id: Uuid,
        target_id: Uuid,
        kind: RelationKind,
    ) -> SocialResult<bool> {
        blocking(&self.store, move |s| s.relation_exists(actor_id, target_id, kind)).await
    }
}
