use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use founderhub_types::models::CounterField;

use crate::config::RetryPolicy;
use crate::error::{SocialError, SocialResult};
use crate::reconcile::DriftLedger;
use crate::store::{SocialStore, blocking};

/// A counter adjustment that could not be applied inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingAdjustment {
    pub entity_id: Uuid,
    pub field: CounterField,
    pub delta: i64,
}

/// Atomic counter arithmetic plus the deferred-retry path for adjustments
/// that follow an already-committed relation or content write.
pub struct CounterSynchronizer<S> {
    store: Arc<S>,
    retry_tx: mpsc::UnboundedSender<PendingAdjustment>,
    pending: Arc<AtomicUsize>,
    ledger: DriftLedger,
}

impl<S> Clone for CounterSynchronizer<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            retry_tx: self.retry_tx.clone(),
            pending: Arc::clone(&self.pending),
            ledger: self.ledger.clone(),
        }
    }
}

impl<S: SocialStore> CounterSynchronizer<S> {
    /// Returns the synchronizer and the worker that drains its retry queue.
    /// The worker must be spawned for deferred adjustments to be applied.
    pub fn new(store: Arc<S>, policy: RetryPolicy, ledger: DriftLedger) -> (Self, RetryWorker<S>) {
        let (retry_tx, retry_rx) = mpsc::unbounded_channel();
        let pending = Arc::new(AtomicUsize::new(0));

        let worker = RetryWorker {
            store: Arc::clone(&store),
            rx: retry_rx,
            pending: Arc::clone(&pending),
            policy,
            ledger: ledger.clone(),
        };

        (
            Self {
                store,
                retry_tx,
                pending,
                ledger,
            },
            worker,
        )
    }

    /// Apply `delta` (+1 or -1) to a counter atomically, floored at zero.
    /// Returns the new value, or None when the entity no longer exists.
    pub async fn adjust(
        &self,
        entity_id: Uuid,
        field: CounterField,
        delta: i64,
    ) -> SocialResult<Option<u64>> {
        if delta != 1 && delta != -1 {
            return Err(SocialError::InvalidInput(format!(
                "counter delta must be +1 or -1, got {}",
                delta
            )));
        }

        blocking(&self.store, move |s| s.adjust_counter(entity_id, field, delta)).await
    }

    /// Adjust a counter after its source-of-truth write already committed.
    /// Never fails: transient errors are queued for retry, anything else is
    /// handed to reconciliation.
    pub async fn adjust_or_defer(&self, entity_id: Uuid, field: CounterField, delta: i64) {
        match self.adjust(entity_id, field, delta).await {
            Ok(Some(value)) => {
                debug!("{} on {} adjusted by {} to {}", field, entity_id, delta, value);
            }
            Ok(None) => {
                warn!("{} on {} not adjusted: entity missing", field, entity_id);
            }
            Err(e) if e.is_transient() => {
                warn!("{} on {} deferred: {}", field, entity_id, e);
                self.defer(PendingAdjustment {
                    entity_id,
                    field,
                    delta,
                })
                .await;
            }
            Err(e) => {
                error!("{} on {} failed: {}", field, entity_id, e);
                escalate(&self.ledger, entity_id, field).await;
            }
        }
    }

    /// Queue an adjustment for the retry worker. If the worker is gone the
    /// adjustment is escalated to reconciliation instead.
    pub async fn defer(&self, job: PendingAdjustment) {
        self.pending.fetch_add(1, Ordering::SeqCst);
        if self.retry_tx.send(job).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            error!("Retry queue closed for {} on {}", job.field, job.entity_id);
            escalate(&self.ledger, job.entity_id, job.field).await;
        }
    }

    /// Deferred adjustments not yet applied or escalated.
    pub fn pending_retries(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

/// Drains deferred adjustments. Each job retries on its own task with
/// exponential backoff; exhausted jobs are escalated to the drift ledger.
pub struct RetryWorker<S> {
    store: Arc<S>,
    rx: mpsc::UnboundedReceiver<PendingAdjustment>,
    pending: Arc<AtomicUsize>,
    policy: RetryPolicy,
    ledger: DriftLedger,
}

impl<S: SocialStore> RetryWorker<S> {
    pub async fn run(mut self) {
        while let Some(job) = self.rx.recv().await {
            let store = Arc::clone(&self.store);
            let pending = Arc::clone(&self.pending);
            let ledger = self.ledger.clone();
            let policy = self.policy;

            tokio::spawn(async move {
                retry_adjustment(store, job, policy, &ledger).await;
                pending.fetch_sub(1, Ordering::SeqCst);
            });
        }
        debug!("Counter retry worker stopped");
    }
}

async fn retry_adjustment<S: SocialStore>(
    store: Arc<S>,
    job: PendingAdjustment,
    policy: RetryPolicy,
    ledger: &DriftLedger,
) {
    let PendingAdjustment {
        entity_id,
        field,
        delta,
    } = job;

    for attempt in 1..=policy.max_attempts {
        tokio::time::sleep(policy.backoff(attempt)).await;

        match blocking(&store, move |s| s.adjust_counter(entity_id, field, delta)).await {
            Ok(value) => {
                info!(
                    "Deferred {} on {} applied on attempt {} (now {:?})",
                    field, entity_id, attempt, value
                );
                return;
            }
            Err(e) if e.is_transient() => {
                warn!("Deferred {} on {} attempt {} failed: {}", field, entity_id, attempt, e);
            }
            Err(e) => {
                error!("Deferred {} on {} failed permanently: {}", field, entity_id, e);
                break;
            }
        }
    }

    error!("Giving up on {} for {}", field, entity_id);
    escalate(ledger, entity_id, field).await;
}

/// Hand a lost adjustment to reconciliation. View counters have no records
/// to recompute from, so their loss is only logged.
async fn escalate(ledger: &DriftLedger, entity_id: Uuid, field: CounterField) {
    if field.is_derived() {
        warn!("Marking {} on {} for reconciliation", field, entity_id);
        ledger.mark(entity_id, field).await;
    } else {
        error!("Lost adjustment of {} on {}; view counters cannot be recomputed", field, entity_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FlakyStore, Seed, fast_retry};

    #[tokio::test]
    async fn test_adjust_rejects_non_unit_delta() {
        let seed = Seed::new();
        let (counters, _worker) =
            CounterSynchronizer::new(
                seed.db.clone(),
                RetryPolicy::default(),
                DriftLedger::default(),
            );

        let err = counters.adjust(seed.story, CounterField::LikeCount, 2).await.unwrap_err();
        assert!(matches!(err, SocialError::InvalidInput(_)));
        let err = counters.adjust(seed.story, CounterField::LikeCount, 0).await.unwrap_err();
        assert!(matches!(err, SocialError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_adjust_never_goes_negative() {
        let seed = Seed::new();
        let (counters, _worker) =
            CounterSynchronizer::new(
                seed.db.clone(),
                RetryPolicy::default(),
                DriftLedger::default(),
            );

        for _ in 0..3 {
            let value = counters.adjust(seed.story, CounterField::LikeCount, -1).await.unwrap();
            assert_eq!(value, Some(0));
        }
        assert_eq!(counters.adjust(seed.story, CounterField::LikeCount, 1).await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let seed = Seed::new();
        let store = Arc::new(FlakyStore::new(seed.db.clone()));
        store.fail_next_adjustments(2);

        let ledger = DriftLedger::default();
        let (counters, worker) =
            CounterSynchronizer::new(store.clone(), fast_retry(), ledger.clone());
        tokio::spawn(worker.run());

        counters
            .adjust_or_defer(seed.founder_profile, CounterField::FollowersCount, 1)
            .await;

        crate::testing::wait_for(|| counters.pending_retries() == 0).await;
        assert_eq!(
            seed.db.get_counter(seed.founder_profile, CounterField::FollowersCount).unwrap(),
            Some(1)
        );
        assert!(ledger.is_empty().await);
    }

    #[tokio::test]
    async fn test_exhausted_retries_escalate_to_ledger() {
        let seed = Seed::new();
        let store = Arc::new(FlakyStore::new(seed.db.clone()));
        store.fail_next_adjustments(100);

        let ledger = DriftLedger::default();
        let (counters, worker) =
            CounterSynchronizer::new(store.clone(), fast_retry(), ledger.clone());
        tokio::spawn(worker.run());

        counters
            .adjust_or_defer(seed.story, CounterField::LikeCount, 1)
            .await;

        crate::testing::wait_for(|| counters.pending_retries() == 0).await;
        assert_eq!(ledger.drain().await, vec![(seed.story, CounterField::LikeCount)]);
    }

    #[tokio::test]
    async fn test_hard_failure_on_view_counter_skips_ledger() {
        let seed = Seed::new();
        let store = Arc::new(FlakyStore::new(seed.db.clone()));
        store.break_next_adjustments(1);

        let ledger = DriftLedger::default();
        let (counters, _worker) =
            CounterSynchronizer::new(store.clone(), fast_retry(), ledger.clone());

        counters.adjust_or_defer(seed.story, CounterField::ViewCount, 1).await;
        assert!(ledger.is_empty().await);

        store.break_next_adjustments(1);
        counters.adjust_or_defer(seed.story, CounterField::LikeCount, 1).await;
        assert_eq!(ledger.drain().await, vec![(seed.story, CounterField::LikeCount)]);
    }

    #[tokio::test]
    async fn test_closed_retry_queue_marks_ledger() {
        let seed = Seed::new();
        let store = Arc::new(FlakyStore::new(seed.db.clone()));
        let ledger = DriftLedger::default();
        let (counters, worker) =
            CounterSynchronizer::new(store.clone(), fast_retry(), ledger.clone());
        drop(worker);

        store.fail_next_adjustments(1);
        counters
            .adjust_or_defer(seed.founder_profile, CounterField::FollowersCount, 1)
            .await;

        assert_eq!(counters.pending_retries(), 0);
        assert_eq!(
            ledger.drain().await,
            vec![(seed.founder_profile, CounterField::FollowersCount)]
        );
    }
}
