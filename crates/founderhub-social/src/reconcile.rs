use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use founderhub_types::api::ReconcileReport;
use founderhub_types::models::CounterField;

use crate::error::{SocialError, SocialResult};
use crate::store::{SocialStore, blocking};

/// Counters known to have drifted: adjustments that could not be applied
/// even after retrying.
#[derive(Clone, Default)]
pub struct DriftLedger {
    inner: Arc<Mutex<HashSet<(Uuid, CounterField)>>>,
}

impl DriftLedger {
    pub async fn mark(&self, entity_id: Uuid, field: CounterField) {
        self.inner.lock().await.insert((entity_id, field));
    }

    pub async fn drain(&self) -> Vec<(Uuid, CounterField)> {
        self.inner.lock().await.drain().collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

/// Recomputes cached counters from the records they summarize.
pub struct Reconciler<S> {
    store: Arc<S>,
    ledger: DriftLedger,
}

impl<S> Clone for Reconciler<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            ledger: self.ledger.clone(),
        }
    }
}

impl<S: SocialStore> Reconciler<S> {
    pub fn new(store: Arc<S>, ledger: DriftLedger) -> Self {
        Self { store, ledger }
    }

    pub async fn reconcile_field(&self, field: CounterField) -> SocialResult<usize> {
        if !field.is_derived() {
            return Err(SocialError::InvalidInput(format!("{} cannot be recomputed", field)));
        }
        blocking(&self.store, move |s| s.recompute_counter(field)).await
    }

    pub async fn reconcile_entity(
        &self,
        entity_id: Uuid,
        field: CounterField,
    ) -> SocialResult<Option<u64>> {
        if !field.is_derived() {
            return Err(SocialError::InvalidInput(format!("{} cannot be recomputed", field)));
        }
        blocking(&self.store, move |s| s.recompute_counter_for(entity_id, field)).await
    }

    /// Heal every entry in the drift ledger. Entries that fail stay queued,
    /// except counters that can never be recomputed.
    pub async fn drain_ledger(&self) -> usize {
        let mut healed = 0;
        for (entity_id, field) in self.ledger.drain().await {
            match self.reconcile_entity(entity_id, field).await {
                Ok(value) => {
                    debug!("Reconciled {} on {} to {:?}", field, entity_id, value);
                    healed += 1;
                }
                Err(SocialError::InvalidInput(msg)) => {
                    warn!("Dropping ledger entry for {} on {}: {}", field, entity_id, msg);
                }
                Err(e) => {
                    warn!("Reconcile of {} on {} failed: {}", field, entity_id, e);
                    self.ledger.mark(entity_id, field).await;
                }
            }
        }
        healed
    }

    /// Full pass over every derived counter.
    pub async fn reconcile_all(&self) -> SocialResult<ReconcileReport> {
        let mut report = ReconcileReport::default();
        for field in CounterField::ALL.into_iter().filter(|f| f.is_derived()) {
            let healed = self.reconcile_field(field).await?;
            if healed > 0 {
                info!("Reconcile: healed {} rows of {}", healed, field);
            }
            report.healed.push((field, healed));
        }
        Ok(report)
    }

    pub fn ledger(&self) -> &DriftLedger {
        &self.ledger
    }
}

/// Background task: drain the ledger, then run a full pass, on an interval.
pub async fn run_reconcile_loop<S: SocialStore>(reconciler: Reconciler<S>, every: Duration) {
    let mut interval = tokio::time::interval(every);

    loop {
        interval.tick().await;

        let drained = reconciler.drain_ledger().await;
        if drained > 0 {
            info!("Reconcile: healed {} ledger entries", drained);
        }

        if let Err(e) = reconciler.reconcile_all().await {
            warn!("Reconcile error: {}", e);
        }
    }
}
