use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::{
    domain::{CacheKinds, CampaignId, Invalidation},
    invalidator::{InvalidatorHandle, InvokeError},
};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Receives invalidation requests from the interceptor
pub trait InvalidationSink: Send + Sync {
    fn schedule(&self, campaign_id: Option<CampaignId>, kinds: CacheKinds, affects_global_list: bool);
}

/// Invalidations accumulated during one debounce window
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PendingBatch {
    campaigns: BTreeMap<CampaignId, CacheKinds>,
    every_campaign: CacheKinds,
    global_list: bool,
}

impl PendingBatch {
    /// Merges a request into the batch. Empty kind sets never create a
    /// campaign entry.
    pub fn merge(
        &mut self,
        campaign_id: Option<CampaignId>,
        kinds: CacheKinds,
        affects_global_list: bool,
    ) {
        if !kinds.is_empty() {
            match campaign_id {
                Some(id) => *self.campaigns.entry(id).or_default() |= kinds,
                None => self.every_campaign |= kinds,
            }
        }
        self.global_list |= affects_global_list;
    }

    pub fn is_empty(&self) -> bool {
        self.campaigns.is_empty() && self.every_campaign.is_empty() && !self.global_list
    }

    pub fn campaign(&self, id: CampaignId) -> Option<CacheKinds> {
        self.campaigns.get(&id).copied()
    }

    pub fn every_campaign(&self) -> CacheKinds {
        self.every_campaign
    }

    pub fn global_list(&self) -> bool {
        self.global_list
    }

    /// Calls to deliver: one per campaign in id order, then the
    /// campaign-agnostic kinds, then the global list
    pub fn into_invalidations(self) -> Vec<Invalidation> {
        let mut out: Vec<Invalidation> = self
            .campaigns
            .into_iter()
            .map(|(id, kinds)| Invalidation::campaign(id, kinds))
            .collect();

        if !self.every_campaign.is_empty() {
            out.push(Invalidation::every_campaign(self.every_campaign));
        }
        if self.global_list {
            out.push(Invalidation::global_list());
        }
        out
    }
}

/// Outcome of one flush
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlushSummary {
    pub delivered: usize,
    pub failed: usize,
    /// calls discarded because no invalidator was registered
    pub dropped: usize,
}

struct Inner {
    window: Duration,
    dev_mode: bool,
    invalidator: InvalidatorHandle,
    pending: Mutex<PendingBatch>,
    timer: Mutex<Option<CancellationToken>>,
}

/// Coalesces invalidation requests and flushes them once the window has
/// passed without a new request.
///
/// Only one timer is live at a time: every [`InvalidationSink::schedule`]
/// cancels the running timer and arms a new one.
#[derive(Clone)]
pub struct DebouncedScheduler {
    inner: Arc<Inner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl DebouncedScheduler {
    pub fn new(window: Duration, invalidator: InvalidatorHandle, dev_mode: bool) -> Self {
        Self {
            inner: Arc::new(Inner {
                window,
                dev_mode,
                invalidator,
                pending: Mutex::new(PendingBatch::default()),
                timer: Mutex::new(None),
            }),
        }
    }

    pub fn window(&self) -> Duration {
        self.inner.window
    }

    /// Copy of what the next flush would deliver
    pub fn pending(&self) -> PendingBatch {
        lock(&self.inner.pending).clone()
    }

    pub fn is_armed(&self) -> bool {
        lock(&self.inner.timer).is_some()
    }

    /// Cancels the timer and delivers the pending batch right away
    pub async fn flush_now(&self) -> FlushSummary {
        let batch = {
            if let Some(token) = lock(&self.inner.timer).take() {
                token.cancel();
            }
            std::mem::take(&mut *lock(&self.inner.pending))
        };
        self.inner.deliver(batch).await
    }

    pub async fn shutdown(&self) {
        let summary = self.flush_now().await;
        tracing::info!(
            delivered = summary.delivered,
            failed = summary.failed,
            dropped = summary.dropped,
            "invalidation scheduler shut down"
        );
    }

    fn arm_timer(&self) {
        let Ok(runtime) = Handle::try_current() else {
            tracing::warn!("no tokio runtime, invalidations stay pending until flushed");
            return;
        };

        let token = CancellationToken::new();
        if let Some(previous) = lock(&self.inner.timer).replace(token.clone()) {
            previous.cancel();
        }

        let inner = self.inner.clone();
        runtime.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(inner.window) => inner.fire(&token).await,
            }
        });
    }
}

impl InvalidationSink for DebouncedScheduler {
    fn schedule(&self, campaign_id: Option<CampaignId>, kinds: CacheKinds, affects_global_list: bool) {
        if kinds.is_empty() && !affects_global_list {
            tracing::trace!(campaign_id = ?campaign_id, "nothing to invalidate");
            return;
        }

        lock(&self.inner.pending).merge(campaign_id, kinds, affects_global_list);
        self.arm_timer();
    }
}

impl Inner {
    async fn fire(&self, token: &CancellationToken) {
        let batch = {
            let mut timer = lock(&self.timer);
            // replaced between the sleep finishing and us taking the lock
            if token.is_cancelled() {
                return;
            }
            *timer = None;
            std::mem::take(&mut *lock(&self.pending))
        };
        self.deliver(batch).await;
    }

    #[tracing::instrument(name = "scheduler::flush", skip_all)]
    async fn deliver(&self, batch: PendingBatch) -> FlushSummary {
        let mut summary = FlushSummary::default();
        if batch.is_empty() {
            return summary;
        }

        let invalidations = batch.into_invalidations();

        if !self.invalidator.is_registered() {
            summary.dropped = invalidations.len();
            if self.dev_mode {
                tracing::error!(dropped = summary.dropped, "cannot flush invalidations, invalidator not registered");
            } else {
                tracing::warn!(dropped = summary.dropped, "invalidator not registered, dropping invalidations");
            }
            return summary;
        }

        for invalidation in invalidations {
            match self.invalidator.invoke(invalidation).await {
                Ok(()) => {
                    summary.delivered += 1;
                    dev_log!(
                        self.dev_mode,
                        campaign_id = ?invalidation.campaign_id,
                        kinds = %invalidation.kinds,
                        global_list = invalidation.affects_global_list,
                        "invalidated"
                    );
                }
                Err(InvokeError::NotRegistered) => summary.dropped += 1,
                Err(e) => {
                    summary.failed += 1;
                    tracing::error!(
                        error = %e,
                        campaign_id = ?invalidation.campaign_id,
                        "invalidation failed"
                    );
                }
            }
        }

        summary
    }
}
