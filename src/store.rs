//! Client-side read cache for campaign screens.
//!
//! Entries are keyed by campaign and [`CacheKind`], plus one global slot for
//! the cross-campaign list. Invalidations either purge entries or mark them
//! stale, depending on [`InvalidationMode`].

mod focus;

use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use anyhow::Result;
use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use dashmap::DashMap;
use moka::future::Cache;
use serde::Deserialize;

use crate::{
    config::CacheSettings,
    domain::{CacheKind, CacheKinds, CampaignId, Invalidation},
    invalidator::CacheInvalidator,
};

pub use focus::FocusRevalidator;

type EntryKey = (CampaignId, CacheKind);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidationMode {
    /// drop entries, the next read refetches
    #[default]
    Purge,
    /// keep entries readable but flag them for refetch
    MarkStale,
}

#[derive(Debug, PartialEq, Eq)]
pub enum CacheLookup<V> {
    Fresh(Arc<V>),
    Stale(Arc<V>),
    Missing,
}

impl<V> CacheLookup<V> {
    pub fn value(&self) -> Option<&Arc<V>> {
        match self {
            Self::Fresh(v) | Self::Stale(v) => Some(v),
            Self::Missing => None,
        }
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, Self::Fresh(_))
    }
}

/// Fetches running for one key and how often that key was invalidated
/// since they started
#[derive(Debug, Default)]
struct InFlight {
    fetches: usize,
    generation: u64,
}

/// Registration of one running fetch, released on drop
struct FetchTicket<'a> {
    in_flight: &'a DashMap<EntryKey, InFlight>,
    key: EntryKey,
    started_at: u64,
}

impl<'a> FetchTicket<'a> {
    fn begin(in_flight: &'a DashMap<EntryKey, InFlight>, key: EntryKey) -> Self {
        let mut state = in_flight.entry(key).or_default();
        state.fetches += 1;
        let started_at = state.generation;
        drop(state);

        Self {
            in_flight,
            key,
            started_at,
        }
    }

    /// Runs `on_current` unless the key was invalidated since the fetch
    /// started. The key's slot stays locked meanwhile, so an invalidation
    /// either lands before the check or after `on_current`.
    fn settle(&self, on_current: impl FnOnce()) -> bool {
        let Some(state) = self.in_flight.get_mut(&self.key) else {
            return false;
        };
        let current = state.generation == self.started_at;
        if current {
            on_current();
        }
        current
    }
}

impl Drop for FetchTicket<'_> {
    fn drop(&mut self) {
        if let Some(mut state) = self.in_flight.get_mut(&self.key) {
            state.fetches = state.fetches.saturating_sub(1);
        }
        self.in_flight.remove_if(&self.key, |_, state| state.fetches == 0);
    }
}

pub struct CampaignCacheStore<V> {
    entries: Cache<EntryKey, Arc<V>>,
    global_list: ArcSwapOption<V>,
    /// only holds kinds that have an entry in `entries`
    stale: DashMap<CampaignId, CacheKinds>,
    global_stale: AtomicBool,
    in_flight: DashMap<EntryKey, InFlight>,
    mode: InvalidationMode,
    focus: FocusRevalidator,
}

impl<V> CampaignCacheStore<V>
where
    V: Send + Sync + 'static,
{
    pub fn new(settings: &CacheSettings) -> Self {
        let entries = Cache::builder()
            .max_capacity(settings.max_capacity)
            .time_to_live(Duration::from_secs(settings.ttl_secs))
            .support_invalidation_closures()
            .build();

        Self {
            entries,
            global_list: ArcSwapOption::empty(),
            stale: DashMap::new(),
            global_stale: AtomicBool::new(false),
            in_flight: DashMap::new(),
            mode: settings.mode,
            focus: FocusRevalidator::new(Duration::from_secs(settings.focus_revalidate_secs)),
        }
    }

    pub fn mode(&self) -> InvalidationMode {
        self.mode
    }

    pub async fn lookup(&self, campaign_id: CampaignId, kind: CacheKind) -> CacheLookup<V> {
        match self.entries.get(&(campaign_id, kind)).await {
            None => {
                // expired or evicted, its stale flag is meaningless now
                self.clear_stale(campaign_id, kind);
                CacheLookup::Missing
            }
            Some(value) if self.is_stale(campaign_id, kind) => CacheLookup::Stale(value),
            Some(value) => CacheLookup::Fresh(value),
        }
    }

    pub async fn insert(&self, campaign_id: CampaignId, kind: CacheKind, value: V) -> Arc<V> {
        let value = Arc::new(value);
        self.entries.insert((campaign_id, kind), value.clone()).await;
        self.clear_stale(campaign_id, kind);
        value
    }

    /// Returns the cached value, fetching it when missing or stale.
    /// Concurrent callers for a missing entry share one fetch.
    ///
    /// A value fetched while the same key was invalidated is returned to the
    /// caller but not kept as fresh: the next read fetches again.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        campaign_id: CampaignId,
        kind: CacheKind,
        fetch: F,
    ) -> Result<Arc<V>, Arc<anyhow::Error>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        let key = (campaign_id, kind);
        let ticket = FetchTicket::begin(&self.in_flight, key);

        let refetch = self.is_stale(campaign_id, kind);
        let value = if refetch {
            let value = Arc::new(fetch().await.map_err(Arc::new)?);
            self.entries.insert(key, value.clone()).await;
            value
        } else {
            self.entries
                .try_get_with(key, async move { fetch().await.map(Arc::new) })
                .await?
        };

        let current = ticket.settle(|| {
            if refetch {
                self.clear_stale(campaign_id, kind);
            }
        });
        if !current {
            tracing::debug!(campaign_id = %campaign_id, kind = %kind, "invalidated during fetch");
            match self.mode {
                InvalidationMode::Purge => self.entries.invalidate(&key).await,
                InvalidationMode::MarkStale => self.mark_stale(campaign_id, kind.into()),
            }
        }

        Ok(value)
    }

    pub fn global_list(&self) -> CacheLookup<V> {
        match self.global_list.load_full() {
            None => CacheLookup::Missing,
            Some(value) if self.global_stale.load(Ordering::Acquire) => CacheLookup::Stale(value),
            Some(value) => CacheLookup::Fresh(value),
        }
    }

    pub fn set_global_list(&self, value: V) -> Arc<V> {
        let value = Arc::new(value);
        self.global_list.store(Some(value.clone()));
        self.global_stale.store(false, Ordering::Release);
        value
    }

    pub async fn get_or_fetch_global_list<F, Fut>(&self, fetch: F) -> Result<Arc<V>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        if let CacheLookup::Fresh(value) = self.global_list() {
            return Ok(value);
        }
        Ok(self.set_global_list(fetch().await?))
    }

    /// Applies one invalidation to the store
    pub async fn apply(&self, invalidation: Invalidation) {
        let kinds = invalidation.kinds;

        // before touching entries, so a fetch that settles afterwards sees it
        self.bump_in_flight(invalidation.campaign_id, kinds);

        match (self.mode, invalidation.campaign_id) {
            (_, _) if kinds.is_empty() => {}
            (InvalidationMode::Purge, Some(id)) => {
                for kind in kinds.kinds() {
                    self.entries.invalidate(&(id, kind)).await;
                }
            }
            (InvalidationMode::Purge, None) => {
                if let Err(e) = self
                    .entries
                    .invalidate_entries_if(move |key: &EntryKey, _| kinds.contains(key.1.flag()))
                {
                    tracing::warn!(error = %e, "falling back to full purge");
                    self.entries.invalidate_all();
                }
            }
            (InvalidationMode::MarkStale, Some(id)) => {
                let cached: CacheKinds = kinds
                    .kinds()
                    .filter(|kind| self.entries.contains_key(&(id, *kind)))
                    .map(CacheKinds::from)
                    .collect();
                self.mark_stale(id, cached);
            }
            (InvalidationMode::MarkStale, None) => {
                for (key, _) in self.entries.iter() {
                    let (id, kind) = *key;
                    if kinds.contains(kind.flag()) {
                        self.mark_stale(id, kind.into());
                    }
                }
            }
        }

        if invalidation.affects_global_list {
            match self.mode {
                InvalidationMode::Purge => self.global_list.store(None),
                InvalidationMode::MarkStale => self.global_stale.store(true, Ordering::Release),
            }
        }

        tracing::debug!(
            campaign_id = ?invalidation.campaign_id,
            kinds = %kinds,
            global_list = invalidation.affects_global_list,
            mode = ?self.mode,
            "cache invalidated"
        );
    }

    /// Invalidates every entry and the global list
    pub async fn apply_all(&self) {
        self.apply(Invalidation {
            campaign_id: None,
            kinds: CacheKinds::all(),
            affects_global_list: true,
        })
        .await;
    }

    /// Feeds a visibility change of the hosting view. Returns true when it
    /// triggered a full revalidation.
    pub async fn on_visibility_change(&self, visible: bool) -> bool {
        let revalidate = self.focus.on_visibility_change(visible);
        if revalidate {
            tracing::debug!("view visible again, revalidating cache");
            self.apply_all().await;
        }
        revalidate
    }

    fn bump_in_flight(&self, campaign_id: Option<CampaignId>, kinds: CacheKinds) {
        match campaign_id {
            Some(id) => {
                for kind in kinds.kinds() {
                    if let Some(mut state) = self.in_flight.get_mut(&(id, kind)) {
                        state.generation += 1;
                    }
                }
            }
            None => self
                .in_flight
                .iter_mut()
                .filter(|state| kinds.contains(state.key().1.flag()))
                .for_each(|mut state| state.generation += 1),
        }
    }

    fn mark_stale(&self, campaign_id: CampaignId, kinds: CacheKinds) {
        if !kinds.is_empty() {
            *self.stale.entry(campaign_id).or_default() |= kinds;
        }
    }

    fn is_stale(&self, campaign_id: CampaignId, kind: CacheKind) -> bool {
        self.stale
            .get(&campaign_id)
            .is_some_and(|kinds| kinds.contains(kind.flag()))
    }

    fn clear_stale(&self, campaign_id: CampaignId, kind: CacheKind) {
        self.stale.remove_if_mut(&campaign_id, |_, kinds| {
            kinds.remove(kind.flag());
            kinds.is_empty()
        });
    }

    #[cfg(test)]
    fn stale_campaigns(&self) -> usize {
        self.stale.len()
    }
}

#[async_trait]
impl<V> CacheInvalidator for CampaignCacheStore<V>
where
    V: Send + Sync + 'static,
{
    async fn invalidate(&self, invalidation: Invalidation) -> Result<()> {
        self.apply(invalidation).await;
        Ok(())
    }
}
