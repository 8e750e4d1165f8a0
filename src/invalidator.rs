use std::{sync::Arc, time::Instant};

use anyhow::Result;
use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use thiserror::Error;

use crate::domain::Invalidation;

/// Implemented by whatever owns the cached data
#[async_trait]
pub trait CacheInvalidator: Send + Sync {
    async fn invalidate(&self, invalidation: Invalidation) -> Result<()>;
}

#[async_trait]
impl<T> CacheInvalidator for Arc<T>
where
    T: CacheInvalidator + ?Sized,
{
    async fn invalidate(&self, invalidation: Invalidation) -> Result<()> {
        (**self).invalidate(invalidation).await
    }
}

/// Adapts a plain closure into a [`CacheInvalidator`]
pub struct FnInvalidator<F>(pub F);

#[async_trait]
impl<F> CacheInvalidator for FnInvalidator<F>
where
    F: Fn(Invalidation) + Send + Sync,
{
    async fn invalidate(&self, invalidation: Invalidation) -> Result<()> {
        (self.0)(invalidation);
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("no cache invalidator registered")]
    NotRegistered,
    #[error("cache invalidator failed: {0}")]
    Failed(#[source] anyhow::Error),
}

struct Registration {
    invalidator: Box<dyn CacheInvalidator>,
    registered_at: Instant,
}

/// Single-slot bridge from the transport layer to the cache owner.
///
/// Cloned handles share the slot. Registering again replaces the previous
/// invalidator.
#[derive(Clone, Default)]
pub struct InvalidatorHandle {
    slot: Arc<ArcSwapOption<Registration>>,
}

impl InvalidatorHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<I>(&self, invalidator: I)
    where
        I: CacheInvalidator + 'static,
    {
        let previous = self.slot.swap(Some(Arc::new(Registration {
            invalidator: Box::new(invalidator),
            registered_at: Instant::now(),
        })));

        match previous {
            Some(prev) => tracing::debug!(
                replaced_after_ms = prev.registered_at.elapsed().as_millis() as u64,
                "cache invalidator replaced"
            ),
            None => tracing::info!("cache invalidator registered"),
        }
    }

    pub fn register_fn<F>(&self, f: F)
    where
        F: Fn(Invalidation) + Send + Sync + 'static,
    {
        self.register(FnInvalidator(f));
    }

    pub fn unregister(&self) {
        self.slot.store(None);
    }

    pub fn is_registered(&self) -> bool {
        self.slot.load().is_some()
    }

    pub(crate) async fn invoke(&self, invalidation: Invalidation) -> Result<(), InvokeError> {
        // hold our own reference so a concurrent re-registration can't drop it mid-call
        let registration = self.slot.load_full().ok_or(InvokeError::NotRegistered)?;

        registration
            .invalidator
            .invalidate(invalidation)
            .await
            .map_err(InvokeError::Failed)
    }
}

#[cfg(test)]
mod test {
    use std::sync::Mutex;

    use super::*;
    use crate::domain::{CacheKind, CacheKinds, CampaignId};

    #[tokio::test]
    async fn invoke_without_registration_fails_softly() {
        let handle = InvalidatorHandle::new();
        let result = handle.invoke(Invalidation::global_list()).await;
        assert!(matches!(result, Err(InvokeError::NotRegistered)));
    }

    #[tokio::test]
    async fn last_registration_wins() {
        let handle = InvalidatorHandle::new();
        let first = Arc::new(Mutex::new(0));
        let second = Arc::new(Mutex::new(0));

        let counter = first.clone();
        handle.register_fn(move |_| *counter.lock().unwrap() += 1);
        let counter = second.clone();
        handle.clone().register_fn(move |_| *counter.lock().unwrap() += 1);

        let inv = Invalidation::campaign(CampaignId::new(1), CacheKind::Queue.into());
        handle.invoke(inv).await.unwrap();

        assert_eq!(*first.lock().unwrap(), 0);
        assert_eq!(*second.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn invalidator_errors_are_wrapped() {
        struct Failing;

        #[async_trait]
        impl CacheInvalidator for Failing {
            async fn invalidate(&self, _: Invalidation) -> Result<()> {
                anyhow::bail!("store closed")
            }
        }

        let handle = InvalidatorHandle::new();
        handle.register(Failing);
        let result = handle.invoke(Invalidation::every_campaign(CacheKinds::all())).await;
        assert!(matches!(result, Err(InvokeError::Failed(_))));

        handle.unregister();
        assert!(!handle.is_registered());
    }
}
