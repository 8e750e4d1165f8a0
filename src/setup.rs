use std::sync::Arc;

use thiserror::Error;

use crate::{
    config::Settings,
    detector::PatternTable,
    interceptor::{CacheInvalidationLayer, ResponseInterceptor},
    invalidator::{CacheInvalidator, InvalidatorHandle},
    rules::{RuleMap, RuleMapError},
    scheduler::DebouncedScheduler,
};

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("invalid invalidation rules: {0}")]
    Rules(#[from] RuleMapError),
}

/// The wired subsystem: registration slot, scheduler and interceptor.
///
/// Build it once at start-up, install [`CacheInvalidation::layer`] in the
/// HTTP client stack, and have the cache owner call
/// [`CacheInvalidation::register`].
pub struct CacheInvalidation {
    invalidator: InvalidatorHandle,
    scheduler: DebouncedScheduler,
    interceptor: Arc<ResponseInterceptor>,
}

impl CacheInvalidation {
    pub fn setup(settings: &Settings) -> Result<Self, SetupError> {
        Self::with_tables(settings, PatternTable::builtin().clone(), RuleMap::default())
    }

    pub fn with_tables(
        settings: &Settings,
        patterns: PatternTable,
        rules: RuleMap,
    ) -> Result<Self, SetupError> {
        if let Err(e) = rules.validate() {
            if settings.dev_mode {
                return Err(e.into());
            }
            tracing::warn!(error = %e, "invalidation rules incomplete, affected events are ignored");
        }

        let invalidator = InvalidatorHandle::new();
        let scheduler =
            DebouncedScheduler::new(settings.debounce(), invalidator.clone(), settings.dev_mode);
        let interceptor = ResponseInterceptor::new(Arc::new(scheduler.clone()), invalidator.clone())
            .with_patterns(patterns)
            .with_rules(rules)
            .with_campaign_id_pointer(settings.campaign_id_pointer.clone())
            .with_dev_mode(settings.dev_mode);

        tracing::info!(
            debounce_ms = settings.debounce_ms,
            dev_mode = settings.dev_mode,
            "cache invalidation set up"
        );

        Ok(Self {
            invalidator,
            scheduler,
            interceptor: Arc::new(interceptor),
        })
    }

    pub fn register<I>(&self, invalidator: I)
    where
        I: CacheInvalidator + 'static,
    {
        self.invalidator.register(invalidator);
    }

    pub fn invalidator(&self) -> &InvalidatorHandle {
        &self.invalidator
    }

    pub fn scheduler(&self) -> &DebouncedScheduler {
        &self.scheduler
    }

    pub fn interceptor(&self) -> &Arc<ResponseInterceptor> {
        &self.interceptor
    }

    /// Tower layer to install in the HTTP client stack
    pub fn layer(&self) -> CacheInvalidationLayer {
        CacheInvalidationLayer::new(self.interceptor.clone())
    }

    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::rules::rule_for;
    use crate::domain::MutationEvent;

    #[test]
    fn incomplete_rules_fail_only_in_dev_mode() {
        let partial = RuleMap::from_rules([rule_for(MutationEvent::ContactTaken)]);

        let dev = Settings {
            dev_mode: true,
            ..Settings::default()
        };
        assert!(matches!(
            CacheInvalidation::with_tables(&dev, PatternTable::builtin().clone(), partial.clone()),
            Err(SetupError::Rules(_))
        ));

        let prod = Settings::default();
        assert!(CacheInvalidation::with_tables(&prod, PatternTable::builtin().clone(), partial).is_ok());
    }
}
