use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use campaign_cache::{domain::Invalidation, invalidator::CacheInvalidator};

/// Records every invalidation it receives
#[derive(Clone, Default)]
pub struct RecordingInvalidator {
    calls: Arc<Mutex<Vec<Invalidation>>>,
}

impl RecordingInvalidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Invalidation> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CacheInvalidator for RecordingInvalidator {
    async fn invalidate(&self, invalidation: Invalidation) -> Result<()> {
        self.calls.lock().unwrap().push(invalidation);
        Ok(())
    }
}
