use std::sync::{Arc, Mutex};

use campaign_cache::{
    domain::{CacheKinds, CampaignId},
    scheduler::InvalidationSink,
};

type Scheduled = (Option<CampaignId>, CacheKinds, bool);

/// Records schedule calls instead of debouncing them
#[derive(Clone, Default)]
pub struct SpySink {
    calls: Arc<Mutex<Vec<Scheduled>>>,
}

impl SpySink {
    pub fn calls(&self) -> Vec<Scheduled> {
        self.calls.lock().unwrap().clone()
    }
}

impl InvalidationSink for SpySink {
    fn schedule(&self, campaign_id: Option<CampaignId>, kinds: CacheKinds, affects_global_list: bool) {
        self.calls
            .lock()
            .unwrap()
            .push((campaign_id, kinds, affects_global_list));
    }
}
