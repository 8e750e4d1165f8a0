use serde::{Deserialize, Serialize};

use super::{CacheKinds, CampaignId};

/// One call delivered to the registered cache invalidator
///
/// * `campaign_id = Some(_)`: purge `kinds` for that campaign
/// * `campaign_id = None`, non-empty `kinds`: purge `kinds` for every campaign
/// * `affects_global_list`: refresh the cross-campaign list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invalidation {
    pub campaign_id: Option<CampaignId>,
    pub kinds: CacheKinds,
    pub affects_global_list: bool,
}

impl Invalidation {
    pub fn campaign(campaign_id: CampaignId, kinds: CacheKinds) -> Self {
        Self {
            campaign_id: Some(campaign_id),
            kinds,
            affects_global_list: false,
        }
    }

    pub fn every_campaign(kinds: CacheKinds) -> Self {
        Self {
            campaign_id: None,
            kinds,
            affects_global_list: false,
        }
    }

    pub fn global_list() -> Self {
        Self {
            campaign_id: None,
            kinds: CacheKinds::empty(),
            affects_global_list: true,
        }
    }

    /// true when applying this invalidation would change nothing
    pub fn is_noop(&self) -> bool {
        self.kinds.is_empty() && !self.affects_global_list
    }
}
