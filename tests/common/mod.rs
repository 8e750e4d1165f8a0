#![allow(dead_code)]

pub mod mock_invalidator;
pub mod mock_sink;

use campaign_cache::domain::CampaignId;

pub use mock_invalidator::RecordingInvalidator;
pub use mock_sink::SpySink;

pub fn campaign(id: i64) -> CampaignId {
    CampaignId::new(id)
}
