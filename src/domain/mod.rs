mod campaign;
mod event;
mod invalidation;
mod kind;

pub use campaign::CampaignId;
pub use event::MutationEvent;
pub use invalidation::Invalidation;
pub use kind::{CacheKind, CacheKinds};
