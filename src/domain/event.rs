use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Domain-level write operation inferred from a successful HTTP mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MutationEvent {
    ContactTaken,
    CallResultRegistered,
    QueueToggled,
    RecordingUploaded,
    RecordingDeleted,
    CampaignCreated,
    CampaignConfigUpdated,
    ScriptLinked,
    ScriptUpdated,
    UrgentContactAdded,
}

impl MutationEvent {
    pub const ALL: [MutationEvent; 10] = [
        MutationEvent::ContactTaken,
        MutationEvent::CallResultRegistered,
        MutationEvent::QueueToggled,
        MutationEvent::RecordingUploaded,
        MutationEvent::RecordingDeleted,
        MutationEvent::CampaignCreated,
        MutationEvent::CampaignConfigUpdated,
        MutationEvent::ScriptLinked,
        MutationEvent::ScriptUpdated,
        MutationEvent::UrgentContactAdded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ContactTaken => "CONTACT_TAKEN",
            Self::CallResultRegistered => "CALL_RESULT_REGISTERED",
            Self::QueueToggled => "QUEUE_TOGGLED",
            Self::RecordingUploaded => "RECORDING_UPLOADED",
            Self::RecordingDeleted => "RECORDING_DELETED",
            Self::CampaignCreated => "CAMPAIGN_CREATED",
            Self::CampaignConfigUpdated => "CAMPAIGN_CONFIG_UPDATED",
            Self::ScriptLinked => "SCRIPT_LINKED",
            Self::ScriptUpdated => "SCRIPT_UPDATED",
            Self::UrgentContactAdded => "URGENT_CONTACT_ADDED",
        }
    }
}

impl Display for MutationEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
