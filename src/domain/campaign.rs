use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Backend identifier of a telephonic campaign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CampaignId(i64);

impl CampaignId {
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub const fn get(&self) -> i64 {
        self.0
    }

    /// Reads a campaign id out of a JSON value, accepting numbers and numeric strings
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n.as_i64().map(Self),
            serde_json::Value::String(s) => s.parse().ok().map(Self),
            _ => None,
        }
    }
}

impl From<i64> for CampaignId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl Display for CampaignId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
