use std::fmt::Display;

use bitflags::bitflags;
use serde::{Deserialize, Serialize, Serializer, ser::SerializeSeq};

/// Category of read data a screen caches per campaign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CacheKind {
    Campaign,
    Queue,
    Leads,
    History,
    DailyMetrics,
    CampaignMetrics,
    Scripts,
    /// rendered content of the campaign's active script
    #[serde(rename = "guion")]
    ScriptContent,
    ScheduledCalls,
}

impl CacheKind {
    pub const ALL: [CacheKind; 9] = [
        CacheKind::Campaign,
        CacheKind::Queue,
        CacheKind::Leads,
        CacheKind::History,
        CacheKind::DailyMetrics,
        CacheKind::CampaignMetrics,
        CacheKind::Scripts,
        CacheKind::ScriptContent,
        CacheKind::ScheduledCalls,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Campaign => "campaign",
            Self::Queue => "queue",
            Self::Leads => "leads",
            Self::History => "history",
            Self::DailyMetrics => "dailyMetrics",
            Self::CampaignMetrics => "campaignMetrics",
            Self::Scripts => "scripts",
            Self::ScriptContent => "guion",
            Self::ScheduledCalls => "scheduledCalls",
        }
    }

    /// Single-kind set, usable in `const` rule tables
    pub const fn flag(self) -> CacheKinds {
        match self {
            Self::Campaign => CacheKinds::CAMPAIGN,
            Self::Queue => CacheKinds::QUEUE,
            Self::Leads => CacheKinds::LEADS,
            Self::History => CacheKinds::HISTORY,
            Self::DailyMetrics => CacheKinds::DAILY_METRICS,
            Self::CampaignMetrics => CacheKinds::CAMPAIGN_METRICS,
            Self::Scripts => CacheKinds::SCRIPTS,
            Self::ScriptContent => CacheKinds::SCRIPT_CONTENT,
            Self::ScheduledCalls => CacheKinds::SCHEDULED_CALLS,
        }
    }
}

impl Display for CacheKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags! {
    /// Set of [`CacheKind`]s, const-constructible so rule tables can be `const`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CacheKinds: u16 {
        const CAMPAIGN = 1 << 0;
        const QUEUE = 1 << 1;
        const LEADS = 1 << 2;
        const HISTORY = 1 << 3;
        const DAILY_METRICS = 1 << 4;
        const CAMPAIGN_METRICS = 1 << 5;
        const SCRIPTS = 1 << 6;
        const SCRIPT_CONTENT = 1 << 7;
        const SCHEDULED_CALLS = 1 << 8;
    }
}

impl CacheKinds {
    pub const fn of(kinds: &[CacheKind]) -> Self {
        let mut set = Self::empty();
        let mut i = 0;
        while i < kinds.len() {
            set = set.union(kinds[i].flag());
            i += 1;
        }
        set
    }

    /// Member kinds in declaration order
    pub fn kinds(self) -> impl Iterator<Item = CacheKind> {
        CacheKind::ALL
            .into_iter()
            .filter(move |k| self.contains(k.flag()))
    }
}

impl Default for CacheKinds {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<CacheKind> for CacheKinds {
    fn from(kind: CacheKind) -> Self {
        kind.flag()
    }
}

impl Display for CacheKinds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.kinds().map(|k| k.as_str()).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}

// serialized as kind names, not bits
impl Serialize for CacheKinds {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.bits().count_ones() as usize))?;
        for kind in self.kinds() {
            seq.serialize_element(&kind)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for CacheKinds {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let kinds = Vec::<CacheKind>::deserialize(deserializer)?;
        Ok(kinds.into_iter().map(CacheKinds::from).collect())
    }
}
