//! Which cached data each mutation event makes stale.

use std::{collections::HashMap, sync::LazyLock};

use serde::Serialize;
use thiserror::Error;

use crate::domain::{
    CacheKind::{self, *},
    CacheKinds, MutationEvent,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidationRule {
    pub event: MutationEvent,
    pub kinds: CacheKinds,
    /// kinds stale only when the write rescheduled a call
    pub reschedule_kinds: CacheKinds,
    pub affects_global_list: bool,
}

impl InvalidationRule {
    const fn new(event: MutationEvent, kinds: &[CacheKind]) -> Self {
        Self {
            event,
            kinds: CacheKinds::of(kinds),
            reschedule_kinds: CacheKinds::empty(),
            affects_global_list: false,
        }
    }

    const fn on_reschedule(mut self, kinds: &[CacheKind]) -> Self {
        self.reschedule_kinds = CacheKinds::of(kinds);
        self
    }

    const fn global(mut self) -> Self {
        self.affects_global_list = true;
        self
    }

    /// Kinds to invalidate given whether the write rescheduled a call.
    /// `None` means the request body was not available.
    pub fn kinds_for(&self, rescheduled: Option<bool>) -> CacheKinds {
        match rescheduled {
            Some(false) => self.kinds,
            Some(true) | None => self.kinds.union(self.reschedule_kinds),
        }
    }

    pub fn all_kinds(&self) -> CacheKinds {
        self.kinds_for(None)
    }

    /// true when the event touches nothing held in the shared cache
    pub fn is_noop(&self) -> bool {
        self.all_kinds().is_empty() && !self.affects_global_list
    }
}

/// Rule for every event. The match is exhaustive, so a new event does not
/// compile until it has a rule.
pub const fn rule_for(event: MutationEvent) -> InvalidationRule {
    use MutationEvent::*;

    match event {
        ContactTaken => InvalidationRule::new(event, &[Queue, Leads, DailyMetrics]),
        CallResultRegistered => {
            InvalidationRule::new(event, &[Queue, Leads, History, DailyMetrics, CampaignMetrics])
                .on_reschedule(&[ScheduledCalls])
        }
        QueueToggled => InvalidationRule::new(event, &[Queue]),
        // recordings are listed from page-local state, not the shared cache
        RecordingUploaded => InvalidationRule::new(event, &[]),
        RecordingDeleted => InvalidationRule::new(event, &[]),
        CampaignCreated => InvalidationRule::new(event, &[]).global(),
        CampaignConfigUpdated => InvalidationRule::new(event, &[Campaign]),
        ScriptLinked => InvalidationRule::new(event, &[Campaign, Scripts, ScriptContent]),
        ScriptUpdated => InvalidationRule::new(event, &[ScriptContent]),
        UrgentContactAdded => InvalidationRule::new(event, &[Queue, Leads]),
    }
}

/// Built-in rules, one per event, in [`MutationEvent::ALL`] order
pub static INVALIDATION_RULES: LazyLock<Vec<InvalidationRule>> =
    LazyLock::new(|| MutationEvent::ALL.into_iter().map(rule_for).collect());

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleMapError {
    #[error("no invalidation rule for event {0}")]
    MissingRule(MutationEvent),
    #[error("more than one invalidation rule for event {0}")]
    DuplicateRule(MutationEvent),
}

/// Event to rule lookup
#[derive(Debug, Clone)]
pub struct RuleMap {
    rules: HashMap<MutationEvent, InvalidationRule>,
    declared: Vec<InvalidationRule>,
}

impl Default for RuleMap {
    fn default() -> Self {
        Self::from_rules(INVALIDATION_RULES.iter().copied())
    }
}

impl RuleMap {
    /// Builds a map from an arbitrary rule list. Later duplicates overwrite
    /// earlier ones; [`RuleMap::validate`] reports them.
    pub fn from_rules(rules: impl IntoIterator<Item = InvalidationRule>) -> Self {
        let declared: Vec<_> = rules.into_iter().collect();
        let rules = declared.iter().map(|r| (r.event, *r)).collect();
        Self { rules, declared }
    }

    pub fn get(&self, event: MutationEvent) -> Option<&InvalidationRule> {
        self.rules.get(&event)
    }

    /// Rules in declaration order
    pub fn rules(&self) -> &[InvalidationRule] {
        &self.declared
    }

    /// Checks that every event has exactly one rule
    pub fn validate(&self) -> Result<(), RuleMapError> {
        for event in MutationEvent::ALL {
            match self.declared.iter().filter(|r| r.event == event).count() {
                0 => return Err(RuleMapError::MissingRule(event)),
                1 => {}
                _ => return Err(RuleMapError::DuplicateRule(event)),
            }
        }
        Ok(())
    }
}
