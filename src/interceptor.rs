//! Turns successful HTTP writes into scheduled cache invalidations.

mod layer;

use std::sync::Arc;

use http::{Method, StatusCode};
use serde_json::Value;

use crate::{
    detector::{CampaignIdSource, DetectedMutation, PatternTable},
    domain::{CacheKinds, CampaignId, MutationEvent},
    invalidator::InvalidatorHandle,
    rules::RuleMap,
    scheduler::InvalidationSink,
};

pub use layer::{CacheInvalidationLayer, CacheInvalidationService};

/// JSON pointer to the campaign id in the backend's `{ "data": ... }` envelope
pub const DEFAULT_CAMPAIGN_ID_POINTER: &str = "/data/idCampania";
/// Request body field set when a call result also reschedules the call
pub const RESCHEDULE_FIELD: &str = "fechaReagendamiento";

/// A completed HTTP exchange as seen by the transport
#[derive(Debug, Clone, Copy)]
pub struct Exchange<'a> {
    pub method: &'a Method,
    /// path, optionally with query string, or an absolute URL
    pub url: &'a str,
    pub status: StatusCode,
    pub request_body: Option<&'a Value>,
    pub response_body: Option<&'a Value>,
}

/// What the interceptor handed to the scheduler for one exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledInvalidation {
    pub event: MutationEvent,
    pub campaign_id: Option<CampaignId>,
    pub kinds: CacheKinds,
    pub affects_global_list: bool,
}

pub struct ResponseInterceptor {
    patterns: Arc<PatternTable>,
    rules: Arc<RuleMap>,
    sink: Arc<dyn InvalidationSink>,
    invalidator: InvalidatorHandle,
    campaign_id_pointer: String,
    dev_mode: bool,
}

impl ResponseInterceptor {
    /// Interceptor using the built-in pattern table and rule map
    pub fn new(sink: Arc<dyn InvalidationSink>, invalidator: InvalidatorHandle) -> Self {
        Self {
            patterns: Arc::new(PatternTable::builtin().clone()),
            rules: Arc::new(RuleMap::default()),
            sink,
            invalidator,
            campaign_id_pointer: DEFAULT_CAMPAIGN_ID_POINTER.to_string(),
            dev_mode: false,
        }
    }

    pub fn with_patterns(mut self, patterns: PatternTable) -> Self {
        self.patterns = Arc::new(patterns);
        self
    }

    pub fn with_rules(mut self, rules: RuleMap) -> Self {
        self.rules = Arc::new(rules);
        self
    }

    pub fn with_campaign_id_pointer(mut self, pointer: impl Into<String>) -> Self {
        self.campaign_id_pointer = pointer.into();
        self
    }

    pub fn with_dev_mode(mut self, dev_mode: bool) -> Self {
        self.dev_mode = dev_mode;
        self
    }

    pub fn into_layer(self) -> CacheInvalidationLayer {
        CacheInvalidationLayer::new(Arc::new(self))
    }

    pub fn classify(&self, method: &Method, url: &str) -> Option<DetectedMutation> {
        self.patterns.detect(method, url)
    }

    /// Handles one completed exchange. Returns what was scheduled, `None` when
    /// the exchange was ignored.
    pub fn on_response(&self, exchange: &Exchange<'_>) -> Option<ScheduledInvalidation> {
        if !exchange.status.is_success() {
            return None;
        }
        let detected = self.classify(exchange.method, exchange.url)?;
        self.on_classified(
            detected,
            exchange.status,
            exchange.request_body,
            exchange.response_body,
        )
    }

    /// Second half of [`ResponseInterceptor::on_response`], for transports
    /// that classify before sending the request
    pub fn on_classified(
        &self,
        detected: DetectedMutation,
        status: StatusCode,
        request_body: Option<&Value>,
        response_body: Option<&Value>,
    ) -> Option<ScheduledInvalidation> {
        // failed writes did not happen
        if !status.is_success() {
            return None;
        }

        dev_log!(
            self.dev_mode,
            event = %detected.event,
            campaign_id = ?detected.campaign_id,
            "detected mutation"
        );

        let Some(rule) = self.rules.get(detected.event) else {
            if self.dev_mode {
                panic!("no invalidation rule for event {}", detected.event);
            }
            tracing::warn!(event = %detected.event, "no invalidation rule, skipping");
            return None;
        };

        if !self.invalidator.is_registered() {
            if self.dev_mode {
                tracing::error!(event = %detected.event, "cache invalidator not registered");
            } else {
                tracing::debug!(event = %detected.event, "cache invalidator not registered");
            }
            return None;
        }

        let campaign_id = detected.campaign_id.or_else(|| match detected.source {
            CampaignIdSource::Agnostic => None,
            CampaignIdSource::Path | CampaignIdSource::ResponseBody => response_body
                .and_then(|body| body.pointer(&self.campaign_id_pointer))
                .and_then(CampaignId::from_json),
        });

        let kinds = rule.kinds_for(request_body.map(signals_reschedule));

        self.sink.schedule(campaign_id, kinds, rule.affects_global_list);

        Some(ScheduledInvalidation {
            event: detected.event,
            campaign_id,
            kinds,
            affects_global_list: rule.affects_global_list,
        })
    }
}

/// true when a call-result request body carries a reschedule date
pub fn signals_reschedule(request_body: &Value) -> bool {
    request_body
        .get(RESCHEDULE_FIELD)
        .is_some_and(|v| !v.is_null())
}
