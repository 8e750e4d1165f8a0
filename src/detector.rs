//! Classifies HTTP write requests into [`MutationEvent`]s.
//!
//! The backend does not announce which resources a write touched, so the
//! event is inferred from the request method and path. Patterns are tried in
//! declaration order and the first match wins; overlapping patterns must be
//! ordered by hand.

use std::{borrow::Cow, sync::LazyLock};

use http::Method;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::domain::{CampaignId, MutationEvent};

/// Name of the capture group holding the campaign id in `Path` patterns
pub const CAMPAIGN_GROUP: &str = "campaign";

/// Where the campaign id of a detected mutation comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignIdSource {
    /// the `campaign` capture group of the pattern
    Path,
    /// not in the URL, the interceptor reads it from the response body
    ResponseBody,
    /// the mutation is not scoped to a single campaign
    Agnostic,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PatternSpec {
    pub method: &'static str,
    pub path: &'static str,
    pub event: MutationEvent,
    pub campaign_id: CampaignIdSource,
}

const fn spec(
    method: &'static str,
    path: &'static str,
    event: MutationEvent,
    campaign_id: CampaignIdSource,
) -> PatternSpec {
    PatternSpec {
        method,
        path,
        event,
        campaign_id,
    }
}

use CampaignIdSource::{Agnostic, Path, ResponseBody};
use MutationEvent::*;

/// Built-in endpoint patterns of the telephonic campaigns API, in match order
pub const MUTATION_PATTERNS: &[PatternSpec] = &[
    // agent: take a contact out of the queue
    spec("POST", r"/campanias-telefonicas/(?P<campaign>\d+)/cola/siguiente$", ContactTaken, Path),
    spec("POST", r"/campanias-telefonicas/(?P<campaign>\d+)/contactos/\d+/tomar$", ContactTaken, Path),
    // agent: call outcome
    spec("POST", r"/campanias-telefonicas/(?P<campaign>\d+)/llamadas/resultado$", CallResultRegistered, Path),
    // queue pause / resume
    spec("POST", r"/campanias-telefonicas/(?P<campaign>\d+)/pausar-cola$", QueueToggled, Path),
    spec("POST", r"/campanias-telefonicas/(?P<campaign>\d+)/reanudar-cola$", QueueToggled, Path),
    // recordings
    spec("POST", r"/campanias-telefonicas/(?P<campaign>\d+)/grabaciones$", RecordingUploaded, Path),
    spec("DELETE", r"/grabaciones/\d+$", RecordingDeleted, Agnostic),
    // admin
    spec("POST", r"/campanias-telefonicas$", CampaignCreated, Agnostic),
    spec("PUT", r"/campanias-telefonicas/(?P<campaign>\d+)/config$", CampaignConfigUpdated, Path),
    spec("POST", r"/campanias-telefonicas/(?P<campaign>\d+)/vincular-guion$", ScriptLinked, Path),
    spec("POST", r"/campanias-telefonicas/(?P<campaign>\d+)/guiones/general$", ScriptLinked, Path),
    // a script can be shared by many campaigns
    spec("PUT", r"/guiones/\d+$", ScriptUpdated, Agnostic),
    // public intake, campaign id only known from the created contact
    spec("POST", r"/public/v1/campanias-telefonicas/cola/urgente$", UrgentContactAdded, ResponseBody),
];

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("pattern `{pattern}` is not a valid regex")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("pattern `{0}` reads the campaign id from the path but has no `campaign` group")]
    MissingCampaignGroup(String),
    #[error("pattern `{pattern}` has an invalid method `{method}`")]
    InvalidMethod { pattern: String, method: String },
}

/// Result of classifying a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectedMutation {
    pub event: MutationEvent,
    /// `None` is valid: the event may be campaign-agnostic or need a body lookup
    pub campaign_id: Option<CampaignId>,
    pub source: CampaignIdSource,
}

#[derive(Clone)]
struct CompiledPattern {
    spec: PatternSpec,
    method: Method,
    regex: Regex,
}

#[derive(Clone)]
pub struct PatternTable {
    patterns: Vec<CompiledPattern>,
}

static BUILTIN: LazyLock<PatternTable> = LazyLock::new(|| {
    PatternTable::compile(MUTATION_PATTERNS).expect("built-in mutation patterns must compile")
});

impl PatternTable {
    pub fn compile(specs: &[PatternSpec]) -> Result<Self, PatternError> {
        let patterns = specs
            .iter()
            .map(|spec| {
                let method = Method::from_bytes(spec.method.as_bytes()).map_err(|_| {
                    PatternError::InvalidMethod {
                        pattern: spec.path.to_string(),
                        method: spec.method.to_string(),
                    }
                })?;

                let regex = Regex::new(spec.path).map_err(|source| PatternError::InvalidRegex {
                    pattern: spec.path.to_string(),
                    source,
                })?;

                if spec.campaign_id == CampaignIdSource::Path
                    && !regex.capture_names().any(|n| n == Some(CAMPAIGN_GROUP))
                {
                    return Err(PatternError::MissingCampaignGroup(spec.path.to_string()));
                }

                Ok(CompiledPattern {
                    spec: *spec,
                    method,
                    regex,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { patterns })
    }

    /// Table compiled from [`MUTATION_PATTERNS`]
    pub fn builtin() -> &'static PatternTable {
        &BUILTIN
    }

    pub fn specs(&self) -> impl Iterator<Item = &PatternSpec> {
        self.patterns.iter().map(|p| &p.spec)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Returns the first pattern matching `method` and the path of `url`,
    /// `None` when the request is not a known mutation
    pub fn detect(&self, method: &Method, url: &str) -> Option<DetectedMutation> {
        let path = request_path(url);

        let pattern = self
            .patterns
            .iter()
            .find(|p| p.method == *method && p.regex.is_match(&path))?;

        let campaign_id = match pattern.spec.campaign_id {
            CampaignIdSource::Path => pattern
                .regex
                .captures(&path)
                .and_then(|caps| caps.name(CAMPAIGN_GROUP))
                .and_then(|m| m.as_str().parse::<i64>().ok())
                .map(CampaignId::new),
            CampaignIdSource::ResponseBody | CampaignIdSource::Agnostic => None,
        };

        Some(DetectedMutation {
            event: pattern.spec.event,
            campaign_id,
            source: pattern.spec.campaign_id,
        })
    }
}

/// Classifies a request against the built-in pattern table
pub fn detect(method: &Method, url: &str) -> Option<DetectedMutation> {
    PatternTable::builtin().detect(method, url)
}

/// Strips query and fragment, reducing absolute URLs to their path
pub fn request_path(url: &str) -> Cow<'_, str> {
    if url.contains("://") {
        if let Ok(parsed) = url::Url::parse(url) {
            return Cow::Owned(parsed.path().to_string());
        }
    }

    let end = url.find(['?', '#']).unwrap_or(url.len());
    Cow::Borrowed(&url[..end])
}
