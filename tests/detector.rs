use campaign_cache::{
    detector::{
        CampaignIdSource, MUTATION_PATTERNS, PatternSpec, PatternTable, detect,
    },
    domain::{CampaignId, MutationEvent},
};
use http::Method;

#[test]
fn classifies_every_known_endpoint() {
    let cases = [
        (Method::POST, "/campanias-telefonicas/12/cola/siguiente", MutationEvent::ContactTaken, Some(12)),
        (Method::POST, "/campanias-telefonicas/12/contactos/99/tomar", MutationEvent::ContactTaken, Some(12)),
        (Method::POST, "/campanias-telefonicas/42/llamadas/resultado", MutationEvent::CallResultRegistered, Some(42)),
        (Method::POST, "/campanias-telefonicas/5/pausar-cola", MutationEvent::QueueToggled, Some(5)),
        (Method::POST, "/campanias-telefonicas/5/reanudar-cola", MutationEvent::QueueToggled, Some(5)),
        (Method::POST, "/campanias-telefonicas/8/grabaciones", MutationEvent::RecordingUploaded, Some(8)),
        (Method::DELETE, "/grabaciones/301", MutationEvent::RecordingDeleted, None),
        (Method::POST, "/campanias-telefonicas", MutationEvent::CampaignCreated, None),
        (Method::PUT, "/campanias-telefonicas/3/config", MutationEvent::CampaignConfigUpdated, Some(3)),
        (Method::POST, "/campanias-telefonicas/3/vincular-guion", MutationEvent::ScriptLinked, Some(3)),
        (Method::POST, "/campanias-telefonicas/3/guiones/general", MutationEvent::ScriptLinked, Some(3)),
        (Method::PUT, "/guiones/14", MutationEvent::ScriptUpdated, None),
        (Method::POST, "/public/v1/campanias-telefonicas/cola/urgente", MutationEvent::UrgentContactAdded, None),
    ];

    for (method, url, event, campaign_id) in cases {
        let detected = detect(&method, url)
            .unwrap_or_else(|| panic!("{method} {url} should be a mutation"));
        assert_eq!(detected.event, event, "{method} {url}");
        assert_eq!(detected.campaign_id, campaign_id.map(CampaignId::new), "{method} {url}");
    }
}

#[test]
fn reads_and_unknown_writes_are_not_mutations() {
    let cases = [
        (Method::GET, "/campanias-telefonicas/12/cola"),
        (Method::GET, "/campanias-telefonicas"),
        (Method::GET, "/grabaciones/3/audio"),
        (Method::POST, "/leads/import"),
        (Method::PUT, "/campanias-telefonicas/3/config/extra"),
        (Method::DELETE, "/campanias-telefonicas/3"),
        (Method::PATCH, "/guiones/14"),
    ];

    for (method, url) in cases {
        assert_eq!(detect(&method, url), None, "{method} {url}");
    }
}

#[test]
fn matches_through_api_prefix_query_and_host() {
    let detected = detect(
        &Method::POST,
        "https://crm.example.com/api/v1/campanias-telefonicas/42/llamadas/resultado?draft=false",
    )
    .unwrap();
    assert_eq!(detected.event, MutationEvent::CallResultRegistered);
    assert_eq!(detected.campaign_id, Some(CampaignId::new(42)));

    let detected = detect(&Method::PUT, "/api/campanias-telefonicas/7/config?x=1").unwrap();
    assert_eq!(detected.campaign_id, Some(CampaignId::new(7)));
}

#[test]
fn campaign_agnostic_and_body_sourced_events_carry_no_id() {
    let script = detect(&Method::PUT, "/guiones/14").unwrap();
    assert_eq!(script.source, CampaignIdSource::Agnostic);
    assert_eq!(script.campaign_id, None);

    let urgent = detect(&Method::POST, "/public/v1/campanias-telefonicas/cola/urgente").unwrap();
    assert_eq!(urgent.source, CampaignIdSource::ResponseBody);
    assert_eq!(urgent.campaign_id, None);
}

#[test]
fn earlier_pattern_wins_on_overlap() {
    let specs = [
        PatternSpec {
            method: "POST",
            path: r"/campanias-telefonicas/(?P<campaign>\d+)/cola/siguiente$",
            event: MutationEvent::ContactTaken,
            campaign_id: CampaignIdSource::Path,
        },
        PatternSpec {
            method: "POST",
            path: r"/cola/siguiente$",
            event: MutationEvent::QueueToggled,
            campaign_id: CampaignIdSource::Agnostic,
        },
    ];

    let table = PatternTable::compile(&specs).unwrap();
    let detected = table
        .detect(&Method::POST, "/campanias-telefonicas/4/cola/siguiente")
        .unwrap();
    assert_eq!(detected.event, MutationEvent::ContactTaken);
    assert_eq!(detected.campaign_id, Some(CampaignId::new(4)));

    let reversed: Vec<_> = specs.iter().rev().copied().collect();
    let table = PatternTable::compile(&reversed).unwrap();
    let detected = table
        .detect(&Method::POST, "/campanias-telefonicas/4/cola/siguiente")
        .unwrap();
    assert_eq!(detected.event, MutationEvent::QueueToggled);
    assert_eq!(detected.campaign_id, None);
}

#[test]
fn builtin_table_is_inspectable_in_declaration_order() {
    let specs: Vec<_> = PatternTable::builtin().specs().map(|s| s.path).collect();
    let declared: Vec<_> = MUTATION_PATTERNS.iter().map(|s| s.path).collect();
    assert_eq!(specs, declared);
}
