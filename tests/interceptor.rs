use std::sync::Arc;

use campaign_cache::{
    domain::{CacheKind::*, CacheKinds, MutationEvent},
    interceptor::{Exchange, ResponseInterceptor},
    invalidator::InvalidatorHandle,
    rules::{RuleMap, rule_for},
};
use http::{Method, StatusCode};
use serde_json::{Value, json};

mod common;
use common::{RecordingInvalidator, SpySink, campaign};

fn interceptor() -> (ResponseInterceptor, SpySink) {
    let sink = SpySink::default();
    let handle = InvalidatorHandle::new();
    handle.register(RecordingInvalidator::new());
    (ResponseInterceptor::new(Arc::new(sink.clone()), handle), sink)
}

fn exchange<'a>(
    method: &'a Method,
    url: &'a str,
    status: u16,
    request_body: Option<&'a Value>,
    response_body: Option<&'a Value>,
) -> Exchange<'a> {
    Exchange {
        method,
        url,
        status: StatusCode::from_u16(status).unwrap(),
        request_body,
        response_body,
    }
}

#[test]
fn call_result_without_reschedule() {
    let (interceptor, sink) = interceptor();
    let body = json!({ "resultado": "NO_CONTESTA", "fechaReagendamiento": null });

    let scheduled = interceptor
        .on_response(&exchange(
            &Method::POST,
            "/campanias-telefonicas/42/llamadas/resultado",
            200,
            Some(&body),
            None,
        ))
        .unwrap();

    assert_eq!(scheduled.event, MutationEvent::CallResultRegistered);
    assert_eq!(
        sink.calls(),
        vec![(
            Some(campaign(42)),
            CacheKinds::of(&[Queue, Leads, History, DailyMetrics, CampaignMetrics]),
            false
        )]
    );
}

#[test]
fn call_result_with_reschedule_adds_scheduled_calls() {
    let (interceptor, sink) = interceptor();
    let body = json!({ "resultado": "VOLVER_A_LLAMAR", "fechaReagendamiento": "2026-10-21T09:30:00" });

    interceptor.on_response(&exchange(
        &Method::POST,
        "/campanias-telefonicas/42/llamadas/resultado",
        200,
        Some(&body),
        None,
    ));

    let (_, kinds, _) = sink.calls()[0];
    assert!(kinds.contains(ScheduledCalls.into()));
    assert_eq!(kinds.kinds().count(), 6);
}

#[test]
fn call_result_with_unknown_body_assumes_reschedule() {
    let (interceptor, sink) = interceptor();

    interceptor.on_response(&exchange(
        &Method::POST,
        "/campanias-telefonicas/42/llamadas/resultado",
        200,
        None,
        None,
    ));

    let (_, kinds, _) = sink.calls()[0];
    assert_eq!(kinds, rule_for(MutationEvent::CallResultRegistered).all_kinds());
}

#[test]
fn campaign_creation_only_touches_global_list() {
    let (interceptor, sink) = interceptor();
    let response = json!({ "data": { "idCampania": 77 } });

    interceptor.on_response(&exchange(
        &Method::POST,
        "/campanias-telefonicas",
        201,
        None,
        Some(&response),
    ));

    assert_eq!(sink.calls(), vec![(None, CacheKinds::empty(), true)]);
}

#[test]
fn recording_deletion_schedules_nothing_to_invalidate() {
    let (interceptor, sink) = interceptor();

    let scheduled = interceptor
        .on_response(&exchange(&Method::DELETE, "/grabaciones/301", 204, None, None))
        .unwrap();

    assert!(scheduled.kinds.is_empty());
    assert!(!scheduled.affects_global_list);
    // the sink sees the empty request and ignores it
    assert_eq!(sink.calls(), vec![(None, CacheKinds::empty(), false)]);
}

#[test]
fn script_update_invalidates_content_for_every_campaign() {
    let (interceptor, sink) = interceptor();
    // a response id must not narrow a campaign-agnostic event
    let response = json!({ "data": { "idCampania": 3 } });

    interceptor.on_response(&exchange(&Method::PUT, "/guiones/14", 200, None, Some(&response)));

    assert_eq!(sink.calls(), vec![(None, CacheKinds::of(&[ScriptContent]), false)]);
}

#[test]
fn failed_writes_are_ignored() {
    let (interceptor, sink) = interceptor();

    for status in [400, 404, 409, 500, 503] {
        let scheduled = interceptor.on_response(&exchange(
            &Method::POST,
            "/campanias-telefonicas/42/llamadas/resultado",
            status,
            None,
            None,
        ));
        assert_eq!(scheduled, None, "status {status}");
    }

    assert!(sink.calls().is_empty());
}

#[test]
fn reads_are_ignored() {
    let (interceptor, sink) = interceptor();

    interceptor.on_response(&exchange(&Method::GET, "/campanias-telefonicas/42/cola", 200, None, None));

    assert!(sink.calls().is_empty());
}

#[test]
fn urgent_contact_takes_campaign_from_response() {
    let (interceptor, sink) = interceptor();
    let response = json!({ "data": { "idCampania": "18", "idContacto": 5001 } });

    interceptor.on_response(&exchange(
        &Method::POST,
        "/public/v1/campanias-telefonicas/cola/urgente",
        201,
        Some(&json!({ "telefono": "+56911111111" })),
        Some(&response),
    ));

    assert_eq!(
        sink.calls(),
        vec![(Some(campaign(18)), CacheKinds::of(&[Queue, Leads]), false)]
    );
}

#[test]
fn urgent_contact_without_id_falls_back_to_every_campaign() {
    let (interceptor, sink) = interceptor();

    interceptor.on_response(&exchange(
        &Method::POST,
        "/public/v1/campanias-telefonicas/cola/urgente",
        201,
        None,
        Some(&json!({ "ok": true })),
    ));

    assert_eq!(sink.calls(), vec![(None, CacheKinds::of(&[Queue, Leads]), false)]);
}

#[test]
fn custom_campaign_id_pointer() {
    let sink = SpySink::default();
    let handle = InvalidatorHandle::new();
    handle.register(RecordingInvalidator::new());
    let interceptor = ResponseInterceptor::new(Arc::new(sink.clone()), handle)
        .with_campaign_id_pointer("/campaign/id");

    interceptor.on_response(&exchange(
        &Method::POST,
        "/public/v1/campanias-telefonicas/cola/urgente",
        200,
        None,
        Some(&json!({ "campaign": { "id": 9 } })),
    ));

    assert_eq!(sink.calls()[0].0, Some(campaign(9)));
}

#[test]
fn unregistered_invalidator_skips_without_panicking() {
    let sink = SpySink::default();
    let interceptor = ResponseInterceptor::new(Arc::new(sink.clone()), InvalidatorHandle::new())
        .with_dev_mode(true);

    let scheduled = interceptor.on_response(&exchange(
        &Method::POST,
        "/campanias-telefonicas/5/pausar-cola",
        200,
        None,
        None,
    ));

    assert_eq!(scheduled, None);
    assert!(sink.calls().is_empty());
}

#[test]
fn missing_rule_is_skipped_outside_dev_mode() {
    let sink = SpySink::default();
    let handle = InvalidatorHandle::new();
    handle.register(RecordingInvalidator::new());
    let interceptor = ResponseInterceptor::new(Arc::new(sink.clone()), handle)
        .with_rules(RuleMap::from_rules([rule_for(MutationEvent::ContactTaken)]));

    let scheduled = interceptor.on_response(&exchange(
        &Method::PUT,
        "/campanias-telefonicas/3/config",
        200,
        None,
        None,
    ));
    assert_eq!(scheduled, None);

    interceptor.on_response(&exchange(
        &Method::POST,
        "/campanias-telefonicas/3/cola/siguiente",
        200,
        None,
        None,
    ));
    assert_eq!(
        sink.calls(),
        vec![(Some(campaign(3)), CacheKinds::of(&[Queue, Leads, DailyMetrics]), false)]
    );
}

#[test]
#[should_panic(expected = "no invalidation rule")]
fn missing_rule_panics_in_dev_mode() {
    let sink = SpySink::default();
    let handle = InvalidatorHandle::new();
    handle.register(RecordingInvalidator::new());
    let interceptor = ResponseInterceptor::new(Arc::new(sink), handle)
        .with_rules(RuleMap::from_rules([]))
        .with_dev_mode(true);

    interceptor.on_response(&exchange(&Method::PUT, "/guiones/14", 200, None, None));
}
