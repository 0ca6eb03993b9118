use std::sync::Arc;

use quickpick_core::commit::{CommitPipeline, MockHost};
use quickpick_core::config::Config;
use quickpick_core::contract::{OverlayRequest, OverlayResponse, SlotRequest};
use quickpick_core::core_service::{InlineDispatch, OverlayService};
use quickpick_core::index_store::MemoryStore;
use quickpick_core::keymap::Variant;
use quickpick_core::model::Candidate;
use quickpick_core::output::{MockOutput, OutputChain};
use quickpick_core::transport::{handle_json, handle_request, ErrorCode, TransportResponse};

fn service_with_seed_item(variant: Variant) -> OverlayService {
    let store = Arc::new(MemoryStore::new(vec![Candidate::new(1, "Code review", "Review:")]));
    let host = Arc::new(MockHost::default());
    let pipeline = CommitPipeline::new(
        OutputChain::new(Box::new(MockOutput::new("mock"))),
        host.clone(),
        store.clone(),
    );
    OverlayService::new(
        Config::default(),
        variant,
        store,
        host,
        Box::new(InlineDispatch::new(Arc::new(pipeline))),
    )
    .unwrap()
}

fn parse(raw: &str) -> TransportResponse {
    serde_json::from_str(raw).unwrap()
}

#[test]
fn request_handler_returns_ok_transport_response() {
    let mut service = service_with_seed_item(Variant::List);

    let response = handle_request(&mut service, OverlayRequest::Show);

    match response {
        TransportResponse::Ok { response } => {
            assert!(matches!(response, OverlayResponse::Frame(_)));
            let encoded = serde_json::to_string(&TransportResponse::Ok { response }).unwrap();
            assert!(encoded.contains("\"status\":\"ok\""));
            assert!(encoded.contains("\"variant\":\"list\""));
        }
        _ => panic!("expected ok transport response"),
    }
}

#[test]
fn json_handler_returns_invalid_json_error_code() {
    let mut service = service_with_seed_item(Variant::List);

    match parse(&handle_json(&mut service, "{not-json")) {
        TransportResponse::Err { error } => assert_eq!(error.code, ErrorCode::InvalidJson),
        _ => panic!("expected invalid json error"),
    }
}

#[test]
fn json_handler_rejects_unknown_kind() {
    let mut service = service_with_seed_item(Variant::List);

    match parse(&handle_json(&mut service, r#"{"kind":"launch"}"#)) {
        TransportResponse::Err { error } => assert_eq!(error.code, ErrorCode::InvalidJson),
        _ => panic!("expected invalid json error"),
    }
}

#[test]
fn json_handler_returns_not_visible_error_code() {
    let mut service = service_with_seed_item(Variant::List);

    match parse(&handle_json(&mut service, r#"{"kind":"next"}"#)) {
        TransportResponse::Err { error } => assert_eq!(error.code, ErrorCode::NotVisible),
        _ => panic!("expected not visible error"),
    }
}

#[test]
fn json_handler_returns_invalid_request_error_code() {
    let mut service = service_with_seed_item(Variant::List);
    handle_json(&mut service, r#"{"kind":"show"}"#);

    match parse(&handle_json(&mut service, r#"{"kind":"next_page"}"#)) {
        TransportResponse::Err { error } => assert_eq!(error.code, ErrorCode::InvalidRequest),
        _ => panic!("expected invalid request error"),
    }
}

#[test]
fn json_handler_drives_grid_slot_selection() {
    let mut service = service_with_seed_item(Variant::Grid);
    handle_json(&mut service, r#"{"kind":"show"}"#);

    let request = OverlayRequest::SelectSlot(SlotRequest { slot: 0 });
    let raw = handle_json(&mut service, &serde_json::to_string(&request).unwrap());
    assert!(matches!(parse(&raw), TransportResponse::Ok { .. }));
    assert!(service.commit_in_flight());
}
