// Integration tests for the mock bidder HTTP surface
//
// Requests go straight through the axum router with `tower::ServiceExt::oneshot`,
// no sockets involved.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Value};
use tower::ServiceExt;

use rust_rtb_sim::api::handlers::NBR_HEADER;
use rust_rtb_sim::bidding::{BidDecisionEngine, NO_BID_REASON};
use rust_rtb_sim::config::{BidderConfig, RequestTemplate};
use rust_rtb_sim::loadgen::RequestSynthesizer;
use rust_rtb_sim::mock_bidder::router;
use rust_rtb_sim::openrtb::response::BidResponse;
use rust_rtb_sim::AppState;

// ==================================================================================================
// Test Helpers
// ==================================================================================================

fn create_test_app(bid_rate: f64) -> (Router, Arc<AppState>) {
    let engine = BidDecisionEngine::new(BidderConfig {
        bid_rate,
        ..Default::default()
    })
    .expect("valid bidder config");
    let state = Arc::new(AppState::new(engine));
    (router(state.clone()), state)
}

fn bid_request_json(floor: f64) -> Value {
    json!({
        "id": "req-123",
        "imp": [{
            "id": "imp-1",
            "bidfloor": floor,
            "bidfloorcur": "USD",
            "banner": {"w": 300, "h": 250, "mimes": "text/html"}
        }],
        "device": {"os": "Android"},
        "tmax": 51,
        "cur": ["USD"]
    })
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app.oneshot(request).await.expect("router never fails");
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body")
        .to_vec();
    (status, headers, body)
}

fn post(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

// ==================================================================================================
// Liveness
// ==================================================================================================

#[tokio::test]
async fn test_health_returns_fixed_body() {
    let (app, _) = create_test_app(0.7);
    let (status, _, body) = send(app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_get_bid_is_a_liveness_echo() {
    let (app, state) = create_test_app(0.7);
    let (status, _, _) = send(app, get("/bid")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(state.engine.invocations(), 0);
}

// ==================================================================================================
// Decisions
// ==================================================================================================

#[tokio::test]
async fn test_forced_bid_rate_always_bids_with_marked_up_price() {
    let (app, _) = create_test_app(1.0);

    for _ in 0..200 {
        let (status, _, body) =
            send(app.clone(), post("/bid", bid_request_json(2.50).to_string())).await;
        assert_eq!(status, StatusCode::OK);

        let response: BidResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(response.id, "req-123");
        assert_eq!(response.cur.as_deref(), Some("USD"));
        let bid = response.first_bid().unwrap();
        assert_eq!(bid.impid, "imp-1");
        assert_eq!((bid.w, bid.h), (300, 250));
        assert!((2.75..=5.00).contains(&bid.price), "price {}", bid.price);
    }
}

#[tokio::test]
async fn test_zero_bid_rate_always_returns_no_content() {
    let (app, state) = create_test_app(0.0);

    for _ in 0..500 {
        let (status, headers, body) =
            send(app.clone(), post("/bid", bid_request_json(1.0).to_string())).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(headers[NBR_HEADER], NO_BID_REASON.to_string().as_str());

        // 204 的 body 不保证存在，存在时必须是 {id, nbr}
        if !body.is_empty() {
            let no_bid: Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(no_bid, json!({"id": "req-123", "nbr": 2}));
        }
    }
    assert_eq!(state.engine.invocations(), 500);
}

#[tokio::test]
async fn test_synthesized_requests_are_accepted() {
    let (app, state) = create_test_app(1.0);
    let synth = RequestSynthesizer::new(RequestTemplate {
        filler_bytes: 2048,
        ..Default::default()
    })
    .unwrap();
    let mut rng = StdRng::seed_from_u64(17);

    for _ in 0..50 {
        let request = synth.synthesize(&mut rng);
        let floor = request.imp[0].bidfloor.unwrap();
        let body = serde_json::to_vec(&request).unwrap();
        let (status, _, body) = send(app.clone(), post("/bid", body)).await;
        assert_eq!(status, StatusCode::OK);

        let response: BidResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(response.id, request.id);
        let bid = response.first_bid().unwrap();
        assert!(bid.price > floor && bid.price <= floor * 2.0);
        assert_eq!((bid.w, bid.h), (1767, 1092));
    }
    assert_eq!(state.engine.invocations(), 50);
}

#[tokio::test]
async fn test_multi_megabyte_requests_fit_under_the_body_limit() {
    let (app, state) = create_test_app(1.0);
    let synth = RequestSynthesizer::new(RequestTemplate {
        filler_bytes: 3 * 1024 * 1024,
        ..Default::default()
    })
    .unwrap();
    let request = synth.synthesize(&mut StdRng::seed_from_u64(5));

    let (status, _, body) = send(app, post("/bid", serde_json::to_vec(&request).unwrap())).await;

    assert_eq!(status, StatusCode::OK);
    let response: BidResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(response.id, request.id);
    assert_eq!(state.engine.invocations(), 1);
}

#[tokio::test]
async fn test_body_limit_is_configurable() {
    let engine = BidDecisionEngine::new(BidderConfig {
        bid_rate: 1.0,
        max_body_bytes: 1024,
        ..Default::default()
    })
    .unwrap();
    let state = Arc::new(AppState::new(engine));
    let app = router(state.clone());
    let synth = RequestSynthesizer::new(RequestTemplate {
        filler_bytes: 4096,
        ..Default::default()
    })
    .unwrap();
    let request = synth.synthesize(&mut StdRng::seed_from_u64(6));

    let (status, _, _) = send(app, post("/bid", serde_json::to_vec(&request).unwrap())).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(state.engine.invocations(), 0);
}

// ==================================================================================================
// Malformed input
// ==================================================================================================

#[tokio::test]
async fn test_missing_imp_is_rejected_before_decision() {
    let (app, state) = create_test_app(1.0);
    let body = json!({"id": "req-123", "tmax": 51}).to_string();

    let (status, _, body) = send(app, post("/bid", body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(error["error"]["type"], "decode_error");
    assert_eq!(state.engine.invocations(), 0);
}

#[tokio::test]
async fn test_incomplete_impressions_are_rejected_before_decision() {
    let (app, state) = create_test_app(1.0);
    let cases = [
        json!({"id": "r", "imp": []}),
        json!({"id": "r", "imp": [{"id": "i", "banner": {"w": 1, "h": 1}}]}),
        json!({"id": "r", "imp": [{"id": "i", "bidfloor": -1.0, "banner": {"w": 1, "h": 1}}]}),
        json!({"id": "r", "imp": [{"id": "i", "bidfloor": 1.0}]}),
    ];

    for case in cases {
        let (status, _, body) = send(app.clone(), post("/bid", case.to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "case {case}");
        let error: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(error["error"]["type"], "malformed_request");
    }
    assert_eq!(state.engine.invocations(), 0);
}

#[tokio::test]
async fn test_invalid_json_is_a_client_error() {
    let (app, state) = create_test_app(1.0);
    let (status, _, _) = send(app, post("/bid", "{not json")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(state.engine.invocations(), 0);
}

// ==================================================================================================
// Non-auction traffic
// ==================================================================================================

#[tokio::test]
async fn test_no_rtb_echoes_without_deciding() {
    let (app, state) = create_test_app(1.0);
    let (status, _, body) = send(app, post("/no_rtb", "anything at all")).await;

    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body, json!({"result": "success"}));
    assert_eq!(state.engine.invocations(), 0);
}

#[tokio::test]
async fn test_no_rtb_uses_response_filler() {
    let engine = BidDecisionEngine::new(BidderConfig {
        response_filler_bytes: 512,
        ..Default::default()
    })
    .unwrap();
    let app = router(Arc::new(AppState::new(engine)));

    let (_, _, body) = send(app, post("/no_rtb", "")).await;
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["result"].as_str().unwrap().len(), 512);
}
