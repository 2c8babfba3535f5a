use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rand::Rng;
use serde_json::{json, Value};
use tokio::time::{sleep, Duration};
use tracing::debug;

use crate::bidding::engine::{self, Decision};
use crate::error::ApiError;
use crate::logging::bid_log::BidLogEntry;
use crate::openrtb::filler;
use crate::openrtb::request::BidRequest;
use crate::AppState;

/// 204 响应的 body 可能被 HTTP 层丢弃，no-bid reason 同时放在这个头里
pub const NBR_HEADER: &str = "x-openrtb-nbr";

/// 用 simd-json 解析请求体，并校验竞价必需字段
fn decode_bid_request(body: &Bytes) -> Result<BidRequest, ApiError> {
    let mut buf = body.to_vec();
    let request: BidRequest =
        simd_json::serde::from_slice(&mut buf).map_err(|e| ApiError::Decode(e.to_string()))?;
    engine::validate(&request)?;
    Ok(request)
}

/// **处理 OpenRTB 竞价请求**
///
/// Receive → Decode → Decide → Respond。解析或校验失败直接返回 400，
/// 不会进入竞价引擎。
pub async fn handle_bid_request(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let bid_request = decode_bid_request(&body)?;
    debug!(
        request_id = %bid_request.id,
        imp_count = bid_request.imp.len(),
        "bid request received"
    );

    // 模拟竞价处理延迟
    let latency = state.engine.config().latency;
    if !latency.is_zero() {
        let delay_ms = {
            let mut rng = rand::thread_rng();
            rng.gen_range(latency.min_ms..=latency.max_ms)
        };
        sleep(Duration::from_millis(delay_ms)).await;
    }

    let decision = {
        let mut rng = rand::thread_rng();
        state.engine.decide(&bid_request, &mut rng)?
    };

    if let Some(bid_log) = &state.bid_log {
        bid_log.record(BidLogEntry::from_decision(&decision));
    }

    let response = match decision {
        Decision::Bid(bid_response) => {
            debug!(
                request_id = %bid_response.id,
                price = bid_response.first_bid().map(|bid| bid.price),
                "response: bid"
            );
            (StatusCode::OK, Json(bid_response)).into_response()
        }
        Decision::NoBid(no_bid) => {
            debug!(request_id = %no_bid.id, nbr = no_bid.nbr, "response: no-bid");
            (
                StatusCode::NO_CONTENT,
                [(NBR_HEADER, no_bid.nbr.to_string())],
                Json(no_bid),
            )
                .into_response()
        }
    };
    Ok(response)
}

/// `GET /bid` 存活探测
pub async fn bid_liveness() -> (StatusCode, &'static str) {
    (StatusCode::OK, "bid endpoint is alive")
}

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `POST /no_rtb` 模拟非竞价流量，不解析请求、不做竞价决策
pub async fn handle_no_rtb(State(state): State<Arc<AppState>>, _body: Bytes) -> Json<Value> {
    let filler_bytes = state.engine.config().response_filler_bytes;
    let result = if filler_bytes > 0 {
        filler(filler_bytes)
    } else {
        "success".to_string()
    };
    Json(json!({ "result": result }))
}
