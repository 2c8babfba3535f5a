// src/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// 启动阶段的配置错误，出现即退出进程，不会产生任何流量
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("concurrency must be a positive integer, got {0}")]
    InvalidConcurrency(usize),

    #[error("{name} must be a probability in [0, 1], got {value}")]
    InvalidProbability { name: &'static str, value: f64 },

    #[error("invalid {name} range: [{min}, {max}]")]
    InvalidRange {
        name: &'static str,
        min: f64,
        max: f64,
    },

    #[error("{0} must be positive")]
    NotPositive(&'static str),

    #[error("{0} must not be empty")]
    EmptyChoices(&'static str),

    #[error("invalid target url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to build http client: {0}")]
    HttpClient(String),
}

/// 竞价引擎拒绝处理的请求（格式不完整）
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecisionError {
    #[error("bid request {request_id} has no impressions")]
    NoImpressions { request_id: String },

    #[error("impression {imp_id} has no bidfloor")]
    MissingBidFloor { imp_id: String },

    #[error("impression {imp_id} has an invalid bidfloor {floor}")]
    InvalidBidFloor { imp_id: String, floor: f64 },

    #[error("impression {imp_id} has no banner")]
    MissingBanner { imp_id: String },
}

/// 发送单个竞价请求时的传输层错误，只计数、不重试
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("transport error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Other(err.to_string())
        }
    }
}

/// 竞价接口的错误响应
#[derive(Error, Debug)]
pub enum ApiError {
    /// 请求体不是合法的 BidRequest JSON
    #[error("malformed bid request: {0}")]
    Decode(String),

    /// JSON 合法但缺少竞价必需字段
    #[error(transparent)]
    Malformed(#[from] DecisionError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error_type = match &self {
            ApiError::Decode(_) => "decode_error",
            ApiError::Malformed(_) => "malformed_request",
        };
        tracing::debug!(error = %self, "rejecting bid request");

        let body = Json(json!({
            "error": {
                "message": self.to_string(),
                "type": error_type,
            }
        }));

        (StatusCode::BAD_REQUEST, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_map_to_bad_request() {
        let decode = ApiError::Decode("eof".to_string()).into_response();
        assert_eq!(decode.status(), StatusCode::BAD_REQUEST);

        let malformed = ApiError::from(DecisionError::NoImpressions {
            request_id: "r".to_string(),
        })
        .into_response();
        assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn config_error_messages_name_the_field() {
        let err = ConfigError::InvalidProbability {
            name: "bid_rate",
            value: 1.5,
        };
        assert_eq!(err.to_string(), "bid_rate must be a probability in [0, 1], got 1.5");
    }
}
