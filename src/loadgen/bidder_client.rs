// src/loadgen/bidder_client.rs

use std::time::Instant;

use reqwest::Client;
use tokio::time::Duration;
use tracing::debug;

use crate::error::{ConfigError, TransportError};
use crate::loadgen::stats::Attempt;
use crate::openrtb::request::BidRequest;

/// 向被测竞价端点发送请求的 HTTP 客户端
///
/// `reqwest::Client` 内部是 Arc，clone 后在各个任务间共享同一个连接池。
#[derive(Clone, Debug)]
pub struct BidderClient {
    client: Client,
    url: String,
}

impl BidderClient {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// 发送一次请求并读完响应体，只尝试一次，不重试
    pub async fn send(&self, request: &BidRequest) -> Attempt {
        let start = Instant::now();
        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await;

        let outcome = match response {
            Ok(resp) => {
                let status = resp.status();
                // 读完 body，连接才能回到连接池
                match resp.bytes().await {
                    Ok(_) => Ok(status),
                    Err(e) => Err(TransportError::from(e)),
                }
            }
            Err(e) => Err(TransportError::from(e)),
        };

        if let Err(e) = &outcome {
            debug!(request_id = %request.id, error = %e, "bid request failed");
        }

        Attempt {
            outcome,
            latency: start.elapsed(),
        }
    }
}
