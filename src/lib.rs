//! OpenRTB 压测工具：合成竞价流量的压测客户端 + 概率出价的 mock bidder

use std::sync::Arc;

pub mod api;
pub mod bidding;
pub mod config;
pub mod error;
pub mod loadgen;
pub mod logging;
pub mod mock_bidder;
pub mod openrtb;

use bidding::BidDecisionEngine;
use logging::bid_log::BidLog;

/// mock bidder 的共享状态
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<BidDecisionEngine>,
    pub bid_log: Option<Arc<BidLog>>,
}

impl AppState {
    pub fn new(engine: BidDecisionEngine) -> Self {
        Self {
            engine: Arc::new(engine),
            bid_log: None,
        }
    }

    pub fn with_bid_log(mut self, bid_log: Arc<BidLog>) -> Self {
        self.bid_log = Some(bid_log);
        self
    }
}
