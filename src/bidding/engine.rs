// src/bidding/engine.rs

use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;
use serde_json::json;

use crate::config::BidderConfig;
use crate::error::{ConfigError, DecisionError};
use crate::openrtb::request::{Banner, BidRequest, Imp};
use crate::openrtb::response::{Bid, BidResponse, NoBidResponse, SeatBid};
use crate::openrtb::{filler, round_cents};

/// OpenRTB no-bid reason code，mock bidder 固定返回 2
pub const NO_BID_REASON: u32 = 2;

const AD_MARKUP: &str = "<html><body><h1>Ad Content</h1></body></html>";

/// 一次竞价决策的结果，每个请求有且只有一种
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Bid(BidResponse),
    NoBid(NoBidResponse),
}

impl Decision {
    pub fn request_id(&self) -> &str {
        match self {
            Decision::Bid(response) => &response.id,
            Decision::NoBid(response) => &response.id,
        }
    }

    pub fn is_bid(&self) -> bool {
        matches!(self, Decision::Bid(_))
    }

    /// 出价金额，不出价时为 None
    pub fn price(&self) -> Option<f64> {
        match self {
            Decision::Bid(response) => response.first_bid().map(|bid| bid.price),
            Decision::NoBid(_) => None,
        }
    }
}

/// 通过校验的竞价目标：第一个 imp 及其底价、尺寸
#[derive(Debug, Clone, Copy)]
pub struct BidTarget<'a> {
    pub imp: &'a Imp,
    pub floor: f64,
    pub banner: &'a Banner,
}

/// 校验请求是否具备竞价所需的字段，不做任何默认值填充
pub fn validate(request: &BidRequest) -> Result<BidTarget<'_>, DecisionError> {
    let imp = request
        .first_imp()
        .ok_or_else(|| DecisionError::NoImpressions {
            request_id: request.id.clone(),
        })?;
    let floor = imp.bidfloor.ok_or_else(|| DecisionError::MissingBidFloor {
        imp_id: imp.id.clone(),
    })?;
    if !floor.is_finite() || floor <= 0.0 {
        return Err(DecisionError::InvalidBidFloor {
            imp_id: imp.id.clone(),
            floor,
        });
    }
    let banner = imp.banner.as_ref().ok_or_else(|| DecisionError::MissingBanner {
        imp_id: imp.id.clone(),
    })?;
    Ok(BidTarget { imp, floor, banner })
}

/// 底价加价：floor × multiplier，保留两位小数。
/// 四舍五入后若越出 (floor, floor × max_multiplier]，则使用未取整的值。
pub fn mark_up(floor: f64, multiplier: f64, max_multiplier: f64) -> f64 {
    let raw = floor * multiplier;
    let rounded = round_cents(raw);
    if rounded > floor && rounded <= floor * max_multiplier {
        rounded
    } else {
        raw
    }
}

/// **竞价决策引擎**
///
/// 除了调用计数外没有任何跨请求状态，随机数由调用方注入。
#[derive(Debug)]
pub struct BidDecisionEngine {
    config: BidderConfig,
    invocations: AtomicU64,
}

impl BidDecisionEngine {
    pub fn new(config: BidderConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            invocations: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &BidderConfig {
        &self.config
    }

    /// `decide` 被调用的次数
    pub fn invocations(&self) -> u64 {
        self.invocations.load(Ordering::Relaxed)
    }

    /// 按 bid_rate 抛硬币，决定出价或不出价
    pub fn decide<R: Rng>(&self, request: &BidRequest, rng: &mut R) -> Result<Decision, DecisionError> {
        self.invocations.fetch_add(1, Ordering::Relaxed);
        let target = validate(request)?;

        if rng.gen::<f64>() < self.config.bid_rate {
            Ok(Decision::Bid(self.build_bid(request, target, rng)))
        } else {
            Ok(Decision::NoBid(NoBidResponse {
                id: request.id.clone(),
                nbr: NO_BID_REASON,
            }))
        }
    }

    fn build_bid<R: Rng>(&self, request: &BidRequest, target: BidTarget<'_>, rng: &mut R) -> BidResponse {
        let multiplier = self.config.price_multiplier;
        let price = mark_up(
            target.floor,
            rng.gen_range(multiplier.min..=multiplier.max),
            multiplier.max,
        );

        let bid = Bid {
            id: format!("bid_{}", target.imp.id),
            impid: target.imp.id.clone(),
            price,
            adid: format!("ad_{}", rng.gen_range(1000..=9999)),
            adm: AD_MARKUP.to_string(),
            crid: format!("creative_{}", rng.gen_range(100..=999)),
            w: target.banner.w,
            h: target.banner.h,
        };

        let ext = (self.config.response_filler_bytes > 0)
            .then(|| json!({ "filler": filler(self.config.response_filler_bytes) }));

        BidResponse {
            id: request.id.clone(),
            seatbid: vec![SeatBid {
                bid: vec![bid],
                seat: None,
            }],
            cur: Some(self.config.currency.clone()),
            ext,
        }
    }
}
