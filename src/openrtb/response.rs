use serde::{Deserialize, Serialize};
use serde_json::Value;

/// OpenRTB Bid Response
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BidResponse {
    pub id: String,
    pub seatbid: Vec<SeatBid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cur: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SeatBid {
    pub bid: Vec<Bid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seat: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Bid {
    pub id: String,
    pub impid: String,
    pub price: f64,
    pub adid: String,
    pub adm: String, // Ad markup (HTML or URL)
    pub crid: String,
    pub w: i32,
    pub h: i32,
}

/// 不出价响应，`nbr` 为 OpenRTB no-bid reason code
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NoBidResponse {
    pub id: String,
    pub nbr: u32,
}

impl BidResponse {
    /// 唯一的那一个 bid（mock bidder 只返回一个 seat / 一个 bid）
    pub fn first_bid(&self) -> Option<&Bid> {
        self.seatbid.first().and_then(|seat| seat.bid.first())
    }
}
