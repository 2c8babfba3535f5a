// src/openrtb/mod.rs

pub mod request;
pub mod response;

/// OpenRTB 中价格统一保留两位小数（CPM）
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// 浮点误差容忍，避免 0.07 * 100 = 7.000000000000001 被向上取到 8 分
const CENT_EPSILON: f64 = 1e-9;

/// 不小于 value 的最小整分金额
pub fn ceil_cents(value: f64) -> f64 {
    (value * 100.0 - CENT_EPSILON).ceil() / 100.0
}

/// 不大于 value 的最大整分金额
pub fn floor_cents(value: f64) -> f64 {
    (value * 100.0 + CENT_EPSILON).floor() / 100.0
}

/// 生成指定字节长度的填充字符串，用于模拟真实的请求/响应体积
pub fn filler(len: usize) -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    ALPHABET.iter().cycle().take(len).map(|&b| b as char).collect()
}
