// src/config/config_manager.rs

use std::time::Duration;

use crate::error::ConfigError;
use crate::openrtb::{ceil_cents, floor_cents};

/// 闭区间 [min, max]，用于底价区间和加价倍数区间
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    fn validate(&self, name: &'static str, lower_bound: f64) -> Result<(), ConfigError> {
        let ok = self.min.is_finite()
            && self.max.is_finite()
            && self.min > lower_bound
            && self.min <= self.max;
        if ok {
            Ok(())
        } else {
            Err(ConfigError::InvalidRange {
                name,
                min: self.min,
                max: self.max,
            })
        }
    }
}

/// mock bidder 模拟处理耗时（毫秒），min == max 时为固定延迟
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LatencyRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl LatencyRange {
    pub const fn fixed(ms: u64) -> Self {
        Self { min_ms: ms, max_ms: ms }
    }

    pub fn is_zero(&self) -> bool {
        self.max_ms == 0
    }
}

/// **Mock bidder 配置**
#[derive(Clone, Debug, PartialEq)]
pub struct BidderConfig {
    /// 出价概率，[0, 1]
    pub bid_rate: f64,
    /// 出价 = 底价 × 该区间内的随机倍数
    pub price_multiplier: PriceRange,
    /// 响应中附带的填充字节数，0 表示不填充
    pub response_filler_bytes: usize,
    /// 模拟处理延迟
    pub latency: LatencyRange,
    pub currency: String,
    /// 请求体大小上限（字节），需要覆盖压测客户端的填充大小
    pub max_body_bytes: usize,
}

/// 默认请求体上限 64 MiB，远大于常见的填充压测负载
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

impl Default for BidderConfig {
    fn default() -> Self {
        Self {
            bid_rate: 0.7,
            price_multiplier: PriceRange::new(1.1, 2.0),
            response_filler_bytes: 0,
            latency: LatencyRange::default(),
            currency: "USD".to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl BidderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.bid_rate) {
            return Err(ConfigError::InvalidProbability {
                name: "bid_rate",
                value: self.bid_rate,
            });
        }
        // 倍数下限必须大于 1，才能保证出价严格高于底价
        self.price_multiplier.validate("price_multiplier", 1.0)?;
        if self.max_body_bytes == 0 {
            return Err(ConfigError::NotPositive("max_body_bytes"));
        }
        if self.latency.min_ms > self.latency.max_ms {
            return Err(ConfigError::InvalidRange {
                name: "latency_ms",
                min: self.latency.min_ms as f64,
                max: self.latency.max_ms as f64,
            });
        }
        Ok(())
    }
}

/// **请求模板**
///
/// 所有合成请求共用的字段取值，可逐项覆盖。
#[derive(Clone, Debug, PartialEq)]
pub struct RequestTemplate {
    pub floor: PriceRange,
    pub currency: String,
    pub banner_w: i32,
    pub banner_h: i32,
    pub tmax: u64,
    pub os_choices: Vec<String>,
    pub country_choices: Vec<String>,
    pub gender_choices: Vec<String>,
    pub yob_range: (i32, i32),
    pub site_domain: String,
    pub badv: Vec<String>,
    pub bcat: Vec<String>,
    /// `ext.filler` 的字节数，0 表示不附带
    pub filler_bytes: usize,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for RequestTemplate {
    fn default() -> Self {
        Self {
            floor: PriceRange::new(1.0, 5.0),
            currency: "USD".to_string(),
            banner_w: 1767,
            banner_h: 1092,
            tmax: 51,
            os_choices: strings(&["iOS", "Android", "Web"]),
            country_choices: strings(&["USA", "CA", "CN", "UA", "JP", "SIN"]),
            gender_choices: strings(&["F", "M"]),
            yob_range: (1960, 2000),
            site_domain: "example.com".to_string(),
            badv: strings(&["facebook.com", "twitter.com", "google.com", "amazon.com", "youtube.com"]),
            bcat: strings(&[
                "12", "143", "34", "887", "122", "999", "1023", "13", "4", "565", "920", "224",
                "857", "1320",
            ]),
            filler_bytes: 0,
        }
    }
}

impl RequestTemplate {
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 底价最低 0.01，且区间内至少包含一个整分金额
        self.floor.validate("floor", 0.0)?;
        if self.floor.min < 0.01 || ceil_cents(self.floor.min) > floor_cents(self.floor.max) {
            return Err(ConfigError::InvalidRange {
                name: "floor",
                min: self.floor.min,
                max: self.floor.max,
            });
        }
        if self.os_choices.is_empty() {
            return Err(ConfigError::EmptyChoices("os_choices"));
        }
        if self.country_choices.is_empty() {
            return Err(ConfigError::EmptyChoices("country_choices"));
        }
        if self.gender_choices.is_empty() {
            return Err(ConfigError::EmptyChoices("gender_choices"));
        }
        if self.yob_range.0 > self.yob_range.1 {
            return Err(ConfigError::InvalidRange {
                name: "yob",
                min: self.yob_range.0 as f64,
                max: self.yob_range.1 as f64,
            });
        }
        Ok(())
    }
}

/// **压测客户端配置**
#[derive(Clone, Debug, PartialEq)]
pub struct LoadConfig {
    pub target_url: String,
    /// 每批并发请求数，同时也是在途请求上限
    pub concurrency: usize,
    /// 运行时长，0 表示一直运行直到被停止
    pub duration: Duration,
    pub request_timeout: Duration,
    /// 累计请求数每跨过该值的整数倍时输出一次进度
    pub report_every: u64,
    pub template: RequestTemplate,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            target_url: "http://localhost:8080/bid".to_string(),
            concurrency: 10,
            duration: Duration::ZERO,
            request_timeout: Duration::from_secs(2),
            report_every: 100,
            template: RequestTemplate::default(),
        }
    }
}

impl LoadConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency(self.concurrency));
        }
        let url = reqwest::Url::parse(&self.target_url).map_err(|e| ConfigError::InvalidUrl {
            url: self.target_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl {
                url: self.target_url.clone(),
                reason: format!("unsupported scheme {}", url.scheme()),
            });
        }
        if self.report_every == 0 {
            return Err(ConfigError::NotPositive("report_every"));
        }
        self.template.validate()
    }
}
