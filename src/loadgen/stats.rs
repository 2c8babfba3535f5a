// src/loadgen/stats.rs

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Local};
use reqwest::StatusCode;

use crate::error::TransportError;

/// 单个请求的结果：拿到 HTTP 状态码，或者传输层失败
pub type RequestOutcome = Result<StatusCode, TransportError>;

/// 一次发送尝试（无论成功失败都算一次）
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    pub outcome: RequestOutcome,
    pub latency: Duration,
}

/// **压测统计**
///
/// 只由驱动任务在整批请求 join 之后更新，不需要加锁。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStatistics {
    pub total: u64,
    pub batches: u64,
    /// 2xx（204 除外）
    pub ok: u64,
    /// 204 不出价
    pub no_bid: u64,
    pub http_errors: u64,
    pub timeouts: u64,
    pub transport_errors: u64,
    pub elapsed: Duration,
    latency_sum: Duration,
    pub latency_max: Duration,
}

impl RunStatistics {
    pub fn record(&mut self, attempt: &Attempt) {
        self.total += 1;
        match &attempt.outcome {
            Ok(StatusCode::NO_CONTENT) => self.no_bid += 1,
            Ok(status) if status.is_success() => self.ok += 1,
            Ok(_) => self.http_errors += 1,
            Err(TransportError::Timeout) => self.timeouts += 1,
            Err(_) => self.transport_errors += 1,
        }
        self.latency_sum += attempt.latency;
        self.latency_max = self.latency_max.max(attempt.latency);
    }

    /// 失败的请求数（非 2xx、超时、连接失败）
    pub fn failed(&self) -> u64 {
        self.http_errors + self.timeouts + self.transport_errors
    }

    pub fn mean_latency(&self) -> Duration {
        if self.total == 0 {
            return Duration::ZERO;
        }
        let nanos = self.latency_sum.as_nanos() / u128::from(self.total);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    /// 平均 QPS = total / elapsed
    pub fn qps(&self) -> f64 {
        qps(self.total, self.elapsed)
    }
}

impl fmt::Display for RunStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Total: {} requests in {:.2}s, Avg QPS: {:.2} (ok: {}, no-bid: {}, http errors: {}, timeouts: {}, transport errors: {}, mean latency: {:.1}ms, max latency: {:.1}ms)",
            self.total,
            self.elapsed.as_secs_f64(),
            self.qps(),
            self.ok,
            self.no_bid,
            self.http_errors,
            self.timeouts,
            self.transport_errors,
            self.mean_latency().as_secs_f64() * 1000.0,
            self.latency_max.as_secs_f64() * 1000.0,
        )
    }
}

pub(crate) fn qps(total: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        total as f64 / secs
    } else {
        0.0
    }
}

/// 累计数从 before 增加到 after 时，是否跨过了 every 的整数倍
pub(crate) fn crossed_boundary(before: u64, after: u64, every: u64) -> bool {
    every > 0 && after / every > before / every
}

/// 周期性进度报告
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressReport {
    pub at: DateTime<Local>,
    pub total: u64,
    pub elapsed: Duration,
    pub qps: f64,
}

impl fmt::Display for ProgressReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] Sent: {}, QPS: {:.2}", self.at, self.total, self.qps)
    }
}
