// src/loadgen/driver.rs

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::config::LoadConfig;
use crate::error::{ConfigError, TransportError};
use crate::loadgen::bidder_client::BidderClient;
use crate::loadgen::stats::{crossed_boundary, qps, Attempt, ProgressReport, RunStatistics};
use crate::loadgen::synthesizer::RequestSynthesizer;

/// 停止信号，在两批请求之间检查，不会打断在途请求
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// **压测驱动器**
///
/// 每批并发发出 `concurrency` 个请求，等整批完成后再发下一批，
/// 因此在途请求数严格不超过 `concurrency`。
pub struct LoadDriver {
    client: BidderClient,
    synthesizer: Arc<RequestSynthesizer>,
    concurrency: usize,
    duration: Duration,
    report_every: u64,
    stop: StopHandle,
}

impl LoadDriver {
    pub fn new(config: LoadConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let client = BidderClient::new(&config.target_url, config.request_timeout)?;
        let synthesizer = RequestSynthesizer::new(config.template)?;
        Ok(Self {
            client,
            synthesizer: Arc::new(synthesizer),
            concurrency: config.concurrency,
            duration: config.duration,
            report_every: config.report_every,
            stop: StopHandle::default(),
        })
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// 运行压测，进度写入 tracing 日志
    pub async fn run(&self) -> RunStatistics {
        self.run_with_progress(|report| info!(total = report.total, qps = report.qps, "{report}"))
            .await
    }

    /// 运行压测，每次累计数跨过 `report_every` 的整数倍时回调一次
    pub async fn run_with_progress<F>(&self, mut on_progress: F) -> RunStatistics
    where
        F: FnMut(&ProgressReport),
    {
        info!(
            url = self.client.url(),
            concurrency = self.concurrency,
            duration_secs = self.duration.as_secs_f64(),
            "starting load driver"
        );

        let start = Instant::now();
        let mut stats = RunStatistics::default();

        while !self.should_stop(start) {
            let attempts = self.dispatch_batch().await;

            let before = stats.total;
            for attempt in &attempts {
                stats.record(attempt);
            }
            stats.batches += 1;

            if crossed_boundary(before, stats.total, self.report_every) {
                let elapsed = start.elapsed();
                on_progress(&ProgressReport {
                    at: chrono::Local::now(),
                    total: stats.total,
                    elapsed,
                    qps: qps(stats.total, elapsed),
                });
            }
        }

        stats.elapsed = start.elapsed();
        info!(
            total = stats.total,
            batches = stats.batches,
            failed = stats.failed(),
            "{stats}"
        );
        stats
    }

    fn should_stop(&self, start: Instant) -> bool {
        if self.stop.is_stopped() {
            debug!("stop requested");
            return true;
        }
        !self.duration.is_zero() && start.elapsed() >= self.duration
    }

    /// 并发发出一整批请求，等待全部完成（成功、失败或超时）
    async fn dispatch_batch(&self) -> Vec<Attempt> {
        let tasks: Vec<_> = (0..self.concurrency)
            .map(|_| {
                let client = self.client.clone();
                let synthesizer = Arc::clone(&self.synthesizer);
                tokio::spawn(async move {
                    let request = {
                        let mut rng = rand::thread_rng();
                        synthesizer.synthesize(&mut rng)
                    };
                    client.send(&request).await
                })
            })
            .collect();

        join_all(tasks)
            .await
            .into_iter()
            .map(|joined| {
                joined.unwrap_or_else(|e| {
                    warn!(error = %e, "request task aborted");
                    Attempt {
                        outcome: Err(TransportError::Other(e.to_string())),
                        latency: Duration::ZERO,
                    }
                })
            })
            .collect()
    }
}
