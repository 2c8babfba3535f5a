// src/main.rs

use std::sync::Arc;

use axum::serve;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use rust_rtb_sim::bidding::BidDecisionEngine;
use rust_rtb_sim::config::{BidderConfig, LatencyRange, PriceRange, DEFAULT_MAX_BODY_BYTES};
use rust_rtb_sim::logging::bid_log::BidLog;
use rust_rtb_sim::logging::init_tracing;
use rust_rtb_sim::mock_bidder::router;
use rust_rtb_sim::AppState;

#[derive(Parser, Debug)]
#[command(author = "whiteCcinn", version = "1.0", about = "A mock OpenRTB bidder for load testing")]
struct CliArgs {
    #[arg(long, env = "RTB_HOST", default_value = "0.0.0.0")]
    host: String,
    #[arg(short, long, env = "RTB_PORT", default_value_t = 8080)]
    port: u16,
    /// 出价概率 [0, 1]
    #[arg(long, env = "RTB_BID_RATE", default_value_t = 0.7)]
    bid_rate: f64,
    #[arg(long, env = "RTB_MULTIPLIER_MIN", default_value_t = 1.1)]
    multiplier_min: f64,
    #[arg(long, env = "RTB_MULTIPLIER_MAX", default_value_t = 2.0)]
    multiplier_max: f64,
    #[arg(long, env = "RTB_RESPONSE_FILLER_BYTES", default_value_t = 0)]
    response_filler_bytes: usize,
    #[arg(long, env = "RTB_LATENCY_MIN_MS", default_value_t = 0)]
    latency_min_ms: u64,
    #[arg(long, env = "RTB_LATENCY_MAX_MS", default_value_t = 0)]
    latency_max_ms: u64,
    /// 请求体大小上限（字节）
    #[arg(long, env = "RTB_MAX_BODY_BYTES", default_value_t = DEFAULT_MAX_BODY_BYTES)]
    max_body_bytes: usize,
    /// 运行日志目录，不指定则只输出到控制台
    #[arg(long, env = "RTB_LOG_DIR")]
    log_dir: Option<String>,
    /// 竞价日志目录，不指定则不记录
    #[arg(long, env = "RTB_BID_LOG_DIR")]
    bid_log_dir: Option<String>,
}

impl CliArgs {
    fn bidder_config(&self) -> BidderConfig {
        BidderConfig {
            bid_rate: self.bid_rate,
            price_multiplier: PriceRange::new(self.multiplier_min, self.multiplier_max),
            response_filler_bytes: self.response_filler_bytes,
            latency: LatencyRange {
                min_ms: self.latency_min_ms,
                max_ms: self.latency_max_ms,
            },
            max_body_bytes: self.max_body_bytes,
            ..Default::default()
        }
    }
}

async fn shutdown_signal() {
    if signal::ctrl_c().await.is_ok() {
        info!("Shutting down gracefully...");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    let _guard = init_tracing(args.log_dir.as_deref(), "mock_bidder.json")?;

    // 配置错误在监听端口之前直接退出
    let engine = BidDecisionEngine::new(args.bidder_config())?;
    info!(config = ?engine.config(), "bidder configured");

    let mut state = AppState::new(engine);
    let bid_log = args
        .bid_log_dir
        .as_deref()
        .map(|dir| BidLog::new(dir, 10_000, 1000, 1000));
    if let Some(bid_log) = &bid_log {
        state = state.with_bid_log(bid_log.clone());
    }

    let addr = format!("{}:{}", args.host, args.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Mock bidder running at http://{}", addr);

    serve(listener, router(Arc::new(state)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(bid_log) = bid_log {
        bid_log.shutdown().await;
        info!(dropped = bid_log.dropped(), "bid log flushed");
    }
    info!("Mock bidder shut down.");
    Ok(())
}
