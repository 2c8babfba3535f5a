// src/bin/rtb_client.rs

use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tracing::info;

use rust_rtb_sim::config::{LoadConfig, PriceRange, RequestTemplate};
use rust_rtb_sim::loadgen::LoadDriver;
use rust_rtb_sim::logging::init_tracing;

#[derive(Parser, Debug)]
#[command(author = "whiteCcinn", version = "1.0", about = "Synthetic OpenRTB traffic generator")]
struct CliArgs {
    /// 并发数（每批请求数）
    #[arg(short, long, env = "RTB_CONCURRENCY", default_value_t = 10)]
    concurrency: usize,
    /// 运行时长（秒），0 表示一直运行直到 Ctrl-C
    #[arg(short, long, env = "RTB_DURATION", default_value_t = 0)]
    duration: u64,
    #[arg(long, env = "RTB_TARGET_URL", default_value = "http://localhost:8080/bid")]
    url: String,
    #[arg(long, env = "RTB_TIMEOUT_MS", default_value_t = 2000)]
    timeout_ms: u64,
    #[arg(long, env = "RTB_FLOOR_MIN", default_value_t = 1.0)]
    floor_min: f64,
    #[arg(long, env = "RTB_FLOOR_MAX", default_value_t = 5.0)]
    floor_max: f64,
    /// 请求中附带的填充字节数
    #[arg(long, env = "RTB_FILLER_BYTES", default_value_t = 0)]
    filler_bytes: usize,
    #[arg(long, env = "RTB_REPORT_EVERY", default_value_t = 100)]
    report_every: u64,
    #[arg(long, env = "RTB_LOG_DIR")]
    log_dir: Option<String>,
}

impl CliArgs {
    fn load_config(&self) -> LoadConfig {
        LoadConfig {
            target_url: self.url.clone(),
            concurrency: self.concurrency,
            duration: Duration::from_secs(self.duration),
            request_timeout: Duration::from_millis(self.timeout_ms),
            report_every: self.report_every,
            template: RequestTemplate {
                floor: PriceRange::new(self.floor_min, self.floor_max),
                filler_bytes: self.filler_bytes,
                ..Default::default()
            },
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    let _guard = init_tracing(args.log_dir.as_deref(), "rtb_client.json")?;

    let driver = LoadDriver::new(args.load_config())?;
    info!(
        "Starting RTB client: concurrency={}, duration={}",
        args.concurrency, args.duration
    );

    // Ctrl-C 只请求停止，当前批次跑完后仍会输出汇总
    let stop = driver.stop_handle();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Stop requested, finishing in-flight batch...");
            stop.stop();
        }
    });

    let stats = driver
        .run_with_progress(|report| println!("{report}"))
        .await;
    println!("\n{stats}");
    Ok(())
}
