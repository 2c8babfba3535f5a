// src/logging/mod.rs

pub mod bid_log;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// 初始化全局 tracing 日志
///
/// 控制台始终输出；指定 `log_dir` 时另外按小时滚动写入 JSON 日志文件。
/// 返回的 guard 需要一直持有到进程退出，否则缓冲中的日志会丢失。
pub fn init_tracing(log_dir: Option<&str>, file_name: &str) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(rolling::hourly(dir, file_name));
            (Some(fmt::layer().json().with_writer(non_blocking)), Some(guard))
        }
        None => (None, None),
    };

    Registry::default()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}
