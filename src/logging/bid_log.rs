// src/logging/bid_log.rs

use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::sync::oneshot;
use tokio::task::{self, JoinHandle};
use tokio::time::{self, Duration};
use tracing::warn;
use tracing_appender::rolling::{self, RollingFileAppender};
use tracing_subscriber::fmt::MakeWriter;

use crate::bidding::Decision;

/// **单次竞价决策日志**
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BidLogEntry {
    pub timestamp: String,
    pub request_id: String,
    /// "bid" 或 "no_bid"
    pub outcome: String,
    pub price: Option<f64>,
    pub nbr: Option<u32>,
}

impl BidLogEntry {
    pub fn from_decision(decision: &Decision) -> Self {
        let (outcome, nbr) = match decision {
            Decision::Bid(_) => ("bid", None),
            Decision::NoBid(no_bid) => ("no_bid", Some(no_bid.nbr)),
        };
        Self {
            timestamp: Utc::now().to_rfc3339(),
            request_id: decision.request_id().to_string(),
            outcome: outcome.to_string(),
            price: decision.price(),
            nbr,
        }
    }
}

/// **竞价日志**
///
/// 请求处理路径只做一次非阻塞 `try_send`，后台任务按批（或按时间间隔）
/// 把 JSON 行写入按小时滚动的日志文件。通道满时丢弃并计数。
pub struct BidLog {
    sender: Sender<BidLogEntry>,
    dropped: AtomicU64,
    shutdown_tx: Mutex<Option<oneshot::Sender<()>>>,
    writer: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl BidLog {
    pub fn new(log_dir: &str, buffer_size: usize, batch_size: usize, flush_interval: u64) -> Arc<Self> {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let log_file = Arc::new(rolling::hourly(log_dir, "bid_log.json"));

        let writer = tokio::spawn(Self::background_log_writer(
            log_file,
            receiver,
            shutdown_rx,
            batch_size.max(1),
            flush_interval,
        ));

        Arc::new(Self {
            sender,
            dropped: AtomicU64::new(0),
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            writer: tokio::sync::Mutex::new(Some(writer)),
        })
    }

    /// 记录一条日志，不会阻塞请求处理
    pub fn record(&self, entry: BidLogEntry) {
        if self.sender.try_send(entry).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// 因通道已满或已关闭而丢弃的条数
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// 停止后台写入任务，确保已接收的日志全部落盘
    pub async fn shutdown(&self) {
        let shutdown_tx = self
            .shutdown_tx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(tx) = shutdown_tx {
            let _ = tx.send(());
        }
        if let Some(writer) = self.writer.lock().await.take() {
            if let Err(e) = writer.await {
                warn!(error = %e, "bid log writer task failed");
            }
        }
    }

    async fn background_log_writer(
        log_file: Arc<RollingFileAppender>,
        mut receiver: Receiver<BidLogEntry>,
        mut shutdown_rx: oneshot::Receiver<()>,
        batch_size: usize,
        flush_interval: u64,
    ) {
        let mut buffer = Vec::with_capacity(batch_size);
        let mut interval = time::interval(Duration::from_millis(flush_interval.max(1)));

        loop {
            tokio::select! {
                received = receiver.recv() => match received {
                    Some(entry) => {
                        buffer.push(entry);
                        if buffer.len() >= batch_size {
                            Self::write_logs_to_disk(log_file.clone(), &mut buffer).await;
                        }
                    }
                    None => break,
                },
                _ = interval.tick() => {
                    if !buffer.is_empty() {
                        Self::write_logs_to_disk(log_file.clone(), &mut buffer).await;
                    }
                }
                _ = &mut shutdown_rx => {
                    while let Ok(entry) = receiver.try_recv() {
                        buffer.push(entry);
                    }
                    break;
                }
            }
        }

        if !buffer.is_empty() {
            Self::write_logs_to_disk(log_file, &mut buffer).await;
        }
    }

    async fn write_logs_to_disk(file: Arc<RollingFileAppender>, buffer: &mut Vec<BidLogEntry>) {
        let mut content = String::new();
        for entry in buffer.drain(..) {
            match serde_json::to_string(&entry) {
                Ok(line) => {
                    content.push_str(&line);
                    content.push('\n');
                }
                Err(e) => warn!(error = %e, "failed to encode bid log entry"),
            }
        }

        let written = task::spawn_blocking(move || {
            let mut writer = MakeWriter::make_writer(&*file);
            writer.write_all(content.as_bytes())
        })
        .await;

        match written {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "failed to write bid log"),
            Err(e) => warn!(error = %e, "bid log write task failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openrtb::response::NoBidResponse;
    use std::path::PathBuf;

    fn temp_log_dir() -> PathBuf {
        std::env::temp_dir().join(format!("bid-log-{}", uuid::Uuid::new_v4()))
    }

    fn read_lines(dir: &PathBuf) -> Vec<String> {
        let mut lines = Vec::new();
        for entry in std::fs::read_dir(dir).unwrap() {
            let content = std::fs::read_to_string(entry.unwrap().path()).unwrap();
            lines.extend(content.lines().map(str::to_string));
        }
        lines
    }

    #[test]
    fn entry_reflects_no_bid_decision() {
        let decision = Decision::NoBid(NoBidResponse {
            id: "req-9".to_string(),
            nbr: 2,
        });
        let entry = BidLogEntry::from_decision(&decision);
        assert_eq!(entry.request_id, "req-9");
        assert_eq!(entry.outcome, "no_bid");
        assert_eq!(entry.nbr, Some(2));
        assert_eq!(entry.price, None);
    }

    #[tokio::test]
    async fn shutdown_flushes_buffered_entries() {
        let dir = temp_log_dir();
        let log = BidLog::new(dir.to_str().unwrap(), 64, 1000, 60_000);

        for i in 0..3 {
            log.record(BidLogEntry::from_decision(&Decision::NoBid(NoBidResponse {
                id: format!("req-{i}"),
                nbr: 2,
            })));
        }
        log.shutdown().await;

        let lines = read_lines(&dir);
        assert_eq!(lines.len(), 3);
        let first: BidLogEntry = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(first.request_id, "req-0");
        assert_eq!(log.dropped(), 0);

        let _ = std::fs::remove_dir_all(dir);
    }
}
