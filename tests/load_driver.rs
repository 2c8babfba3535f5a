// Load driver tests against a real mock bidder on an ephemeral port

use std::sync::Arc;
use std::time::Duration;

use rust_rtb_sim::bidding::BidDecisionEngine;
use rust_rtb_sim::config::{BidderConfig, LatencyRange, LoadConfig};
use rust_rtb_sim::error::ConfigError;
use rust_rtb_sim::loadgen::{LoadDriver, ProgressReport};
use rust_rtb_sim::mock_bidder::MockBidderServer;
use rust_rtb_sim::AppState;

async fn start_bidder(config: BidderConfig) -> MockBidderServer {
    let engine = BidDecisionEngine::new(config).expect("valid bidder config");
    MockBidderServer::start("127.0.0.1:0", Arc::new(AppState::new(engine)))
        .await
        .expect("mock bidder starts")
}

fn load_config(url: String, concurrency: usize, duration: Duration) -> LoadConfig {
    LoadConfig {
        target_url: url,
        concurrency,
        duration,
        ..Default::default()
    }
}

/// 一个已经关闭的本地端口，连接会被拒绝
fn refused_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}/bid")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn fixed_latency_bounds_throughput_by_batch_round_trip() {
    let server = start_bidder(BidderConfig {
        latency: LatencyRange::fixed(100),
        ..Default::default()
    })
    .await;
    let driver = LoadDriver::new(load_config(
        format!("{}/bid", server.url()),
        5,
        Duration::from_secs(1),
    ))
    .unwrap();

    let stats = driver.run().await;

    assert!((9..=11).contains(&stats.batches), "batches {}", stats.batches);
    assert_eq!(stats.total, stats.batches * 5);
    assert_eq!(stats.failed(), 0);
    assert_eq!(stats.ok + stats.no_bid, stats.total);
    assert!(stats.elapsed >= Duration::from_secs(1));
    assert!((stats.qps() - stats.total as f64 / stats.elapsed.as_secs_f64()).abs() < 1e-9);
    assert!((35.0..=55.0).contains(&stats.qps()), "qps {}", stats.qps());
    assert!(stats.mean_latency() >= Duration::from_millis(100));

    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn no_bid_responses_are_counted_over_http() {
    let server = start_bidder(BidderConfig {
        bid_rate: 0.0,
        ..Default::default()
    })
    .await;
    let driver = LoadDriver::new(load_config(
        format!("{}/bid", server.url()),
        4,
        Duration::from_millis(300),
    ))
    .unwrap();

    let stats = driver.run().await;

    assert!(stats.total > 0);
    assert_eq!(stats.no_bid, stats.total);
    assert_eq!(stats.ok, 0);
    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn connection_failures_never_abort_the_run() {
    let driver = LoadDriver::new(LoadConfig {
        request_timeout: Duration::from_millis(200),
        ..load_config(refused_url(), 3, Duration::from_millis(300))
    })
    .unwrap();

    let stats = driver.run().await;

    assert!(stats.batches >= 1);
    assert_eq!(stats.total, stats.batches * 3);
    assert_eq!(stats.failed(), stats.total);
    assert_eq!(stats.ok + stats.no_bid, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn slow_responses_are_recorded_as_timeouts() {
    let server = start_bidder(BidderConfig {
        latency: LatencyRange::fixed(500),
        ..Default::default()
    })
    .await;
    let driver = LoadDriver::new(LoadConfig {
        request_timeout: Duration::from_millis(100),
        ..load_config(format!("{}/bid", server.url()), 2, Duration::from_millis(250))
    })
    .unwrap();

    let stats = driver.run().await;

    assert!(stats.batches >= 1);
    assert_eq!(stats.total, stats.batches * 2);
    assert_eq!(stats.timeouts, stats.total);
    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn progress_reports_are_monotonic_and_on_boundaries() {
    let server = start_bidder(BidderConfig::default()).await;
    let driver = LoadDriver::new(LoadConfig {
        report_every: 20,
        ..load_config(format!("{}/bid", server.url()), 10, Duration::from_millis(400))
    })
    .unwrap();

    let mut reports: Vec<ProgressReport> = Vec::new();
    let stats = driver
        .run_with_progress(|report| reports.push(report.clone()))
        .await;

    assert_eq!(reports.len() as u64, stats.batches / 2);
    for pair in reports.windows(2) {
        assert!(pair[1].total > pair[0].total);
        assert!(pair[1].elapsed >= pair[0].elapsed);
    }
    for report in &reports {
        assert_eq!(report.total % 20, 0);
        assert!(report.qps > 0.0);
    }
    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn stop_handle_ends_an_unbounded_run_between_batches() {
    let server = start_bidder(BidderConfig {
        latency: LatencyRange::fixed(20),
        ..Default::default()
    })
    .await;
    let driver = LoadDriver::new(load_config(
        format!("{}/bid", server.url()),
        3,
        Duration::ZERO,
    ))
    .unwrap();

    let stop = driver.stop_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        stop.stop();
    });

    let stats = driver.run().await;

    assert!(stats.batches >= 1);
    assert_eq!(stats.total, stats.batches * 3);
    assert!(stats.elapsed >= Duration::from_millis(200));
    server.stop().await;
}

#[test]
fn invalid_configuration_fails_before_any_traffic() {
    let err = LoadDriver::new(load_config(refused_url(), 0, Duration::ZERO))
        .err()
        .expect("zero concurrency is rejected");
    assert_eq!(err, ConfigError::InvalidConcurrency(0));
}
