use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::api::handlers::{bid_liveness, handle_bid_request, handle_no_rtb, health};
use crate::AppState;

/// Mock bidder 路由，请求体上限取自 `BidderConfig::max_body_bytes`
pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.engine.config().max_body_bytes;
    Router::new()
        .route("/bid", post(handle_bid_request).get(bid_liveness))
        .route("/health", get(health))
        .route("/no_rtb", post(handle_no_rtb))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// 在后台运行的 mock bidder，drop 时自动停止
pub struct MockBidderServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl MockBidderServer {
    /// 绑定地址并启动服务，端口为 0 时由系统分配
    pub async fn start(addr: &str, state: Arc<AppState>) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let app = router(state);

        let handle = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = served {
                warn!(error = %e, "mock bidder stopped with error");
            }
        });

        info!("Mock bidder running at http://{}", addr);
        Ok(Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// 优雅停止并等待服务任务退出
    pub async fn stop(mut self) {
        self.signal_shutdown();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }

    fn signal_shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockBidderServer {
    fn drop(&mut self) {
        self.signal_shutdown();
    }
}
