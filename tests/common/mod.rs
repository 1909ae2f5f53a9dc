//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which builds a default config pointed at a
//! temporary output directory, an [`EventBus`], and a full [`AppContext`].
//! The [`TestHarness::with_server`] constructor starts Axum on a random port
//! for HTTP-level testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use streamvisor::config::Config;
use streamvisor::events::EventBus;
use streamvisor::server::{create_router, AppContext};
use streamvisor::supervisor::StatusHandle;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

pub struct TestHarness {
    pub ctx: AppContext,
    pub bus: Arc<EventBus>,
    pub shutdown: CancellationToken,
    pub dir: TempDir,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_channels(Config::default(), Vec::new())
    }

    /// Harness whose config writes under a fresh temporary directory.
    pub fn with_channels(mut config: Config, channels: Vec<StatusHandle>) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        config.paths.output_dir = dir.path().join("streams");
        config.paths.log_dir = dir.path().join("logs");
        std::fs::create_dir_all(&config.paths.output_dir).expect("failed to create output dir");
        config.events.keepalive_secs = 1;

        let bus = Arc::new(EventBus::new(config.events.inbox_capacity));
        let shutdown = CancellationToken::new();
        let ctx = AppContext::new(config, Arc::clone(&bus), channels, shutdown.clone());

        Self {
            ctx,
            bus,
            shutdown,
            dir,
        }
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        Self::new().serve().await
    }

    pub async fn serve(self) -> (Self, SocketAddr) {
        let app = create_router(self.ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (self, addr)
    }

    /// Wait until the bus has exactly `n` observers.
    pub async fn wait_for_subscribers(&self, n: usize) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while self.bus.subscriber_count() != n {
            assert!(
                tokio::time::Instant::now() < deadline,
                "expected {n} subscribers, have {}",
                self.bus.subscriber_count()
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

/// Read an SSE body until `pred` matches the accumulated text.
pub async fn read_until(
    resp: &mut reqwest::Response,
    buf: &mut String,
    pred: impl Fn(&str) -> bool,
) {
    let read = async {
        while !pred(buf) {
            match resp.chunk().await.expect("stream error") {
                Some(chunk) => buf.push_str(&String::from_utf8_lossy(&chunk)),
                None => panic!("stream ended; got: {buf:?}"),
            }
        }
    };
    let result = tokio::time::timeout(Duration::from_secs(5), read).await;
    assert!(result.is_ok(), "timed out; got: {buf:?}");
}
