use crate::config::Config;
use crate::events::EventBus;
use crate::supervisor::StatusHandle;
use anyhow::{Context, Result};
use axum::{
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

pub mod routes_api;
pub mod routes_sse;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub bus: Arc<EventBus>,
    /// One status handle per supervised channel
    pub channels: Arc<Vec<StatusHandle>>,
    /// Cancelled when the process shuts down; ends open event streams
    pub shutdown: CancellationToken,
}

impl AppContext {
    pub fn new(
        config: Config,
        bus: Arc<EventBus>,
        channels: Vec<StatusHandle>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            config: Arc::new(config),
            bus,
            channels: Arc::new(channels),
            shutdown,
        }
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    // Players load segments cross-origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers(Any);

    let streams = ServeDir::new(&ctx.config.paths.output_dir);

    Router::new()
        .route("/health", get(health_check))
        .merge(routes_sse::sse_routes())
        .nest("/api", routes_api::api_routes())
        .nest_service("/streams", streams)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Serve HTTP until a shutdown signal arrives or `ctx.shutdown` is cancelled.
///
/// Either way `ctx.shutdown` is cancelled on return, which also stops every
/// supervisor holding a child of it.
pub async fn start_server(ctx: AppContext) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", ctx.config.server.host, ctx.config.server.port)
        .parse()
        .context("Invalid server address")?;

    let shutdown = ctx.shutdown.clone();
    let app = create_router(ctx);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    let token = shutdown.clone();
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = shutdown_signal() => {}
                _ = token.cancelled() => {}
            }
            token.cancel();
        })
        .await;

    shutdown.cancel();
    result?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn context(output_dir: &std::path::Path) -> AppContext {
        let mut config = Config::default();
        config.paths.output_dir = output_dir.to_path_buf();
        AppContext::new(
            config,
            Arc::new(EventBus::default()),
            Vec::new(),
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn health_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(context(dir.path()));

        let resp = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn serves_segments_with_cors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("stream0.m3u8"), "#EXTM3U\n").unwrap();
        let app = create_router(context(dir.path()));

        let resp = app
            .oneshot(
                Request::get("/streams/stream0.m3u8")
                    .header("origin", "http://player.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("access-control-allow-origin").unwrap(),
            "*"
        );
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"#EXTM3U\n");
    }

    #[tokio::test]
    async fn missing_segment_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(context(dir.path()));

        let resp = app
            .oneshot(
                Request::get("/streams/stream_0_001.m4s")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
