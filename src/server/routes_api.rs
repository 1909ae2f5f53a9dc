use crate::events::BusStats;
use crate::server::AppContext;
use crate::supervisor::ChannelStatus;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use streamvisor_common::ChannelId;

pub fn api_routes() -> Router<AppContext> {
    Router::new()
        .route("/health", get(health))
        .route("/channels", get(list_channels))
        .route("/channels/:index", get(get_channel))
        .route("/events/stats", get(event_stats))
}

async fn health(State(ctx): State<AppContext>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "channels": ctx.channels.len(),
        "observers": ctx.bus.subscriber_count(),
    }))
}

async fn list_channels(State(ctx): State<AppContext>) -> Json<Vec<ChannelStatus>> {
    Json(ctx.channels.iter().map(|s| s.read().clone()).collect())
}

async fn get_channel(
    State(ctx): State<AppContext>,
    Path(index): Path<ChannelId>,
) -> Result<Json<ChannelStatus>, StatusCode> {
    ctx.channels
        .iter()
        .map(|s| s.read().clone())
        .find(|s| s.index == index)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

#[derive(Serialize)]
struct EventStatsResponse {
    #[serde(flatten)]
    stats: BusStats,
    inbox_capacity: usize,
}

async fn event_stats(State(ctx): State<AppContext>) -> Json<EventStatsResponse> {
    Json(EventStatsResponse {
        stats: ctx.bus.stats(),
        inbox_capacity: ctx.bus.inbox_capacity(),
    })
}
