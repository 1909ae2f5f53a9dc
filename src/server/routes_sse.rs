use crate::events::{spawn_drain, EventSink, SinkClosed};
use crate::server::AppContext;
use async_trait::async_trait;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use streamvisor_common::LifecycleEvent;
use tokio::sync::mpsc;

pub fn sse_routes() -> Router<AppContext> {
    Router::new().route("/events", get(events_handler))
}

/// Writes lifecycle events into one SSE response.
struct SseSink(mpsc::Sender<Event>);

#[async_trait]
impl EventSink for SseSink {
    async fn deliver(&mut self, event: LifecycleEvent) -> Result<(), SinkClosed> {
        self.0.send(sse_event(event)).await.map_err(|_| SinkClosed)
    }
}

/// `event: <kind>` / `data: <channelId>`
fn sse_event(event: LifecycleEvent) -> Event {
    Event::default()
        .event(event.kind.as_str())
        .data(event.channel_id.to_string())
}

/// GET /events -- lifecycle events as SSE.
///
/// Each connection gets its own subscription and drain task. The drain task
/// is cancelled when the response stream is dropped, which happens when the
/// client disconnects or the server shuts down.
pub async fn events_handler(
    State(ctx): State<AppContext>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = ctx.bus.subscribe();
    let (tx, mut rx) = mpsc::channel(1);

    let cancel = ctx.shutdown.child_token();
    let shutdown = cancel.clone();
    let guard = cancel.clone().drop_guard();
    spawn_drain(subscription, SseSink(tx), cancel);

    let stream = async_stream::stream! {
        let _guard = guard;
        yield Ok(Event::default().comment("connected"));

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                event = rx.recv() => match event {
                    Some(event) => yield Ok(event),
                    None => break,
                },
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(ctx.config.events.keepalive_secs.max(1)))
            .text("ping"),
    )
}
