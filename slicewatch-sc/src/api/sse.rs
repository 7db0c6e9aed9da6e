//! Server-Sent Events broadcaster
//!
//! Streams dashboard events to connected clients. Each subscriber gets
//! its own broadcast receiver; a slow client that lags simply drops the
//! missed events and keeps receiving.

use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

use slicewatch_common::time::{now_local, timestamp_hms};
use slicewatch_common::types::{ActivityKind, ActivityLevel};

use crate::api::server::AppContext;

/// GET /events - SSE event stream
pub async fn event_stream(
    State(ctx): State<AppContext>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("New SSE client connected");
    let now = now_local(ctx.scan.config().offset());
    ctx.state
        .log_activity(
            ActivityKind::Connect,
            "Dashboard client connected",
            ActivityLevel::Normal,
            timestamp_hms(now),
        )
        .await;

    let rx = ctx.state.subscribe_events();

    let stream = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => {
                    debug!("Broadcasting SSE event: {}", event.type_str());
                    Some(Ok(Event::default().event(event.type_str()).data(json)))
                }
                Err(e) => {
                    warn!("Failed to serialize event: {}", e);
                    None
                }
            },
            Err(e) => {
                // BroadcastStream error (lagged or closed)
                warn!("SSE stream error: {:?}", e);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
