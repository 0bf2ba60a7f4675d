use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::convert::Infallible;
use tokio_stream::wrappers::UnboundedReceiverStream;

use parcel_track::presentation::driver_found_stages;
use parcel_track::OrderTracker;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TrackQuery {
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct PublishResponse {
    pub delivered: usize,
}

/// GET /v1/orders/{order_id}/track?user_id=...
/// Live reconciled status for one order as an SSE stream. The tracking
/// subscription lives exactly as long as the stream: when the client goes
/// away the tracker is dropped and its feed subscription released.
pub async fn track_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    Query(query): Query<TrackQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let feed = state.hub.subscribe(&query.user_id);
    let tracker = OrderTracker::start(order_id, feed);
    let stages = driver_found_stages(tracker.subscribe(), state.driver_found_grace);

    let stream = UnboundedReceiverStream::new(stages).map(move |status| {
        let _keep = &tracker;
        let data = serde_json::to_string(&status).unwrap_or_else(|_| "{}".to_string());
        Ok(Event::default().event("status").data(data))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// POST /v1/events/{user_id}
/// Inbound delivery callback for the upstream real-time channel: drops the
/// raw message onto the user's channel for any live trackers to consume.
pub async fn publish_event(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<PublishResponse>) {
    let delivered = state.hub.publish(&user_id, payload);
    state.metrics.events_published.inc();
    (StatusCode::ACCEPTED, Json(PublishResponse { delivered }))
}
