use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::{canonical_status, kind, status, StatusEvent};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DriverInfo {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub vehicle: Option<String>,
}

impl DriverInfo {
    fn from_payload(payload: &Value) -> Self {
        let field = |key: &str| payload.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            name: field("name"),
            phone: field("phone"),
            vehicle: field("vehicle"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// The single externally-observed status of a tracked order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReconciledStatus {
    pub order_id: String,
    pub status: String,
    pub driver: Option<DriverInfo>,
    pub location: Option<GeoPoint>,
    pub estimated_arrival: Option<i64>,
    pub message: Option<String>,
}

impl ReconciledStatus {
    fn new(order_id: String) -> Self {
        Self {
            order_id,
            status: status::PENDING.to_string(),
            driver: None,
            location: None,
            estimated_arrival: None,
            message: None,
        }
    }
}

/// Resolves duplicated, conflicting and out-of-order events for one order
/// into a single current view.
///
/// Two independent concerns are tracked: the status text and the driver's
/// motion (location). Each carries its own last-applied origin timestamp;
/// an event older than the last one applied for its concern is stale and
/// dropped, so a reordered duplicate of an earlier stage can never regress
/// the displayed status.
pub struct Reconciler {
    view: ReconciledStatus,
    last_status_ts: Option<i64>,
    last_motion_ts: Option<i64>,
}

impl Reconciler {
    pub fn new(order_id: impl Into<String>) -> Self {
        Self {
            view: ReconciledStatus::new(order_id.into()),
            last_status_ts: None,
            last_motion_ts: None,
        }
    }

    pub fn view(&self) -> &ReconciledStatus {
        &self.view
    }

    /// Applies one normalized event. Returns whether the view changed.
    /// Applying the same event twice yields the same view as applying it
    /// once. Never panics on a malformed payload; it is logged and dropped.
    pub fn apply(&mut self, event: &StatusEvent) -> bool {
        if event.order_id != self.view.order_id {
            return false;
        }

        match event.event_type.as_str() {
            kind::STATUS => self.apply_status(event),
            kind::DRIVER_ASSIGNED | kind::ORDER_ACCEPTED => self.apply_driver(event),
            kind::LOCATION => self.apply_motion(event),
            other => {
                tracing::warn!(event_type = other, order_id = %event.order_id, "unrecognized event type in reconciler");
                false
            }
        }
    }

    fn status_stale(&self, ts: i64) -> bool {
        self.last_status_ts.is_some_and(|last| ts < last)
    }

    fn apply_status(&mut self, event: &StatusEvent) -> bool {
        let raw = match event.data.get("status").and_then(Value::as_str) {
            Some(raw) => raw,
            None => {
                tracing::warn!(order_id = %event.order_id, "status event without a status payload");
                return false;
            }
        };
        if self.status_stale(event.timestamp) {
            tracing::debug!(order_id = %event.order_id, ts = event.timestamp, "dropping stale status event");
            return false;
        }

        let before = self.view.clone();
        self.view.status = canonical_status(raw).to_string();
        if let Some(message) = event.data.get("message").and_then(Value::as_str) {
            self.view.message = Some(message.to_string());
        }
        if let Some(eta) = event.data.get("eta").and_then(Value::as_i64) {
            self.view.estimated_arrival = Some(eta);
        }
        self.last_status_ts = Some(event.timestamp);
        self.view != before
    }

    fn apply_driver(&mut self, event: &StatusEvent) -> bool {
        if self.status_stale(event.timestamp) {
            tracing::debug!(order_id = %event.order_id, ts = event.timestamp, "dropping stale driver event");
            return false;
        }

        let before = self.view.clone();
        self.view.status = status::DRIVER_ASSIGNED.to_string();
        if let Some(payload) = event.data.get("driver") {
            self.view.driver = Some(DriverInfo::from_payload(payload));
        }
        self.last_status_ts = Some(event.timestamp);
        self.view != before
    }

    fn apply_motion(&mut self, event: &StatusEvent) -> bool {
        let (lat, lng) = match (
            event.data.get("lat").and_then(Value::as_f64),
            event.data.get("lng").and_then(Value::as_f64),
        ) {
            (Some(lat), Some(lng)) => (lat, lng),
            _ => {
                tracing::warn!(order_id = %event.order_id, "location event without coordinates");
                return false;
            }
        };
        if self.last_motion_ts.is_some_and(|last| event.timestamp < last) {
            tracing::debug!(order_id = %event.order_id, ts = event.timestamp, "dropping stale location event");
            return false;
        }

        let before = self.view.clone();
        self.view.location = Some(GeoPoint { lat, lng });
        if let Some(eta) = event.data.get("eta").and_then(Value::as_i64) {
            self.view.estimated_arrival = Some(eta);
        }
        self.last_motion_ts = Some(event.timestamp);
        self.view != before
    }
}
