use serde_json::Value;

use crate::event::{kind, StatusEvent};

/// Converts a heterogeneous inbound message into the canonical envelope.
///
/// Four upstream shapes are recognized, dispatched on their `event` tag:
/// `driver_assigned`, `order_accepted`, `location` and `status`. Anything
/// else, and anything missing a required field, is dropped with a warning —
/// one bad message must never stall the pipeline.
pub fn normalize(raw: &Value) -> Option<StatusEvent> {
    let tag = match raw.get("event").and_then(Value::as_str) {
        Some(tag) => tag,
        None => {
            tracing::warn!("dropping inbound message without an event tag");
            return None;
        }
    };
    let order_id = match order_id(raw) {
        Some(id) => id,
        None => {
            tracing::warn!(tag, "dropping inbound message without an order id");
            return None;
        }
    };
    let timestamp = match raw.get("timestamp").and_then(Value::as_i64) {
        Some(ts) => ts,
        None => {
            tracing::warn!(tag, %order_id, "dropping inbound message without an origin timestamp");
            return None;
        }
    };

    let (event_type, data) = match tag {
        "driver_assigned" => {
            let driver = match raw.get("driver") {
                Some(driver) => driver.clone(),
                None => {
                    tracing::warn!(%order_id, "dropping driver_assigned message without driver payload");
                    return None;
                }
            };
            (kind::DRIVER_ASSIGNED, serde_json::json!({ "driver": driver }))
        }
        "order_accepted" => {
            let data = serde_json::json!({
                "courier_id": raw.get("courierId").cloned().unwrap_or(Value::Null),
            });
            (kind::ORDER_ACCEPTED, data)
        }
        "location" => {
            let (lat, lng) = match (
                raw.get("lat").and_then(Value::as_f64),
                raw.get("lng").and_then(Value::as_f64),
            ) {
                (Some(lat), Some(lng)) => (lat, lng),
                _ => {
                    tracing::warn!(%order_id, "dropping location message without coordinates");
                    return None;
                }
            };
            let mut data = serde_json::json!({ "lat": lat, "lng": lng });
            if let Some(eta) = raw.get("eta").and_then(Value::as_i64) {
                data["eta"] = eta.into();
            }
            (kind::LOCATION, data)
        }
        "status" => {
            let status = match raw.get("status").and_then(Value::as_str) {
                Some(status) => status,
                None => {
                    tracing::warn!(%order_id, "dropping status message without a status field");
                    return None;
                }
            };
            let mut data = serde_json::json!({ "status": status });
            if let Some(message) = raw.get("message").and_then(Value::as_str) {
                data["message"] = message.into();
            }
            if let Some(eta) = raw.get("eta").and_then(Value::as_i64) {
                data["eta"] = eta.into();
            }
            (kind::STATUS, data)
        }
        unknown => {
            tracing::warn!(tag = unknown, %order_id, "dropping inbound message with unknown shape");
            return None;
        }
    };

    Some(StatusEvent {
        event_type: event_type.to_string(),
        order_id,
        timestamp,
        data,
    })
}

// Upstreams disagree on the key casing for the order id.
fn order_id(raw: &Value) -> Option<String> {
    raw.get("orderId")
        .or_else(|| raw.get("order_id"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalizes_driver_assignment() {
        let raw = json!({
            "event": "driver_assigned",
            "orderId": "o1",
            "timestamp": 100,
            "driver": { "name": "Sam", "vehicle": "van" },
        });

        let event = normalize(&raw).unwrap();

        assert_eq!(event.event_type, "DRIVER_ASSIGNED");
        assert_eq!(event.order_id, "o1");
        assert_eq!(event.timestamp, 100);
        assert_eq!(event.data["driver"]["name"], "Sam");
    }

    #[test]
    fn test_normalizes_location() {
        let raw = json!({
            "event": "location",
            "order_id": "o1",
            "timestamp": 101,
            "lat": 52.1,
            "lng": 4.9,
            "eta": 1800,
        });

        let event = normalize(&raw).unwrap();

        assert_eq!(event.event_type, "LOCATION");
        assert_eq!(event.data["lat"], 52.1);
        assert_eq!(event.data["eta"], 1800);
    }

    #[test]
    fn test_normalizes_status_update() {
        let raw = json!({
            "event": "status",
            "orderId": "o1",
            "timestamp": 102,
            "status": "IN_PROGRESS",
            "message": "on the way",
        });

        let event = normalize(&raw).unwrap();

        assert_eq!(event.event_type, "STATUS");
        assert_eq!(event.data["status"], "IN_PROGRESS");
        assert_eq!(event.data["message"], "on the way");
    }

    #[test]
    fn test_normalizes_acceptance() {
        let raw = json!({
            "event": "order_accepted",
            "orderId": "o1",
            "timestamp": 103,
            "courierId": "c9",
        });

        let event = normalize(&raw).unwrap();

        assert_eq!(event.event_type, "ORDER_ACCEPTED");
        assert_eq!(event.data["courier_id"], "c9");
    }

    #[test]
    fn test_unknown_shape_is_dropped() {
        let raw = json!({
            "event": "telemetry_ping",
            "orderId": "o1",
            "timestamp": 104,
        });

        assert!(normalize(&raw).is_none());
    }

    #[test]
    fn test_missing_required_fields_are_dropped() {
        assert!(normalize(&json!({ "orderId": "o1", "timestamp": 1 })).is_none());
        assert!(normalize(&json!({ "event": "status", "timestamp": 1, "status": "X" })).is_none());
        assert!(normalize(&json!({ "event": "status", "orderId": "o1", "status": "X" })).is_none());
        // status event without a status payload
        assert!(normalize(&json!({ "event": "status", "orderId": "o1", "timestamp": 1 })).is_none());
        // location without coordinates
        assert!(normalize(&json!({ "event": "location", "orderId": "o1", "timestamp": 1 })).is_none());
    }
}
