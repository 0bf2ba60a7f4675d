use serde::{Deserialize, Serialize};

/// Canonical envelope every inbound real-time message is normalized into.
/// `timestamp` is origin-issued, not receipt time. Immutable once built; the
/// reconciler only derives new state from it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusEvent {
    pub event_type: String,
    pub order_id: String,
    pub timestamp: i64,
    pub data: serde_json::Value,
}

/// Canonical event type tags produced by the normalizer.
pub mod kind {
    pub const DRIVER_ASSIGNED: &str = "DRIVER_ASSIGNED";
    pub const ORDER_ACCEPTED: &str = "ORDER_ACCEPTED";
    pub const LOCATION: &str = "LOCATION";
    pub const STATUS: &str = "STATUS";
}

/// Normalized status vocabulary used by the reconciled view.
pub mod status {
    pub const PENDING: &str = "PENDING";
    pub const DRIVER_ASSIGNED: &str = "DRIVER_ASSIGNED";
    pub const DRIVER_FOUND: &str = "DRIVER_FOUND";
    pub const DRIVER_PICKUP: &str = "DRIVER_PICKUP";
    pub const IN_TRANSIT: &str = "IN_TRANSIT";
    pub const DELIVERED: &str = "DELIVERED";
    pub const CANCELLED: &str = "CANCELLED";
}

/// Fixed alias table guarding against upstream vocabulary drift. Unknown
/// values pass through untouched.
pub fn canonical_status(raw: &str) -> &str {
    match raw {
        "AWAITING_PICKUP" => status::DRIVER_PICKUP,
        "IN_PROGRESS" => status::IN_TRANSIT,
        other => other,
    }
}
