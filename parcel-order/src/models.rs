use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Order status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Draft,
    Created,
    Confirmed,
    Paid,
    InTransit,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Terminal states accept no further operations.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CarrierType {
    Bicycle,
    Car,
    Van,
    Truck,
}

impl CarrierType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CarrierType::Bicycle => "bicycle",
            CarrierType::Car => "car",
            CarrierType::Van => "van",
            CarrierType::Truck => "truck",
        }
    }
}

/// The client-side view of a delivery order. Exists in memory from estimate
/// time; gains an identity once the order store acknowledges creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub order_id: Option<String>,
    pub status: OrderStatus,
    pub pickup: String,
    pub dropoff: String,
    pub weight_kg: f64,
    pub carrier: Option<CarrierType>,
    pub estimated_price: f64,
    /// Minor currency units, fixed at confirmation time. Never recomputed
    /// from a later-changed estimate.
    pub payment_amount: Option<i64>,
    pub payment_intent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn draft() -> Self {
        let now = Utc::now();
        Self {
            order_id: None,
            status: OrderStatus::Draft,
            pickup: String::new(),
            dropoff: String::new(),
            weight_kg: 0.0,
            carrier: None,
            estimated_price: 0.0,
            payment_amount: None,
            payment_intent_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Default for Order {
    fn default() -> Self {
        Self::draft()
    }
}
