use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::payment::{AttemptStatus, PaymentAttempt};
use crate::StoreError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetails {
    pub user_id: String,
    pub pickup: String,
    pub dropoff: String,
    pub weight_kg: f64,
    pub carrier: String,
}

/// The order store's acknowledgment of a creation request. The store owns
/// id assignment and the initial price quote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedOrder {
    pub order_id: String,
    pub status: String,
    pub estimated_price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreAck {
    pub success: bool,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSummary {
    pub order_id: String,
    pub user_id: String,
    pub status: String,
    pub estimated_price: f64,
    pub created_at: DateTime<Utc>,
}

/// Contract of the external durable order store. Implementations must reject
/// an unknown order id with a 4xx-classed `StoreError::Status`.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn create_order(&self, details: &OrderDetails) -> Result<CreatedOrder, StoreError>;

    async fn update_status(&self, order_id: &str, status: &str) -> Result<StoreAck, StoreError>;

    async fn orders_for_user(&self, user_id: &str) -> Result<Vec<OrderSummary>, StoreError>;
}

/// Durable store for `PaymentAttempt` records.
#[async_trait]
pub trait PaymentAttemptStore: Send + Sync {
    async fn insert(&self, attempt: &PaymentAttempt) -> Result<(), StoreError>;

    async fn update_status(
        &self,
        id: Uuid,
        status: AttemptStatus,
        payment_intent_id: Option<&str>,
    ) -> Result<(), StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<PaymentAttempt>, StoreError>;

    async fn find_by_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<PaymentAttempt>, StoreError>;

    async fn for_order(&self, order_id: &str) -> Result<Vec<PaymentAttempt>, StoreError>;
}
