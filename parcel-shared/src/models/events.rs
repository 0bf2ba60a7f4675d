use uuid::Uuid;

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct OrderPaidEvent {
    pub order_id: String,
    pub customer_id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub payment_intent_id: String,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct PaymentAttemptedEvent {
    pub attempt_id: Uuid,
    pub order_id: String,
    pub customer_id: String,
    pub amount_minor: i64,
    pub timestamp: i64,
}

/// Emitted when the propagation retrier gives up. The durable PaymentAttempt
/// record remains the source of truth for out-of-band reconciliation.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct PropagationExhaustedEvent {
    pub order_id: String,
    pub attempts: u32,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct RefundIssuedEvent {
    pub payment_intent_id: String,
    pub amount_minor: Option<i64>,
    pub timestamp: i64,
}
