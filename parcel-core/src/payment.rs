use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a single charge attempt. Written once at `Created`, updated
/// at most twice more (outcome, then refund).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptStatus {
    Created,
    Succeeded,
    Failed,
    Pending,
    Refunded,
}

/// The durable record of an attempted charge. Persisted before the external
/// processor is called, so a crash cannot lose the fact that money may have
/// moved. This is the anchor for out-of-band reconciliation when the
/// propagation path gives up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentAttempt {
    pub id: Uuid,
    pub order_id: String,
    pub payment_method_id: String,
    pub customer_id: String,
    pub amount: i64,
    pub currency: String,
    pub idempotency_key: String,
    pub payment_intent_id: Option<String>,
    pub status: AttemptStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentAttempt {
    pub fn new(
        order_id: String,
        payment_method_id: String,
        customer_id: String,
        amount: i64,
        currency: String,
        idempotency_key: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            order_id,
            payment_method_id,
            customer_id,
            amount,
            currency,
            idempotency_key,
            payment_intent_id: None,
            status: AttemptStatus::Created,
            created_at: now,
            updated_at: now,
        }
    }
}

/// What the external processor reports for a charge.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChargeStatus {
    Succeeded,
    Processing,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Charge {
    pub id: String,
    pub status: ChargeStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Refund {
    pub id: String,
    pub status: String,
}

/// Fully-resolved charge instruction handed to the processor. Amounts are
/// integer minor units; the unit heuristic has already run by this point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeSpec {
    pub amount: i64,
    pub currency: String,
    pub customer_id: String,
    pub payment_method_id: String,
    pub metadata: serde_json::Value,
    pub idempotency_key: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    /// User-correctable: card declined, insufficient funds. Surfaced verbatim.
    #[error("charge declined: {0}")]
    Declined(String),

    /// Transient: processor 5xx or network failure.
    #[error("payment processor unavailable: {0}")]
    Unavailable(String),
}

/// Adapter over the external payment processor. Confirmation is requested
/// inline; redirect-based payment methods are disabled because there is no
/// user-facing redirect target in this server-to-server flow.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn attach_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
    ) -> Result<(), ProcessorError>;

    async fn create_and_confirm_charge(&self, spec: &ChargeSpec) -> Result<Charge, ProcessorError>;

    async fn refund(
        &self,
        payment_intent_id: &str,
        amount: Option<i64>,
    ) -> Result<Refund, ProcessorError>;
}

/// What a caller of the charge API gets back. `Pending` means the response
/// budget ran out before the processor answered; the charge may still land
/// and its outcome is learned through the propagation path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChargeOutcome {
    Succeeded { payment_intent_id: String },
    Pending,
}

/// Request accepted at the charge boundary. `amount` is best-effort: a
/// fractional value is read as a major-unit decimal, an integral value as
/// minor units already (see the orchestrator's normalization).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeRequest {
    pub order_id: String,
    pub customer_id: String,
    pub payment_method_id: String,
    pub amount: f64,
    pub currency: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ChargeError {
    #[error("charge declined: {0}")]
    Declined(String),

    #[error("payment service unavailable: {0}")]
    Unavailable(String),
}

/// Contract the client-side state machine charges through. Implemented by
/// the payment orchestrator; a remote client would implement it over HTTP.
#[async_trait]
pub trait ChargeApi: Send + Sync {
    async fn charge(&self, req: ChargeRequest) -> Result<ChargeOutcome, ChargeError>;
}
