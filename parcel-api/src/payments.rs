use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use parcel_core::payment::{AttemptStatus, ChargeError, ChargeOutcome, ChargeRequest};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ChargePaymentRequest {
    pub order_id: String,
    pub customer_id: String,
    pub payment_method_id: String,
    pub amount: f64,
    pub currency: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChargePaymentResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_intent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
pub struct RefundRequest {
    pub amount: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefundResponse {
    pub id: String,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentAttemptResponse {
    pub id: Uuid,
    pub order_id: String,
    pub amount: i64,
    pub currency: String,
    pub status: AttemptStatus,
    pub payment_intent_id: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/payments
/// Charge an order. Answers `processing` when the response budget runs out
/// before the processor does; the final state lands asynchronously.
pub async fn charge_payment(
    State(state): State<AppState>,
    Json(req): Json<ChargePaymentRequest>,
) -> Result<(StatusCode, Json<ChargePaymentResponse>), AppError> {
    if req.order_id.is_empty() || req.customer_id.is_empty() || req.payment_method_id.is_empty() {
        return Err(AppError::ValidationError(
            "order_id, customer_id and payment_method_id are required".to_string(),
        ));
    }
    if req.amount <= 0.0 {
        return Err(AppError::ValidationError(
            "amount must be positive".to_string(),
        ));
    }

    let currency = req.currency.unwrap_or_else(|| state.currency.clone());
    let outcome = state
        .orchestrator
        .charge(ChargeRequest {
            order_id: req.order_id,
            customer_id: req.customer_id,
            payment_method_id: req.payment_method_id,
            amount: req.amount,
            currency,
        })
        .await;

    match outcome {
        Ok(ChargeOutcome::Succeeded { payment_intent_id }) => {
            state.metrics.charges.with_label_values(&["succeeded"]).inc();
            Ok((
                StatusCode::OK,
                Json(ChargePaymentResponse {
                    status: "succeeded".to_string(),
                    payment_intent_id: Some(payment_intent_id),
                    pending: None,
                }),
            ))
        }
        Ok(ChargeOutcome::Pending) => {
            state.metrics.charges.with_label_values(&["processing"]).inc();
            Ok((
                StatusCode::ACCEPTED,
                Json(ChargePaymentResponse {
                    status: "processing".to_string(),
                    payment_intent_id: None,
                    pending: Some(true),
                }),
            ))
        }
        Err(ChargeError::Declined(reason)) => {
            state.metrics.charges.with_label_values(&["declined"]).inc();
            Err(AppError::PaymentRequired(reason))
        }
        Err(ChargeError::Unavailable(reason)) => {
            state.metrics.charges.with_label_values(&["error"]).inc();
            Err(AppError::UpstreamError(reason))
        }
    }
}

/// POST /v1/payments/{intent_id}/refund
pub async fn refund_payment(
    State(state): State<AppState>,
    Path(intent_id): Path<String>,
    Json(req): Json<RefundRequest>,
) -> Result<Json<RefundResponse>, AppError> {
    let refund = state
        .orchestrator
        .refund(&intent_id, req.amount)
        .await
        .map_err(|err| match err {
            ChargeError::Declined(reason) => AppError::ValidationError(reason),
            ChargeError::Unavailable(reason) => AppError::UpstreamError(reason),
        })?;

    state.metrics.refunds.inc();
    Ok(Json(RefundResponse {
        id: refund.id,
        status: refund.status,
    }))
}

/// GET /v1/orders/{order_id}/payments
/// The durable attempt trail for an order; what reconciliation reads when
/// propagation gave up.
pub async fn list_order_payments(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<Vec<PaymentAttemptResponse>>, AppError> {
    let attempts = state
        .attempts
        .for_order(&order_id)
        .await
        .map_err(|err| AppError::UpstreamError(err.to_string()))?;

    let responses = attempts
        .into_iter()
        .map(|attempt| PaymentAttemptResponse {
            id: attempt.id,
            order_id: attempt.order_id,
            amount: attempt.amount,
            currency: attempt.currency,
            status: attempt.status,
            payment_intent_id: attempt.payment_intent_id,
            created_at: attempt.created_at,
        })
        .collect();

    Ok(Json(responses))
}
