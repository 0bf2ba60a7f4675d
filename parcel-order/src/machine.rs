use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parcel_core::payment::{ChargeApi, ChargeError, ChargeOutcome, ChargeRequest};
use parcel_core::repository::{OrderDetails, OrderStore, OrderSummary};
use parcel_core::StoreError;
use tokio::sync::Mutex;

use crate::models::{CarrierType, Order, OrderStatus};

pub const STATUS_ORDER_CONFIRMED: &str = "ORDER CONFIRMED";
pub const STATUS_CANCELLED: &str = "CANCELLED";

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("no active order; run an estimate first")]
    NoOrder,

    #[error("invalid state transition from {from:?} to {to:?}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("another operation is already in flight")]
    OperationInFlight,

    #[error("order store rejected the request: {0}")]
    Rejected(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Payment(#[from] ChargeError),
}

/// Owns the authoritative client-side order record and the operations that
/// move it through its lifecycle. Each operation suspends at a network call;
/// while one is in flight every other operation is rejected outright, so a
/// double-tap can never double-apply a transition.
pub struct OrderStateMachine {
    store: Arc<dyn OrderStore>,
    payments: Arc<dyn ChargeApi>,
    user_id: String,
    currency: String,
    record: Mutex<Order>,
    in_flight: AtomicBool,
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl OrderStateMachine {
    pub fn new(
        store: Arc<dyn OrderStore>,
        payments: Arc<dyn ChargeApi>,
        user_id: impl Into<String>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            store,
            payments,
            user_id: user_id.into(),
            currency: currency.into(),
            record: Mutex::new(Order::draft()),
            in_flight: AtomicBool::new(false),
        }
    }

    fn begin(&self) -> Result<InFlightGuard<'_>, OrderError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(OrderError::OperationInFlight);
        }
        Ok(InFlightGuard(&self.in_flight))
    }

    pub async fn snapshot(&self) -> Order {
        self.record.lock().await.clone()
    }

    /// DRAFT -> CREATED. Submits creation data to the order store; on failure
    /// the record stays DRAFT and the caller may simply try again.
    pub async fn calculate_estimate(
        &self,
        pickup: &str,
        dropoff: &str,
        weight_kg: f64,
        carrier: CarrierType,
    ) -> Result<Order, OrderError> {
        let _guard = self.begin()?;
        {
            let record = self.record.lock().await;
            if record.status != OrderStatus::Draft {
                return Err(OrderError::InvalidTransition {
                    from: record.status,
                    to: OrderStatus::Created,
                });
            }
        }

        let details = OrderDetails {
            user_id: self.user_id.clone(),
            pickup: pickup.to_string(),
            dropoff: dropoff.to_string(),
            weight_kg,
            carrier: carrier.as_str().to_string(),
        };
        let created = self.store.create_order(&details).await?;
        tracing::info!(order_id = %created.order_id, price = created.estimated_price, "order created");

        let mut record = self.record.lock().await;
        record.order_id = Some(created.order_id);
        record.status = OrderStatus::Created;
        record.pickup = details.pickup;
        record.dropoff = details.dropoff;
        record.weight_kg = weight_kg;
        record.carrier = Some(carrier);
        record.estimated_price = created.estimated_price;
        record.touch();
        Ok(record.clone())
    }

    /// CREATED -> CONFIRMED. Fixes `payment_amount` from the estimate at this
    /// moment; a later estimate change never touches it.
    pub async fn confirm_order(&self) -> Result<Order, OrderError> {
        let _guard = self.begin()?;
        let order_id = {
            let record = self.record.lock().await;
            match record.status {
                OrderStatus::Created => record.order_id.clone().ok_or(OrderError::NoOrder)?,
                OrderStatus::Draft => return Err(OrderError::NoOrder),
                from => {
                    return Err(OrderError::InvalidTransition {
                        from,
                        to: OrderStatus::Confirmed,
                    })
                }
            }
        };

        let ack = self
            .store
            .update_status(&order_id, STATUS_ORDER_CONFIRMED)
            .await?;
        if !ack.success {
            return Err(OrderError::Rejected(ack.message.unwrap_or_default()));
        }

        let mut record = self.record.lock().await;
        record.status = OrderStatus::Confirmed;
        record.payment_amount = Some((record.estimated_price * 100.0).round() as i64);
        record.touch();
        tracing::info!(order_id = %order_id, amount = ?record.payment_amount, "order confirmed");
        Ok(record.clone())
    }

    /// CONFIRMED -> PAID on a succeeded charge. A `Pending` outcome leaves the
    /// record CONFIRMED; the final state arrives via the propagation path.
    /// On failure the operation is safely re-callable; every call is a fresh
    /// charge attempt with its own idempotency key downstream.
    pub async fn process_payment(
        &self,
        payment_method_id: &str,
        customer_id: &str,
    ) -> Result<ChargeOutcome, OrderError> {
        let _guard = self.begin()?;
        let (order_id, amount) = {
            let record = self.record.lock().await;
            if record.status != OrderStatus::Confirmed {
                return Err(OrderError::InvalidTransition {
                    from: record.status,
                    to: OrderStatus::Paid,
                });
            }
            let order_id = record.order_id.clone().ok_or(OrderError::NoOrder)?;
            let amount = record.payment_amount.ok_or(OrderError::NoOrder)?;
            (order_id, amount)
        };

        let outcome = self
            .payments
            .charge(ChargeRequest {
                order_id: order_id.clone(),
                customer_id: customer_id.to_string(),
                payment_method_id: payment_method_id.to_string(),
                amount: amount as f64,
                currency: self.currency.clone(),
            })
            .await?;

        match &outcome {
            ChargeOutcome::Succeeded { payment_intent_id } => {
                let mut record = self.record.lock().await;
                record.status = OrderStatus::Paid;
                record.payment_intent_id = Some(payment_intent_id.clone());
                record.touch();
                tracing::info!(order_id = %order_id, intent = %payment_intent_id, "order paid");
            }
            ChargeOutcome::Pending => {
                tracing::info!(order_id = %order_id, "charge still processing at response time");
            }
        }
        Ok(outcome)
    }

    /// CREATED|CONFIRMED -> CANCELLED. On success the in-memory record is
    /// cleared entirely; a cancelled machine is not reusable.
    pub async fn cancel_order(&self) -> Result<(), OrderError> {
        let _guard = self.begin()?;
        let order_id = {
            let record = self.record.lock().await;
            match record.status {
                OrderStatus::Created | OrderStatus::Confirmed => {
                    record.order_id.clone().ok_or(OrderError::NoOrder)?
                }
                from => {
                    return Err(OrderError::InvalidTransition {
                        from,
                        to: OrderStatus::Cancelled,
                    })
                }
            }
        };

        let ack = self.store.update_status(&order_id, STATUS_CANCELLED).await?;
        if !ack.success {
            return Err(OrderError::Rejected(ack.message.unwrap_or_default()));
        }

        let mut record = self.record.lock().await;
        *record = Order {
            status: OrderStatus::Cancelled,
            ..Order::draft()
        };
        tracing::info!(order_id = %order_id, "order cancelled");
        Ok(())
    }

    /// Explicit clear back to a fresh DRAFT.
    pub async fn reset(&self) {
        let mut record = self.record.lock().await;
        *record = Order::draft();
    }

    pub async fn orders_for_user(&self) -> Result<Vec<OrderSummary>, OrderError> {
        Ok(self.store.orders_for_user(&self.user_id).await?)
    }
}
