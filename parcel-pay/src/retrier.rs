use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use parcel_core::repository::OrderStore;
use parcel_shared::models::events::PropagationExhaustedEvent;

/// Status written to the order store once a charge has succeeded.
pub const STATUS_PAYMENT_RECEIVED: &str = "PAYMENT RECEIVED";

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            attempt_timeout: Duration::from_secs(5),
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
        }
    }
}

impl RetryPolicy {
    /// `min(base * 2^(attempt-1), cap)`
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        let delay = self.base_delay.saturating_mul(1u32 << shift);
        delay.min(self.max_delay)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropagationOutcome {
    Delivered { attempts: u32 },
    PermanentFailure { attempts: u32 },
    Exhausted { attempts: u32 },
}

/// Delivers one fact — "payment for order X succeeded" — to the order store,
/// tolerating it being transiently slow or down.
///
/// Transient failures (timeout, 5xx, network) are retried with exponential
/// backoff up to the attempt cap. A 4xx is permanent: the request itself is
/// bad, retrying cannot help. Exhaustion is logged and swallowed; the
/// payment already succeeded from the customer's side, and the durable
/// `PaymentAttempt` record is what out-of-band reconciliation works from.
pub struct StatusPropagator {
    store: Arc<dyn OrderStore>,
    policy: RetryPolicy,
    in_flight: Mutex<HashSet<String>>,
}

impl StatusPropagator {
    pub fn new(store: Arc<dyn OrderStore>, policy: RetryPolicy) -> Self {
        Self {
            store,
            policy,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn is_in_flight(&self, order_id: &str) -> bool {
        self.in_flight.lock().unwrap().contains(order_id)
    }

    /// Fire-and-forget entry point used by the payment path. At most one
    /// retry loop runs per order; a second trigger while one is running is
    /// a no-op.
    pub fn propagate_payment_received(self: &Arc<Self>, order_id: String) {
        {
            let mut in_flight = self.in_flight.lock().unwrap();
            if !in_flight.insert(order_id.clone()) {
                tracing::debug!(%order_id, "propagation already in flight, skipping");
                return;
            }
        }

        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.deliver(&order_id).await;
            this.in_flight.lock().unwrap().remove(&order_id);
        });
    }

    /// The bounded retry loop.
    pub async fn deliver(&self, order_id: &str) -> PropagationOutcome {
        for attempt in 1..=self.policy.max_attempts {
            let update = self.store.update_status(order_id, STATUS_PAYMENT_RECEIVED);
            match tokio::time::timeout(self.policy.attempt_timeout, update).await {
                Ok(Ok(ack)) if ack.success => {
                    tracing::info!(%order_id, attempt, "payment status propagated to order store");
                    return PropagationOutcome::Delivered { attempts: attempt };
                }
                Ok(Ok(ack)) => {
                    tracing::error!(
                        %order_id,
                        attempt,
                        message = ?ack.message,
                        "order store refused the payment status update"
                    );
                    return PropagationOutcome::PermanentFailure { attempts: attempt };
                }
                Ok(Err(err)) if err.is_permanent() => {
                    tracing::error!(%order_id, attempt, error = %err, "permanent failure propagating payment status");
                    return PropagationOutcome::PermanentFailure { attempts: attempt };
                }
                Ok(Err(err)) => {
                    tracing::warn!(%order_id, attempt, error = %err, "transient failure propagating payment status");
                }
                Err(_) => {
                    tracing::warn!(%order_id, attempt, "payment status update attempt timed out");
                }
            }

            if attempt < self.policy.max_attempts {
                tokio::time::sleep(self.policy.backoff_delay(attempt)).await;
            }
        }

        let event = PropagationExhaustedEvent {
            order_id: order_id.to_string(),
            attempts: self.policy.max_attempts,
            timestamp: chrono::Utc::now().timestamp(),
        };
        tracing::error!(
            event = ?event,
            "payment status propagation exhausted retries; attempt record left for reconciliation"
        );
        PropagationOutcome::Exhausted {
            attempts: self.policy.max_attempts,
        }
    }
}
