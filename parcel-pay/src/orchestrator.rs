use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parcel_core::payment::{
    AttemptStatus, Charge, ChargeApi, ChargeError, ChargeOutcome, ChargeRequest, ChargeSpec,
    ChargeStatus, PaymentAttempt, PaymentProcessor, ProcessorError, Refund,
};
use parcel_core::repository::PaymentAttemptStore;
use parcel_shared::models::events::{OrderPaidEvent, PaymentAttemptedEvent, RefundIssuedEvent};
use uuid::Uuid;

use crate::retrier::StatusPropagator;

/// Fractional amounts below this are read as major-unit decimals and scaled
/// to minor units. An integral amount is taken as minor units already — an
/// integral major-unit amount is indistinguishable and will be misread, so
/// callers should send minor units.
const MAJOR_UNIT_CEILING: f64 = 10_000.0;

pub(crate) fn normalize_minor_units(amount: f64) -> i64 {
    if amount.fract().abs() > f64::EPSILON && amount < MAJOR_UNIT_CEILING {
        (amount * 100.0).round() as i64
    } else {
        amount.round() as i64
    }
}

/// Creates charges against the external processor under a hard response-time
/// budget, and decouples "the charge succeeded" from "the order record
/// reflects it".
///
/// The attempt record is persisted before the processor is called, so a
/// crash mid-charge cannot lose the fact that money may have moved. The
/// processor call itself runs detached: when the budget runs out the caller
/// gets a `Pending` answer while the call finishes on its own schedule, and
/// its continuation still records the outcome and fires propagation.
pub struct PaymentOrchestrator {
    processor: Arc<dyn PaymentProcessor>,
    attempts: Arc<dyn PaymentAttemptStore>,
    propagator: Arc<StatusPropagator>,
    budget: Duration,
}

impl PaymentOrchestrator {
    pub fn new(
        processor: Arc<dyn PaymentProcessor>,
        attempts: Arc<dyn PaymentAttemptStore>,
        propagator: Arc<StatusPropagator>,
        budget: Duration,
    ) -> Self {
        Self {
            processor,
            attempts,
            propagator,
            budget,
        }
    }

    pub async fn charge(&self, req: ChargeRequest) -> Result<ChargeOutcome, ChargeError> {
        let amount = normalize_minor_units(req.amount);
        let prior = self
            .attempts
            .for_order(&req.order_id)
            .await
            .map_err(|err| ChargeError::Unavailable(err.to_string()))?;

        let attempt = PaymentAttempt::new(
            req.order_id.clone(),
            req.payment_method_id.clone(),
            req.customer_id.clone(),
            amount,
            req.currency.clone(),
            format!("{}-attempt-{}", req.order_id, prior.len() + 1),
        );
        self.attempts
            .insert(&attempt)
            .await
            .map_err(|err| ChargeError::Unavailable(err.to_string()))?;
        tracing::debug!(
            event = ?PaymentAttemptedEvent {
                attempt_id: attempt.id,
                order_id: attempt.order_id.clone(),
                customer_id: attempt.customer_id.clone(),
                amount_minor: attempt.amount,
                timestamp: chrono::Utc::now().timestamp(),
            },
            "payment attempt recorded"
        );

        let spec = ChargeSpec {
            amount,
            currency: req.currency.clone(),
            customer_id: req.customer_id.clone(),
            payment_method_id: req.payment_method_id.clone(),
            metadata: serde_json::json!({ "order_id": req.order_id }),
            idempotency_key: attempt.idempotency_key.clone(),
        };

        let processor = Arc::clone(&self.processor);
        let attempts = Arc::clone(&self.attempts);
        let propagator = Arc::clone(&self.propagator);
        let attempt_id = attempt.id;
        let order_id = req.order_id.clone();

        let call = tokio::spawn(async move {
            if let Err(err) = processor
                .attach_payment_method(&spec.customer_id, &spec.payment_method_id)
                .await
            {
                tracing::warn!(%order_id, error = %err, "could not attach payment method");
                if let Err(store_err) = attempts.update_status(attempt_id, AttemptStatus::Failed, None).await {
                    tracing::error!(%order_id, error = %store_err, "failed to record attach failure");
                }
                return Err(err);
            }

            let result = processor.create_and_confirm_charge(&spec).await;
            match &result {
                Ok(charge) => match charge.status {
                    ChargeStatus::Succeeded => {
                        if let Err(err) = attempts
                            .update_status(attempt_id, AttemptStatus::Succeeded, Some(&charge.id))
                            .await
                        {
                            tracing::error!(%order_id, error = %err, "failed to record successful charge");
                        }
                        let event = OrderPaidEvent {
                            order_id: order_id.clone(),
                            customer_id: spec.customer_id.clone(),
                            amount_minor: spec.amount,
                            currency: spec.currency.clone(),
                            payment_intent_id: charge.id.clone(),
                            timestamp: chrono::Utc::now().timestamp(),
                        };
                        tracing::info!(event = ?event, "charge succeeded");
                        propagator.propagate_payment_received(order_id.clone());
                    }
                    ChargeStatus::Processing => {
                        if let Err(err) = attempts
                            .update_status(attempt_id, AttemptStatus::Pending, Some(&charge.id))
                            .await
                        {
                            tracing::error!(%order_id, error = %err, "failed to record processing charge");
                        }
                    }
                    ChargeStatus::Failed => {
                        if let Err(err) = attempts
                            .update_status(attempt_id, AttemptStatus::Failed, Some(&charge.id))
                            .await
                        {
                            tracing::error!(%order_id, error = %err, "failed to record failed charge");
                        }
                    }
                },
                Err(err) => {
                    tracing::warn!(%order_id, error = %err, "charge attempt failed");
                    if let Err(store_err) = attempts.update_status(attempt_id, AttemptStatus::Failed, None).await {
                        tracing::error!(%order_id, error = %store_err, "failed to record charge failure");
                    }
                }
            }
            result
        });

        match tokio::time::timeout(self.budget, call).await {
            Ok(Ok(result)) => match result {
                Ok(charge) => match charge.status {
                    ChargeStatus::Succeeded => Ok(ChargeOutcome::Succeeded {
                        payment_intent_id: charge.id,
                    }),
                    ChargeStatus::Processing => Ok(ChargeOutcome::Pending),
                    ChargeStatus::Failed => Err(ChargeError::Declined("charge failed".to_string())),
                },
                Err(ProcessorError::Declined(reason)) => Err(ChargeError::Declined(reason)),
                Err(ProcessorError::Unavailable(reason)) => Err(ChargeError::Unavailable(reason)),
            },
            Ok(Err(join_err)) => Err(ChargeError::Unavailable(format!(
                "charge task failed: {join_err}"
            ))),
            Err(_) => {
                // Budget exhausted. The detached call keeps running; unless
                // its continuation already landed an outcome, mark the
                // attempt pending so the record reflects the open question.
                match self.attempts.get(attempt.id).await {
                    Ok(Some(current)) if current.status == AttemptStatus::Created => {
                        if let Err(err) = self
                            .attempts
                            .update_status(attempt.id, AttemptStatus::Pending, None)
                            .await
                        {
                            tracing::error!(order_id = %req.order_id, error = %err, "failed to mark attempt pending");
                        }
                    }
                    Ok(_) => {}
                    Err(err) => {
                        tracing::error!(order_id = %req.order_id, error = %err, "failed to read attempt after budget expiry");
                    }
                }
                tracing::warn!(order_id = %req.order_id, "charge exceeded the response budget, answering pending");
                Ok(ChargeOutcome::Pending)
            }
        }
    }

    /// Synchronous refund. Marks the attempt refunded; order-status changes
    /// driven by refunds are outside this path.
    pub async fn refund(
        &self,
        payment_intent_id: &str,
        amount: Option<i64>,
    ) -> Result<Refund, ChargeError> {
        let refund = self
            .processor
            .refund(payment_intent_id, amount)
            .await
            .map_err(|err| match err {
                ProcessorError::Declined(reason) => ChargeError::Declined(reason),
                ProcessorError::Unavailable(reason) => ChargeError::Unavailable(reason),
            })?;

        match self.attempts.find_by_intent(payment_intent_id).await {
            Ok(Some(attempt)) => {
                if let Err(err) = self
                    .attempts
                    .update_status(attempt.id, AttemptStatus::Refunded, Some(payment_intent_id))
                    .await
                {
                    tracing::error!(intent = payment_intent_id, error = %err, "failed to mark attempt refunded");
                }
            }
            Ok(None) => {
                tracing::warn!(intent = payment_intent_id, "refund issued for an unknown payment attempt");
            }
            Err(err) => {
                tracing::error!(intent = payment_intent_id, error = %err, "failed to look up attempt for refund");
            }
        }

        let event = RefundIssuedEvent {
            payment_intent_id: payment_intent_id.to_string(),
            amount_minor: amount,
            timestamp: chrono::Utc::now().timestamp(),
        };
        tracing::info!(event = ?event, "refund issued");
        Ok(refund)
    }
}

#[async_trait]
impl ChargeApi for PaymentOrchestrator {
    async fn charge(&self, req: ChargeRequest) -> Result<ChargeOutcome, ChargeError> {
        PaymentOrchestrator::charge(self, req).await
    }
}

/// Always-approve processor for local runs and tests. Magic payment method
/// ids exercise the failure paths.
pub struct MockProcessor;

#[async_trait]
impl PaymentProcessor for MockProcessor {
    async fn attach_payment_method(
        &self,
        _customer_id: &str,
        payment_method_id: &str,
    ) -> Result<(), ProcessorError> {
        if payment_method_id == "pm_invalid" {
            return Err(ProcessorError::Declined("unknown payment method".to_string()));
        }
        Ok(())
    }

    async fn create_and_confirm_charge(&self, spec: &ChargeSpec) -> Result<Charge, ProcessorError> {
        match spec.payment_method_id.as_str() {
            "pm_declined" => Err(ProcessorError::Declined("insufficient funds".to_string())),
            "pm_outage" => Err(ProcessorError::Unavailable(
                "simulated processor outage".to_string(),
            )),
            "pm_slow" => {
                tokio::time::sleep(Duration::from_secs(120)).await;
                Ok(Charge {
                    id: format!("mock_pi_{}", Uuid::new_v4().simple()),
                    status: ChargeStatus::Succeeded,
                })
            }
            _ => Ok(Charge {
                id: format!("mock_pi_{}", Uuid::new_v4().simple()),
                status: ChargeStatus::Succeeded,
            }),
        }
    }

    async fn refund(
        &self,
        _payment_intent_id: &str,
        _amount: Option<i64>,
    ) -> Result<Refund, ProcessorError> {
        Ok(Refund {
            id: format!("mock_re_{}", Uuid::new_v4().simple()),
            status: "succeeded".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrier::RetryPolicy;
    use parcel_core::repository::{OrderDetails, OrderStore};
    use parcel_store::memory::{MemoryAttemptStore, MemoryOrderStore};
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_amount_normalization_heuristic() {
        // Fractional values are major-unit decimals.
        assert_eq!(normalize_minor_units(65.22), 6522);
        assert_eq!(normalize_minor_units(0.5), 50);
        // Integral values are minor units already.
        assert_eq!(normalize_minor_units(6522.0), 6522);
        // The documented ambiguity: an integral major-unit amount is read
        // as minor units.
        assert_eq!(normalize_minor_units(10.0), 10);
    }

    struct Fixture {
        orders: Arc<MemoryOrderStore>,
        attempts: Arc<MemoryAttemptStore>,
        orchestrator: PaymentOrchestrator,
    }

    fn fixture(budget: Duration) -> Fixture {
        let orders = Arc::new(MemoryOrderStore::new());
        let attempts = Arc::new(MemoryAttemptStore::new());
        let propagator = Arc::new(StatusPropagator::new(
            orders.clone(),
            RetryPolicy::default(),
        ));
        let orchestrator = PaymentOrchestrator::new(
            Arc::new(MockProcessor),
            attempts.clone(),
            propagator,
            budget,
        );
        Fixture {
            orders,
            attempts,
            orchestrator,
        }
    }

    async fn seed_order(orders: &MemoryOrderStore) -> String {
        orders
            .create_order(&OrderDetails {
                user_id: "cus_1".to_string(),
                pickup: "A".to_string(),
                dropoff: "B".to_string(),
                weight_kg: 2.0,
                carrier: "car".to_string(),
            })
            .await
            .unwrap()
            .order_id
    }

    fn charge_request(order_id: &str, payment_method_id: &str) -> ChargeRequest {
        ChargeRequest {
            order_id: order_id.to_string(),
            customer_id: "cus_1".to_string(),
            payment_method_id: payment_method_id.to_string(),
            amount: 6522.0,
            currency: "usd".to_string(),
        }
    }

    async fn wait_for<F: Fn() -> bool>(condition: F) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_charge_propagates_exactly_once() {
        let f = fixture(Duration::from_secs(55));
        let order_id = seed_order(&f.orders).await;

        let outcome = f.orchestrator.charge(charge_request(&order_id, "pm_1")).await.unwrap();

        let intent_id = match outcome {
            ChargeOutcome::Succeeded { payment_intent_id } => payment_intent_id,
            other => panic!("expected success, got {other:?}"),
        };
        assert!(intent_id.starts_with("mock_pi_"));

        // The attempt record carries the outcome.
        let attempts = f.attempts.attempts_for(&order_id);
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].status, AttemptStatus::Succeeded);
        assert_eq!(attempts[0].amount, 6522);
        assert_eq!(attempts[0].idempotency_key, format!("{order_id}-attempt-1"));

        // Exactly one PAYMENT RECEIVED update lands, eventually.
        let orders = f.orders.clone();
        let oid = order_id.clone();
        wait_for(move || orders.status_updates(&oid) == vec!["PAYMENT RECEIVED".to_string()]).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_is_persisted_before_the_processor_answers() {
        let f = fixture(Duration::from_secs(55));
        let order_id = seed_order(&f.orders).await;

        let result = f.orchestrator.charge(charge_request(&order_id, "pm_declined")).await;

        assert!(matches!(result, Err(ChargeError::Declined(_))));
        // The record survives the failure with its final status.
        let attempts = f.attempts.attempts_for(&order_id);
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].status, AttemptStatus::Failed);
        // And no propagation fired.
        assert!(f.orders.status_updates(&order_id).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_overrun_answers_pending_and_still_lands() {
        let f = fixture(Duration::from_secs(55));
        let order_id = seed_order(&f.orders).await;

        // pm_slow takes 120s against a 55s budget.
        let outcome = f.orchestrator.charge(charge_request(&order_id, "pm_slow")).await.unwrap();
        assert_eq!(outcome, ChargeOutcome::Pending);

        let attempts = f.attempts.attempts_for(&order_id);
        assert_eq!(attempts[0].status, AttemptStatus::Pending);

        // Jump past the processor's remaining latency; the detached call
        // completes and still drives propagation.
        tokio::time::advance(Duration::from_secs(70)).await;
        let attempts_store = f.attempts.clone();
        let oid = order_id.clone();
        wait_for(move || {
            attempts_store
                .attempts_for(&oid)
                .first()
                .is_some_and(|a| a.status == AttemptStatus::Succeeded)
        })
        .await;

        let orders = f.orders.clone();
        let oid = order_id.clone();
        wait_for(move || orders.status_updates(&oid) == vec!["PAYMENT RECEIVED".to_string()]).await;
    }

    struct IntrospectingProcessor {
        attempts: Arc<MemoryAttemptStore>,
        saw_created_attempt: AtomicBool,
    }

    #[async_trait]
    impl PaymentProcessor for IntrospectingProcessor {
        async fn attach_payment_method(
            &self,
            _customer_id: &str,
            _payment_method_id: &str,
        ) -> Result<(), ProcessorError> {
            Ok(())
        }

        async fn create_and_confirm_charge(
            &self,
            spec: &ChargeSpec,
        ) -> Result<Charge, ProcessorError> {
            let order_id = spec.metadata["order_id"].as_str().unwrap_or_default().to_string();
            let recorded = self.attempts.attempts_for(&order_id);
            if recorded
                .iter()
                .any(|a| a.status == AttemptStatus::Created && a.idempotency_key == spec.idempotency_key)
            {
                self.saw_created_attempt.store(true, Ordering::SeqCst);
            }
            Ok(Charge {
                id: "pi_1".to_string(),
                status: ChargeStatus::Succeeded,
            })
        }

        async fn refund(
            &self,
            _payment_intent_id: &str,
            _amount: Option<i64>,
        ) -> Result<Refund, ProcessorError> {
            unimplemented!("not used")
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_record_exists_when_the_processor_is_called() {
        let orders = Arc::new(MemoryOrderStore::new());
        let attempts = Arc::new(MemoryAttemptStore::new());
        let processor = Arc::new(IntrospectingProcessor {
            attempts: attempts.clone(),
            saw_created_attempt: AtomicBool::new(false),
        });
        let propagator = Arc::new(StatusPropagator::new(orders.clone(), RetryPolicy::default()));
        let orchestrator = PaymentOrchestrator::new(
            processor.clone(),
            attempts.clone(),
            propagator,
            Duration::from_secs(55),
        );
        let order_id = seed_order(&orders).await;

        let outcome = orchestrator.charge(charge_request(&order_id, "pm_1")).await.unwrap();

        assert_eq!(
            outcome,
            ChargeOutcome::Succeeded {
                payment_intent_id: "pi_1".to_string()
            }
        );
        assert!(
            processor.saw_created_attempt.load(Ordering::SeqCst),
            "the attempt must be durable before the external call"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_retried_charges_get_fresh_idempotency_keys() {
        let f = fixture(Duration::from_secs(55));
        let order_id = seed_order(&f.orders).await;

        let _ = f.orchestrator.charge(charge_request(&order_id, "pm_outage")).await;
        let _ = f.orchestrator.charge(charge_request(&order_id, "pm_1")).await;

        let attempts = f.attempts.attempts_for(&order_id);
        assert_eq!(attempts.len(), 2);
        assert_ne!(attempts[0].idempotency_key, attempts[1].idempotency_key);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refund_marks_the_attempt() {
        let f = fixture(Duration::from_secs(55));
        let order_id = seed_order(&f.orders).await;

        let outcome = f.orchestrator.charge(charge_request(&order_id, "pm_1")).await.unwrap();
        let intent_id = match outcome {
            ChargeOutcome::Succeeded { payment_intent_id } => payment_intent_id,
            other => panic!("expected success, got {other:?}"),
        };

        let refund = f.orchestrator.refund(&intent_id, Some(1000)).await.unwrap();

        assert_eq!(refund.status, "succeeded");
        let attempts = f.attempts.attempts_for(&order_id);
        assert_eq!(attempts[0].status, AttemptStatus::Refunded);
    }
}
