use std::sync::Arc;
use std::time::Duration;

use parcel_core::payment::ChargeOutcome;
use parcel_order::{CarrierType, OrderError, OrderStateMachine, OrderStatus};
use parcel_pay::{MockProcessor, PaymentOrchestrator, RetryPolicy, StatusPropagator};
use parcel_store::{MemoryAttemptStore, MemoryOrderStore};

struct World {
    orders: Arc<MemoryOrderStore>,
    attempts: Arc<MemoryAttemptStore>,
    machine: OrderStateMachine,
}

fn world() -> World {
    let orders = Arc::new(MemoryOrderStore::new());
    let attempts = Arc::new(MemoryAttemptStore::new());
    let propagator = Arc::new(StatusPropagator::new(
        orders.clone(),
        RetryPolicy {
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(20),
            ..RetryPolicy::default()
        },
    ));
    let orchestrator = Arc::new(PaymentOrchestrator::new(
        Arc::new(MockProcessor),
        attempts.clone(),
        propagator,
        Duration::from_secs(55),
    ));
    let machine = OrderStateMachine::new(orders.clone(), orchestrator, "cus_1", "usd");
    World {
        orders,
        attempts,
        machine,
    }
}

async fn wait_for<F: Fn() -> bool>(condition: F) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

#[tokio::test]
async fn test_estimate_confirm_pay_end_to_end() {
    let w = world();

    let order = w
        .machine
        .calculate_estimate("A", "B", 2.0, CarrierType::Car)
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Created);
    let order_id = order.order_id.clone().unwrap();

    let confirmed = w.machine.confirm_order().await.unwrap();
    assert_eq!(confirmed.status, OrderStatus::Confirmed);
    // 10.80 estimated -> 1080 minor units, fixed now.
    assert_eq!(confirmed.payment_amount, Some(1080));

    let outcome = w.machine.process_payment("pm_1", "cus_1").await.unwrap();
    assert!(matches!(outcome, ChargeOutcome::Succeeded { .. }));

    let paid = w.machine.snapshot().await;
    assert_eq!(paid.status, OrderStatus::Paid);
    assert!(paid.payment_intent_id.is_some());

    // The store sees the confirmation synchronously and the payment fact
    // through the background propagation path, each exactly once.
    let orders = w.orders.clone();
    let oid = order_id.clone();
    wait_for(move || {
        orders.status_updates(&oid)
            == vec![
                "ORDER CONFIRMED".to_string(),
                "PAYMENT RECEIVED".to_string(),
            ]
    })
    .await;

    let trail = w.attempts.attempts_for(&order_id);
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].amount, 1080);
}

#[tokio::test]
async fn test_cancel_end_to_end() {
    let w = world();

    let order = w
        .machine
        .calculate_estimate("A", "B", 2.0, CarrierType::Car)
        .await
        .unwrap();
    let order_id = order.order_id.clone().unwrap();

    w.machine.cancel_order().await.unwrap();

    assert_eq!(w.orders.status_updates(&order_id), vec!["CANCELLED".to_string()]);
    assert!(matches!(
        w.machine.process_payment("pm_1", "cus_1").await,
        Err(OrderError::InvalidTransition { .. })
    ));
}

#[tokio::test]
async fn test_declined_payment_is_retryable() {
    let w = world();

    w.machine
        .calculate_estimate("A", "B", 2.0, CarrierType::Car)
        .await
        .unwrap();
    let order_id = w.machine.snapshot().await.order_id.unwrap();
    w.machine.confirm_order().await.unwrap();

    let declined = w.machine.process_payment("pm_declined", "cus_1").await;
    assert!(matches!(declined, Err(OrderError::Payment(_))));
    assert_eq!(w.machine.snapshot().await.status, OrderStatus::Confirmed);

    // A retry is a fresh attempt and can succeed.
    let outcome = w.machine.process_payment("pm_1", "cus_1").await.unwrap();
    assert!(matches!(outcome, ChargeOutcome::Succeeded { .. }));
    assert_eq!(w.machine.snapshot().await.status, OrderStatus::Paid);

    let trail = w.attempts.attempts_for(&order_id);
    assert_eq!(trail.len(), 2);
    assert_ne!(trail[0].idempotency_key, trail[1].idempotency_key);
}
