use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parcel_core::payment::{AttemptStatus, PaymentAttempt};
use parcel_core::repository::{
    CreatedOrder, OrderDetails, OrderStore, OrderSummary, PaymentAttemptStore, StoreAck,
};
use parcel_core::StoreError;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct StoredOrder {
    order_id: String,
    user_id: String,
    status: String,
    estimated_price: f64,
    created_at: DateTime<Utc>,
    status_log: Vec<String>,
}

/// In-memory order store backing tests and local runs. Assigns ids and
/// quotes prices the way the real store would; rejects unknown ids with a
/// 4xx-classed error per the store contract.
pub struct MemoryOrderStore {
    orders: Mutex<HashMap<String, StoredOrder>>,
    seq: AtomicU64,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self {
            orders: Mutex::new(HashMap::new()),
            seq: AtomicU64::new(0),
        }
    }

    /// Statuses applied to an order, oldest first.
    pub fn status_updates(&self, order_id: &str) -> Vec<String> {
        self.orders
            .lock()
            .unwrap()
            .get(order_id)
            .map(|order| order.status_log.clone())
            .unwrap_or_default()
    }

    fn quote(weight_kg: f64, carrier: &str) -> f64 {
        let base = match carrier {
            "bicycle" => 3.5,
            "car" => 6.0,
            "van" => 9.5,
            "truck" => 14.0,
            _ => 6.0,
        };
        let price = base + weight_kg * 2.4;
        (price * 100.0).round() / 100.0
    }
}

impl Default for MemoryOrderStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn create_order(&self, details: &OrderDetails) -> Result<CreatedOrder, StoreError> {
        let n = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let order_id = format!("o{n}");
        let estimated_price = Self::quote(details.weight_kg, &details.carrier);
        let order = StoredOrder {
            order_id: order_id.clone(),
            user_id: details.user_id.clone(),
            status: "CREATED".to_string(),
            estimated_price,
            created_at: Utc::now(),
            status_log: Vec::new(),
        };
        self.orders.lock().unwrap().insert(order_id.clone(), order);
        tracing::info!(%order_id, estimated_price, "order created");
        Ok(CreatedOrder {
            order_id,
            status: "CREATED".to_string(),
            estimated_price,
        })
    }

    async fn update_status(&self, order_id: &str, status: &str) -> Result<StoreAck, StoreError> {
        let mut orders = self.orders.lock().unwrap();
        let order = orders
            .get_mut(order_id)
            .ok_or_else(|| StoreError::not_found(format!("order {order_id} does not exist")))?;
        order.status = status.to_string();
        order.status_log.push(status.to_string());
        Ok(StoreAck {
            success: true,
            message: Some(format!("status set to {status}")),
        })
    }

    async fn orders_for_user(&self, user_id: &str) -> Result<Vec<OrderSummary>, StoreError> {
        let orders = self.orders.lock().unwrap();
        let mut summaries: Vec<OrderSummary> = orders
            .values()
            .filter(|order| order.user_id == user_id)
            .map(|order| OrderSummary {
                order_id: order.order_id.clone(),
                user_id: order.user_id.clone(),
                status: order.status.clone(),
                estimated_price: order.estimated_price,
                created_at: order.created_at,
            })
            .collect();
        summaries.sort_by(|a, b| a.order_id.cmp(&b.order_id));
        Ok(summaries)
    }
}

/// In-memory `PaymentAttempt` store. Keeps insertion order so attempt
/// sequences read back deterministically.
pub struct MemoryAttemptStore {
    attempts: Mutex<Vec<PaymentAttempt>>,
}

impl MemoryAttemptStore {
    pub fn new() -> Self {
        Self {
            attempts: Mutex::new(Vec::new()),
        }
    }

    /// Attempts recorded for an order, oldest first.
    pub fn attempts_for(&self, order_id: &str) -> Vec<PaymentAttempt> {
        self.attempts
            .lock()
            .unwrap()
            .iter()
            .filter(|attempt| attempt.order_id == order_id)
            .cloned()
            .collect()
    }
}

impl Default for MemoryAttemptStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentAttemptStore for MemoryAttemptStore {
    async fn insert(&self, attempt: &PaymentAttempt) -> Result<(), StoreError> {
        self.attempts.lock().unwrap().push(attempt.clone());
        Ok(())
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: AttemptStatus,
        payment_intent_id: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut attempts = self.attempts.lock().unwrap();
        let attempt = attempts
            .iter_mut()
            .find(|attempt| attempt.id == id)
            .ok_or_else(|| StoreError::not_found(format!("payment attempt {id} does not exist")))?;
        attempt.status = status;
        if let Some(intent_id) = payment_intent_id {
            attempt.payment_intent_id = Some(intent_id.to_string());
        }
        attempt.updated_at = Utc::now();
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<PaymentAttempt>, StoreError> {
        Ok(self
            .attempts
            .lock()
            .unwrap()
            .iter()
            .find(|attempt| attempt.id == id)
            .cloned())
    }

    async fn find_by_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<PaymentAttempt>, StoreError> {
        Ok(self
            .attempts
            .lock()
            .unwrap()
            .iter()
            .find(|attempt| attempt.payment_intent_id.as_deref() == Some(payment_intent_id))
            .cloned())
    }

    async fn for_order(&self, order_id: &str) -> Result<Vec<PaymentAttempt>, StoreError> {
        Ok(self.attempts_for(order_id))
    }
}
