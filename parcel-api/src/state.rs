use std::sync::Arc;
use std::time::Duration;

use parcel_core::repository::{OrderStore, PaymentAttemptStore};
use parcel_pay::PaymentOrchestrator;
use parcel_store::RealtimeHub;

use crate::metrics::Metrics;

#[derive(Clone)]
pub struct AppState {
    pub order_store: Arc<dyn OrderStore>,
    pub attempts: Arc<dyn PaymentAttemptStore>,
    pub orchestrator: Arc<PaymentOrchestrator>,
    pub hub: Arc<RealtimeHub>,
    pub metrics: Arc<Metrics>,
    pub currency: String,
    pub driver_found_grace: Duration,
}
