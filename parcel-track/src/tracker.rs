use serde_json::Value;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::normalizer::normalize;
use crate::reconciler::{ReconciledStatus, Reconciler};

/// A live tracking subscription for one order.
///
/// Pumps raw messages from the real-time feed through the normalizer and
/// reconciler, publishing every view change on a watch channel. Trackers are
/// keyed by order id and independent; any number may run concurrently.
///
/// The subscription ends when `stop` is called or the handle is dropped —
/// the pump task is aborted and the feed receiver released, so a torn-down
/// observer never leaves a subscription draining events for an order nobody
/// watches.
pub struct OrderTracker {
    order_id: String,
    rx: watch::Receiver<ReconciledStatus>,
    pump: JoinHandle<()>,
}

impl OrderTracker {
    pub fn start(order_id: impl Into<String>, mut feed: broadcast::Receiver<Value>) -> Self {
        let order_id = order_id.into();
        let mut reconciler = Reconciler::new(order_id.clone());
        let (tx, rx) = watch::channel(reconciler.view().clone());

        let pump_order = order_id.clone();
        let pump = tokio::spawn(async move {
            loop {
                match feed.recv().await {
                    Ok(raw) => {
                        let Some(event) = normalize(&raw) else { continue };
                        if reconciler.apply(&event) && tx.send(reconciler.view().clone()).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(order_id = %pump_order, skipped, "tracker lagged behind the event feed");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Self { order_id, rx, pump }
    }

    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    /// A watch receiver observing every reconciled view change.
    pub fn subscribe(&self) -> watch::Receiver<ReconciledStatus> {
        self.rx.clone()
    }

    pub fn status(&self) -> ReconciledStatus {
        self.rx.borrow().clone()
    }

    /// Ends the subscription and clears tracking state.
    pub fn stop(self) {}
}

impl Drop for OrderTracker {
    fn drop(&mut self) {
        self.pump.abort();
    }
}
