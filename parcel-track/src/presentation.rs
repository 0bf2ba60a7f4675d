use std::time::Duration;

use tokio::sync::{mpsc, watch};

use crate::event::status;
use crate::reconciler::ReconciledStatus;

/// Display adapter for the driver-found hand-off.
///
/// When the reconciled status reaches DRIVER_ASSIGNED this emits an immediate
/// DRIVER_FOUND acknowledgment, then after the grace period the durable
/// DRIVER_PICKUP stage. Every other view change is forwarded untouched. The
/// delay lives here, not in the reconciler — reconciliation itself is pure.
pub fn driver_found_stages(
    mut rx: watch::Receiver<ReconciledStatus>,
    grace: Duration,
) -> mpsc::UnboundedReceiver<ReconciledStatus> {
    let (tx, out) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let view = rx.borrow_and_update().clone();
            if view.status == status::DRIVER_ASSIGNED {
                let mut found = view.clone();
                found.status = status::DRIVER_FOUND.to_string();
                if tx.send(found).is_err() {
                    break;
                }

                tokio::time::sleep(grace).await;

                // The reconciler may have moved on during the grace period;
                // whatever is current wins.
                let mut latest = rx.borrow_and_update().clone();
                if latest.status == status::DRIVER_ASSIGNED {
                    latest.status = status::DRIVER_PICKUP.to_string();
                }
                if tx.send(latest).is_err() {
                    break;
                }
            } else if tx.send(view).is_err() {
                break;
            }
        }
    });

    out
}
