use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::order::ShipmentStatus;
use crate::errors::ServiceError;

/// Domain events emitted by the order core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderPlaced(Uuid),
    PaymentInitiated {
        order_id: Uuid,
        gateway_order_id: String,
    },
    OrderPaid(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: ShipmentStatus,
        new_status: ShipmentStatus,
    },
    /// A post-persist placement step failed; the order is flagged for
    /// operator reconciliation.
    OrderNeedsReconciliation(Uuid),
    CartCleared {
        username: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), ServiceError> {
        self.sender
            .send(event)
            .await
            .map_err(|e| ServiceError::EventError(format!("failed to send event: {e}")))
    }

    /// Sends an event, logging instead of failing the caller if the
    /// receiver side is gone. Event delivery is best-effort.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event.clone()).await {
            warn!(?event, error = %e, "dropping undeliverable event");
        }
    }
}

/// Background consumer for domain events. Currently logs them; a message
/// queue or outbox would hang off this loop.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    while let Some(event) = rx.recv().await {
        info!(?event, "domain event");
    }
}
