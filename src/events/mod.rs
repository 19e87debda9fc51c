use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

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
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Fire-and-forget send for the notification boundary: a full or
    /// closed channel is logged and otherwise ignored, never propagated
    /// into the calling transaction.
    pub async fn notify(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Dropping domain event: {}", e);
        }
    }
}

// Define the various events that can occur in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Catalog events
    EventCreated(Uuid),
    EventApproved(Uuid),

    // Reservation events
    ReservationInitiated {
        transaction_id: String,
        event_id: Uuid,
        ticket_kind: String,
        quantity: i32,
    },
    ReservationFinalized {
        transaction_id: String,
        event_id: Uuid,
    },

    // Ticketing events
    TicketIssued {
        ticket_id: Uuid,
        buyer_id: Uuid,
        event_id: Uuid,
        transaction_id: String,
    },
    InventoryExhausted {
        event_id: Uuid,
        ticket_kind: String,
    },
}

/// Consumes the domain event stream. This is the fire-and-forget
/// notification boundary: downstream delivery (email, push) hangs off
/// here; failure never rolls back the transaction that emitted the event.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::EventCreated(id) => info!(event_id = %id, "Event created"),
            Event::EventApproved(id) => info!(event_id = %id, "Event approved"),
            Event::ReservationInitiated {
                transaction_id,
                event_id,
                ticket_kind,
                quantity,
            } => info!(
                %transaction_id,
                %event_id,
                %ticket_kind,
                quantity,
                "Reservation initiated"
            ),
            Event::ReservationFinalized {
                transaction_id,
                event_id,
            } => info!(%transaction_id, %event_id, "Reservation finalized"),
            Event::TicketIssued {
                ticket_id,
                buyer_id,
                event_id,
                transaction_id,
            } => info!(
                %ticket_id,
                %buyer_id,
                %event_id,
                %transaction_id,
                "Ticket issued"
            ),
            Event::InventoryExhausted {
                event_id,
                ticket_kind,
            } => warn!(%event_id, %ticket_kind, "Inventory exhausted"),
        }
    }
    info!("Event channel closed; event processor stopping");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn notify_swallows_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        // Must not panic or error out through the caller.
        sender.notify(Event::EventCreated(Uuid::new_v4())).await;
    }

    #[tokio::test]
    async fn send_delivers_to_processor() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        sender
            .send(Event::InventoryExhausted {
                event_id: Uuid::new_v4(),
                ticket_kind: "VIP".to_string(),
            })
            .await
            .unwrap();
        assert!(matches!(
            rx.recv().await,
            Some(Event::InventoryExhausted { .. })
        ));
    }
}
