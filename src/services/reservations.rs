//! Reservation coordinator: the state machine from checkout initiation to
//! ticket issuance.
//!
//! Guarantees, per transaction id:
//! - inventory is committed at most once, via the store-level conditional
//!   decrement;
//! - the multi-step confirmation sequence is serialized against itself by
//!   a keyed try-lock, so duplicate gateway callbacks and client retries
//!   either replay the finished result or top up missing tickets;
//! - the ledger entry reaches `finalized` only after every ticket row is
//!   durable.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::event::EventStatus;
use crate::entities::pending_reservation::ReservationStatus;
use crate::entities::ticket;
use crate::entities::ticket_type::TicketKind;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::catalog::EventCatalogService;
use crate::services::inventory::InventoryService;
use crate::services::ledger::ReservationLedger;
use crate::services::lock::LockManager;
use crate::services::pricing;
use crate::services::tickets::{IssueTicket, TicketService};

/// Data the client forwards to the payment gateway.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentForm {
    pub transaction_id: String,
    pub amount: Decimal,
    pub product_name: String,
}

/// Result of initiating a reservation.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReservationQuote {
    pub transaction_id: String,
    pub amount: Decimal,
    pub payment_form: PaymentForm,
}

/// Identity attributes stamped onto issued tickets.
#[derive(Debug, Clone, Default)]
pub struct BuyerContact {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Clone)]
pub struct ReservationCoordinator {
    catalog: Arc<EventCatalogService>,
    inventory: Arc<InventoryService>,
    ledger: Arc<ReservationLedger>,
    tickets: Arc<TicketService>,
    locks: Arc<dyn LockManager>,
    event_sender: EventSender,
}

impl ReservationCoordinator {
    pub fn new(
        catalog: Arc<EventCatalogService>,
        inventory: Arc<InventoryService>,
        ledger: Arc<ReservationLedger>,
        tickets: Arc<TicketService>,
        locks: Arc<dyn LockManager>,
        event_sender: EventSender,
    ) -> Self {
        Self {
            catalog,
            inventory,
            ledger,
            tickets,
            locks,
            event_sender,
        }
    }

    /// Records a purchase intent and returns the data the client forwards
    /// to the gateway. Holds no stock: the availability check here is
    /// advisory, the binding one happens at confirmation.
    #[instrument(skip(self))]
    pub async fn initiate_reservation(
        &self,
        buyer_id: Uuid,
        event_id: Uuid,
        kind: TicketKind,
        quantity: i32,
    ) -> Result<ReservationQuote, ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "quantity must be positive".to_string(),
            ));
        }

        let detail = self.catalog.get_event(event_id).await?;
        if detail.event.status != EventStatus::Approved.as_str() {
            return Err(ServiceError::ValidationError(
                "event is not open for ticket sales".to_string(),
            ));
        }

        let policy = pricing::PricingPolicy::from_ticket_types(&detail.ticket_types);
        let unit_price = policy.unit_price(kind)?;

        let tier = detail
            .ticket_types
            .iter()
            .find(|row| row.kind() == Some(kind))
            .ok_or_else(|| {
                ServiceError::NotFound(format!("no {} tickets sold for this event", kind))
            })?;

        if tier.quantity_available < quantity {
            return Err(ServiceError::SoldOut(format!(
                "only {} {} tickets left",
                tier.quantity_available, kind
            )));
        }

        // Reservation amounts are quoted at the base tier price; discounts
        // are applied at issuance from the sale-phase schedule.
        let amount = unit_price * Decimal::from(quantity);
        let transaction_id = Uuid::new_v4().simple().to_string();

        self.ledger
            .create(&transaction_id, buyer_id, event_id, kind, quantity, amount)
            .await?;

        self.event_sender
            .notify(Event::ReservationInitiated {
                transaction_id: transaction_id.clone(),
                event_id,
                ticket_kind: kind.as_str().to_string(),
                quantity,
            })
            .await;

        Ok(ReservationQuote {
            transaction_id: transaction_id.clone(),
            amount,
            payment_form: PaymentForm {
                transaction_id,
                amount,
                product_name: detail.event.title,
            },
        })
    }

    /// Confirms payment for a reservation and returns its tickets, in unit
    /// order. Safe to retry and safe against duplicate callbacks: the full
    /// sequence runs under a per-transaction lock, re-runs return the
    /// already-issued set, and a re-run after a partial failure tops up
    /// missing tickets without touching inventory again.
    #[instrument(skip(self, contact))]
    pub async fn confirm_reservation(
        &self,
        buyer_id: Uuid,
        transaction_id: &str,
        external_ref: Option<&str>,
        contact: BuyerContact,
    ) -> Result<Vec<ticket::Model>, ServiceError> {
        let _guard = self
            .locks
            .try_acquire(&format!("reservation:{}", transaction_id))
            .ok_or_else(|| {
                ServiceError::Conflict(format!(
                    "confirmation already in flight for transaction {}",
                    transaction_id
                ))
            })?;

        let reservation = self
            .ledger
            .find_by_transaction_id(transaction_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("transaction {} not found", transaction_id))
            })?;

        if reservation.buyer_id != buyer_id {
            return Err(ServiceError::Forbidden(
                "reservation belongs to another buyer".to_string(),
            ));
        }

        let status = reservation.status().ok_or_else(|| {
            ServiceError::InternalError(format!(
                "reservation {} has unknown status {}",
                transaction_id, reservation.status
            ))
        })?;

        // Idempotency: a finished confirmation replays its result.
        let mut issued = self.tickets.find_by_transaction_id(transaction_id).await?;
        if issued.len() as i32 >= reservation.quantity {
            if status != ReservationStatus::Finalized {
                // Tickets are all durable; only the terminal transition was
                // lost. Finish it.
                self.ledger.finalize(transaction_id, external_ref).await?;
            }
            info!(
                %transaction_id,
                count = issued.len(),
                "Replaying already-confirmed reservation"
            );
            return Ok(issued);
        }

        let kind: TicketKind = reservation.ticket_kind.parse().map_err(|_| {
            ServiceError::InternalError(format!(
                "reservation {} carries unknown ticket kind {}",
                transaction_id, reservation.ticket_kind
            ))
        })?;

        // Commit inventory exactly once per transaction. `committed`
        // status marks a decrement whose ticket batch is still incomplete.
        if status == ReservationStatus::Pending {
            let applied = self
                .inventory
                .conditionally_decrement(reservation.event_id, kind, reservation.quantity)
                .await?;

            if !applied {
                self.event_sender
                    .notify(Event::InventoryExhausted {
                        event_id: reservation.event_id,
                        ticket_kind: kind.as_str().to_string(),
                    })
                    .await;
                return Err(ServiceError::SoldOut(format!(
                    "{} tickets sold out since the reservation was made",
                    kind
                )));
            }

            self.ledger.mark_committed(transaction_id).await?;
        }

        let detail = self.catalog.get_event(reservation.event_id).await?;
        let policy = pricing::PricingPolicy::from_ticket_types(&detail.ticket_types);
        let unit_price =
            pricing::effective_price(policy.unit_price(kind)?, &detail.sale_phases, Utc::now());

        let have: HashSet<i32> = issued.iter().map(|t| t.unit_index).collect();
        for unit_index in 0..reservation.quantity {
            if have.contains(&unit_index) {
                continue;
            }
            // A failure here leaves the reservation `committed`; the next
            // retry resumes from the missing indexes.
            let ticket = self
                .tickets
                .issue(IssueTicket {
                    buyer_id: reservation.buyer_id,
                    event_id: reservation.event_id,
                    transaction_id: transaction_id.to_string(),
                    unit_index,
                    kind,
                    unit_price,
                    holder_name: contact.name.clone(),
                    holder_email: contact.email.clone(),
                })
                .await
                .map_err(|e| {
                    warn!(
                        %transaction_id,
                        unit_index,
                        "Ticket issuance interrupted; reservation left committed for retry"
                    );
                    e
                })?;

            self.event_sender
                .notify(Event::TicketIssued {
                    ticket_id: ticket.id,
                    buyer_id: ticket.buyer_id,
                    event_id: ticket.event_id,
                    transaction_id: transaction_id.to_string(),
                })
                .await;

            issued.push(ticket);
        }

        self.ledger.finalize(transaction_id, external_ref).await?;
        self.event_sender
            .notify(Event::ReservationFinalized {
                transaction_id: transaction_id.to_string(),
                event_id: reservation.event_id,
            })
            .await;

        issued.sort_by_key(|t| t.unit_index);

        info!(
            %transaction_id,
            count = issued.len(),
            "Reservation confirmed"
        );

        Ok(issued)
    }

    /// Single-unit synchronous booking with no separate payment step. Uses
    /// the same conditional decrement; carries no idempotency key, so a
    /// duplicate submission is a second independent booking.
    #[instrument(skip(self, contact))]
    pub async fn book_direct(
        &self,
        buyer_id: Uuid,
        event_id: Uuid,
        kind: TicketKind,
        contact: BuyerContact,
    ) -> Result<ticket::Model, ServiceError> {
        let detail = self.catalog.get_event(event_id).await?;
        if detail.event.status != EventStatus::Approved.as_str() {
            return Err(ServiceError::ValidationError(
                "event is not open for ticket sales".to_string(),
            ));
        }

        let policy = pricing::PricingPolicy::from_ticket_types(&detail.ticket_types);
        let base_price = policy.unit_price(kind)?;

        let applied = self
            .inventory
            .conditionally_decrement(event_id, kind, 1)
            .await?;
        if !applied {
            self.event_sender
                .notify(Event::InventoryExhausted {
                    event_id,
                    ticket_kind: kind.as_str().to_string(),
                })
                .await;
            return Err(ServiceError::SoldOut(format!(
                "no {} tickets available for this event",
                kind
            )));
        }

        let unit_price = pricing::effective_price(base_price, &detail.sale_phases, Utc::now());
        let transaction_id = format!("direct-{}", Uuid::new_v4().simple());

        let ticket = self
            .tickets
            .issue(IssueTicket {
                buyer_id,
                event_id,
                transaction_id: transaction_id.clone(),
                unit_index: 0,
                kind,
                unit_price,
                holder_name: contact.name,
                holder_email: contact.email,
            })
            .await?;

        self.event_sender
            .notify(Event::TicketIssued {
                ticket_id: ticket.id,
                buyer_id,
                event_id,
                transaction_id,
            })
            .await;

        Ok(ticket)
    }
}
