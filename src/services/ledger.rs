//! Reservation ledger: CRUD over pending reservations keyed by
//! transaction id. No business logic lives here.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::pending_reservation::{
    self, Entity as PendingReservationEntity, ReservationStatus,
};
use crate::entities::ticket_type::TicketKind;
use crate::errors::ServiceError;

#[derive(Clone)]
pub struct ReservationLedger {
    db: Arc<DatabaseConnection>,
}

impl ReservationLedger {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Records a new purchase intent. The caller supplies the freshly
    /// generated transaction id; the unique index on `transaction_id`
    /// rejects accidental reuse.
    #[instrument(skip(self))]
    pub async fn create(
        &self,
        transaction_id: &str,
        buyer_id: Uuid,
        event_id: Uuid,
        kind: TicketKind,
        quantity: i32,
        amount: Decimal,
    ) -> Result<pending_reservation::Model, ServiceError> {
        let entry = pending_reservation::ActiveModel {
            transaction_id: Set(transaction_id.to_string()),
            buyer_id: Set(buyer_id),
            event_id: Set(event_id),
            ticket_kind: Set(kind.as_str().to_string()),
            quantity: Set(quantity),
            amount: Set(amount),
            status: Set(ReservationStatus::Pending.as_str().to_string()),
            external_ref: Set(None),
            ..Default::default()
        };

        let model = entry.insert(&*self.db).await?;

        info!(
            transaction_id = %model.transaction_id,
            %buyer_id,
            %event_id,
            quantity,
            "Reservation recorded"
        );

        Ok(model)
    }

    #[instrument(skip(self))]
    pub async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<pending_reservation::Model>, ServiceError> {
        let entry = PendingReservationEntity::find()
            .filter(pending_reservation::Column::TransactionId.eq(transaction_id))
            .one(&*self.db)
            .await?;

        Ok(entry)
    }

    /// Marks the inventory commit durable: `pending` → `committed`. A
    /// confirmation retry that finds this state skips the decrement and
    /// only tops up missing tickets.
    #[instrument(skip(self))]
    pub async fn mark_committed(&self, transaction_id: &str) -> Result<(), ServiceError> {
        PendingReservationEntity::update_many()
            .col_expr(
                pending_reservation::Column::Status,
                Expr::value(ReservationStatus::Committed.as_str()),
            )
            .col_expr(pending_reservation::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(pending_reservation::Column::TransactionId.eq(transaction_id))
            .filter(
                pending_reservation::Column::Status.eq(ReservationStatus::Pending.as_str()),
            )
            .exec(&*self.db)
            .await?;

        Ok(())
    }

    /// Terminal transition, applied only after every ticket is durable.
    /// Finalized rows are kept for the audit trail; the reaper never
    /// touches them.
    #[instrument(skip(self))]
    pub async fn finalize(
        &self,
        transaction_id: &str,
        external_ref: Option<&str>,
    ) -> Result<(), ServiceError> {
        let mut update = PendingReservationEntity::update_many()
            .col_expr(
                pending_reservation::Column::Status,
                Expr::value(ReservationStatus::Finalized.as_str()),
            )
            .col_expr(pending_reservation::Column::UpdatedAt, Expr::value(Utc::now()));

        if let Some(reference) = external_ref {
            update =
                update.col_expr(pending_reservation::Column::ExternalRef, Expr::value(reference));
        }

        update
            .filter(pending_reservation::Column::TransactionId.eq(transaction_id))
            .exec(&*self.db)
            .await?;

        Ok(())
    }

    /// Deletes `pending` entries older than `ttl`. Ledger hygiene only:
    /// abandoned reservations hold no stock, so this is never needed for
    /// inventory correctness.
    #[instrument(skip(self))]
    pub async fn delete_stale_pending(&self, ttl: Duration) -> Result<u64, ServiceError> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(ttl)
                .map_err(|e| ServiceError::InternalError(format!("invalid reaper ttl: {}", e)))?;

        let result = PendingReservationEntity::delete_many()
            .filter(
                pending_reservation::Column::Status.eq(ReservationStatus::Pending.as_str()),
            )
            .filter(pending_reservation::Column::CreatedAt.lt(cutoff))
            .exec(&*self.db)
            .await?;

        Ok(result.rows_affected)
    }
}
