//! Inventory store for per-event, per-tier ticket counters.
//!
//! The only mutation path for stock is [`InventoryService::conditionally_decrement`]:
//! a single conditional UPDATE, never a read followed by a write.

use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::entities::ticket_type::{self, Entity as TicketTypeEntity, TicketKind};
use crate::errors::ServiceError;

/// Service owning the `ticket_types` inventory counters.
#[derive(Clone)]
pub struct InventoryService {
    db: Arc<DatabaseConnection>,
}

impl InventoryService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Atomically moves `amount` units from `quantity_available` to
    /// `quantity_sold`, conditioned on `quantity_available >= amount` at
    /// the moment of the update. Returns whether the update applied.
    ///
    /// Issued as one statement so that concurrent commits for different
    /// transactions racing on the same counter cannot oversell.
    #[instrument(skip(self))]
    pub async fn conditionally_decrement(
        &self,
        event_id: Uuid,
        kind: TicketKind,
        amount: i32,
    ) -> Result<bool, ServiceError> {
        if amount <= 0 {
            return Err(ServiceError::ValidationError(
                "decrement amount must be positive".to_string(),
            ));
        }

        let result = TicketTypeEntity::update_many()
            .col_expr(
                ticket_type::Column::QuantityAvailable,
                Expr::col(ticket_type::Column::QuantityAvailable).sub(amount),
            )
            .col_expr(
                ticket_type::Column::QuantitySold,
                Expr::col(ticket_type::Column::QuantitySold).add(amount),
            )
            .filter(ticket_type::Column::EventId.eq(event_id))
            .filter(ticket_type::Column::Kind.eq(kind.as_str()))
            .filter(ticket_type::Column::QuantityAvailable.gte(amount))
            .exec(&*self.db)
            .await?;

        let applied = result.rows_affected == 1;
        if applied {
            info!(%event_id, kind = kind.as_str(), amount, "Inventory committed");
        } else {
            warn!(%event_id, kind = kind.as_str(), amount, "Conditional decrement rejected");
        }

        Ok(applied)
    }

    /// Administrative correction: adds stock back onto a tier. The one
    /// sanctioned way `quantity_available + quantity_sold` may change over
    /// an event's lifetime.
    #[instrument(skip(self))]
    pub async fn restock(
        &self,
        event_id: Uuid,
        kind: TicketKind,
        additional: i32,
    ) -> Result<ticket_type::Model, ServiceError> {
        if additional <= 0 {
            return Err(ServiceError::ValidationError(
                "restock amount must be positive".to_string(),
            ));
        }

        let result = TicketTypeEntity::update_many()
            .col_expr(
                ticket_type::Column::QuantityAvailable,
                Expr::col(ticket_type::Column::QuantityAvailable).add(additional),
            )
            .filter(ticket_type::Column::EventId.eq(event_id))
            .filter(ticket_type::Column::Kind.eq(kind.as_str()))
            .exec(&*self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "no {} tickets for event {}",
                kind, event_id
            )));
        }

        info!(%event_id, kind = kind.as_str(), additional, "Inventory restocked");

        self.ticket_type(event_id, kind).await?.ok_or_else(|| {
            ServiceError::InternalError("ticket type disappeared during restock".to_string())
        })
    }

    /// Reads one tier's counters. Advisory only — the binding check is the
    /// conditional decrement.
    #[instrument(skip(self))]
    pub async fn ticket_type(
        &self,
        event_id: Uuid,
        kind: TicketKind,
    ) -> Result<Option<ticket_type::Model>, ServiceError> {
        let row = TicketTypeEntity::find()
            .filter(ticket_type::Column::EventId.eq(event_id))
            .filter(ticket_type::Column::Kind.eq(kind.as_str()))
            .one(&*self.db)
            .await?;

        Ok(row)
    }

    /// All tiers for an event, in catalog order.
    #[instrument(skip(self))]
    pub async fn availability(
        &self,
        event_id: Uuid,
    ) -> Result<Vec<ticket_type::Model>, ServiceError> {
        let rows = TicketTypeEntity::find()
            .filter(ticket_type::Column::EventId.eq(event_id))
            .order_by_asc(ticket_type::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        Ok(rows)
    }
}
