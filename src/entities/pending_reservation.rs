use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a reservation ledger entry.
///
/// `Committed` is the recovery marker between the inventory commit and the
/// last durable ticket: a confirmation retry that finds it skips the
/// decrement and only tops up missing tickets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReservationStatus {
    Pending,
    Committed,
    Finalized,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Committed => "committed",
            ReservationStatus::Finalized => "finalized",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ReservationStatus::Pending),
            "committed" => Some(ReservationStatus::Committed),
            "finalized" => Some(ReservationStatus::Finalized),
            _ => None,
        }
    }
}

/// A buyer's declared intent to purchase, created at checkout initiation
/// and consumed exactly once by payment confirmation. Holds no stock.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pending_reservations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Externally visible correlation key; the idempotency key for the
    /// whole confirmation flow.
    #[sea_orm(unique)]
    pub transaction_id: String,
    pub buyer_id: Uuid,
    pub event_id: Uuid,
    pub ticket_kind: String,
    pub quantity: i32,
    pub amount: Decimal,
    pub status: String,
    pub external_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn status(&self) -> Option<ReservationStatus> {
        ReservationStatus::from_str(&self.status)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::event::Entity",
        from = "Column::EventId",
        to = "super::event::Column::Id"
    )]
    Event,
}

impl Related<super::event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Event.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();

        if insert {
            if let ActiveValue::NotSet = active_model.id {
                active_model.id = Set(Uuid::new_v4());
            }
            if let ActiveValue::NotSet = active_model.created_at {
                active_model.created_at = Set(now);
            }
        }
        active_model.updated_at = Set(Some(now));

        Ok(active_model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reservation_status_conversion() {
        assert_eq!(ReservationStatus::Pending.as_str(), "pending");
        assert_eq!(ReservationStatus::Committed.as_str(), "committed");
        assert_eq!(ReservationStatus::Finalized.as_str(), "finalized");
        assert_eq!(
            ReservationStatus::from_str("committed"),
            Some(ReservationStatus::Committed)
        );
        assert_eq!(ReservationStatus::from_str("cancelled"), None);
    }
}
