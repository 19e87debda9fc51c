use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Recognized ticket tiers. The string form is what the wire and the
/// `ticket_types.kind` column carry.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    utoipa::ToSchema,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
pub enum TicketKind {
    General,
    FanFest,
    #[strum(serialize = "VIP")]
    #[serde(rename = "VIP")]
    Vip,
}

impl TicketKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketKind::General => "General",
            TicketKind::FanFest => "FanFest",
            TicketKind::Vip => "VIP",
        }
    }
}

/// Per-event, per-tier inventory row. `quantity_available` and
/// `quantity_sold` are mutated only through the conditional-decrement
/// primitive in `services::inventory`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ticket_types")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub event_id: Uuid,
    pub kind: String,
    pub unit_price: Decimal,
    pub quantity_available: i32,
    pub quantity_sold: i32,
    pub created_at: DateTime<Utc>,
}

impl Model {
    pub fn kind(&self) -> Option<TicketKind> {
        self.kind.parse().ok()
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

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticket_kind_round_trips_through_strings() {
        assert_eq!(TicketKind::General.as_str(), "General");
        assert_eq!(TicketKind::FanFest.as_str(), "FanFest");
        assert_eq!(TicketKind::Vip.as_str(), "VIP");

        assert_eq!("VIP".parse::<TicketKind>().ok(), Some(TicketKind::Vip));
        assert_eq!(
            "FanFest".parse::<TicketKind>().ok(),
            Some(TicketKind::FanFest)
        );
        assert!("Backstage".parse::<TicketKind>().is_err());
    }

    #[test]
    fn ticket_kind_serde_uses_wire_names() {
        assert_eq!(
            serde_json::to_string(&TicketKind::Vip).unwrap(),
            "\"VIP\""
        );
        let parsed: TicketKind = serde_json::from_str("\"General\"").unwrap();
        assert_eq!(parsed, TicketKind::General);
    }
}
