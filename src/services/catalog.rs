//! Event catalog: events, their ticket tiers, and sale phases.
//!
//! Read-only from the coordinator's perspective except for the inventory
//! counters, which belong to `services::inventory`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::event::{self, Entity as EventEntity, EventStatus};
use crate::entities::sale_phase::{self, Entity as SalePhaseEntity};
use crate::entities::ticket_type::{self, Entity as TicketTypeEntity, TicketKind};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

/// Input for one inventory tier of a new event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTicketType {
    pub kind: TicketKind,
    pub unit_price: Decimal,
    pub quantity: i32,
}

/// Input for one scheduled discount window of a new event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSalePhase {
    pub phase_name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub discount_percent: i32,
}

/// Input for creating a catalog event.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub organized_by: String,
    pub event_date: DateTime<Utc>,
    pub location: String,
    pub image: Option<String>,
    pub ticket_types: Vec<NewTicketType>,
    pub sale_phases: Vec<NewSalePhase>,
}

/// An event together with its tiers and phases.
#[derive(Debug, Clone, Serialize)]
pub struct EventDetail {
    pub event: event::Model,
    pub ticket_types: Vec<ticket_type::Model>,
    pub sale_phases: Vec<sale_phase::Model>,
}

#[derive(Clone)]
pub struct EventCatalogService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl EventCatalogService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Creates an event with its tiers and phases in one transaction.
    /// Admin-created events go live immediately; organizer submissions
    /// wait for moderation.
    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create_event(
        &self,
        owner_id: Uuid,
        auto_approve: bool,
        input: NewEvent,
    ) -> Result<EventDetail, ServiceError> {
        validate_new_event(&input)?;

        let status = if auto_approve {
            EventStatus::Approved
        } else {
            EventStatus::Pending
        };

        let txn = self.db.begin().await?;

        let event_row = event::ActiveModel {
            owner_id: Set(owner_id),
            title: Set(input.title.clone()),
            description: Set(input.description),
            organized_by: Set(input.organized_by),
            event_date: Set(input.event_date),
            location: Set(input.location),
            image: Set(input.image),
            likes: Set(0),
            status: Set(status.as_str().to_string()),
            ..Default::default()
        };
        let event_model = event_row.insert(&txn).await?;

        let mut ticket_rows = Vec::with_capacity(input.ticket_types.len());
        for tier in &input.ticket_types {
            let row = ticket_type::ActiveModel {
                id: Set(Uuid::new_v4()),
                event_id: Set(event_model.id),
                kind: Set(tier.kind.as_str().to_string()),
                unit_price: Set(tier.unit_price),
                quantity_available: Set(tier.quantity),
                quantity_sold: Set(0),
                created_at: Set(Utc::now()),
            };
            ticket_rows.push(row.insert(&txn).await?);
        }

        let mut phase_rows = Vec::with_capacity(input.sale_phases.len());
        for phase in &input.sale_phases {
            let row = sale_phase::ActiveModel {
                id: Set(Uuid::new_v4()),
                event_id: Set(event_model.id),
                phase_name: Set(phase.phase_name.clone()),
                start_date: Set(phase.start_date),
                end_date: Set(phase.end_date),
                discount_percent: Set(phase.discount_percent),
            };
            phase_rows.push(row.insert(&txn).await?);
        }

        txn.commit().await?;

        self.event_sender.notify(Event::EventCreated(event_model.id)).await;

        info!(event_id = %event_model.id, status = status.as_str(), "Event created");

        Ok(EventDetail {
            event: event_model,
            ticket_types: ticket_rows,
            sale_phases: phase_rows,
        })
    }

    /// Fetches an event with its tiers and phases.
    #[instrument(skip(self))]
    pub async fn get_event(&self, event_id: Uuid) -> Result<EventDetail, ServiceError> {
        let event_model = EventEntity::find_by_id(event_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Event {} not found", event_id)))?;

        let ticket_types = TicketTypeEntity::find()
            .filter(ticket_type::Column::EventId.eq(event_id))
            .order_by_asc(ticket_type::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        let sale_phases = SalePhaseEntity::find()
            .filter(sale_phase::Column::EventId.eq(event_id))
            .order_by_asc(sale_phase::Column::StartDate)
            .all(&*self.db)
            .await?;

        Ok(EventDetail {
            event: event_model,
            ticket_types,
            sale_phases,
        })
    }

    /// Lists events with pagination. Plain users only see approved events;
    /// moderators may include pending submissions.
    #[instrument(skip(self))]
    pub async fn list_events(
        &self,
        page: u64,
        limit: u64,
        include_unapproved: bool,
    ) -> Result<(Vec<event::Model>, u64), ServiceError> {
        if page == 0 {
            return Err(ServiceError::ValidationError(
                "Page number must be greater than 0".to_string(),
            ));
        }
        if limit == 0 || limit > 200 {
            return Err(ServiceError::ValidationError(
                "Limit must be between 1 and 200".to_string(),
            ));
        }

        let mut query = EventEntity::find();
        if !include_unapproved {
            query = query.filter(event::Column::Status.eq(EventStatus::Approved.as_str()));
        }
        query = query.order_by_asc(event::Column::EventDate);

        let paginator = query.paginate(&*self.db, limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page - 1).await?;

        Ok((items, total))
    }

    /// Moderation: flips a submission to approved.
    #[instrument(skip(self))]
    pub async fn approve_event(&self, event_id: Uuid) -> Result<event::Model, ServiceError> {
        let event_model = EventEntity::find_by_id(event_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Event {} not found", event_id)))?;

        if event_model.status == EventStatus::Approved.as_str() {
            return Err(ServiceError::ValidationError(
                "Event is already approved".to_string(),
            ));
        }

        let mut active: event::ActiveModel = event_model.into();
        active.status = Set(EventStatus::Approved.as_str().to_string());
        let updated = active.update(&*self.db).await?;

        self.event_sender.notify(Event::EventApproved(event_id)).await;

        info!(%event_id, "Event approved");

        Ok(updated)
    }

    /// Bumps the likes counter in a single atomic update.
    #[instrument(skip(self))]
    pub async fn like_event(&self, event_id: Uuid) -> Result<event::Model, ServiceError> {
        let result = EventEntity::update_many()
            .col_expr(event::Column::Likes, Expr::col(event::Column::Likes).add(1))
            .filter(event::Column::Id.eq(event_id))
            .exec(&*self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Event {} not found",
                event_id
            )));
        }

        EventEntity::find_by_id(event_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Event {} not found", event_id)))
    }
}

fn validate_new_event(input: &NewEvent) -> Result<(), ServiceError> {
    if input.title.trim().is_empty() {
        return Err(ServiceError::ValidationError(
            "Event title must not be empty".to_string(),
        ));
    }
    if input.ticket_types.is_empty() {
        return Err(ServiceError::ValidationError(
            "Event must define at least one ticket type".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for tier in &input.ticket_types {
        if !seen.insert(tier.kind) {
            return Err(ServiceError::ValidationError(format!(
                "Duplicate ticket type {}",
                tier.kind
            )));
        }
        if tier.quantity <= 0 {
            return Err(ServiceError::ValidationError(format!(
                "{} ticket quantity must be positive",
                tier.kind
            )));
        }
        if tier.unit_price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "{} ticket price must not be negative",
                tier.kind
            )));
        }
    }

    for phase in &input.sale_phases {
        if phase.start_date > phase.end_date {
            return Err(ServiceError::ValidationError(format!(
                "Sale phase {} ends before it starts",
                phase.phase_name
            )));
        }
        if !(0..=100).contains(&phase.discount_percent) {
            return Err(ServiceError::ValidationError(format!(
                "Sale phase {} discount must be between 0 and 100",
                phase.phase_name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn base_input() -> NewEvent {
        NewEvent {
            title: "Concert A".to_string(),
            description: "An evening of noise".to_string(),
            organized_by: "Gatepass Live".to_string(),
            event_date: Utc::now() + chrono::Duration::days(30),
            location: "Riverside Arena".to_string(),
            image: None,
            ticket_types: vec![NewTicketType {
                kind: TicketKind::General,
                unit_price: dec!(25.00),
                quantity: 100,
            }],
            sale_phases: vec![],
        }
    }

    #[test]
    fn accepts_well_formed_input() {
        assert!(validate_new_event(&base_input()).is_ok());
    }

    #[test]
    fn rejects_empty_tier_list() {
        let mut input = base_input();
        input.ticket_types.clear();
        assert!(validate_new_event(&input).is_err());
    }

    #[test]
    fn rejects_duplicate_tiers() {
        let mut input = base_input();
        input.ticket_types.push(NewTicketType {
            kind: TicketKind::General,
            unit_price: dec!(30.00),
            quantity: 10,
        });
        assert!(validate_new_event(&input).is_err());
    }

    #[test]
    fn rejects_non_positive_quantity_and_negative_price() {
        let mut input = base_input();
        input.ticket_types[0].quantity = 0;
        assert!(validate_new_event(&input).is_err());

        let mut input = base_input();
        input.ticket_types[0].unit_price = dec!(-1.00);
        assert!(validate_new_event(&input).is_err());
    }

    #[test]
    fn rejects_inverted_or_overdiscounted_phase() {
        let now = Utc::now();
        let mut input = base_input();
        input.sale_phases.push(NewSalePhase {
            phase_name: "backwards".to_string(),
            start_date: now,
            end_date: now - chrono::Duration::days(1),
            discount_percent: 10,
        });
        assert!(validate_new_event(&input).is_err());

        let mut input = base_input();
        input.sale_phases.push(NewSalePhase {
            phase_name: "too generous".to_string(),
            start_date: now,
            end_date: now + chrono::Duration::days(1),
            discount_percent: 120,
        });
        assert!(validate_new_event(&input).is_err());
    }
}
