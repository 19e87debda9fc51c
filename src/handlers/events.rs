use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::entities::ticket_type::TicketKind;
use crate::errors::ServiceError;
use crate::services::catalog::{EventDetail, NewEvent, NewSalePhase, NewTicketType};
use crate::{ApiResponse, AppState, ListQuery, PaginatedResponse};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateEventRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 5000))]
    pub description: String,
    #[validate(length(min = 1, max = 200))]
    pub organized_by: String,
    pub event_date: DateTime<Utc>,
    #[validate(length(min = 1, max = 500))]
    pub location: String,
    pub image: Option<String>,
    pub ticket_types: Vec<TicketTypeInput>,
    #[serde(default)]
    pub sale_phases: Vec<SalePhaseInput>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TicketTypeInput {
    pub kind: TicketKind,
    pub unit_price: Decimal,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SalePhaseInput {
    pub phase_name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub discount_percent: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TicketTypeResponse {
    pub kind: String,
    pub unit_price: Decimal,
    pub quantity_available: i32,
    pub quantity_sold: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SalePhaseResponse {
    pub phase_name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub discount_percent: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EventResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub organized_by: String,
    pub event_date: DateTime<Utc>,
    pub location: String,
    pub image: Option<String>,
    pub likes: i32,
    pub status: String,
    pub ticket_types: Vec<TicketTypeResponse>,
    pub sale_phases: Vec<SalePhaseResponse>,
}

impl From<EventDetail> for EventResponse {
    fn from(detail: EventDetail) -> Self {
        Self {
            id: detail.event.id,
            title: detail.event.title,
            description: detail.event.description,
            organized_by: detail.event.organized_by,
            event_date: detail.event.event_date,
            location: detail.event.location,
            image: detail.event.image,
            likes: detail.event.likes,
            status: detail.event.status,
            ticket_types: detail
                .ticket_types
                .into_iter()
                .map(|row| TicketTypeResponse {
                    kind: row.kind,
                    unit_price: row.unit_price,
                    quantity_available: row.quantity_available,
                    quantity_sold: row.quantity_sold,
                })
                .collect(),
            sale_phases: detail
                .sale_phases
                .into_iter()
                .map(|row| SalePhaseResponse {
                    phase_name: row.phase_name,
                    start_date: row.start_date,
                    end_date: row.end_date,
                    discount_percent: row.discount_percent,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EventSummary {
    pub id: Uuid,
    pub title: String,
    pub organized_by: String,
    pub event_date: DateTime<Utc>,
    pub location: String,
    pub likes: i32,
    pub status: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RestockRequest {
    pub kind: TicketKind,
    #[validate(range(min = 1))]
    pub additional_quantity: i32,
}

#[utoipa::path(
    post,
    path = "/api/v1/events",
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event created", body = EventResponse),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse),
        (status = 403, description = "Caller may not create events", body = crate::errors::ErrorResponse)
    ),
    tag = "Events"
)]
pub async fn create_event(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    if !user.role.can_manage_events() {
        return Err(ServiceError::Forbidden(
            "only organizers and admins may create events".to_string(),
        ));
    }
    req.validate()?;

    let input = NewEvent {
        title: req.title,
        description: req.description,
        organized_by: req.organized_by,
        event_date: req.event_date,
        location: req.location,
        image: req.image,
        ticket_types: req
            .ticket_types
            .into_iter()
            .map(|t| NewTicketType {
                kind: t.kind,
                unit_price: t.unit_price,
                quantity: t.quantity,
            })
            .collect(),
        sale_phases: req
            .sale_phases
            .into_iter()
            .map(|p| NewSalePhase {
                phase_name: p.phase_name,
                start_date: p.start_date,
                end_date: p.end_date,
                discount_percent: p.discount_percent,
            })
            .collect(),
    };

    let detail = state
        .services
        .catalog
        .create_event(user.id, user.role.is_admin(), input)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(EventResponse::from(detail))),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/events",
    responses(
        (status = 200, description = "Paginated event listing")
    ),
    tag = "Events"
)]
pub async fn list_events(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let include_unapproved = user.map(|u| u.role.is_admin()).unwrap_or(false);

    let (items, total) = state
        .services
        .catalog
        .list_events(query.page, query.limit, include_unapproved)
        .await?;

    let total_pages = total.div_ceil(query.limit);
    let items = items
        .into_iter()
        .map(|event| EventSummary {
            id: event.id,
            title: event.title,
            organized_by: event.organized_by,
            event_date: event.event_date,
            location: event.location,
            likes: event.likes,
            status: event.status,
        })
        .collect();

    Ok(Json(ApiResponse::success(PaginatedResponse {
        items,
        total,
        page: query.page,
        limit: query.limit,
        total_pages,
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/events/{id}",
    params(("id" = Uuid, Path, description = "Event id")),
    responses(
        (status = 200, description = "Event with tiers and phases", body = EventResponse),
        (status = 404, description = "Event not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Events"
)]
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let detail = state.services.catalog.get_event(id).await?;
    Ok(Json(ApiResponse::success(EventResponse::from(detail))))
}

#[utoipa::path(
    post,
    path = "/api/v1/events/{id}/approve",
    params(("id" = Uuid, Path, description = "Event id")),
    responses(
        (status = 200, description = "Event approved"),
        (status = 403, description = "Admin only", body = crate::errors::ErrorResponse),
        (status = 404, description = "Event not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Events"
)]
pub async fn approve_event(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    if !user.role.is_admin() {
        return Err(ServiceError::Forbidden(
            "only admins may approve events".to_string(),
        ));
    }

    let updated = state.services.catalog.approve_event(id).await?;

    Ok(Json(ApiResponse::success(EventSummary {
        id: updated.id,
        title: updated.title,
        organized_by: updated.organized_by,
        event_date: updated.event_date,
        location: updated.location,
        likes: updated.likes,
        status: updated.status,
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/events/{id}/like",
    params(("id" = Uuid, Path, description = "Event id")),
    responses(
        (status = 200, description = "Likes counter after the bump"),
        (status = 404, description = "Event not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Events"
)]
pub async fn like_event(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let updated = state.services.catalog.like_event(id).await?;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "id": updated.id, "likes": updated.likes }),
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/events/{id}/restock",
    params(("id" = Uuid, Path, description = "Event id")),
    request_body = RestockRequest,
    responses(
        (status = 200, description = "Tier counters after the correction", body = TicketTypeResponse),
        (status = 403, description = "Admin only", body = crate::errors::ErrorResponse),
        (status = 404, description = "Event or tier not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Events"
)]
pub async fn restock_event(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<RestockRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    if !user.role.is_admin() {
        return Err(ServiceError::Forbidden(
            "only admins may adjust inventory".to_string(),
        ));
    }
    req.validate()?;

    let row = state
        .services
        .inventory
        .restock(id, req.kind, req.additional_quantity)
        .await?;

    Ok(Json(ApiResponse::success(TicketTypeResponse {
        kind: row.kind,
        unit_price: row.unit_price,
        quantity_available: row.quantity_available,
        quantity_sold: row.quantity_sold,
    })))
}
