use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::entities::ticket;
use crate::entities::ticket_type::TicketKind;
use crate::errors::ServiceError;
use crate::services::reservations::BuyerContact;
use crate::{ApiResponse, AppState};

#[derive(Debug, Serialize, ToSchema)]
pub struct TicketResponse {
    pub id: Uuid,
    pub event_id: Uuid,
    pub transaction_id: String,
    pub unit_index: i32,
    pub ticket_kind: String,
    pub unit_price: Decimal,
    pub holder_name: Option<String>,
    pub qr_payload: String,
    pub issued_at: DateTime<Utc>,
}

impl From<ticket::Model> for TicketResponse {
    fn from(model: ticket::Model) -> Self {
        Self {
            id: model.id,
            event_id: model.event_id,
            transaction_id: model.transaction_id,
            unit_index: model.unit_index,
            ticket_kind: model.ticket_kind,
            unit_price: model.unit_price,
            holder_name: model.holder_name,
            qr_payload: model.qr_payload,
            issued_at: model.issued_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BookDirectRequest {
    pub ticket_kind: TicketKind,
    pub holder_name: Option<String>,
    pub holder_email: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TicketVerification {
    pub valid: bool,
    pub buyer_id: Uuid,
    pub event_id: Uuid,
    pub transaction_id: String,
    pub unit_index: i32,
    pub issued_at: DateTime<Utc>,
}

#[utoipa::path(
    post,
    path = "/api/v1/events/{id}/book",
    params(("id" = Uuid, Path, description = "Event id")),
    request_body = BookDirectRequest,
    responses(
        (status = 201, description = "Ticket booked", body = TicketResponse),
        (status = 404, description = "Unknown event or ticket type", body = crate::errors::ErrorResponse),
        (status = 422, description = "No tickets available", body = crate::errors::ErrorResponse)
    ),
    tag = "Tickets"
)]
pub async fn book_direct(
    State(state): State<AppState>,
    user: AuthUser,
    Path(event_id): Path<Uuid>,
    Json(req): Json<BookDirectRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let contact = BuyerContact {
        name: req.holder_name.or(user.name),
        email: req.holder_email.or(user.email),
    };

    let ticket = state
        .services
        .reservations
        .book_direct(user.id, event_id, req.ticket_kind, contact)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(TicketResponse::from(ticket))),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/tickets",
    responses(
        (status = 200, description = "The caller's tickets, newest first")
    ),
    tag = "Tickets"
)]
pub async fn list_my_tickets(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    let tickets = state.services.tickets.list_for_buyer(user.id).await?;
    let tickets: Vec<TicketResponse> = tickets.into_iter().map(TicketResponse::from).collect();
    Ok(Json(ApiResponse::success(tickets)))
}

#[utoipa::path(
    get,
    path = "/api/v1/tickets/{id}/verify",
    params(("id" = Uuid, Path, description = "Ticket id")),
    responses(
        (status = 200, description = "Decoded, verified QR claims", body = TicketVerification),
        (status = 400, description = "Payload failed verification", body = crate::errors::ErrorResponse),
        (status = 404, description = "Ticket not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Tickets"
)]
pub async fn verify_ticket(
    State(state): State<AppState>,
    user: AuthUser,
    Path(ticket_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let ticket = state
        .services
        .tickets
        .get(ticket_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Ticket {} not found", ticket_id)))?;

    // Scanners run with organizer or admin credentials; buyers may verify
    // their own tickets.
    if ticket.buyer_id != user.id && !user.role.can_manage_events() {
        return Err(ServiceError::Forbidden(
            "ticket belongs to another buyer".to_string(),
        ));
    }

    let claims = state.services.tickets.verify_payload(&ticket.qr_payload)?;

    // The payload must agree with the row it is stored on.
    let consistent = claims.buyer_id == ticket.buyer_id
        && claims.event_id == ticket.event_id
        && claims.transaction_id == ticket.transaction_id
        && claims.unit_index == ticket.unit_index;
    if !consistent {
        return Err(ServiceError::ValidationError(
            "qr payload does not match the ticket record".to_string(),
        ));
    }

    Ok(Json(ApiResponse::success(TicketVerification {
        valid: true,
        buyer_id: claims.buyer_id,
        event_id: claims.event_id,
        transaction_id: claims.transaction_id,
        unit_index: claims.unit_index,
        issued_at: claims.issued_at,
    })))
}
