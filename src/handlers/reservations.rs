use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::entities::ticket_type::TicketKind;
use crate::errors::ServiceError;
use crate::handlers::tickets::TicketResponse;
use crate::services::reservations::BuyerContact;
use crate::{ApiResponse, AppState};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct InitiateReservationRequest {
    pub event_id: Uuid,
    pub ticket_kind: TicketKind,
    #[validate(range(min = 1, max = 20))]
    pub quantity: i32,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ConfirmReservationRequest {
    /// Reference issued by the payment gateway for this charge.
    pub external_ref: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/v1/reservations",
    request_body = InitiateReservationRequest,
    responses(
        (status = 201, description = "Reservation recorded; forward the payment form to the gateway",
         body = crate::services::reservations::ReservationQuote),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown event or ticket type", body = crate::errors::ErrorResponse),
        (status = 422, description = "Not enough stock", body = crate::errors::ErrorResponse)
    ),
    tag = "Reservations"
)]
pub async fn initiate_reservation(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<InitiateReservationRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    req.validate()?;

    let quote = state
        .services
        .reservations
        .initiate_reservation(user.id, req.event_id, req.ticket_kind, req.quantity)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(quote))))
}

#[utoipa::path(
    post,
    path = "/api/v1/reservations/{transaction_id}/confirm",
    params(("transaction_id" = String, Path, description = "Transaction id issued at initiation")),
    request_body = ConfirmReservationRequest,
    responses(
        (status = 200, description = "Tickets for the reservation, in unit order"),
        (status = 403, description = "Reservation owned by another buyer", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown transaction", body = crate::errors::ErrorResponse),
        (status = 409, description = "Confirmation already in flight", body = crate::errors::ErrorResponse),
        (status = 422, description = "Sold out since reservation", body = crate::errors::ErrorResponse)
    ),
    tag = "Reservations"
)]
pub async fn confirm_reservation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(transaction_id): Path<String>,
    Json(req): Json<ConfirmReservationRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let tickets = state
        .services
        .reservations
        .confirm_reservation(
            user.id,
            &transaction_id,
            req.external_ref.as_deref(),
            BuyerContact {
                name: user.name,
                email: user.email,
            },
        )
        .await?;

    let tickets: Vec<TicketResponse> = tickets.into_iter().map(TicketResponse::from).collect();

    Ok(Json(ApiResponse::success(tickets)))
}
