use utoipa::OpenApi;

/// OpenAPI document for the HTTP surface. Served as JSON at
/// `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Gatepass API",
        description = "Event ticketing backend: catalog, inventory, reservations, QR tickets"
    ),
    paths(
        crate::handlers::health::health,
        crate::handlers::events::create_event,
        crate::handlers::events::list_events,
        crate::handlers::events::get_event,
        crate::handlers::events::approve_event,
        crate::handlers::events::like_event,
        crate::handlers::events::restock_event,
        crate::handlers::reservations::initiate_reservation,
        crate::handlers::reservations::confirm_reservation,
        crate::handlers::tickets::book_direct,
        crate::handlers::tickets::list_my_tickets,
        crate::handlers::tickets::verify_ticket,
    ),
    components(schemas(
        crate::entities::ticket_type::TicketKind,
        crate::errors::ErrorResponse,
        crate::handlers::health::HealthStatus,
        crate::handlers::events::CreateEventRequest,
        crate::handlers::events::TicketTypeInput,
        crate::handlers::events::SalePhaseInput,
        crate::handlers::events::EventResponse,
        crate::handlers::events::EventSummary,
        crate::handlers::events::TicketTypeResponse,
        crate::handlers::events::SalePhaseResponse,
        crate::handlers::events::RestockRequest,
        crate::handlers::reservations::InitiateReservationRequest,
        crate::handlers::reservations::ConfirmReservationRequest,
        crate::handlers::tickets::BookDirectRequest,
        crate::handlers::tickets::TicketResponse,
        crate::handlers::tickets::TicketVerification,
        crate::services::reservations::ReservationQuote,
        crate::services::reservations::PaymentForm,
    )),
    tags(
        (name = "Events", description = "Catalog and moderation"),
        (name = "Reservations", description = "Checkout initiation and payment confirmation"),
        (name = "Tickets", description = "Issued tickets and verification"),
        (name = "Health", description = "Liveness")
    )
)]
pub struct ApiDoc;
