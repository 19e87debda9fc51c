pub mod event;
pub mod pending_reservation;
pub mod sale_phase;
pub mod ticket;
pub mod ticket_type;
