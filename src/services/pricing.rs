//! Pricing is computed in exactly one place.
//!
//! Discounts are never persisted onto tickets; issuance and reporting both
//! call [`effective_price`] so the numbers cannot diverge.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::entities::{sale_phase, ticket_type::TicketKind};
use crate::errors::ServiceError;

/// Resolves the unit price for an admission, independent of how the event
/// models its prices. Legacy events carry a single flat price; events
/// created through this API carry one price per tier.
#[derive(Debug, Clone)]
pub enum PricingPolicy {
    Flat { unit_price: Decimal },
    PerTicketType { tiers: HashMap<TicketKind, Decimal> },
}

impl PricingPolicy {
    pub fn flat(unit_price: Decimal) -> Self {
        PricingPolicy::Flat { unit_price }
    }

    pub fn from_ticket_types(rows: &[crate::entities::ticket_type::Model]) -> Self {
        let tiers = rows
            .iter()
            .filter_map(|row| row.kind().map(|kind| (kind, row.unit_price)))
            .collect();
        PricingPolicy::PerTicketType { tiers }
    }

    pub fn unit_price(&self, kind: TicketKind) -> Result<Decimal, ServiceError> {
        match self {
            PricingPolicy::Flat { unit_price } => Ok(*unit_price),
            PricingPolicy::PerTicketType { tiers } => tiers.get(&kind).copied().ok_or_else(|| {
                ServiceError::NotFound(format!("no {} tickets sold for this event", kind))
            }),
        }
    }
}

/// Computes the price in effect at `as_of`, applying the discount of the
/// sale phase whose `[start_date, end_date]` window contains it. When
/// several phases overlap, the latest-starting one wins. Out-of-range
/// discount percentages are clamped to `[0, 100]`.
pub fn effective_price(
    base_price: Decimal,
    phases: &[sale_phase::Model],
    as_of: DateTime<Utc>,
) -> Decimal {
    let active = phases
        .iter()
        .filter(|p| p.start_date <= as_of && as_of <= p.end_date)
        .max_by_key(|p| p.start_date);

    match active {
        Some(phase) => {
            let discount = Decimal::from(phase.discount_percent.clamp(0, 100));
            let factor = (Decimal::from(100) - discount) / Decimal::from(100);
            (base_price * factor).round_dp(2)
        }
        None => base_price,
    }
}
