//! Background reaper for abandoned reservations.
//!
//! Abandoned reservations hold no stock, so this task is ledger hygiene
//! only — never a correctness mechanism.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::services::ledger::ReservationLedger;

/// Spawns the reaper loop: every `interval`, delete `pending` ledger rows
/// older than `ttl`.
pub fn start_reaper(
    ledger: Arc<ReservationLedger>,
    ttl: Duration,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        info!(
            ttl_secs = ttl.as_secs(),
            interval_secs = interval.as_secs(),
            "Reservation reaper started"
        );

        loop {
            ticker.tick().await;
            match ledger.delete_stale_pending(ttl).await {
                Ok(0) => {}
                Ok(deleted) => info!(deleted, "Reaped stale pending reservations"),
                Err(e) => warn!("Reservation reaper sweep failed: {}", e),
            }
        }
    })
}
