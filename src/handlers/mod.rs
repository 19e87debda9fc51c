pub mod events;
pub mod health;
pub mod reservations;
pub mod tickets;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::catalog::EventCatalogService;
use crate::services::inventory::InventoryService;
use crate::services::ledger::ReservationLedger;
use crate::services::lock::{KeyedLockManager, LockManager};
use crate::services::reservations::ReservationCoordinator;
use crate::services::tickets::TicketService;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<EventCatalogService>,
    pub inventory: Arc<InventoryService>,
    pub ledger: Arc<ReservationLedger>,
    pub tickets: Arc<TicketService>,
    pub reservations: Arc<ReservationCoordinator>,
}

impl AppServices {
    /// Wires the service graph over one connection pool. The coordinator
    /// gets the default in-process keyed lock manager; swap it via
    /// [`AppServices::with_lock_manager`] for a distributed setup.
    pub fn new(db: Arc<DbPool>, event_sender: EventSender, config: &AppConfig) -> Self {
        Self::with_lock_manager(db, event_sender, config, Arc::new(KeyedLockManager::new()))
    }

    pub fn with_lock_manager(
        db: Arc<DbPool>,
        event_sender: EventSender,
        config: &AppConfig,
        locks: Arc<dyn LockManager>,
    ) -> Self {
        let catalog = Arc::new(EventCatalogService::new(db.clone(), event_sender.clone()));
        let inventory = Arc::new(InventoryService::new(db.clone()));
        let ledger = Arc::new(ReservationLedger::new(db.clone()));
        let tickets = Arc::new(TicketService::new(db, &config.qr_secret));

        let reservations = Arc::new(ReservationCoordinator::new(
            catalog.clone(),
            inventory.clone(),
            ledger.clone(),
            tickets.clone(),
            locks,
            event_sender,
        ));

        Self {
            catalog,
            inventory,
            ledger,
            tickets,
            reservations,
        }
    }
}
