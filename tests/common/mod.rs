#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal_macros::dec;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tokio::sync::mpsc;
use uuid::Uuid;

use gatepass_api::config::AppConfig;
use gatepass_api::entities::ticket_type::TicketKind;
use gatepass_api::events::{process_events, EventSender};
use gatepass_api::handlers::AppServices;
use gatepass_api::migrator::Migrator;
use gatepass_api::services::catalog::{EventDetail, NewEvent, NewSalePhase, NewTicketType};

pub struct TestApp {
    pub db: Arc<DatabaseConnection>,
    pub services: AppServices,
}

/// In-memory SQLite with the embedded migrations. A single pooled
/// connection keeps every task on the same database.
pub async fn setup() -> TestApp {
    let mut opts = ConnectOptions::new("sqlite::memory:".to_string());
    opts.max_connections(1);
    let db = Database::connect(opts).await.expect("db connect");
    Migrator::up(&db, None).await.expect("migrations");
    let db = Arc::new(db);

    let (tx, rx) = mpsc::channel(256);
    let sender = EventSender::new(tx);
    tokio::spawn(process_events(rx));

    let cfg = AppConfig::new(
        "sqlite::memory:",
        "test_secret_key_for_testing_purposes_only_32chars",
    );
    let services = AppServices::new(db.clone(), sender, &cfg);

    TestApp { db, services }
}

/// Approved event with VIP 5 x 100.00, General 50 x 25.00, FanFest 10 x 60.00.
pub async fn seed_event(app: &TestApp) -> EventDetail {
    seed_event_with_phases(app, vec![]).await
}

pub async fn seed_event_with_phases(app: &TestApp, sale_phases: Vec<NewSalePhase>) -> EventDetail {
    app.services
        .catalog
        .create_event(
            Uuid::new_v4(),
            true,
            NewEvent {
                title: "Concert A".to_string(),
                description: "Stadium show".to_string(),
                organized_by: "Gatepass Live".to_string(),
                event_date: Utc::now() + Duration::days(30),
                location: "Riverside Arena".to_string(),
                image: None,
                ticket_types: vec![
                    NewTicketType {
                        kind: TicketKind::Vip,
                        unit_price: dec!(100.00),
                        quantity: 5,
                    },
                    NewTicketType {
                        kind: TicketKind::General,
                        unit_price: dec!(25.00),
                        quantity: 50,
                    },
                    NewTicketType {
                        kind: TicketKind::FanFest,
                        unit_price: dec!(60.00),
                        quantity: 10,
                    },
                ],
                sale_phases,
            },
        )
        .await
        .expect("seed event")
}

/// Current (available, sold) counters for one tier.
pub async fn counters(app: &TestApp, event_id: Uuid, kind: TicketKind) -> (i32, i32) {
    let row = app
        .services
        .inventory
        .ticket_type(event_id, kind)
        .await
        .expect("inventory read")
        .expect("tier exists");
    (row.quantity_available, row.quantity_sold)
}
