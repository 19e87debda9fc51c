mod common;

use std::collections::HashSet;
use uuid::Uuid;

use gatepass_api::entities::ticket_type::TicketKind;
use gatepass_api::errors::ServiceError;
use gatepass_api::services::reservations::BuyerContact;

use common::{counters, seed_event, setup};

// N simultaneous confirmations for the same transaction id must produce
// exactly one inventory commit and exactly `quantity` tickets total. Under
// the per-transaction try-lock a racing caller either replays the issued
// set or observes Conflict; it never issues a second batch.
#[tokio::test]
async fn duplicate_confirmations_commit_inventory_once() {
    let app = setup().await;
    let detail = seed_event(&app).await;
    let event_id = detail.event.id;
    let buyer = Uuid::new_v4();

    let quote = app
        .services
        .reservations
        .initiate_reservation(buyer, event_id, TicketKind::Vip, 3)
        .await
        .unwrap();

    let mut tasks = vec![];
    for _ in 0..8 {
        let coordinator = app.services.reservations.clone();
        let txn = quote.transaction_id.clone();
        tasks.push(tokio::spawn(async move {
            coordinator
                .confirm_reservation(buyer, &txn, None, BuyerContact::default())
                .await
        }));
    }

    let mut successes = 0;
    let mut conflicts = 0;
    let mut ticket_ids: HashSet<Uuid> = HashSet::new();
    for task in tasks {
        match task.await.unwrap() {
            Ok(tickets) => {
                successes += 1;
                assert_eq!(tickets.len(), 3);
                for t in tickets {
                    ticket_ids.insert(t.id);
                }
            }
            Err(ServiceError::Conflict(_)) => conflicts += 1,
            Err(other) => panic!("unexpected error: {}", other),
        }
    }

    assert!(successes >= 1, "at least one confirmation must win");
    assert_eq!(successes + conflicts, 8);
    // Every successful call replayed the same batch.
    assert_eq!(ticket_ids.len(), 3);

    let stored = app
        .services
        .tickets
        .find_by_transaction_id(&quote.transaction_id)
        .await
        .unwrap();
    assert_eq!(stored.len(), 3);

    // Exactly one inventory commit.
    assert_eq!(counters(&app, event_id, TicketKind::Vip).await, (2, 3));
}

// Two different transactions racing on the last units of one counter:
// at most one can commit, and the loser leaves inventory untouched.
#[tokio::test]
async fn cross_transaction_race_cannot_oversell() {
    let app = setup().await;
    let detail = seed_event(&app).await;
    let event_id = detail.event.id;

    // VIP starts at 5; take 3 so exactly 2 remain.
    let opener = Uuid::new_v4();
    let warmup = app
        .services
        .reservations
        .initiate_reservation(opener, event_id, TicketKind::Vip, 3)
        .await
        .unwrap();
    app.services
        .reservations
        .confirm_reservation(opener, &warmup.transaction_id, None, BuyerContact::default())
        .await
        .unwrap();
    assert_eq!(counters(&app, event_id, TicketKind::Vip).await, (2, 3));

    // Two buyers each want those 2 remaining units.
    let buyer_a = Uuid::new_v4();
    let buyer_b = Uuid::new_v4();
    let quote_a = app
        .services
        .reservations
        .initiate_reservation(buyer_a, event_id, TicketKind::Vip, 2)
        .await
        .unwrap();
    let quote_b = app
        .services
        .reservations
        .initiate_reservation(buyer_b, event_id, TicketKind::Vip, 2)
        .await
        .unwrap();

    let coordinator_a = app.services.reservations.clone();
    let coordinator_b = app.services.reservations.clone();
    let txn_a = quote_a.transaction_id.clone();
    let txn_b = quote_b.transaction_id.clone();

    let (result_a, result_b) = tokio::join!(
        tokio::spawn(async move {
            coordinator_a
                .confirm_reservation(buyer_a, &txn_a, None, BuyerContact::default())
                .await
        }),
        tokio::spawn(async move {
            coordinator_b
                .confirm_reservation(buyer_b, &txn_b, None, BuyerContact::default())
                .await
        }),
    );
    let result_a = result_a.unwrap();
    let result_b = result_b.unwrap();

    let wins = [&result_a, &result_b]
        .iter()
        .filter(|r| r.is_ok())
        .count();
    assert_eq!(wins, 1, "exactly one of the racing transactions may win");

    let loser = if result_a.is_ok() { result_b } else { result_a };
    assert!(matches!(loser.unwrap_err(), ServiceError::SoldOut(_)));

    // Final counters: the winner's 2 units on top of the warmup's 3.
    assert_eq!(counters(&app, event_id, TicketKind::Vip).await, (0, 5));
}

// The single-unit scenario from the oversell property: quantity_available
// is 1 and two buyers go through the full initiate+confirm sequence.
#[tokio::test]
async fn last_unit_goes_to_exactly_one_buyer() {
    let app = setup().await;
    let detail = seed_event(&app).await;
    let event_id = detail.event.id;

    // Drain VIP down to a single unit.
    let opener = Uuid::new_v4();
    let warmup = app
        .services
        .reservations
        .initiate_reservation(opener, event_id, TicketKind::Vip, 4)
        .await
        .unwrap();
    app.services
        .reservations
        .confirm_reservation(opener, &warmup.transaction_id, None, BuyerContact::default())
        .await
        .unwrap();
    assert_eq!(counters(&app, event_id, TicketKind::Vip).await, (1, 4));

    let buyer_a = Uuid::new_v4();
    let buyer_b = Uuid::new_v4();

    let run = |buyer: Uuid| {
        let coordinator = app.services.reservations.clone();
        async move {
            let quote = coordinator
                .initiate_reservation(buyer, event_id, TicketKind::Vip, 1)
                .await?;
            coordinator
                .confirm_reservation(buyer, &quote.transaction_id, None, BuyerContact::default())
                .await
        }
    };

    let (result_a, result_b) = tokio::join!(run(buyer_a), run(buyer_b));

    let outcomes = [result_a, result_b];
    let wins = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1);
    assert!(outcomes
        .iter()
        .any(|r| matches!(r, Err(ServiceError::SoldOut(_)))));

    assert_eq!(counters(&app, event_id, TicketKind::Vip).await, (0, 5));
}

// Twenty direct bookings against ten FanFest units: exactly ten succeed.
#[tokio::test]
async fn concurrent_direct_bookings_stop_at_zero() {
    let app = setup().await;
    let detail = seed_event(&app).await;
    let event_id = detail.event.id;

    let mut tasks = vec![];
    for _ in 0..20 {
        let coordinator = app.services.reservations.clone();
        tasks.push(tokio::spawn(async move {
            coordinator
                .book_direct(
                    Uuid::new_v4(),
                    event_id,
                    TicketKind::FanFest,
                    BuyerContact::default(),
                )
                .await
                .is_ok()
        }));
    }

    let mut success = 0;
    for task in tasks {
        if task.await.unwrap_or(false) {
            success += 1;
        }
    }

    assert_eq!(
        success, 10,
        "exactly 10 bookings should succeed; got {}",
        success
    );
    assert_eq!(counters(&app, event_id, TicketKind::FanFest).await, (0, 10));
}
