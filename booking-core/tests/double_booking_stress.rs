//! Double-booking stress test
//!
//! Many concurrent CreateBooking calls fight over the same room and
//! overlapping date ranges; the availability check and insert share one
//! write transaction, so for each contested range exactly one request may
//! win. The test asserts the no-double-booking property over the final
//! state: no two surviving bookings on a room overlap.

use booking_core::{Config, CoreStorage, Engine};
use chrono::NaiveDate;
use rand::Rng;
use shared::booking::{
    BookingCommand, BookingCommandPayload, BookingSource, PartyInfo, StayDates,
};
use shared::models::{Room, RoomCreate};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const ATTEMPTS: usize = 200;
const ROOMS: usize = 4;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("booking_core=warn")
        .try_init();
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn seed_rooms(engine: &Engine) -> Vec<Room> {
    (0..ROOMS)
        .map(|i| {
            engine
                .inventory()
                .create_room(
                    RoomCreate {
                        business_id: 10,
                        name: format!("Room {i}"),
                        base_nightly_rate: 1000.0,
                        base_hourly_rate: None,
                        capacity: 4,
                    },
                    42,
                )
                .unwrap()
        })
        .collect()
}

fn create_cmd(idx: usize, room_id: i64, ci: NaiveDate, co: NaiveDate) -> BookingCommand {
    BookingCommand {
        command_id: format!("stress-{idx}"),
        actor_id: 500 + idx as i64,
        actor_name: format!("tourist-{idx}"),
        timestamp: shared::util::now_millis(),
        payload: BookingCommandPayload::CreateBooking {
            room_id,
            tourist_id: 500 + idx as i64,
            business_id: 10,
            dates: StayDates::new(ci, co).unwrap(),
            party: PartyInfo {
                adults: 2,
                children: 0,
                note: None,
            },
            source: BookingSource::Online,
        },
    }
}

/// Exclusive-boundary overlap, the booking-conflict rule
fn overlaps(a: &StayDates, b: &StayDates) -> bool {
    !(a.check_out <= b.check_in || a.check_in >= b.check_out)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_identical_requests_yield_one_booking() {
    init_tracing();
    let engine = Arc::new(Engine::with_storage(
        Config::default(),
        CoreStorage::open_in_memory().unwrap(),
    ));
    let room_id = seed_rooms(&engine)[0].id;

    let successes = Arc::new(AtomicUsize::new(0));
    let mut handles = Vec::new();
    for i in 0..32 {
        let engine = engine.clone();
        let successes = successes.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            let response = engine.execute_booking_command(create_cmd(
                i,
                room_id,
                date(2025, 12, 24),
                date(2025, 12, 27),
            ));
            if response.success {
                successes.fetch_add(1, Ordering::SeqCst);
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(successes.load(Ordering::SeqCst), 1);
    assert_eq!(engine.storage().get_active_booking_ids().unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn random_ranges_never_overlap_in_final_state() {
    init_tracing();
    let engine = Arc::new(Engine::with_storage(
        Config::default(),
        CoreStorage::open_in_memory().unwrap(),
    ));
    let rooms = seed_rooms(&engine);
    let room_ids: Vec<i64> = rooms.iter().map(|r| r.id).collect();

    let mut handles = Vec::new();
    for i in 0..ATTEMPTS {
        let engine = engine.clone();
        let room_ids = room_ids.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            let mut rng = rand::thread_rng();
            let room_id = room_ids[rng.gen_range(0..room_ids.len())];
            // Stays of 1-5 nights inside one contested month
            let start_day = rng.gen_range(1..=25);
            let nights = rng.gen_range(1..=5);
            let ci = date(2026, 3, start_day);
            let co = ci + chrono::Duration::days(nights);
            engine.execute_booking_command(create_cmd(i, room_id, ci, co));
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    // Pairwise check per room over all surviving bookings
    for room_id in room_ids {
        let ids = engine.storage().get_room_booking_ids(room_id).unwrap();
        let stays: Vec<StayDates> = ids
            .iter()
            .map(|id| engine.booking(id).unwrap().unwrap())
            .filter(|s| s.status.occupies())
            .map(|s| s.dates)
            .collect();

        for (i, a) in stays.iter().enumerate() {
            for b in stays.iter().skip(i + 1) {
                assert!(
                    !overlaps(a, b),
                    "room {room_id}: overlapping stays {a:?} and {b:?}"
                );
            }
        }
        // The contested month actually produced bookings
        assert!(!stays.is_empty());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn duplicate_webhook_under_concurrency_confirms_once() {
    init_tracing();
    let engine = Arc::new(Engine::with_storage(
        Config::default(),
        CoreStorage::open_in_memory().unwrap(),
    ));
    let room_id = seed_rooms(&engine)[0].id;

    let response = engine.execute_booking_command(create_cmd(
        0,
        room_id,
        date(2025, 12, 24),
        date(2025, 12, 27),
    ));
    let booking_id = response.booking_id.unwrap();
    let payment = engine
        .open_payment_intent(
            500,
            shared::models::PayTarget::Booking(booking_id.clone()),
            3000.0,
            "CARD",
        )
        .unwrap();

    // The gateway redelivers the same event id from several workers at once
    let mut handles = Vec::new();
    for _ in 0..16 {
        let engine = engine.clone();
        let intent_id = payment.intent_id.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            engine
                .ingest_webhook(
                    "evt_dup",
                    "payment.succeeded",
                    "stripe",
                    serde_json::json!({"intent_id": intent_id}),
                )
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    // Exactly one BookingReserved event exists
    let events = engine.storage().get_events_for_booking(&booking_id).unwrap();
    let reserved = events
        .iter()
        .filter(|e| e.event_type == shared::booking::BookingEventType::BookingReserved)
        .count();
    assert_eq!(reserved, 1);
    assert_eq!(
        engine.booking(&booking_id).unwrap().unwrap().status,
        shared::booking::BookingStatus::Reserved
    );
}
