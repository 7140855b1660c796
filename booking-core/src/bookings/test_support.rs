//! Shared helpers for action/applier tests

use chrono::NaiveDate;
use redb::WriteTransaction;
use shared::booking::{BookingSnapshot, BookingStatus, StayDates};
use shared::models::{BlockReason, BlockedDateRange, Room, RoomStatus, SeasonalPricingRule};

use crate::bookings::traits::CommandMetadata;
use crate::storage::CoreStorage;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_metadata() -> CommandMetadata {
    CommandMetadata {
        command_id: "cmd-1".to_string(),
        actor_id: 42,
        actor_name: "Test Staff".to_string(),
        timestamp: 1234567890,
    }
}

pub fn seed_room(storage: &CoreStorage, txn: &WriteTransaction, id: i64, base_rate: f64, capacity: i32) {
    let room = Room {
        id,
        business_id: 10,
        name: format!("Room {id}"),
        base_nightly_rate: base_rate,
        base_hourly_rate: None,
        capacity,
        status: RoomStatus::Available,
        created_at: 0,
        updated_at: 0,
    };
    storage.store_room(txn, &room).unwrap();
}

pub fn seed_rule(
    storage: &CoreStorage,
    txn: &WriteTransaction,
    room_id: i64,
    rule_id: i64,
    start: NaiveDate,
    end: NaiveDate,
    nightly: f64,
    min_stay: Option<i32>,
) {
    let rule = SeasonalPricingRule {
        id: rule_id,
        room_id,
        name: format!("rule-{rule_id}"),
        start_date: start,
        end_date: end,
        nightly_price: nightly,
        hourly_price: None,
        min_stay_nights: min_stay,
        is_active: true,
        created_by: None,
        created_at: rule_id,
    };
    storage.store_season_rule(txn, &rule).unwrap();
}

pub fn block_room(
    storage: &CoreStorage,
    txn: &WriteTransaction,
    room_id: i64,
    start: NaiveDate,
    end: NaiveDate,
) {
    let block = BlockedDateRange {
        id: 1,
        room_id,
        start_date: start,
        end_date: end,
        reason: BlockReason::Maintenance,
        note: None,
        created_by: 1,
        created_at: 0,
    };
    storage.store_blocked_range(txn, &block).unwrap();
}

/// Store a booking snapshot directly (bypassing the command flow) together
/// with its room conflict-index entry.
pub fn store_booking(
    storage: &CoreStorage,
    txn: &WriteTransaction,
    booking_id: &str,
    room_id: i64,
    check_in: NaiveDate,
    check_out: NaiveDate,
    status: BookingStatus,
) -> BookingSnapshot {
    let mut snapshot = BookingSnapshot::new(booking_id.to_string());
    snapshot.room_id = room_id;
    snapshot.tourist_id = 500;
    snapshot.business_id = 10;
    snapshot.dates = StayDates::new(check_in, check_out).unwrap();
    snapshot.status = status;
    snapshot.update_checksum();
    storage.store_snapshot(txn, &snapshot).unwrap();
    if status.occupies() {
        storage.index_room_booking(txn, room_id, booking_id).unwrap();
    }
    snapshot
}
