//! redb-based storage layer for the booking core
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `booking_events` | `(booking_id, sequence)` | `BookingEvent` | Event stream (append-only) |
//! | `booking_snapshots` | `booking_id` | `BookingSnapshot` | Snapshot cache |
//! | `active_bookings` | `booking_id` | `()` | Non-terminal booking index |
//! | `room_bookings` | `(room_id, booking_id)` | `()` | Conflict-scan index per room |
//! | `rooms` | `room_id` | `Room` | Room rows |
//! | `blocked_ranges` | `(room_id, block_id)` | `BlockedDateRange` | Administrative holds |
//! | `season_rules` | `(room_id, rule_id)` | `SeasonalPricingRule` | Seasonal pricing |
//! | `payments` | `payment_id` | `Payment` | Payment rows |
//! | `payment_intents` | `intent_id` | `payment_id` | Gateway correlation index |
//! | `paid_targets` | `target_key` | `payment_id` | At-most-one-paid guard |
//! | `refunds` | `refund_id` | `Refund` | Refund rows |
//! | `webhook_events` | `external_event_id` | `WebhookEvent` | Inbox (dedup by key) |
//! | `processed_commands` | `command_id` | `()` | Idempotency check |
//! | `sequence_counter` | `()` | `u64` | Global sequence + audit id |
//! | `audit_log` | `entry_id` | `AuditEntry` | Hash-chained audit trail |
//!
//! # Durability
//!
//! redb commits with `Durability::Immediate`: copy-on-write with an atomic
//! pointer swap, so the database file stays consistent across power loss.
//! A single write transaction spans availability check + booking insert,
//! which is what closes the create-booking race.

use redb::{
    Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction,
};
use shared::booking::{BookingEvent, BookingSnapshot};
use shared::models::{BlockedDateRange, Payment, Refund, Room, SeasonalPricingRule, WebhookEvent};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::audit::AuditEntry;

/// Event stream: key = (booking_id, sequence), value = JSON-serialized BookingEvent
const BOOKING_EVENTS_TABLE: TableDefinition<(&str, u64), &[u8]> =
    TableDefinition::new("booking_events");

/// Snapshots: key = booking_id, value = JSON-serialized BookingSnapshot
const BOOKING_SNAPSHOTS_TABLE: TableDefinition<&str, &[u8]> =
    TableDefinition::new("booking_snapshots");

/// Non-terminal bookings: key = booking_id, value = empty (existence check)
const ACTIVE_BOOKINGS_TABLE: TableDefinition<&str, ()> = TableDefinition::new("active_bookings");

/// Per-room conflict index: key = (room_id, booking_id), value = empty
/// Entries are removed only when a booking is cancelled.
const ROOM_BOOKINGS_TABLE: TableDefinition<(i64, &str), ()> =
    TableDefinition::new("room_bookings");

/// Rooms: key = room_id, value = JSON-serialized Room
const ROOMS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("rooms");

/// Blocked ranges: key = (room_id, block_id), value = JSON-serialized BlockedDateRange
const BLOCKED_RANGES_TABLE: TableDefinition<(i64, i64), &[u8]> =
    TableDefinition::new("blocked_ranges");

/// Seasonal rules: key = (room_id, rule_id), value = JSON-serialized SeasonalPricingRule
const SEASON_RULES_TABLE: TableDefinition<(i64, i64), &[u8]> =
    TableDefinition::new("season_rules");

/// Payments: key = payment_id, value = JSON-serialized Payment
const PAYMENTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("payments");

/// Gateway correlation index: key = intent_id, value = payment_id
const PAYMENT_INTENTS_TABLE: TableDefinition<&str, &str> =
    TableDefinition::new("payment_intents");

/// At-most-one-paid guard: key = target key ("booking:xxx"), value = payment_id
const PAID_TARGETS_TABLE: TableDefinition<&str, &str> = TableDefinition::new("paid_targets");

/// Refunds: key = refund_id, value = JSON-serialized Refund
const REFUNDS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("refunds");

/// Webhook inbox: key = external_event_id (the dedup key), value = WebhookEvent
const WEBHOOK_EVENTS_TABLE: TableDefinition<&str, &[u8]> =
    TableDefinition::new("webhook_events");

/// Processed commands: key = command_id, value = empty (idempotency)
const PROCESSED_COMMANDS_TABLE: TableDefinition<&str, ()> =
    TableDefinition::new("processed_commands");

/// Counters: key = "seq" or "audit_seq", value = u64
const SEQUENCE_TABLE: TableDefinition<&str, u64> = TableDefinition::new("sequence_counter");

/// Audit trail: key = entry id, value = JSON-serialized AuditEntry
const AUDIT_LOG_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("audit_log");

const SEQUENCE_KEY: &str = "seq";
const AUDIT_SEQUENCE_KEY: &str = "audit_seq";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Booking not found: {0}")]
    BookingNotFound(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Core storage backed by a single redb database
#[derive(Clone)]
pub struct CoreStorage {
    db: Arc<Database>,
}

impl CoreStorage {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        let storage = Self { db: Arc::new(db) };
        storage.init_tables()?;
        Ok(storage)
    }

    /// Open an in-memory database (tests and ephemeral tooling)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        let storage = Self { db: Arc::new(db) };
        storage.init_tables()?;
        Ok(storage)
    }

    fn init_tables(&self) -> StorageResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let _ = write_txn.open_table(BOOKING_EVENTS_TABLE)?;
            let _ = write_txn.open_table(BOOKING_SNAPSHOTS_TABLE)?;
            let _ = write_txn.open_table(ACTIVE_BOOKINGS_TABLE)?;
            let _ = write_txn.open_table(ROOM_BOOKINGS_TABLE)?;
            let _ = write_txn.open_table(ROOMS_TABLE)?;
            let _ = write_txn.open_table(BLOCKED_RANGES_TABLE)?;
            let _ = write_txn.open_table(SEASON_RULES_TABLE)?;
            let _ = write_txn.open_table(PAYMENTS_TABLE)?;
            let _ = write_txn.open_table(PAYMENT_INTENTS_TABLE)?;
            let _ = write_txn.open_table(PAID_TARGETS_TABLE)?;
            let _ = write_txn.open_table(REFUNDS_TABLE)?;
            let _ = write_txn.open_table(WEBHOOK_EVENTS_TABLE)?;
            let _ = write_txn.open_table(PROCESSED_COMMANDS_TABLE)?;
            let _ = write_txn.open_table(AUDIT_LOG_TABLE)?;

            let mut seq_table = write_txn.open_table(SEQUENCE_TABLE)?;
            if seq_table.get(SEQUENCE_KEY)?.is_none() {
                seq_table.insert(SEQUENCE_KEY, 0u64)?;
            }
            if seq_table.get(AUDIT_SEQUENCE_KEY)?.is_none() {
                seq_table.insert(AUDIT_SEQUENCE_KEY, 0u64)?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Begin a write transaction
    ///
    /// redb is single-writer: holding this transaction serializes every
    /// state-changing operation in the core against it.
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Sequence Operations ==========

    /// Get current event sequence (read-only)
    pub fn get_current_sequence(&self) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SEQUENCE_TABLE)?;
        Ok(table
            .get(SEQUENCE_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0))
    }

    /// Set the event sequence (within transaction)
    pub fn set_sequence(&self, txn: &WriteTransaction, sequence: u64) -> StorageResult<()> {
        let mut table = txn.open_table(SEQUENCE_TABLE)?;
        table.insert(SEQUENCE_KEY, sequence)?;
        Ok(())
    }

    /// Allocate the next audit entry id (within transaction)
    pub fn next_audit_id(&self, txn: &WriteTransaction) -> StorageResult<u64> {
        let mut table = txn.open_table(SEQUENCE_TABLE)?;
        let current = table
            .get(AUDIT_SEQUENCE_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0);
        let next = current + 1;
        table.insert(AUDIT_SEQUENCE_KEY, next)?;
        Ok(next)
    }

    // ========== Command Idempotency ==========

    /// Check if a command has been processed
    pub fn is_command_processed(&self, command_id: &str) -> StorageResult<bool> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        Ok(table.get(command_id)?.is_some())
    }

    /// Check if a command has been processed (within transaction)
    pub fn is_command_processed_txn(
        &self,
        txn: &WriteTransaction,
        command_id: &str,
    ) -> StorageResult<bool> {
        let table = txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        Ok(table.get(command_id)?.is_some())
    }

    /// Mark a command as processed
    pub fn mark_command_processed(
        &self,
        txn: &WriteTransaction,
        command_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        table.insert(command_id, ())?;
        Ok(())
    }

    // ========== Booking Event Operations ==========

    /// Store a booking event
    pub fn store_event(&self, txn: &WriteTransaction, event: &BookingEvent) -> StorageResult<()> {
        let mut table = txn.open_table(BOOKING_EVENTS_TABLE)?;
        let key = (event.booking_id.as_str(), event.sequence);
        let value = serde_json::to_vec(event)?;
        table.insert(key, value.as_slice())?;
        Ok(())
    }

    /// Get all events for a booking, ordered by sequence
    pub fn get_events_for_booking(&self, booking_id: &str) -> StorageResult<Vec<BookingEvent>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(BOOKING_EVENTS_TABLE)?;

        let mut events = Vec::new();
        let range_start = (booking_id, 0u64);
        let range_end = (booking_id, u64::MAX);

        for result in table.range(range_start..=range_end)? {
            let (_key, value) = result?;
            let event: BookingEvent = serde_json::from_slice(value.value())?;
            events.push(event);
        }

        events.sort_by_key(|e| e.sequence);
        Ok(events)
    }

    // ========== Booking Snapshot Operations ==========

    /// Store a booking snapshot
    pub fn store_snapshot(
        &self,
        txn: &WriteTransaction,
        snapshot: &BookingSnapshot,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(BOOKING_SNAPSHOTS_TABLE)?;
        let value = serde_json::to_vec(snapshot)?;
        table.insert(snapshot.booking_id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Get a booking snapshot (read-only)
    pub fn get_snapshot(&self, booking_id: &str) -> StorageResult<Option<BookingSnapshot>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(BOOKING_SNAPSHOTS_TABLE)?;
        match table.get(booking_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Get a booking snapshot within a write transaction (sees uncommitted state)
    pub fn get_snapshot_txn(
        &self,
        txn: &WriteTransaction,
        booking_id: &str,
    ) -> StorageResult<Option<BookingSnapshot>> {
        let table = txn.open_table(BOOKING_SNAPSHOTS_TABLE)?;
        match table.get(booking_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Mark a booking as active (non-terminal)
    pub fn mark_booking_active(
        &self,
        txn: &WriteTransaction,
        booking_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(ACTIVE_BOOKINGS_TABLE)?;
        table.insert(booking_id, ())?;
        Ok(())
    }

    /// Remove a booking from the active index
    pub fn mark_booking_inactive(
        &self,
        txn: &WriteTransaction,
        booking_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(ACTIVE_BOOKINGS_TABLE)?;
        table.remove(booking_id)?;
        Ok(())
    }

    /// List all non-terminal booking ids
    pub fn get_active_booking_ids(&self) -> StorageResult<Vec<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ACTIVE_BOOKINGS_TABLE)?;
        let mut ids = Vec::new();
        for result in table.iter()? {
            let (key, _value) = result?;
            ids.push(key.value().to_string());
        }
        Ok(ids)
    }

    // ========== Room Booking Index ==========

    /// Index a booking under its room for conflict scans
    pub fn index_room_booking(
        &self,
        txn: &WriteTransaction,
        room_id: i64,
        booking_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(ROOM_BOOKINGS_TABLE)?;
        table.insert((room_id, booking_id), ())?;
        Ok(())
    }

    /// Drop a booking from the room conflict index (cancellation only)
    pub fn unindex_room_booking(
        &self,
        txn: &WriteTransaction,
        room_id: i64,
        booking_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(ROOM_BOOKINGS_TABLE)?;
        table.remove((room_id, booking_id))?;
        Ok(())
    }

    /// Booking ids indexed under a room, within a write transaction
    pub fn get_room_booking_ids_txn(
        &self,
        txn: &WriteTransaction,
        room_id: i64,
    ) -> StorageResult<Vec<String>> {
        let table = txn.open_table(ROOM_BOOKINGS_TABLE)?;
        let mut ids = Vec::new();
        for result in table.range((room_id, "")..)? {
            let (key, _value) = result?;
            let (rid, booking_id) = key.value();
            if rid != room_id {
                break;
            }
            ids.push(booking_id.to_string());
        }
        Ok(ids)
    }

    /// Booking ids indexed under a room (read-only)
    pub fn get_room_booking_ids(&self, room_id: i64) -> StorageResult<Vec<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ROOM_BOOKINGS_TABLE)?;
        let mut ids = Vec::new();
        for result in table.range((room_id, "")..)? {
            let (key, _value) = result?;
            let (rid, booking_id) = key.value();
            if rid != room_id {
                break;
            }
            ids.push(booking_id.to_string());
        }
        Ok(ids)
    }

    // ========== Room Operations ==========

    /// Store a room row
    pub fn store_room(&self, txn: &WriteTransaction, room: &Room) -> StorageResult<()> {
        let mut table = txn.open_table(ROOMS_TABLE)?;
        let value = serde_json::to_vec(room)?;
        table.insert(room.id, value.as_slice())?;
        Ok(())
    }

    /// Get a room row (read-only)
    pub fn get_room(&self, room_id: i64) -> StorageResult<Option<Room>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ROOMS_TABLE)?;
        match table.get(room_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Get a room row within a write transaction
    pub fn get_room_txn(
        &self,
        txn: &WriteTransaction,
        room_id: i64,
    ) -> StorageResult<Option<Room>> {
        let table = txn.open_table(ROOMS_TABLE)?;
        match table.get(room_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    // ========== Blocked Range Operations ==========

    /// Store a blocked range
    pub fn store_blocked_range(
        &self,
        txn: &WriteTransaction,
        range: &BlockedDateRange,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(BLOCKED_RANGES_TABLE)?;
        let value = serde_json::to_vec(range)?;
        table.insert((range.room_id, range.id), value.as_slice())?;
        Ok(())
    }

    /// Remove a blocked range; returns whether it existed
    pub fn remove_blocked_range(
        &self,
        txn: &WriteTransaction,
        room_id: i64,
        block_id: i64,
    ) -> StorageResult<bool> {
        let mut table = txn.open_table(BLOCKED_RANGES_TABLE)?;
        Ok(table.remove((room_id, block_id))?.is_some())
    }

    /// Blocked ranges for a room (read-only)
    pub fn get_blocked_ranges(&self, room_id: i64) -> StorageResult<Vec<BlockedDateRange>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(BLOCKED_RANGES_TABLE)?;
        let mut ranges = Vec::new();
        for result in table.range((room_id, 0)..=(room_id, i64::MAX))? {
            let (_key, value) = result?;
            ranges.push(serde_json::from_slice(value.value())?);
        }
        Ok(ranges)
    }

    /// Blocked ranges for a room within a write transaction
    pub fn get_blocked_ranges_txn(
        &self,
        txn: &WriteTransaction,
        room_id: i64,
    ) -> StorageResult<Vec<BlockedDateRange>> {
        let table = txn.open_table(BLOCKED_RANGES_TABLE)?;
        let mut ranges = Vec::new();
        for result in table.range((room_id, 0)..=(room_id, i64::MAX))? {
            let (_key, value) = result?;
            ranges.push(serde_json::from_slice(value.value())?);
        }
        Ok(ranges)
    }

    /// All blocked ranges across rooms (purge sweep)
    pub fn get_all_blocked_ranges(&self) -> StorageResult<Vec<BlockedDateRange>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(BLOCKED_RANGES_TABLE)?;
        let mut ranges = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            ranges.push(serde_json::from_slice(value.value())?);
        }
        Ok(ranges)
    }

    // ========== Season Rule Operations ==========

    /// Store a seasonal pricing rule
    pub fn store_season_rule(
        &self,
        txn: &WriteTransaction,
        rule: &SeasonalPricingRule,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(SEASON_RULES_TABLE)?;
        let value = serde_json::to_vec(rule)?;
        table.insert((rule.room_id, rule.id), value.as_slice())?;
        Ok(())
    }

    /// Get one seasonal rule
    pub fn get_season_rule(
        &self,
        room_id: i64,
        rule_id: i64,
    ) -> StorageResult<Option<SeasonalPricingRule>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SEASON_RULES_TABLE)?;
        match table.get((room_id, rule_id))? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Seasonal rules for a room (read-only)
    pub fn get_season_rules(&self, room_id: i64) -> StorageResult<Vec<SeasonalPricingRule>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SEASON_RULES_TABLE)?;
        let mut rules = Vec::new();
        for result in table.range((room_id, 0)..=(room_id, i64::MAX))? {
            let (_key, value) = result?;
            rules.push(serde_json::from_slice(value.value())?);
        }
        Ok(rules)
    }

    /// Seasonal rules for a room within a write transaction
    pub fn get_season_rules_txn(
        &self,
        txn: &WriteTransaction,
        room_id: i64,
    ) -> StorageResult<Vec<SeasonalPricingRule>> {
        let table = txn.open_table(SEASON_RULES_TABLE)?;
        let mut rules = Vec::new();
        for result in table.range((room_id, 0)..=(room_id, i64::MAX))? {
            let (_key, value) = result?;
            rules.push(serde_json::from_slice(value.value())?);
        }
        Ok(rules)
    }

    // ========== Payment Operations ==========

    /// Store a payment row
    pub fn store_payment(&self, txn: &WriteTransaction, payment: &Payment) -> StorageResult<()> {
        let mut table = txn.open_table(PAYMENTS_TABLE)?;
        let value = serde_json::to_vec(payment)?;
        table.insert(payment.payment_id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Get a payment row (read-only)
    pub fn get_payment(&self, payment_id: &str) -> StorageResult<Option<Payment>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PAYMENTS_TABLE)?;
        match table.get(payment_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Get a payment row within a write transaction
    pub fn get_payment_txn(
        &self,
        txn: &WriteTransaction,
        payment_id: &str,
    ) -> StorageResult<Option<Payment>> {
        let table = txn.open_table(PAYMENTS_TABLE)?;
        match table.get(payment_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Index a payment under its gateway intent id
    pub fn index_payment_intent(
        &self,
        txn: &WriteTransaction,
        intent_id: &str,
        payment_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(PAYMENT_INTENTS_TABLE)?;
        table.insert(intent_id, payment_id)?;
        Ok(())
    }

    /// Resolve an intent id to a payment id within a write transaction
    pub fn get_payment_id_by_intent_txn(
        &self,
        txn: &WriteTransaction,
        intent_id: &str,
    ) -> StorageResult<Option<String>> {
        let table = txn.open_table(PAYMENT_INTENTS_TABLE)?;
        Ok(table.get(intent_id)?.map(|guard| guard.value().to_string()))
    }

    /// Resolve an intent id to a payment id (read-only)
    pub fn get_payment_id_by_intent(&self, intent_id: &str) -> StorageResult<Option<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PAYMENT_INTENTS_TABLE)?;
        Ok(table.get(intent_id)?.map(|guard| guard.value().to_string()))
    }

    /// Claim the paid slot for a target
    ///
    /// Atomic insert-if-absent: returns the already-holding payment id when
    /// the slot is taken by a DIFFERENT payment, `None` on success (including
    /// the idempotent re-claim by the same payment).
    pub fn try_claim_paid_target(
        &self,
        txn: &WriteTransaction,
        target_key: &str,
        payment_id: &str,
    ) -> StorageResult<Option<String>> {
        let mut table = txn.open_table(PAID_TARGETS_TABLE)?;
        if let Some(guard) = table.get(target_key)? {
            let holder = guard.value().to_string();
            if holder != payment_id {
                return Ok(Some(holder));
            }
            return Ok(None);
        }
        table.insert(target_key, payment_id)?;
        Ok(None)
    }

    /// Paid payment currently holding a target, if any (read-only)
    pub fn get_paid_payment_for_target(&self, target_key: &str) -> StorageResult<Option<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PAID_TARGETS_TABLE)?;
        Ok(table.get(target_key)?.map(|guard| guard.value().to_string()))
    }

    /// Paid payment currently holding a target, within a write transaction
    pub fn get_paid_payment_for_target_txn(
        &self,
        txn: &WriteTransaction,
        target_key: &str,
    ) -> StorageResult<Option<String>> {
        let table = txn.open_table(PAID_TARGETS_TABLE)?;
        Ok(table.get(target_key)?.map(|guard| guard.value().to_string()))
    }

    /// Release the paid slot for a target (refund completion)
    pub fn release_paid_target(
        &self,
        txn: &WriteTransaction,
        target_key: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(PAID_TARGETS_TABLE)?;
        table.remove(target_key)?;
        Ok(())
    }

    // ========== Refund Operations ==========

    /// Store a refund row
    pub fn store_refund(&self, txn: &WriteTransaction, refund: &Refund) -> StorageResult<()> {
        let mut table = txn.open_table(REFUNDS_TABLE)?;
        let value = serde_json::to_vec(refund)?;
        table.insert(refund.refund_id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Get a refund row (read-only)
    pub fn get_refund(&self, refund_id: &str) -> StorageResult<Option<Refund>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(REFUNDS_TABLE)?;
        match table.get(refund_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Get a refund row within a write transaction
    pub fn get_refund_txn(
        &self,
        txn: &WriteTransaction,
        refund_id: &str,
    ) -> StorageResult<Option<Refund>> {
        let table = txn.open_table(REFUNDS_TABLE)?;
        match table.get(refund_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    // ========== Webhook Inbox Operations ==========

    /// Insert a webhook event if its external id is absent
    ///
    /// The dedup gate: returns the existing row when the external id is
    /// already present (no write happens), `None` after a fresh insert.
    /// Lookup and insert share one write transaction, so two concurrent
    /// deliveries of the same event serialize and exactly one inserts.
    pub fn insert_webhook_if_absent(
        &self,
        txn: &WriteTransaction,
        event: &WebhookEvent,
    ) -> StorageResult<Option<WebhookEvent>> {
        let mut table = txn.open_table(WEBHOOK_EVENTS_TABLE)?;
        if let Some(guard) = table.get(event.external_event_id.as_str())? {
            return Ok(Some(serde_json::from_slice(guard.value())?));
        }
        let value = serde_json::to_vec(event)?;
        table.insert(event.external_event_id.as_str(), value.as_slice())?;
        Ok(None)
    }

    /// Overwrite a webhook event row (status updates)
    pub fn store_webhook(&self, txn: &WriteTransaction, event: &WebhookEvent) -> StorageResult<()> {
        let mut table = txn.open_table(WEBHOOK_EVENTS_TABLE)?;
        let value = serde_json::to_vec(event)?;
        table.insert(event.external_event_id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Get a webhook event by external id (read-only)
    pub fn get_webhook(&self, external_event_id: &str) -> StorageResult<Option<WebhookEvent>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(WEBHOOK_EVENTS_TABLE)?;
        match table.get(external_event_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// All webhook events not yet processed (pending or failed) — sweep input
    pub fn get_unprocessed_webhooks(&self) -> StorageResult<Vec<WebhookEvent>> {
        use shared::models::WebhookStatus;
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(WEBHOOK_EVENTS_TABLE)?;
        let mut events = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let event: WebhookEvent = serde_json::from_slice(value.value())?;
            if event.status != WebhookStatus::Processed {
                events.push(event);
            }
        }
        events.sort_by_key(|e| e.received_at);
        Ok(events)
    }

    // ========== Audit Operations ==========

    /// Append an audit entry
    pub fn append_audit(&self, txn: &WriteTransaction, entry: &AuditEntry) -> StorageResult<()> {
        let mut table = txn.open_table(AUDIT_LOG_TABLE)?;
        let value = serde_json::to_vec(entry)?;
        table.insert(entry.id, value.as_slice())?;
        Ok(())
    }

    /// Last audit entry within a write transaction (chain tip for appends,
    /// including entries staged earlier in the same transaction)
    pub fn last_audit_entry_txn(
        &self,
        txn: &WriteTransaction,
    ) -> StorageResult<Option<AuditEntry>> {
        let table = txn.open_table(AUDIT_LOG_TABLE)?;
        match table.last()? {
            Some((_key, value)) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Last audit entry, if any (chain tip recovery on startup)
    pub fn last_audit_entry(&self) -> StorageResult<Option<AuditEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(AUDIT_LOG_TABLE)?;
        match table.last()? {
            Some((_key, value)) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Audit entries in id order starting at `from_id`, up to `limit`
    pub fn get_audit_entries(&self, from_id: u64, limit: usize) -> StorageResult<Vec<AuditEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(AUDIT_LOG_TABLE)?;
        let mut entries = Vec::new();
        for result in table.range(from_id..)? {
            if entries.len() >= limit {
                break;
            }
            let (_key, value) = result?;
            entries.push(serde_json::from_slice(value.value())?);
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::RoomStatus;

    fn make_room(id: i64) -> Room {
        Room {
            id,
            business_id: 10,
            name: format!("Room {id}"),
            base_nightly_rate: 1000.0,
            base_hourly_rate: None,
            capacity: 4,
            status: RoomStatus::Available,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_rows_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("core.redb");

        {
            let storage = CoreStorage::open(&path).unwrap();
            let txn = storage.begin_write().unwrap();
            storage.store_room(&txn, &make_room(1)).unwrap();
            storage.set_sequence(&txn, 7).unwrap();
            txn.commit().unwrap();
        }

        let storage = CoreStorage::open(&path).unwrap();
        let room = storage.get_room(1).unwrap().unwrap();
        assert_eq!(room.name, "Room 1");
        assert_eq!(storage.get_current_sequence().unwrap(), 7);
    }

    #[test]
    fn test_uncommitted_transaction_leaves_no_trace() {
        let storage = CoreStorage::open_in_memory().unwrap();

        {
            let txn = storage.begin_write().unwrap();
            storage.store_room(&txn, &make_room(1)).unwrap();
            // Dropped without commit
        }

        assert!(storage.get_room(1).unwrap().is_none());
    }

    #[test]
    fn test_room_scoped_scans_do_not_leak_across_rooms() {
        let storage = CoreStorage::open_in_memory().unwrap();

        let txn = storage.begin_write().unwrap();
        storage.index_room_booking(&txn, 1, "b-1").unwrap();
        storage.index_room_booking(&txn, 1, "b-2").unwrap();
        storage.index_room_booking(&txn, 2, "b-3").unwrap();
        txn.commit().unwrap();

        assert_eq!(storage.get_room_booking_ids(1).unwrap().len(), 2);
        assert_eq!(storage.get_room_booking_ids(2).unwrap(), vec!["b-3"]);
        assert!(storage.get_room_booking_ids(3).unwrap().is_empty());
    }

    #[test]
    fn test_webhook_insert_if_absent_returns_existing() {
        use shared::models::{WebhookEvent, WebhookStatus};

        let storage = CoreStorage::open_in_memory().unwrap();
        let event = WebhookEvent {
            id: "internal-1".to_string(),
            external_event_id: "evt_1".to_string(),
            event_type: "payment.succeeded".to_string(),
            source: "stripe".to_string(),
            payload: serde_json::json!({}),
            status: WebhookStatus::Pending,
            error_message: None,
            received_at: 1,
            processed_at: None,
        };

        let txn = storage.begin_write().unwrap();
        assert!(storage.insert_webhook_if_absent(&txn, &event).unwrap().is_none());

        let mut second = event.clone();
        second.id = "internal-2".to_string();
        let existing = storage
            .insert_webhook_if_absent(&txn, &second)
            .unwrap()
            .expect("first insert visible in same txn");
        assert_eq!(existing.id, "internal-1");
        txn.commit().unwrap();
    }
}
