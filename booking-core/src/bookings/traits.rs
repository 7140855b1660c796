//! Command/event traits for the booking state machine
//!
//! Actions validate a command against current state and emit events; appliers
//! fold events into snapshots. Both run inside the manager's single write
//! transaction via `CommandContext`.

use async_trait::async_trait;
use redb::WriteTransaction;
use shared::booking::{BookingEvent, BookingSnapshot, BookingStatus};
use std::collections::HashMap;
use thiserror::Error;

use crate::storage::CoreStorage;

/// Action-level errors
#[derive(Debug, Error)]
pub enum BookingError {
    #[error("Booking not found: {0}")]
    BookingNotFound(String),

    #[error("Room not found: {0}")]
    RoomNotFound(i64),

    #[error("Room unavailable: {blocked} blocked-range conflict(s), {bookings} booking conflict(s)")]
    RoomUnavailable { blocked: u32, bookings: u32 },

    #[error("No applicable price configured for room {0}")]
    NoApplicablePrice(i64),

    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),

    #[error("Minimum stay not met for rule '{rule}': requires {required} night(s), stay segment has {actual}")]
    MinStayNotMet {
        rule: String,
        required: i64,
        actual: i64,
    },

    #[error("Party of {size} exceeds room capacity {capacity}")]
    PartyExceedsCapacity { size: i32, capacity: i32 },

    #[error("Invalid party composition: {0}")]
    InvalidParty(String),

    #[error("Transition '{action}' not permitted from status {from:?}")]
    InvalidTransition {
        from: BookingStatus,
        action: &'static str,
    },

    #[error("Check-in not permitted before {check_in}")]
    BeforeCheckInDate { check_in: chrono::NaiveDate },

    #[error("Outstanding balance of {balance:.2} must be settled or written off")]
    BalanceOutstanding { balance: f64 },

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Command metadata threaded to every action
#[derive(Debug, Clone)]
pub struct CommandMetadata {
    pub command_id: String,
    pub actor_id: i64,
    pub actor_name: String,
    /// Client timestamp (Unix millis)
    pub timestamp: i64,
}

/// Execution context for one command
///
/// Wraps the write transaction, caches snapshots modified by earlier events
/// of the same command, and allocates sequence numbers.
pub struct CommandContext<'a> {
    txn: &'a WriteTransaction,
    storage: &'a CoreStorage,
    sequence: u64,
    snapshots: HashMap<String, BookingSnapshot>,
}

impl<'a> CommandContext<'a> {
    pub fn new(txn: &'a WriteTransaction, storage: &'a CoreStorage, current_sequence: u64) -> Self {
        Self {
            txn,
            storage,
            sequence: current_sequence,
            snapshots: HashMap::new(),
        }
    }

    /// Allocate the next global sequence number
    pub fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    /// Highest sequence allocated so far
    pub fn current_sequence(&self) -> u64 {
        self.sequence
    }

    /// Load a snapshot, preferring uncommitted modifications from this command
    pub fn load_snapshot(&mut self, booking_id: &str) -> Result<BookingSnapshot, BookingError> {
        if let Some(snapshot) = self.snapshots.get(booking_id) {
            return Ok(snapshot.clone());
        }
        match self.storage.get_snapshot_txn(self.txn, booking_id) {
            Ok(Some(snapshot)) => Ok(snapshot),
            Ok(None) => Err(BookingError::BookingNotFound(booking_id.to_string())),
            Err(e) => Err(BookingError::Storage(e.to_string())),
        }
    }

    /// Stage a modified snapshot for persistence at commit
    pub fn save_snapshot(&mut self, snapshot: BookingSnapshot) {
        self.snapshots.insert(snapshot.booking_id.clone(), snapshot);
    }

    /// Snapshots modified by this command
    pub fn modified_snapshots(&self) -> impl Iterator<Item = &BookingSnapshot> {
        self.snapshots.values()
    }

    pub fn storage(&self) -> &CoreStorage {
        self.storage
    }

    pub fn txn(&self) -> &WriteTransaction {
        self.txn
    }
}

/// A command handler: validate against current state, emit events
#[async_trait]
pub trait CommandHandler {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<BookingEvent>, BookingError>;
}

/// An event applier: fold one event into the snapshot
pub trait EventApplier {
    fn apply(&self, snapshot: &mut BookingSnapshot, event: &BookingEvent);
}
