//! Booking snapshot - computed state from the event stream
//!
//! The snapshot carries a `state_checksum` for drift detection: replicas that
//! fold the same events can compare checksums and trigger a full resync when
//! their reducer has diverged.

use super::types::{BookingSource, PartyInfo, RateSegment, StayDates};
use serde::{Deserialize, Serialize};
use std::hash::Hash;

/// Booking status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    /// Created, awaiting payment
    #[default]
    Pending,
    /// A payment was confirmed; the stay is held
    Reserved,
    CheckedIn,
    CheckedOut,
    Cancelled,
}

impl BookingStatus {
    /// Terminal states accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::CheckedOut | BookingStatus::Cancelled)
    }

    /// Whether a booking in this status occupies its date range
    /// for availability purposes
    pub fn occupies(&self) -> bool {
        !matches!(self, BookingStatus::Cancelled)
    }
}

/// Booking snapshot - computed from the event stream
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingSnapshot {
    /// Booking ID (assigned by server)
    pub booking_id: String,
    pub room_id: i64,
    pub tourist_id: i64,
    pub business_id: i64,
    pub dates: StayDates,
    pub party: PartyInfo,
    pub source: BookingSource,
    pub status: BookingStatus,
    /// Total price resolved at creation (or last date change)
    pub total_price: f64,
    /// Amount still owed
    pub balance_due: f64,
    /// Breakdown backing `total_price`
    pub segments: Vec<RateSegment>,
    /// Paid payment that reserved the booking, once one exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reserved_by_payment: Option<String>,
    /// Actual arrival time (Unix millis)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked_in_at: Option<i64>,
    /// Actual departure time (Unix millis)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked_out_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<i64>,
    /// Creation timestamp
    pub created_at: i64,
    /// Last update timestamp
    pub updated_at: i64,
    /// Last applied event sequence (for incremental updates)
    pub last_sequence: u64,
    /// State checksum for drift detection (hex string)
    #[serde(default)]
    pub state_checksum: String,
}

impl BookingSnapshot {
    /// Create a new empty snapshot; real fields arrive with BookingCreated
    pub fn new(booking_id: String) -> Self {
        let now = crate::util::now_millis();
        let epoch = chrono::NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        let mut snapshot = Self {
            booking_id,
            room_id: 0,
            tourist_id: 0,
            business_id: 0,
            dates: StayDates {
                check_in: epoch,
                check_out: epoch + chrono::Duration::days(1),
            },
            party: PartyInfo::default(),
            source: BookingSource::default(),
            status: BookingStatus::Pending,
            total_price: 0.0,
            balance_due: 0.0,
            segments: Vec::new(),
            reserved_by_payment: None,
            checked_in_at: None,
            checked_out_at: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
            last_sequence: 0,
            state_checksum: String::new(),
        };
        snapshot.update_checksum();
        snapshot
    }

    pub fn is_pending(&self) -> bool {
        self.status == BookingStatus::Pending
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == BookingStatus::Cancelled
    }

    /// Compute state checksum for drift detection
    ///
    /// Fields included: total/balance in cents (avoids float precision
    /// issues), last applied sequence, status discriminant, stay dates.
    /// Returns a 16-character hex string.
    pub fn compute_checksum(&self) -> String {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::Hasher as _;

        let mut hasher = DefaultHasher::new();

        ((self.total_price * 100.0).round() as i64).hash(&mut hasher);
        ((self.balance_due * 100.0).round() as i64).hash(&mut hasher);
        self.last_sequence.hash(&mut hasher);
        (self.status as u8).hash(&mut hasher);
        self.dates.check_in.hash(&mut hasher);
        self.dates.check_out.hash(&mut hasher);

        format!("{:016x}", hasher.finish())
    }

    /// Update the state_checksum field based on current state
    pub fn update_checksum(&mut self) {
        self.state_checksum = self.compute_checksum();
    }

    /// Verify that the state_checksum matches the computed checksum
    pub fn verify_checksum(&self) -> bool {
        self.state_checksum == self.compute_checksum()
    }
}
