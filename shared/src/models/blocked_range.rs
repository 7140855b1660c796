//! Blocked date range model
//!
//! An administrative hold on a room, independent of bookings. Both boundary
//! dates are inclusive: a block 2025-12-24..2025-12-26 occupies all three days.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Block reason (preset options)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockReason {
    Maintenance,
    OwnerHold,
    Renovation,
    Other,
}

/// Administrative hold on a room for a date range
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedDateRange {
    pub id: i64,
    pub room_id: i64,
    /// First blocked day (inclusive)
    pub start_date: NaiveDate,
    /// Last blocked day (inclusive)
    pub end_date: NaiveDate,
    pub reason: BlockReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Owner or staff member who created the hold
    pub created_by: i64,
    pub created_at: i64,
}

impl BlockedDateRange {
    /// Whether the hold is entirely in the past (eligible for purge)
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.end_date < today
    }
}
