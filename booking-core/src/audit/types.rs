//! Audit log type definitions
//!
//! Entries are immutable and never deleted; the SHA-256 hash chain makes
//! tampering detectable.

use serde::{Deserialize, Serialize};

/// Audit action types (enum, not free text)
///
/// Grouped by domain so every sensitive operation has a distinct tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    // ═══ Bookings ═══
    BookingCreated,
    BookingReserved,
    BookingDatesChanged,
    BookingCheckedIn,
    BookingCheckedOut,
    BookingCancelled,

    // ═══ Payments ═══
    PaymentIntentOpened,
    PaymentConfirmed,
    PaymentFailed,
    PaymentRefunded,

    // ═══ Refunds ═══
    RefundRequested,
    RefundProcessing,
    RefundSucceeded,
    RefundFailed,
    RefundCancelled,

    // ═══ Inventory ═══
    RoomUpserted,
    RoomStatusChanged,
    RoomBlocked,
    RoomUnblocked,
    BlockedRangesPurged,
    SeasonRuleCreated,
    SeasonRuleDeactivated,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Audit log entry (immutable)
///
/// - `prev_hash`: hash of the previous entry ("" for the first)
/// - `curr_hash`: SHA-256 over prev_hash + all fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Globally increasing sequence id
    pub id: u64,
    /// Timestamp (Unix millis)
    pub timestamp: i64,
    pub action: AuditAction,
    /// Resource type, e.g. "booking", "payment", "room"
    pub resource_type: String,
    /// Resource id, e.g. the booking id or room id
    pub resource_id: String,
    /// Acting account (None for gateway/system events)
    pub actor_id: Option<i64>,
    pub actor_name: Option<String>,
    /// Structured details (JSON)
    pub details: serde_json::Value,
    pub prev_hash: String,
    pub curr_hash: String,
}

/// Chain verification result
#[derive(Debug, Serialize)]
pub struct AuditChainVerification {
    pub total_entries: u64,
    pub chain_intact: bool,
    pub breaks: Vec<AuditChainBreak>,
}

/// A point where the chain does not line up
#[derive(Debug, Serialize)]
pub struct AuditChainBreak {
    pub entry_id: u64,
    pub expected_prev_hash: String,
    pub actual_prev_hash: String,
}
