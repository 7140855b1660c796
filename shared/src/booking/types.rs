//! Shared types for booking event sourcing

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Stay dates
// ============================================================================

/// Malformed stay date range
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateRangeError {
    #[error("check-out {check_out} must be after check-in {check_in}")]
    EmptyRange {
        check_in: NaiveDate,
        check_out: NaiveDate,
    },
    #[error("stay of {nights} nights exceeds maximum {max}")]
    TooLong { nights: i64, max: i64 },
}

/// A stay interval, half-open: the guest occupies the nights
/// [check_in, check_out) and vacates on the check-out morning.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StayDates {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

/// Upper bound on a single stay; longer stays are split by callers
pub const MAX_STAY_NIGHTS: i64 = 365;

impl StayDates {
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Result<Self, DateRangeError> {
        let dates = Self {
            check_in,
            check_out,
        };
        dates.validate()?;
        Ok(dates)
    }

    pub fn validate(&self) -> Result<(), DateRangeError> {
        if self.check_out <= self.check_in {
            return Err(DateRangeError::EmptyRange {
                check_in: self.check_in,
                check_out: self.check_out,
            });
        }
        let nights = self.nights();
        if nights > MAX_STAY_NIGHTS {
            return Err(DateRangeError::TooLong {
                nights,
                max: MAX_STAY_NIGHTS,
            });
        }
        Ok(())
    }

    /// Number of nights in the stay
    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }

    /// Iterate the occupied nights (check-out day excluded)
    pub fn iter_nights(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.check_in.iter_days().take(self.nights() as usize)
    }
}

// ============================================================================
// Party / source
// ============================================================================

/// Guest composition for a booking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PartyInfo {
    pub adults: i32,
    #[serde(default)]
    pub children: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl PartyInfo {
    pub fn size(&self) -> i32 {
        self.adults + self.children
    }
}

/// Where the booking originated
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingSource {
    #[default]
    Online,
    WalkIn,
}

// ============================================================================
// Pricing
// ============================================================================

/// One run of consecutive nights billed at the same rate
///
/// `rule_id` is None when the room's base rate applied.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateSegment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_name: Option<String>,
    pub nights: i64,
    pub nightly_rate: f64,
    pub subtotal: f64,
}

// ============================================================================
// Commands
// ============================================================================

/// Booking command envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingCommand {
    /// Client-generated id, deduplication key for retries
    pub command_id: String,
    /// Acting account (tourist or staff)
    pub actor_id: i64,
    /// Actor name (snapshot for audit)
    pub actor_name: String,
    /// Client timestamp (Unix millis)
    pub timestamp: i64,
    pub payload: BookingCommandPayload,
}

/// Command payload variants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingCommandPayload {
    CreateBooking {
        room_id: i64,
        tourist_id: i64,
        business_id: i64,
        dates: StayDates,
        party: PartyInfo,
        source: BookingSource,
    },
    /// Driven by the payment ledger when a payment for the booking is
    /// confirmed; never issued directly by tourists or staff.
    MarkReserved {
        booking_id: String,
        payment_id: String,
    },
    /// Stay dates may change only while the booking is Pending.
    UpdateStayDates {
        booking_id: String,
        dates: StayDates,
    },
    CheckIn {
        booking_id: String,
    },
    CheckOut {
        booking_id: String,
        /// Explicitly forgive a non-zero balance at departure
        #[serde(default)]
        write_off_balance: bool,
    },
    CancelBooking {
        booking_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

impl BookingCommandPayload {
    /// Booking the command addresses, if it targets an existing one
    pub fn booking_id(&self) -> Option<&str> {
        match self {
            BookingCommandPayload::CreateBooking { .. } => None,
            BookingCommandPayload::MarkReserved { booking_id, .. }
            | BookingCommandPayload::UpdateStayDates { booking_id, .. }
            | BookingCommandPayload::CheckIn { booking_id }
            | BookingCommandPayload::CheckOut { booking_id, .. }
            | BookingCommandPayload::CancelBooking { booking_id, .. } => Some(booking_id),
        }
    }
}

// ============================================================================
// Responses
// ============================================================================

/// Command response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse {
    /// The command ID this responds to
    pub command_id: String,
    /// Whether the command succeeded
    pub success: bool,
    /// New booking ID (only for CreateBooking)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<String>,
    /// Error details if failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CommandError>,
}

impl CommandResponse {
    pub fn success(command_id: String, booking_id: Option<String>) -> Self {
        Self {
            command_id,
            success: true,
            booking_id,
            error: None,
        }
    }

    pub fn error(command_id: String, error: CommandError) -> Self {
        Self {
            command_id,
            success: false,
            booking_id: None,
            error: Some(error),
        }
    }

    pub fn duplicate(command_id: String) -> Self {
        Self {
            command_id,
            success: true,
            booking_id: None,
            error: None,
        }
    }
}

/// Command error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandError {
    pub code: CommandErrorCode,
    pub message: String,
}

impl CommandError {
    pub fn new(code: CommandErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Command error codes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandErrorCode {
    BookingNotFound,
    RoomNotFound,
    /// Date range overlaps a block or another booking
    RoomUnavailable,
    /// Room has neither a base rate nor a covering rule (configuration error)
    NoApplicablePrice,
    InvalidDateRange,
    MinStayNotMet,
    PartyExceedsCapacity,
    InvalidParty,
    /// Transition not defined by the state machine (caller bug)
    InvalidTransition,
    CheckInTooEarly,
    BalanceOutstanding,
    InvalidAmount,
    DuplicateCommand,
    InternalError,
    // Storage errors
    StorageFull,
    OutOfMemory,
    StorageCorrupted,
    SystemBusy,
}
