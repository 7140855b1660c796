use crate::bookings::traits::BookingError;
use crate::storage::StorageError;
use shared::booking::{BookingStatus, CommandError, CommandErrorCode};
use thiserror::Error;

/// Manager errors
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Booking not found: {0}")]
    BookingNotFound(String),

    #[error("Room not found: {0}")]
    RoomNotFound(i64),

    #[error("Room unavailable: {blocked} blocked conflict(s), {bookings} booking conflict(s)")]
    RoomUnavailable { blocked: u32, bookings: u32 },

    #[error("No applicable price configured for room {0}")]
    NoApplicablePrice(i64),

    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),

    #[error("Minimum stay not met for rule '{rule}': requires {required}, got {actual}")]
    MinStayNotMet {
        rule: String,
        required: i64,
        actual: i64,
    },

    #[error("Party of {size} exceeds capacity {capacity}")]
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

    #[error("Outstanding balance of {balance:.2}")]
    BalanceOutstanding { balance: f64 },

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Classify a storage error into a response code (the caller localizes)
fn classify_storage_error(e: &StorageError) -> CommandErrorCode {
    // Exact variants first
    match e {
        StorageError::Serialization(_) => return CommandErrorCode::InternalError,
        StorageError::BookingNotFound(_) => return CommandErrorCode::BookingNotFound,
        _ => {}
    }

    // redb errors are classified by message
    let err_str = e.to_string().to_lowercase();

    if err_str.contains("no space") || err_str.contains("disk full") || err_str.contains("enospc")
    {
        return CommandErrorCode::StorageFull;
    }

    if err_str.contains("out of memory") || err_str.contains("cannot allocate") {
        return CommandErrorCode::OutOfMemory;
    }

    if err_str.contains("corrupt") || err_str.contains("invalid database") {
        return CommandErrorCode::StorageCorrupted;
    }

    CommandErrorCode::SystemBusy
}

impl From<ManagerError> for CommandError {
    fn from(err: ManagerError) -> Self {
        let (code, message) = match err {
            ManagerError::Storage(e) => {
                let code = classify_storage_error(&e);
                let message = e.to_string();
                tracing::error!(error = %e, error_code = ?code, "Storage error occurred");
                (code, message)
            }
            ManagerError::BookingNotFound(id) => (
                CommandErrorCode::BookingNotFound,
                format!("Booking not found: {}", id),
            ),
            ManagerError::RoomNotFound(id) => (
                CommandErrorCode::RoomNotFound,
                format!("Room not found: {}", id),
            ),
            ManagerError::RoomUnavailable { blocked, bookings } => (
                CommandErrorCode::RoomUnavailable,
                format!(
                    "Room unavailable: {} blocked conflict(s), {} booking conflict(s)",
                    blocked, bookings
                ),
            ),
            ManagerError::NoApplicablePrice(id) => (
                CommandErrorCode::NoApplicablePrice,
                format!("No applicable price configured for room {}", id),
            ),
            ManagerError::InvalidDateRange(msg) => (CommandErrorCode::InvalidDateRange, msg),
            ManagerError::MinStayNotMet {
                rule,
                required,
                actual,
            } => (
                CommandErrorCode::MinStayNotMet,
                format!(
                    "Minimum stay not met for rule '{}': requires {} night(s), got {}",
                    rule, required, actual
                ),
            ),
            ManagerError::PartyExceedsCapacity { size, capacity } => (
                CommandErrorCode::PartyExceedsCapacity,
                format!("Party of {} exceeds capacity {}", size, capacity),
            ),
            ManagerError::InvalidParty(msg) => (CommandErrorCode::InvalidParty, msg),
            ManagerError::InvalidTransition { from, action } => {
                // A caller bug, not a domain condition: fail loudly
                tracing::error!(
                    from = ?from,
                    action = action,
                    "Rejected undefined state transition"
                );
                (
                    CommandErrorCode::InvalidTransition,
                    format!("Transition '{}' not permitted from status {:?}", action, from),
                )
            }
            ManagerError::BeforeCheckInDate { check_in } => (
                CommandErrorCode::CheckInTooEarly,
                format!("Check-in not permitted before {}", check_in),
            ),
            ManagerError::BalanceOutstanding { balance } => (
                CommandErrorCode::BalanceOutstanding,
                format!(
                    "Outstanding balance of {:.2} must be settled or written off",
                    balance
                ),
            ),
            ManagerError::Internal(msg) => (CommandErrorCode::InternalError, msg),
        };
        CommandError::new(code, message)
    }
}

impl From<BookingError> for ManagerError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::BookingNotFound(id) => ManagerError::BookingNotFound(id),
            BookingError::RoomNotFound(id) => ManagerError::RoomNotFound(id),
            BookingError::RoomUnavailable { blocked, bookings } => {
                ManagerError::RoomUnavailable { blocked, bookings }
            }
            BookingError::NoApplicablePrice(id) => ManagerError::NoApplicablePrice(id),
            BookingError::InvalidDateRange(msg) => ManagerError::InvalidDateRange(msg),
            BookingError::MinStayNotMet {
                rule,
                required,
                actual,
            } => ManagerError::MinStayNotMet {
                rule,
                required,
                actual,
            },
            BookingError::PartyExceedsCapacity { size, capacity } => {
                ManagerError::PartyExceedsCapacity { size, capacity }
            }
            BookingError::InvalidParty(msg) => ManagerError::InvalidParty(msg),
            BookingError::InvalidTransition { from, action } => {
                ManagerError::InvalidTransition { from, action }
            }
            BookingError::BeforeCheckInDate { check_in } => {
                ManagerError::BeforeCheckInDate { check_in }
            }
            BookingError::BalanceOutstanding { balance } => {
                ManagerError::BalanceOutstanding { balance }
            }
            BookingError::Storage(msg) => ManagerError::Internal(msg),
        }
    }
}

pub type ManagerResult<T> = Result<T, ManagerError>;
