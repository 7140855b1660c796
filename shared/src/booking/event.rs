//! Booking events - immutable facts recorded after command processing

use super::types::{BookingSource, PartyInfo, RateSegment, StayDates};
use serde::{Deserialize, Serialize};

/// Booking event - immutable audit record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingEvent {
    /// Event unique ID
    pub event_id: String,
    /// Global sequence number (for ordering and replay)
    /// This is the AUTHORITATIVE ordering mechanism for state evolution
    pub sequence: u64,
    /// Booking this event belongs to
    pub booking_id: String,
    /// Server timestamp (Unix milliseconds) - AUTHORITATIVE for state evolution
    /// Always set by server when the event is created
    pub timestamp: i64,
    /// Client timestamp (Unix milliseconds) - for audit and debugging
    /// Preserved from the original command, may differ due to clock skew
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_timestamp: Option<i64>,
    /// Actor who triggered this event
    pub actor_id: i64,
    /// Actor name (snapshot for audit)
    pub actor_name: String,
    /// Command that triggered this event (for audit tracing)
    pub command_id: String,
    /// Event type
    pub event_type: BookingEventType,
    /// Event payload
    pub payload: EventPayload,
}

/// Event type enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingEventType {
    BookingCreated,
    BookingReserved,
    StayDatesUpdated,
    GuestCheckedIn,
    GuestCheckedOut,
    BookingCancelled,
}

impl std::fmt::Display for BookingEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookingEventType::BookingCreated => write!(f, "BOOKING_CREATED"),
            BookingEventType::BookingReserved => write!(f, "BOOKING_RESERVED"),
            BookingEventType::StayDatesUpdated => write!(f, "STAY_DATES_UPDATED"),
            BookingEventType::GuestCheckedIn => write!(f, "GUEST_CHECKED_IN"),
            BookingEventType::GuestCheckedOut => write!(f, "GUEST_CHECKED_OUT"),
            BookingEventType::BookingCancelled => write!(f, "BOOKING_CANCELLED"),
        }
    }
}

/// Event payload variants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventPayload {
    BookingCreated {
        room_id: i64,
        tourist_id: i64,
        business_id: i64,
        dates: StayDates,
        party: PartyInfo,
        source: BookingSource,
        /// Total computed by the pricing resolver at creation
        total_price: f64,
        /// Per-rate breakdown backing the total
        segments: Vec<RateSegment>,
        /// Amount still owed (total minus any deposit taken upfront)
        balance_due: f64,
    },

    BookingReserved {
        /// Paid payment that reserved the booking
        payment_id: String,
        /// Confirmed amount (full total or a policy-defined deposit)
        amount_paid: f64,
    },

    StayDatesUpdated {
        previous: StayDates,
        dates: StayDates,
        /// Re-resolved total for the new range
        total_price: f64,
        segments: Vec<RateSegment>,
        balance_due: f64,
    },

    GuestCheckedIn {},

    GuestCheckedOut {
        /// Balance forgiven at departure, if any
        #[serde(skip_serializing_if = "Option::is_none")]
        written_off: Option<f64>,
    },

    BookingCancelled {
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        /// A paid payment existed at cancellation time
        refund_required: bool,
        /// The paid payment, when one existed
        #[serde(skip_serializing_if = "Option::is_none")]
        paid_payment_id: Option<String>,
    },
}

impl BookingEvent {
    /// Create a new event
    ///
    /// # Arguments
    /// * `sequence` - Global sequence number (authoritative ordering)
    /// * `booking_id` - Booking this event belongs to
    /// * `actor_id` / `actor_name` - Who triggered the event
    /// * `command_id` - Command that triggered this event
    /// * `client_timestamp` - Client-provided timestamp (may have clock skew)
    /// * `event_type` / `payload` - What happened
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sequence: u64,
        booking_id: String,
        actor_id: i64,
        actor_name: String,
        command_id: String,
        client_timestamp: Option<i64>,
        event_type: BookingEventType,
        payload: EventPayload,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            sequence,
            booking_id,
            // Server timestamp is ALWAYS set by server - this is authoritative
            timestamp: crate::util::now_millis(),
            client_timestamp,
            actor_id,
            actor_name,
            command_id,
            event_type,
            payload,
        }
    }
}
