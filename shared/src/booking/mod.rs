//! Booking lifecycle types
//!
//! Commands in, events out, snapshots as the computed state — the same
//! event-sourcing envelope the platform uses for every stateful aggregate.

pub mod event;
pub mod snapshot;
pub mod types;

pub use event::{BookingEvent, BookingEventType, EventPayload};
pub use snapshot::{BookingSnapshot, BookingStatus};
pub use types::{
    BookingCommand, BookingCommandPayload, BookingSource, CommandError, CommandErrorCode,
    CommandResponse, DateRangeError, PartyInfo, RateSegment, StayDates,
};
