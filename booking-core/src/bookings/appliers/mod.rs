//! Event applier implementations
//!
//! Each applier folds one event type into the booking snapshot. Appliers are
//! pure state updates: validation happened in the action that emitted the
//! event.

use crate::bookings::traits::EventApplier;
use shared::booking::{BookingEvent, BookingEventType, BookingSnapshot};

mod booking_cancelled;
mod booking_created;
mod booking_reserved;
mod guest_checked_in;
mod guest_checked_out;
mod stay_dates_updated;

pub use booking_cancelled::BookingCancelledApplier;
pub use booking_created::BookingCreatedApplier;
pub use booking_reserved::BookingReservedApplier;
pub use guest_checked_in::GuestCheckedInApplier;
pub use guest_checked_out::GuestCheckedOutApplier;
pub use stay_dates_updated::StayDatesUpdatedApplier;

/// EventAction enum - dispatches to concrete applier implementations
pub enum EventAction {
    BookingCreated(BookingCreatedApplier),
    BookingReserved(BookingReservedApplier),
    StayDatesUpdated(StayDatesUpdatedApplier),
    GuestCheckedIn(GuestCheckedInApplier),
    GuestCheckedOut(GuestCheckedOutApplier),
    BookingCancelled(BookingCancelledApplier),
}

impl From<&BookingEvent> for EventAction {
    fn from(event: &BookingEvent) -> Self {
        match event.event_type {
            BookingEventType::BookingCreated => EventAction::BookingCreated(BookingCreatedApplier),
            BookingEventType::BookingReserved => {
                EventAction::BookingReserved(BookingReservedApplier)
            }
            BookingEventType::StayDatesUpdated => {
                EventAction::StayDatesUpdated(StayDatesUpdatedApplier)
            }
            BookingEventType::GuestCheckedIn => EventAction::GuestCheckedIn(GuestCheckedInApplier),
            BookingEventType::GuestCheckedOut => {
                EventAction::GuestCheckedOut(GuestCheckedOutApplier)
            }
            BookingEventType::BookingCancelled => {
                EventAction::BookingCancelled(BookingCancelledApplier)
            }
        }
    }
}

impl EventApplier for EventAction {
    fn apply(&self, snapshot: &mut BookingSnapshot, event: &BookingEvent) {
        match self {
            EventAction::BookingCreated(applier) => applier.apply(snapshot, event),
            EventAction::BookingReserved(applier) => applier.apply(snapshot, event),
            EventAction::StayDatesUpdated(applier) => applier.apply(snapshot, event),
            EventAction::GuestCheckedIn(applier) => applier.apply(snapshot, event),
            EventAction::GuestCheckedOut(applier) => applier.apply(snapshot, event),
            EventAction::BookingCancelled(applier) => applier.apply(snapshot, event),
        }
    }
}
