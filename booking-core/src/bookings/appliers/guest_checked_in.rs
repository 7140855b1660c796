//! GuestCheckedIn event applier

use crate::bookings::traits::EventApplier;
use shared::booking::{BookingEvent, BookingSnapshot, BookingStatus, EventPayload};

/// GuestCheckedIn applier
pub struct GuestCheckedInApplier;

impl EventApplier for GuestCheckedInApplier {
    fn apply(&self, snapshot: &mut BookingSnapshot, event: &BookingEvent) {
        if let EventPayload::GuestCheckedIn {} = &event.payload {
            snapshot.status = BookingStatus::CheckedIn;
            snapshot.checked_in_at = Some(event.timestamp);

            snapshot.last_sequence = event.sequence;
            snapshot.updated_at = event.timestamp;
            snapshot.update_checksum();
        }
    }
}
