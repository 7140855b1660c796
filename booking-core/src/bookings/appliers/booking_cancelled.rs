//! BookingCancelled event applier

use crate::bookings::traits::EventApplier;
use shared::booking::{BookingEvent, BookingSnapshot, BookingStatus, EventPayload};

/// BookingCancelled applier
pub struct BookingCancelledApplier;

impl EventApplier for BookingCancelledApplier {
    fn apply(&self, snapshot: &mut BookingSnapshot, event: &BookingEvent) {
        if let EventPayload::BookingCancelled { .. } = &event.payload {
            snapshot.status = BookingStatus::Cancelled;
            snapshot.cancelled_at = Some(event.timestamp);

            snapshot.last_sequence = event.sequence;
            snapshot.updated_at = event.timestamp;
            snapshot.update_checksum();
        }
    }
}
