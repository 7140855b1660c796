//! StayDatesUpdated event applier

use crate::bookings::traits::EventApplier;
use shared::booking::{BookingEvent, BookingSnapshot, EventPayload};

/// StayDatesUpdated applier
pub struct StayDatesUpdatedApplier;

impl EventApplier for StayDatesUpdatedApplier {
    fn apply(&self, snapshot: &mut BookingSnapshot, event: &BookingEvent) {
        if let EventPayload::StayDatesUpdated {
            dates,
            total_price,
            segments,
            balance_due,
            ..
        } = &event.payload
        {
            snapshot.dates = *dates;
            snapshot.total_price = *total_price;
            snapshot.segments = segments.clone();
            snapshot.balance_due = *balance_due;

            snapshot.last_sequence = event.sequence;
            snapshot.updated_at = event.timestamp;
            snapshot.update_checksum();
        }
    }
}
