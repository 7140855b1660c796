//! BookingCreated event applier

use crate::bookings::traits::EventApplier;
use shared::booking::{BookingEvent, BookingSnapshot, BookingStatus, EventPayload};

/// BookingCreated applier
pub struct BookingCreatedApplier;

impl EventApplier for BookingCreatedApplier {
    fn apply(&self, snapshot: &mut BookingSnapshot, event: &BookingEvent) {
        if let EventPayload::BookingCreated {
            room_id,
            tourist_id,
            business_id,
            dates,
            party,
            source,
            total_price,
            segments,
            balance_due,
        } = &event.payload
        {
            snapshot.room_id = *room_id;
            snapshot.tourist_id = *tourist_id;
            snapshot.business_id = *business_id;
            snapshot.dates = *dates;
            snapshot.party = party.clone();
            snapshot.source = *source;
            snapshot.status = BookingStatus::Pending;
            snapshot.total_price = *total_price;
            snapshot.balance_due = *balance_due;
            snapshot.segments = segments.clone();
            snapshot.created_at = event.timestamp;

            snapshot.last_sequence = event.sequence;
            snapshot.updated_at = event.timestamp;
            snapshot.update_checksum();
        }
    }
}
