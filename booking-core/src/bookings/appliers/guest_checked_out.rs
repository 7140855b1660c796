//! GuestCheckedOut event applier

use crate::bookings::traits::EventApplier;
use shared::booking::{BookingEvent, BookingSnapshot, BookingStatus, EventPayload};

/// GuestCheckedOut applier
pub struct GuestCheckedOutApplier;

impl EventApplier for GuestCheckedOutApplier {
    fn apply(&self, snapshot: &mut BookingSnapshot, event: &BookingEvent) {
        if let EventPayload::GuestCheckedOut { written_off } = &event.payload {
            snapshot.status = BookingStatus::CheckedOut;
            snapshot.checked_out_at = Some(event.timestamp);
            if written_off.is_some() {
                // Balance explicitly forgiven at departure
                snapshot.balance_due = 0.0;
            }

            snapshot.last_sequence = event.sequence;
            snapshot.updated_at = event.timestamp;
            snapshot.update_checksum();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::booking::BookingEventType;

    fn checked_out_event(written_off: Option<f64>) -> BookingEvent {
        BookingEvent::new(
            5,
            "b-1".to_string(),
            42,
            "Front Desk".to_string(),
            "cmd-4".to_string(),
            None,
            BookingEventType::GuestCheckedOut,
            EventPayload::GuestCheckedOut { written_off },
        )
    }

    #[test]
    fn test_checked_out_applier() {
        let mut snapshot = BookingSnapshot::new("b-1".to_string());
        snapshot.status = BookingStatus::CheckedIn;
        snapshot.balance_due = 0.0;

        GuestCheckedOutApplier.apply(&mut snapshot, &checked_out_event(None));

        assert_eq!(snapshot.status, BookingStatus::CheckedOut);
        assert!(snapshot.checked_out_at.is_some());
    }

    #[test]
    fn test_checked_out_write_off_clears_balance() {
        let mut snapshot = BookingSnapshot::new("b-1".to_string());
        snapshot.status = BookingStatus::CheckedIn;
        snapshot.balance_due = 500.0;

        GuestCheckedOutApplier.apply(&mut snapshot, &checked_out_event(Some(500.0)));

        assert_eq!(snapshot.balance_due, 0.0);
    }
}
