//! Event replay
//!
//! Recomputes a booking snapshot from its event stream. Used for recovery
//! and drift checks; the manager keeps snapshots incrementally, so replay is
//! the reference implementation the incremental path must agree with.

use shared::booking::{BookingEvent, BookingSnapshot};

use super::appliers::EventAction;
use super::traits::EventApplier;

/// Fold a booking's events into a fresh snapshot
pub fn replay_booking(booking_id: &str, events: &[BookingEvent]) -> BookingSnapshot {
    let mut snapshot = BookingSnapshot::new(booking_id.to_string());

    let mut ordered: Vec<&BookingEvent> = events
        .iter()
        .filter(|e| e.booking_id == booking_id)
        .collect();
    ordered.sort_by_key(|e| e.sequence);

    for event in ordered {
        let applier: EventAction = event.into();
        applier.apply(&mut snapshot, event);
    }
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bookings::test_support::date;
    use shared::booking::{
        BookingEventType, BookingSource, BookingStatus, EventPayload, PartyInfo, StayDates,
    };

    fn event(seq: u64, event_type: BookingEventType, payload: EventPayload) -> BookingEvent {
        BookingEvent::new(
            seq,
            "b-1".to_string(),
            42,
            "Test Staff".to_string(),
            format!("cmd-{seq}"),
            None,
            event_type,
            payload,
        )
    }

    #[test]
    fn test_replay_full_lifecycle() {
        let events = vec![
            event(
                1,
                BookingEventType::BookingCreated,
                EventPayload::BookingCreated {
                    room_id: 1,
                    tourist_id: 500,
                    business_id: 10,
                    dates: StayDates::new(date(2025, 12, 24), date(2025, 12, 27)).unwrap(),
                    party: PartyInfo {
                        adults: 2,
                        children: 0,
                        note: None,
                    },
                    source: BookingSource::Online,
                    total_price: 3000.0,
                    segments: vec![],
                    balance_due: 3000.0,
                },
            ),
            event(
                2,
                BookingEventType::BookingReserved,
                EventPayload::BookingReserved {
                    payment_id: "p-1".to_string(),
                    amount_paid: 3000.0,
                },
            ),
            event(3, BookingEventType::GuestCheckedIn, EventPayload::GuestCheckedIn {}),
            event(
                4,
                BookingEventType::GuestCheckedOut,
                EventPayload::GuestCheckedOut { written_off: None },
            ),
        ];

        let snapshot = replay_booking("b-1", &events);

        assert_eq!(snapshot.status, BookingStatus::CheckedOut);
        assert_eq!(snapshot.balance_due, 0.0);
        assert_eq!(snapshot.reserved_by_payment.as_deref(), Some("p-1"));
        assert_eq!(snapshot.last_sequence, 4);
        assert!(snapshot.verify_checksum());
    }

    #[test]
    fn test_replay_is_order_insensitive_on_input() {
        let created = event(
            1,
            BookingEventType::BookingCreated,
            EventPayload::BookingCreated {
                room_id: 1,
                tourist_id: 500,
                business_id: 10,
                dates: StayDates::new(date(2025, 12, 24), date(2025, 12, 27)).unwrap(),
                party: PartyInfo::default(),
                source: BookingSource::Online,
                total_price: 3000.0,
                segments: vec![],
                balance_due: 3000.0,
            },
        );
        let reserved = event(
            2,
            BookingEventType::BookingReserved,
            EventPayload::BookingReserved {
                payment_id: "p-1".to_string(),
                amount_paid: 3000.0,
            },
        );

        // Shuffled input: sequence numbers decide, not slice order
        let snapshot = replay_booking("b-1", &[reserved.clone(), created.clone()]);
        assert_eq!(snapshot.status, BookingStatus::Reserved);

        let same = replay_booking("b-1", &[created, reserved]);
        assert_eq!(snapshot, same);
    }
}
