//! BookingReserved event applier

use crate::bookings::traits::EventApplier;
use crate::money::{to_decimal, to_f64};
use rust_decimal::Decimal;
use shared::booking::{BookingEvent, BookingSnapshot, BookingStatus, EventPayload};

/// BookingReserved applier
pub struct BookingReservedApplier;

impl EventApplier for BookingReservedApplier {
    fn apply(&self, snapshot: &mut BookingSnapshot, event: &BookingEvent) {
        if let EventPayload::BookingReserved {
            payment_id,
            amount_paid,
        } = &event.payload
        {
            snapshot.status = BookingStatus::Reserved;
            snapshot.reserved_by_payment = Some(payment_id.clone());

            // Reduce the balance by the confirmed amount, floored at zero
            let remaining = to_decimal(snapshot.balance_due) - to_decimal(*amount_paid);
            snapshot.balance_due = to_f64(remaining.max(Decimal::ZERO));

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

    fn reserved_event(seq: u64, amount: f64) -> BookingEvent {
        BookingEvent::new(
            seq,
            "b-1".to_string(),
            0,
            "payment-ledger".to_string(),
            "cmd-1".to_string(),
            None,
            BookingEventType::BookingReserved,
            EventPayload::BookingReserved {
                payment_id: "p-1".to_string(),
                amount_paid: amount,
            },
        )
    }

    #[test]
    fn test_full_payment_zeroes_balance() {
        let mut snapshot = BookingSnapshot::new("b-1".to_string());
        snapshot.total_price = 3000.0;
        snapshot.balance_due = 3000.0;

        BookingReservedApplier.apply(&mut snapshot, &reserved_event(2, 3000.0));

        assert_eq!(snapshot.status, BookingStatus::Reserved);
        assert_eq!(snapshot.reserved_by_payment.as_deref(), Some("p-1"));
        assert_eq!(snapshot.balance_due, 0.0);
        assert_eq!(snapshot.last_sequence, 2);
    }

    #[test]
    fn test_deposit_leaves_partial_balance() {
        let mut snapshot = BookingSnapshot::new("b-1".to_string());
        snapshot.total_price = 3000.0;
        snapshot.balance_due = 3000.0;

        BookingReservedApplier.apply(&mut snapshot, &reserved_event(2, 1000.0));

        assert_eq!(snapshot.status, BookingStatus::Reserved);
        assert_eq!(snapshot.balance_due, 2000.0);
    }

    #[test]
    fn test_overpayment_floors_at_zero() {
        let mut snapshot = BookingSnapshot::new("b-1".to_string());
        snapshot.total_price = 3000.0;
        snapshot.balance_due = 3000.0;

        BookingReservedApplier.apply(&mut snapshot, &reserved_event(2, 3500.0));

        assert_eq!(snapshot.balance_due, 0.0);
    }
}
