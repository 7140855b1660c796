//! MarkReserved command handler
//!
//! Driven by the payment ledger when a payment for the booking reaches
//! `Paid`; never issued directly by tourists or staff. Safe to re-run for
//! the same payment (webhook redelivery path): an already-reserved booking
//! yields no new events.

use async_trait::async_trait;

use crate::bookings::traits::{BookingError, CommandContext, CommandHandler, CommandMetadata};
use shared::booking::{BookingEvent, BookingEventType, BookingStatus, EventPayload};

/// MarkReserved action
#[derive(Debug, Clone)]
pub struct MarkReservedAction {
    pub booking_id: String,
    pub payment_id: String,
    /// Confirmed amount, injected by the ledger
    pub amount_paid: f64,
}

#[async_trait]
impl CommandHandler for MarkReservedAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<BookingEvent>, BookingError> {
        let snapshot = ctx.load_snapshot(&self.booking_id)?;

        match snapshot.status {
            BookingStatus::Pending => {}
            // Idempotent re-delivery of the same payment confirmation
            BookingStatus::Reserved
                if snapshot.reserved_by_payment.as_deref() == Some(&self.payment_id) =>
            {
                return Ok(vec![]);
            }
            from => {
                return Err(BookingError::InvalidTransition {
                    from,
                    action: "mark_reserved",
                });
            }
        }

        let seq = ctx.next_sequence();
        let event = BookingEvent::new(
            seq,
            self.booking_id.clone(),
            metadata.actor_id,
            metadata.actor_name.clone(),
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            BookingEventType::BookingReserved,
            EventPayload::BookingReserved {
                payment_id: self.payment_id.clone(),
                amount_paid: self.amount_paid,
            },
        );

        Ok(vec![event])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bookings::test_support::{date, make_metadata, store_booking};
    use crate::storage::CoreStorage;

    fn make_action() -> MarkReservedAction {
        MarkReservedAction {
            booking_id: "b-1".to_string(),
            payment_id: "p-1".to_string(),
            amount_paid: 3000.0,
        }
    }

    #[tokio::test]
    async fn test_mark_reserved_from_pending() {
        let storage = CoreStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        store_booking(
            &storage,
            &txn,
            "b-1",
            1,
            date(2025, 12, 24),
            date(2025, 12, 27),
            BookingStatus::Pending,
        );

        let mut ctx = CommandContext::new(&txn, &storage, 0);
        let events = make_action().execute(&mut ctx, &make_metadata()).await.unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, BookingEventType::BookingReserved);
    }

    #[tokio::test]
    async fn test_mark_reserved_idempotent_for_same_payment() {
        let storage = CoreStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let mut snapshot = store_booking(
            &storage,
            &txn,
            "b-1",
            1,
            date(2025, 12, 24),
            date(2025, 12, 27),
            BookingStatus::Reserved,
        );
        snapshot.reserved_by_payment = Some("p-1".to_string());
        storage.store_snapshot(&txn, &snapshot).unwrap();

        let mut ctx = CommandContext::new(&txn, &storage, 0);
        let events = make_action().execute(&mut ctx, &make_metadata()).await.unwrap();

        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_mark_reserved_rejected_from_checked_out() {
        let storage = CoreStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        store_booking(
            &storage,
            &txn,
            "b-1",
            1,
            date(2025, 12, 24),
            date(2025, 12, 27),
            BookingStatus::CheckedOut,
        );

        let mut ctx = CommandContext::new(&txn, &storage, 0);
        let result = make_action().execute(&mut ctx, &make_metadata()).await;

        assert!(matches!(
            result,
            Err(BookingError::InvalidTransition {
                from: BookingStatus::CheckedOut,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_mark_reserved_missing_booking_fails() {
        let storage = CoreStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();

        let mut ctx = CommandContext::new(&txn, &storage, 0);
        let result = make_action().execute(&mut ctx, &make_metadata()).await;

        assert!(matches!(result, Err(BookingError::BookingNotFound(_))));
    }
}
