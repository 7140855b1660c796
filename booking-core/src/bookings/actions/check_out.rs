//! CheckOut command handler
//!
//! Staff action at departure. The balance must be zero (within the money
//! tolerance) or explicitly written off.

use async_trait::async_trait;

use crate::bookings::traits::{BookingError, CommandContext, CommandHandler, CommandMetadata};
use crate::money::{to_decimal, MONEY_TOLERANCE};
use shared::booking::{BookingEvent, BookingEventType, BookingStatus, EventPayload};

/// CheckOut action
#[derive(Debug, Clone)]
pub struct CheckOutAction {
    pub booking_id: String,
    pub write_off_balance: bool,
}

#[async_trait]
impl CommandHandler for CheckOutAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<BookingEvent>, BookingError> {
        let snapshot = ctx.load_snapshot(&self.booking_id)?;

        if snapshot.status != BookingStatus::CheckedIn {
            return Err(BookingError::InvalidTransition {
                from: snapshot.status,
                action: "check_out",
            });
        }

        let balance = to_decimal(snapshot.balance_due);
        let written_off = if balance > MONEY_TOLERANCE {
            if !self.write_off_balance {
                return Err(BookingError::BalanceOutstanding {
                    balance: snapshot.balance_due,
                });
            }
            Some(snapshot.balance_due)
        } else {
            None
        };

        let seq = ctx.next_sequence();
        let event = BookingEvent::new(
            seq,
            self.booking_id.clone(),
            metadata.actor_id,
            metadata.actor_name.clone(),
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            BookingEventType::GuestCheckedOut,
            EventPayload::GuestCheckedOut { written_off },
        );

        Ok(vec![event])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bookings::test_support::{date, make_metadata, store_booking};
    use crate::storage::CoreStorage;

    #[tokio::test]
    async fn test_check_out_with_zero_balance() {
        let storage = CoreStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let mut snapshot = store_booking(
            &storage,
            &txn,
            "b-1",
            1,
            date(2025, 12, 24),
            date(2025, 12, 27),
            BookingStatus::CheckedIn,
        );
        snapshot.total_price = 3000.0;
        snapshot.balance_due = 0.0;
        storage.store_snapshot(&txn, &snapshot).unwrap();

        let mut ctx = CommandContext::new(&txn, &storage, 0);
        let action = CheckOutAction {
            booking_id: "b-1".to_string(),
            write_off_balance: false,
        };
        let events = action.execute(&mut ctx, &make_metadata()).await.unwrap();

        assert_eq!(events[0].event_type, BookingEventType::GuestCheckedOut);
        if let EventPayload::GuestCheckedOut { written_off } = &events[0].payload {
            assert!(written_off.is_none());
        } else {
            panic!("Expected GuestCheckedOut payload");
        }
    }

    #[tokio::test]
    async fn test_check_out_with_outstanding_balance_fails() {
        let storage = CoreStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let mut snapshot = store_booking(
            &storage,
            &txn,
            "b-1",
            1,
            date(2025, 12, 24),
            date(2025, 12, 27),
            BookingStatus::CheckedIn,
        );
        snapshot.balance_due = 500.0;
        storage.store_snapshot(&txn, &snapshot).unwrap();

        let mut ctx = CommandContext::new(&txn, &storage, 0);
        let action = CheckOutAction {
            booking_id: "b-1".to_string(),
            write_off_balance: false,
        };
        let result = action.execute(&mut ctx, &make_metadata()).await;

        assert!(matches!(
            result,
            Err(BookingError::BalanceOutstanding { .. })
        ));
    }

    #[tokio::test]
    async fn test_check_out_write_off_records_amount() {
        let storage = CoreStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let mut snapshot = store_booking(
            &storage,
            &txn,
            "b-1",
            1,
            date(2025, 12, 24),
            date(2025, 12, 27),
            BookingStatus::CheckedIn,
        );
        snapshot.balance_due = 500.0;
        storage.store_snapshot(&txn, &snapshot).unwrap();

        let mut ctx = CommandContext::new(&txn, &storage, 0);
        let action = CheckOutAction {
            booking_id: "b-1".to_string(),
            write_off_balance: true,
        };
        let events = action.execute(&mut ctx, &make_metadata()).await.unwrap();

        if let EventPayload::GuestCheckedOut { written_off } = &events[0].payload {
            assert_eq!(*written_off, Some(500.0));
        } else {
            panic!("Expected GuestCheckedOut payload");
        }
    }

    #[tokio::test]
    async fn test_check_out_from_reserved_fails() {
        let storage = CoreStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        store_booking(
            &storage,
            &txn,
            "b-1",
            1,
            date(2025, 12, 24),
            date(2025, 12, 27),
            BookingStatus::Reserved,
        );

        let mut ctx = CommandContext::new(&txn, &storage, 0);
        let action = CheckOutAction {
            booking_id: "b-1".to_string(),
            write_off_balance: false,
        };
        let result = action.execute(&mut ctx, &make_metadata()).await;

        assert!(matches!(
            result,
            Err(BookingError::InvalidTransition {
                from: BookingStatus::Reserved,
                ..
            })
        ));
    }
}
