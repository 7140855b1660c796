//! UpdateStayDates command handler
//!
//! Stay dates may change only while the booking is Pending. The new range
//! goes through the same availability and pricing gates as creation, with
//! the booking's own current dates excluded from the conflict scan.

use async_trait::async_trait;

use crate::availability;
use crate::bookings::traits::{BookingError, CommandContext, CommandHandler, CommandMetadata};
use crate::config::MinStayEnforcement;
use crate::pricing::{min_stay_violation, resolve_with_rules, PricingError};
use shared::booking::{BookingEvent, BookingEventType, BookingStatus, EventPayload, StayDates};

/// UpdateStayDates action
#[derive(Debug, Clone)]
pub struct UpdateStayDatesAction {
    pub booking_id: String,
    pub dates: StayDates,
    pub min_stay_mode: MinStayEnforcement,
}

#[async_trait]
impl CommandHandler for UpdateStayDatesAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<BookingEvent>, BookingError> {
        self.dates
            .validate()
            .map_err(|e| BookingError::InvalidDateRange(e.to_string()))?;

        let snapshot = ctx.load_snapshot(&self.booking_id)?;

        if snapshot.status != BookingStatus::Pending {
            return Err(BookingError::InvalidTransition {
                from: snapshot.status,
                action: "update_stay_dates",
            });
        }

        if self.dates == snapshot.dates {
            return Ok(vec![]);
        }

        let report = availability::check_txn_excluding(
            ctx.storage(),
            ctx.txn(),
            snapshot.room_id,
            self.dates.check_in,
            self.dates.check_out,
            Some(&self.booking_id),
        )
        .map_err(|e| BookingError::Storage(e.to_string()))?;
        if !report.available {
            return Err(BookingError::RoomUnavailable {
                blocked: report.blocked_conflicts,
                bookings: report.booking_conflicts,
            });
        }

        let room = ctx
            .storage()
            .get_room_txn(ctx.txn(), snapshot.room_id)
            .map_err(|e| BookingError::Storage(e.to_string()))?
            .ok_or(BookingError::RoomNotFound(snapshot.room_id))?;
        let rules = ctx
            .storage()
            .get_season_rules_txn(ctx.txn(), snapshot.room_id)
            .map_err(|e| BookingError::Storage(e.to_string()))?;
        let breakdown = resolve_with_rules(&room, &rules, &self.dates).map_err(|e| match e {
            PricingError::NoApplicablePrice { room_id, .. } => {
                BookingError::NoApplicablePrice(room_id)
            }
            PricingError::RoomNotFound(id) => BookingError::RoomNotFound(id),
            PricingError::Storage(e) => BookingError::Storage(e.to_string()),
        })?;

        if let Some(v) = min_stay_violation(&breakdown, &rules, self.min_stay_mode) {
            return Err(BookingError::MinStayNotMet {
                rule: v.rule_name,
                required: v.required_nights,
                actual: v.actual_nights,
            });
        }

        let seq = ctx.next_sequence();
        let event = BookingEvent::new(
            seq,
            self.booking_id.clone(),
            metadata.actor_id,
            metadata.actor_name.clone(),
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            BookingEventType::StayDatesUpdated,
            EventPayload::StayDatesUpdated {
                previous: snapshot.dates,
                dates: self.dates,
                total_price: breakdown.total,
                segments: breakdown.segments,
                balance_due: breakdown.total,
            },
        );

        Ok(vec![event])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bookings::test_support::{date, make_metadata, seed_room, store_booking};
    use crate::storage::CoreStorage;

    fn make_action(ci: chrono::NaiveDate, co: chrono::NaiveDate) -> UpdateStayDatesAction {
        UpdateStayDatesAction {
            booking_id: "b-1".to_string(),
            dates: StayDates::new(ci, co).unwrap(),
            min_stay_mode: MinStayEnforcement::PerSegment,
        }
    }

    #[tokio::test]
    async fn test_update_dates_while_pending() {
        let storage = CoreStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        seed_room(&storage, &txn, 1, 1000.0, 4);
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
        let events = make_action(date(2025, 12, 26), date(2025, 12, 30))
            .execute(&mut ctx, &make_metadata())
            .await
            .unwrap();

        assert_eq!(events[0].event_type, BookingEventType::StayDatesUpdated);
        if let EventPayload::StayDatesUpdated {
            previous,
            total_price,
            ..
        } = &events[0].payload
        {
            assert_eq!(previous.check_in, date(2025, 12, 24));
            assert_eq!(*total_price, 4000.0);
        } else {
            panic!("Expected StayDatesUpdated payload");
        }
    }

    #[tokio::test]
    async fn test_update_dates_does_not_conflict_with_itself() {
        let storage = CoreStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        seed_room(&storage, &txn, 1, 1000.0, 4);
        store_booking(
            &storage,
            &txn,
            "b-1",
            1,
            date(2025, 12, 24),
            date(2025, 12, 27),
            BookingStatus::Pending,
        );

        // Overlaps its own current range; must still succeed
        let mut ctx = CommandContext::new(&txn, &storage, 0);
        let result = make_action(date(2025, 12, 25), date(2025, 12, 28))
            .execute(&mut ctx, &make_metadata())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_update_dates_after_reserved_fails() {
        let storage = CoreStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        seed_room(&storage, &txn, 1, 1000.0, 4);
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
        let result = make_action(date(2025, 12, 26), date(2025, 12, 30))
            .execute(&mut ctx, &make_metadata())
            .await;

        assert!(matches!(
            result,
            Err(BookingError::InvalidTransition {
                from: BookingStatus::Reserved,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_update_dates_conflicting_with_other_booking_fails() {
        let storage = CoreStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        seed_room(&storage, &txn, 1, 1000.0, 4);
        store_booking(
            &storage,
            &txn,
            "b-1",
            1,
            date(2025, 12, 24),
            date(2025, 12, 27),
            BookingStatus::Pending,
        );
        store_booking(
            &storage,
            &txn,
            "b-2",
            1,
            date(2025, 12, 28),
            date(2025, 12, 31),
            BookingStatus::Reserved,
        );

        let mut ctx = CommandContext::new(&txn, &storage, 0);
        let result = make_action(date(2025, 12, 27), date(2025, 12, 30))
            .execute(&mut ctx, &make_metadata())
            .await;

        assert!(matches!(
            result,
            Err(BookingError::RoomUnavailable { bookings: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_update_to_same_dates_is_noop() {
        let storage = CoreStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        seed_room(&storage, &txn, 1, 1000.0, 4);
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
        let events = make_action(date(2025, 12, 24), date(2025, 12, 27))
            .execute(&mut ctx, &make_metadata())
            .await
            .unwrap();
        assert!(events.is_empty());
    }
}
