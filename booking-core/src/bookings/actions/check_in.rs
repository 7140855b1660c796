//! CheckIn command handler
//!
//! Staff action at arrival. Permitted only from Reserved and only on or
//! after the check-in date; "today" in the business timezone is computed by
//! the manager and injected here so the action stays deterministic.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::bookings::traits::{BookingError, CommandContext, CommandHandler, CommandMetadata};
use shared::booking::{BookingEvent, BookingEventType, BookingStatus, EventPayload};

/// CheckIn action
#[derive(Debug, Clone)]
pub struct CheckInAction {
    pub booking_id: String,
    /// Today's date in the business timezone
    pub today: NaiveDate,
}

#[async_trait]
impl CommandHandler for CheckInAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<BookingEvent>, BookingError> {
        let snapshot = ctx.load_snapshot(&self.booking_id)?;

        if snapshot.status != BookingStatus::Reserved {
            return Err(BookingError::InvalidTransition {
                from: snapshot.status,
                action: "check_in",
            });
        }

        if self.today < snapshot.dates.check_in {
            return Err(BookingError::BeforeCheckInDate {
                check_in: snapshot.dates.check_in,
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
            BookingEventType::GuestCheckedIn,
            EventPayload::GuestCheckedIn {},
        );

        Ok(vec![event])
    }
}
